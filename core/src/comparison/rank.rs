use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Ranking {
    /// Position between the cheapest (0) and the most expensive (1) vendor.
    pub color_rank: f64,
    pub is_cheapest: bool,
}

/// Ranks the costs of successful vendors. `None` slots (failed vendors) stay `None` and take no
/// part in the min/max.
///
/// When every ranked cost is equal, including a single vendor, all of them get rank 0 and are
/// flagged cheapest.
pub fn assign_ranks(costs: &[Option<f64>]) -> Vec<Option<Ranking>> {
    let ranked: Vec<f64> = costs.iter().flatten().copied().collect();
    if ranked.is_empty() {
        return vec![None; costs.len()];
    }
    let min = ranked.iter().copied().fold(f64::INFINITY, f64::min);
    let max = ranked.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    costs
        .iter()
        .map(|cost| {
            cost.map(|c| {
                if c == min {
                    Ranking {
                        color_rank: 0.0,
                        is_cheapest: true,
                    }
                } else if range.is_finite() && range > 0.0 {
                    Ranking {
                        color_rank: ((c - min) / range).clamp(0.0, 1.0),
                        is_cheapest: false,
                    }
                } else {
                    // Overflowed cost: ranked as the most expensive.
                    Ranking {
                        color_rank: 1.0,
                        is_cheapest: false,
                    }
                }
            })
        })
        .collect()
}

/// Gradient cell colour: pure green at rank 0, pure red at rank 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RankColor {
    pub fn for_rank(color_rank: f64) -> Self {
        let t = if color_rank.is_nan() {
            0.0
        } else {
            color_rank.clamp(0.0, 1.0)
        };
        Self {
            r: (255.0 * t).round() as u8,
            g: (255.0 * (1.0 - t)).round() as u8,
            b: 0,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
