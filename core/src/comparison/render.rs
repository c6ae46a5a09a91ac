use super::model::{ComparisonResult, DutyRate, VendorResult};
use super::rank::RankColor;
use crate::error::CoreResult;

pub const NOT_APPLICABLE_CELL: &str = "N/A";
pub const FAILED_CELL: &str = "FAILED";

/// `0.095` -> `"9.50%"`.
pub fn format_rate_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

pub fn vendor_heading(v: &VendorResult) -> String {
    match v.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("Vendor {}", v.vendor_id),
    }
}

/// The aligned table, one column per vendor: a row per duty type in schema order, then the
/// total rows, colour and cheapest flag.
pub fn render_comparison_csv(result: &ComparisonResult) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);

    let mut header = vec!["duty".to_string()];
    header.extend(result.vendors.iter().map(vendor_heading));
    wtr.write_record(&header)?;

    let mut origin = vec!["country_of_origin".to_string()];
    origin.extend(result.vendors.iter().map(|v| v.coo.clone()));
    wtr.write_record(&origin)?;

    for (pos, column) in result.schema.columns().iter().enumerate() {
        let mut row = vec![column.label.clone()];
        for v in &result.vendors {
            row.push(if !v.status.is_success() {
                FAILED_CELL.to_string()
            } else {
                match v.duties.get(pos).map(|d| d.rate) {
                    Some(DutyRate::Rate(r)) => format_rate_percent(r),
                    _ => NOT_APPLICABLE_CELL.to_string(),
                }
            });
        }
        wtr.write_record(&row)?;
    }

    let total_rows: [(&str, fn(&VendorResult) -> Option<String>); 5] = [
        ("total_duty_rate", |v| {
            v.totals.map(|t| format_rate_percent(t.total_duty_rate))
        }),
        ("total_duty_amount", |v| {
            v.totals.map(|t| format_money(t.total_duty_amount))
        }),
        ("total_cost", |v| v.totals.map(|t| format_money(t.total_cost))),
        ("color", |v| v.color_rank.map(|r| RankColor::for_rank(r).to_hex())),
        ("cheapest", |v| {
            v.color_rank
                .map(|_| (if v.is_cheapest { "yes" } else { "no" }).to_string())
        }),
    ];
    for (label, cell) in total_rows {
        let mut row = vec![label.to_string()];
        row.extend(
            result
                .vendors
                .iter()
                .map(|v| cell(v).unwrap_or_else(|| FAILED_CELL.to_string())),
        );
        wtr.write_record(&row)?;
    }

    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_has_two_decimals() {
        assert_eq!(format_rate_percent(0.095), "9.50%");
        assert_eq!(format_rate_percent(0.1138), "11.38%");
        assert_eq!(format_rate_percent(0.0), "0.00%");
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(format_money(2512.5), "2512.50");
    }
}
