use super::model::{CostTotals, NormalizedDuty};

/// Sum of every applicable cell in an aligned row.
pub fn total_duty_rate(row: &[NormalizedDuty]) -> f64 {
    row.iter().filter_map(|d| d.rate.value()).sum()
}

/// Landed cost of one line item. Values are taken as the oracle and the form gave them; nothing
/// is clamped or rounded here.
pub fn compute_totals(quantity: u32, unit_cost: f64, row: &[NormalizedDuty]) -> CostTotals {
    let total_duty_rate = total_duty_rate(row);
    let customs_value = quantity as f64 * unit_cost;
    let total_duty_amount = customs_value * total_duty_rate;
    CostTotals {
        customs_value,
        total_duty_rate,
        total_duty_amount,
        total_cost: customs_value + total_duty_amount,
    }
}
