mod common;

use common::*;
use landed_cost_core::comparison::render::render_comparison_csv;
use landed_cost_core::comparison::workflow::ComparisonOrchestrator;
use landed_cost_core::oracle::interface::{FailureCategory, OracleFailure};

#[test]
fn csv_table_follows_schema_and_vendor_order() {
    let oracle = ScriptedOracle::new()
        .duties(1, &[("MFN", "Most Favored Nation", 0.095), ("ADD", "Antidumping", 0.0188)])
        .duties(2, &[("MFN", "Most Favored Nation", 0.0), ("SECTION301", "Section 301", 0.25)])
        .reply(
            3,
            Reply::Fail(OracleFailure::new(FailureCategory::TRANSPORT, "connection reset")),
            0,
        );
    let policy = fake_policy();
    let mut a = vendor("CN", "CN", 100.50);
    a.name = Some("Shenzhen Apparel".to_string());
    let req = request(100, vec![a, vendor("VN", "VN", 100.50), vendor("MX", "MX", 90.0)]);

    let result = ComparisonOrchestrator::new(&oracle, &policy)
        .compare(&req)
        .unwrap();
    let csv = render_comparison_csv(&result).unwrap();

    let expected = "\
duty,Shenzhen Apparel,Vendor 2,Vendor 3
country_of_origin,CN,VN,MX
Most Favored Nation,9.50%,0.00%,FAILED
Antidumping,1.88%,N/A,FAILED
Section 301,N/A,25.00%,FAILED
total_duty_rate,11.38%,25.00%,FAILED
total_duty_amount,1143.69,2512.50,FAILED
total_cost,11193.69,12562.50,FAILED
color,#00ff00,#ff0000,FAILED
cheapest,yes,no,FAILED
";
    assert_eq!(csv, expected);
}

#[test]
fn empty_comparison_renders_header_rows_only() {
    let oracle = ScriptedOracle::new();
    let policy = fake_policy();
    let result = ComparisonOrchestrator::new(&oracle, &policy)
        .compare(&request(1, vec![]))
        .unwrap();
    let csv = render_comparison_csv(&result).unwrap();
    assert!(csv.starts_with("duty\ncountry_of_origin\n"));
}
