//! Global-compliance quote request body.
//!
//! One destination, one line item. Weight and shipping are sent as zero so the quote only
//! reflects duty on the customs value.

use crate::config::OracleConfig;
use crate::error::CoreResult;
use crate::oracle::interface::OracleRequest;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

pub const QUOTE_ID: &str = "TARIFF-MODEL-001";
pub const SELLER_CODE: &str = "SELLER-001";
pub const ITEM_CODE: u32 = 11;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
    id: &'a str,
    company_id: u64,
    currency: &'a str,
    seller_code: &'a str,
    b2b: bool,
    ship_from: Country,
    destinations: Vec<Destination>,
    lines: Vec<Line<'a>>,
    #[serde(rename = "type")]
    quote_type: &'a str,
    disable_calculation_summary: bool,
    restrictions_check: bool,
    program: &'a str,
}

#[derive(Debug, Serialize)]
struct Country {
    country: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Destination {
    ship_to: ShipTo,
    parameters: Vec<Parameter>,
    tax_registered: bool,
}

#[derive(Debug, Serialize)]
struct ShipTo {
    country: String,
    region: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Line<'a> {
    line_number: u32,
    quantity: u32,
    preference_program_applicable: bool,
    item: Item<'a>,
    classification_parameters: Vec<Parameter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Item<'a> {
    item_code: u32,
    description: &'a str,
    classifications: Vec<Classification>,
    classification_parameters: Vec<Parameter>,
    parameters: Vec<Parameter>,
}

#[derive(Debug, Serialize)]
struct Classification {
    country: String,
    hscode: String,
}

#[derive(Debug, Serialize)]
struct Parameter {
    name: String,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
}

impl Parameter {
    fn new(name: &str, value: impl Into<String>, unit: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            unit: unit.map(str::to_string),
        }
    }
}

static HS_CODE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.\s]").expect("hs code separator regex is valid"));

/// Strips the dots and whitespace users type into tariff codes ("8517.62.00" -> "85176200").
pub fn normalize_hs_code(hs_code: &str) -> String {
    HS_CODE_SEPARATORS.replace_all(hs_code, "").into_owned()
}

/// Price as a decimal string that always keeps a fractional part ("100" -> "100.0").
pub fn format_price(unit_cost: f64) -> String {
    let s = unit_cost.to_string();
    if unit_cost.is_finite() && !s.contains('.') {
        format!("{}.0", s)
    } else {
        s
    }
}

pub fn build_quote_payload(cfg: &OracleConfig, req: &OracleRequest) -> CoreResult<Value> {
    let import_country = req
        .destination_country
        .as_deref()
        .unwrap_or(cfg.import_country.as_str());
    let currency = cfg.currency.to_ascii_lowercase();

    let body = QuoteRequest {
        id: QUOTE_ID,
        company_id: cfg.company_id,
        currency: &currency,
        seller_code: SELLER_CODE,
        b2b: true,
        ship_from: Country {
            country: req.ship_from_country.clone(),
        },
        destinations: vec![Destination {
            ship_to: ShipTo {
                country: import_country.to_ascii_lowercase(),
                region: cfg.ship_to_region.clone(),
            },
            parameters: Vec::new(),
            tax_registered: false,
        }],
        lines: vec![Line {
            line_number: 1,
            quantity: req.quantity,
            preference_program_applicable: req.spi_applicable,
            item: Item {
                item_code: ITEM_CODE,
                description: &req.description,
                classifications: vec![Classification {
                    country: import_country.to_ascii_uppercase(),
                    hscode: normalize_hs_code(&req.hs_code),
                }],
                classification_parameters: vec![
                    Parameter::new("price", format_price(req.unit_cost), Some(currency.as_str())),
                    Parameter::new("coo", req.country_of_origin.clone(), None),
                ],
                parameters: vec![
                    Parameter::new("weight", "0", Some("lb")),
                    Parameter::new("SHIPPING", "0.00", Some(currency.as_str())),
                ],
            },
            classification_parameters: Vec::new(),
        }],
        quote_type: "QUOTE_MAXIMUM",
        disable_calculation_summary: false,
        restrictions_check: false,
        program: "Regular",
    };
    Ok(serde_json::to_value(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn request() -> OracleRequest {
        OracleRequest {
            vendor_id: 2,
            ship_from_country: "VN".to_string(),
            country_of_origin: "CN".to_string(),
            destination_country: None,
            unit_cost: 100.5,
            quantity: 100,
            description: "Cotton t-shirts".to_string(),
            hs_code: "6109.10 00".to_string(),
            spi_applicable: true,
        }
    }

    #[test]
    fn hs_code_separators_are_stripped() {
        assert_eq!(normalize_hs_code("8517.62.00"), "85176200");
        assert_eq!(normalize_hs_code(" 8471 30.01 "), "84713001");
    }

    #[test]
    fn whole_number_price_keeps_fraction() {
        assert_eq!(format_price(100.0), "100.0");
        assert_eq!(format_price(0.0), "0.0");
        assert_eq!(format_price(12.75), "12.75");

        let cfg = OracleConfig::new(7, SecretString::from("t".to_string())).unwrap();
        let mut req = request();
        req.unit_cost = 20.0;
        let p = build_quote_payload(&cfg, &req).unwrap();
        assert_eq!(p["lines"][0]["item"]["classificationParameters"][0]["value"], "20.0");
    }

    #[test]
    fn payload_carries_vendor_and_order_fields() {
        let cfg = OracleConfig::new(7, SecretString::from("t".to_string())).unwrap();
        let p = build_quote_payload(&cfg, &request()).unwrap();

        assert_eq!(p["companyId"], 7);
        assert_eq!(p["type"], "QUOTE_MAXIMUM");
        assert_eq!(p["shipFrom"]["country"], "VN");
        assert_eq!(p["destinations"][0]["shipTo"]["country"], "us");
        assert_eq!(p["destinations"][0]["shipTo"]["region"], "ca");

        let line = &p["lines"][0];
        assert_eq!(line["quantity"], 100);
        assert_eq!(line["preferenceProgramApplicable"], true);
        assert_eq!(line["item"]["classifications"][0]["country"], "US");
        assert_eq!(line["item"]["classifications"][0]["hscode"], "61091000");
        assert_eq!(line["item"]["classificationParameters"][0]["value"], "100.5");
        assert_eq!(line["item"]["classificationParameters"][1]["name"], "coo");
        assert_eq!(line["item"]["classificationParameters"][1]["value"], "CN");
        assert!(line["item"]["classificationParameters"][1].get("unit").is_none());
    }

    #[test]
    fn request_destination_overrides_config_default() {
        let cfg = OracleConfig::new(7, SecretString::from("t".to_string())).unwrap();
        let mut req = request();
        req.destination_country = Some("CA".to_string());
        let p = build_quote_payload(&cfg, &req).unwrap();
        assert_eq!(p["destinations"][0]["shipTo"]["country"], "ca");
        assert_eq!(p["lines"][0]["item"]["classifications"][0]["country"], "CA");
    }
}
