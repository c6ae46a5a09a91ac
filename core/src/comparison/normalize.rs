//! Turns one oracle reply into the vendor's duty list.
//!
//! The duty lines live at
//! `globalCompliance[0].quote.lines[0].calculationSummary.dutyGranularity`. Any missing level on
//! that path means the vendor owes nothing; a level that is present but has the wrong shape
//! makes the whole reply malformed.

use super::model::RawDutyEntry;
use crate::oracle::interface::OracleFailure;
use serde_json::Value;

pub const UNKNOWN_DUTY_LABEL: &str = "Unknown Duty";

pub type VendorOutcome = Result<Vec<RawDutyEntry>, OracleFailure>;

pub fn normalize_outcome(outcome: &Result<Value, OracleFailure>) -> VendorOutcome {
    match outcome {
        Ok(payload) => extract_duties(payload),
        Err(failure) => Err(failure.clone()),
    }
}

pub fn extract_duties(payload: &Value) -> VendorOutcome {
    if !payload.is_object() {
        return Err(OracleFailure::malformed("response body is not a JSON object"));
    }

    let Some(quotes) = array_at(payload, "globalCompliance")? else {
        return Ok(Vec::new());
    };
    let Some(first_quote) = quotes.first() else {
        return Ok(Vec::new());
    };
    let Some(quote) = object_at(first_quote, "quote")? else {
        return Ok(Vec::new());
    };
    let Some(lines) = array_at(quote, "lines")? else {
        return Ok(Vec::new());
    };
    let Some(first_line) = lines.first() else {
        return Ok(Vec::new());
    };
    let Some(summary) = object_at(first_line, "calculationSummary")? else {
        return Ok(Vec::new());
    };
    let Some(granularity) = array_at(summary, "dutyGranularity")? else {
        return Ok(Vec::new());
    };

    granularity
        .iter()
        .enumerate()
        .map(|(idx, duty)| parse_duty_entry(idx, duty))
        .collect()
}

fn parse_duty_entry(idx: usize, duty: &Value) -> Result<RawDutyEntry, OracleFailure> {
    if !duty.is_object() {
        return Err(OracleFailure::malformed(format!(
            "dutyGranularity[{}] is not an object",
            idx
        )));
    }
    let description = duty
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or(UNKNOWN_DUTY_LABEL)
        .to_string();
    let duty_type = duty
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let rate = match duty.get("rate") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
            OracleFailure::malformed(format!("dutyGranularity[{}].rate out of range", idx))
        })?,
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| {
            OracleFailure::malformed(format!(
                "dutyGranularity[{}].rate is not numeric: {:?}",
                idx, s
            ))
        })?,
        Some(other) => {
            return Err(OracleFailure::malformed(format!(
                "dutyGranularity[{}].rate has unexpected type: {}",
                idx, other
            )))
        }
    };
    Ok(RawDutyEntry {
        duty_type,
        description,
        rate,
    })
}

// Ok(None) = absent or null; Err = present with the wrong shape.
fn array_at<'a>(v: &'a Value, key: &str) -> Result<Option<&'a Vec<Value>>, OracleFailure> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(a)) => Ok(Some(a)),
        Some(_) => Err(OracleFailure::malformed(format!("{} is not an array", key))),
    }
}

fn object_at<'a>(v: &'a Value, key: &str) -> Result<Option<&'a Value>, OracleFailure> {
    match v.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(o @ Value::Object(_)) => Ok(Some(o)),
        Some(_) => Err(OracleFailure::malformed(format!("{} is not an object", key))),
    }
}
