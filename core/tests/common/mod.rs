#![allow(dead_code)]

use landed_cost_core::comparison::model::{ComparisonRequest, VendorInput};
use landed_cost_core::oracle::interface::{
    DutyOracle, OracleExchange, OracleFailure, OracleRequest,
};
use landed_cost_core::policy::egress::EgressPolicy;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

pub const FAKE_ENDPOINT: &str = "http://127.0.0.1:18080/api/v2/companies/1/globalcompliance";

pub enum Reply {
    Body(Value),
    Fail(OracleFailure),
}

/// In-process oracle answering per vendor id, optionally after a delay.
pub struct ScriptedOracle {
    pub endpoint: String,
    replies: HashMap<u32, (Reply, u64)>,
    pub calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            endpoint: FAKE_ENDPOINT.to_string(),
            replies: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn duties(self, vendor_id: u32, duties: &[(&str, &str, f64)]) -> Self {
        self.reply(vendor_id, Reply::Body(quote_body(duties)), 0)
    }

    pub fn reply(mut self, vendor_id: u32, reply: Reply, delay_ms: u64) -> Self {
        self.replies.insert(vendor_id, (reply, delay_ms));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DutyOracle for ScriptedOracle {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn quote(&self, request: &OracleRequest) -> OracleExchange {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request_payload = serde_json::to_value(request).unwrap();
        let outcome = match self.replies.get(&request.vendor_id) {
            Some((reply, delay_ms)) => {
                if *delay_ms > 0 {
                    thread::sleep(Duration::from_millis(*delay_ms));
                }
                match reply {
                    Reply::Body(v) => Ok(v.clone()),
                    Reply::Fail(f) => Err(f.clone()),
                }
            }
            None => Err(OracleFailure::new(
                landed_cost_core::oracle::interface::FailureCategory::TRANSPORT,
                "connection refused",
            )),
        };
        OracleExchange {
            request_payload,
            outcome,
        }
    }
}

pub fn quote_body(duties: &[(&str, &str, f64)]) -> Value {
    let granularity: Vec<Value> = duties
        .iter()
        .map(|(t, d, r)| json!({"type": t, "description": d, "rate": r}))
        .collect();
    json!({
        "globalCompliance": [{
            "quote": {
                "lines": [{
                    "lineNumber": 1,
                    "calculationSummary": {"dutyGranularity": granularity}
                }]
            }
        }]
    })
}

pub fn fake_policy() -> EgressPolicy {
    EgressPolicy::allow_endpoints(&["http://127.0.0.1:18080/api/v2"]).unwrap()
}

pub fn vendor(country: &str, coo: &str, unit_cost: f64) -> VendorInput {
    VendorInput {
        name: None,
        country: Some(country.to_string()),
        coo: Some(coo.to_string()),
        unit_cost: Some(unit_cost),
        spi_applicable: false,
    }
}

pub fn request(quantity: u32, vendors: Vec<VendorInput>) -> ComparisonRequest {
    ComparisonRequest {
        quantity,
        hs_code: "6109.10.00".to_string(),
        description: "T-shirts, cotton".to_string(),
        import_country: None,
        vendors,
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}
