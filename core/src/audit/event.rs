use crate::determinism::json_canonical;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub ts_utc: String, // RFC3339 UTC string
    pub event_type: String,
    pub comparison_id: String,
    pub actor: Actor,
    pub details: serde_json::Value,
    pub prev_event_hash: String, // hex 64
    pub event_hash: String,      // hex 64
}

impl AuditEvent {
    pub fn new(
        comparison_id: &str,
        event_type: &str,
        actor: Actor,
        details: serde_json::Value,
    ) -> Self {
        Self {
            ts_utc: now_rfc3339_utc(),
            event_type: event_type.to_string(),
            comparison_id: comparison_id.to_string(),
            actor,
            details,
            prev_event_hash: String::new(),
            event_hash: String::new(),
        }
    }
}

pub const ZERO_HASH_64: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub const EVENT_TYPES: &[&str] = &[
    "COMPARISON_STARTED",
    "VENDOR_SKIPPED",
    "EGRESS_REQUEST_ALLOWED",
    "EGRESS_REQUEST_BLOCKED",
    "ORACLE_CALL_COMPLETED",
    "ORACLE_CALL_FAILED",
    "COMPARISON_COMPLETED",
];

// event_hash covers the whole envelope with event_hash itself zeroed.
pub fn compute_event_hash(event: &AuditEvent) -> CoreResult<String> {
    let mut e = event.clone();
    e.event_hash = ZERO_HASH_64.to_string();
    json_canonical::canonical_sha256_hex(&e)
}

pub fn finalize_event(mut event: AuditEvent) -> CoreResult<AuditEvent> {
    if event.prev_event_hash.len() != 64
        || !event.prev_event_hash.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(CoreError::InvalidInput(
            "prev_event_hash must be 64 hex chars".to_string(),
        ));
    }
    validate_event_taxonomy(&event)?;
    event.event_hash = compute_event_hash(&event)?;
    Ok(event)
}

fn validate_event_taxonomy(event: &AuditEvent) -> CoreResult<()> {
    if !EVENT_TYPES.contains(&event.event_type.as_str()) {
        return Err(CoreError::InvalidInput(format!(
            "unknown event_type {}",
            event.event_type
        )));
    }
    for k in required_detail_keys(&event.event_type) {
        if event.details.get(k).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "event {} missing details.{}",
                event.event_type, k
            )));
        }
    }
    Ok(())
}

fn required_detail_keys(event_type: &str) -> &'static [&'static str] {
    match event_type {
        "COMPARISON_STARTED" => &[
            "vendor_entries",
            "complete_vendors",
            "quantity",
            "request_hash_sha256",
        ],
        "VENDOR_SKIPPED" => &["vendor_id", "reason"],
        "EGRESS_REQUEST_ALLOWED" => &["destination", "allowlist_rule_id"],
        "EGRESS_REQUEST_BLOCKED" => &["destination", "block_reason"],
        "ORACLE_CALL_COMPLETED" => &[
            "vendor_id",
            "request_hash_sha256",
            "response_hash_sha256",
            "duty_count",
            "duration_ms",
        ],
        "ORACLE_CALL_FAILED" => &[
            "vendor_id",
            "request_hash_sha256",
            "error_category",
            "error_message",
        ],
        "COMPARISON_COMPLETED" => &[
            "vendors_succeeded",
            "vendors_failed",
            "schema_len",
            "cheapest_vendor_ids",
        ],
        _ => &[],
    }
}

pub fn now_rfc3339_utc() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
