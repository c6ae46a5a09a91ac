use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One vendor's quote request, as handed to a [`DutyOracle`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleRequest {
    pub vendor_id: u32,
    pub ship_from_country: String,
    pub country_of_origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_country: Option<String>,
    pub unit_cost: f64,
    pub quantity: u32,
    pub description: String,
    pub hs_code: String,
    pub spi_applicable: bool,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureCategory {
    TRANSPORT,
    TIMEOUT,
    HTTP_STATUS,
    MALFORMED_RESPONSE,
    EGRESS_BLOCKED,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::TRANSPORT => "TRANSPORT",
            FailureCategory::TIMEOUT => "TIMEOUT",
            FailureCategory::HTTP_STATUS => "HTTP_STATUS",
            FailureCategory::MALFORMED_RESPONSE => "MALFORMED_RESPONSE",
            FailureCategory::EGRESS_BLOCKED => "EGRESS_BLOCKED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleFailure {
    pub category: FailureCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Body the oracle sent alongside a failure, JSON when it parsed, else the raw text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_body: Option<Value>,
}

impl OracleFailure {
    pub fn new(category: FailureCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            http_status: None,
            error_body: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureCategory::MALFORMED_RESPONSE, message)
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        let error_body = if body.trim().is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.to_string())),
            )
        };
        Self {
            category: FailureCategory::HTTP_STATUS,
            message: format!("oracle returned HTTP {}", status),
            http_status: Some(status),
            error_body,
        }
    }
}

impl std::fmt::Display for OracleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category.as_str(), self.message)
    }
}

/// Raw traffic for one oracle call. The payload is kept even when the call fails.
#[derive(Debug, Clone)]
pub struct OracleExchange {
    pub request_payload: Value,
    pub outcome: Result<Value, OracleFailure>,
}

/// A duty-calculation service. Implementations must be callable from several threads at once;
/// each call is independent of every other.
pub trait DutyOracle: Sync {
    fn endpoint(&self) -> &str;
    fn quote(&self, request: &OracleRequest) -> OracleExchange;
}

pub fn classify_oracle_error(err: &str) -> FailureCategory {
    let lower = err.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        FailureCategory::TIMEOUT
    } else if lower.contains("egress blocked") {
        FailureCategory::EGRESS_BLOCKED
    } else {
        FailureCategory::TRANSPORT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_text_is_classified() {
        assert_eq!(
            classify_oracle_error("operation timed out"),
            FailureCategory::TIMEOUT
        );
        assert_eq!(
            classify_oracle_error("error sending request: connection refused"),
            FailureCategory::TRANSPORT
        );
    }

    #[test]
    fn http_status_failure_keeps_error_body() {
        let json = OracleFailure::http_status(400, r#"{"error":{"message":"bad hscode"}}"#);
        assert_eq!(json.http_status, Some(400));
        assert_eq!(
            json.error_body.unwrap()["error"]["message"],
            serde_json::json!("bad hscode")
        );

        let text = OracleFailure::http_status(502, "Bad Gateway");
        assert_eq!(text.error_body, Some(Value::String("Bad Gateway".to_string())));

        assert_eq!(OracleFailure::http_status(500, "  ").error_body, None);
    }
}
