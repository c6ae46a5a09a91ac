use crate::config::OracleConfig;
use crate::error::{CoreError, CoreResult};
use crate::oracle::interface::{
    classify_oracle_error, DutyOracle, FailureCategory, OracleExchange, OracleFailure,
    OracleRequest,
};
use crate::oracle::payload::build_quote_payload;
use crate::policy::egress::{EgressPolicy, EgressTransport, TransportError};
use serde_json::Value;
use url::Url;

/// Duty oracle backed by the global-compliance quote endpoint.
pub struct HttpDutyOracle {
    config: OracleConfig,
    endpoint: String,
    url: Url,
    transport: EgressTransport,
}

impl HttpDutyOracle {
    pub fn new(config: OracleConfig, policy: EgressPolicy) -> CoreResult<Self> {
        config.validate()?;
        let endpoint = config.quote_endpoint();
        let url = Url::parse(&endpoint)
            .map_err(|e| CoreError::Config(format!("invalid quote endpoint {}: {}", endpoint, e)))?;
        let transport = EgressTransport::new(policy, config.timeout())?;
        Ok(Self {
            config,
            endpoint,
            url,
            transport,
        })
    }
}

impl DutyOracle for HttpDutyOracle {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn quote(&self, request: &OracleRequest) -> OracleExchange {
        let request_payload = match build_quote_payload(&self.config, request) {
            Ok(p) => p,
            Err(e) => {
                return OracleExchange {
                    request_payload: Value::Null,
                    outcome: Err(OracleFailure::new(
                        FailureCategory::TRANSPORT,
                        format!("could not build request: {}", e),
                    )),
                }
            }
        };

        // Content-Type comes from the JSON body.
        let headers = [("Authorization", self.config.authorization_header())];
        let outcome = match self.transport.post_json(&self.url, &headers, &request_payload) {
            Ok(reply) if reply.is_success() => serde_json::from_str::<Value>(&reply.body)
                .map_err(|e| OracleFailure::malformed(format!("response is not JSON: {}", e))),
            Ok(reply) => Err(OracleFailure::http_status(reply.status, &reply.body)),
            Err(TransportError::Blocked(reason)) => Err(OracleFailure::new(
                FailureCategory::EGRESS_BLOCKED,
                reason,
            )),
            Err(e) => {
                let message = e.to_string();
                let category = match e {
                    TransportError::Timeout(_) => FailureCategory::TIMEOUT,
                    _ => classify_oracle_error(&message),
                };
                Err(OracleFailure::new(category, message))
            }
        };

        OracleExchange {
            request_payload,
            outcome,
        }
    }
}
