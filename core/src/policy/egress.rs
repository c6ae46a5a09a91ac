use crate::error::{CoreError, CoreResult};
use crate::policy::allowlist::AllowlistEntry;
use crate::policy::types::NetworkMode;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct EgressPolicy {
    pub network_mode: NetworkMode,
    pub allowlist: Vec<AllowlistEntry>, // canonical
}

impl EgressPolicy {
    pub fn offline() -> Self {
        Self {
            network_mode: NetworkMode::OFFLINE,
            allowlist: Vec::new(),
        }
    }

    /// Online policy admitting exactly the given endpoints.
    pub fn allow_endpoints(endpoints: &[&str]) -> CoreResult<Self> {
        let mut allowlist = Vec::with_capacity(endpoints.len());
        for ep in endpoints {
            allowlist.push(AllowlistEntry::for_endpoint(ep, "duty oracle")?);
        }
        Ok(Self {
            network_mode: NetworkMode::ONLINE_ALLOWLISTED,
            allowlist,
        })
    }

    pub fn decide(&self, url: &Url) -> EgressDecision {
        match self.network_mode {
            NetworkMode::OFFLINE => EgressDecision::Blocked {
                reason: "OFFLINE_MODE".to_string(),
            },
            NetworkMode::ONLINE_ALLOWLISTED => {
                for (idx, e) in self.allowlist.iter().enumerate() {
                    if e.matches_url(url) {
                        return EgressDecision::Allowed {
                            allowlist_rule_id: format!("ALW{:04}", idx),
                        };
                    }
                }
                EgressDecision::Blocked {
                    reason: "NOT_ALLOWLISTED".to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EgressDecision {
    Allowed { allowlist_rule_id: String },
    Blocked { reason: String },
}

pub fn destination_details(url: &Url) -> Value {
    json!({
        "scheme": url.scheme(),
        "host": url.host_str().unwrap_or(""),
        "port": url.port_or_known_default().unwrap_or(0),
        "path": url.path(),
    })
}

/// Reply from a completed HTTP exchange, any status.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Blocked(String),
    Timeout(String),
    Connection(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Blocked(r) => write!(f, "egress blocked: {}", r),
            TransportError::Timeout(m) => write!(f, "timeout: {}", m),
            TransportError::Connection(m) => write!(f, "{}", m),
        }
    }
}

/// The only network path in the crate. Every request is checked against the policy first.
pub struct EgressTransport {
    policy: EgressPolicy,
    http: reqwest::blocking::Client,
}

impl EgressTransport {
    pub fn new(policy: EgressPolicy, timeout: Duration) -> CoreResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(15)))
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Config(format!("http client init failed: {}", e)))?;
        Ok(Self { policy, http })
    }

    pub fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, String)],
        body: &Value,
    ) -> Result<HttpReply, TransportError> {
        if let EgressDecision::Blocked { reason } = self.policy.decide(url) {
            return Err(TransportError::Blocked(reason));
        }

        let mut req = self.http.post(url.as_str()).json(body);
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }
        let resp = req.send().map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(map_reqwest_error)?;
        Ok(HttpReply { status, body })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Connection(e.to_string())
    }
}
