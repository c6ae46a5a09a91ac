use crate::error::{CoreError, CoreResult};
use idna::domain_to_ascii;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowlistEntry {
    pub scheme: String, // http|https
    pub host: String,   // ASCII; punycode normalized
    pub port: u16,      // 0 = scheme default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    pub purpose: String,
}

impl AllowlistEntry {
    /// Builds a canonical entry that admits `endpoint` and everything below its path.
    pub fn for_endpoint(endpoint: &str, purpose: &str) -> CoreResult<Self> {
        let url = Url::parse(endpoint)
            .map_err(|e| CoreError::InvalidInput(format!("invalid endpoint {}: {}", endpoint, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| CoreError::InvalidInput("endpoint missing host".to_string()))?;
        let path = url.path().trim_end_matches('/');
        Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port: url.port().unwrap_or(0),
            path_prefix: if path.is_empty() {
                None
            } else {
                Some(path.to_string())
            },
            purpose: purpose.to_string(),
        }
        .canonicalize()
    }

    pub fn canonicalize(mut self) -> CoreResult<Self> {
        let scheme = self.scheme.to_ascii_lowercase();
        if scheme != "https" && scheme != "http" {
            return Err(CoreError::InvalidInput(
                "allowlist scheme must be http or https".to_string(),
            ));
        }
        self.scheme = scheme;

        let host_ascii = domain_to_ascii(&self.host)
            .map_err(|_| CoreError::InvalidInput("invalid allowlist host".to_string()))?;
        self.host = host_ascii.to_ascii_lowercase();

        if self.port == 0 {
            self.port = if self.scheme == "https" { 443 } else { 80 };
        }

        if let Some(pp) = &self.path_prefix {
            let mut p = pp.replace('\\', "/");
            if !p.starts_with('/') {
                p = format!("/{}", p);
            }
            if p.contains("..") {
                return Err(CoreError::InvalidInput(
                    "allowlist path_prefix must not contain ..".to_string(),
                ));
            }
            self.path_prefix = Some(p);
        }

        Ok(self)
    }

    pub fn matches_url(&self, url: &Url) -> bool {
        let scheme = url.scheme().to_ascii_lowercase();
        let host = match url.host_str() {
            Some(h) => match domain_to_ascii(h) {
                Ok(x) => x.to_ascii_lowercase(),
                Err(_) => return false,
            },
            None => return false,
        };
        let port = url
            .port_or_known_default()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });
        if scheme != self.scheme || host != self.host || port != self.port {
            return false;
        }
        match &self.path_prefix {
            Some(pp) => url.path().starts_with(pp.as_str()),
            None => true,
        }
    }
}
