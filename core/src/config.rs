use crate::error::{CoreError, CoreResult};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://ns1-quoting-sbx.xbo.avalara.com/api/v2";
pub const DEFAULT_IMPORT_COUNTRY: &str = "US";
pub const DEFAULT_SHIP_TO_REGION: &str = "ca";
pub const DEFAULT_CURRENCY: &str = "usd";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const TOKEN_ENV_VARS: &[&str] = &["ORACLE_API_TOKEN", "AVALARA_TOKEN"];

/// Process-wide oracle settings. Built once at startup and only read afterwards.
pub struct OracleConfig {
    pub api_base_url: String,
    pub company_id: u64,
    /// Pre-encoded Basic credential; wrapped so it never reaches logs.
    pub token: SecretString,
    pub import_country: String,
    pub ship_to_region: String,
    pub currency: String,
    pub timeout_ms: u64,
}

impl OracleConfig {
    pub fn new(company_id: u64, token: SecretString) -> CoreResult<Self> {
        if token.expose_secret().trim().is_empty() {
            return Err(CoreError::Config("oracle token must not be empty".to_string()));
        }
        Ok(Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            company_id,
            token,
            import_country: DEFAULT_IMPORT_COUNTRY.to_string(),
            ship_to_region: DEFAULT_SHIP_TO_REGION.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        })
    }

    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as [`OracleConfig::from_env`] but reads through `lookup`, which keeps tests off the
    /// real process environment.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let token = TOKEN_ENV_VARS
            .iter()
            .find_map(|k| non_empty(*k))
            .ok_or_else(|| {
                CoreError::Config(format!("missing oracle token (set {})", TOKEN_ENV_VARS.join(" or ")))
            })?;
        let company_id = non_empty("AVALARA_COMPANY_ID")
            .ok_or_else(|| CoreError::Config("missing AVALARA_COMPANY_ID".to_string()))?;
        let company_id: u64 = company_id.trim().parse().map_err(|_| {
            CoreError::Config(format!("AVALARA_COMPANY_ID must be numeric, got {}", company_id))
        })?;

        let mut cfg = Self::new(company_id, SecretString::from(token))?;
        if let Some(base) = non_empty("AVALARA_API_BASE") {
            cfg.api_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(country) = non_empty("LANDED_COST_IMPORT_COUNTRY") {
            cfg.import_country = country.trim().to_ascii_uppercase();
        }
        if let Some(region) = non_empty("LANDED_COST_SHIP_TO_REGION") {
            cfg.ship_to_region = region.trim().to_ascii_lowercase();
        }
        if let Some(ms) = non_empty("LANDED_COST_TIMEOUT_MS") {
            cfg.timeout_ms = ms.trim().parse().map_err(|_| {
                CoreError::Config(format!("LANDED_COST_TIMEOUT_MS must be an integer, got {}", ms))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        url::Url::parse(&self.api_base_url)
            .map_err(|e| CoreError::Config(format!("invalid api_base_url: {}", e)))?;
        if self.import_country.len() != 2 {
            return Err(CoreError::Config(format!(
                "import_country must be ISO-2, got {}",
                self.import_country
            )));
        }
        if self.timeout_ms == 0 {
            return Err(CoreError::Config("timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn quote_endpoint(&self) -> String {
        format!(
            "{}/companies/{}/globalcompliance",
            self.api_base_url.trim_end_matches('/'),
            self.company_id
        )
    }

    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.token.expose_secret())
    }
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_base_url", &self.api_base_url)
            .field("company_id", &self.company_id)
            .field("token", &"[REDACTED]")
            .field("import_country", &self.import_country)
            .field("ship_to_region", &self.ship_to_region)
            .field("currency", &self.currency)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}
