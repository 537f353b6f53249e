//! Runtime configuration from `ZONT_*` environment variables.

use std::time::Duration;

use crate::transport::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};

pub const DEFAULT_BASE_URL: &str = "https://zont-online.ru/api/";
pub const DEFAULT_CLIENT_NAME: &str = "zont-client";

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    /// Sent as `client_name` in request bodies.
    pub client_name: String,
    /// Value of the `X-ZONT-Client` header, usually the integrator's contact e-mail.
    pub zont_client: String,
    pub login: String,
    pub password: String,
    /// Per-attempt HTTP timeout.
    pub http_timeout: Duration,
    pub max_retries: u32,
    /// Log request and response bodies at debug level.
    pub debug: bool,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("client_name", &self.client_name)
            .field("zont_client", &self.zont_client)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("http_timeout", &self.http_timeout)
            .field("max_retries", &self.max_retries)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Config {
    pub fn new(
        client_name: impl Into<String>,
        zont_client: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_name: client_name.into(),
            zont_client: zont_client.into(),
            login: login.into(),
            password: password.into(),
            http_timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            debug: false,
        }
    }

    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| get(key).ok_or_else(|| format!("Missing required setting {}", key));

        let login = required("ZONT_LOGIN")?;
        let password = required("ZONT_PASSWORD")?;
        let zont_client = required("ZONT_CLIENT")?;
        let client_name = get("ZONT_CLIENT_NAME").unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());

        let mut base_url = get("ZONT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let http_timeout = match get("ZONT_HTTP_TIMEOUT_SECS") {
            Some(s) => match s.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err("ZONT_HTTP_TIMEOUT_SECS must be a positive integer".to_string()),
            },
            None => DEFAULT_TIMEOUT,
        };

        let max_retries = match get("ZONT_MAX_RETRIES") {
            Some(s) => s
                .parse::<u32>()
                .map_err(|_| "ZONT_MAX_RETRIES must be a non-negative integer".to_string())?,
            None => DEFAULT_MAX_RETRIES,
        };

        let debug = get("ZONT_DEBUG")
            .map(|s| matches!(s.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(false);

        Ok(Config {
            base_url,
            client_name,
            zont_client,
            login,
            password,
            http_timeout,
            max_retries,
            debug,
        })
    }
}
