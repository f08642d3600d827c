//! Client configuration sourced from the environment.

use crate::error::ConfigError;

pub const ENV_BASE_URL: &str = "POSTAMAT_BASE_URL";
pub const ENV_TOKEN: &str = "POSTAMAT_TOKEN";
pub const ENV_NORMALIZE: &str = "POSTAMAT_NORMALIZE";

/// Settings needed to construct a `PostamatClient`.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: String,
    /// Normalize raw-text payloads before sending and after receiving.
    pub normalize_payloads: bool,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("normalize_payloads", &self.normalize_payloads)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }
        Ok(Self {
            base_url,
            token: token.into(),
            normalize_payloads: true,
        })
    }

    /// Read `POSTAMAT_BASE_URL`, `POSTAMAT_TOKEN` and the optional
    /// `POSTAMAT_NORMALIZE` (defaults to `true`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let token = lookup(ENV_TOKEN).ok_or(ConfigError::Missing(ENV_TOKEN))?;
        let mut config = Self::new(base_url, token)?;
        if let Some(raw) = lookup(ENV_NORMALIZE) {
            config.normalize_payloads = parse_flag(ENV_NORMALIZE, &raw)?;
        }
        Ok(config)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}
