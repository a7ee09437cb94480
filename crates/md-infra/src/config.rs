//! Application configuration
//!
//! Layered configuration: an optional `config/default.toml` file overlaid
//! by `MARDEV_`-prefixed environment variables (`MARDEV_BACKEND__URL`,
//! `MARDEV_TIMEOUTS__PROBE_MS`, ...). Every timeout knob defaults to the
//! values the client was tuned with.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    /// Base URL of the hosted backend, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
        }
    }
}

/// Legacy external OAuth exchange endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OauthSettings {
    pub token_endpoint: String,
    pub client_id: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_probe_ms")]
    pub probe_ms: u64,
    #[serde(default = "default_bootstrap_ms")]
    pub bootstrap_ms: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_lookup_ms")]
    pub lookup_ms: u64,
    #[serde(default = "default_submit_ms")]
    pub submit_ms: u64,
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
}

fn default_probe_ms() -> u64 {
    3_000
}
fn default_bootstrap_ms() -> u64 {
    5_000
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_lookup_ms() -> u64 {
    5_000
}
fn default_submit_ms() -> u64 {
    10_000
}
fn default_request_ms() -> u64 {
    15_000
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            probe_ms: default_probe_ms(),
            bootstrap_ms: default_bootstrap_ms(),
            debounce_ms: default_debounce_ms(),
            lookup_ms: default_lookup_ms(),
            submit_ms: default_submit_ms(),
            request_ms: default_request_ms(),
        }
    }
}

impl TimeoutSettings {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn bootstrap(&self) -> Duration {
        Duration::from_millis(self.bootstrap_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn lookup(&self) -> Duration {
        Duration::from_millis(self.lookup_ms)
    }

    pub fn submit(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub oauth: OauthSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    /// Where the cookie jar and local store files live; defaults to the
    /// platform data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config/default")
    }

    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("MARDEV").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mardev")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let config = AppConfig::default();
        assert_eq!(config.timeouts.probe(), Duration::from_secs(3));
        assert_eq!(config.timeouts.bootstrap(), Duration::from_secs(5));
        assert_eq!(config.timeouts.debounce(), Duration::from_millis(500));
        assert_eq!(config.timeouts.lookup(), Duration::from_secs(5));
        assert_eq!(config.timeouts.submit(), Duration::from_secs(10));
    }

    #[test]
    fn loads_from_a_toml_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("app.toml");
        std::fs::write(
            &path,
            r#"
[backend]
url = "https://example.supabase.co"
anon_key = "anon"

[timeouts]
debounce_ms = 250
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.backend.url, "https://example.supabase.co");
        assert_eq!(config.timeouts.debounce(), Duration::from_millis(250));
        // Unset knobs keep their defaults.
        assert_eq!(config.timeouts.submit(), Duration::from_secs(10));
    }
}
