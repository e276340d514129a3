//! Application-level configuration loading, including poll lifetime and token signing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use rand::RngCore;
use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RANKWAVE_BACK_CONFIG_PATH";
/// Poll lifetime applied when the configuration does not specify one.
const DEFAULT_POLL_TTL_SECS: u64 = 7200;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    poll_ttl: Duration,
    token_secret: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        ttl_secs = app_config.poll_ttl.as_secs(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Absolute lifetime of a poll record, from creation to expiry.
    pub fn poll_ttl(&self) -> Duration {
        self.poll_ttl
    }

    /// Secret used to sign and verify participant access tokens.
    pub fn token_secret(&self) -> &str {
        &self.token_secret
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_ttl: Duration::from_secs(DEFAULT_POLL_TTL_SECS),
            token_secret: generated_secret(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    poll_ttl_secs: Option<u64>,
    token_secret: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            poll_ttl: Duration::from_secs(raw.poll_ttl_secs.unwrap_or(DEFAULT_POLL_TTL_SECS)),
            token_secret: raw.token_secret.unwrap_or_else(generated_secret),
        }
    }
}

fn resolve_config_path() -> PathBuf {
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Random per-process secret. Tokens signed with it do not survive restarts.
fn generated_secret() -> String {
    warn!("no token secret configured; generating one (tokens will not survive a restart)");
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
