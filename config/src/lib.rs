//! Configuration for Litera.
//!
//! Settings come from four layers, highest precedence first:
//!
//! 1. Command-line overrides ([`Overrides`])
//! 2. Environment (`LITERA_BACKEND_URL`, `LITERA_REQUEST_TIMEOUT_SECS`, `LITERA_SESSION_ID`)
//! 3. `~/.litera/config.toml`
//! 4. Built-in defaults
//!
//! ```toml
//! [backend]
//! url = "http://localhost:8000"
//! request_timeout_secs = 30
//!
//! [session]
//! id = "sess_abc123"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const BACKEND_URL_ENV: &str = "LITERA_BACKEND_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "LITERA_REQUEST_TIMEOUT_SECS";
pub const SESSION_ID_ENV: &str = "LITERA_SESSION_ID";

#[derive(Debug, Default, Deserialize)]
pub struct LiteraConfig {
    pub backend: Option<BackendConfig>,
    pub session: Option<SessionConfig>,
}

/// Scoring service connection settings.
#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    /// Base address; `${VAR}` references are expanded.
    pub url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Identifier to resume on launch.
    pub id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid backend URL {value:?}: {reason}")]
    InvalidBackendUrl { value: String, reason: String },
}

impl LiteraConfig {
    /// Load from the default path. `Ok(None)` when no config file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    fn backend_url(&self) -> Option<String> {
        self.backend
            .as_ref()
            .and_then(|backend| backend.url.as_deref())
            .map(expand_env_vars)
    }

    fn request_timeout_secs(&self) -> Option<u64> {
        self.backend
            .as_ref()
            .and_then(|backend| backend.request_timeout_secs)
    }

    fn session_id(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|session| session.id.as_deref())
            .map(expand_env_vars)
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".litera").join("config.toml"))
}

/// Validated scoring service base address, stored without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUrl(String);

impl BackendUrl {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        let invalid = |reason: String| ConfigError::InvalidBackendUrl {
            value: value.to_string(),
            reason,
        };

        let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }

        Ok(Self(trimmed.trim_end_matches('/').to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join an absolute API path (e.g. `/api/start`) onto the base.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl Default for BackendUrl {
    fn default() -> Self {
        Self(DEFAULT_BACKEND_URL.to_string())
    }
}

impl std::fmt::Display for BackendUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub session_id: Option<String>,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: BackendUrl,
    pub request_timeout: Duration,
    pub session_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: BackendUrl::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            session_id: None,
        }
    }
}

impl Settings {
    /// Resolve against the process environment.
    pub fn resolve(
        config: Option<&LiteraConfig>,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(config, overrides, |key| env::var(key).ok())
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with<F>(
        config: Option<&LiteraConfig>,
        overrides: &Overrides,
        lookup_env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: String| (!value.trim().is_empty()).then_some(value);

        let backend_url = overrides
            .backend_url
            .clone()
            .and_then(non_blank)
            .or_else(|| lookup_env(BACKEND_URL_ENV).and_then(non_blank))
            .or_else(|| config.and_then(LiteraConfig::backend_url).and_then(non_blank))
            .map_or_else(|| Ok(BackendUrl::default()), |url| BackendUrl::parse(&url))?;

        let timeout_secs = overrides
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .or_else(|| {
                lookup_env(REQUEST_TIMEOUT_ENV).and_then(|raw| match raw.trim().parse::<u64>() {
                    Ok(secs) if secs > 0 => Some(secs),
                    _ => {
                        tracing::warn!(value = %raw, "Ignoring invalid {REQUEST_TIMEOUT_ENV}");
                        None
                    }
                })
            })
            .or_else(|| {
                config
                    .and_then(LiteraConfig::request_timeout_secs)
                    .filter(|secs| *secs > 0)
            })
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let session_id = overrides
            .session_id
            .clone()
            .and_then(non_blank)
            .or_else(|| lookup_env(SESSION_ID_ENV).and_then(non_blank))
            .or_else(|| config.and_then(LiteraConfig::session_id).and_then(non_blank));

        Ok(Self {
            backend_url,
            request_timeout: Duration::from_secs(timeout_secs),
            session_id,
        })
    }
}

/// Replace `${VAR}` references with the variable's value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
