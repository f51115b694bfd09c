use std::env;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::warn;

const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Which relational store backs the scheduling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Supabase => write!(f, "supabase"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: Option<String>,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub port: u16,
}

impl AppConfig {
    /// Reads the process environment once. Call [`AppConfig::validate`] before
    /// serving traffic.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let supabase_url = lookup("SUPABASE_URL").unwrap_or_else(|| {
            warn!("SUPABASE_URL not set, using empty value");
            String::new()
        });
        let supabase_anon_key = lookup("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_else(|| {
            warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
            String::new()
        });
        let supabase_service_key = lookup("SUPABASE_SERVICE_ROLE_KEY").filter(|k| !k.is_empty());

        // The base64 form wins so secrets with awkward characters survive .env files
        let supabase_jwt_secret = match lookup("SUPABASE_JWT_SECRET_B64") {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded.trim()).map_err(|e| ConfigError::Invalid {
                    name: "SUPABASE_JWT_SECRET_B64",
                    reason: e.to_string(),
                })?;
                String::from_utf8(bytes).map_err(|_| ConfigError::Invalid {
                    name: "SUPABASE_JWT_SECRET_B64",
                    reason: "decoded secret is not UTF-8".to_string(),
                })?
            }
            None => lookup("SUPABASE_JWT_SECRET").unwrap_or_else(|| {
                warn!("SUPABASE_JWT_SECRET not set, using empty value");
                String::new()
            }),
        };

        let store_backend = match lookup("STORE_BACKEND").as_deref() {
            None | Some("") | Some("supabase") => StoreBackend::Supabase,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    reason: format!("expected 'supabase' or 'memory', got '{}'", other),
                })
            }
        };

        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            supabase_service_key,
            supabase_jwt_secret,
            store_backend,
            port,
        })
    }

    /// Fail-fast check run once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supabase_jwt_secret.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_JWT_SECRET"));
        }

        if self.store_backend == StoreBackend::Supabase {
            if self.supabase_url.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_URL"));
            }
            if !(self.supabase_url.starts_with("http://") || self.supabase_url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    name: "SUPABASE_URL",
                    reason: "must start with http:// or https://".to_string(),
                });
            }
            if self.supabase_anon_key.is_empty() {
                return Err(ConfigError::Missing("SUPABASE_ANON_PUBLIC_KEY"));
            }
        }

        Ok(())
    }

    /// Key used for writes; falls back to the anon key when no service key is set.
    pub fn store_key(&self) -> &str {
        self.supabase_service_key
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_full_supabase_config_validates() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_ANON_PUBLIC_KEY", "anon"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.store_backend, StoreBackend::Supabase);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.store_key(), "anon");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let config = AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory")])).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::Missing("SUPABASE_JWT_SECRET")));
    }

    #[test]
    fn test_base64_secret_takes_precedence() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("SUPABASE_JWT_SECRET", "plain"),
            ("SUPABASE_JWT_SECRET_B64", "ZW5jb2RlZA=="),
        ]))
        .unwrap();

        assert_eq!(config.supabase_jwt_secret, "encoded");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_base64_secret_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("SUPABASE_JWT_SECRET_B64", "***")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "SUPABASE_JWT_SECRET_B64", .. })
        ));
    }

    #[test]
    fn test_unknown_backend_and_bad_port_are_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "mysql")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_supabase_backend_requires_http_url() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SUPABASE_URL", "project.supabase.co"),
            ("SUPABASE_ANON_PUBLIC_KEY", "anon"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { name: "SUPABASE_URL", .. })
        ));
    }
}
