// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Token settings come from an optional JSON file plus environment
//! overrides; server settings come from the environment only.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `TOKEN_CONFIG_PATH` | JSON file with a full `TokenConfig` | unset (built-in defaults) |
//! | `TOKEN_ISSUER` | `iss` claim written and expected | `Shield` |
//! | `TOKEN_LIFETIME` | Token lifetime in seconds | `31536000` |
//! | `TOKEN_TYPE` | Default token type (`signed` or `encrypted`) | `signed` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUDIT_LOG_PATH` | JSONL file receiving authentication audit events | unset (log only) |
//! | `DEMO_USER` | `username:password` seeded into the in-memory store | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jose::kea::MAX_PBES2_ITERATIONS;
use crate::jose::registry::{DEFAULT_PBES2_ITERATIONS, DEFAULT_PBES2_SALT_SIZE};
use crate::jose::{AlgorithmRegistry, Jwk};
use crate::token::encrypted::DEFAULT_RECIPIENT;
use crate::token::TokenType;

/// Path of a JSON token configuration file.
pub const TOKEN_CONFIG_PATH_ENV: &str = "TOKEN_CONFIG_PATH";

/// Overrides `TokenConfig::issuer`.
pub const TOKEN_ISSUER_ENV: &str = "TOKEN_ISSUER";

/// Overrides `TokenConfig::lifetime` (seconds).
pub const TOKEN_LIFETIME_ENV: &str = "TOKEN_LIFETIME";

/// Overrides `TokenConfig::token_type`.
pub const TOKEN_TYPE_ENV: &str = "TOKEN_TYPE";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Audit events are appended here as JSON lines when set.
pub const AUDIT_LOG_PATH_ENV: &str = "AUDIT_LOG_PATH";

/// `username:password` of a user to seed at startup.
pub const DEMO_USER_ENV: &str = "DEMO_USER";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_ISSUER: &str = "Shield";

/// One year.
pub const DEFAULT_LIFETIME: u64 = 31_536_000;

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse token configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {var}: `{value}`")]
    Env { var: &'static str, value: String },

    #[error("invalid token configuration: {0}")]
    Invalid(String),
}

/// PBES2 key derivation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pbes2Config {
    pub salt_size: usize,
    pub iterations: u32,
}

impl Default for Pbes2Config {
    fn default() -> Self {
        Self {
            salt_size: DEFAULT_PBES2_SALT_SIZE,
            iterations: DEFAULT_PBES2_ITERATIONS,
        }
    }
}

/// Token engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// `iss` claim.
    pub issuer: String,

    /// Token lifetime in seconds.
    pub lifetime: u64,

    /// Token type used when a context makes no explicit choice.
    pub token_type: TokenType,

    /// Default signature algorithm.
    pub dsa: String,

    /// Default key encryption algorithm.
    pub kea: String,

    /// Default content encryption algorithm.
    pub cea: String,

    /// Default compression; `None` disables it.
    pub compression: Option<String>,

    /// Key for the signed codec.
    pub signing_key: Jwk,

    /// Named recipient keys for the encrypted codec.
    pub recipients: BTreeMap<String, Jwk>,

    pub pbes2: Pbes2Config,

    /// Expected `aud`; unchecked when `None`.
    pub audience: Option<String>,

    /// Clock skew tolerance in seconds.
    pub leeway: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            lifetime: DEFAULT_LIFETIME,
            token_type: TokenType::Signed,
            dsa: "HS256".to_string(),
            kea: "A256KW".to_string(),
            cea: "A256CBC-HS512".to_string(),
            compression: Some("DEF".to_string()),
            signing_key: Jwk::default(),
            recipients: BTreeMap::new(),
            pbes2: Pbes2Config::default(),
            audience: None,
            leeway: 0,
        }
    }
}

impl TokenConfig {
    /// Load from `TOKEN_CONFIG_PATH` (if set) and apply environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(TOKEN_CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `TOKEN_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(issuer) = lookup(TOKEN_ISSUER_ENV) {
            self.issuer = issuer;
        }
        if let Some(value) = lookup(TOKEN_LIFETIME_ENV) {
            self.lifetime = value.trim().parse().map_err(|_| ConfigError::Env {
                var: TOKEN_LIFETIME_ENV,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(TOKEN_TYPE_ENV) {
            self.token_type = value.parse().map_err(|_| ConfigError::Env {
                var: TOKEN_TYPE_ENV,
                value: value.clone(),
            })?;
        }
        Ok(())
    }

    /// Structural checks. Algorithm ids are checked when a codec is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid("issuer must not be empty".to_string()));
        }
        if self.lifetime == 0 {
            return Err(ConfigError::Invalid("lifetime must be greater than zero".to_string()));
        }
        if self.pbes2.salt_size < 8 {
            return Err(ConfigError::Invalid("pbes2 salt must be at least 8 bytes".to_string()));
        }
        // Tokens with a p2c above the cap never load.
        if self.pbes2.iterations == 0 || self.pbes2.iterations > MAX_PBES2_ITERATIONS {
            return Err(ConfigError::Invalid(format!(
                "pbes2 iterations must be between 1 and {MAX_PBES2_ITERATIONS}"
            )));
        }
        if self.token_type == TokenType::Encrypted && !self.recipients.contains_key(DEFAULT_RECIPIENT)
        {
            return Err(ConfigError::Invalid(format!(
                "encrypted tokens require a `{DEFAULT_RECIPIENT}` recipient"
            )));
        }
        Ok(())
    }

    /// Whether a signing key was configured.
    pub fn has_signing_key(&self) -> bool {
        self.signing_key != Jwk::default()
    }

    /// Algorithm registry honouring the PBES2 settings.
    pub fn registry(&self) -> AlgorithmRegistry {
        AlgorithmRegistry::with_pbes2(self.pbes2.salt_size, self.pbes2.iterations)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub audit_log_path: Option<PathBuf>,
    pub demo_user: Option<(String, String)>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let host = std::env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var(PORT_ENV)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let audit_log_path = std::env::var(AUDIT_LOG_PATH_ENV).ok().map(PathBuf::from);
        let demo_user = std::env::var(DEMO_USER_ENV).ok().and_then(|value| {
            value
                .split_once(':')
                .map(|(user, password)| (user.to_string(), password.to_string()))
        });

        Self {
            host,
            port,
            audit_log_path,
            demo_user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = TokenConfig::default();
        assert_eq!(config.issuer, "Shield");
        assert_eq!(config.lifetime, 31_536_000);
        assert_eq!(config.token_type, TokenType::Signed);
        assert_eq!(config.dsa, "HS256");
        assert_eq!(config.kea, "A256KW");
        assert_eq!(config.cea, "A256CBC-HS512");
        assert_eq!(config.compression.as_deref(), Some("DEF"));
        assert_eq!(config.pbes2, Pbes2Config { salt_size: 64, iterations: 4096 });
        assert!(!config.has_signing_key());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_values_merge_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "issuer": "Gate",
                "token_type": "encrypted",
                "recipients": {{ "main": {{ "kty": "oct", "k": "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8" }} }}
            }}"#
        )
        .unwrap();

        let config = TokenConfig::from_file(file.path()).unwrap();
        assert_eq!(config.issuer, "Gate");
        assert_eq!(config.token_type, TokenType::Encrypted);
        assert_eq!(config.lifetime, DEFAULT_LIFETIME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TokenConfig::from_file(Path::new("/nonexistent/token.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            (TOKEN_ISSUER_ENV, "Edge"),
            (TOKEN_LIFETIME_ENV, "3600"),
            (TOKEN_TYPE_ENV, "signed"),
        ]);
        let mut config = TokenConfig::default();
        config
            .apply_overrides(|var| env.get(var).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.issuer, "Edge");
        assert_eq!(config.lifetime, 3600);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = TokenConfig::default();
        let err = config
            .apply_overrides(|var| (var == TOKEN_LIFETIME_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: TOKEN_LIFETIME_ENV, .. }));
    }

    #[test]
    fn encrypted_default_requires_main_recipient() {
        let config = TokenConfig {
            token_type: TokenType::Encrypted,
            ..TokenConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let config = TokenConfig {
            lifetime: 0,
            ..TokenConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn pbes2_iterations_are_bounded() {
        let mut config = TokenConfig::default();
        config.pbes2.iterations = MAX_PBES2_ITERATIONS;
        assert!(config.validate().is_ok());

        config.pbes2.iterations = MAX_PBES2_ITERATIONS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.pbes2.iterations = 0;
        assert!(config.validate().is_err());
    }
}
