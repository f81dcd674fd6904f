//! Configuration types.
//!
//! Everything is read from environment variables. The reserved temporary
//! prefix must be excluded from the bucket's event notifications at deploy
//! time; nothing here can enforce that at runtime.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default root segment of every archive path.
pub const DEFAULT_ARCHIVE_ROOT: &str = "Sent";

/// Default reserved prefix for temporary raw copies.
pub const DEFAULT_TEMP_PREFIX: &str = "TMP/email_out/raw/";

/// Default leaf object name inside each archived message folder.
pub const DEFAULT_ARCHIVE_LEAF: &str = "email";

/// Key layout used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// First path segment of every archived message.
    pub archive_root: String,
    /// Reserved key prefix that never fires the storage trigger.
    pub temp_prefix: String,
    /// Object name written at the end of each archive path.
    pub archive_leaf: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            archive_root: DEFAULT_ARCHIVE_ROOT.to_string(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            archive_leaf: DEFAULT_ARCHIVE_LEAF.to_string(),
        }
    }
}

impl PipelineConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            archive_root: env_or("OUTBOX_ARCHIVE_ROOT", defaults.archive_root),
            temp_prefix: env_or("OUTBOX_TEMP_PREFIX", defaults.temp_prefix),
            archive_leaf: env_or("OUTBOX_ARCHIVE_LEAF", defaults.archive_leaf),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the reserved namespace is usable and disjoint from the archive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let root = self.archive_root.trim_matches('/');
        if root.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "OUTBOX_ARCHIVE_ROOT".into(),
                message: "must not be empty".into(),
            });
        }
        if self.archive_leaf.is_empty() || self.archive_leaf.contains('/') {
            return Err(ConfigError::InvalidValue {
                key: "OUTBOX_ARCHIVE_LEAF".into(),
                message: "must be a single non-empty path segment".into(),
            });
        }

        let temp = self.temp_prefix.trim_start_matches('/');
        if temp.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "OUTBOX_TEMP_PREFIX".into(),
                message: "must not be empty".into(),
            });
        }
        if !self.temp_prefix.ends_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "OUTBOX_TEMP_PREFIX".into(),
                message: "must end with '/'".into(),
            });
        }

        let temp_head = temp.split('/').next().unwrap_or_default();
        let root_head = root.split('/').next().unwrap_or_default();
        if temp_head == root_head {
            return Err(ConfigError::InvalidValue {
                key: "OUTBOX_TEMP_PREFIX".into(),
                message: format!("must not live under the archive root {root_head:?}"),
            });
        }
        Ok(())
    }

    /// Reserved key for the temporary raw copy of one run.
    pub fn temp_key(&self, correlation_id: &str) -> String {
        format!("{}{}.eml", self.temp_prefix, correlation_id)
    }

    /// Whether a key lives in the reserved temporary namespace.
    pub fn is_reserved(&self, key: &str) -> bool {
        key.starts_with(&self.temp_prefix)
    }
}

/// SMTP relay settings for outbound transmission.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
}

impl SmtpConfig {
    /// Build config from environment variables.
    /// Returns `Ok(None)` if `OUTBOX_SMTP_HOST` is not set (dry-run transport).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(host) = std::env::var("OUTBOX_SMTP_HOST") else {
            return Ok(None);
        };

        let port = match std::env::var("OUTBOX_SMTP_PORT") {
            Ok(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "OUTBOX_SMTP_PORT".into(),
                message: format!("{e}"),
            })?,
            Err(_) => 587,
        };

        let username = std::env::var("OUTBOX_SMTP_USERNAME").unwrap_or_default();
        let password = SecretString::from(std::env::var("OUTBOX_SMTP_PASSWORD").unwrap_or_default());

        Ok(Some(Self {
            host,
            port,
            username,
            password,
        }))
    }
}

/// Local filesystem storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per bucket.
    pub root: std::path::PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: std::path::PathBuf::from("./data/buckets"),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        std::env::var("OUTBOX_STORAGE_ROOT")
            .map(|root| Self { root: root.into() })
            .unwrap_or_default()
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}
