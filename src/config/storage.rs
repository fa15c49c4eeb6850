//! Configuration Storage
//!
//! Reads and writes `identity.json`.
//! Config location: ~/.oxideterm on macOS/Linux, %APPDATA%\OxideTerm on Windows

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::types::{IdentityConfig, CONFIG_VERSION};

/// Configuration storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Get the OxideTerm configuration directory
/// Returns %APPDATA%\OxideTerm on Windows, ~/.oxideterm on macOS/Linux
pub fn config_dir() -> Result<PathBuf, StorageError> {
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("OxideTerm"));
        }
    }

    dirs::home_dir()
        .map(|home| home.join(".oxideterm"))
        .ok_or(StorageError::NoConfigDir)
}

/// Get the identity config file path
pub fn identity_file() -> Result<PathBuf, StorageError> {
    Ok(config_dir()?.join("identity.json"))
}

/// Parse and check an `identity.json` document.
///
/// Syntax errors come back as [`StorageError::Json`]; well-formed documents
/// with unusable values as [`StorageError::Invalid`] or
/// [`StorageError::VersionTooNew`].
pub fn parse_config(contents: &str) -> Result<IdentityConfig, StorageError> {
    let config: IdentityConfig = serde_json::from_str(contents)?;

    if config.version > CONFIG_VERSION {
        return Err(StorageError::VersionTooNew {
            found: config.version,
            supported: CONFIG_VERSION,
        });
    }
    if config.keychain_service.trim().is_empty() {
        return Err(StorageError::Invalid {
            field: "keychain_service",
            reason: "must not be empty".to_string(),
        });
    }
    if config.key_line_width == 0 {
        return Err(StorageError::Invalid {
            field: "key_line_width",
            reason: "must be at least 1".to_string(),
        });
    }
    if config.connect_timeout_secs == 0 {
        return Err(StorageError::Invalid {
            field: "connect_timeout_secs",
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(config)
}

/// Identity config file on disk
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Storage at the platform default location
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            path: identity_file()?,
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config.
    ///
    /// A missing file yields defaults. A file that is not valid JSON is moved
    /// aside and defaults are used. Values that parse but cannot be honored
    /// are errors and the file is left untouched.
    pub async fn load(&self) -> Result<IdentityConfig, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No identity config at {:?}, using defaults", self.path);
                return Ok(IdentityConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        match parse_config(&contents) {
            Err(StorageError::Json(e)) => {
                warn!("Identity config unreadable: {}", e);
                let moved_to = self.quarantine().await?;
                warn!("Moved unreadable config to {:?}, using defaults", moved_to);
                Ok(IdentityConfig::default())
            }
            other => other,
        }
    }

    /// Write the config through a temp file and rename
    pub async fn save(&self, config: &IdentityConfig) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(config)?;
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        debug!("Saved identity config to {:?}", self.path);
        Ok(())
    }

    /// Move the current file out of the way, returning where it went
    async fn quarantine(&self) -> Result<PathBuf, StorageError> {
        let target = self.path.with_extension(format!(
            "json.corrupt.{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));
        fs::rename(&self.path, &target).await?;
        Ok(target)
    }
}
