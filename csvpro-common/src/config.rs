//! Configuration loading and root folder resolution
//!
//! Two tiers, as for every CSV Pro service:
//! 1. **TOML bootstrap**: root folder, database path, listen address, upload
//!    cap, billing secret, logging. Read once at startup.
//! 2. **Database runtime**: row limits and listing sizes from the `settings`
//!    table (see [`crate::db::settings`]).
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CSVPRO_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CSVPRO_ROOT_FOLDER";

/// Environment variable supplying the billing webhook secret
pub const WEBHOOK_SECRET_ENV: &str = "CSVPRO_WEBHOOK_SECRET";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "csvpro.db";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. Every field has a default so
/// a partial (or absent) file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    pub root_folder: Option<PathBuf>,

    /// Explicit database path, overrides `<root_folder>/csvpro.db`
    pub database_path: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    pub bind_host: String,

    /// HTTP server port
    pub port: u16,

    /// Maximum accepted request body, in bytes
    pub max_upload_bytes: usize,

    /// Billing webhook settings
    pub billing: BillingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_path: None,
            bind_host: "127.0.0.1".to_string(),
            port: 5780,
            max_upload_bytes: 10 * 1024 * 1024,
            billing: BillingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Billing webhook configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Shared secret used to sign webhook payloads
    pub webhook_secret: Option<String>,

    /// Accepted clock skew between signer and receiver, in seconds
    pub signature_tolerance_secs: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            signature_tolerance_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the config file, falling back to defaults when it is missing
    ///
    /// An explicit path that does not exist, or the platform default path
    /// not existing, is not an error: the service starts on defaults.
    /// A file that exists but fails to parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        match candidate {
            Some(p) if p.exists() => {
                let config = Self::load(&p)?;
                info!("Loaded configuration from {}", p.display());
                Ok(config)
            }
            Some(p) => {
                warn!("Config file not found at {}, using defaults", p.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Webhook secret: environment first, then TOML
    pub fn webhook_secret(&self) -> Option<String> {
        std::env::var(WEBHOOK_SECRET_ENV)
            .ok()
            .or_else(|| self.billing.webhook_secret.clone())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Platform config file location (`<config_dir>/csvpro/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("csvpro").join("config.toml"))
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Root folder given on the command line
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Root folder from the TOML config
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    /// Resolve the root folder
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("[{}] Root folder from command line: {}", self.module_name, path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                info!("[{}] Root folder from {}: {}", self.module_name, ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            info!("[{}] Root folder from config file: {}", self.module_name, path.display());
            return path.clone();
        }

        let path = default_root_folder();
        info!("[{}] Root folder (default): {}", self.module_name, path.display());
        path
    }
}

/// Creates the root folder and derives paths inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// `<root_folder>/csvpro.db`
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("csvpro"))
        .unwrap_or_else(|| PathBuf::from("./csvpro_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config.port, 5780);
        assert_eq!(config.bind_host, "127.0.0.1");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.billing.signature_tolerance_secs, 300);
        assert!(config.billing.webhook_secret.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = TomlConfig::parse(
            r#"
            port = 9000
            root_folder = "/srv/csvpro"

            [billing]
            webhook_secret = "whsec_test"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/csvpro")));
        assert_eq!(config.billing.webhook_secret.as_deref(), Some("whsec_test"));
        assert_eq!(config.billing.signature_tolerance_secs, 300);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::parse("port = \"not a number\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_database_path_inside_root() {
        let init = RootFolderInitializer::new(PathBuf::from("/tmp/csvpro-root"));
        assert_eq!(init.database_path(), PathBuf::from("/tmp/csvpro-root/csvpro.db"));
    }
}
