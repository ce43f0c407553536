//! Configuration loading and validation

use anyhow::{bail, Result};
use prime_core::cache_key_for_path;
use prime_sync::api::DEFAULT_MAX_RESULTS;
use prime_sync::{CacheSettings, HttpSettings};
use secrecy::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Prefix of every cache key written by this tool
pub const CACHE_PLUGIN_NAME: &str = "ciscoprime";

/// Main configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// API base, e.g. https://prime.local/webacs/api/v4
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<Secret<String>>,
    /// Page size for list queries
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    #[serde(default = "default_true")]
    pub validate_certs: bool,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            user: None,
            password: None,
            max_results: default_max_results(),
            validate_certs: true,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryConfig {
    /// Leave out devices Prime marks as unmanaged
    #[serde(default = "default_true")]
    pub exclude_unmanaged: bool,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            exclude_unmanaged: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Directory for cache files
    #[serde(default = "default_cache_connection")]
    pub connection: PathBuf,
    /// Seconds before cached responses expire (0 = never)
    #[serde(default = "default_cache_timeout")]
    pub timeout_secs: u64,
    /// Ignore cached responses and refetch everything
    #[serde(default)]
    pub force_update: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            connection: default_cache_connection(),
            timeout_secs: default_cache_timeout(),
            force_update: false,
        }
    }
}

fn default_cache_connection() -> PathBuf {
    PathBuf::from("/tmp")
}

fn default_cache_timeout() -> u64 {
    3600
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub force_update: bool,
}

/// Fully resolved settings for one run
#[derive(Debug)]
pub struct Settings {
    pub endpoint: String,
    pub http: HttpSettings,
    pub max_results: u32,
    pub exclude_unmanaged: bool,
    pub cache: CacheSettings,
    pub cache_dir: PathBuf,
    pub cache_timeout: Duration,
    pub cache_key: String,
}

impl Config {
    /// Merge overrides over file values and check required options
    pub fn resolve(self, overrides: Overrides, source: &Path) -> Result<Settings> {
        let Some(endpoint) = overrides.endpoint.or(self.api.endpoint) else {
            bail!("api endpoint is not set (api.endpoint or CISCOPRIME_API_URL)");
        };
        let Some(user) = overrides.user.or(self.api.user) else {
            bail!("api user is not set (api.user or CISCOPRIME_USER)");
        };
        let Some(password) = overrides.password.map(Secret::new).or(self.api.password) else {
            bail!("api password is not set (api.password or CISCOPRIME_PASSWORD)");
        };

        let source = source
            .canonicalize()
            .unwrap_or_else(|_| source.to_path_buf());

        Ok(Settings {
            endpoint,
            http: HttpSettings {
                user,
                password,
                validate_certs: self.api.validate_certs,
                timeout: Duration::from_secs(self.api.timeout_secs),
            },
            max_results: self.api.max_results,
            exclude_unmanaged: self.inventory.exclude_unmanaged,
            cache: CacheSettings {
                enabled: self.cache.enabled,
                force_update: self.cache.force_update || overrides.force_update,
            },
            cache_dir: self.cache.connection,
            cache_timeout: Duration::from_secs(self.cache.timeout_secs),
            cache_key: cache_key_for_path(CACHE_PLUGIN_NAME, &source),
        })
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

const DEFAULT_CONFIG: &str = r#"# prime-inventory configuration

[api]
# Prime API base URL (or CISCOPRIME_API_URL)
endpoint = "https://prime.local/webacs/api/v4"
# Credentials; prefer CISCOPRIME_USER / CISCOPRIME_PASSWORD
# user = "ansible"
# password = "ansible_password"
# Page size, matches the Prime default
max_results = 1000
validate_certs = true
timeout_secs = 60

[inventory]
# Leave out hosts marked "unmanaged" in Prime
exclude_unmanaged = true

[cache]
enabled = true
connection = "/tmp"
timeout_secs = 86400
force_update = false
"#;

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    fn overrides_with_credentials() -> Overrides {
        Overrides {
            endpoint: Some("https://cli/api".to_string()),
            user: Some("cli-user".to_string()),
            password: Some("cli-pass".to_string()),
            force_update: false,
        }
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.api.max_results, 1000);
        assert!(config.api.validate_certs);
        assert_eq!(config.api.timeout_secs, 60);
        assert!(config.inventory.exclude_unmanaged);
        assert!(!config.cache.enabled);
        assert!(!config.cache.force_update);
        assert_eq!(config.cache.connection, PathBuf::from("/tmp"));
    }

    #[test]
    fn test_default_file_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prime-inventory.toml");
        save_default_config(&path).unwrap();
        assert!(save_default_config(&path).is_err());

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.api.endpoint.as_deref(),
            Some("https://prime.local/webacs/api/v4")
        );
        assert!(config.cache.enabled);
        assert_eq!(config.cache.timeout_secs, 86400);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();
        assert!(config.api.endpoint.is_none());
    }

    #[test]
    fn test_resolve_overrides_file() {
        let config: Config = toml::from_str(
            r#"
            [api]
            endpoint = "https://file/api"
            user = "file-user"
            password = "file-pass"
            validate_certs = false
            timeout_secs = 15

            [cache]
            enabled = true
            "#,
        )
        .unwrap();

        let settings = config
            .resolve(overrides_with_credentials(), Path::new("inventory.toml"))
            .unwrap();
        assert_eq!(settings.endpoint, "https://cli/api");
        assert_eq!(settings.http.user, "cli-user");
        assert_eq!(settings.http.password.expose_secret(), "cli-pass");
        assert!(!settings.http.validate_certs);
        assert_eq!(settings.http.timeout, Duration::from_secs(15));
        assert!(settings.cache.enabled);
        assert!(!settings.cache.force_update);
        assert!(settings.cache_key.starts_with("ciscoprime_"));
    }

    #[test]
    fn test_resolve_from_file_only() {
        let config: Config = toml::from_str(
            r#"
            [api]
            endpoint = "https://file/api"
            user = "file-user"
            password = "file-pass"
            "#,
        )
        .unwrap();

        let overrides = Overrides {
            force_update: true,
            ..Default::default()
        };
        let settings = config.resolve(overrides, Path::new("inventory.toml")).unwrap();
        assert_eq!(settings.endpoint, "https://file/api");
        assert_eq!(settings.http.password.expose_secret(), "file-pass");
        assert!(settings.cache.force_update);
    }

    #[test]
    fn test_resolve_requires_credentials() {
        let err = Config::default()
            .resolve(Overrides::default(), Path::new("inventory.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        let overrides = Overrides {
            password: None,
            ..overrides_with_credentials()
        };
        let err = Config::default()
            .resolve(overrides, Path::new("inventory.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        // Flat keys from older layouts must not be silently ignored
        let err = toml::from_str::<Config>(r#"api_endpoint = "https://file/api""#).unwrap_err();
        assert!(err.to_string().contains("api_endpoint"));

        let err = toml::from_str::<Config>(
            r#"
            [cache]
            enabled = true
            timeout = 60
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
