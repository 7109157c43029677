//! Configuration loading for the hermod CLI.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.hermod/config.toml` (user)
//! 3. `/etc/hermod/config.toml` (system)
//!
//! Missing files fall back to defaults (`HERMOD_API_URL` env or the
//! local backend).
//!
//! The token pair from the last login is kept in `~/.hermod/tokens.json`
//! with mandatory permission checks (must be 0600 or 0400 on Unix).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::TokenPair;
use crate::error::{HermodError, Result};
use crate::http;

/// CLI configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API root (default: `HERMOD_API_URL` or the local backend).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    std::env::var("HERMOD_API_URL").unwrap_or_else(|_| http::DEFAULT_BASE_URL.to_string())
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load configuration from the standard locations; defaults when no
    /// file exists. An explicit path that does not exist is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit_path)? else {
            return Ok(Config::default());
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            HermodError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HermodError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HermodError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hermod").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/hermod/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

/// Default location of the stored token pair.
pub fn default_token_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hermod")
        .join("tokens.json")
}

#[derive(serde::Serialize, Deserialize)]
struct StoredTokens {
    access: String,
    refresh: String,
}

/// Load the stored token pair, if any. Enforces file permissions.
pub fn load_tokens(path: &Path) -> Result<Option<TokenPair>> {
    if !path.exists() {
        return Ok(None);
    }
    check_permissions(path)?;
    let content = fs::read_to_string(path).map_err(|e| {
        HermodError::Configuration(format!("Failed to read token file {path:?}: {e}"))
    })?;
    let stored: StoredTokens = serde_json::from_str(&content)?;
    Ok(Some(TokenPair::new(stored.access, stored.refresh)))
}

/// Persist the token pair with owner-only permissions.
pub fn save_tokens(path: &Path, tokens: &TokenPair) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            HermodError::Configuration(format!(
                "Failed to create token dir {}: {e}",
                parent.display()
            ))
        })?;
    }
    let stored = StoredTokens {
        access: tokens.access.clone(),
        refresh: tokens.refresh.clone(),
    };
    let json = serde_json::to_string_pretty(&stored)?;
    fs::write(path, &json).map_err(|e| {
        HermodError::Configuration(format!("Failed to write token file {path:?}: {e}"))
    })?;
    restrict_permissions(path)?;
    Ok(())
}

/// Remove the stored token pair.
pub fn clear_tokens(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HermodError::Configuration(format!(
            "Failed to remove token file {path:?}: {e}"
        ))),
    }
}

/// Check that the token file has secure permissions (0600 or 0400).
#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path).map_err(|e| {
        HermodError::Configuration(format!("Failed to stat token file {path:?}: {e}"))
    })?;

    let mode = metadata.permissions().mode();
    if mode & 0o077 != 0 {
        return Err(HermodError::Configuration(format!(
            "Token file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
            mode & 0o777
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
        HermodError::Configuration(format!("Failed to set permissions on {path:?}: {e}"))
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 30);
        assert!(!config.api.base_url.is_empty());
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [api]
            base_url = "https://erp.example.com/api/"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "https://erp.example.com/api/");
        // Defaults preserved
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [api]
            base_url = "https://erp.example.com/api/"
            timeout_secs = 10
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn tokens_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        save_tokens(&path, &TokenPair::new("acc", "ref")).unwrap();
        let loaded = load_tokens(&path).unwrap().unwrap();
        assert_eq!(loaded.access, "acc");
        assert_eq!(loaded.refresh, "ref");
    }

    #[test]
    fn missing_tokens_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        assert!(load_tokens(&path).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn saved_tokens_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        save_tokens(&path, &TokenPair::new("acc", "ref")).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn loose_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        save_tokens(&path, &TokenPair::new("acc", "ref")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(load_tokens(&path).is_err());
    }

    #[test]
    fn clear_missing_tokens_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        clear_tokens(&dir.path().join("tokens.json")).unwrap();
    }
}
