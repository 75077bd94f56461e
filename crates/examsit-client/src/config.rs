//! Client configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Connection settings for the assessment server.
///
/// Note: Custom Debug impl masks the auth token to prevent accidental
/// exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the assessment server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for the student's session.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            auth_token: None,
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

/// Resolve `${VAR_NAME}` references in a string. Unset variables become
/// empty; an unclosed `${` is left as-is.
fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let Some(len) = rest[start + 2..].find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &rest[start + 2..start + 2 + len];
        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `examsit.toml` in the current directory
/// 2. `~/.config/examsit/config.toml`
///
/// Environment variable overrides: `EXAMSIT_BASE_URL`, `EXAMSIT_TOKEN`.
pub fn load_config() -> Result<ClientConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("examsit.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ClientConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ClientConfig::default(),
    };

    // Apply env var overrides
    if let Ok(url) = std::env::var("EXAMSIT_BASE_URL") {
        config.base_url = url;
    }
    if let Ok(token) = std::env::var("EXAMSIT_TOKEN") {
        config.auth_token = Some(token);
    }

    config.base_url = resolve_env_vars(&config.base_url);
    config.auth_token = config.auth_token.as_ref().map(|t| resolve_env_vars(t));

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("examsit"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_substitutes_references() {
        std::env::set_var("_EXAMSIT_HOST", "exam.example.com");
        std::env::set_var("_EXAMSIT_PORT", "8443");
        assert_eq!(
            resolve_env_vars("https://${_EXAMSIT_HOST}:${_EXAMSIT_PORT}/api"),
            "https://exam.example.com:8443/api"
        );
        std::env::remove_var("_EXAMSIT_HOST");
        std::env::remove_var("_EXAMSIT_PORT");
    }

    #[test]
    fn resolve_env_vars_edge_cases() {
        // Unset variables resolve to empty.
        std::env::remove_var("_EXAMSIT_UNSET");
        assert_eq!(resolve_env_vars("x${_EXAMSIT_UNSET}y"), "xy");
        // An unclosed reference passes through untouched.
        assert_eq!(resolve_env_vars("token-${OOPS"), "token-${OOPS");
        // No references at all.
        assert_eq!(resolve_env_vars("plain"), "plain");
    }

    #[test]
    fn default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examsit.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://exam.example.com"
auth_token = "tok-123"
request_timeout_secs = 10
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.base_url, "https://exam.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("tok-123"));
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn missing_explicit_path_fails() {
        let result = load_config_from(Some(Path::new("/nonexistent/examsit.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn debug_masks_token() {
        let config = ClientConfig {
            auth_token: Some("secret".into()),
            ..ClientConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }
}
