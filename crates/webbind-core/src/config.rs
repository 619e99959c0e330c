//! Window configuration file
//!
//! ```toml
//! title = "Minimal webview example"
//! width = 800
//! height = 600
//! hint = "none"
//! url = "https://en.m.wikipedia.org/wiki/Main_Page"
//! debug = true
//! init = ["window.external = {}"]
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::engine::SizeHint;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was attempted
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML or has wrong field types
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Initial window settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Window width
    pub width: i32,
    /// Window height
    pub height: i32,
    /// How width and height constrain the window
    pub hint: SizeHint,
    /// Page to open
    pub url: Option<String>,
    /// Enable developer tools
    pub debug: bool,
    /// Scripts injected into every page
    pub init: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "webbind".to_string(),
            width: 800,
            height: 600,
            hint: SizeHint::None,
            url: None,
            debug: false,
            init: Vec::new(),
        }
    }
}

impl WindowConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WindowConfig::from_toml_str("").unwrap();
        assert_eq!(config, WindowConfig::default());
        assert_eq!(config.width, 800);
        assert_eq!(config.hint, SizeHint::None);
    }

    #[test]
    fn test_full_config() {
        let config = WindowConfig::from_toml_str(
            r#"
            title = "go"
            width = 1024
            height = 768
            hint = "fixed"
            url = "https://google.com"
            debug = true
            init = ["a()", "b()"]
            "#,
        )
        .unwrap();
        assert_eq!(config.title, "go");
        assert_eq!((config.width, config.height), (1024, 768));
        assert_eq!(config.hint, SizeHint::Fixed);
        assert_eq!(config.url.as_deref(), Some("https://google.com"));
        assert!(config.debug);
        assert_eq!(config.init, vec!["a()", "b()"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = WindowConfig::from_toml_str("colour = \"blue\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bad_hint_rejected() {
        assert!(WindowConfig::from_toml_str("hint = \"huge\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "title = \"from file\"").unwrap();
        let config = WindowConfig::load(file.path()).unwrap();
        assert_eq!(config.title, "from file");
    }

    #[test]
    fn test_load_missing_file() {
        let err = WindowConfig::load("/nonexistent/webbind.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
