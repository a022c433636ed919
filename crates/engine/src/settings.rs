//! Persistent cloner settings.
//!
//! Stored as TOML. Every field but `nonce_secret` has a default, so a
//! partial file is valid as long as it carries the secret:
//!
//! ```toml
//! post_types = ["post", "page", "product"]
//! action_prefix = "clone_to_"
//! max_sites = 50
//! nonce_secret = "5f0c8e0d6b7c4a1e9d2f3b4a5c6d7e8f"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SettingsError;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Content types that get the clone bulk actions.
    pub post_types: Vec<String>,
    /// Prefix of the bulk action name; the destination tenant id follows it.
    pub action_prefix: String,
    /// Upper bound on the number of destination sites offered.
    pub max_sites: usize,
    /// Key for signing the redirect notice token.
    pub nonce_secret: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            post_types: vec!["post".to_string(), "page".to_string()],
            action_prefix: "clone_to_".to_string(),
            max_sites: 50,
            nonce_secret: String::new(),
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl Settings {
    /// Read and validate settings from `path`.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            toml::from_str(&content).map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// First-run setup: write defaults with a fresh signing secret unless a
    /// settings file already exists, then return the effective settings.
    /// An existing file is never overwritten.
    pub fn activate(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            return Self::load(path);
        }
        let settings = Settings {
            nonce_secret: format!("{:032x}", rand::random::<u128>()),
            ..Settings::default()
        };
        settings.save(path)?;
        info!(path = %path.display(), "wrote default settings");
        Ok(settings)
    }

    /// Whether items of `post_type` take part in bulk cloning.
    pub fn participates(&self, post_type: &str) -> bool {
        self.post_types.iter().any(|t| t == post_type)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.action_prefix.is_empty() {
            return Err(SettingsError::Invalid(
                "action_prefix must not be empty".to_string(),
            ));
        }
        if self.nonce_secret.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "nonce_secret must not be empty".to_string(),
            ));
        }
        if self.max_sites == 0 {
            return Err(SettingsError::Invalid(
                "max_sites must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.post_types, vec!["post", "page"]);
        assert_eq!(s.action_prefix, "clone_to_");
        assert_eq!(s.max_sites, 50);
        assert!(s.participates("page"));
        assert!(!s.participates("attachment"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitecopy.toml");
        std::fs::write(&path, "post_types = [\"product\"]\nnonce_secret = \"s3cret\"\n").unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.post_types, vec!["product"]);
        assert_eq!(s.max_sites, 50);
    }

    #[test]
    fn test_activate_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitecopy.toml");
        let first = Settings::activate(&path).unwrap();
        assert_eq!(first.nonce_secret.len(), 32);
        assert!(path.exists());

        let mut edited = first.clone();
        edited.post_types.push("product".to_string());
        edited.save(&path).unwrap();

        let second = Settings::activate(&path).unwrap();
        assert_eq!(second, edited);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitecopy.toml");
        std::fs::write(&path, "max_sites = 0\nnonce_secret = \"s3cret\"\n").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Invalid(_))
        ));
        std::fs::write(&path, "max_sites = \"many\"\n").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_or_blank_secret_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitecopy.toml");
        for content in ["post_types = [\"post\"]\n", "nonce_secret = \"  \"\n"] {
            std::fs::write(&path, content).unwrap();
            match Settings::load(&path) {
                Err(SettingsError::Invalid(msg)) => assert!(msg.contains("nonce_secret")),
                other => panic!("expected invalid settings, got {:?}", other),
            }
        }
    }
}
