use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::query::KeyDigest;

/// Pagination configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Page sizes offered for selection
    pub page_sizes: Vec<usize>,

    /// Page size used until the user picks another
    pub default_page_size: usize,

    /// Maximum number of page buttons (at least 5)
    pub max_buttons: usize,

    /// Hide the first/last buttons
    pub hide_edges: bool,

    /// Show the page-size selector
    pub show_page_size: bool,

    /// Show the "from-to of total" text
    pub show_summary_text: bool,

    /// Show the jump-to-page input
    pub show_page_jump: bool,

    /// How cache keys are encoded
    pub key_digest: KeyDigest,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_sizes: vec![25, 50, 100],
            default_page_size: 25,
            max_buttons: 7,
            hide_edges: false,
            show_page_size: true,
            show_summary_text: true,
            show_page_jump: false,
            key_digest: KeyDigest::Sha256,
        }
    }
}

impl GridConfig {
    /// Initialize configuration from defaults, the first config file found
    /// and the environment, in that order
    pub async fn init() -> Result<Self> {
        debug!("Initializing configuration");

        let mut config = Self::default();

        match Self::load_from_file().await {
            Ok(Some(file_config)) => config.merge_with(file_config),
            Ok(None) => debug!("No configuration file found, using defaults"),
            Err(e) => warn!("Ignoring unreadable configuration file: {}", e),
        }

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Candidate configuration files, highest priority first
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("./.gridpage.json"),
            PathBuf::from("./gridpage.json"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("gridpage").join("gridpage.json"));
        }

        paths
    }

    /// Load the first configuration file that exists
    pub async fn load_from_file() -> Result<Option<Self>> {
        for path in Self::config_paths() {
            if path.exists() {
                return Self::load_from_path(&path).await.map(Some);
            }
        }
        Ok(None)
    }

    /// Load configuration from a specific JSON file; missing keys take
    /// their defaults
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from `GRIDPAGE_*` environment variables
    pub fn load_from_env(&mut self) {
        self.apply_env(|name| std::env::var(name).ok());
    }

    /// Apply variables from `lookup`; unparsable values are ignored
    pub fn apply_env<L>(&mut self, lookup: L)
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(sizes) = lookup("GRIDPAGE_PAGE_SIZES") {
            let parsed: Vec<usize> = sizes
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .filter(|size| *size > 0)
                .collect();
            if parsed.is_empty() {
                warn!("GRIDPAGE_PAGE_SIZES has no usable entries: {}", sizes);
            } else {
                self.page_sizes = parsed;
            }
        }

        if let Some(size) = lookup("GRIDPAGE_PAGE_SIZE").and_then(|s| s.trim().parse().ok()) {
            self.default_page_size = size;
        }

        if let Some(max) = lookup("GRIDPAGE_MAX_BUTTONS").and_then(|s| s.trim().parse().ok()) {
            self.max_buttons = max;
        }

        if let Some(digest) = lookup("GRIDPAGE_KEY_DIGEST") {
            match digest.parse() {
                Ok(digest) => self.key_digest = digest,
                Err(e) => warn!("Ignoring GRIDPAGE_KEY_DIGEST: {}", e),
            }
        }

        if let Some(show) = lookup("GRIDPAGE_SHOW_PAGE_JUMP") {
            self.show_page_jump = parse_flag(&show);
        }

        if let Some(hide) = lookup("GRIDPAGE_HIDE_EDGES") {
            self.hide_edges = parse_flag(&hide);
        }
    }

    /// Merge another configuration into this one; values equal to the
    /// defaults do not override
    pub fn merge_with(&mut self, other: Self) {
        let defaults = Self::default();

        if other.page_sizes != defaults.page_sizes {
            self.page_sizes = other.page_sizes;
        }
        if other.default_page_size != defaults.default_page_size {
            self.default_page_size = other.default_page_size;
        }
        if other.max_buttons != defaults.max_buttons {
            self.max_buttons = other.max_buttons;
        }
        if other.hide_edges != defaults.hide_edges {
            self.hide_edges = other.hide_edges;
        }
        if other.show_page_size != defaults.show_page_size {
            self.show_page_size = other.show_page_size;
        }
        if other.show_summary_text != defaults.show_summary_text {
            self.show_summary_text = other.show_summary_text;
        }
        if other.show_page_jump != defaults.show_page_jump {
            self.show_page_jump = other.show_page_jump;
        }
        if other.key_digest != defaults.key_digest {
            self.key_digest = other.key_digest;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_sizes.is_empty() {
            return Err(anyhow::anyhow!("At least one page size is required"));
        }

        if self.page_sizes.contains(&0) {
            return Err(anyhow::anyhow!("page_sizes must be greater than 0"));
        }

        if self.default_page_size == 0 {
            return Err(anyhow::anyhow!("default_page_size must be greater than 0"));
        }

        if self.max_buttons < 5 {
            return Err(anyhow::anyhow!("max_buttons must be at least 5"));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = GridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_sizes, vec![25, 50, 100]);
        assert_eq!(config.key_digest, KeyDigest::Sha256);
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("GRIDPAGE_PAGE_SIZES", "10, 20,abc"),
            ("GRIDPAGE_PAGE_SIZE", "20"),
            ("GRIDPAGE_MAX_BUTTONS", "9"),
            ("GRIDPAGE_KEY_DIGEST", "raw"),
            ("GRIDPAGE_SHOW_PAGE_JUMP", "true"),
            ("GRIDPAGE_HIDE_EDGES", "0"),
        ]);

        let mut config = GridConfig::default();
        config.apply_env(|name| vars.get(name).cloned());

        assert_eq!(config.page_sizes, vec![10, 20]);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.max_buttons, 9);
        assert_eq!(config.key_digest, KeyDigest::Raw);
        assert!(config.show_page_jump);
        assert!(!config.hide_edges);
    }

    #[test]
    fn test_env_ignores_garbage() {
        let vars = env(&[
            ("GRIDPAGE_PAGE_SIZES", "x,0"),
            ("GRIDPAGE_PAGE_SIZE", "lots"),
            ("GRIDPAGE_KEY_DIGEST", "md5"),
        ]);

        let mut config = GridConfig::default();
        config.apply_env(|name| vars.get(name).cloned());
        assert_eq!(config, GridConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = GridConfig {
            max_buttons: 4,
            ..GridConfig::default()
        };
        assert!(config.validate().is_err());

        config.max_buttons = 5;
        config.page_sizes = vec![10, 0];
        assert!(config.validate().is_err());

        config.page_sizes.clear();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "page_sizes": [10, 30], "key_digest": "raw" }}"#).unwrap();

        let loaded = GridConfig::load_from_path(file.path()).await.unwrap();
        assert_eq!(loaded.page_sizes, vec![10, 30]);
        assert_eq!(loaded.key_digest, KeyDigest::Raw);
        assert_eq!(loaded.max_buttons, 7);

        let mut config = GridConfig::default();
        config.merge_with(loaded);
        assert_eq!(config.page_sizes, vec![10, 30]);
        assert_eq!(config.default_page_size, 25);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(GridConfig::load_from_path(file.path()).await.is_err());
    }
}
