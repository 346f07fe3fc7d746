//! Configuration loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Config;
use crate::export::DocumentFormat;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the config file looked up in each tier directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Configuration tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    /// Embedded defaults
    Defaults = 0,
    /// `$CWD/mapping-compiler/config.yaml`
    Project = 1,
    /// `~/.mapping-compiler/config.yaml`
    User = 2,
    /// `--config` or `MAPPING_COMPILER_CONFIG_PATH`
    Explicit = 3,
    /// Individual environment variables
    Environment = 4,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Explicit => write!(f, "explicit"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Directories searched for each file-backed tier.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub project_dir: Option<PathBuf>,
    pub user_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover tier directories from the environment and the home directory.
    pub fn discover() -> Self {
        let user_dir = std::env::var("MAPPING_COMPILER_USER_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".mapping-compiler")));

        let project_dir = std::env::var("MAPPING_COMPILER_PROJECT_DIR")
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("mapping-compiler")));

        Self {
            project_dir,
            user_dir,
        }
    }

    /// Create paths with explicit directories.
    pub fn with_dirs(project_dir: Option<PathBuf>, user_dir: Option<PathBuf>) -> Self {
        Self {
            project_dir,
            user_dir,
        }
    }
}

/// Loads and merges configuration tiers.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: Config,
    /// Files that contributed to the merged config, lowest tier first.
    sources: Vec<(ConfigTier, PathBuf)>,
}

impl ConfigLoader {
    /// Load from discovered paths, with an optional explicit file on top.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover(), explicit)
    }

    /// Load configuration with explicit tier directories.
    ///
    /// Project and user files that fail to parse are skipped with a warning.
    /// An explicit file that fails to load is an error.
    pub fn load_with_paths(paths: ConfigPaths, explicit: Option<&Path>) -> Result<Self> {
        let mut tiers: Vec<Value> = Vec::new();
        let mut sources = Vec::new();

        // Tier 1: Defaults (embedded)
        tiers.push(
            serde_json::to_value(Config::default()).context("Failed to encode default config")?,
        );

        // Tiers 2 and 3: project then user
        let dirs = [
            (ConfigTier::Project, paths.project_dir.as_deref()),
            (ConfigTier::User, paths.user_dir.as_deref()),
        ];
        for (tier, dir) in dirs {
            let Some(dir) = dir else { continue };
            let file = dir.join(CONFIG_FILE_NAME);
            if let Some(value) = read_tier_file(&file, tier) {
                tiers.push(value);
                sources.push((tier, file));
            }
        }

        // Tier 4: explicit file
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("MAPPING_COMPILER_CONFIG_PATH").ok().map(PathBuf::from));
        if let Some(file) = explicit {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read config {}", file.display()))?;
            let value: Value = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", file.display()))?;
            tiers.push(value);
            sources.push((ConfigTier::Explicit, file));
        }

        let merged = deep_merge_all(tiers);
        let mut config: Config =
            serde_json::from_value(merged).context("Merged configuration is invalid")?;

        // Tier 5: environment variable overrides
        Self::apply_env_overrides(&mut config);

        for (tier, file) in &sources {
            debug!(tier = %tier, path = %file.display(), "Loaded config tier");
        }

        Ok(Self {
            paths,
            config,
            sources,
        })
    }

    /// Apply environment variable overrides to config.
    fn apply_env_overrides(config: &mut Config) {
        if let Ok(provider) = std::env::var("MAPPING_COMPILER_PROVIDER") {
            config.output.provider = provider;
        }

        if let Ok(version) = std::env::var("MAPPING_COMPILER_FORMAT_VERSION") {
            config.output.format_version = version;
        }

        if let Ok(format) = std::env::var("MAPPING_COMPILER_OUTPUT_FORMAT") {
            match DocumentFormat::from_str(&format) {
                Some(format) => config.output.format = format,
                None => warn!(value = %format, "Ignoring invalid MAPPING_COMPILER_OUTPUT_FORMAT"),
            }
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get mutable access to the configuration.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Files that contributed to the configuration, lowest tier first.
    pub fn sources(&self) -> &[(ConfigTier, PathBuf)] {
        &self.sources
    }
}

/// Read one optional tier file. Missing files are silent, broken ones warn.
fn read_tier_file(file: &Path, tier: ConfigTier) -> Option<Value> {
    if !file.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "Skipping unreadable config");
            return None;
        }
    };
    match serde_yaml::from_str::<Value>(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(tier = %tier, path = %file.display(), error = %e, "Skipping invalid config");
            None
        }
    }
}
