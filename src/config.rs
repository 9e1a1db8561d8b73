//! Converter configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{SqlPortError, SqlPortResult};
use crate::transformer::RuleOptions;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG: &str = "sqlport.toml";

/// Main converter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    /// Path to the table catalog (TOML or JSON)
    pub catalog_path: Option<PathBuf>,

    /// Pretty-print converted statements
    #[serde(default = "default_true")]
    pub format: bool,

    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Convert statements on the rayon pool
    #[serde(default)]
    pub parallel: bool,

    /// Bound on fixed-point passes for nested function rewrites
    #[serde(default = "default_max_rewrite_passes")]
    pub max_rewrite_passes: usize,

    #[serde(default = "default_true")]
    pub strip_set_commands: bool,

    /// Lint the output for leftover source-dialect constructs
    #[serde(default = "default_true")]
    pub validate: bool,
}

fn default_true() -> bool { true }

fn default_indent_width() -> usize { 4 }

fn default_max_rewrite_passes() -> usize { 8 }

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            format: true,
            indent_width: default_indent_width(),
            parallel: false,
            max_rewrite_passes: default_max_rewrite_passes(),
            strip_set_commands: true,
            validate: true,
        }
    }
}

impl ConverterConfig {
    /// Create a new configuration builder
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> SqlPortResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read a configuration file.
    pub fn from_file(path: &Path) -> SqlPortResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SqlPortError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load configuration.
    ///
    /// Order: `explicit`, then `./sqlport.toml`, then
    /// `<config dir>/sqlport/config.toml`, then defaults. An explicit path
    /// that does not exist is an error; the implicit locations are optional.
    pub fn load(explicit: Option<&Path>) -> SqlPortResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for candidate in Self::search_paths() {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading configuration");
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sqlport").join("config.toml"));
        }
        paths
    }

    /// Options passed to the rewrite rules.
    pub fn rule_options(&self) -> RuleOptions {
        RuleOptions {
            max_rewrite_passes: self.max_rewrite_passes,
            strip_set_commands: self.strip_set_commands,
        }
    }
}

/// Builder for ConverterConfig
#[derive(Debug, Default)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    /// Set the catalog path
    pub fn catalog(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.catalog_path = Some(path.into());
        self
    }

    pub fn format(mut self, enabled: bool) -> Self {
        self.config.format = enabled;
        self
    }

    pub fn indent_width(mut self, width: usize) -> Self {
        self.config.indent_width = width;
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.config.parallel = enabled;
        self
    }

    pub fn max_rewrite_passes(mut self, passes: usize) -> Self {
        self.config.max_rewrite_passes = passes;
        self
    }

    pub fn strip_set_commands(mut self, enabled: bool) -> Self {
        self.config.strip_set_commands = enabled;
        self
    }

    pub fn validate(mut self, enabled: bool) -> Self {
        self.config.validate = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConverterConfig {
        self.config
    }
}
