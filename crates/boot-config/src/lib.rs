//! Layered configuration for the reactor bootstrap engine.
//!
//! [`BootConfig`] is assembled by `ortho_config` from, in increasing order of
//! precedence: built-in defaults, a TOML file named by `--config-path` (or
//! `REACTOR_BOOT_CONFIG_PATH`), `REACTOR_BOOT_*` environment variables and
//! command-line flags.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BOOTSTRAP_IMPORTS, DEFAULT_CORE_ARTIFACT_EXCLUDES, DEFAULT_DESCRIPTOR_FILE_NAME,
    DEFAULT_EXCLUDED_DIRECTORIES, DEFAULT_EXCLUDED_REPOSITORY_LAYOUTS, DEFAULT_LOG_FILTER,
    PARTICIPATION_API_PATTERN, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Name of the project, system or user property that enables extension
/// extensions for a single build.
pub const ALLOW_EXTENSIONS_PROPERTY: &str = "allowExtensions";

/// Resolved bootstrap configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "REACTOR_BOOT")]
#[serde(default)]
pub struct BootConfig {
    log_filter: String,
    log_format: LogFormat,
    descriptor_file_name: String,
    excluded_directories: Vec<String>,
    excluded_repository_layouts: Vec<String>,
    bootstrap_imports: Vec<String>,
    core_artifact_excludes: Vec<String>,
    allow_extension_extensions: bool,
    resolve_dependencies: bool,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
            descriptor_file_name: DEFAULT_DESCRIPTOR_FILE_NAME.to_owned(),
            excluded_directories: defaults::owned(DEFAULT_EXCLUDED_DIRECTORIES),
            excluded_repository_layouts: defaults::owned(DEFAULT_EXCLUDED_REPOSITORY_LAYOUTS),
            bootstrap_imports: defaults::owned(DEFAULT_BOOTSTRAP_IMPORTS),
            core_artifact_excludes: defaults::owned(DEFAULT_CORE_ARTIFACT_EXCLUDES),
            allow_extension_extensions: false,
            resolve_dependencies: true,
        }
    }
}

impl BootConfig {
    /// Tracing filter expression applied by the telemetry layer.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format of the telemetry layer.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// File name identifying a bootstrap project directory.
    #[must_use]
    pub fn descriptor_file_name(&self) -> &str {
        &self.descriptor_file_name
    }

    /// Directory names skipped while scanning for descriptors.
    #[must_use]
    pub fn excluded_directories(&self) -> &[String] {
        &self.excluded_directories
    }

    /// Repository layouts removed from bootstrap project repositories.
    #[must_use]
    pub fn excluded_repository_layouts(&self) -> &[String] {
        &self.excluded_repository_layouts
    }

    /// Package patterns every extension scope imports from the bootstrapper.
    #[must_use]
    pub fn bootstrap_imports(&self) -> &[String] {
        &self.bootstrap_imports
    }

    /// `group:artifact` keys excluded when resolving extension dependencies.
    #[must_use]
    pub fn core_artifact_excludes(&self) -> &[String] {
        &self.core_artifact_excludes
    }

    /// Whether extension scopes may carry their own extensions.
    #[must_use]
    pub const fn allow_extension_extensions(&self) -> bool {
        self.allow_extension_extensions
    }

    /// Whether bootstrap project dependencies are resolved before the
    /// `before` hooks run.
    #[must_use]
    pub const fn resolve_dependencies(&self) -> bool {
        self.resolve_dependencies
    }

    /// Replaces the tracing filter expression.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Replaces the excluded repository layouts.
    #[must_use]
    pub fn with_excluded_repository_layouts<I, S>(mut self, layouts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_repository_layouts = layouts.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the bootstrap import patterns.
    #[must_use]
    pub fn with_bootstrap_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_imports = imports.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables extension extensions for every project.
    #[must_use]
    pub fn with_allow_extension_extensions(mut self, allow: bool) -> Self {
        self.allow_extension_extensions = allow;
        self
    }

    /// Enables or disables dependency resolution ahead of the `before` hooks.
    #[must_use]
    pub fn with_resolve_dependencies(mut self, resolve: bool) -> Self {
        self.resolve_dependencies = resolve;
        self
    }
}
