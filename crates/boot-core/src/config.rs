//! Loading of [`BootConfig`] behind a seam tests can replace.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use reactor_boot_config::BootConfig;

/// Source of the bootstrap configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error.
    fn load(&self) -> Result<BootConfig, Arc<OrthoError>>;
}

/// Loader that delegates to [`BootConfig::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<BootConfig, Arc<OrthoError>> {
        BootConfig::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticConfigLoader {
    config: BootConfig,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: BootConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<BootConfig, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn described(result: Result<BootConfig, Arc<OrthoError>>) -> Result<BootConfig, String> {
        result.map_err(|error| error.to_string())
    }

    #[test]
    fn system_loader_reads_the_process_layers() {
        let expected = described(BootConfig::load_from_iter(std::env::args_os()));
        assert_eq!(described(SystemConfigLoader.load()), expected);
    }

    #[test]
    fn static_loader_returns_its_configuration() {
        let config = BootConfig::default().with_resolve_dependencies(false);
        let loaded = StaticConfigLoader::new(config.clone())
            .load()
            .expect("static configuration");
        assert_eq!(loaded, config);
    }
}
