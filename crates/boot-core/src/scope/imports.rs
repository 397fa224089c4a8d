use reactor_boot_participation::ScopeId;

use super::{HostSurface, ImportSource, PackagePattern, ScopeListener, ScopeUniverse};
use crate::error::ScopeError;

/// Wires the bootstrapper's shared packages into extension scopes.
///
/// Registered as a [`ScopeListener`], it applies the imports to any scope
/// whose identifier carries one of its prefixes, whoever created the scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapImports {
    prefixes: Vec<String>,
    patterns: Vec<PackagePattern>,
}

impl BootstrapImports {
    /// Builds the listener for the given prefixes and package patterns.
    #[must_use]
    pub fn new<P, S>(prefixes: Vec<String>, patterns: P) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes,
            patterns: patterns.into_iter().map(PackagePattern::new).collect(),
        }
    }

    /// Identifier prefixes that mark extension scopes.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Package patterns imported into every extension scope.
    #[must_use]
    pub fn patterns(&self) -> &[PackagePattern] {
        &self.patterns
    }

    /// Whether `scope` is an extension scope of this bootstrapper.
    #[must_use]
    pub fn matches(&self, scope: &ScopeId) -> bool {
        self.prefixes.iter().any(|prefix| scope.starts_with(prefix))
    }

    /// Imports every pattern from the bootstrapper surface into `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NotFound`] when `scope` no longer exists.
    pub fn apply(&self, universe: &ScopeUniverse, scope: &ScopeId) -> Result<(), ScopeError> {
        for pattern in &self.patterns {
            universe.import_from(
                scope,
                ImportSource::Host(HostSurface::Bootstrapper),
                pattern.clone(),
            )?;
        }
        Ok(())
    }
}

impl ScopeListener for BootstrapImports {
    fn scope_created(&self, universe: &ScopeUniverse, scope: &ScopeId) {
        if !self.matches(scope) {
            return;
        }
        if let Err(error) = self.apply(universe, scope) {
            tracing::debug!(
                target: "reactor_boot::scope",
                event = "bootstrap_imports_skipped",
                scope = %scope,
                error = %error,
                "scope vanished before bootstrap imports were applied"
            );
        }
    }
}
