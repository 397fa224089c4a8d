//! Capability discovery inside isolation scopes.
//!
//! Participants are registered against a scope and a [`CapabilityKind`] in a
//! [`CapabilityLocator`]. [`CapabilityDiscovery`] performs one lookup per
//! (scope, project) pair and memoizes the result on the project.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use reactor_boot_participation::{
    ActiveScopeGuard, BootParticipant, ContextualBootParticipant, ProjectModel, ScopeId,
};
use strum::Display;
use tracing::debug;

use crate::error::{BootstrapError, LocatorError};

const MEMO_PREFIX: &str = "capability@";

/// Hook shape a provider implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CapabilityKind {
    /// [`BootParticipant`].
    Basic,
    /// [`ContextualBootParticipant`].
    Contextual,
}

/// A discovered participant instance.
#[derive(Clone)]
pub enum CapabilityProvider {
    /// Participant receiving both sessions.
    Basic(Arc<dyn BootParticipant>),
    /// Participant receiving the shared boot context.
    Contextual(Arc<dyn ContextualBootParticipant>),
}

impl CapabilityProvider {
    /// Name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Basic(participant) => participant.name(),
            Self::Contextual(participant) => participant.name(),
        }
    }

    /// Hook shape of the provider.
    #[must_use]
    pub const fn kind(&self) -> CapabilityKind {
        match self {
            Self::Basic(_) => CapabilityKind::Basic,
            Self::Contextual(_) => CapabilityKind::Contextual,
        }
    }

    /// Whether both handles point at the same instance.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Basic(left), Self::Basic(right)) => {
                std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
            }
            (Self::Contextual(left), Self::Contextual(right)) => {
                std::ptr::addr_eq(Arc::as_ptr(left), Arc::as_ptr(right))
            }
            _ => false,
        }
    }
}

impl fmt::Debug for CapabilityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("kind", &self.kind())
            .field("name", &self.name())
            .finish()
    }
}

/// Lookup service for registered providers.
pub trait CapabilityLocator: Send + Sync {
    /// Providers of `kind` registered in `scope`.
    ///
    /// An empty result is normal.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError`] when the lookup infrastructure fails.
    fn lookup(
        &self,
        kind: CapabilityKind,
        scope: &ScopeId,
    ) -> Result<Vec<CapabilityProvider>, LocatorError>;
}

impl<T> CapabilityLocator for Arc<T>
where
    T: CapabilityLocator + ?Sized,
{
    fn lookup(
        &self,
        kind: CapabilityKind,
        scope: &ScopeId,
    ) -> Result<Vec<CapabilityProvider>, LocatorError> {
        (**self).lookup(kind, scope)
    }
}

/// In-memory registration table keyed by scope and capability kind.
#[derive(Default)]
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<(ScopeId, CapabilityKind), Vec<CapabilityProvider>>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a basic participant in `scope`.
    pub fn register_basic(&self, scope: ScopeId, participant: Arc<dyn BootParticipant>) {
        self.register(scope, CapabilityProvider::Basic(participant));
    }

    /// Registers a contextual participant in `scope`.
    pub fn register_contextual(
        &self,
        scope: ScopeId,
        participant: Arc<dyn ContextualBootParticipant>,
    ) {
        self.register(scope, CapabilityProvider::Contextual(participant));
    }

    /// Registers `provider` in `scope` after any earlier registrations.
    pub fn register(&self, scope: ScopeId, provider: CapabilityProvider) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry((scope, provider.kind()))
            .or_default()
            .push(provider);
    }

    /// Drops every registration of `scope`.
    pub fn unregister_scope(&self, scope: &ScopeId) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|(registered, _), _| registered != scope);
    }
}

impl CapabilityLocator for CapabilityRegistry {
    fn lookup(
        &self,
        kind: CapabilityKind,
        scope: &ScopeId,
    ) -> Result<Vec<CapabilityProvider>, LocatorError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .get(&(scope.clone(), kind))
            .cloned()
            .unwrap_or_default())
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("CapabilityRegistry")
            .field("registrations", &entries.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

/// Memoized provider list stored on a project.
#[derive(Debug, Clone)]
struct DiscoveredProviders(Vec<CapabilityProvider>);

/// Per-scope, per-project provider discovery.
pub struct CapabilityDiscovery {
    locator: Arc<dyn CapabilityLocator>,
}

impl CapabilityDiscovery {
    /// Wraps `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn CapabilityLocator>) -> Self {
        Self { locator }
    }

    /// Providers visible to `project` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Lookup`] when the locator fails.
    pub fn discover(
        &self,
        scope: &ScopeId,
        project: &ProjectModel,
    ) -> Result<Vec<CapabilityProvider>, BootstrapError> {
        self.discover_with(scope, project, || Ok(Vec::new()))
    }

    /// Providers visible to `project` in `scope` and in the extension scopes
    /// returned by `extension_scopes`.
    ///
    /// `extension_scopes` runs only when nothing is memoized yet. Basic
    /// providers of every scope come first, contextual ones second.
    ///
    /// # Errors
    ///
    /// Propagates errors from `extension_scopes` and returns
    /// [`BootstrapError::Lookup`] when the locator fails.
    pub fn discover_with<F>(
        &self,
        scope: &ScopeId,
        project: &ProjectModel,
        extension_scopes: F,
    ) -> Result<Vec<CapabilityProvider>, BootstrapError>
    where
        F: FnOnce() -> Result<Vec<ScopeId>, BootstrapError>,
    {
        let key = format!("{MEMO_PREFIX}{scope}");
        if let Some(memo) = project.context().get::<DiscoveredProviders>(&key) {
            return Ok(memo.0.clone());
        }

        let mut scopes = vec![scope.clone()];
        scopes.extend(extension_scopes()?);

        let _active = ActiveScopeGuard::enter(scope.clone());
        let mut providers = Vec::new();
        for kind in [CapabilityKind::Basic, CapabilityKind::Contextual] {
            for candidate in &scopes {
                let found = self
                    .locator
                    .lookup(kind, candidate)
                    .map_err(|source| BootstrapError::Lookup {
                        scope: candidate.clone(),
                        source,
                    })?;
                providers.extend(found);
            }
        }
        debug!(
            target: "reactor_boot::discovery",
            scope = %scope,
            project = %project.coordinate(),
            providers = providers.len(),
            "discovered capability providers"
        );
        project
            .context()
            .insert(key, DiscoveredProviders(providers.clone()));
        Ok(providers)
    }
}

impl fmt::Debug for CapabilityDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDiscovery").finish_non_exhaustive()
    }
}
