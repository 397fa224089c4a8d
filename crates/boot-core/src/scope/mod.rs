//! Isolation scopes and the universe that owns them.
//!
//! A scope owns an ordered list of binary locations and an ordered list of
//! imports. Resolving a package inside a scope consults its own locations
//! first, then each import in the order it was added. Imports either point at
//! another scope or at one of the host's fixed surfaces.

mod imports;
mod manager;

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use indexmap::IndexMap;
use reactor_boot_participation::ScopeId;

use crate::error::ScopeError;

pub use imports::BootstrapImports;
pub use manager::{
    CORE_BRIDGE_PACKAGE, CORE_COMPONENTS_PACKAGE, EXTENSION_SCOPE_PREFIX, IsolationScopeManager,
};

/// Scopes the host itself provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSurface {
    /// The host's core implementation.
    Core,
    /// The host's public API.
    Api,
    /// The scope the bootstrap engine itself runs in.
    Bootstrapper,
}

impl fmt::Display for HostSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Core => "core",
            Self::Api => "api",
            Self::Bootstrapper => "bootstrapper",
        };
        f.write_str(name)
    }
}

/// Package selector of an import.
///
/// The empty pattern selects every package, `a.b.*` selects `a.b` and all
/// packages below it, anything else selects exactly one name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackagePattern(String);

impl PackagePattern {
    /// Wraps a pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Pattern selecting every package.
    #[must_use]
    pub const fn everything() -> Self {
        Self(String::new())
    }

    /// Pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `package` is selected.
    #[must_use]
    pub fn matches(&self, package: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        match self.0.strip_suffix(".*") {
            Some(stem) => {
                package == stem
                    || package
                        .strip_prefix(stem)
                        .is_some_and(|rest| rest.starts_with('.'))
            }
            None => package == self.0,
        }
    }
}

impl From<&str> for PackagePattern {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Origin of an import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportSource {
    /// Another scope in the same universe.
    Scope(ScopeId),
    /// A host surface.
    Host(HostSurface),
}

/// One import edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeImport {
    /// Where packages come from.
    pub source: ImportSource,
    /// Which packages are visible.
    pub pattern: PackagePattern,
}

/// A binary and the packages it provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryLocation {
    path: PathBuf,
    packages: Vec<String>,
}

impl BinaryLocation {
    /// Builds a location with no known packages.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packages: Vec::new(),
        }
    }

    /// Records the packages the binary provides.
    #[must_use]
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Binary path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Packages provided by the binary.
    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

/// Snapshot of one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsolationScope {
    id: ScopeId,
    locations: Vec<BinaryLocation>,
    imports: Vec<ScopeImport>,
}

impl IsolationScope {
    const fn new(id: ScopeId) -> Self {
        Self {
            id,
            locations: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Scope identifier.
    #[must_use]
    pub const fn id(&self) -> &ScopeId {
        &self.id
    }

    /// Binary locations in search order.
    #[must_use]
    pub fn locations(&self) -> &[BinaryLocation] {
        &self.locations
    }

    /// Imports in search order.
    #[must_use]
    pub fn imports(&self) -> &[ScopeImport] {
        &self.imports
    }
}

/// Where a package resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOrigin {
    /// A binary owned by a scope.
    Local {
        /// Owning scope.
        scope: ScopeId,
        /// Binary providing the package.
        location: PathBuf,
    },
    /// A host surface.
    Host(HostSurface),
}

/// Observer of scope creation and disposal anywhere in a universe.
pub trait ScopeListener: Send + Sync {
    /// A scope was created. The universe is unlocked while this runs.
    fn scope_created(&self, universe: &ScopeUniverse, scope: &ScopeId);

    /// A scope was disposed.
    fn scope_disposed(&self, universe: &ScopeUniverse, scope: &ScopeId) {
        let _ = (universe, scope);
    }
}

/// Handle returned when registering a [`ScopeListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Every scope of one process, with the listeners observing them.
pub struct ScopeUniverse {
    scopes: Mutex<IndexMap<ScopeId, IsolationScope>>,
    allocation: Mutex<()>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn ScopeListener>)>>,
    next_listener: AtomicU64,
}

impl Default for ScopeUniverse {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScopeUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeUniverse")
            .field("scopes", &self.scope_ids())
            .finish_non_exhaustive()
    }
}

impl ScopeUniverse {
    /// Creates an empty universe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: Mutex::new(IndexMap::new()),
            allocation: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Registers a listener for every later creation and disposal.
    pub fn add_listener(&self, listener: Arc<dyn ScopeListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Unregisters a listener. Unknown handles are ignored.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    /// Creates an empty scope named `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::Duplicate`] when the identifier is taken.
    pub fn create(&self, id: ScopeId) -> Result<ScopeId, ScopeError> {
        {
            let mut scopes = self.lock_scopes();
            if scopes.contains_key(&id) {
                return Err(ScopeError::Duplicate { id });
            }
            scopes.insert(id.clone(), IsolationScope::new(id.clone()));
        }
        tracing::debug!(
            target: "reactor_boot::scope",
            event = "scope_created",
            scope = %id,
            "created isolation scope"
        );
        self.notify(|listener| listener.scope_created(self, &id));
        Ok(id)
    }

    /// Creates a scope named `base`, or `base-<random>` when taken.
    ///
    /// Allocation is serialised across callers; listeners must not allocate
    /// scopes themselves.
    pub fn create_unique(&self, base: &str) -> ScopeId {
        let _allocation = self
            .allocation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut candidate = ScopeId::new(base);
        loop {
            match self.create(candidate) {
                Ok(id) => return id,
                Err(_) => candidate = ScopeId::new(format!("{base}-{}", random_suffix())),
            }
        }
    }

    /// Whether a scope named `id` exists.
    #[must_use]
    pub fn contains(&self, id: &ScopeId) -> bool {
        self.lock_scopes().contains_key(id)
    }

    /// Snapshot of the scope named `id`.
    #[must_use]
    pub fn scope(&self, id: &ScopeId) -> Option<IsolationScope> {
        self.lock_scopes().get(id).cloned()
    }

    /// Identifiers of every live scope in creation order.
    #[must_use]
    pub fn scope_ids(&self) -> Vec<ScopeId> {
        self.lock_scopes().keys().cloned().collect()
    }

    /// Appends a binary location to a scope.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NotFound`] for an unknown scope.
    pub fn add_location(&self, id: &ScopeId, location: BinaryLocation) -> Result<(), ScopeError> {
        let mut scopes = self.lock_scopes();
        let scope = scopes
            .get_mut(id)
            .ok_or_else(|| ScopeError::NotFound { id: id.clone() })?;
        scope.locations.push(location);
        Ok(())
    }

    /// Appends an import edge to a scope. Returns `false` when an identical
    /// edge already exists.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NotFound`] for an unknown scope.
    pub fn import_from(
        &self,
        id: &ScopeId,
        source: ImportSource,
        pattern: PackagePattern,
    ) -> Result<bool, ScopeError> {
        let mut scopes = self.lock_scopes();
        let scope = scopes
            .get_mut(id)
            .ok_or_else(|| ScopeError::NotFound { id: id.clone() })?;
        let edge = ScopeImport { source, pattern };
        if scope.imports.contains(&edge) {
            return Ok(false);
        }
        scope.imports.push(edge);
        Ok(true)
    }

    /// Scopes `id` imports from, in edge order, without repeats.
    #[must_use]
    pub fn imports_of(&self, id: &ScopeId) -> Vec<ScopeId> {
        let scopes = self.lock_scopes();
        let Some(scope) = scopes.get(id) else {
            return Vec::new();
        };
        let mut sources: Vec<ScopeId> = Vec::new();
        for edge in &scope.imports {
            if let ImportSource::Scope(source) = &edge.source
                && !sources.contains(source)
            {
                sources.push(source.clone());
            }
        }
        sources
    }

    /// Removes a scope.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::NotFound`] when no such scope exists.
    pub fn dispose(&self, id: &ScopeId) -> Result<(), ScopeError> {
        let removed = self.lock_scopes().shift_remove(id);
        if removed.is_none() {
            return Err(ScopeError::NotFound { id: id.clone() });
        }
        tracing::debug!(
            target: "reactor_boot::scope",
            event = "scope_disposed",
            scope = %id,
            "disposed isolation scope"
        );
        self.notify(|listener| listener.scope_disposed(self, id));
        Ok(())
    }

    /// Resolves which binary or host surface provides `package` inside `id`.
    #[must_use]
    pub fn resolve_package(&self, id: &ScopeId, package: &str) -> Option<PackageOrigin> {
        let scopes = self.lock_scopes();
        let mut visited = HashSet::new();
        resolve_in(&scopes, id, package, &mut visited)
    }

    fn lock_scopes(&self) -> MutexGuard<'_, IndexMap<ScopeId, IsolationScope>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, f: impl Fn(&dyn ScopeListener)) {
        let listeners: Vec<Arc<dyn ScopeListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &listeners {
            f(listener.as_ref());
        }
    }
}

fn resolve_in(
    scopes: &IndexMap<ScopeId, IsolationScope>,
    id: &ScopeId,
    package: &str,
    visited: &mut HashSet<ScopeId>,
) -> Option<PackageOrigin> {
    if !visited.insert(id.clone()) {
        return None;
    }
    let scope = scopes.get(id)?;
    if let Some(location) = scope
        .locations
        .iter()
        .find(|location| location.packages.iter().any(|provided| provided == package))
    {
        return Some(PackageOrigin::Local {
            scope: id.clone(),
            location: location.path.clone(),
        });
    }
    scope
        .imports
        .iter()
        .filter(|edge| edge.pattern.matches(package))
        .find_map(|edge| match &edge.source {
            ImportSource::Host(surface) => Some(PackageOrigin::Host(*surface)),
            ImportSource::Scope(source) => resolve_in(scopes, source, package, visited),
        })
}

fn random_suffix() -> u32 {
    uuid::Uuid::new_v4().as_fields().0
}
