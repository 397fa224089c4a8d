//! Interfaces of the services the engine consumes but does not implement.
//!
//! Descriptor parsing, artifact transport and manifest decoding live with the
//! host. The engine reaches them only through the traits below.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use reactor_boot_participation::{
    BuildSession, DependencyCoordinate, ProjectModel, RemoteRepository, ResolvedArtifact,
};
use thiserror::Error;

use crate::error::{ManifestError, ResolutionError};

// ---------------------------------------------------------------------------
// Descriptor building
// ---------------------------------------------------------------------------

/// Settings handed to the descriptor builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorBuildRequest {
    remote_repositories: Vec<RemoteRepository>,
    active_profiles: Vec<String>,
    system_properties: BTreeMap<String, String>,
    user_properties: BTreeMap<String, String>,
    offline: bool,
}

impl DescriptorBuildRequest {
    /// Copies the settings of `session`, replacing its repositories with
    /// `remote_repositories`.
    #[must_use]
    pub fn from_session(
        session: &BuildSession,
        remote_repositories: Vec<RemoteRepository>,
    ) -> Self {
        let request = session.request();
        Self {
            remote_repositories,
            active_profiles: request.active_profiles().to_vec(),
            system_properties: request.system_properties().clone(),
            user_properties: request.user_properties().clone(),
            offline: request.is_offline(),
        }
    }

    /// Repositories available while building descriptors.
    #[must_use]
    pub fn remote_repositories(&self) -> &[RemoteRepository] {
        &self.remote_repositories
    }

    /// Active profile identifiers.
    #[must_use]
    pub fn active_profiles(&self) -> &[String] {
        &self.active_profiles
    }

    /// System properties.
    #[must_use]
    pub const fn system_properties(&self) -> &BTreeMap<String, String> {
        &self.system_properties
    }

    /// User properties.
    #[must_use]
    pub const fn user_properties(&self) -> &BTreeMap<String, String> {
        &self.user_properties
    }

    /// Whether remote access is disabled.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.offline
    }
}

/// A descriptor that failed to build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DescriptorBuildError {
    /// Offending descriptor.
    pub file: PathBuf,
    /// Reason reported by the builder.
    pub message: String,
}

/// Builds project models from descriptor files.
pub trait DescriptorBuilder: Send + Sync {
    /// Builds one project per descriptor. Errors are never tolerated: the
    /// first failing descriptor aborts the whole request.
    ///
    /// # Errors
    ///
    /// Returns the failing descriptor and the builder's reason.
    fn build(
        &self,
        descriptors: &[PathBuf],
        request: &DescriptorBuildRequest,
    ) -> Result<Vec<ProjectModel>, DescriptorBuildError>;
}

// ---------------------------------------------------------------------------
// Dependency resolution
// ---------------------------------------------------------------------------

/// Dependency scopes a resolution includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionScope {
    /// `compile`, `provided` and `system`.
    Compile,
    /// `compile`, `provided`, `system` and `runtime`.
    CompilePlusRuntime,
    /// `compile` and `runtime`.
    Runtime,
    /// `compile`, `runtime` and `system`.
    RuntimePlusSystem,
    /// Every scope.
    Test,
}

impl ResolutionScope {
    /// Whether a dependency declared with `scope` is included.
    #[must_use]
    pub fn includes(self, scope: &str) -> bool {
        match self {
            Self::Compile => matches!(scope, "compile" | "provided" | "system"),
            Self::CompilePlusRuntime => {
                matches!(scope, "compile" | "provided" | "system" | "runtime")
            }
            Self::Runtime => matches!(scope, "compile" | "runtime"),
            Self::RuntimePlusSystem => matches!(scope, "compile" | "runtime" | "system"),
            Self::Test => matches!(
                scope,
                "compile" | "provided" | "system" | "runtime" | "test"
            ),
        }
    }
}

/// A request to resolve one dependency and its transitive closure.
///
/// Managed versions are never applied: bootstrap code resolves exactly what
/// it declares, whatever the built projects manage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    root: DependencyCoordinate,
    scope: ResolutionScope,
    excludes: Vec<String>,
    remote_repositories: Vec<RemoteRepository>,
    offline: bool,
}

impl ResolutionRequest {
    /// Builds a request for `root`.
    #[must_use]
    pub const fn new(root: DependencyCoordinate, scope: ResolutionScope) -> Self {
        Self {
            root,
            scope,
            excludes: Vec::new(),
            remote_repositories: Vec::new(),
            offline: false,
        }
    }

    /// Excludes the given `group:artifact` keys from the closure.
    #[must_use]
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Sets the repositories to consult.
    #[must_use]
    pub fn with_remote_repositories(mut self, repositories: Vec<RemoteRepository>) -> Self {
        self.remote_repositories = repositories;
        self
    }

    /// Sets offline mode.
    #[must_use]
    pub const fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Dependency to resolve.
    #[must_use]
    pub const fn root(&self) -> &DependencyCoordinate {
        &self.root
    }

    /// Scope filter.
    #[must_use]
    pub const fn scope(&self) -> ResolutionScope {
        self.scope
    }

    /// Excluded `group:artifact` keys.
    #[must_use]
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Repositories to consult.
    #[must_use]
    pub fn remote_repositories(&self) -> &[RemoteRepository] {
        &self.remote_repositories
    }

    /// Whether remote access is disabled.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.offline
    }
}

/// Resolves dependencies to files. Calls may block.
pub trait DependencyResolver: Send + Sync {
    /// Resolves the request's root and its transitive closure, root first.
    ///
    /// # Errors
    ///
    /// Returns the resolver's failure.
    fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError>;
}

// ---------------------------------------------------------------------------
// Extension manifests
// ---------------------------------------------------------------------------

/// Visibility an extension declares for its own packages and artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    /// Package patterns visible to extensions of this extension.
    pub exported_packages: Vec<String>,
    /// `group:artifact` keys visible to extensions of this extension.
    pub exported_artifacts: Vec<String>,
}

/// Reads the extension manifest carried inside a binary.
pub trait ManifestReader: Send + Sync {
    /// Reads the manifest of `location`.
    ///
    /// Returns `Ok(None)` when the binary has no manifest entry.
    ///
    /// # Errors
    ///
    /// Returns the read failure. [`ManifestError::EntryNotFound`] is treated
    /// like `Ok(None)` by callers.
    fn read(&self, location: &Path) -> Result<Option<ExtensionDescriptor>, ManifestError>;
}

/// Reader for hosts whose extensions never carry manifests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoManifestReader;

impl ManifestReader for NoManifestReader {
    fn read(&self, _location: &Path) -> Result<Option<ExtensionDescriptor>, ManifestError> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Host scope cache
// ---------------------------------------------------------------------------

/// Host cache indexing project scopes by identity.
pub trait ProjectScopeCache: Send + Sync {
    /// Drops every cached entry.
    fn flush(&self);
}
