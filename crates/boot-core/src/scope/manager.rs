use std::sync::Arc;

use reactor_boot_participation::{BuildSession, DependencyCoordinate, ProjectModel, ScopeId};

use super::{
    BinaryLocation, BootstrapImports, HostSurface, ImportSource, PackagePattern, ScopeUniverse,
};
use crate::collaborators::{
    DependencyResolver, ManifestReader, ProjectScopeCache, ResolutionRequest, ResolutionScope,
};
use crate::error::{BootstrapError, ManifestError, ScopeError};

/// Prefix of every extension scope identifier.
pub const EXTENSION_SCOPE_PREFIX: &str = "extension>";

/// Core package every extension-of-extension scope imports.
pub const CORE_COMPONENTS_PACKAGE: &str = "org.sonatype.plexus.components";

/// Core package needed by API components but not exported by the API surface.
pub const CORE_BRIDGE_PACKAGE: &str = "org.apache.maven.bridge";

/// Finds, creates and disposes the isolation scopes of bootstrap projects.
pub struct IsolationScopeManager {
    universe: Arc<ScopeUniverse>,
    imports: Arc<BootstrapImports>,
    resolver: Arc<dyn DependencyResolver>,
    manifests: Arc<dyn ManifestReader>,
    core_excludes: Vec<String>,
    project_cache: Option<Arc<dyn ProjectScopeCache>>,
}

impl IsolationScopeManager {
    /// Builds a manager over `universe`.
    #[must_use]
    pub fn new(
        universe: Arc<ScopeUniverse>,
        imports: Arc<BootstrapImports>,
        resolver: Arc<dyn DependencyResolver>,
        manifests: Arc<dyn ManifestReader>,
        core_excludes: Vec<String>,
    ) -> Self {
        Self {
            universe,
            imports,
            resolver,
            manifests,
            core_excludes,
            project_cache: None,
        }
    }

    /// Flushes `cache` whenever project scopes are disposed.
    #[must_use]
    pub fn with_project_cache(mut self, cache: Arc<dyn ProjectScopeCache>) -> Self {
        self.project_cache = Some(cache);
        self
    }

    /// Universe the manager works in.
    #[must_use]
    pub const fn universe(&self) -> &Arc<ScopeUniverse> {
        &self.universe
    }

    /// Extension scopes imported by the project's build scope, in import
    /// order.
    #[must_use]
    pub fn scopes_for(&self, project: &ProjectModel) -> Vec<ScopeId> {
        let Some(build_scope) = project.build_scope() else {
            return Vec::new();
        };
        self.universe
            .imports_of(build_scope)
            .into_iter()
            .filter(|scope| self.imports.matches(scope))
            .collect()
    }

    /// Scope holding `dependency`, an extension declared by the extension
    /// living in `parent`.
    ///
    /// The scope is named `parent@dependency` and reused while it exists.
    ///
    /// # Errors
    ///
    /// Fails when the dependency does not resolve, the parent scope is gone,
    /// or the parent's manifest cannot be read.
    pub fn extension_scope_for(
        &self,
        boot: &BuildSession,
        project: &ProjectModel,
        parent: &ScopeId,
        dependency: &DependencyCoordinate,
    ) -> Result<ScopeId, BootstrapError> {
        let base = ScopeId::new(format!("{parent}@{dependency}"));
        if self.universe.contains(&base) {
            return Ok(base);
        }
        let parent_scope = self
            .universe
            .scope(parent)
            .ok_or_else(|| ScopeError::NotFound { id: parent.clone() })?;

        let request = ResolutionRequest::new(dependency.clone(), ResolutionScope::RuntimePlusSystem)
            .with_excludes(self.core_excludes.clone())
            .with_remote_repositories(project.remote_repositories().to_vec())
            .with_offline(boot.request().is_offline());
        let artifacts = self
            .resolver
            .resolve(&request)
            .map_err(|source| BootstrapError::ExtensionResolution {
                coordinate: dependency.to_string(),
                source,
            })?;

        let id = self.universe.create_unique(base.as_str());
        for artifact in &artifacts {
            let location = BinaryLocation::new(artifact.file())
                .with_packages(artifact.packages().iter().cloned());
            self.universe.add_location(&id, location)?;
        }
        self.universe.import_from(
            &id,
            ImportSource::Host(HostSurface::Core),
            PackagePattern::new(CORE_COMPONENTS_PACKAGE),
        )?;
        self.imports.apply(&self.universe, &id)?;

        if let Some(first) = parent_scope.locations().first() {
            match self.manifests.read(first.path()) {
                Ok(Some(descriptor)) => {
                    for package in &descriptor.exported_packages {
                        self.universe.import_from(
                            &id,
                            ImportSource::Scope(parent.clone()),
                            PackagePattern::new(package.as_str()),
                        )?;
                    }
                    self.universe.import_from(
                        &id,
                        ImportSource::Host(HostSurface::Api),
                        PackagePattern::everything(),
                    )?;
                    self.universe.import_from(
                        &id,
                        ImportSource::Host(HostSurface::Core),
                        PackagePattern::new(CORE_BRIDGE_PACKAGE),
                    )?;
                }
                Ok(None) | Err(ManifestError::EntryNotFound) => {
                    self.universe.import_from(
                        &id,
                        ImportSource::Scope(parent.clone()),
                        PackagePattern::everything(),
                    )?;
                }
                Err(source) => {
                    return Err(BootstrapError::ManifestRead {
                        location: first.path().to_path_buf(),
                        source,
                    });
                }
            }
        }

        tracing::debug!(
            target: "reactor_boot::scope",
            event = "extension_scope_created",
            scope = %id,
            parent = %parent,
            artifacts = artifacts.len(),
            "created extension scope"
        );
        Ok(id)
    }

    /// Disposes `scopes`, ignoring any already gone, then flushes the host
    /// cache. Returns how many scopes were disposed.
    pub fn dispose(&self, scopes: &[ScopeId]) -> usize {
        let disposed = scopes
            .iter()
            .filter(|scope| self.universe.dispose(scope).is_ok())
            .count();
        if let Some(cache) = &self.project_cache {
            cache.flush();
        }
        disposed
    }

    /// Disposes the build scopes of `projects`.
    pub fn dispose_projects(&self, projects: &[ProjectModel]) -> usize {
        let scopes: Vec<ScopeId> = projects
            .iter()
            .filter_map(|project| project.build_scope().cloned())
            .collect();
        self.dispose(&scopes)
    }
}
