//! Project models produced by descriptor building.
//!
//! A [`ProjectModel`] is mostly immutable once built. Two parts change while
//! the host build runs and are therefore shared between clones: the
//! [`BuildState`] (executed phases and packaged files), which the reactor
//! workspace consults, and the [`ProjectContext`], which memoises per-project
//! lookups.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::coordinate::{
    DependencyCoordinate, ProducedArtifact, ProjectCoordinate, extension_for_type,
};
use crate::scope::ScopeId;
use crate::session::RemoteRepository;

/// Lifecycle phases the reactor workspace distinguishes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum LifecyclePhase {
    /// Project validation.
    Validate,
    /// Build initialisation.
    Initialize,
    /// Source generation.
    GenerateSources,
    /// Resource processing.
    ProcessResources,
    /// Main source compilation.
    Compile,
    /// Post-processing of compiled classes.
    ProcessClasses,
    /// Test source generation.
    GenerateTestSources,
    /// Test source compilation.
    TestCompile,
    /// Test execution.
    Test,
    /// Packaging into the main artifact.
    Package,
    /// Integration verification.
    Verify,
    /// Installation into the local repository.
    Install,
    /// Deployment to a remote repository.
    Deploy,
}

/// Output locations of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDirectories {
    output: PathBuf,
    test_output: PathBuf,
}

impl BuildDirectories {
    /// Builds explicit output locations.
    pub fn new(output: impl Into<PathBuf>, test_output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            test_output: test_output.into(),
        }
    }

    /// Conventional `target/classes` and `target/test-classes` under `basedir`.
    #[must_use]
    pub fn conventional(basedir: &Path) -> Self {
        let target = basedir.join("target");
        Self::new(target.join("classes"), target.join("test-classes"))
    }

    /// Main compiled output.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Compiled test output.
    #[must_use]
    pub fn test_output(&self) -> &Path {
        &self.test_output
    }
}

/// A plugin declared in a descriptor together with its free-form configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDeclaration {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    #[serde(default)]
    configuration: serde_json::Value,
}

impl PluginDeclaration {
    /// Builds a declaration without configuration.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            configuration: serde_json::Value::Null,
        }
    }

    /// Attaches configuration.
    #[must_use]
    pub fn with_configuration(mut self, configuration: serde_json::Value) -> Self {
        self.configuration = configuration;
        self
    }

    /// `group:artifact` key.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Group identifier.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Artifact identifier.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Declared version.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Plugin configuration, `Null` when absent.
    #[must_use]
    pub const fn configuration(&self) -> &serde_json::Value {
        &self.configuration
    }

    /// Whether the plugin is the given project.
    #[must_use]
    pub fn refers_to(&self, project: &ProjectCoordinate) -> bool {
        self.group_id == project.group_id()
            && self.artifact_id == project.artifact_id()
            && self
                .version
                .as_deref()
                .is_none_or(|version| version == project.version())
    }
}

/// Where a resolved artifact came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOrigin {
    /// Built within the current workspace.
    Workspace,
    /// Already present in the local cache.
    LocalCache,
    /// Fetched from a remote repository during resolution.
    Downloaded(RemoteRepository),
}

/// A dependency resolved to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    coordinate: DependencyCoordinate,
    file: PathBuf,
    origin: ArtifactOrigin,
    packages: Vec<String>,
}

impl ResolvedArtifact {
    /// Builds a resolved artifact with no known packages.
    pub fn new(
        coordinate: DependencyCoordinate,
        file: impl Into<PathBuf>,
        origin: ArtifactOrigin,
    ) -> Self {
        Self {
            coordinate,
            file: file.into(),
            origin,
            packages: Vec::new(),
        }
    }

    /// Records the packages the file provides.
    #[must_use]
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Dependency the file satisfies.
    #[must_use]
    pub const fn coordinate(&self) -> &DependencyCoordinate {
        &self.coordinate
    }

    /// Resolved file.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Origin of the file.
    #[must_use]
    pub const fn origin(&self) -> &ArtifactOrigin {
        &self.origin
    }

    /// Packages the file provides.
    #[must_use]
    pub fn packages(&self) -> &[String] {
        &self.packages
    }
}

#[derive(Debug, Default)]
struct BuildStateInner {
    phases: BTreeSet<LifecyclePhase>,
    main_artifact_file: Option<PathBuf>,
    attached: Vec<ProducedArtifact>,
}

/// Progress of a project through the host build, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct BuildState {
    inner: Arc<RwLock<BuildStateInner>>,
}

impl BuildState {
    /// Records that `phase` has executed.
    pub fn record_phase(&self, phase: LifecyclePhase) {
        self.write(|state| {
            state.phases.insert(phase);
        });
    }

    /// Whether `phase` has executed.
    #[must_use]
    pub fn has_phase(&self, phase: LifecyclePhase) -> bool {
        self.read(|state| state.phases.contains(&phase))
    }

    /// Whether any of `phases` has executed.
    #[must_use]
    pub fn has_any_phase(&self, phases: &[LifecyclePhase]) -> bool {
        self.read(|state| phases.iter().any(|phase| state.phases.contains(phase)))
    }

    /// Records the packaged main artifact file.
    pub fn set_main_artifact_file(&self, file: impl Into<PathBuf>) {
        let file = file.into();
        self.write(|state| state.main_artifact_file = Some(file));
    }

    /// Packaged main artifact file, if any.
    #[must_use]
    pub fn main_artifact_file(&self) -> Option<PathBuf> {
        self.read(|state| state.main_artifact_file.clone())
    }

    /// Records an attached artifact.
    pub fn attach_artifact(&self, artifact: ProducedArtifact) {
        self.write(|state| state.attached.push(artifact));
    }

    /// Attached artifacts in attachment order.
    #[must_use]
    pub fn attached_artifacts(&self) -> Vec<ProducedArtifact> {
        self.read(|state| state.attached.clone())
    }

    fn read<R>(&self, f: impl FnOnce(&BuildStateInner) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write(&self, f: impl FnOnce(&mut BuildStateInner)) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }
}

/// Per-project memo of computed values, shared between clones.
#[derive(Clone, Default)]
pub struct ProjectContext {
    values: Arc<RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>>,
}

impl ProjectContext {
    /// Stores `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.into(), Arc::new(value));
    }

    /// Value under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let value = Arc::clone(values.get(key)?);
        value.downcast::<T>().ok()
    }

    /// Removes the value under `key`.
    pub fn remove(&self, key: &str) -> bool {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key).is_some()
    }

    /// Whether a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        values.contains_key(key)
    }
}

impl fmt::Debug for ProjectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<&String> = values.keys().collect();
        keys.sort();
        f.debug_struct("ProjectContext").field("keys", &keys).finish()
    }
}

/// A project built from one descriptor.
#[derive(Debug, Clone)]
pub struct ProjectModel {
    coordinate: ProjectCoordinate,
    name: Option<String>,
    packaging: String,
    descriptor: PathBuf,
    parent: Option<ProjectCoordinate>,
    dependencies: Vec<DependencyCoordinate>,
    plugins: Vec<PluginDeclaration>,
    properties: BTreeMap<String, String>,
    directories: BuildDirectories,
    remote_repositories: Vec<RemoteRepository>,
    plugin_repositories: Vec<RemoteRepository>,
    build_scope: Option<ScopeId>,
    resolved_artifacts: Vec<ResolvedArtifact>,
    build_state: BuildState,
    context: ProjectContext,
}

impl ProjectModel {
    /// Builds a `jar` project with conventional output directories next to
    /// its descriptor.
    pub fn new(coordinate: ProjectCoordinate, descriptor: impl Into<PathBuf>) -> Self {
        let descriptor = descriptor.into();
        let basedir = descriptor.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            coordinate,
            name: None,
            packaging: "jar".to_owned(),
            directories: BuildDirectories::conventional(&basedir),
            descriptor,
            parent: None,
            dependencies: Vec::new(),
            plugins: Vec::new(),
            properties: BTreeMap::new(),
            remote_repositories: Vec::new(),
            plugin_repositories: Vec::new(),
            build_scope: None,
            resolved_artifacts: Vec::new(),
            build_state: BuildState::default(),
            context: ProjectContext::default(),
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the packaging.
    #[must_use]
    pub fn with_packaging(mut self, packaging: impl Into<String>) -> Self {
        self.packaging = packaging.into();
        self
    }

    /// Sets the parent project.
    #[must_use]
    pub fn with_parent(mut self, parent: ProjectCoordinate) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyCoordinate) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Adds a plugin declaration.
    #[must_use]
    pub fn with_plugin(mut self, plugin: PluginDeclaration) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Sets a project property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Overrides the output directories.
    #[must_use]
    pub fn with_directories(mut self, directories: BuildDirectories) -> Self {
        self.directories = directories;
        self
    }

    /// Adds a remote repository.
    #[must_use]
    pub fn with_remote_repository(mut self, repository: RemoteRepository) -> Self {
        self.remote_repositories.push(repository);
        self
    }

    /// Adds a plugin repository.
    #[must_use]
    pub fn with_plugin_repository(mut self, repository: RemoteRepository) -> Self {
        self.plugin_repositories.push(repository);
        self
    }

    /// Sets the build scope.
    #[must_use]
    pub fn with_build_scope(mut self, scope: ScopeId) -> Self {
        self.build_scope = Some(scope);
        self
    }

    /// Identity of the project.
    #[must_use]
    pub const fn coordinate(&self) -> &ProjectCoordinate {
        &self.coordinate
    }

    /// Display name, falling back to the coordinate.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.coordinate.to_string())
    }

    /// Packaging type.
    #[must_use]
    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    /// Descriptor file the project was built from.
    #[must_use]
    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    /// Directory containing the descriptor.
    #[must_use]
    pub fn basedir(&self) -> &Path {
        self.descriptor.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Parent project, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&ProjectCoordinate> {
        self.parent.as_ref()
    }

    /// Declared dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &[DependencyCoordinate] {
        &self.dependencies
    }

    /// Declared plugins.
    #[must_use]
    pub fn plugins(&self) -> &[PluginDeclaration] {
        &self.plugins
    }

    /// Plugin declared under `key` (`group:artifact`).
    #[must_use]
    pub fn plugin(&self, key: &str) -> Option<&PluginDeclaration> {
        self.plugins.iter().find(|plugin| plugin.key() == key)
    }

    /// Project properties.
    #[must_use]
    pub const fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Output directories.
    #[must_use]
    pub const fn directories(&self) -> &BuildDirectories {
        &self.directories
    }

    /// Remote repositories.
    #[must_use]
    pub fn remote_repositories(&self) -> &[RemoteRepository] {
        &self.remote_repositories
    }

    /// Replaces the remote repositories.
    pub fn set_remote_repositories(&mut self, repositories: Vec<RemoteRepository>) {
        self.remote_repositories = repositories;
    }

    /// Plugin repositories.
    #[must_use]
    pub fn plugin_repositories(&self) -> &[RemoteRepository] {
        &self.plugin_repositories
    }

    /// Replaces the plugin repositories.
    pub fn set_plugin_repositories(&mut self, repositories: Vec<RemoteRepository>) {
        self.plugin_repositories = repositories;
    }

    /// Build scope created for the project, if any.
    #[must_use]
    pub const fn build_scope(&self) -> Option<&ScopeId> {
        self.build_scope.as_ref()
    }

    /// Dependencies resolved ahead of the `before` hooks.
    #[must_use]
    pub fn resolved_artifacts(&self) -> &[ResolvedArtifact] {
        &self.resolved_artifacts
    }

    /// Replaces the resolved dependencies.
    pub fn set_resolved_artifacts(&mut self, artifacts: Vec<ResolvedArtifact>) {
        self.resolved_artifacts = artifacts;
    }

    /// Shared build progress.
    #[must_use]
    pub const fn build_state(&self) -> &BuildState {
        &self.build_state
    }

    /// Shared memo of computed values.
    #[must_use]
    pub const fn context(&self) -> &ProjectContext {
        &self.context
    }

    /// Main artifact, with its file once packaged.
    #[must_use]
    pub fn main_artifact(&self) -> ProducedArtifact {
        let artifact = ProducedArtifact::new(
            self.coordinate.group_id(),
            self.coordinate.artifact_id(),
            extension_for_type(&self.packaging),
        );
        match self.build_state.main_artifact_file() {
            Some(file) => artifact.with_file(file),
            None => artifact,
        }
    }
}

#[cfg(test)]
mod tests;
