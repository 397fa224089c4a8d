//! Fakes shared by the unit and behaviour suites.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use reactor_boot_config::BootConfig;
use reactor_boot_participation::{
    BootParticipant, BuildSession, ContextualBootParticipant, DependencyCoordinate,
    ParticipantError, PluginDeclaration, ProjectCoordinate, ProjectModel, ResolvedArtifact,
    ScopeId, SessionId, SharedBootContext,
};
use serde_json::json;

use crate::collaborators::{
    DependencyResolver, DescriptorBuildError, DescriptorBuildRequest, DescriptorBuilder,
    NoManifestReader, ResolutionRequest, ResolutionScope,
};
use crate::discovery::{
    CapabilityDiscovery, CapabilityKind, CapabilityLocator, CapabilityProvider, CapabilityRegistry,
};
use crate::dispatch::{HookPhase, LifecycleDispatcher};
use crate::error::{BootstrapError, LocatorError, ResolutionError};
use crate::extensions::ConfiguredExtensionsReader;
use crate::orchestrator::{Collaborators, SessionOrchestrator};
use crate::policy::{BootstrapPolicy, DescriptorSet, DirectoryScanPolicy};
use crate::reporter::BootReporter;
use crate::resolution::ProjectDependencyResolver;
use crate::scope::{
    BootstrapImports, EXTENSION_SCOPE_PREFIX, ImportSource, IsolationScopeManager, PackagePattern,
    ScopeUniverse,
};

pub const GROUP: &str = "org.example";

/// `group:artifact` of the bootstrapper plugin used throughout the tests.
pub const BOOTSTRAPPER: &str = "org.example:bootstrapper";

/// Scope identifier prefix of the test bootstrapper's extensions.
pub fn extension_prefix() -> String {
    format!("{EXTENSION_SCOPE_PREFIX}{BOOTSTRAPPER}")
}

/// Extension `org.example:<artifact>:1.0`.
pub fn extension(artifact: &str) -> DependencyCoordinate {
    DependencyCoordinate::new(GROUP, artifact, Some("1.0".to_owned()))
}

/// Declares `extensions` on the bootstrapper plugin of `project`.
pub fn declaring(project: ProjectModel, extensions: &[&str]) -> ProjectModel {
    let entries: Vec<serde_json::Value> = extensions
        .iter()
        .map(|artifact| json!({ "groupId": GROUP, "artifactId": artifact, "version": "1.0" }))
        .collect();
    project.with_plugin(
        PluginDeclaration::new(GROUP, "bootstrapper", Some("1.0".to_owned()))
            .with_configuration(json!({ "extensions": entries })),
    )
}

/// Project `org.example:<artifact>:1.0` with its descriptor under `/work`.
pub fn project(artifact: &str) -> ProjectModel {
    project_at(artifact, format!("/work/{artifact}/pom.xml"))
}

/// Project `org.example:<artifact>:1.0` with an explicit descriptor.
pub fn project_at(artifact: &str, descriptor: impl Into<PathBuf>) -> ProjectModel {
    ProjectModel::new(ProjectCoordinate::new(GROUP, artifact, "1.0"), descriptor)
}

// ----------------------------------------------------------------------------
// Participants
// ----------------------------------------------------------------------------

/// Entries written by recording participants, in call order.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Reads a snapshot of `journal`.
pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().expect("journal mutex poisoned").clone()
}

/// What a recording participant does after journalling a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    Panic,
}

/// Basic participant writing `name:phase:artifact` to a journal.
pub struct RecordingParticipant {
    name: String,
    journal: Journal,
    behaviour: Behaviour,
}

impl RecordingParticipant {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self::with_behaviour(name, journal, Behaviour::Succeed)
    }

    pub fn with_behaviour(name: &str, journal: &Journal, behaviour: Behaviour) -> Self {
        Self {
            name: name.to_owned(),
            journal: Arc::clone(journal),
            behaviour,
        }
    }

    fn record(&self, phase: HookPhase, project: &ProjectModel) -> Result<(), ParticipantError> {
        self.journal.lock().expect("journal mutex poisoned").push(format!(
            "{}:{phase}:{}",
            self.name,
            project.coordinate().artifact_id()
        ));
        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Fail => Err(ParticipantError::new(format!("{} refused", self.name))),
            Behaviour::Panic => panic!("{} exploded", self.name),
        }
    }
}

impl BootParticipant for RecordingParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_build(
        &self,
        _boot_session: &BuildSession,
        project: &ProjectModel,
        _actual_session: &BuildSession,
    ) -> Result<(), ParticipantError> {
        self.record(HookPhase::Before, project)
    }

    fn after_build(
        &self,
        _boot_session: &BuildSession,
        project: &ProjectModel,
        _actual_session: &BuildSession,
    ) -> Result<(), ParticipantError> {
        self.record(HookPhase::After, project)
    }
}

/// Key under which [`CountingParticipant`] keeps its call count.
pub const CALLS_KEY: &str = "calls";

/// Contextual participant counting its calls in the shared context.
pub struct CountingParticipant {
    name: String,
    journal: Journal,
}

impl CountingParticipant {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_owned(),
            journal: Arc::clone(journal),
        }
    }

    fn record(
        &self,
        phase: HookPhase,
        project: &ProjectModel,
        context: &mut SharedBootContext,
    ) -> Result<(), ParticipantError> {
        let calls = context
            .get_or_insert_with(CALLS_KEY, || 0_usize)
            .ok_or_else(|| ParticipantError::new("calls entry has the wrong type"))?;
        *calls += 1;
        self.journal.lock().expect("journal mutex poisoned").push(format!(
            "{}:{phase}:{}",
            self.name,
            project.coordinate().artifact_id()
        ));
        Ok(())
    }
}

impl ContextualBootParticipant for CountingParticipant {
    fn name(&self) -> &str {
        &self.name
    }

    fn before_build(
        &self,
        _boot_session: &BuildSession,
        project: &ProjectModel,
        context: &mut SharedBootContext,
    ) -> Result<(), ParticipantError> {
        self.record(HookPhase::Before, project, context)
    }

    fn after_build(
        &self,
        _boot_session: &BuildSession,
        project: &ProjectModel,
        context: &mut SharedBootContext,
    ) -> Result<(), ParticipantError> {
        self.record(HookPhase::After, project, context)
    }
}

// ----------------------------------------------------------------------------
// Collaborators
// ----------------------------------------------------------------------------

/// Descriptor builder returning pre-built projects by descriptor path.
#[derive(Default, Clone)]
pub struct StaticDescriptorBuilder {
    projects: Vec<ProjectModel>,
}

impl StaticDescriptorBuilder {
    #[must_use]
    pub fn with_project(mut self, project: ProjectModel) -> Self {
        self.projects.push(project);
        self
    }
}

impl DescriptorBuilder for StaticDescriptorBuilder {
    fn build(
        &self,
        descriptors: &[PathBuf],
        _request: &DescriptorBuildRequest,
    ) -> Result<Vec<ProjectModel>, DescriptorBuildError> {
        descriptors
            .iter()
            .map(|descriptor| {
                self.projects
                    .iter()
                    .find(|project| project.descriptor() == descriptor.as_path())
                    .cloned()
                    .ok_or_else(|| DescriptorBuildError {
                        file: descriptor.clone(),
                        message: "no such descriptor".to_owned(),
                    })
            })
            .collect()
    }
}

/// Resolver answering from a table keyed by the root's `group:artifact`.
#[derive(Default)]
pub struct StaticResolver {
    results: HashMap<String, Vec<ResolvedArtifact>>,
    requests: Mutex<Vec<String>>,
}

impl StaticResolver {
    #[must_use]
    pub fn with_result(mut self, versionless_key: &str, artifacts: Vec<ResolvedArtifact>) -> Self {
        self.results.insert(versionless_key.to_owned(), artifacts);
        self
    }

    /// Roots requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }
}

impl DependencyResolver for StaticResolver {
    fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        let key = request.root().versionless_key();
        self.requests
            .lock()
            .expect("requests mutex poisoned")
            .push(key.clone());
        self.results
            .get(&key)
            .cloned()
            .ok_or(ResolutionError::NotFound { coordinate: key })
    }
}

/// Locator whose every lookup fails.
pub struct FailingLocator;

impl CapabilityLocator for FailingLocator {
    fn lookup(
        &self,
        _kind: CapabilityKind,
        _scope: &ScopeId,
    ) -> Result<Vec<CapabilityProvider>, LocatorError> {
        Err(LocatorError::new("container unavailable"))
    }
}

/// Policy with a fixed descriptor set that shares the boot workspace with
/// the host session once the `before` pass is done.
pub struct FixedPolicy {
    descriptors: DescriptorSet,
    defaults: DirectoryScanPolicy,
}

impl FixedPolicy {
    pub fn new(descriptors: DescriptorSet, config: BootConfig) -> Self {
        Self {
            descriptors,
            defaults: DirectoryScanPolicy::new(config),
        }
    }
}

impl BootstrapPolicy for FixedPolicy {
    fn discover_descriptors(&self, _boot: &BuildSession) -> Result<DescriptorSet, BootstrapError> {
        Ok(self.descriptors.clone())
    }

    fn filter_repositories(
        &self,
        repositories: &[reactor_boot_participation::RemoteRepository],
    ) -> Vec<reactor_boot_participation::RemoteRepository> {
        self.defaults.filter_repositories(repositories)
    }

    fn allow_extension_extensions(&self, boot: &BuildSession, project: &ProjectModel) -> bool {
        self.defaults.allow_extension_extensions(boot, project)
    }

    fn dependency_resolution(&self) -> Option<ResolutionScope> {
        self.defaults.dependency_resolution()
    }

    fn adjust_actual_session(&self, boot: &BuildSession, actual: &mut BuildSession) {
        for reader in boot.workspace_readers().iter().rev() {
            actual.install_workspace_reader_first(Arc::clone(reader));
        }
    }
}

// ----------------------------------------------------------------------------
// Reporter
// ----------------------------------------------------------------------------

/// Reporter events reduced to comparable values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Skipped,
    Starting,
    DescriptorSkipped(PathBuf),
    BuildOrder(Vec<String>),
    Invoking {
        provider: String,
        project: String,
        phase: HookPhase,
    },
    Failed {
        provider: String,
        project: String,
        phase: HookPhase,
    },
    DependencyUnresolved {
        project: String,
        dependency: String,
    },
    Finished,
    BootstrapFailed(String),
    Ended,
}

/// Records reporter calls for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().expect("reporter mutex poisoned").clone()
    }

    /// Failed hooks as `provider:phase:artifact`.
    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::Failed {
                    provider,
                    project,
                    phase,
                } => Some(format!("{provider}:{phase}:{project}")),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ReportEvent) {
        self.events.lock().expect("reporter mutex poisoned").push(event);
    }
}

impl BootReporter for RecordingReporter {
    fn bootstrap_skipped(&self, _bootstrapper: &str) {
        self.record(ReportEvent::Skipped);
    }

    fn bootstrap_starting(&self, _bootstrapper: &str, _actual: SessionId, _boot: SessionId) {
        self.record(ReportEvent::Starting);
    }

    fn descriptor_skipped(&self, descriptor: &Path) {
        self.record(ReportEvent::DescriptorSkipped(descriptor.to_path_buf()));
    }

    fn build_order(&self, projects: &[ProjectCoordinate]) {
        self.record(ReportEvent::BuildOrder(
            projects
                .iter()
                .map(|project| project.artifact_id().to_owned())
                .collect(),
        ));
    }

    fn participant_invoking(&self, provider: &str, project: &ProjectCoordinate, phase: HookPhase) {
        self.record(ReportEvent::Invoking {
            provider: provider.to_owned(),
            project: project.artifact_id().to_owned(),
            phase,
        });
    }

    fn participant_failed(
        &self,
        provider: &str,
        project: &ProjectCoordinate,
        phase: HookPhase,
        _error: &ParticipantError,
    ) {
        self.record(ReportEvent::Failed {
            provider: provider.to_owned(),
            project: project.artifact_id().to_owned(),
            phase,
        });
    }

    fn dependency_unresolved(
        &self,
        project: &ProjectCoordinate,
        dependency: &str,
        _error: &ResolutionError,
    ) {
        self.record(ReportEvent::DependencyUnresolved {
            project: project.artifact_id().to_owned(),
            dependency: dependency.to_owned(),
        });
    }

    fn bootstrap_finished(&self, _bootstrapper: &str, _actual: SessionId) {
        self.record(ReportEvent::Finished);
    }

    fn bootstrap_failed(&self, _bootstrapper: &str, error: &BootstrapError) {
        self.record(ReportEvent::BootstrapFailed(error.to_string()));
    }

    fn bootstrap_ended(&self, _bootstrapper: &str, _actual: SessionId) {
        self.record(ReportEvent::Ended);
    }
}

// ----------------------------------------------------------------------------
// Rig
// ----------------------------------------------------------------------------

/// Scope universe, registry and fakes wired the way the orchestrator wires
/// them.
pub struct Rig {
    pub universe: Arc<ScopeUniverse>,
    pub imports: Arc<BootstrapImports>,
    pub registry: Arc<CapabilityRegistry>,
    pub resolver: Arc<StaticResolver>,
    pub reporter: Arc<RecordingReporter>,
    pub journal: Journal,
    pub config: BootConfig,
    root: Option<ScopeId>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_resolver(StaticResolver::default())
    }

    pub fn with_resolver(resolver: StaticResolver) -> Self {
        let config = BootConfig::default().with_allow_extension_extensions(true);
        let imports = Arc::new(BootstrapImports::new(
            vec![extension_prefix()],
            config.bootstrap_imports().iter().cloned(),
        ));
        let universe = Arc::new(ScopeUniverse::new());
        universe.add_listener(imports.clone());
        Self {
            universe,
            imports,
            registry: Arc::new(CapabilityRegistry::new()),
            resolver: Arc::new(resolver),
            reporter: Arc::new(RecordingReporter::default()),
            journal: Arc::new(Mutex::new(Vec::new())),
            config,
            root: None,
        }
    }

    /// The bootstrapper's root extension scope, created on first use.
    pub fn root_scope(&mut self) -> ScopeId {
        if let Some(root) = &self.root {
            return root.clone();
        }
        let root = self.universe.create_unique(&extension_prefix());
        self.universe
            .add_location(
                &root,
                crate::scope::BinaryLocation::new("/repo/bootstrapper-1.0.jar"),
            )
            .expect("add root location");
        self.root = Some(root.clone());
        root
    }

    /// Gives `project` a build scope importing the root extension scope.
    pub fn bootstrapped(&mut self, project: ProjectModel) -> ProjectModel {
        let root = self.root_scope();
        let build = self
            .universe
            .create(ScopeId::new(format!("project>{}", project.coordinate())))
            .expect("create build scope");
        self.universe
            .import_from(&build, ImportSource::Scope(root), PackagePattern::everything())
            .expect("import root scope");
        project.with_build_scope(build)
    }

    /// Registers a recording participant in the root scope.
    pub fn participant(&mut self, name: &str, behaviour: Behaviour) {
        let root = self.root_scope();
        self.registry.register_basic(
            root,
            Arc::new(RecordingParticipant::with_behaviour(name, &self.journal, behaviour)),
        );
    }

    /// Registers a counting participant in the root scope.
    pub fn contextual_participant(&mut self, name: &str) {
        let root = self.root_scope();
        self.registry
            .register_contextual(root, Arc::new(CountingParticipant::new(name, &self.journal)));
    }

    /// Registers a recording participant in the scope `extension` will get.
    pub fn extension_participant(&mut self, extension_artifact: &str, name: &str) {
        let root = self.root_scope();
        let scope = ScopeId::new(format!("{root}@{}", extension(extension_artifact)));
        self.registry.register_basic(
            scope,
            Arc::new(RecordingParticipant::new(name, &self.journal)),
        );
    }

    pub fn manager(&self) -> Arc<IsolationScopeManager> {
        Arc::new(IsolationScopeManager::new(
            self.universe.clone(),
            self.imports.clone(),
            self.resolver.clone(),
            Arc::new(NoManifestReader),
            self.config.core_artifact_excludes().to_vec(),
        ))
    }

    pub fn policy(&self) -> Arc<DirectoryScanPolicy> {
        Arc::new(DirectoryScanPolicy::new(self.config.clone()))
    }

    pub fn dispatcher(&self) -> LifecycleDispatcher {
        LifecycleDispatcher::new(
            self.manager(),
            Arc::new(CapabilityDiscovery::new(self.registry.clone())),
            self.policy(),
            Arc::new(ConfiguredExtensionsReader),
            ProjectDependencyResolver::new(self.resolver.clone(), self.reporter.clone()),
            self.reporter.clone(),
            BOOTSTRAPPER,
        )
    }

    /// Orchestrator over `descriptors`, building each from `builder`.
    pub fn orchestrator(
        &self,
        builder: StaticDescriptorBuilder,
        descriptors: DescriptorSet,
    ) -> SessionOrchestrator {
        SessionOrchestrator::new(
            BOOTSTRAPPER,
            &self.config,
            self.universe.clone(),
            Arc::new(FixedPolicy::new(descriptors, self.config.clone())),
            Collaborators::new(Arc::new(builder), self.resolver.clone(), self.registry.clone()),
            self.reporter.clone(),
        )
    }

    pub fn journal(&self) -> Vec<String> {
        entries(&self.journal)
    }
}
