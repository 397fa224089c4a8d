//! Dual-session orchestration around the host build.
//!
//! [`SessionOrchestrator::execution_started`] derives a boot session from the
//! host's session, builds and sorts the bootstrap projects, installs the
//! reactor workspace and runs the `before` pass.
//! [`SessionOrchestrator::execution_ended`] replays the captured plan for the
//! `after` pass and tears the boot session down. Both are correlated through
//! a table keyed by the host session.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ortho_config::OrthoError;
use reactor_boot_config::BootConfig;
use reactor_boot_participation::{BuildSession, SessionId, SharedBootContext};
use thiserror::Error;
use tracing::debug;

use crate::collaborators::{
    DependencyResolver, DescriptorBuilder, ManifestReader, NoManifestReader, ProjectScopeCache,
};
use crate::config::ConfigLoader;
use crate::discovery::{CapabilityDiscovery, CapabilityLocator};
use crate::dispatch::{HookPlan, LifecycleDispatcher, RunState};
use crate::error::BootstrapError;
use crate::extensions::{ConfiguredExtensionsReader, ExtensionConfigurationReader};
use crate::graph::{GraphRegistry, ProjectGraphBuilder};
use crate::policy::{BootstrapPolicy, DescriptorSet, DirectoryScanPolicy};
use crate::reporter::BootReporter;
use crate::resolution::ProjectDependencyResolver;
use crate::scope::{
    BootstrapImports, EXTENSION_SCOPE_PREFIX, IsolationScopeManager, ListenerId, ScopeUniverse,
};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::workspace::ReactorWorkspaceResolver;

/// External services the orchestrator depends on.
#[derive(Clone)]
pub struct Collaborators {
    descriptors: Arc<dyn DescriptorBuilder>,
    resolver: Arc<dyn DependencyResolver>,
    locator: Arc<dyn CapabilityLocator>,
    manifests: Arc<dyn ManifestReader>,
    extensions: Arc<dyn ExtensionConfigurationReader>,
    project_cache: Option<Arc<dyn ProjectScopeCache>>,
}

impl Collaborators {
    /// Bundles the required services.
    ///
    /// Manifests are not read and extensions come from the bootstrapper
    /// plugin's configuration until replaced.
    #[must_use]
    pub fn new(
        descriptors: Arc<dyn DescriptorBuilder>,
        resolver: Arc<dyn DependencyResolver>,
        locator: Arc<dyn CapabilityLocator>,
    ) -> Self {
        Self {
            descriptors,
            resolver,
            locator,
            manifests: Arc::new(NoManifestReader),
            extensions: Arc::new(ConfiguredExtensionsReader),
            project_cache: None,
        }
    }

    /// Replaces the manifest reader.
    #[must_use]
    pub fn with_manifests(mut self, manifests: Arc<dyn ManifestReader>) -> Self {
        self.manifests = manifests;
        self
    }

    /// Replaces the extension configuration reader.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Arc<dyn ExtensionConfigurationReader>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Flushes `cache` whenever project scopes are disposed.
    #[must_use]
    pub fn with_project_cache(mut self, cache: Arc<dyn ProjectScopeCache>) -> Self {
        self.project_cache = Some(cache);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("project_cache", &self.project_cache.is_some())
            .finish_non_exhaustive()
    }
}

struct BootRun {
    boot: BuildSession,
    plan: HookPlan,
    context: SharedBootContext,
}

struct Correlation {
    boot: SessionId,
    state: RunState,
    run: Option<Arc<Mutex<BootRun>>>,
}

#[derive(Default)]
struct CorrelationTable {
    by_actual: HashMap<SessionId, Correlation>,
    by_boot: HashMap<SessionId, SessionId>,
}

/// Runs bootstrap passes for one bootstrapper.
pub struct SessionOrchestrator {
    bootstrapper: String,
    universe: Arc<ScopeUniverse>,
    listener: ListenerId,
    policy: Arc<dyn BootstrapPolicy>,
    manager: Arc<IsolationScopeManager>,
    registry: Arc<GraphRegistry>,
    graph: ProjectGraphBuilder,
    dispatcher: LifecycleDispatcher,
    reporter: Arc<dyn BootReporter>,
    table: Mutex<CorrelationTable>,
}

impl SessionOrchestrator {
    /// Wires an orchestrator for `bootstrapper` (`group:artifact`).
    ///
    /// Registers the bootstrap import listener on `universe`; it is removed
    /// again when the orchestrator is dropped.
    #[must_use]
    pub fn new(
        bootstrapper: impl Into<String>,
        config: &BootConfig,
        universe: Arc<ScopeUniverse>,
        policy: Arc<dyn BootstrapPolicy>,
        collaborators: Collaborators,
        reporter: Arc<dyn BootReporter>,
    ) -> Self {
        let bootstrapper = bootstrapper.into();
        let imports = Arc::new(BootstrapImports::new(
            vec![format!("{EXTENSION_SCOPE_PREFIX}{bootstrapper}")],
            config.bootstrap_imports().iter().cloned(),
        ));
        let listener = universe.add_listener(imports.clone());

        let mut manager = IsolationScopeManager::new(
            universe.clone(),
            imports,
            collaborators.resolver.clone(),
            collaborators.manifests,
            config.core_artifact_excludes().to_vec(),
        );
        if let Some(cache) = collaborators.project_cache {
            manager = manager.with_project_cache(cache);
        }
        let manager = Arc::new(manager);

        let registry = Arc::new(GraphRegistry::new());
        let graph = ProjectGraphBuilder::new(
            collaborators.descriptors,
            registry.clone(),
            reporter.clone(),
        );
        let dispatcher = LifecycleDispatcher::new(
            manager.clone(),
            Arc::new(CapabilityDiscovery::new(collaborators.locator)),
            policy.clone(),
            collaborators.extensions,
            ProjectDependencyResolver::new(collaborators.resolver, reporter.clone()),
            reporter.clone(),
            bootstrapper.clone(),
        );

        Self {
            bootstrapper,
            universe,
            listener,
            policy,
            manager,
            registry,
            graph,
            dispatcher,
            reporter,
            table: Mutex::new(CorrelationTable::default()),
        }
    }

    /// `group:artifact` of the bootstrapper.
    #[must_use]
    pub fn bootstrapper(&self) -> &str {
        &self.bootstrapper
    }

    /// Runs the boot build's `before` pass for `actual`.
    ///
    /// Does nothing when the policy finds no descriptors. The policy may
    /// adjust `actual` once the pass completes.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::AlreadyRegistered`] when `actual` is already
    /// being bootstrapped, and any fatal error of graph building, scope
    /// creation or discovery. Everything registered for the pass is torn
    /// down before the error is returned.
    pub fn execution_started(&self, actual: &mut BuildSession) -> Result<(), BootstrapError> {
        let mut boot = BuildSession::derive(actual.request());
        let descriptors = match self.policy.discover_descriptors(&boot) {
            Ok(descriptors) => descriptors,
            Err(error) => {
                self.reporter.bootstrap_failed(&self.bootstrapper, &error);
                return Err(error);
            }
        };
        if descriptors.is_empty() {
            self.reporter.bootstrap_skipped(&self.bootstrapper);
            return Ok(());
        }

        if let Err(error) = self.register(actual.id(), boot.id()) {
            self.reporter.bootstrap_failed(&self.bootstrapper, &error);
            return Err(error);
        }
        self.reporter
            .bootstrap_starting(&self.bootstrapper, actual.id(), boot.id());

        match self.start(actual, &mut boot, &descriptors) {
            Ok((plan, context)) => {
                let mut table = self.lock_table();
                if let Some(entry) = table.by_actual.get_mut(&actual.id()) {
                    entry.state = RunState::HostBuild;
                    entry.run = Some(Arc::new(Mutex::new(BootRun {
                        boot,
                        plan,
                        context,
                    })));
                }
                drop(table);
                self.transitioned(actual.id(), RunState::HostBuild);
                self.reporter
                    .bootstrap_finished(&self.bootstrapper, actual.id());
                Ok(())
            }
            Err(error) => {
                self.abandon(actual.id(), &boot);
                self.reporter.bootstrap_failed(&self.bootstrapper, &error);
                Err(error)
            }
        }
    }

    /// Runs the `after` pass for `actual` and discards its boot session.
    ///
    /// A session that was never started, or has already ended, is ignored.
    pub fn execution_ended(&self, actual: &BuildSession) {
        let shared = {
            let mut table = self.lock_table();
            let Some(entry) = table.by_actual.get_mut(&actual.id()) else {
                return;
            };
            let Some(run) = entry.run.take() else {
                return;
            };
            entry.state = RunState::AfterHooksRunning;
            run
        };
        self.transitioned(actual.id(), RunState::AfterHooksRunning);

        let mut run = lock_run(&shared);
        let BootRun {
            boot,
            plan,
            context,
        } = &mut *run;
        self.dispatcher.run_after(plan, boot, actual, context);

        self.transitioned(actual.id(), RunState::Ended);
        self.abandon(actual.id(), boot);
        self.reporter
            .bootstrap_ended(&self.bootstrapper, actual.id());
    }

    /// Boot session registered for `actual`.
    #[must_use]
    pub fn boot_session_for(&self, actual: SessionId) -> Option<SessionId> {
        self.lock_table()
            .by_actual
            .get(&actual)
            .map(|entry| entry.boot)
    }

    /// Host session a boot session belongs to.
    #[must_use]
    pub fn actual_session_for(&self, boot: SessionId) -> Option<SessionId> {
        self.lock_table().by_boot.get(&boot).copied()
    }

    /// Where the build of `actual` stands, while it is registered.
    #[must_use]
    pub fn state_of(&self, actual: SessionId) -> Option<RunState> {
        self.lock_table()
            .by_actual
            .get(&actual)
            .map(|entry| entry.state)
    }

    /// Runs `inspect` against the boot session of `actual` between the two
    /// passes.
    ///
    /// The correlation table is not locked while `inspect` runs, so it may
    /// query the orchestrator. It must not end `actual` or inspect it again.
    pub fn with_boot_session<R>(
        &self,
        actual: SessionId,
        inspect: impl FnOnce(&BuildSession, &SharedBootContext) -> R,
    ) -> Option<R> {
        let shared = {
            let table = self.lock_table();
            Arc::clone(table.by_actual.get(&actual)?.run.as_ref()?)
        };
        let run = lock_run(&shared);
        Some(inspect(&run.boot, &run.context))
    }

    fn start(
        &self,
        actual: &mut BuildSession,
        boot: &mut BuildSession,
        descriptors: &DescriptorSet,
    ) -> Result<(HookPlan, SharedBootContext), BootstrapError> {
        self.set_state(actual.id(), RunState::BeforeHooksRunning);

        let graph = self
            .graph
            .build(actual.id(), boot, descriptors, self.policy.as_ref())?;
        let order = graph.build_order();
        let workspace = ReactorWorkspaceResolver::new(graph.projects())?;
        boot.set_projects(graph.into_projects());
        boot.install_workspace_reader_first(Arc::new(workspace));
        self.reporter.build_order(&order);

        let mut context = SharedBootContext::new();
        let plan = self.dispatcher.run_before(boot, actual, &mut context)?;
        self.policy.adjust_actual_session(boot, actual);
        Ok((plan, context))
    }

    fn register(&self, actual: SessionId, boot: SessionId) -> Result<(), BootstrapError> {
        let mut table = self.lock_table();
        if table.by_actual.contains_key(&actual) {
            return Err(BootstrapError::AlreadyRegistered { session: actual });
        }
        table.by_actual.insert(
            actual,
            Correlation {
                boot,
                state: RunState::NotStarted,
                run: None,
            },
        );
        table.by_boot.insert(boot, actual);
        drop(table);
        self.transitioned(actual, RunState::NotStarted);
        Ok(())
    }

    fn set_state(&self, actual: SessionId, state: RunState) {
        if let Some(entry) = self.lock_table().by_actual.get_mut(&actual) {
            entry.state = state;
        }
        self.transitioned(actual, state);
    }

    fn transitioned(&self, actual: SessionId, state: RunState) {
        debug!(
            target: "reactor_boot::orchestrator",
            bootstrapper = %self.bootstrapper,
            session = %actual,
            state = %state,
            "bootstrap state changed"
        );
    }

    fn abandon(&self, actual: SessionId, boot: &BuildSession) {
        let disposed = self.manager.dispose_projects(boot.projects());
        self.registry.release(actual);
        let mut table = self.lock_table();
        table.by_actual.remove(&actual);
        table.by_boot.remove(&boot.id());
        drop(table);
        debug!(
            target: "reactor_boot::orchestrator",
            session = %actual,
            boot = %boot.id(),
            disposed,
            "discarded boot session"
        );
    }

    fn lock_table(&self) -> MutexGuard<'_, CorrelationTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_run(run: &Mutex<BootRun>) -> MutexGuard<'_, BootRun> {
    run.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.universe.remove_listener(self.listener);
    }
}

impl fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.lock_table();
        f.debug_struct("SessionOrchestrator")
            .field("bootstrapper", &self.bootstrapper)
            .field("active_sessions", &table.by_actual.len())
            .finish_non_exhaustive()
    }
}

/// Errors raised while setting up an orchestrator.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// An orchestrator together with the configuration it was built from.
#[derive(Debug)]
pub struct Bootstrapper {
    config: BootConfig,
    telemetry: TelemetryHandle,
    orchestrator: SessionOrchestrator,
}

impl Bootstrapper {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// The wired orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &SessionOrchestrator {
        &self.orchestrator
    }
}

/// Loads configuration, installs telemetry and wires an orchestrator using
/// the configuration-driven [`DirectoryScanPolicy`].
///
/// # Errors
///
/// Fails when configuration does not load or telemetry cannot be installed.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    bootstrapper: &str,
    universe: Arc<ScopeUniverse>,
    collaborators: Collaborators,
    reporter: Arc<dyn BootReporter>,
) -> Result<Bootstrapper, SetupError> {
    let config = loader
        .load()
        .map_err(|source| SetupError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| SetupError::Telemetry { source })?;
    let policy = Arc::new(DirectoryScanPolicy::new(config.clone()));
    let orchestrator = SessionOrchestrator::new(
        bootstrapper,
        &config,
        universe,
        policy,
        collaborators,
        reporter,
    );
    Ok(Bootstrapper {
        config,
        telemetry,
        orchestrator,
    })
}
