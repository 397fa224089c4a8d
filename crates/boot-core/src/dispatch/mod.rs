//! Ordered invocation of participant hooks around the host build.
//!
//! The `before` pass walks the sorted projects, discovers the providers of
//! every applicable scope and invokes them. What it invoked is captured in a
//! [`HookPlan`] which the `after` pass replays unchanged, so each participant
//! sees a matching `after_build` for every `before_build`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use reactor_boot_participation::{
    ActiveScopeGuard, BuildSession, ParticipantError, ProjectModel, ScopeId, SharedBootContext,
};
use strum::Display;
use tracing::debug;

use crate::discovery::{CapabilityDiscovery, CapabilityProvider};
use crate::error::BootstrapError;
use crate::extensions::ExtensionConfigurationReader;
use crate::policy::BootstrapPolicy;
use crate::reporter::BootReporter;
use crate::resolution::ProjectDependencyResolver;
use crate::scope::IsolationScopeManager;

/// Which side of the host build a hook runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum HookPhase {
    /// Before the host build starts.
    Before,
    /// After the host build has ended.
    After,
}

/// Lifecycle of one orchestrated build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Nothing has run yet.
    NotStarted,
    /// The `before` pass is in progress.
    BeforeHooksRunning,
    /// The host is running its build.
    HostBuild,
    /// The `after` pass is in progress.
    AfterHooksRunning,
    /// Both passes are done.
    Ended,
}

/// Providers invoked for one scope of one project.
#[derive(Debug, Clone)]
pub struct PlannedScope {
    scope: ScopeId,
    providers: Vec<CapabilityProvider>,
}

impl PlannedScope {
    /// Scope the providers were discovered in.
    #[must_use]
    pub const fn scope(&self) -> &ScopeId {
        &self.scope
    }

    /// Providers in invocation order.
    #[must_use]
    pub fn providers(&self) -> &[CapabilityProvider] {
        &self.providers
    }
}

/// Scopes and providers of one project.
#[derive(Debug, Clone)]
pub struct PlannedProject {
    index: usize,
    scopes: Vec<PlannedScope>,
}

impl PlannedProject {
    /// Position of the project in the boot session.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Scopes in invocation order.
    #[must_use]
    pub fn scopes(&self) -> &[PlannedScope] {
        &self.scopes
    }
}

/// Record of the `before` pass, replayed by the `after` pass.
#[derive(Debug, Clone, Default)]
pub struct HookPlan {
    projects: Vec<PlannedProject>,
}

impl HookPlan {
    /// Planned projects in build order.
    #[must_use]
    pub fn projects(&self) -> &[PlannedProject] {
        &self.projects
    }

    /// Total number of hook invocations per pass.
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.projects
            .iter()
            .flat_map(|project| &project.scopes)
            .map(|scope| scope.providers.len())
            .sum()
    }
}

/// Walks projects, scopes and providers invoking hooks.
pub struct LifecycleDispatcher {
    manager: Arc<IsolationScopeManager>,
    discovery: Arc<CapabilityDiscovery>,
    policy: Arc<dyn BootstrapPolicy>,
    extensions: Arc<dyn ExtensionConfigurationReader>,
    dependencies: ProjectDependencyResolver,
    reporter: Arc<dyn BootReporter>,
    plugin_key: String,
}

impl LifecycleDispatcher {
    /// Wires the dispatcher.
    ///
    /// `plugin_key` (`group:artifact`) names the plugin whose configuration
    /// declares extension dependencies.
    #[must_use]
    pub fn new(
        manager: Arc<IsolationScopeManager>,
        discovery: Arc<CapabilityDiscovery>,
        policy: Arc<dyn BootstrapPolicy>,
        extensions: Arc<dyn ExtensionConfigurationReader>,
        dependencies: ProjectDependencyResolver,
        reporter: Arc<dyn BootReporter>,
        plugin_key: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            discovery,
            policy,
            extensions,
            dependencies,
            reporter,
            plugin_key: plugin_key.into(),
        }
    }

    /// Runs the `before` pass over every project of `boot`.
    ///
    /// Each project becomes the current project of `boot` while it is
    /// processed. Hook failures are reported and recorded on the boot
    /// session's result; they never stop the walk.
    ///
    /// # Errors
    ///
    /// Discovery and extension scope failures are fatal.
    pub fn run_before(
        &self,
        boot: &mut BuildSession,
        actual: &BuildSession,
        context: &mut SharedBootContext,
    ) -> Result<HookPlan, BootstrapError> {
        let mut plan = HookPlan::default();
        for index in 0..boot.projects().len() {
            boot.set_current_project(Some(index));
            let scopes = boot
                .projects()
                .get(index)
                .map(|project| self.manager.scopes_for(project))
                .unwrap_or_default();
            if scopes.is_empty() {
                continue;
            }
            if let Some(scope) = self.policy.dependency_resolution() {
                self.dependencies.ensure_resolved(boot, index, scope, context);
            }

            let mut planned = Vec::with_capacity(scopes.len());
            for scope in scopes {
                let providers = self.discover(boot, index, &scope)?;
                self.invoke(HookPhase::Before, boot, index, &scope, &providers, actual, context);
                planned.push(PlannedScope { scope, providers });
            }
            plan.projects.push(PlannedProject {
                index,
                scopes: planned,
            });
        }
        boot.set_current_project(None);
        debug!(
            target: "reactor_boot::dispatch",
            projects = plan.projects.len(),
            invocations = plan.invocation_count(),
            "before pass complete"
        );
        Ok(plan)
    }

    /// Replays `plan` invoking `after_build` in the same order.
    pub fn run_after(
        &self,
        plan: &HookPlan,
        boot: &mut BuildSession,
        actual: &BuildSession,
        context: &mut SharedBootContext,
    ) {
        for project in &plan.projects {
            boot.set_current_project(Some(project.index));
            for planned in &project.scopes {
                self.invoke(
                    HookPhase::After,
                    boot,
                    project.index,
                    &planned.scope,
                    &planned.providers,
                    actual,
                    context,
                );
            }
        }
        boot.set_current_project(None);
    }

    fn discover(
        &self,
        boot: &BuildSession,
        index: usize,
        scope: &ScopeId,
    ) -> Result<Vec<CapabilityProvider>, BootstrapError> {
        let Some(project) = boot.projects().get(index) else {
            return Ok(Vec::new());
        };
        self.discovery
            .discover_with(scope, project, || self.extension_scopes(boot, project, scope))
    }

    fn extension_scopes(
        &self,
        boot: &BuildSession,
        project: &ProjectModel,
        parent: &ScopeId,
    ) -> Result<Vec<ScopeId>, BootstrapError> {
        if !self.policy.allow_extension_extensions(boot, project) {
            return Ok(Vec::new());
        }
        self.extensions
            .extensions(project, &self.plugin_key)
            .iter()
            .map(|dependency| self.manager.extension_scope_for(boot, project, parent, dependency))
            .collect()
    }

    #[expect(
        clippy::too_many_arguments,
        reason = "a hook needs both sessions, the project, its scope and the shared context"
    )]
    fn invoke(
        &self,
        phase: HookPhase,
        boot: &mut BuildSession,
        index: usize,
        scope: &ScopeId,
        providers: &[CapabilityProvider],
        actual: &BuildSession,
        context: &mut SharedBootContext,
    ) {
        let mut failures = Vec::new();
        if let Some(project) = boot.projects().get(index) {
            for provider in providers {
                self.reporter
                    .participant_invoking(provider.name(), project.coordinate(), phase);
                let outcome = {
                    let _active = ActiveScopeGuard::enter(scope.clone());
                    call_hook(phase, provider, boot, project, actual, context)
                };
                if let Err(error) = outcome {
                    self.reporter
                        .participant_failed(provider.name(), project.coordinate(), phase, &error);
                    failures.push(format!(
                        "{} failed {phase} {}: {error}",
                        provider.name(),
                        project.coordinate()
                    ));
                }
            }
        }
        for failure in failures {
            boot.result_mut().record_failure(failure);
        }
    }
}

fn call_hook(
    phase: HookPhase,
    provider: &CapabilityProvider,
    boot: &BuildSession,
    project: &ProjectModel,
    actual: &BuildSession,
    context: &mut SharedBootContext,
) -> Result<(), ParticipantError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match (provider, phase) {
        (CapabilityProvider::Basic(participant), HookPhase::Before) => {
            participant.before_build(boot, project, actual)
        }
        (CapabilityProvider::Basic(participant), HookPhase::After) => {
            participant.after_build(boot, project, actual)
        }
        (CapabilityProvider::Contextual(participant), HookPhase::Before) => {
            participant.before_build(boot, project, context)
        }
        (CapabilityProvider::Contextual(participant), HookPhase::After) => {
            participant.after_build(boot, project, context)
        }
    }));
    outcome.unwrap_or_else(|payload| {
        Err(ParticipantError::panicked(panic_message(payload.as_ref())))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "participant panicked".to_owned())
}
