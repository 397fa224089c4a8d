//! Structured reporting of bootstrap lifecycle events.

use std::path::Path;
use std::sync::Arc;

use reactor_boot_participation::{ParticipantError, ProjectCoordinate, SessionId};

use crate::dispatch::HookPhase;
use crate::error::{BootstrapError, ResolutionError};

/// Observer notified as a bootstrap pass progresses.
pub trait BootReporter: Send + Sync {
    /// No descriptors were found; the pass does nothing.
    fn bootstrap_skipped(&self, bootstrapper: &str);

    /// A pass is starting for `actual`.
    fn bootstrap_starting(&self, bootstrapper: &str, actual: SessionId, boot: SessionId);

    /// A descriptor was excluded by the skip set.
    fn descriptor_skipped(&self, descriptor: &Path);

    /// The projects were sorted into build order.
    fn build_order(&self, projects: &[ProjectCoordinate]);

    /// A hook is about to run.
    fn participant_invoking(&self, provider: &str, project: &ProjectCoordinate, phase: HookPhase);

    /// A hook failed; the walk continues.
    fn participant_failed(
        &self,
        provider: &str,
        project: &ProjectCoordinate,
        phase: HookPhase,
        error: &ParticipantError,
    );

    /// A project dependency could not be resolved ahead of the hooks.
    fn dependency_unresolved(
        &self,
        project: &ProjectCoordinate,
        dependency: &str,
        error: &ResolutionError,
    );

    /// The `before` pass completed.
    fn bootstrap_finished(&self, bootstrapper: &str, actual: SessionId);

    /// The `before` pass failed fatally.
    fn bootstrap_failed(&self, bootstrapper: &str, error: &BootstrapError);

    /// The `after` pass completed and the boot session was discarded.
    fn bootstrap_ended(&self, bootstrapper: &str, actual: SessionId);
}

impl<T> BootReporter for Arc<T>
where
    T: BootReporter + ?Sized,
{
    fn bootstrap_skipped(&self, bootstrapper: &str) {
        (**self).bootstrap_skipped(bootstrapper);
    }

    fn bootstrap_starting(&self, bootstrapper: &str, actual: SessionId, boot: SessionId) {
        (**self).bootstrap_starting(bootstrapper, actual, boot);
    }

    fn descriptor_skipped(&self, descriptor: &Path) {
        (**self).descriptor_skipped(descriptor);
    }

    fn build_order(&self, projects: &[ProjectCoordinate]) {
        (**self).build_order(projects);
    }

    fn participant_invoking(&self, provider: &str, project: &ProjectCoordinate, phase: HookPhase) {
        (**self).participant_invoking(provider, project, phase);
    }

    fn participant_failed(
        &self,
        provider: &str,
        project: &ProjectCoordinate,
        phase: HookPhase,
        error: &ParticipantError,
    ) {
        (**self).participant_failed(provider, project, phase, error);
    }

    fn dependency_unresolved(
        &self,
        project: &ProjectCoordinate,
        dependency: &str,
        error: &ResolutionError,
    ) {
        (**self).dependency_unresolved(project, dependency, error);
    }

    fn bootstrap_finished(&self, bootstrapper: &str, actual: SessionId) {
        (**self).bootstrap_finished(bootstrapper, actual);
    }

    fn bootstrap_failed(&self, bootstrapper: &str, error: &BootstrapError) {
        (**self).bootstrap_failed(bootstrapper, error);
    }

    fn bootstrap_ended(&self, bootstrapper: &str, actual: SessionId) {
        (**self).bootstrap_ended(bootstrapper, actual);
    }
}

/// Default reporter that records events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBootReporter;

impl TracingBootReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl BootReporter for TracingBootReporter {
    fn bootstrap_skipped(&self, bootstrapper: &str) {
        tracing::info!(
            target: "reactor_boot::orchestrator",
            event = "bootstrap_skipped",
            bootstrapper,
            "no bootstrap descriptors found, skipping bootstrapper"
        );
    }

    fn bootstrap_starting(&self, bootstrapper: &str, actual: SessionId, boot: SessionId) {
        tracing::info!(
            target: "reactor_boot::orchestrator",
            event = "bootstrap_starting",
            bootstrapper,
            actual = %actual,
            boot = %boot,
            "starting bootstrap pass"
        );
    }

    fn descriptor_skipped(&self, descriptor: &Path) {
        tracing::info!(
            target: "reactor_boot::graph",
            event = "descriptor_skipped",
            descriptor = %descriptor.display(),
            "skipping module descriptor"
        );
    }

    fn build_order(&self, projects: &[ProjectCoordinate]) {
        if projects.len() < 2 {
            return;
        }
        let order: Vec<String> = projects.iter().map(ToString::to_string).collect();
        tracing::info!(
            target: "reactor_boot::graph",
            event = "build_order",
            projects = ?order,
            "bootstrap reactor build order"
        );
    }

    fn participant_invoking(&self, provider: &str, project: &ProjectCoordinate, phase: HookPhase) {
        tracing::debug!(
            target: "reactor_boot::dispatch",
            event = "participant_invoking",
            provider,
            project = %project,
            phase = %phase,
            "invoking bootstrap participant"
        );
    }

    fn participant_failed(
        &self,
        provider: &str,
        project: &ProjectCoordinate,
        phase: HookPhase,
        error: &ParticipantError,
    ) {
        tracing::error!(
            target: "reactor_boot::dispatch",
            event = "participant_failed",
            provider,
            project = %project,
            phase = %phase,
            error = %error,
            "bootstrap participant failed"
        );
    }

    fn dependency_unresolved(
        &self,
        project: &ProjectCoordinate,
        dependency: &str,
        error: &ResolutionError,
    ) {
        tracing::warn!(
            target: "reactor_boot::resolution",
            event = "dependency_unresolved",
            project = %project,
            dependency,
            error = %error,
            "failed to resolve bootstrap project dependency"
        );
    }

    fn bootstrap_finished(&self, bootstrapper: &str, actual: SessionId) {
        tracing::info!(
            target: "reactor_boot::orchestrator",
            event = "bootstrap_finished",
            bootstrapper,
            actual = %actual,
            "bootstrap before pass completed"
        );
    }

    fn bootstrap_failed(&self, bootstrapper: &str, error: &BootstrapError) {
        tracing::error!(
            target: "reactor_boot::orchestrator",
            event = "bootstrap_failed",
            bootstrapper,
            error = %error,
            "bootstrap pass failed"
        );
    }

    fn bootstrap_ended(&self, bootstrapper: &str, actual: SessionId) {
        tracing::info!(
            target: "reactor_boot::orchestrator",
            event = "bootstrap_ended",
            bootstrapper,
            actual = %actual,
            "bootstrap after pass completed"
        );
    }
}
