//! Boot-build engine that runs extension participants around a host build.
//!
//! A [`SessionOrchestrator`] is notified when the host session starts and
//! ends. On start it derives a boot session, discovers and sorts the
//! bootstrap projects, wires their isolation scopes and invokes every
//! discovered participant's `before` hook. On end it replays the same plan
//! for the `after` hooks and discards the boot session.
//!
//! Host integrations fan session events out through an
//! [`ExecutionInterceptor`], which guarantees the end notification reaches
//! each orchestrator once.

pub mod collaborators;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod extensions;
pub mod graph;
pub mod interceptor;
pub mod orchestrator;
pub mod policy;
pub mod reporter;
pub mod resolution;
pub mod scope;
pub mod telemetry;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use collaborators::{
    DependencyResolver, DescriptorBuildRequest, DescriptorBuilder, ManifestReader,
    ProjectScopeCache, ResolutionScope,
};
pub use config::{ConfigLoader, StaticConfigLoader, SystemConfigLoader};
pub use discovery::{CapabilityDiscovery, CapabilityLocator, CapabilityProvider, CapabilityRegistry};
pub use dispatch::{HookPhase, HookPlan, LifecycleDispatcher, RunState};
pub use error::{BootstrapError, ManifestError, ResolutionError, ScopeError};
pub use interceptor::{ExecutionInterceptor, ExecutionParticipant};
pub use orchestrator::{
    Bootstrapper, Collaborators, SessionOrchestrator, SetupError, bootstrap_with,
};
pub use policy::{BootstrapPolicy, DescriptorSet, DirectoryScanPolicy};
pub use reporter::{BootReporter, TracingBootReporter};
pub use scope::{BootstrapImports, IsolationScopeManager, ScopeUniverse};
pub use workspace::ReactorWorkspaceResolver;
