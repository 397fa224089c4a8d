//! Types shared between the bootstrap engine and the participants it drives.
//!
//! Extension code depends on this crate alone: it implements
//! [`BootParticipant`] or [`ContextualBootParticipant`] and receives
//! [`BuildSession`]s and [`ProjectModel`]s from the engine.

pub mod context;
pub mod coordinate;
pub mod participant;
pub mod project;
pub mod scope;
pub mod session;

pub use context::{DOWNLOADS_KEY, Downloads, SharedBootContext};
pub use coordinate::{
    ArtifactRequest, DEFAULT_ARTIFACT_TYPE, DEFAULT_DEPENDENCY_SCOPE, DependencyCoordinate,
    ProducedArtifact, ProjectCoordinate, TESTS_CLASSIFIER, extension_for_type,
};
pub use participant::{BootParticipant, ContextualBootParticipant, ParticipantError};
pub use project::{
    ArtifactOrigin, BuildDirectories, BuildState, LifecyclePhase, PluginDeclaration,
    ProjectContext, ProjectModel, ResolvedArtifact,
};
pub use scope::{ActiveScopeGuard, ScopeId, active_scope};
pub use session::{
    BuildSession, RemoteRepository, SessionId, SessionRequest, SessionResult, WorkspaceReader,
};
