//! Capabilities extension code implements to take part in a build.

use thiserror::Error;

use crate::context::SharedBootContext;
use crate::project::ProjectModel;
use crate::session::BuildSession;

/// Failure reported by a participant hook.
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// The hook returned an error.
    #[error("{message}")]
    Failed {
        /// Human-readable description.
        message: String,
        /// Underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The hook panicked.
    #[error("participant panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl ParticipantError {
    /// Builds a failure without an underlying cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a failure wrapping `source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds the error recorded for a panicking hook.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::Panicked {
            message: message.into(),
        }
    }
}

/// Basic participant: sees the bootstrap session and the host session.
pub trait BootParticipant: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs before the host build starts.
    ///
    /// # Errors
    ///
    /// Any error is logged against the project; remaining hooks still run.
    fn before_build(
        &self,
        boot_session: &BuildSession,
        project: &ProjectModel,
        actual_session: &BuildSession,
    ) -> Result<(), ParticipantError>;

    /// Runs after the host build has ended.
    ///
    /// # Errors
    ///
    /// Any error is logged against the project; remaining hooks still run.
    fn after_build(
        &self,
        boot_session: &BuildSession,
        project: &ProjectModel,
        actual_session: &BuildSession,
    ) -> Result<(), ParticipantError>;
}

/// Contextual participant: shares a [`SharedBootContext`] with every other
/// contextual participant of the same build.
pub trait ContextualBootParticipant: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs before the host build starts.
    ///
    /// # Errors
    ///
    /// Any error is logged against the project; remaining hooks still run.
    fn before_build(
        &self,
        boot_session: &BuildSession,
        project: &ProjectModel,
        context: &mut SharedBootContext,
    ) -> Result<(), ParticipantError>;

    /// Runs after the host build has ended.
    ///
    /// # Errors
    ///
    /// Any error is logged against the project; remaining hooks still run.
    fn after_build(
        &self,
        boot_session: &BuildSession,
        project: &ProjectModel,
        context: &mut SharedBootContext,
    ) -> Result<(), ParticipantError>;
}
