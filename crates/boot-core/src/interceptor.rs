//! Fan-out of host session events to execution participants.
//!
//! The host reports the end of a session through more than one channel.
//! [`ExecutionInterceptor`] remembers which sessions it has seen start and
//! forwards the first end notification for each, dropping the rest.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use reactor_boot_participation::{BuildSession, SessionId};

use crate::error::BootstrapError;
use crate::orchestrator::SessionOrchestrator;

/// Receiver of host session start and end.
pub trait ExecutionParticipant: Send + Sync {
    /// The host session has started.
    ///
    /// # Errors
    ///
    /// A returned error aborts the host session.
    fn execution_started(&self, session: &mut BuildSession) -> Result<(), BootstrapError>;

    /// The host session has ended.
    fn execution_ended(&self, session: &BuildSession);
}

impl<T> ExecutionParticipant for Arc<T>
where
    T: ExecutionParticipant + ?Sized,
{
    fn execution_started(&self, session: &mut BuildSession) -> Result<(), BootstrapError> {
        (**self).execution_started(session)
    }

    fn execution_ended(&self, session: &BuildSession) {
        (**self).execution_ended(session);
    }
}

impl ExecutionParticipant for SessionOrchestrator {
    fn execution_started(&self, session: &mut BuildSession) -> Result<(), BootstrapError> {
        Self::execution_started(self, session)
    }

    fn execution_ended(&self, session: &BuildSession) {
        Self::execution_ended(self, session);
    }
}

/// Forwards host session events to every registered participant in order.
#[derive(Default)]
pub struct ExecutionInterceptor {
    participants: Vec<Arc<dyn ExecutionParticipant>>,
    open: Mutex<HashSet<SessionId>>,
}

impl ExecutionInterceptor {
    /// Creates an interceptor without participants.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a participant.
    #[must_use]
    pub fn with_participant(mut self, participant: Arc<dyn ExecutionParticipant>) -> Self {
        self.participants.push(participant);
        self
    }

    /// The host session has started.
    ///
    /// The first failing participant stops the fan-out; the session still
    /// counts as open so that its end reaches the participants that started.
    ///
    /// # Errors
    ///
    /// Returns the first participant error.
    pub fn on_session_started(&self, session: &mut BuildSession) -> Result<(), BootstrapError> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id());
        for participant in &self.participants {
            participant.execution_started(session)?;
        }
        Ok(())
    }

    /// The host reported the session as ended.
    pub fn on_session_ended(&self, session: &BuildSession) {
        self.end(session);
    }

    /// The host published the session's final result.
    pub fn on_execution_result(&self, session: &BuildSession) {
        self.end(session);
    }

    /// Whether `session` started and has not ended yet.
    #[must_use]
    pub fn is_open(&self, session: SessionId) -> bool {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&session)
    }

    fn end(&self, session: &BuildSession) {
        let was_open = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session.id());
        if !was_open {
            return;
        }
        for participant in &self.participants {
            participant.execution_ended(session);
        }
    }
}
