//! Scope identities and the per-thread active scope.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Identifier of an isolation scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(String);

impl ScopeId {
    /// Wraps an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier begins with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ScopeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

thread_local! {
    static ACTIVE_SCOPE: RefCell<Option<ScopeId>> = const { RefCell::new(None) };
}

/// Scope whose code is currently executing on this thread, if any.
#[must_use]
pub fn active_scope() -> Option<ScopeId> {
    ACTIVE_SCOPE.with(|active| active.borrow().clone())
}

/// Makes a scope the active scope of the current thread until dropped.
///
/// Guards nest: dropping a guard restores whatever was active when it was
/// created, including on unwind.
#[derive(Debug)]
#[must_use = "the scope is only active while the guard is alive"]
pub struct ActiveScopeGuard {
    previous: Option<ScopeId>,
    _not_send: PhantomData<*const ()>,
}

impl ActiveScopeGuard {
    /// Activates `scope` on the current thread.
    pub fn enter(scope: ScopeId) -> Self {
        let previous = ACTIVE_SCOPE.with(|active| active.replace(Some(scope)));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ActiveScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_SCOPE.with(|active| *active.borrow_mut() = previous);
    }
}
