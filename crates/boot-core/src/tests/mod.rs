//! Crate-internal test support and behaviour scenarios.

mod behaviour;
pub(crate) mod support;
