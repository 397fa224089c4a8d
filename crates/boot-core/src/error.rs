//! Errors raised while bootstrapping.
//!
//! [`BootstrapError`] is what `execution_started` surfaces to the host; every
//! variant is fatal for the bootstrap pass. The narrower error types belong to
//! the collaborators and are wrapped with the identity they concern.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use reactor_boot_participation::{ScopeId, SessionId};
use thiserror::Error;

/// Descriptors that built into projects sharing one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCollision {
    /// Shared `group:artifact:version` identity.
    pub identity: String,
    /// Descriptor files in encounter order.
    pub files: Vec<PathBuf>,
}

impl fmt::Display for ProjectCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files: Vec<String> = self
            .files
            .iter()
            .map(|file| file.display().to_string())
            .collect();
        write!(f, "{} ({})", self.identity, files.join(", "))
    }
}

fn describe_collisions(collisions: &[ProjectCollision]) -> String {
    collisions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_cycle(members: &[String], files: &[PathBuf]) -> String {
    members
        .iter()
        .zip(files)
        .map(|(identity, file)| format!("{identity} ({})", file.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fatal errors of a bootstrap pass.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Two or more descriptors share a project identity.
    #[error("duplicate bootstrap projects: {}", describe_collisions(.collisions))]
    DuplicateProject {
        /// Every colliding identity with its descriptor files.
        collisions: Vec<ProjectCollision>,
    },
    /// The bootstrap projects depend on each other in a cycle.
    #[error("bootstrap projects form a dependency cycle: {}", describe_cycle(.members, .files))]
    ProjectCycle {
        /// Identities of the projects on the cycle, in descriptor order.
        members: Vec<String>,
        /// Descriptor file of each member.
        files: Vec<PathBuf>,
    },
    /// A descriptor could not be built into a project.
    #[error("failed to build descriptor {}: {message}", .file.display())]
    DescriptorBuild {
        /// Offending descriptor.
        file: PathBuf,
        /// Reason reported by the descriptor builder.
        message: String,
    },
    /// Scanning for descriptors failed.
    #[error("failed to discover bootstrap descriptors under {}: {source}", .root.display())]
    Discovery {
        /// Directory being scanned.
        root: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The session is already being bootstrapped.
    #[error("{session} is already registered for bootstrapping")]
    AlreadyRegistered {
        /// Session whose registration already exists.
        session: SessionId,
    },
    /// The capability locator failed.
    #[error("capability lookup failed in scope {scope}: {source}")]
    Lookup {
        /// Scope being searched.
        scope: ScopeId,
        /// Underlying locator error.
        #[source]
        source: LocatorError,
    },
    /// An extension's own dependencies could not be resolved.
    #[error("failed to resolve extension {coordinate}: {source}")]
    ExtensionResolution {
        /// Extension dependency being resolved.
        coordinate: String,
        /// Underlying resolver error.
        #[source]
        source: ResolutionError,
    },
    /// An extension manifest could not be read.
    #[error("failed to read extension manifest from {}: {source}", .location.display())]
    ManifestRead {
        /// Binary location carrying the manifest.
        location: PathBuf,
        /// Underlying reader error.
        #[source]
        source: ManifestError,
    },
    /// Scope bookkeeping failed.
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// Errors raised by the scope universe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A scope with this identifier already exists.
    #[error("scope '{id}' already exists")]
    Duplicate {
        /// Colliding identifier.
        id: ScopeId,
    },
    /// No scope with this identifier exists.
    #[error("scope '{id}' does not exist")]
    NotFound {
        /// Missing identifier.
        id: ScopeId,
    },
}

/// Errors reported by a dependency resolver.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// An artifact is unavailable in every repository consulted.
    #[error("artifact {coordinate} could not be found")]
    NotFound {
        /// Missing artifact.
        coordinate: String,
    },
    /// Offline mode prevented a remote lookup.
    #[error("artifact {coordinate} is not cached and the build is offline")]
    Offline {
        /// Missing artifact.
        coordinate: String,
    },
    /// Any other resolver failure.
    #[error("{message}")]
    Failed {
        /// Reason reported by the resolver.
        message: String,
    },
}

/// Failure of the capability lookup infrastructure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LocatorError {
    message: String,
}

impl LocatorError {
    /// Builds a locator error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Reason reported by the locator.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors reported by a manifest reader.
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// The binary carries no manifest entry.
    #[error("no extension manifest entry")]
    EntryNotFound,
    /// The binary could not be read.
    #[error("failed to read binary: {source}")]
    Io {
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The manifest could not be parsed.
    #[error("malformed extension manifest: {message}")]
    Malformed {
        /// Parser message.
        message: String,
    },
}
