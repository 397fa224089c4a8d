//! Decisions a bootstrapper makes about its own build.
//!
//! [`BootstrapPolicy`] answers which descriptors belong to the boot build,
//! which repositories its projects may use and how much resolution and
//! nesting its extensions get. [`DirectoryScanPolicy`] is the
//! configuration-driven default.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;
use reactor_boot_config::{ALLOW_EXTENSIONS_PROPERTY, BootConfig};
use reactor_boot_participation::{BuildSession, ProjectModel, RemoteRepository};
use walkdir::WalkDir;

use crate::collaborators::ResolutionScope;
use crate::error::BootstrapError;

/// Descriptor locations of a boot build plus those explicitly skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorSet {
    descriptors: IndexSet<PathBuf>,
    skipped: HashSet<PathBuf>,
}

impl DescriptorSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a descriptor, ignoring repeats.
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: impl Into<PathBuf>) -> Self {
        self.push(descriptor);
        self
    }

    /// Marks a descriptor as skipped.
    #[must_use]
    pub fn with_skipped(mut self, descriptor: impl Into<PathBuf>) -> Self {
        self.skipped.insert(descriptor.into());
        self
    }

    /// Adds a descriptor, ignoring repeats.
    pub fn push(&mut self, descriptor: impl Into<PathBuf>) {
        self.descriptors.insert(descriptor.into());
    }

    /// Every descriptor in discovery order, skipped ones included.
    pub fn descriptors(&self) -> impl Iterator<Item = &Path> {
        self.descriptors.iter().map(PathBuf::as_path)
    }

    /// Whether `descriptor` is skipped.
    #[must_use]
    pub fn is_skipped(&self, descriptor: &Path) -> bool {
        self.skipped.contains(descriptor)
    }

    /// Descriptors that will be built, in discovery order.
    #[must_use]
    pub fn selected(&self) -> Vec<PathBuf> {
        self.descriptors
            .iter()
            .filter(|descriptor| !self.skipped.contains(*descriptor))
            .cloned()
            .collect()
    }

    /// Whether no descriptor will be built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors
            .iter()
            .all(|descriptor| self.skipped.contains(descriptor))
    }
}

/// Per-bootstrapper decisions consulted by the orchestrator.
pub trait BootstrapPolicy: Send + Sync {
    /// Descriptors forming the boot build of `boot`.
    ///
    /// An empty set makes the whole pass a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Discovery`] when scanning fails.
    fn discover_descriptors(&self, boot: &BuildSession) -> Result<DescriptorSet, BootstrapError>;

    /// Repositories bootstrap projects may use.
    fn filter_repositories(&self, repositories: &[RemoteRepository]) -> Vec<RemoteRepository>;

    /// Whether extensions of `project` may declare their own extensions.
    fn allow_extension_extensions(&self, boot: &BuildSession, project: &ProjectModel) -> bool;

    /// Scope resolved for each project before its hooks run, if any.
    fn dependency_resolution(&self) -> Option<ResolutionScope>;

    /// Carries results of the boot build over to the host session.
    fn adjust_actual_session(&self, boot: &BuildSession, actual: &mut BuildSession) {
        let _ = (boot, actual);
    }
}

impl<T> BootstrapPolicy for Arc<T>
where
    T: BootstrapPolicy + ?Sized,
{
    fn discover_descriptors(&self, boot: &BuildSession) -> Result<DescriptorSet, BootstrapError> {
        (**self).discover_descriptors(boot)
    }

    fn filter_repositories(&self, repositories: &[RemoteRepository]) -> Vec<RemoteRepository> {
        (**self).filter_repositories(repositories)
    }

    fn allow_extension_extensions(&self, boot: &BuildSession, project: &ProjectModel) -> bool {
        (**self).allow_extension_extensions(boot, project)
    }

    fn dependency_resolution(&self) -> Option<ResolutionScope> {
        (**self).dependency_resolution()
    }

    fn adjust_actual_session(&self, boot: &BuildSession, actual: &mut BuildSession) {
        (**self).adjust_actual_session(boot, actual);
    }
}

/// Removes repositories whose layout is in `excluded`.
#[must_use]
pub fn exclude_layouts(
    repositories: &[RemoteRepository],
    excluded: &[String],
) -> Vec<RemoteRepository> {
    repositories
        .iter()
        .filter(|repository| !excluded.iter().any(|layout| layout == repository.layout()))
        .cloned()
        .collect()
}

/// Whether the `allowExtensions` switch is on for `project`.
///
/// User properties override system properties, which override project
/// properties.
#[must_use]
pub fn extensions_switched_on(boot: &BuildSession, project: &ProjectModel) -> bool {
    let request = boot.request();
    request
        .user_properties()
        .get(ALLOW_EXTENSIONS_PROPERTY)
        .or_else(|| request.system_properties().get(ALLOW_EXTENSIONS_PROPERTY))
        .or_else(|| project.properties().get(ALLOW_EXTENSIONS_PROPERTY))
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Policy that scans the session root for descriptor files.
///
/// The root directory is always inspected. Below it, a directory is entered
/// only if it holds a descriptor itself and its name is not excluded, so a
/// module tree is followed exactly as far as it is connected.
#[derive(Debug, Clone, Default)]
pub struct DirectoryScanPolicy {
    config: BootConfig,
    skipped: HashSet<PathBuf>,
}

impl DirectoryScanPolicy {
    /// Builds the policy from `config`.
    #[must_use]
    pub fn new(config: BootConfig) -> Self {
        Self {
            config,
            skipped: HashSet::new(),
        }
    }

    /// Skips the given descriptor whenever it is discovered.
    #[must_use]
    pub fn with_skipped(mut self, descriptor: impl Into<PathBuf>) -> Self {
        self.skipped.insert(descriptor.into());
        self
    }

    fn is_module_directory(&self, path: &Path, name: &OsStr) -> bool {
        let excluded = self
            .config
            .excluded_directories()
            .iter()
            .any(|directory| OsStr::new(directory) == name);
        !excluded && path.join(self.config.descriptor_file_name()).is_file()
    }
}

impl BootstrapPolicy for DirectoryScanPolicy {
    fn discover_descriptors(&self, boot: &BuildSession) -> Result<DescriptorSet, BootstrapError> {
        let root = boot.request().root_directory();
        let file_name = self.config.descriptor_file_name();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || (entry.file_type().is_dir()
                        && self.is_module_directory(entry.path(), entry.file_name()))
            });

        let mut set = DescriptorSet::new();
        for result in walker {
            let entry = result.map_err(|error| BootstrapError::Discovery {
                root: root.to_path_buf(),
                source: Arc::new(io::Error::from(error)),
            })?;
            let descriptor = entry.path().join(file_name);
            if descriptor.is_file() {
                set.push(descriptor);
            }
        }
        for skipped in &self.skipped {
            set = set.with_skipped(skipped.clone());
        }
        Ok(set)
    }

    fn filter_repositories(&self, repositories: &[RemoteRepository]) -> Vec<RemoteRepository> {
        exclude_layouts(repositories, self.config.excluded_repository_layouts())
    }

    fn allow_extension_extensions(&self, boot: &BuildSession, project: &ProjectModel) -> bool {
        self.config.allow_extension_extensions() || extensions_switched_on(boot, project)
    }

    fn dependency_resolution(&self) -> Option<ResolutionScope> {
        self.config
            .resolve_dependencies()
            .then_some(ResolutionScope::Compile)
    }
}
