//! Workspace reader exposing the bootstrap projects to artifact lookups.
//!
//! Installed first in the boot session's lookup chain so that bootstrap
//! projects resolve against each other's build output instead of a
//! repository. What a lookup returns depends on how far the project got:
//! packaged files win, otherwise compiled output directories stand in until
//! packaging has run.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use reactor_boot_participation::{
    ArtifactRequest, LifecyclePhase, ProducedArtifact, ProjectModel, WorkspaceReader,
};

use crate::error::{BootstrapError, ProjectCollision};

/// Repository identifier of the reactor workspace.
pub const REACTOR_REPOSITORY_ID: &str = "reactor";

const PACKAGED_PHASES: [LifecyclePhase; 3] = [
    LifecyclePhase::Package,
    LifecyclePhase::Install,
    LifecyclePhase::Deploy,
];

/// Lookup over the projects of a boot session.
#[derive(Debug, Clone)]
pub struct ReactorWorkspaceResolver {
    by_key: IndexMap<String, ProjectModel>,
    by_versionless_key: HashMap<String, Vec<String>>,
}

impl ReactorWorkspaceResolver {
    /// Indexes `projects` by identity.
    ///
    /// Projects are shared with the caller: build progress recorded on them
    /// later is visible to lookups.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::DuplicateProject`] when identities collide.
    pub fn new(projects: &[ProjectModel]) -> Result<Self, BootstrapError> {
        let mut by_key: IndexMap<String, ProjectModel> = IndexMap::with_capacity(projects.len());
        let mut collisions: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
        for project in projects {
            let key = project.coordinate().key();
            if let Some(existing) = by_key.get(&key) {
                collisions
                    .entry(key)
                    .or_insert_with(|| vec![existing.descriptor().to_path_buf()])
                    .push(project.descriptor().to_path_buf());
            } else {
                by_key.insert(key, project.clone());
            }
        }
        if !collisions.is_empty() {
            return Err(BootstrapError::DuplicateProject {
                collisions: collisions
                    .into_iter()
                    .map(|(identity, files)| ProjectCollision { identity, files })
                    .collect(),
            });
        }

        let mut by_versionless_key: HashMap<String, Vec<String>> = HashMap::new();
        for (key, project) in &by_key {
            by_versionless_key
                .entry(project.coordinate().versionless_key())
                .or_default()
                .push(key.clone());
        }
        Ok(Self {
            by_key,
            by_versionless_key,
        })
    }

    /// Number of indexed projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether no project is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Identities of the indexed projects.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }
}

fn find(project: &ProjectModel, request: &ArtifactRequest) -> Option<PathBuf> {
    if request.extension() == "pom" {
        return Some(project.descriptor().to_path_buf());
    }

    let packaged = matching_artifact(project, request)
        .and_then(|artifact| artifact.file().map(PathBuf::from))
        .filter(|file| file.exists());
    if packaged.is_some() {
        return packaged;
    }

    let state = project.build_state();
    if state.has_any_phase(&PACKAGED_PHASES) {
        return None;
    }
    let directories = project.directories();
    if request.is_test_artifact() {
        state
            .has_phase(LifecyclePhase::TestCompile)
            .then(|| directories.test_output().to_path_buf())
    } else {
        state
            .has_phase(LifecyclePhase::Compile)
            .then(|| directories.output().to_path_buf())
    }
}

fn matching_artifact(
    project: &ProjectModel,
    request: &ArtifactRequest,
) -> Option<ProducedArtifact> {
    let wanted = request.conflict_id();
    let main = project.main_artifact();
    if main.conflict_id() == wanted {
        return Some(main);
    }
    project
        .build_state()
        .attached_artifacts()
        .into_iter()
        .find(|artifact| artifact.conflict_id() == wanted)
}

impl WorkspaceReader for ReactorWorkspaceResolver {
    fn repository_id(&self) -> &str {
        REACTOR_REPOSITORY_ID
    }

    fn locate(&self, request: &ArtifactRequest) -> Option<PathBuf> {
        self.by_key
            .get(&request.project_key())
            .and_then(|project| find(project, request))
    }

    fn list_versions(&self, request: &ArtifactRequest) -> Vec<String> {
        self.by_versionless_key
            .get(&request.versionless_key())
            .into_iter()
            .flatten()
            .filter_map(|key| self.by_key.get(key))
            .filter(|project| {
                let candidate = request.with_version(project.coordinate().version());
                find(project, &candidate).is_some()
            })
            .map(|project| project.coordinate().version().to_owned())
            .collect()
    }
}
