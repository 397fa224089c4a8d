//! Side-channel dependency resolution for bootstrap projects.
//!
//! Before a project's hooks run, its dependencies are resolved so that hooks
//! see a complete classpath even where the host has not resolved the project
//! yet. Sibling projects are served by the session's workspace readers;
//! everything else goes to the external resolver.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use reactor_boot_participation::{
    ArtifactOrigin, ArtifactRequest, BuildSession, ResolvedArtifact, SharedBootContext,
};
use tracing::debug;

use crate::collaborators::{DependencyResolver, ResolutionRequest, ResolutionScope};
use crate::reporter::BootReporter;

/// Resolves the dependencies of bootstrap projects ahead of their hooks.
pub struct ProjectDependencyResolver {
    resolver: Arc<dyn DependencyResolver>,
    reporter: Arc<dyn BootReporter>,
}

impl ProjectDependencyResolver {
    /// Wires the resolver to its collaborators.
    #[must_use]
    pub fn new(resolver: Arc<dyn DependencyResolver>, reporter: Arc<dyn BootReporter>) -> Self {
        Self { resolver, reporter }
    }

    /// Resolves the dependencies of project `index` of `boot` in `scope` and
    /// stores the result on the project.
    ///
    /// Failures are reported per dependency and the partial result is kept.
    /// Artifacts downloaded from a remote repository are recorded in
    /// `context`. Returns the number of artifacts stored.
    pub fn ensure_resolved(
        &self,
        boot: &mut BuildSession,
        index: usize,
        scope: ResolutionScope,
        context: &mut SharedBootContext,
    ) -> usize {
        let Some(project) = boot.projects().get(index) else {
            return 0;
        };
        let offline = boot.request().is_offline();
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut resolved: Vec<ResolvedArtifact> = Vec::new();

        for dependency in project
            .dependencies()
            .iter()
            .filter(|dependency| scope.includes(dependency.effective_scope()))
        {
            let in_workspace = ArtifactRequest::for_dependency(dependency)
                .and_then(|request| boot.locate_artifact(&request));
            if let Some(file) = in_workspace {
                if seen.insert(file.clone()) {
                    resolved.push(ResolvedArtifact::new(
                        dependency.clone(),
                        file,
                        ArtifactOrigin::Workspace,
                    ));
                }
                continue;
            }

            let request = ResolutionRequest::new(dependency.clone(), scope)
                .with_remote_repositories(project.remote_repositories().to_vec())
                .with_offline(offline);
            match self.resolver.resolve(&request) {
                Ok(artifacts) => {
                    for artifact in artifacts {
                        if !seen.insert(artifact.file().to_path_buf()) {
                            continue;
                        }
                        if let ArtifactOrigin::Downloaded(repository) = artifact.origin() {
                            context.record_download(
                                artifact.file().to_path_buf(),
                                repository.clone(),
                            );
                        }
                        resolved.push(artifact);
                    }
                }
                Err(error) => {
                    self.reporter.dependency_unresolved(
                        project.coordinate(),
                        &dependency.to_string(),
                        &error,
                    );
                }
            }
        }

        debug!(
            target: "reactor_boot::resolution",
            project = %project.coordinate(),
            scope = ?scope,
            artifacts = resolved.len(),
            "resolved project dependencies"
        );
        let count = resolved.len();
        if let Some(target) = boot.project_mut(index) {
            target.set_resolved_artifacts(resolved);
        }
        count
    }
}
