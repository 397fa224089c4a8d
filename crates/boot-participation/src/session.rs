//! Build sessions and the workspace lookup chain they carry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::coordinate::ArtifactRequest;
use crate::project::ProjectModel;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one build session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates an identity no other session in this process carries.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value of the identity.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A remote artifact repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteRepository {
    id: String,
    url: String,
    layout: String,
}

impl RemoteRepository {
    /// Builds a repository with the `default` layout.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            layout: "default".to_owned(),
        }
    }

    /// Sets the repository layout.
    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Repository identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Repository URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Repository layout.
    #[must_use]
    pub fn layout(&self) -> &str {
        &self.layout
    }
}

/// Parameters of one build invocation.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    root_directory: PathBuf,
    goals: Vec<String>,
    active_profiles: Vec<String>,
    system_properties: BTreeMap<String, String>,
    user_properties: BTreeMap<String, String>,
    offline: bool,
    remote_repositories: Vec<RemoteRepository>,
    started_at: SystemTime,
}

impl SessionRequest {
    /// Builds a request rooted at `root_directory`, started now.
    pub fn new(root_directory: impl Into<PathBuf>) -> Self {
        Self {
            root_directory: root_directory.into(),
            goals: Vec::new(),
            active_profiles: Vec::new(),
            system_properties: BTreeMap::new(),
            user_properties: BTreeMap::new(),
            offline: false,
            remote_repositories: Vec::new(),
            started_at: SystemTime::now(),
        }
    }

    /// Adds a goal.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    /// Adds an active profile.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.active_profiles.push(profile.into());
        self
    }

    /// Sets a system property.
    #[must_use]
    pub fn with_system_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.system_properties.insert(key.into(), value.into());
        self
    }

    /// Sets a user property.
    #[must_use]
    pub fn with_user_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(key.into(), value.into());
        self
    }

    /// Sets offline mode.
    #[must_use]
    pub const fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Adds a remote repository.
    #[must_use]
    pub fn with_remote_repository(mut self, repository: RemoteRepository) -> Self {
        self.remote_repositories.push(repository);
        self
    }

    /// Directory the build was started in.
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Requested goals.
    #[must_use]
    pub fn goals(&self) -> &[String] {
        &self.goals
    }

    /// Active profile identifiers.
    #[must_use]
    pub fn active_profiles(&self) -> &[String] {
        &self.active_profiles
    }

    /// System properties.
    #[must_use]
    pub const fn system_properties(&self) -> &BTreeMap<String, String> {
        &self.system_properties
    }

    /// User properties.
    #[must_use]
    pub const fn user_properties(&self) -> &BTreeMap<String, String> {
        &self.user_properties
    }

    /// Whether remote access is disabled.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.offline
    }

    /// Remote repositories configured for the build.
    #[must_use]
    pub fn remote_repositories(&self) -> &[RemoteRepository] {
        &self.remote_repositories
    }

    /// Time the build was started.
    #[must_use]
    pub const fn started_at(&self) -> SystemTime {
        self.started_at
    }
}

/// Outcome collected while a session runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResult {
    failures: Vec<String>,
}

impl SessionResult {
    /// Records a failure message.
    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// Failures recorded so far.
    #[must_use]
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    /// Whether any failure was recorded.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// A source of artifacts built within the current workspace.
pub trait WorkspaceReader: Send + Sync {
    /// Identifier shown when listing the lookup chain.
    fn repository_id(&self) -> &str;

    /// Locates the file backing `request`, if this workspace provides it.
    fn locate(&self, request: &ArtifactRequest) -> Option<PathBuf>;

    /// Versions of `request`'s `group:artifact` this workspace can locate.
    fn list_versions(&self, request: &ArtifactRequest) -> Vec<String>;
}

/// A build session: its request, its projects and its workspace lookups.
#[derive(Clone)]
pub struct BuildSession {
    id: SessionId,
    request: SessionRequest,
    result: SessionResult,
    projects: Vec<ProjectModel>,
    current_project: Option<usize>,
    workspace_readers: Vec<Arc<dyn WorkspaceReader>>,
}

impl BuildSession {
    /// Creates a session with a fresh identity and an empty result.
    #[must_use]
    pub fn new(request: SessionRequest) -> Self {
        Self {
            id: SessionId::next(),
            request,
            result: SessionResult::default(),
            projects: Vec::new(),
            current_project: None,
            workspace_readers: Vec::new(),
        }
    }

    /// Derives a session that shares `request`'s settings but nothing else.
    #[must_use]
    pub fn derive(request: &SessionRequest) -> Self {
        Self::new(request.clone())
    }

    /// Session identity.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Request the session was created from.
    #[must_use]
    pub const fn request(&self) -> &SessionRequest {
        &self.request
    }

    /// Collected outcome.
    #[must_use]
    pub const fn result(&self) -> &SessionResult {
        &self.result
    }

    /// Mutable access to the collected outcome.
    pub const fn result_mut(&mut self) -> &mut SessionResult {
        &mut self.result
    }

    /// Projects in build order.
    #[must_use]
    pub fn projects(&self) -> &[ProjectModel] {
        &self.projects
    }

    /// Mutable access to one project.
    pub fn project_mut(&mut self, index: usize) -> Option<&mut ProjectModel> {
        self.projects.get_mut(index)
    }

    /// Replaces the projects and clears the current project.
    pub fn set_projects(&mut self, projects: Vec<ProjectModel>) {
        self.projects = projects;
        self.current_project = None;
    }

    /// Project currently being processed.
    #[must_use]
    pub fn current_project(&self) -> Option<&ProjectModel> {
        self.projects.get(self.current_project?)
    }

    /// Selects the project currently being processed.
    ///
    /// Out-of-range indices clear the selection.
    pub fn set_current_project(&mut self, index: Option<usize>) {
        self.current_project = index.filter(|position| *position < self.projects.len());
    }

    /// Installs `reader` ahead of every reader already present.
    pub fn install_workspace_reader_first(&mut self, reader: Arc<dyn WorkspaceReader>) {
        self.workspace_readers.insert(0, reader);
    }

    /// Readers in lookup order.
    #[must_use]
    pub fn workspace_readers(&self) -> &[Arc<dyn WorkspaceReader>] {
        &self.workspace_readers
    }

    /// Asks each reader in order and returns the first hit.
    #[must_use]
    pub fn locate_artifact(&self, request: &ArtifactRequest) -> Option<PathBuf> {
        self.workspace_readers
            .iter()
            .find_map(|reader| reader.locate(request))
    }

    /// Versions every reader can provide, first occurrence wins.
    #[must_use]
    pub fn list_versions(&self, request: &ArtifactRequest) -> Vec<String> {
        let mut versions: Vec<String> = Vec::new();
        for version in self
            .workspace_readers
            .iter()
            .flat_map(|reader| reader.list_versions(request))
        {
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        versions
    }
}

impl fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let readers: Vec<&str> = self
            .workspace_readers
            .iter()
            .map(|reader| reader.repository_id())
            .collect();
        f.debug_struct("BuildSession")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("result", &self.result)
            .field("projects", &self.projects.len())
            .field("current_project", &self.current_project)
            .field("workspace_readers", &readers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::ProjectCoordinate;

    struct FixedReader {
        id: &'static str,
        file: Option<&'static str>,
        versions: Vec<&'static str>,
    }

    impl WorkspaceReader for FixedReader {
        fn repository_id(&self) -> &str {
            self.id
        }

        fn locate(&self, _request: &ArtifactRequest) -> Option<PathBuf> {
            self.file.map(PathBuf::from)
        }

        fn list_versions(&self, _request: &ArtifactRequest) -> Vec<String> {
            self.versions.iter().map(|version| (*version).to_owned()).collect()
        }
    }

    #[test]
    fn derived_sessions_get_fresh_identity_and_empty_result() {
        let request = SessionRequest::new("/work").with_offline(true);
        let mut actual = BuildSession::new(request.clone());
        actual.result_mut().record_failure("earlier");
        let boot = BuildSession::derive(actual.request());
        assert_ne!(boot.id(), actual.id());
        assert!(!boot.result().has_failures());
        assert!(boot.request().is_offline());
    }

    #[test]
    fn first_installed_reader_wins() {
        let mut session = BuildSession::new(SessionRequest::new("/work"));
        session.install_workspace_reader_first(Arc::new(FixedReader {
            id: "host",
            file: Some("/host/a.jar"),
            versions: vec!["1.0", "2.0"],
        }));
        session.install_workspace_reader_first(Arc::new(FixedReader {
            id: "reactor",
            file: Some("/reactor/a.jar"),
            versions: vec!["2.0", "3.0"],
        }));
        let request = ArtifactRequest::new("g", "a", "2.0", "jar");
        assert_eq!(session.locate_artifact(&request), Some(PathBuf::from("/reactor/a.jar")));
        assert_eq!(session.list_versions(&request), vec!["2.0", "3.0", "1.0"]);
    }

    #[test]
    fn current_project_ignores_out_of_range_index() {
        let mut session = BuildSession::new(SessionRequest::new("/work"));
        session.set_projects(vec![ProjectModel::new(
            ProjectCoordinate::new("g", "a", "1"),
            "/work/pom.xml",
        )]);
        session.set_current_project(Some(3));
        assert!(session.current_project().is_none());
        session.set_current_project(Some(0));
        assert_eq!(
            session.current_project().map(|project| project.coordinate().key()),
            Some("g:a:1".to_owned())
        );
    }
}
