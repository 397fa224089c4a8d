//! Identities of projects, declared dependencies and produced artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Artifact type assumed when a dependency declares none.
pub const DEFAULT_ARTIFACT_TYPE: &str = "jar";

/// Dependency scope assumed when a dependency declares none.
pub const DEFAULT_DEPENDENCY_SCOPE: &str = "compile";

/// Classifier implied by the `test-jar` artifact type.
pub const TESTS_CLASSIFIER: &str = "tests";

/// Group, artifact and version identity of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
}

impl ProjectCoordinate {
    /// Builds a coordinate from its three parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Group identifier.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Artifact identifier.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `group:artifact:version` key used for duplicate detection.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// `group:artifact` key shared by every version of the project.
    #[must_use]
    pub fn versionless_key(&self) -> String {
        versionless_key(&self.group_id, &self.artifact_id)
    }
}

impl fmt::Display for ProjectCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// A dependency as declared in a descriptor or plugin configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyCoordinate {
    group_id: String,
    artifact_id: String,
    version: Option<String>,
    classifier: Option<String>,
    artifact_type: String,
    scope: Option<String>,
    system_path: Option<PathBuf>,
    optional: Option<bool>,
}

impl DependencyCoordinate {
    /// Builds a `jar` dependency with the default scope.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: Option<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version,
            classifier: None,
            artifact_type: DEFAULT_ARTIFACT_TYPE.to_owned(),
            scope: None,
            system_path: None,
            optional: None,
        }
    }

    /// Sets the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Sets the artifact type.
    #[must_use]
    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = artifact_type.into();
        self
    }

    /// Sets the dependency scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the system path of a `system` scoped dependency.
    #[must_use]
    pub fn with_system_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.system_path = Some(path.into());
        self
    }

    /// Marks the dependency optional or mandatory.
    #[must_use]
    pub const fn with_optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    /// Group identifier.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Artifact identifier.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Declared version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Declared classifier, if any.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Artifact type, `jar` unless declared otherwise.
    #[must_use]
    pub fn artifact_type(&self) -> &str {
        &self.artifact_type
    }

    /// Declared scope, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Declared scope, falling back to `compile`.
    #[must_use]
    pub fn effective_scope(&self) -> &str {
        self.scope.as_deref().unwrap_or(DEFAULT_DEPENDENCY_SCOPE)
    }

    /// System path, if any.
    #[must_use]
    pub fn system_path(&self) -> Option<&Path> {
        self.system_path.as_deref()
    }

    /// Optional flag, if declared.
    #[must_use]
    pub const fn optional(&self) -> Option<bool> {
        self.optional
    }

    /// `group:artifact` key.
    #[must_use]
    pub fn versionless_key(&self) -> String {
        versionless_key(&self.group_id, &self.artifact_id)
    }

    /// Whether this dependency points at the given project.
    #[must_use]
    pub fn refers_to(&self, project: &ProjectCoordinate) -> bool {
        self.group_id == project.group_id()
            && self.artifact_id == project.artifact_id()
            && self
                .version
                .as_deref()
                .is_none_or(|version| version == project.version())
    }
}

impl fmt::Display for DependencyCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id, self.artifact_id, self.artifact_type
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

/// A request to locate one concrete artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRequest {
    group_id: String,
    artifact_id: String,
    version: String,
    extension: String,
    classifier: String,
    artifact_type: Option<String>,
}

impl ArtifactRequest {
    /// Builds a request without classifier.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            extension: extension.into(),
            classifier: String::new(),
            artifact_type: None,
        }
    }

    /// Builds the request for the artifact a dependency points at.
    ///
    /// Returns `None` when the dependency carries no version.
    #[must_use]
    pub fn for_dependency(dependency: &DependencyCoordinate) -> Option<Self> {
        let version = dependency.version()?;
        let artifact_type = dependency.artifact_type();
        let mut request = Self::new(
            dependency.group_id(),
            dependency.artifact_id(),
            version,
            extension_for_type(artifact_type),
        )
        .with_type(artifact_type);
        match dependency.classifier() {
            Some(classifier) => request.classifier = classifier.to_owned(),
            None if artifact_type == "test-jar" => request.classifier = TESTS_CLASSIFIER.to_owned(),
            None => {}
        }
        Some(request)
    }

    /// Sets the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    /// Records the artifact type the request originated from.
    #[must_use]
    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = Some(artifact_type.into());
        self
    }

    /// Group identifier.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Artifact identifier.
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Requested version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// File extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Classifier, empty when absent.
    #[must_use]
    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    /// Artifact type the request originated from, if known.
    #[must_use]
    pub fn artifact_type(&self) -> Option<&str> {
        self.artifact_type.as_deref()
    }

    /// `group:artifact:version` key of the owning project.
    #[must_use]
    pub fn project_key(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// `group:artifact` key.
    #[must_use]
    pub fn versionless_key(&self) -> String {
        versionless_key(&self.group_id, &self.artifact_id)
    }

    /// `group:artifact:extension[:classifier]` identity.
    #[must_use]
    pub fn conflict_id(&self) -> String {
        conflict_id(
            &self.group_id,
            &self.artifact_id,
            &self.extension,
            Some(self.classifier.as_str()),
        )
    }

    /// Whether the request targets compiled test output.
    #[must_use]
    pub fn is_test_artifact(&self) -> bool {
        self.artifact_type.as_deref() == Some("test-jar")
            || (self.extension == "jar" && self.classifier == TESTS_CLASSIFIER)
    }

    /// Same request for another version.
    #[must_use]
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }
}

/// An artifact a project produces or has produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProducedArtifact {
    group_id: String,
    artifact_id: String,
    extension: String,
    classifier: Option<String>,
    file: Option<PathBuf>,
}

impl ProducedArtifact {
    /// Builds an artifact without classifier or file.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: extension.into(),
            classifier: None,
            file: None,
        }
    }

    /// Sets the classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Sets the produced file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Produced file, once packaged.
    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Classifier, if any.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// File extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `group:artifact:extension[:classifier]` identity.
    #[must_use]
    pub fn conflict_id(&self) -> String {
        conflict_id(
            &self.group_id,
            &self.artifact_id,
            &self.extension,
            self.classifier.as_deref(),
        )
    }
}

/// File extension used for an artifact type.
#[must_use]
pub fn extension_for_type(artifact_type: &str) -> &str {
    match artifact_type {
        "test-jar" | "maven-plugin" | "ejb" | "ejb-client" | "java-source" | "javadoc"
        | "bundle" | "eclipse-plugin" => "jar",
        other => other,
    }
}

fn versionless_key(group_id: &str, artifact_id: &str) -> String {
    format!("{group_id}:{artifact_id}")
}

fn conflict_id(
    group_id: &str,
    artifact_id: &str,
    extension: &str,
    classifier: Option<&str>,
) -> String {
    match classifier.filter(|classifier| !classifier.is_empty()) {
        Some(classifier) => format!("{group_id}:{artifact_id}:{extension}:{classifier}"),
        None => format!("{group_id}:{artifact_id}:{extension}"),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn conflict_id_omits_empty_classifier() {
        let request = ArtifactRequest::new("org.example", "core", "1.0", "jar");
        assert_eq!(request.conflict_id(), "org.example:core:jar");
        let attached =
            ProducedArtifact::new("org.example", "core", "jar").with_classifier("sources");
        assert_eq!(attached.conflict_id(), "org.example:core:jar:sources");
    }

    #[rstest]
    #[case(ArtifactRequest::new("g", "a", "1", "jar").with_type("test-jar"), true)]
    #[case(ArtifactRequest::new("g", "a", "1", "jar").with_classifier("tests"), true)]
    #[case(ArtifactRequest::new("g", "a", "1", "zip").with_classifier("tests"), false)]
    #[case(ArtifactRequest::new("g", "a", "1", "jar"), false)]
    fn detects_test_artifacts(#[case] request: ArtifactRequest, #[case] expected: bool) {
        assert_eq!(request.is_test_artifact(), expected);
    }

    #[test]
    fn test_jar_dependency_requests_tests_classifier() {
        let dependency =
            DependencyCoordinate::new("g", "a", Some("1".to_owned())).with_type("test-jar");
        let request = ArtifactRequest::for_dependency(&dependency).expect("versioned");
        assert_eq!(request.extension(), "jar");
        assert_eq!(request.classifier(), TESTS_CLASSIFIER);
        assert!(request.is_test_artifact());
    }

    #[test]
    fn unversioned_dependency_yields_no_request() {
        let dependency = DependencyCoordinate::new("g", "a", None);
        assert!(ArtifactRequest::for_dependency(&dependency).is_none());
    }

    #[test]
    fn dependency_display_includes_classifier_and_version() {
        let dependency = DependencyCoordinate::new("g", "a", Some("2.0".to_owned()))
            .with_classifier("linux");
        assert_eq!(dependency.to_string(), "g:a:jar:linux:2.0");
    }

    #[test]
    fn dependency_refers_to_matching_project() {
        let project = ProjectCoordinate::new("g", "a", "1.0");
        assert!(DependencyCoordinate::new("g", "a", None).refers_to(&project));
        assert!(DependencyCoordinate::new("g", "a", Some("1.0".to_owned())).refers_to(&project));
        assert!(!DependencyCoordinate::new("g", "a", Some("2.0".to_owned())).refers_to(&project));
        assert!(!DependencyCoordinate::new("g", "b", None).refers_to(&project));
    }
}
