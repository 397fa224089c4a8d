use crate::logging::LogFormat;

/// Default tracing filter expression: bootstrap events at `info`, everything
/// else the host links in at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "warn,reactor_boot=info";

/// File name that marks a directory as a bootstrap project.
pub const DEFAULT_DESCRIPTOR_FILE_NAME: &str = "pom.xml";

/// Directory names never descended into while scanning for descriptors.
pub const DEFAULT_EXCLUDED_DIRECTORIES: &[&str] = &["target"];

/// Repository layouts stripped from bootstrap project repositories.
pub const DEFAULT_EXCLUDED_REPOSITORY_LAYOUTS: &[&str] = &["p2"];

/// Package patterns of the participation API exposed to every extension scope.
pub const PARTICIPATION_API_PATTERN: &str = "org.reactor.boot.participation.*";

/// Shared infrastructure packages imported into every extension scope.
pub const DEFAULT_BOOTSTRAP_IMPORTS: &[&str] = &[
    "javax.inject.*",
    "com.google.inject.*",
    "com.google.inject.name.*",
    "org.sonatype.inject.*",
    "org.slf4j.*",
    "org.slf4j.impl.*",
    PARTICIPATION_API_PATTERN,
];

/// Host artifacts excluded when resolving extension dependencies.
pub const DEFAULT_CORE_ARTIFACT_EXCLUDES: &[&str] = &[
    "org.apache.maven:maven-core",
    "org.apache.maven:maven-model",
    "org.apache.maven:maven-plugin-api",
    "org.apache.maven:maven-artifact",
    "org.codehaus.plexus:plexus-classworlds",
    "org.codehaus.plexus:plexus-utils",
];

/// Default tracing filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}
