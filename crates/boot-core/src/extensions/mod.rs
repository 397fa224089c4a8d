//! Extension declarations read from a project's plugin configuration.
//!
//! A bootstrapper plugin may list extra dependencies under its
//! configuration:
//!
//! ```json
//! { "extensions": { "extension": [ { "groupId": "org.example", "artifactId": "tools", "version": "1.0" } ] } }
//! ```
//!
//! `extensions` may also be a plain array of entries, and `extension` may be
//! a single entry. Blank values are treated as absent.

use reactor_boot_participation::{DEFAULT_ARTIFACT_TYPE, DependencyCoordinate, ProjectModel};
use serde_json::{Map, Value};

/// Source of the extension dependencies declared for a plugin.
pub trait ExtensionConfigurationReader: Send + Sync {
    /// Extensions configured on `plugin_key` (`group:artifact`) in `project`.
    fn extensions(&self, project: &ProjectModel, plugin_key: &str) -> Vec<DependencyCoordinate>;
}

/// Reads `extensions` from the plugin's JSON configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfiguredExtensionsReader;

impl ExtensionConfigurationReader for ConfiguredExtensionsReader {
    fn extensions(&self, project: &ProjectModel, plugin_key: &str) -> Vec<DependencyCoordinate> {
        project
            .plugin(plugin_key)
            .map(|plugin| parse_extensions(plugin.configuration()))
            .unwrap_or_default()
    }
}

/// Parses the `extensions` element of a plugin configuration.
///
/// Entries without a group or artifact identifier are dropped.
#[must_use]
pub fn parse_extensions(configuration: &Value) -> Vec<DependencyCoordinate> {
    let entries: Vec<&Value> = match configuration.get("extensions") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(wrapper)) => match wrapper.get("extension") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single @ Value::Object(_)) => vec![single],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(Value::as_object)
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(entry: &Map<String, Value>) -> Option<DependencyCoordinate> {
    let group_id = text(entry, "groupId")?;
    let artifact_id = text(entry, "artifactId")?;
    let mut dependency = DependencyCoordinate::new(group_id, artifact_id, text(entry, "version"))
        .with_type(text(entry, "type").unwrap_or_else(|| DEFAULT_ARTIFACT_TYPE.to_owned()));
    if let Some(classifier) = text(entry, "classifier") {
        dependency = dependency.with_classifier(classifier);
    }
    if let Some(scope) = text(entry, "scope") {
        dependency = dependency.with_scope(scope);
    }
    if let Some(system_path) = text(entry, "systemPath") {
        dependency = dependency.with_system_path(system_path);
    }
    if let Some(optional) = flag(entry, "optional") {
        dependency = dependency.with_optional(optional);
    }
    Some(dependency)
}

fn text(entry: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match entry.get(key)? {
        Value::String(value) => value.trim().to_owned(),
        Value::Number(value) => value.to_string(),
        Value::Bool(value) => value.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn flag(entry: &Map<String, Value>, key: &str) -> Option<bool> {
    match entry.get(key)? {
        Value::Bool(value) => Some(*value),
        Value::String(value) => match value.trim() {
            "" => None,
            other => Some(other.eq_ignore_ascii_case("true")),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use reactor_boot_participation::{PluginDeclaration, ProjectCoordinate};
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn reads_wrapped_extension_list() {
        let configuration = json!({
            "extensions": {
                "extension": [
                    { "groupId": "foo", "artifactId": "foo", "version": "1" },
                    {
                        "groupId": "bar",
                        "artifactId": "bar",
                        "version": "2",
                        "classifier": "tests",
                        "type": "test-jar",
                        "scope": "test",
                        "optional": "true",
                        "systemPath": "/opt/bar.jar"
                    }
                ]
            }
        });
        let extensions = parse_extensions(&configuration);
        assert_eq!(extensions.len(), 2);

        let foo = extensions.first().expect("foo");
        assert_eq!(foo.group_id(), "foo");
        assert_eq!(foo.version(), Some("1"));
        assert_eq!(foo.artifact_type(), "jar");
        assert_eq!(foo.classifier(), None);
        assert_eq!(foo.scope(), None);
        assert_eq!(foo.optional(), None);

        let bar = extensions.get(1).expect("bar");
        assert_eq!(bar.classifier(), Some("tests"));
        assert_eq!(bar.artifact_type(), "test-jar");
        assert_eq!(bar.scope(), Some("test"));
        assert_eq!(bar.optional(), Some(true));
        assert_eq!(
            bar.system_path().map(|path| path.to_string_lossy().into_owned()),
            Some("/opt/bar.jar".to_owned())
        );
    }

    #[rstest]
    #[case(json!({ "extensions": { "extension": { "groupId": "g", "artifactId": "a" } } }), 1)]
    #[case(json!({ "extensions": [ { "groupId": "g", "artifactId": "a" }, { "groupId": "g" } ] }), 1)]
    #[case(json!({ "extensions": { "extension": [ { "groupId": " ", "artifactId": "a" } ] } }), 0)]
    #[case(json!({ "extensions": "nope" }), 0)]
    #[case(json!({}), 0)]
    #[case(Value::Null, 0)]
    fn accepts_the_supported_shapes(#[case] configuration: Value, #[case] expected: usize) {
        assert_eq!(parse_extensions(&configuration).len(), expected);
    }

    #[rstest]
    fn blank_values_are_absent() {
        let configuration = json!({
            "extensions": [ { "groupId": "g", "artifactId": "a", "version": "  ", "type": "" } ]
        });
        let extensions = parse_extensions(&configuration);
        let entry = extensions.first().expect("entry");
        assert_eq!(entry.version(), None);
        assert_eq!(entry.artifact_type(), "jar");
    }

    #[rstest]
    fn reader_looks_up_the_named_plugin() {
        let project = ProjectModel::new(ProjectCoordinate::new("g", "p", "1"), "/work/pom.xml")
            .with_plugin(
                PluginDeclaration::new("org.example", "boot-plugin", Some("1.0".to_owned()))
                    .with_configuration(json!({
                        "extensions": [ { "groupId": "x", "artifactId": "y", "version": "3" } ]
                    })),
            );
        let reader = ConfiguredExtensionsReader;
        assert_eq!(reader.extensions(&project, "org.example:boot-plugin").len(), 1);
        assert!(reader.extensions(&project, "org.example:other").is_empty());
    }
}
