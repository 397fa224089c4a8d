use std::path::Path;
use std::str::FromStr;

use rstest::{fixture, rstest};

use super::*;

#[fixture]
fn project() -> ProjectModel {
    ProjectModel::new(
        ProjectCoordinate::new("org.example", "widget", "1.0.0"),
        "/work/widget/pom.xml",
    )
}

#[rstest]
fn conventional_directories_sit_next_to_descriptor(project: ProjectModel) {
    assert_eq!(project.basedir(), Path::new("/work/widget"));
    assert_eq!(
        project.directories().output(),
        Path::new("/work/widget/target/classes")
    );
    assert_eq!(
        project.directories().test_output(),
        Path::new("/work/widget/target/test-classes")
    );
}

#[rstest]
fn build_state_is_shared_between_clones(project: ProjectModel) {
    let copy = project.clone();
    project.build_state().record_phase(LifecyclePhase::Compile);
    project.build_state().set_main_artifact_file("/work/widget/target/widget.jar");
    assert!(copy.build_state().has_phase(LifecyclePhase::Compile));
    assert!(!copy.build_state().has_phase(LifecyclePhase::Package));
    assert_eq!(
        copy.main_artifact().file(),
        Some(Path::new("/work/widget/target/widget.jar"))
    );
}

#[rstest]
fn main_artifact_extension_follows_packaging(project: ProjectModel) {
    let plugin = project.with_packaging("maven-plugin");
    assert_eq!(plugin.main_artifact().conflict_id(), "org.example:widget:jar");
}

#[rstest]
fn context_values_are_typed_and_shared(project: ProjectModel) {
    let copy = project.clone();
    project.context().insert("answer", 42_u32);
    assert_eq!(copy.context().get::<u32>("answer").as_deref(), Some(&42));
    assert!(copy.context().get::<String>("answer").is_none());
    assert!(copy.context().remove("answer"));
    assert!(!project.context().contains_key("answer"));
}

#[rstest]
fn plugin_lookup_uses_versionless_key(project: ProjectModel) {
    let project = project.with_plugin(PluginDeclaration::new(
        "org.example",
        "builder-plugin",
        Some("2.0".to_owned()),
    ));
    assert!(project.plugin("org.example:builder-plugin").is_some());
    assert!(project.plugin("org.example:other").is_none());
}

#[rstest]
#[case("test-compile", LifecyclePhase::TestCompile)]
#[case("package", LifecyclePhase::Package)]
#[case("generate-sources", LifecyclePhase::GenerateSources)]
fn phases_parse_from_kebab_case(#[case] text: &str, #[case] expected: LifecyclePhase) {
    assert_eq!(LifecyclePhase::from_str(text).expect("phase"), expected);
    assert_eq!(expected.to_string(), text);
}
