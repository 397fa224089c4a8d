//! Behaviour-driven tests for the bootstrap lifecycle.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use reactor_boot_participation::{
    ArtifactOrigin, BuildSession, ProjectModel, ResolvedArtifact, SessionRequest,
};

use crate::error::BootstrapError;
use crate::orchestrator::SessionOrchestrator;
use crate::policy::DescriptorSet;

use super::support::{
    Behaviour, ReportEvent, Rig, StaticDescriptorBuilder, StaticResolver, declaring, extension,
    project, project_at,
};

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    rig: Rig,
    projects: Vec<ProjectModel>,
    orchestrator: Option<SessionOrchestrator>,
    actual: BuildSession,
    started: Option<Result<(), BootstrapError>>,
}

#[fixture]
fn world() -> TestWorld {
    TestWorld {
        rig: Rig::new(),
        projects: Vec::new(),
        orchestrator: None,
        actual: BuildSession::new(SessionRequest::new("/work")),
        started: None,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn orchestrator(world: &mut TestWorld) -> &SessionOrchestrator {
    let TestWorld {
        rig,
        projects,
        orchestrator,
        ..
    } = world;
    orchestrator.get_or_insert_with(|| {
        let descriptors = projects.iter().fold(DescriptorSet::new(), |set, project| {
            set.with_descriptor(project.descriptor())
        });
        let builder = projects
            .iter()
            .cloned()
            .fold(StaticDescriptorBuilder::default(), StaticDescriptorBuilder::with_project);
        rig.orchestrator(builder, descriptors)
    })
}

fn journal_entries(world: &TestWorld, participant: &str) -> usize {
    let prefix = format!("{}:", unquote(participant));
    world
        .rig
        .journal()
        .iter()
        .filter(|entry| entry.starts_with(&prefix))
        .count()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a bootstrapper with participants {first} and {second}")]
fn given_participants(world: &mut TestWorld, first: String, second: String) {
    world.rig.participant(unquote(&first), Behaviour::Succeed);
    world.rig.participant(unquote(&second), Behaviour::Succeed);
}

#[given("a bootstrapper with a failing participant {failing} and a participant {steady}")]
fn given_failing_participant(world: &mut TestWorld, failing: String, steady: String) {
    world.rig.participant(unquote(&failing), Behaviour::Fail);
    world.rig.participant(unquote(&steady), Behaviour::Succeed);
}

#[given("a bootstrapper whose extension {artifact} provides participant {name}")]
fn given_extension_participant(world: &mut TestWorld, artifact: String, name: String) {
    let artifact = unquote(&artifact);
    world.rig = Rig::with_resolver(StaticResolver::default().with_result(
        &format!("org.example:{artifact}"),
        vec![ResolvedArtifact::new(
            extension(artifact),
            format!("/repo/{artifact}-1.0.jar"),
            ArtifactOrigin::LocalCache,
        )],
    ));
    world.rig.extension_participant(artifact, unquote(&name));
}

#[given("bootstrap projects {first} and {second}")]
fn given_projects(world: &mut TestWorld, first: String, second: String) {
    for artifact in [&first, &second] {
        let bootstrapped = world.rig.bootstrapped(project(unquote(artifact)));
        world.projects.push(bootstrapped);
    }
}

#[given("extension {artifact} is declared by bootstrap projects {first} and {second}")]
fn given_declaring_projects(
    world: &mut TestWorld,
    artifact: String,
    first: String,
    second: String,
) {
    for name in [&first, &second] {
        let bootstrapped = world.rig.bootstrapped(project(unquote(name)));
        world
            .projects
            .push(declaring(bootstrapped, &[unquote(&artifact)]));
    }
}

#[given("a second bootstrap project {artifact}")]
fn given_duplicate_project(world: &mut TestWorld, artifact: String) {
    let artifact = unquote(&artifact);
    world
        .projects
        .push(project_at(artifact, format!("/work/{artifact}-copy/pom.xml")));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the host build starts")]
fn when_started(world: &mut TestWorld) {
    let mut actual = world.actual.clone();
    let result = orchestrator(world).execution_started(&mut actual);
    world.actual = actual;
    world.started = Some(result);
}

#[when("the host build ends")]
fn when_ended(world: &mut TestWorld) {
    let actual = world.actual.clone();
    orchestrator(world).execution_ended(&actual);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the journal reads {entries}")]
fn then_journal_reads(world: &mut TestWorld, entries: String) {
    let expected: Vec<String> = unquote(&entries)
        .split(", ")
        .map(str::to_owned)
        .collect();
    assert_eq!(world.rig.journal(), expected);
}

#[then("the journal is empty")]
fn then_journal_empty(world: &mut TestWorld) {
    assert!(world.rig.journal().is_empty(), "journal: {:?}", world.rig.journal());
}

#[then("no bootstrap is registered for the host build")]
fn then_unregistered(world: &mut TestWorld) {
    let actual = world.actual.id();
    let orchestrator = orchestrator(world);
    assert_eq!(orchestrator.state_of(actual), None);
    assert_eq!(orchestrator.boot_session_for(actual), None);
}

#[then("the host build started cleanly")]
fn then_started_cleanly(world: &mut TestWorld) {
    let started = world.started.as_ref().expect("host build was started");
    assert!(started.is_ok(), "start failed: {started:?}");
}

#[then("the host build fails with a duplicate project")]
fn then_duplicate(world: &mut TestWorld) {
    let started = world.started.as_ref().expect("host build was started");
    assert!(
        matches!(started, Err(BootstrapError::DuplicateProject { .. })),
        "expected a duplicate project, got {started:?}"
    );
}

#[then("participant {name} failed {count} times")]
fn then_failed(world: &mut TestWorld, name: String, count: usize) {
    let prefix = format!("{}:", unquote(&name));
    let failures = world
        .rig
        .reporter
        .failures()
        .into_iter()
        .filter(|failure| failure.starts_with(&prefix))
        .count();
    assert_eq!(failures, count);
}

#[then("participant {name} ran {count} times")]
fn then_ran(world: &mut TestWorld, name: String, count: usize) {
    assert_eq!(journal_entries(world, &name), count);
}

#[then("extension {artifact} was resolved once")]
fn then_resolved_once(world: &mut TestWorld, artifact: String) {
    let key = format!("org.example:{}", unquote(&artifact));
    let requests = world
        .rig
        .resolver
        .requests()
        .into_iter()
        .filter(|request| *request == key)
        .count();
    assert_eq!(requests, 1);
}

#[then("the bootstrap was skipped")]
fn then_skipped(world: &mut TestWorld) {
    assert_eq!(world.rig.reporter.events(), vec![ReportEvent::Skipped]);
}

#[then("nothing was reported")]
fn then_nothing_reported(world: &mut TestWorld) {
    assert!(world.rig.reporter.events().is_empty());
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/bootstrap_lifecycle.feature")]
fn bootstrap_lifecycle_behaviour(world: TestWorld) {
    let _ = world;
}
