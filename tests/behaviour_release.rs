//! Behaviour-driven tests covering the release pipeline end to end.
//!
//! Builds are scripted through the `test-support` stub executor; staging and
//! packaging run for real inside a temporary checkout.

use std::cell::RefCell;

mod support;

use kak_lsp_release::archive::list_archive_members;
use kak_lsp_release::error::PackagerError;
use kak_lsp_release::output::ReleaseReport;
use kak_lsp_release::pipeline::{PipelineContext, execute};
use kak_lsp_release::target::HostOs;
use kak_lsp_release::test_utils::{ExpectedCall, StubExecutor, failure_output, success_output};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::project::{FixedTool, ReleaseProject, StepText};

#[derive(Default)]
struct ReleaseWorld {
    project: RefCell<Option<ReleaseProject>>,
    host: RefCell<Option<String>>,
    target: RefCell<Option<String>>,
    version: RefCell<Option<String>>,
    test_exit: RefCell<Option<i32>>,
    tool_missing: RefCell<bool>,
    outcome: RefCell<Option<Result<ReleaseReport, PackagerError>>>,
}

#[fixture]
fn world() -> ReleaseWorld {
    ReleaseWorld::default()
}

fn with_project<T>(world: &ReleaseWorld, f: impl FnOnce(&ReleaseProject) -> T) -> T {
    let borrow = world.project.borrow();
    let project = borrow
        .as_ref()
        .unwrap_or_else(|| panic!("a checkout should have been created"));
    f(project)
}

fn failure(world: &ReleaseWorld) -> (String, i32) {
    match world.outcome.borrow().as_ref() {
        Some(Err(err)) => (err.stage().to_string(), err.exit_code()),
        Some(Ok(report)) => panic!("expected a failure, got {}", report.archive),
        None => panic!("the release should have run"),
    }
}

fn report(world: &ReleaseWorld) -> ReleaseReport {
    match world.outcome.borrow().as_ref() {
        Some(Ok(report)) => report.clone(),
        Some(Err(err)) => panic!("expected success, got {err}"),
        None => panic!("the release should have run"),
    }
}

fn expected_calls(target: &str, test_exit: Option<i32>) -> Vec<ExpectedCall> {
    let test_output = match test_exit {
        Some(code) => failure_output(code, "test result: FAILED"),
        None => success_output(),
    };
    vec![
        ExpectedCall::new("cross", &["build", "--target", target, "--release"], success_output()),
        ExpectedCall::new("cross", &["test", "--target", target, "--release"], test_output),
    ]
}

#[given("a kak-lsp checkout with every shipped file")]
fn checkout(world: &ReleaseWorld) {
    world.project.borrow_mut().replace(ReleaseProject::new());
}

#[given("the shipped file {name} is missing")]
fn missing_file(world: &ReleaseWorld, name: StepText) {
    with_project(world, |project| project.remove(&name.into_inner()));
}

#[given("the host is {os}")]
fn host(world: &ReleaseWorld, os: StepText) {
    world.host.borrow_mut().replace(os.into_inner());
}

#[given("the target is {target}")]
fn explicit_target(world: &ReleaseWorld, target: StepText) {
    world.target.borrow_mut().replace(target.into_inner());
}

#[given("the version is {version}")]
fn version(world: &ReleaseWorld, version: StepText) {
    world.version.borrow_mut().replace(version.into_inner());
}

#[given("the test suite exits with {code}")]
fn failing_tests(world: &ReleaseWorld, code: i32) {
    world.test_exit.borrow_mut().replace(code);
}

#[given("cross cannot be installed")]
fn tool_missing(world: &ReleaseWorld) {
    *world.tool_missing.borrow_mut() = true;
}

#[when("the release runs")]
fn run_release(world: &ReleaseWorld) {
    let host = HostOs::new(world.host.borrow().clone().unwrap_or_default());
    let explicit = world.target.borrow().clone();
    let version = world.version.borrow().clone().unwrap_or_default();
    let target = explicit
        .clone()
        .unwrap_or_else(|| "x86_64-unknown-linux-musl".to_owned());
    let tool = if *world.tool_missing.borrow() {
        FixedTool::missing()
    } else {
        FixedTool::available()
    };
    let executor = StubExecutor::new(expected_calls(&target, *world.test_exit.borrow()));

    let outcome = with_project(world, |project| {
        project.add_binary(&target);
        let config = project.config(explicit.as_deref(), &version);
        let context = PipelineContext {
            config: &config,
            host: &host,
            executor: &executor,
            tool: &tool,
            quiet: true,
        };
        execute(&context, &mut Vec::new())
    });
    world.outcome.borrow_mut().replace(outcome);
}

#[then("the release succeeds")]
fn succeeds(world: &ReleaseWorld) {
    let _ = report(world);
}

#[then("the archive {name} is written")]
fn archive_written(world: &ReleaseWorld, name: StepText) {
    let expected = name.into_inner();
    let report = report(world);

    assert_eq!(report.archive.file_name(), Some(expected.as_str()));
    with_project(world, |project| assert_eq!(project.outputs(), vec![expected.clone()]));
}

#[then("the archive holds the binary and {count} shipped files")]
fn archive_members(world: &ReleaseWorld, count: usize) {
    let report = report(world);
    let members = list_archive_members(&report.archive).expect("archive readable");

    assert_eq!(members.len(), count + 1);
    assert!(members.iter().any(|member| member == "kak-lsp"));
    for shipped in support::project::SHIPPED_FILES {
        assert!(members.iter().any(|member| member == shipped), "{shipped} not packaged");
    }
}

#[then("no staging directory remains")]
fn staging_removed(world: &ReleaseWorld) {
    with_project(world, |project| assert!(project.staging_leftovers().is_empty()));
}

#[then("the release fails during {stage}")]
fn fails_during(world: &ReleaseWorld, stage: StepText) {
    let (actual, _) = failure(world);

    assert_eq!(actual, stage.into_inner());
}

#[then("the exit code is {code}")]
fn exit_code(world: &ReleaseWorld, code: i32) {
    let (_, actual) = failure(world);

    assert_eq!(actual, code);
}

#[then("no archive is written")]
fn no_archive(world: &ReleaseWorld) {
    with_project(world, |project| assert!(project.outputs().is_empty()));
}

#[scenario("tests/features/release.feature", index = 0)]
fn scenario_host_default(world: ReleaseWorld) {
    let _ = world;
}

#[scenario("tests/features/release.feature", index = 1)]
fn scenario_explicit_target(world: ReleaseWorld) {
    let _ = world;
}

#[scenario("tests/features/release.feature", index = 2)]
fn scenario_missing_artifact(world: ReleaseWorld) {
    let _ = world;
}

#[scenario("tests/features/release.feature", index = 3)]
fn scenario_test_failure(world: ReleaseWorld) {
    let _ = world;
}

#[scenario("tests/features/release.feature", index = 4)]
fn scenario_unsupported_host(world: ReleaseWorld) {
    let _ = world;
}

#[scenario("tests/features/release.feature", index = 5)]
fn scenario_tool_unavailable(world: ReleaseWorld) {
    let _ = world;
}
