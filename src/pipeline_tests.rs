//! Unit tests for the release pipeline.
//!
//! The executor is scripted and the tool provider mocked, so these tests
//! exercise the real staging and packaging code against a temporary project
//! tree without running any external program.

use super::*;
use crate::archive::list_archive_members;
use crate::error::PackagerError;
use crate::output::dry_run_text;
use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, stdout_output, success_output};
use crate::tool::MockToolProvider;
use crate::version::{ReleaseVersion, VersionSource};
use camino::Utf8Path;
use rstest::{fixture, rstest};
use std::collections::BTreeSet;
use tempfile::TempDir;

const MUSL: &str = "x86_64-unknown-linux-musl";

const EXPECTED_MEMBERS: [&str; 6] = [
    "kak-lsp",
    "kak-lsp.toml",
    "README.asciidoc",
    "COPYING",
    "MIT",
    "UNLICENSE",
];

/// A project checkout with a lockfile, every shipped file, and a binary
/// where the build would leave it.
struct Project {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    fn config(&self) -> ReleaseConfig {
        let mut config = ReleaseConfig::for_project(&self.root.join("src"));
        config.target = Some(MUSL.to_owned());
        config.version = VersionSource::Explicit(ReleaseVersion::try_from("1.2.0").expect("valid"));
        config.output_dir = self.root.join("dist");
        config.staging_parent = Some(self.staging_parent());
        config
    }

    fn source(&self, name: &str) -> Utf8PathBuf {
        self.root.join("src").join(name)
    }

    fn staging_parent(&self) -> Utf8PathBuf {
        self.root.join("staging")
    }

    fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging_parent())
            .expect("read staging parent")
            .next()
            .is_none()
    }

    fn output_files(&self) -> Vec<String> {
        match std::fs::read_dir(self.root.join("dist")) {
            Ok(entries) => entries
                .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[fixture]
fn project() -> Project {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
    let src = root.join("src");
    let release = src.join("target").join(MUSL).join("release");
    std::fs::create_dir_all(&release).expect("create release dir");
    std::fs::create_dir_all(root.join("staging")).expect("create staging parent");
    std::fs::write(src.join("Cargo.lock"), "").expect("write lockfile");
    std::fs::write(release.join("kak-lsp"), b"\x7fELF").expect("write binary");
    for name in &EXPECTED_MEMBERS[1..] {
        std::fs::write(src.join(name), *name).expect("write artifact");
    }
    Project { _temp: temp, root }
}

fn build_and_test_calls() -> Vec<ExpectedCall> {
    vec![
        ExpectedCall::new("cross", &["build", "--target", MUSL, "--release"], success_output()),
        ExpectedCall::new("cross", &["test", "--target", MUSL, "--release"], success_output()),
    ]
}

fn cross_provider() -> MockToolProvider {
    let mut tool = MockToolProvider::new();
    tool.expect_ensure_installed()
        .times(1)
        .returning(|| Ok("cross".to_owned()));
    tool
}

fn run(
    config: &ReleaseConfig,
    executor: &StubExecutor,
    tool: &MockToolProvider,
) -> (Result<ReleaseReport>, String) {
    let host = HostOs::new("Linux");
    let context = PipelineContext {
        config,
        host: &host,
        executor,
        tool,
        quiet: false,
    };
    let mut stderr = Vec::new();
    let result = execute(&context, &mut stderr);
    (result, String::from_utf8(stderr).expect("utf8 stderr"))
}

fn member_set(members: &[String]) -> BTreeSet<&str> {
    members.iter().map(String::as_str).collect()
}

#[rstest]
fn musl_release_produces_named_archive_with_exact_members(project: Project) {
    let executor = StubExecutor::new(build_and_test_calls());

    let (result, stderr) = run(&project.config(), &executor, &cross_provider());

    let report = result.expect("release succeeds");
    assert_eq!(
        report.archive,
        project
            .root
            .join("dist")
            .join("kak-lsp-1.2.0-x86_64-unknown-linux-musl.tar.gz")
    );
    let listed = list_archive_members(&report.archive).expect("archive readable");
    assert_eq!(listed.len(), EXPECTED_MEMBERS.len());
    assert_eq!(member_set(&listed), EXPECTED_MEMBERS.into_iter().collect());
    assert!(project.staging_is_empty(), "staging directory survived success");
    assert!(stderr.contains("Wrote"));
    executor.assert_finished();
}

#[rstest]
fn build_failure_leaves_no_archive(project: Project) {
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "cross",
        &["build", "--target", MUSL, "--release"],
        failure_output(101, ""),
    )]);

    let (result, _) = run(&project.config(), &executor, &cross_provider());

    let err = result.expect_err("build fails");
    assert!(matches!(err, PackagerError::BuildFailed { .. }));
    assert_ne!(err.exit_code(), 0);
    assert!(project.output_files().is_empty());
    assert!(project.staging_is_empty());
}

#[rstest]
fn test_failure_leaves_no_archive(project: Project) {
    let executor = StubExecutor::new(vec![
        ExpectedCall::new("cross", &["build", "--target", MUSL, "--release"], success_output()),
        ExpectedCall::new("cross", &["test", "--target", MUSL, "--release"], failure_output(3, "")),
    ]);

    let (result, _) = run(&project.config(), &executor, &cross_provider());

    let err = result.expect_err("tests fail");
    assert!(matches!(err, PackagerError::TestFailed { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(project.output_files().is_empty());
}

#[rstest]
#[case::config("kak-lsp.toml")]
#[case::license("MIT")]
#[case::readme("README.asciidoc")]
fn missing_artifact_fails_and_removes_staging(project: Project, #[case] missing: &str) {
    std::fs::remove_file(project.source(missing)).expect("remove artifact");
    let executor = StubExecutor::new(build_and_test_calls());

    let (result, _) = run(&project.config(), &executor, &cross_provider());

    let err = result.expect_err("artifact missing");
    assert!(
        matches!(&err, PackagerError::MissingArtifact { path } if path.file_name() == Some(missing)),
        "unexpected error: {err:?}"
    );
    assert!(project.staging_is_empty(), "staging directory survived failure");
    assert!(project.output_files().is_empty());
}

#[rstest]
fn unavailable_tool_stops_before_building(project: Project) {
    let executor = StubExecutor::new(Vec::new());
    let mut tool = MockToolProvider::new();
    tool.expect_ensure_installed().returning(|| {
        Err(PackagerError::ToolUnavailable {
            tool: "cross".to_owned(),
            reason: "offline".to_owned(),
        })
    });

    let (result, _) = run(&project.config(), &executor, &tool);

    assert!(matches!(result, Err(PackagerError::ToolUnavailable { .. })));
    assert!(executor.invocations().is_empty());
}

#[rstest]
fn unsupported_host_fails_before_bootstrap(project: Project) {
    let mut config = project.config();
    config.target = None;
    let executor = StubExecutor::new(Vec::new());
    let mut tool = MockToolProvider::new();
    tool.expect_ensure_installed().never();
    let host = HostOs::new("SunOS");
    let context = PipelineContext {
        config: &config,
        host: &host,
        executor: &executor,
        tool: &tool,
        quiet: true,
    };

    let err = execute(&context, &mut Vec::new()).expect_err("unsupported host");

    assert!(matches!(err, PackagerError::UnsupportedPlatform { ref os } if os == "SunOS"));
}

#[rstest]
fn version_comes_from_git_describe(project: Project) {
    let mut config = project.config();
    config.version = VersionSource::GitDescribe;
    let mut calls = vec![ExpectedCall::new(
        "git",
        &["describe", "--tags"],
        stdout_output("v12.1.0-3-gabc1234\n"),
    )];
    calls.extend(build_and_test_calls());
    let executor = StubExecutor::new(calls);

    let (result, _) = run(&config, &executor, &cross_provider());

    let report = result.expect("release succeeds");
    assert_eq!(
        report.archive.file_name(),
        Some("kak-lsp-v12.1.0-3-gabc1234-x86_64-unknown-linux-musl.tar.gz")
    );
}

#[rstest]
fn failed_version_resolution_stops_the_run(project: Project) {
    let mut config = project.config();
    config.version = VersionSource::GitDescribe;
    let executor = StubExecutor::new(vec![ExpectedCall::new(
        "git",
        &["describe", "--tags"],
        failure_output(128, "fatal: No names found"),
    )]);
    let mut tool = MockToolProvider::new();
    tool.expect_ensure_installed().never();

    let (result, _) = run(&config, &executor, &tool);

    assert!(matches!(result, Err(PackagerError::VersionResolution { .. })));
    assert!(project.output_files().is_empty());
}

#[rstest]
fn repeated_runs_yield_the_same_member_set(project: Project) {
    let config = project.config();

    let first = run(&config, &StubExecutor::new(build_and_test_calls()), &cross_provider())
        .0
        .expect("first run");
    let first_members = list_archive_members(&first.archive).expect("first archive");
    let second = run(&config, &StubExecutor::new(build_and_test_calls()), &cross_provider())
        .0
        .expect("second run");
    let second_members = list_archive_members(&second.archive).expect("second archive");

    assert_eq!(member_set(&first_members), member_set(&second_members));
}

#[rstest]
fn quiet_mode_suppresses_progress(project: Project) {
    let config = project.config();
    let executor = StubExecutor::new(build_and_test_calls());
    let tool = cross_provider();
    let host = HostOs::new("Linux");
    let context = PipelineContext {
        config: &config,
        host: &host,
        executor: &executor,
        tool: &tool,
        quiet: true,
    };
    let mut stderr = Vec::new();

    execute(&context, &mut stderr).expect("release succeeds");

    assert!(stderr.is_empty());
}

#[rstest]
fn plan_describes_the_run_without_side_effects(project: Project) {
    let config = project.config();
    let executor = StubExecutor::new(Vec::new());

    let plan = plan(&config, &HostOs::new("Linux"), &executor).expect("plan");

    assert_eq!(plan.archive.filename(), "kak-lsp-1.2.0-x86_64-unknown-linux-musl.tar.gz");
    assert_eq!(plan.binary_path, project.source("target").join(MUSL).join("release").join("kak-lsp"));
    assert_eq!(plan.artifacts.file_names(), EXPECTED_MEMBERS);
    let text = dry_run_text(&plan);
    assert!(text.starts_with("Dry run"));
    assert!(text.contains("kak-lsp-1.2.0-x86_64-unknown-linux-musl.tar.gz"));
    assert!(text.contains("  - UNLICENSE (license"));
    assert!(project.output_files().is_empty());
    assert!(executor.invocations().is_empty());
}

#[rstest]
fn report_serialises_to_json(project: Project) {
    let executor = StubExecutor::new(build_and_test_calls());

    let report = run(&project.config(), &executor, &cross_provider())
        .0
        .expect("release succeeds");
    let json: serde_json::Value =
        serde_json::from_str(&report.to_json().expect("json")).expect("valid json");

    assert_eq!(json["name"], "kak-lsp");
    assert_eq!(json["version"], "1.2.0");
    assert_eq!(json["target"], MUSL);
    assert_eq!(json["members"].as_array().map(Vec::len), Some(6));
    assert_eq!(json["sha256"].as_str().map(str::len), Some(64));
    assert!(
        json["archive"]
            .as_str()
            .is_some_and(|p| Utf8Path::new(p).ends_with("kak-lsp-1.2.0-x86_64-unknown-linux-musl.tar.gz"))
    );
}

#[rstest]
fn archive_name_is_independent_of_binary_name(project: Project) {
    let mut config = project.config();
    config.name = "kak-lsp-nightly".to_owned();
    let executor = StubExecutor::new(build_and_test_calls());

    let (result, _) = run(&config, &executor, &cross_provider());

    let report = result.expect("release succeeds");
    assert_eq!(
        report.archive.file_name(),
        Some("kak-lsp-nightly-1.2.0-x86_64-unknown-linux-musl.tar.gz")
    );
    let listed = list_archive_members(&report.archive).expect("archive readable");
    assert_eq!(member_set(&listed), EXPECTED_MEMBERS.into_iter().collect());
}
