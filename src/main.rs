//! kak-lsp release packager entrypoint.
//!
//! Builds and tests the language server for one target with `cross`, then
//! writes the release archive. Progress goes to stderr; with `--json` the
//! release report is printed on stdout.

use clap::Parser;
use env_logger::Env;
use kak_lsp_release::cli::{Cli, ProcessContext};
use kak_lsp_release::config::ReleaseConfig;
use kak_lsp_release::error::{PackagerError, Result};
use kak_lsp_release::executor::SystemCommandExecutor;
use kak_lsp_release::output::{ReleaseReport, dry_run_text, write_stderr_line};
use kak_lsp_release::pipeline::{PipelineContext, execute, plan};
use kak_lsp_release::target::HostOs;
use kak_lsp_release::tool::CrossInstaller;
use kak_lsp_release::tool::download::HttpDownloader;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Initialise `env_logger`; `RUST_LOG` overrides the `-v` derived level.
fn init_logging(cli: &Cli) {
    env_logger::Builder::from_env(Env::default().default_filter_or(log_filter(cli)))
        .format_timestamp(None)
        .init();
}

fn log_filter(cli: &Cli) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let ctx = ProcessContext::from_process()?;
    let config = cli.resolve(&ctx)?;
    let executor =
        SystemCommandExecutor::in_dir(&config.project_root).with_timeout(config.timeout);
    let host = HostOs::detect();

    if cli.dry_run {
        return run_dry(&config, &host, &executor, stderr);
    }

    let downloader = HttpDownloader;
    let installer = CrossInstaller::new(&executor, &downloader, &config.tool);
    let context = PipelineContext {
        config: &config,
        host: &host,
        executor: &executor,
        tool: &installer,
        quiet: cli.quiet,
    };
    let report = execute(&context, stderr)?;

    if cli.json {
        write_report(&report, &mut std::io::stdout())?;
    }
    Ok(())
}

/// Writes the JSON report; stdout carries nothing else.
fn write_report(report: &ReleaseReport, stdout: &mut dyn Write) -> Result<()> {
    let json = report
        .to_json()
        .map_err(|err| PackagerError::ReportWrite { source: err.into() })?;
    writeln!(stdout, "{json}")
        .and_then(|()| stdout.flush())
        .map_err(|source| PackagerError::ReportWrite { source })
}

/// Shows the plan without building or writing anything.
fn run_dry(
    config: &ReleaseConfig,
    host: &HostOs,
    executor: &SystemCommandExecutor,
    stderr: &mut dyn Write,
) -> Result<()> {
    let plan = plan(config, host, executor)?;
    write_stderr_line(stderr, dry_run_text(&plan));
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error during {}: {err}", err.stage()));
            err.exit_code()
        }
    }
}
