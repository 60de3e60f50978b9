//! Subprocess execution behind a testable seam.
//!
//! Every external program the packager drives (`git`, `cargo`, the
//! cross-compilation tool) is invoked through [`CommandExecutor`], so the
//! pipeline can be exercised with scripted outputs instead of real
//! processes.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the
    /// command, or [`PackagerError::Timeout`] if it overruns.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kak_lsp_release::executor::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run("git", &["describe", "--tags"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), kak_lsp_release::error::PackagerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;

    /// Runs a command whose output is streamed to this process's stderr.
    ///
    /// Long-running build steps use this so progress stays visible. The
    /// child's stdout is forwarded to stderr as well, leaving stdout free for
    /// the release report. The default implementation captures output and
    /// discards it, which is what test doubles want.
    ///
    /// # Errors
    ///
    /// Same as [`CommandExecutor::run`].
    fn run_attached(&self, cmd: &str, args: &[&str]) -> Result<ExitStatus> {
        self.run(cmd, args).map(|output| output.status)
    }
}

/// Executes commands on the host system.
///
/// Commands run in `working_dir` when set, and are killed once `timeout`
/// elapses.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor {
    working_dir: Option<Utf8PathBuf>,
    timeout: Option<Duration>,
}

impl SystemCommandExecutor {
    /// Create an executor that runs commands inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Utf8Path) -> Self {
        Self {
            working_dir: Some(dir.to_owned()),
            timeout: None,
        }
    }

    /// Bound every command by `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, cmd: &str, args: &[&str]) -> Command {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir.as_std_path());
        }
        log::debug!("running {cmd} {}", args.join(" "));
        command
    }

    /// Wait for `child`, killing it if the timeout elapses first.
    fn wait(&self, child: &mut Child, cmd: &str) -> Result<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?);
        };

        if let Some(status) = child.wait_timeout(timeout)? {
            return Ok(status);
        }

        let _ = child.kill();
        let _ = child.wait();
        Err(PackagerError::Timeout {
            program: cmd.to_owned(),
            seconds: timeout.as_secs(),
        })
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        let mut child = self
            .command(cmd, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes concurrently so a chatty child cannot block on a
        // full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait(&mut child, cmd)?;

        Ok(Output {
            status,
            stdout: join_drain(stdout)?,
            stderr: join_drain(stderr)?,
        })
    }

    fn run_attached(&self, cmd: &str, args: &[&str]) -> Result<ExitStatus> {
        let mut child = self
            .command(cmd, args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;

        let forward = child.stdout.take().map(forward_to_stderr);
        let status = self.wait(&mut child, cmd)?;

        // After a timeout a grandchild may still hold the pipe, so only join
        // once the child has exited on its own.
        if let Some(handle) = forward {
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => log::debug!("stopped forwarding {cmd} output: {err}"),
                Err(_) => log::debug!("output forwarder for {cmd} panicked"),
            }
        }
        Ok(status)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn forward_to_stderr<R: Read + Send + 'static>(
    mut reader: R,
) -> JoinHandle<std::io::Result<u64>> {
    std::thread::spawn(move || std::io::copy(&mut reader, &mut std::io::stderr()))
}

fn join_drain(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| std::io::Error::other("output reader thread panicked"))?
            .map_err(PackagerError::from),
        None => Ok(Vec::new()),
    }
}

/// Return stderr of a failed command as trimmed text for diagnostics.
#[must_use]
pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

/// Returns true if the given command executes successfully.
pub fn command_succeeds(executor: &dyn CommandExecutor, cmd: &str, args: &[&str]) -> bool {
    executor.run(cmd, args).is_ok_and(|o| o.status.success())
}
