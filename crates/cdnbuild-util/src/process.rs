//! Process execution helpers for cdnbuild.

use std::path::Path;
use std::process::Command;

use crate::error::UtilError;

/// Structured output from a command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output as a string.
    pub stdout: String,
    /// Standard error as a string.
    pub stderr: String,
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

/// Execute a command and capture its output.
///
/// # Errors
/// Returns an error if the command cannot be spawned (e.g. binary not found).
/// A non-zero exit code is **not** an error; check `CommandOutput::success` instead.
pub fn run_command(cmd: &mut Command) -> Result<CommandOutput, UtilError> {
    let output = cmd.output().map_err(|source| UtilError::CommandExec {
        command: format!("{:?}", cmd.get_program()),
        source,
    })?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
        exit_code: output.status.code(),
    })
}

/// Runs an external program in a working directory and blocks until it exits.
///
/// Strategies talk to external tools only through this trait, so tests can
/// substitute a scripted runner for `git` or `yarn`.
pub trait CommandRunner {
    /// Run `program` with `args` inside `cwd`.
    ///
    /// # Errors
    /// Returns an error only if the process cannot be spawned; a non-zero exit
    /// is reported through `CommandOutput::success`.
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput, UtilError>;
}

/// Runs commands on the host with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput, UtilError> {
        run_command(Command::new(program).args(args).current_dir(cwd))
    }
}

/// Render a program and its arguments the way they would be typed in a shell.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_owned();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run a command through `runner` and fail if it exits non-zero.
///
/// Both output streams are logged at debug level whatever the outcome.
///
/// # Errors
/// Returns `UtilError::CommandExec` if the process cannot be spawned and
/// `UtilError::CommandFailed` (carrying the exit code and captured output)
/// if it exits with a non-zero status.
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput, UtilError> {
    let command = display_command(program, args);
    tracing::debug!(%command, cwd = %cwd.display(), "running command");

    let output = runner.run(program, args, cwd)?;
    tracing::debug!(%command, stdout = %output.stdout, stderr = %output.stderr, "command finished");

    if !output.success {
        return Err(UtilError::CommandFailed {
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }
    Ok(output)
}
