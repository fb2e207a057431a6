//! Build strategies run against a downloaded working directory.

use std::path::{Path, PathBuf};

use cdnbuild_util::error::UtilError;
use cdnbuild_util::process::{run_checked, CommandRunner};

/// One build tool invocation, as its argument list (e.g. `["run", "pack"]`).
pub type Invocation = Vec<String>;

/// Turns a populated working directory into built artifacts, in place.
pub trait Builder {
    /// Run the build inside `workdir` and return the directory holding the artifacts.
    ///
    /// # Errors
    /// Returns the first failing invocation; nothing after it is run.
    fn build(&self, workdir: &Path, runner: &dyn CommandRunner) -> Result<PathBuf, UtilError>;
}

/// Package-manager builds: `<program> install`, then each invocation in order.
#[derive(Debug, Clone)]
pub struct PackageScriptBuilder {
    program: String,
    invocations: Vec<Invocation>,
}

impl PackageScriptBuilder {
    pub fn new(program: &str, invocations: &[Invocation]) -> Self {
        Self {
            program: program.to_owned(),
            invocations: invocations.to_vec(),
        }
    }

    pub fn yarn(invocations: &[Invocation]) -> Self {
        Self::new("yarn", invocations)
    }

    pub fn npm(invocations: &[Invocation]) -> Self {
        Self::new("npm", invocations)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }
}

impl Builder for PackageScriptBuilder {
    fn build(&self, workdir: &Path, runner: &dyn CommandRunner) -> Result<PathBuf, UtilError> {
        tracing::info!(program = %self.program, workdir = %workdir.display(), "installing dependencies");
        run_checked(runner, &self.program, &["install".to_owned()], workdir)?;

        for invocation in &self.invocations {
            tracing::info!(program = %self.program, args = ?invocation, "running build step");
            run_checked(runner, &self.program, invocation, workdir)?;
        }

        Ok(workdir.to_path_buf())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use cdnbuild_util::process::{CommandOutput, SystemRunner};

    use super::*;

    /// Records calls and fails the invocation whose first argument matches `fail_on`.
    #[derive(Default)]
    struct ScriptedRunner {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            program: &str,
            args: &[String],
            _cwd: &Path,
        ) -> Result<CommandOutput, UtilError> {
            self.calls
                .borrow_mut()
                .push(format!("{program} {}", args.join(" ")));
            let failed = self.fail_on.is_some_and(|f| args.last().is_some_and(|a| a == f));
            Ok(CommandOutput {
                success: !failed,
                exit_code: Some(i32::from(failed)),
                ..CommandOutput::default()
            })
        }
    }

    fn inv(args: &[&str]) -> Invocation {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn installs_then_runs_invocations_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        let builder = PackageScriptBuilder::yarn(&[inv(&["run", "lint"]), inv(&["run", "pack"])]);

        let out = builder.build(tmp.path(), &runner).unwrap();

        assert_eq!(out, tmp.path());
        assert_eq!(
            *runner.calls.borrow(),
            vec!["yarn install", "yarn run lint", "yarn run pack"]
        );
    }

    #[test]
    fn single_invocation_is_a_list_of_one() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        let builder = PackageScriptBuilder::npm(&[inv(&["run", "build-web"])]);

        builder.build(tmp.path(), &runner).unwrap();

        assert_eq!(*runner.calls.borrow(), vec!["npm install", "npm run build-web"]);
    }

    #[test]
    fn stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner {
            fail_on: Some("lint"),
            ..ScriptedRunner::default()
        };
        let builder = PackageScriptBuilder::yarn(&[inv(&["run", "lint"]), inv(&["run", "pack"])]);

        let err = builder.build(tmp.path(), &runner).unwrap_err();

        assert!(matches!(err, UtilError::CommandFailed { exit_code: Some(1), .. }));
        assert_eq!(*runner.calls.borrow(), vec!["yarn install", "yarn run lint"]);
    }

    #[test]
    fn failed_install_runs_nothing_else() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner {
            fail_on: Some("install"),
            ..ScriptedRunner::default()
        };
        let builder = PackageScriptBuilder::yarn(&[inv(&["run", "pack"])]);

        assert!(builder.build(tmp.path(), &runner).is_err());
        assert_eq!(*runner.calls.borrow(), vec!["yarn install"]);
    }

    #[test]
    fn real_process_failure_surfaces() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = PackageScriptBuilder::new("false", &[]);

        let err = builder.build(tmp.path(), &SystemRunner).unwrap_err();
        assert!(matches!(err, UtilError::CommandFailed { .. }));
    }

    #[test]
    fn accessors_expose_configuration() {
        let builder = PackageScriptBuilder::yarn(&[inv(&["run", "pack"])]);
        assert_eq!(builder.program(), "yarn");
        assert_eq!(builder.invocations(), &[inv(&["run", "pack"])]);
    }
}
