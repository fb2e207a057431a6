//! Error types for cdnbuild-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A command could not be spawned.
    #[error("cannot execute `{command}`: {source}")]
    CommandExec {
        command: String,
        source: std::io::Error,
    },

    /// A command ran but exited with a non-zero status.
    #[error("`{command}` exited with {}", describe_exit(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// An HTTP download failed.
    #[error("download failed: {message}")]
    Download { message: String },

    /// An archive could not be unpacked.
    #[error("cannot extract {archive}: {message}")]
    Extract { archive: String, message: String },

    /// An archive entry attempted to escape the extraction directory.
    #[error("archive contains path traversal entry \"{entry_path}\" that escapes {dest}")]
    PathTraversal { entry_path: String, dest: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("non-zero return code {code}"),
        None => "no return code (terminated by signal)".to_owned(),
    }
}

impl UtilError {
    /// Captured output of a failed command, stdout first, if this is a `CommandFailed`.
    pub fn command_output(&self) -> Option<String> {
        match self {
            Self::CommandFailed { stdout, stderr, .. } => {
                let mut combined = stdout.clone();
                if !stdout.is_empty() && !stderr.is_empty() {
                    combined.push('\n');
                }
                combined.push_str(stderr);
                Some(combined)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_message_includes_code() {
        let err = UtilError::CommandFailed {
            command: "yarn install".to_owned(),
            exit_code: Some(2),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "`yarn install` exited with non-zero return code 2");
    }

    #[test]
    fn command_failed_message_without_code() {
        let err = UtilError::CommandFailed {
            command: "git clone".to_owned(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn command_output_joins_streams() {
        let err = UtilError::CommandFailed {
            command: "yarn".to_owned(),
            exit_code: Some(1),
            stdout: "out".to_owned(),
            stderr: "err".to_owned(),
        };
        assert_eq!(err.command_output().as_deref(), Some("out\nerr"));
    }

    #[test]
    fn command_output_absent_for_other_errors() {
        let err = UtilError::Download {
            message: "timeout".to_owned(),
        };
        assert!(err.command_output().is_none());
    }
}
