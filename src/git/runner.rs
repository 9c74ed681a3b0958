use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed ({status}){}", format_stderr(.stderr))]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` produced non-UTF-8 output")]
    Utf8 {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("i/o error while talking to `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("could not split command line `{0}`")]
    BadCommandLine(String),
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Result of a command whose exit status the caller wants to inspect itself.
#[derive(Debug, Clone)]
pub struct Captured {
    pub success: bool,
    pub stdout: String,
}

/// Executes external programs (git, editor, gpg, pager, clipboard tools).
///
/// Every call blocks until the child exits.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    cwd: Option<PathBuf>,
}

impl CommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the process working directory.
    #[cfg(test)]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
        }
    }

    fn command(&self, program: &str, args: &[&str]) -> (Command, String) {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        let shown = shell_words::join(std::iter::once(program).chain(args.iter().copied()));
        debug!(command = %shown, "running");
        (cmd, shown)
    }

    /// Run and return stdout verbatim; a non-zero exit is an error.
    pub fn capture(&self, program: &str, args: &[&str]) -> Result<String, RunError> {
        let (mut cmd, shown) = self.command(program, args);
        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RunError::Spawn {
                command: shown.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RunError::Failed {
                command: shown,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|source| RunError::Utf8 {
            command: shown,
            source,
        })
    }

    /// Like [`capture`](Self::capture) with surrounding whitespace removed.
    pub fn capture_line(&self, program: &str, args: &[&str]) -> Result<String, RunError> {
        self.capture(program, args).map(|out| out.trim().to_string())
    }

    /// Run without treating a non-zero exit as an error.
    pub fn capture_unchecked(&self, program: &str, args: &[&str]) -> Result<Captured, RunError> {
        let (mut cmd, shown) = self.command(program, args);
        let output = cmd
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| RunError::Spawn {
                command: shown.clone(),
                source,
            })?;

        Ok(Captured {
            success: output.status.success(),
            stdout: String::from_utf8(output.stdout).map_err(|source| RunError::Utf8 {
                command: shown,
                source,
            })?,
        })
    }

    /// Run while echoing stdout to the terminal as it arrives, and return
    /// everything that was echoed. stderr goes straight to the terminal.
    pub fn stream(&self, program: &str, args: &[&str]) -> Result<String, RunError> {
        let (mut cmd, shown) = self.command(program, args);
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RunError::Spawn {
                command: shown.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RunError::Io {
            command: shown.clone(),
            source: io::Error::new(io::ErrorKind::BrokenPipe, "stdout was not captured"),
        })?;

        let tee = thread::spawn(move || -> io::Result<String> {
            let mut captured = String::new();
            let mut terminal = io::stdout();
            for line in BufReader::new(stdout).lines() {
                let line = line?;
                writeln!(terminal, "{}", line)?;
                captured.push_str(&line);
                captured.push('\n');
            }
            terminal.flush()?;
            Ok(captured)
        });

        let status = child.wait().map_err(|source| RunError::Io {
            command: shown.clone(),
            source,
        })?;

        let captured = tee
            .join()
            .map_err(|_| RunError::Io {
                command: shown.clone(),
                source: io::Error::new(io::ErrorKind::Other, "output thread panicked"),
            })?
            .map_err(|source| RunError::Io {
                command: shown.clone(),
                source,
            })?;

        if !status.success() {
            return Err(RunError::Failed {
                command: shown,
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(captured)
    }

    /// Hand the terminal to an interactive program (an editor) and wait.
    pub fn interactive(&self, command_line: &str, extra_args: &[&Path]) -> Result<(), RunError> {
        let parts = split_command_line(command_line)?;
        let (program, base_args) = parts.split_first().ok_or(RunError::EmptyCommand)?;

        let extra: Vec<String> = extra_args
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let args: Vec<&str> = base_args
            .iter()
            .chain(extra.iter())
            .map(String::as_str)
            .collect();

        let (mut cmd, shown) = self.command(program, &args);
        let status = cmd.status().map_err(|source| RunError::Spawn {
            command: shown.clone(),
            source,
        })?;

        if !status.success() {
            return Err(RunError::Failed {
                command: shown,
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }

    /// Feed `input` to a program's stdin (pager, clipboard tool) and wait.
    pub fn pipe_into(&self, command_line: &str, input: &str) -> Result<(), RunError> {
        let parts = split_command_line(command_line)?;
        let (program, base_args) = parts.split_first().ok_or(RunError::EmptyCommand)?;
        let args: Vec<&str> = base_args.iter().map(String::as_str).collect();

        let (mut cmd, shown) = self.command(program, &args);
        let mut child = cmd
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| RunError::Spawn {
                command: shown.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A pager quitting early closes the pipe; that is not a failure.
            match stdin.write_all(input.as_bytes()) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(source) => {
                    return Err(RunError::Io {
                        command: shown,
                        source,
                    })
                }
            }
        }

        let status = child.wait().map_err(|source| RunError::Io {
            command: shown.clone(),
            source,
        })?;
        if !status.success() {
            return Err(RunError::Failed {
                command: shown,
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

fn split_command_line(command_line: &str) -> Result<Vec<String>, RunError> {
    let parts = shell_words::split(command_line)
        .map_err(|_| RunError::BadCommandLine(command_line.to_string()))?;
    if parts.is_empty() {
        return Err(RunError::EmptyCommand);
    }
    Ok(parts)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_capture_returns_stdout() {
        let out = CommandRunner::new().capture("sh", &["-c", "printf 'a\\nb\\n'"]).unwrap();
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn test_capture_line_trims() {
        let out = CommandRunner::new().capture_line("sh", &["-c", "echo '  hi  '"]).unwrap();
        assert_eq!(out, "hi");
    }

    #[test]
    fn test_capture_failure_carries_stderr() {
        let err = CommandRunner::new()
            .capture("sh", &["-c", "echo boom >&2; exit 3"])
            .unwrap_err();
        match err {
            RunError::Failed { stderr, .. } => assert!(stderr.contains("boom")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_names_the_command_line() {
        let err = CommandRunner::new().capture("sh", &["-c", "exit 3"]).unwrap_err();
        assert!(err.to_string().starts_with("`sh -c 'exit 3'` failed"));
    }

    #[test]
    fn test_capture_unchecked_reports_status() {
        let out = CommandRunner::new().capture_unchecked("sh", &["-c", "exit 1"]).unwrap();
        assert!(!out.success);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = CommandRunner::new()
            .capture("definitely-not-a-real-program-ackr", &[])
            .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }

    #[test]
    fn test_stream_captures_while_echoing() {
        let out = CommandRunner::new().stream("sh", &["-c", "echo one; echo two"]).unwrap();
        assert_eq!(out, "one\ntwo\n");
    }

    #[test]
    fn test_pipe_into_writes_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::in_dir(dir.path());
        runner.pipe_into("sh -c 'cat > piped.txt'", "payload").unwrap();
        let written = std::fs::read_to_string(dir.path().join("piped.txt")).unwrap();
        assert_eq!(written, "payload");
    }

    #[test]
    fn test_empty_command_line_rejected() {
        assert!(matches!(
            CommandRunner::new().pipe_into("   ", "x"),
            Err(RunError::EmptyCommand)
        ));
    }
}
