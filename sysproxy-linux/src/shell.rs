//! Run external tools. Programs are spawned directly with an argument vector,
//! so interpolated values never pass through a shell.

use std::fmt;
use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Exit code reported when the process could not be spawned or died without one.
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Single-quote `value` for a POSIX shell unless it is made only of safe characters.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Pasteable into a shell.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Exited(i32),
    /// Program is not installed.
    NotFound,
    /// Spawn or pipe failure.
    SpawnFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: String,
}

impl CommandOutput {
    pub fn exited(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Exited(code),
            stdout: stdout.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == CommandStatus::Exited(0)
    }

    pub fn code(&self) -> i32 {
        match self.status {
            CommandStatus::Exited(code) => code,
            CommandStatus::NotFound | CommandStatus::SpawnFailed => SPAWN_FAILURE_CODE,
        }
    }

    /// Stdout without trailing newlines.
    pub fn text(&self) -> &str {
        self.stdout.trim_end_matches(['\r', '\n'])
    }
}

pub trait Runner {
    fn run(&self, command: &CommandLine) -> CommandOutput;

    /// Like `run`, but a non-zero exit is expected and not logged.
    fn run_quiet(&self, command: &CommandLine) -> CommandOutput;
}

pub type SharedRunner = Arc<dyn Runner + Send + Sync>;

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    fn execute(&self, command: &CommandLine, quiet: bool) -> CommandOutput {
        tracing::debug!(command = %command, "running");
        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(out) => {
                let code = out.status.code().unwrap_or(SPAWN_FAILURE_CODE);
                if code != 0 && !quiet {
                    tracing::warn!(command = %command, code, "command failed");
                }
                CommandOutput {
                    status: CommandStatus::Exited(code),
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if !quiet {
                    tracing::warn!(program = %command.program, "program not found");
                }
                CommandOutput {
                    status: CommandStatus::NotFound,
                    stdout: String::new(),
                }
            }
            Err(e) => {
                tracing::warn!(command = %command, error = %e, "could not start command");
                CommandOutput {
                    status: CommandStatus::SpawnFailed,
                    stdout: String::new(),
                }
            }
        }
    }
}

impl Runner for ShellExecutor {
    fn run(&self, command: &CommandLine) -> CommandOutput {
        self.execute(command, false)
    }

    fn run_quiet(&self, command: &CommandLine) -> CommandOutput {
        self.execute(command, true)
    }
}

/// Whether `name` is on `PATH`.
pub fn tool_exists(runner: &dyn Runner, name: &str) -> bool {
    runner
        .run_quiet(&CommandLine::new("which").arg(name))
        .success()
}
