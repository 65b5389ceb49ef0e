//! Invocation of external system tools.
//!
//! Every tool call goes through a [`ToolRunner`] so the orchestration flows
//! can be driven without touching the host.

use std::fmt;
use std::process::Command;

use lustmolch_common::error::{LustmolchError, Result};

/// A program and its argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name, looked up on `PATH`.
    pub program: String,
    /// Arguments, passed verbatim.
    pub args: Vec<String>,
}

impl Invocation {
    /// Starts an invocation of `program` without arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of a finished tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ToolOutput {
    /// Returns whether the tool exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Runs external tools to completion.
pub trait ToolRunner {
    /// Runs `invocation` and returns its output regardless of exit status.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;

    /// Checks that `program` can be executed.
    ///
    /// # Errors
    ///
    /// Returns [`LustmolchError::NotFound`] if the program is unavailable.
    fn ensure_available(&self, program: &str) -> Result<()>;
}

/// Runs `invocation` and turns a non-zero exit into an error.
///
/// # Errors
///
/// Returns [`LustmolchError::Tool`] on a non-zero exit, or the spawn error.
pub fn run_checked(runner: &dyn ToolRunner, invocation: &Invocation) -> Result<ToolOutput> {
    let output = runner.run(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        Err(LustmolchError::Tool {
            program: invocation.program.clone(),
            code: output.code,
            stderr: output.stderr.trim().to_owned(),
        })
    }
}

/// Runs tools as child processes of this one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        tracing::debug!(command = %invocation, "running");
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .output()
            .map_err(|e| LustmolchError::io(&invocation.program, e))?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        for line in result.stderr.lines() {
            tracing::debug!(program = %invocation.program, "stderr: {line}");
        }
        Ok(result)
    }

    fn ensure_available(&self, program: &str) -> Result<()> {
        which::which(program)
            .map(|path| tracing::debug!(program, path = %path.display(), "found tool"))
            .map_err(|_| LustmolchError::NotFound {
                kind: "tool",
                id: program.to_owned(),
            })
    }
}
