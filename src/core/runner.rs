//! External command execution.
//!
//! Every pipeline step is an external FSL (or coreutils) invocation. The tools
//! report their own progress, so commands run with inherited stdio and only
//! the exit status is inspected. Any failure is fatal to the whole run; the
//! imaging tools cannot be meaningfully retried without operator intervention.

use std::process::{Command, Stdio};

use crate::error::{Error, Result};
use crate::plan::Step;

/// Run a shell command, failing on any non-zero exit status.
pub fn run(command: &str) -> Result<()> {
    let status = Command::new("sh")
        .args(["-c", command])
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| Error::Launch {
            command: command.to_string(),
            source: e,
        })?;

    if !status.success() {
        return Err(Error::CommandFailed {
            command: command.to_string(),
            status: status.code().unwrap_or(-1),
        });
    }

    Ok(())
}

/// Run a shell command, announcing `message` first.
pub fn run_with_message(command: &str, message: &str) -> Result<()> {
    log_status!("run", "{}", message);
    run(command)
}

/// Run a single pipeline step.
pub fn run_step(step: &Step) -> Result<()> {
    match step.message {
        Some(message) => run_with_message(&step.command, message),
        None => run(&step.command),
    }
}
