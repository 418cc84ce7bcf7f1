use std::process::{Command, Output};

use crate::error::ServiceError;

/// Render `program arg1 arg2 ...` for error messages.
pub(crate) fn describe(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| a.to_string()));
    parts.join(" ")
}

/// Run `program args...`, returning the raw output. IO failures (program not
/// found, etc.) are wrapped with the attempted command line for context.
pub(crate) fn run(program: &str, args: &[&str]) -> Result<Output, ServiceError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| ServiceError::Io {
            command: describe(program, args),
            source,
        })
}

/// Run a command and turn a non-zero exit into [`ServiceError::CommandFailed`],
/// unless `ignore_stderr` says the failure is actually fine (e.g. launchctl's
/// "no such process" on a bootout of an already-absent service).
pub(crate) fn run_checked(
    program: &str,
    args: &[&str],
    ignore_stderr: impl Fn(&str) -> bool,
) -> Result<(), ServiceError> {
    let output = run(program, args)?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if ignore_stderr(&stderr) {
        return Ok(());
    }
    Err(ServiceError::CommandFailed {
        command: describe(program, args),
        stderr,
    })
}

pub(crate) fn never_ignore(_stderr: &str) -> bool {
    false
}
