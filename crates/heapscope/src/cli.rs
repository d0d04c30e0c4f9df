//! Command-line parsing and exit status.

use heapscope_census::Completeness;
use thiserror::Error;

pub const USAGE: &str = "Usage: heapscope <PID of the process whose heap you want to census>";

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_USAGE: u8 = 2;
pub const EXIT_INCOMPLETE: u8 = 3;

/// Invalid invocation
#[derive(Debug, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("expected exactly one argument, got {0}")]
    ArgumentCount(usize),

    #[error("invalid process id: {0}")]
    InvalidPid(String),
}

impl UsageError {
    pub fn exit_status(&self) -> u8 {
        EXIT_USAGE
    }
}

/// Parse the arguments after the program name into a target pid.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<u32, UsageError> {
    let [pid] = args else {
        return Err(UsageError::ArgumentCount(args.len()));
    };

    let pid = pid.as_ref();
    pid.trim()
        .parse()
        .map_err(|_| UsageError::InvalidPid(pid.to_string()))
}

/// Exit status for a census run that got past argument parsing.
///
/// A truncated report still reaches stdout but must not look complete.
pub fn exit_status(outcome: &anyhow::Result<Completeness>) -> u8 {
    match outcome {
        Ok(Completeness::Complete) => EXIT_SUCCESS,
        Ok(Completeness::TimedOut { .. }) => EXIT_INCOMPLETE,
        Err(_) => EXIT_FAILURE,
    }
}
