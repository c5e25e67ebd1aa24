//! Top-level "report and stop" adapter.
//!
//! The runtime returns [`MatrtError`] from every fallible operation. Generated
//! code has no recovery path, so its call sites go through [`OrAbort`], which
//! writes a diagnostic naming the operation and then applies the installed
//! [`FatalPolicy`]. Embedders that want recovery use the `Result` directly.

use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::MatrtError;

/// What to do after reporting a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalPolicy {
    /// `std::process::abort()`, no unwinding.
    #[default]
    Abort,
    /// `std::process::exit(code)`.
    Exit(i32),
    /// Panic with the diagnostic; used by test harnesses.
    Panic,
}

impl fmt::Display for FatalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalPolicy::Abort => write!(f, "abort"),
            FatalPolicy::Exit(code) => write!(f, "exit:{code}"),
            FatalPolicy::Panic => write!(f, "panic"),
        }
    }
}

impl FromStr for FatalPolicy {
    type Err = MatrtError;

    /// Parses `abort`, `panic`, `exit` (code 1) or `exit:<code>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FatalPolicy::Abort),
            "panic" => Ok(FatalPolicy::Panic),
            "exit" => Ok(FatalPolicy::Exit(1)),
            other => match other.strip_prefix("exit:") {
                Some(code) => code
                    .parse()
                    .map(FatalPolicy::Exit)
                    .map_err(|_| MatrtError::Config(format!("invalid exit code in fatal policy '{s}'"))),
                None => Err(MatrtError::Config(format!("unknown fatal policy '{s}'"))),
            },
        }
    }
}

static POLICY: RwLock<FatalPolicy> = parking_lot::const_rwlock(FatalPolicy::Abort);

/// Install the process-wide policy used by [`OrAbort::or_abort`].
pub fn install_policy(policy: FatalPolicy) {
    *POLICY.write() = policy;
}

/// The currently installed policy.
pub fn policy() -> FatalPolicy {
    *POLICY.read()
}

/// Report `err` for operation `op` and stop according to `policy`.
pub fn fatal(op: &str, err: &MatrtError, policy: FatalPolicy) -> ! {
    tracing::error!(op, error = %err, %policy, "fatal runtime error");
    match policy {
        FatalPolicy::Panic => panic!("{op}: {err}"),
        FatalPolicy::Abort => {
            eprintln!("{op}: {err}");
            std::process::abort()
        }
        FatalPolicy::Exit(code) => {
            eprintln!("{op}: {err}");
            std::process::exit(code)
        }
    }
}

/// Unwrap a runtime result or stop the process.
pub trait OrAbort<T> {
    /// Unwrap, applying the installed policy on error.
    fn or_abort(self, op: &str) -> T;

    /// Unwrap, applying `policy` on error.
    fn or_abort_with(self, op: &str, policy: FatalPolicy) -> T;
}

impl<T> OrAbort<T> for crate::Result<T> {
    fn or_abort(self, op: &str) -> T {
        self.or_abort_with(op, policy())
    }

    fn or_abort_with(self, op: &str, policy: FatalPolicy) -> T {
        match self {
            Ok(value) => value,
            Err(err) => fatal(op, &err, policy),
        }
    }
}
