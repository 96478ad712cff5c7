//! Harness error taxonomy.
//!
//! Every failure a scenario can hit ends up as a [`HarnessError`], which is
//! what the failure reporter receives at the error boundary. Each variant maps
//! to a distinct, always non-zero process exit code.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::driver::DriverError;

/// Errors raised while launching the application or running a scenario.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The application process could not be started or died during startup.
    #[error("Failed to launch {app}: {reason}")]
    ProcessLaunch { app: String, reason: String },

    /// The application's main frame never appeared in the accessibility tree.
    #[error("{app} did not show a main frame within {}ms", .timeout.as_millis())]
    LaunchTimeout { app: String, timeout: Duration },

    /// An expected widget was absent for the whole search window.
    #[error("Widget not found: {what} (searched for {}ms)", .waited.as_millis())]
    WidgetNotFound { what: String, waited: Duration },

    /// Observed UI state did not match what the scenario expected.
    #[error("Assertion failed: {0}")]
    AssertionFailure(String),

    /// The fixture file passed to the application does not exist.
    #[error("Fixture not found: {}", .0.display())]
    MissingFixture(PathBuf),

    /// The accessibility backend reported an error.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Process exit code for this error. Never zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::AssertionFailure(_) => 1,
            HarnessError::WidgetNotFound { .. } => 2,
            HarnessError::LaunchTimeout { .. } => 3,
            HarnessError::ProcessLaunch { .. } | HarnessError::MissingFixture(_) => 4,
            HarnessError::Driver(_) => 5,
            HarnessError::Io(_) => 6,
        }
    }

    /// Short, stable name of the error kind for logs and `error.txt`.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::ProcessLaunch { .. } | HarnessError::MissingFixture(_) => {
                "ProcessLaunchError"
            }
            HarnessError::LaunchTimeout { .. } => "LaunchTimeout",
            HarnessError::WidgetNotFound { .. } => "WidgetNotFound",
            HarnessError::AssertionFailure(_) => "AssertionFailure",
            HarnessError::Driver(_) => "DriverError",
            HarnessError::Io(_) => "IoError",
        }
    }
}
