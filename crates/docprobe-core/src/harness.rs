//! Scenario trait and the run state machine.
//!
//! A [`Harness`] runs one [`Scenario`]: it launches the application (with the
//! scenario's fixture, if any), waits for the main frame, hands a
//! [`Procedure`] to the scenario body, and reaps the process afterwards.
//! Launch and body share a single error boundary; the first error ends the
//! run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

use crate::action::ActionResult;
use crate::config::HarnessConfig;
use crate::driver::{AccessibilityDriver, DriverError};
use crate::error::HarnessError;
use crate::launcher::{run_app, AppHandle};
use crate::procedural::Procedure;

/// How long a passing run waits for the application to exit on its own.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// A scripted UI scenario.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Identifier used on the command line and in diagnostics paths.
    fn name(&self) -> &str;

    /// One-line summary for `docprobe list`.
    fn description(&self) -> &str;

    /// Fixture document to open at launch, relative to the fixtures dir.
    fn fixture(&self) -> Option<&str> {
        None
    }

    /// The scenario body.
    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError>;
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Passed,
    Failed,
}

/// A failed run.
///
/// Keeps the procedure (driver, trail, focus) and the application handle
/// alive so the failure reporter can capture the UI as it was.
pub struct Failure {
    pub error: HarnessError,
    pub procedure: Procedure,
    pub app: Option<AppHandle>,
}

impl std::fmt::Debug for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Failure")
            .field("error", &self.error)
            .field("actions", &self.procedure.trail().len())
            .field("app", &self.app)
            .finish()
    }
}

/// Runs scenarios against one driver.
pub struct Harness {
    config: HarnessConfig,
    driver: Arc<dyn AccessibilityDriver>,
    state: RunState,
}

impl Harness {
    /// `driver` must already be connected.
    pub fn new(config: HarnessConfig, driver: Arc<dyn AccessibilityDriver>) -> Self {
        Self {
            config,
            driver,
            state: RunState::NotStarted,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run `scenario` to completion.
    ///
    /// On success the application has been reaped and the procedure is
    /// returned for inspection. On failure the application is still owned by
    /// the returned [`Failure`].
    pub async fn execute(&mut self, scenario: &dyn Scenario) -> Result<Procedure, Failure> {
        self.state = RunState::Running;
        let span = info_span!("scenario", name = scenario.name());
        let result = self.run_scenario(scenario).instrument(span).await;
        self.state = match result {
            Ok(_) => RunState::Passed,
            Err(_) => RunState::Failed,
        };
        result
    }

    async fn run_scenario(&self, scenario: &dyn Scenario) -> Result<Procedure, Failure> {
        let mut procedure = Procedure::new(self.driver.clone(), self.config.app_name(), &self.config);

        if !self.driver.is_connected() {
            return Err(Failure {
                error: DriverError::NotConnected.into(),
                procedure,
                app: None,
            });
        }

        let file = scenario.fixture();
        let start = Instant::now();
        let launched = run_app(&self.config, self.driver.as_ref(), file).await;
        let handle = match launched {
            Ok(handle) => {
                procedure.record_launch(file, start.elapsed(), ActionResult::Success);
                handle
            }
            Err(error) => {
                procedure.record_launch(file, start.elapsed(), ActionResult::Failure(error.to_string()));
                return Err(Failure {
                    error,
                    procedure,
                    app: None,
                });
            }
        };

        if let Err(error) = scenario.run(&mut procedure).await {
            return Err(Failure {
                error,
                procedure,
                app: Some(handle),
            });
        }

        match handle.close(CLOSE_GRACE).await {
            Ok(status) => info!(?status, actions = procedure.trail().len(), "scenario passed"),
            Err(e) => warn!(error = %e, "failed to reap application"),
        }
        Ok(procedure)
    }
}
