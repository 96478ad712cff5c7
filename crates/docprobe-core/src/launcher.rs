//! Application launch and main-frame wait.
//!
//! [`run_app`] starts the application under test with a deterministic locale,
//! optionally opening a fixture document, and blocks until a `frame` shows up
//! in the application's accessibility tree.
//!
//! # Outcomes
//!
//! - `Ok(AppHandle)`: a main frame is visible; the handle owns the process.
//! - [`HarnessError::ProcessLaunch`]: the binary could not be spawned, or it
//!   exited with a failure status before showing a window.
//! - [`HarnessError::MissingFixture`]: the requested document does not exist.
//! - [`HarnessError::LaunchTimeout`]: no frame within the launch timeout.
//!
//! A process that exits *successfully* before its frame appears is not an
//! error by itself: single-instance viewers forward the document to an
//! already-running instance and exit, and the frame then belongs to that
//! instance.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::HarnessConfig;
use crate::driver::{AccessibilityDriver, DriverError};
use crate::element::roles;
use crate::error::HarnessError;

/// A running application with a visible main frame.
///
/// Dropping the handle kills the process if it is still running.
#[derive(Debug)]
pub struct AppHandle {
    app_name: String,
    main_frame: String,
    child: Option<Child>,
}

impl AppHandle {
    /// Name the application is registered under on the accessibility bus.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Title of the frame that satisfied the launch wait.
    pub fn main_frame(&self) -> &str {
        &self.main_frame
    }

    /// OS process id, if the launched process is still owned by this handle.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Wait up to `grace` for the process to exit on its own, then kill it.
    ///
    /// Scenarios close their windows through the UI; this reaps the process
    /// afterwards. Returns the exit status when the process exited by itself.
    pub async fn close(mut self, grace: Duration) -> Result<Option<ExitStatus>, HarnessError> {
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                let status = status?;
                debug!(%status, "application exited");
                Ok(Some(status))
            }
            Err(_) => {
                warn!(app = %self.app_name, "application still running after close, killing");
                child.kill().await?;
                Ok(None)
            }
        }
    }
}

/// Resolves a fixture name against the configured fixtures directory.
///
/// Absolute paths are kept as-is. The result must exist.
pub fn resolve_fixture(config: &HarnessConfig, file: &str) -> Result<PathBuf, HarnessError> {
    let candidate = Path::new(file);
    let path = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        config.fixtures_dir().join(candidate)
    };
    if path.exists() {
        Ok(path)
    } else {
        Err(HarnessError::MissingFixture(path))
    }
}

/// Builds the launch command: binary, fixed args, then the document.
///
/// The working directory is the fixtures directory so file choosers open on
/// the fixture documents.
fn build_command(config: &HarnessConfig, document: Option<&Path>) -> Command {
    let mut command = Command::new(&config.app);
    command
        .args(&config.app_args)
        .current_dir(config.fixtures_dir())
        .env("LANG", &config.locale)
        .env_remove("LC_ALL")
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(path) = document {
        command.arg(path);
    }
    command
}

/// Launch the application and wait for its main frame.
///
/// `file`, when given, is resolved with [`resolve_fixture`] and appended to
/// the command line.
pub async fn run_app(
    config: &HarnessConfig,
    driver: &dyn AccessibilityDriver,
    file: Option<&str>,
) -> Result<AppHandle, HarnessError> {
    let app_name = config.app_name();
    let span = info_span!("run_app", app = %app_name, file = file.unwrap_or(""));
    async {
        let document = file.map(|f| resolve_fixture(config, f)).transpose()?;

        let mut child = build_command(config, document.as_deref())
            .spawn()
            .map_err(|e| HarnessError::ProcessLaunch {
                app: config.app.clone(),
                reason: e.to_string(),
            })?;
        info!(pid = child.id(), "application started");

        let main_frame = wait_for_main_frame(
            driver,
            &app_name,
            &mut child,
            config.launch_timeout(),
            config.poll_interval(),
        )
        .await?;
        info!(frame = %main_frame, "main frame visible");

        Ok::<_, HarnessError>(AppHandle {
            app_name: app_name.clone(),
            main_frame,
            child: Some(child),
        })
    }
    .instrument(span)
    .await
}

/// Polls the accessibility tree until a toplevel `frame` appears.
async fn wait_for_main_frame(
    driver: &dyn AccessibilityDriver,
    app_name: &str,
    child: &mut Child,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String, HarnessError> {
    let deadline = Instant::now() + timeout;
    let mut exited_cleanly = false;

    loop {
        if !exited_cleanly {
            if let Some(status) = child.try_wait()? {
                if !status.success() {
                    return Err(HarnessError::ProcessLaunch {
                        app: app_name.to_string(),
                        reason: format!("exited with {status} before showing a window"),
                    });
                }
                debug!("launcher process exited cleanly, waiting for handed-off frame");
                exited_cleanly = true;
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, driver.dump_tree(app_name)).await {
            Ok(Ok(tree)) => {
                if let Some(frame) = tree.iter().find(|n| n.is_role(roles::FRAME)) {
                    return Ok(frame.name.clone().unwrap_or_default());
                }
            }
            Ok(Err(DriverError::NotConnected)) => {
                return Err(HarnessError::Driver(DriverError::NotConnected));
            }
            Ok(Err(e)) => debug!(error = %e, "tree not available yet"),
            Err(_) => debug!("tree request outlived the launch deadline"),
        }

        if Instant::now() >= deadline {
            return Err(HarnessError::LaunchTimeout {
                app: app_name.to_string(),
                timeout,
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}
