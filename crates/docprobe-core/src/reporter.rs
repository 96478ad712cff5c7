//! Failure reporter.
//!
//! When a scenario fails, [`FailureReporter::bail`] captures what it can about
//! the UI at that moment, prints the error, and exits the process with the
//! error's non-zero exit code.
//!
//! # Capture layout
//!
//! ```text
//! <diagnostics_dir>/<scenario>-<UTC timestamp>/
//!     error.txt        error kind, message, exit code, last failed action
//!     tree.txt         indented [role | name] dump of the application tree
//!     tree.json        the same tree as JSON
//!     screenshot.png   screen capture, when enabled
//!     actions.jsonl    the action trail
//! ```
//!
//! Capture never fails the report: each artifact that cannot be produced is
//! logged with `warn!` and listed in [`Diagnostics::failures`].

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::element::render_tree;
use crate::error::HarnessError;
use crate::launcher::AppHandle;
use crate::procedural::Procedure;

/// Upper bound for each capture step that talks to the driver.
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Set by the first [`FailureReporter::report`] in the process.
static REPORTED: AtomicBool = AtomicBool::new(false);

/// What a capture produced.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Directory the artifacts were written to, if it could be created.
    pub dir: Option<PathBuf>,
    /// Files successfully written.
    pub written: Vec<PathBuf>,
    /// Human-readable reasons for artifacts that could not be produced.
    pub failures: Vec<String>,
}

impl Diagnostics {
    fn note_failure(&mut self, what: &str, reason: impl std::fmt::Display) {
        warn!(artifact = what, %reason, "diagnostic capture failed");
        self.failures.push(format!("{what}: {reason}"));
    }

    fn write(&mut self, name: &str, contents: &[u8]) {
        let Some(dir) = &self.dir else { return };
        let path = dir.join(name);
        match std::fs::write(&path, contents) {
            Ok(()) => self.written.push(path),
            Err(e) => self.note_failure(name, e),
        }
    }
}

/// Turns a scenario failure into diagnostics plus a non-zero exit.
pub struct FailureReporter {
    root: PathBuf,
    capture_screenshot: bool,
}

impl FailureReporter {
    pub fn new(root: impl Into<PathBuf>, capture_screenshot: bool) -> Self {
        Self {
            root: root.into(),
            capture_screenshot,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.diagnostics_dir(), config.capture_screenshot)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Capture diagnostics for `err` without exiting.
    ///
    /// `context` supplies the driver, application name and action trail; when
    /// it is `None` only `error.txt` is written.
    pub async fn capture(
        &self,
        scenario: &str,
        err: &HarnessError,
        context: Option<&Procedure>,
    ) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let dir = self.root.join(format!("{scenario}-{stamp}"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => diagnostics.dir = Some(dir),
            Err(e) => {
                diagnostics.note_failure("diagnostics directory", e);
                return diagnostics;
            }
        }

        let mut summary = format!(
            "scenario: {scenario}\nkind: {}\nerror: {err}\nexit code: {}\n",
            err.kind(),
            err.exit_code()
        );
        if let Some(failed) = context.and_then(|p| p.trail().last_failure()) {
            summary.push_str(&format!("failed action: {:?}\n", failed.action));
        }
        diagnostics.write("error.txt", summary.as_bytes());

        let Some(procedure) = context else {
            return diagnostics;
        };
        let driver = procedure.driver();

        if driver.is_connected() {
            match tokio::time::timeout(CAPTURE_TIMEOUT, driver.dump_tree(procedure.app())).await {
                Ok(Ok(tree)) => {
                    diagnostics.write("tree.txt", render_tree(&tree).as_bytes());
                    match serde_json::to_vec_pretty(&tree) {
                        Ok(json) => diagnostics.write("tree.json", &json),
                        Err(e) => diagnostics.note_failure("tree.json", e),
                    }
                }
                Ok(Err(e)) => diagnostics.note_failure("tree.txt", e),
                Err(_) => diagnostics.note_failure("tree.txt", "timed out"),
            }

            if self.capture_screenshot {
                match tokio::time::timeout(CAPTURE_TIMEOUT, driver.screenshot()).await {
                    Ok(Ok(png)) => diagnostics.write("screenshot.png", &png),
                    Ok(Err(e)) => diagnostics.note_failure("screenshot.png", e),
                    Err(_) => diagnostics.note_failure("screenshot.png", "timed out"),
                }
            }
        } else {
            diagnostics.note_failure("tree.txt", "driver not connected");
        }

        match procedure.trail().to_jsonl() {
            Ok(lines) => diagnostics.write("actions.jsonl", lines.as_bytes()),
            Err(e) => diagnostics.note_failure("actions.jsonl", e),
        }

        diagnostics
    }

    /// Capture and print once, returning the exit code to terminate with.
    ///
    /// Only the first call in the process captures; later calls print
    /// nothing and return the code straight away. The code is never zero.
    pub async fn report(
        &self,
        scenario: &str,
        err: &HarnessError,
        context: Option<&Procedure>,
    ) -> i32 {
        let code = err.exit_code().max(1);
        if REPORTED.swap(true, Ordering::SeqCst) {
            return code;
        }

        error!(scenario, kind = err.kind(), error = %err, "scenario failed");
        let diagnostics = self.capture(scenario, err, context).await;

        eprintln!("{scenario}: {}: {err}", err.kind());
        if let Some(dir) = &diagnostics.dir {
            eprintln!("diagnostics written to {}", dir.display());
            info!(dir = %dir.display(), files = diagnostics.written.len(), "diagnostics captured");
        }
        code
    }

    /// Report `err`, kill the application if it is still running, and
    /// terminate the process with a non-zero status.
    pub async fn bail(
        &self,
        scenario: &str,
        err: &HarnessError,
        context: Option<&Procedure>,
        app: Option<AppHandle>,
    ) -> Infallible {
        let code = self.report(scenario, err, context).await;
        if let Some(app) = app {
            if let Err(e) = app.close(Duration::ZERO).await {
                warn!(error = %e, "failed to stop application");
            }
        }
        std::process::exit(code)
    }
}
