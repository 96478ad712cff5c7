//! Focus-tracking procedural API used by scenarios.
//!
//! [`Procedure`] mirrors the flat scripting style the scenarios are written
//! in: `click(name, role)`, `focus_frame(title)`, `focus_dialog(title)`,
//! `focus_widget(name)`, `type_text`, `key_combo`, and reading or writing the
//! focused widget's text.
//!
//! # Search scope
//!
//! Lookups look in the most recently focused window (frame or dialog) first
//! and fall back to the whole application when the widget is not there.
//! Focusing a window replaces the previous one and clears the focused widget.
//!
//! # Waiting
//!
//! Every lookup polls the driver up to `search_attempts` times, pausing
//! `search_backoff` between attempts, before failing with
//! [`HarnessError::WidgetNotFound`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use docprobe_core::config::HarnessConfig;
//! use docprobe_core::driver::AccessibilityDriver;
//! use docprobe_core::procedural::Procedure;
//!
//! # async fn example(driver: Arc<dyn AccessibilityDriver>) -> Result<(), docprobe_core::error::HarnessError> {
//! let mut p = Procedure::new(driver, "atril", &HarnessConfig::default());
//! p.focus_frame("test-links.pdf").await?;
//! p.click("View", "menu").await?;
//! p.click("Zoom In", "menu item").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info_span, Instrument};

use crate::action::{ActionLog, ActionResult, ActionTrail, ActionType};
use crate::config::HarnessConfig;
use crate::driver::{AccessibilityDriver, DriverError, Locator, Selector, Window};
use crate::element::AccessibleNode;
use crate::error::HarnessError;

/// Returns true if the driver error means the backend itself is gone.
fn is_fatal(err: &DriverError) -> bool {
    matches!(
        err,
        DriverError::NotConnected | DriverError::ConnectionLost(_) | DriverError::Io(_)
    )
}

/// Scripted interaction session against one application.
pub struct Procedure {
    driver: Arc<dyn AccessibilityDriver>,
    app: String,
    window: Option<Window>,
    widget: Option<Selector>,
    search_attempts: u32,
    search_backoff: Duration,
    trail: ActionTrail,
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Procedure")
            .field("app", &self.app)
            .field("window", &self.window)
            .field("widget", &self.widget)
            .field("search_attempts", &self.search_attempts)
            .field("search_backoff", &self.search_backoff)
            .field("trail", &self.trail)
            .finish_non_exhaustive()
    }
}

impl Procedure {
    /// Creates a procedure for `app` using search timing from `config`.
    pub fn new(driver: Arc<dyn AccessibilityDriver>, app: impl Into<String>, config: &HarnessConfig) -> Self {
        Self {
            driver,
            app: app.into(),
            window: None,
            widget: None,
            search_attempts: config.search_attempts.max(1),
            search_backoff: config.search_backoff(),
            trail: ActionTrail::new(),
        }
    }

    pub fn driver(&self) -> &Arc<dyn AccessibilityDriver> {
        &self.driver
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn focused_window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn focused_widget(&self) -> Option<&Selector> {
        self.widget.as_ref()
    }

    pub fn trail(&self) -> &ActionTrail {
        &self.trail
    }

    /// Records a launch in the trail. Called by the harness after `run_app`.
    pub fn record_launch(&mut self, file: Option<&str>, elapsed: Duration, result: ActionResult) {
        self.trail.push(ActionLog::new(
            ActionType::Launch {
                app: self.app.clone(),
                file: file.map(String::from),
            },
            result,
            Some(elapsed.as_millis() as u64),
        ));
    }

    fn locator(&self, selector: Selector) -> Locator {
        Locator {
            window: self.window.clone(),
            selector,
        }
    }

    fn focused_selector(&self) -> Result<Selector, HarnessError> {
        self.widget
            .clone()
            .ok_or_else(|| HarnessError::AssertionFailure("no widget has focus".to_string()))
    }

    fn record<T>(&mut self, action: ActionType, start: Instant, result: &Result<T, HarnessError>) {
        let outcome = match result {
            Ok(_) => ActionResult::Success,
            Err(e) => ActionResult::Failure(e.to_string()),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(action = action.name(), elapsed_ms, success = result.is_ok(), "action complete");
        self.trail.push(ActionLog::new(action, outcome, Some(elapsed_ms)));
    }

    /// Polls until `selector` resolves, in the focused window or else
    /// anywhere in the application. Returns the locator that matched.
    pub async fn wait_for(&self, selector: &Selector) -> Result<(Locator, AccessibleNode), HarnessError> {
        let scoped = self.locator(selector.clone());
        if scoped.window.is_some() {
            self.poll(&[scoped, Locator::anywhere(selector.clone())]).await
        } else {
            self.poll(&[scoped]).await
        }
    }

    /// Polls the candidates in order until one resolves.
    async fn poll(&self, candidates: &[Locator]) -> Result<(Locator, AccessibleNode), HarnessError> {
        let start = Instant::now();
        for attempt in 1..=self.search_attempts {
            for locator in candidates {
                match self.driver.find(&self.app, locator).await {
                    Ok(Some(node)) => return Ok((locator.clone(), node)),
                    Ok(None) => {}
                    Err(e) if is_fatal(&e) => return Err(e.into()),
                    Err(e) => debug!(error = %e, attempt, "lookup failed"),
                }
            }
            if attempt < self.search_attempts {
                tokio::time::sleep(self.search_backoff).await;
            }
        }
        let what = candidates.first().map(Locator::to_string).unwrap_or_default();
        Err(HarnessError::WidgetNotFound {
            what,
            waited: start.elapsed(),
        })
    }

    /// Polls until `locator` no longer resolves.
    async fn wait_until_gone(&self, locator: &Locator) -> Result<(), HarnessError> {
        let start = Instant::now();
        for attempt in 1..=self.search_attempts {
            match self.driver.find(&self.app, locator).await {
                Ok(None) => return Ok(()),
                Ok(Some(_)) => {}
                Err(e) if is_fatal(&e) => return Err(e.into()),
                Err(e) => debug!(error = %e, attempt, "lookup failed"),
            }
            if attempt < self.search_attempts {
                tokio::time::sleep(self.search_backoff).await;
            }
        }
        Err(HarnessError::AssertionFailure(format!(
            "{} still present after {}ms",
            locator,
            start.elapsed().as_millis()
        )))
    }

    /// Click the widget with this name and role.
    pub async fn click(&mut self, name: &str, role: &str) -> Result<(), HarnessError> {
        let action = ActionType::Click {
            name: name.to_string(),
            role: Some(role.to_string()),
        };
        let selector = Selector::new(name, role);
        let span = info_span!("click", name, role);
        let start = Instant::now();
        let result = async {
            let (locator, _) = self.wait_for(&selector).await?;
            self.driver.click(&self.app, &locator).await?;
            Ok::<(), HarnessError>(())
        }
        .instrument(span)
        .await;
        self.record(action, start, &result);
        result
    }

    /// Focus the frame with this title.
    pub async fn focus_frame(&mut self, name: &str) -> Result<(), HarnessError> {
        self.focus_window(Window::frame(name), ActionType::FocusFrame { name: name.to_string() })
            .await
    }

    /// Focus the dialog with this title.
    pub async fn focus_dialog(&mut self, name: &str) -> Result<(), HarnessError> {
        self.focus_window(Window::dialog(name), ActionType::FocusDialog { name: name.to_string() })
            .await
    }

    async fn focus_window(&mut self, window: Window, action: ActionType) -> Result<(), HarnessError> {
        let span = info_span!("focus_window", window = %window);
        let start = Instant::now();
        let locator = Locator::anywhere(window.selector());
        let result = self.poll(&[locator]).instrument(span).await.map(|_| ());
        if result.is_ok() {
            self.window = Some(window);
            self.widget = None;
        }
        self.record(action, start, &result);
        result
    }

    /// Focus a widget by name.
    pub async fn focus_widget(&mut self, name: &str) -> Result<(), HarnessError> {
        let action = ActionType::FocusWidget { name: name.to_string() };
        let selector = Selector::named(name);
        let start = Instant::now();
        let result = self
            .wait_for(&selector)
            .instrument(info_span!("focus_widget", name))
            .await
            .map(|_| ());
        if result.is_ok() {
            self.widget = Some(selector);
        }
        self.record(action, start, &result);
        result
    }

    /// Current text of the focused widget (empty when it has none).
    pub async fn widget_text(&self) -> Result<String, HarnessError> {
        let (locator, _) = self.wait_for(&self.focused_selector()?).await?;
        let text = self.driver.get_text(&self.app, &locator).await?;
        Ok(text.unwrap_or_default())
    }

    /// Replace the focused widget's text.
    pub async fn set_widget_text(&mut self, text: &str) -> Result<(), HarnessError> {
        let action = ActionType::SetText { text: text.to_string() };
        let start = Instant::now();
        let result = async {
            let (locator, _) = self.wait_for(&self.focused_selector()?).await?;
            self.driver.set_text(&self.app, &locator, text).await?;
            Ok::<(), HarnessError>(())
        }
        .await;
        self.record(action, start, &result);
        result
    }

    /// Invoke the focused widget's default action.
    pub async fn activate(&mut self) -> Result<(), HarnessError> {
        let start = Instant::now();
        let result = async {
            let (locator, _) = self.wait_for(&self.focused_selector()?).await?;
            self.driver.activate(&self.app, &locator).await?;
            Ok::<(), HarnessError>(())
        }
        .await;
        self.record(ActionType::Activate, start, &result);
        result
    }

    /// Fail with [`HarnessError::AssertionFailure`] unless the focused
    /// widget's text equals `expected`.
    pub async fn assert_widget_text(&mut self, expected: &str) -> Result<(), HarnessError> {
        let action = ActionType::AssertText { expected: expected.to_string() };
        let start = Instant::now();
        let result = async {
            let actual = self.widget_text().await?;
            if actual == expected {
                Ok(())
            } else {
                let target = self.focused_selector()?;
                Err(HarnessError::AssertionFailure(format!(
                    "expected {target} to read {expected:?}, found {actual:?}"
                )))
            }
        }
        .await;
        self.record(action, start, &result);
        result
    }

    /// Type text into whatever has keyboard focus.
    pub async fn type_text(&mut self, text: &str) -> Result<(), HarnessError> {
        let start = Instant::now();
        let result = self
            .driver
            .type_text(&self.app, text)
            .await
            .map_err(HarnessError::from);
        self.record(ActionType::TypeText { text: text.to_string() }, start, &result);
        result
    }

    /// Send a key combination such as `<Control>w`.
    pub async fn key_combo(&mut self, combo: &str) -> Result<(), HarnessError> {
        let start = Instant::now();
        let result = self
            .driver
            .key_combo(&self.app, combo)
            .await
            .map_err(HarnessError::from);
        self.record(ActionType::KeyCombo { combo: combo.to_string() }, start, &result);
        result
    }

    /// Wait for a widget in the focused window to disappear.
    pub async fn wait_for_not(&mut self, name: &str, role: &str) -> Result<(), HarnessError> {
        let action = ActionType::WaitForNot {
            name: name.to_string(),
            role: Some(role.to_string()),
        };
        let locator = self.locator(Selector::new(name, role));
        let start = Instant::now();
        let result = self.wait_until_gone(&locator).await;
        self.record(action, start, &result);
        result
    }

    /// Wait for a toplevel window to disappear, regardless of focus.
    pub async fn wait_for_window_closed(&mut self, window: Window) -> Result<(), HarnessError> {
        let action = ActionType::WaitForNot {
            name: window.name.clone(),
            role: Some(window.kind.role().to_string()),
        };
        let start = Instant::now();
        let result = self.wait_until_gone(&Locator::anywhere(window.selector())).await;
        if result.is_ok() && self.window.as_ref() == Some(&window) {
            self.window = None;
            self.widget = None;
        }
        self.record(action, start, &result);
        result
    }
}
