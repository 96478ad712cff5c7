//! # docprobe-core
//!
//! Core library for accessibility-driven UI tests of GNOME/MATE document
//! viewers (Atril, Xreader, Evince).
//!
//! The harness launches the viewer with a fixture document, waits for its
//! main frame on the accessibility bus, and drives it through a flat,
//! focus-tracking procedural API. Any failure is turned into diagnostics
//! (error, tree dump, screenshot, action trail) and a non-zero exit.
//!
//! ## Modules
//!
//! - [`config`] - Harness settings from `~/.docprobe/config.json` and the environment
//! - [`element`] - Accessible tree nodes and tree rendering
//! - [`driver`] - The [`AccessibilityDriver`](driver::AccessibilityDriver) seam and widget lookup
//! - [`protocol`] - JSON-lines messages exchanged with the bridge agent
//! - [`bridge`] - Driver implementation backed by an external bridge process
//! - [`launcher`] - Application launch and main-frame wait
//! - [`procedural`] - The scripting API scenarios are written against
//! - [`action`] - Action records and the per-run trail
//! - [`harness`] - The `Scenario` trait and run state machine
//! - [`reporter`] - Failure diagnostics and process exit
//! - [`error`] - The harness error taxonomy and exit codes
//!
//! ## External Dependencies
//!
//! A bridge agent exposing the AT-SPI registry must be on `PATH` (default
//! `docprobe-a11y-bridge`), and the session must have accessibility enabled.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docprobe_core::bridge::BridgeDriver;
//! use docprobe_core::config::HarnessConfig;
//! use docprobe_core::driver::AccessibilityDriver;
//! use docprobe_core::launcher::run_app;
//! use docprobe_core::procedural::Procedure;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HarnessConfig::load();
//! let mut driver = BridgeDriver::new(config.bridge_command.clone());
//! driver.connect().await?;
//! let driver: Arc<dyn AccessibilityDriver> = Arc::new(driver);
//!
//! let _app = run_app(&config, driver.as_ref(), Some("test-links.pdf")).await?;
//! let mut p = Procedure::new(driver, config.app_name(), &config);
//! p.focus_frame("test-links.pdf").await?;
//! p.click("File", "menu").await?;
//! p.click("Close", "menu item").await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod bridge;
pub mod config;
pub mod driver;
pub mod element;
pub mod error;
pub mod harness;
pub mod launcher;
pub mod procedural;
pub mod protocol;
pub mod reporter;
