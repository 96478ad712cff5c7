//! Accessibility driver trait for backend-agnostic UI automation.
//!
//! This module defines the [`AccessibilityDriver`] trait, the seam between the
//! harness and the external accessibility automation engine. The harness only
//! ever asks for four things: a snapshot of an application's tree, an action
//! against a widget located by `(name, role)`, keyboard input, and a screen
//! capture. Everything else (polling, focus tracking, assertions) is built on
//! top in [`procedural`](crate::procedural).
//!
//! # Locating widgets
//!
//! A widget is addressed by a [`Locator`]: an optional focused [`Window`] plus
//! a [`Selector`]. Names support `*` and `?` glob wildcards; roles match
//! exactly.
//!
//! ```
//! use docprobe_core::driver::{Locator, Selector, Window};
//!
//! let locator = Locator::within(
//!     Window::frame("test-links.pdf"),
//!     Selector::new("Close", "menu item"),
//! );
//! assert_eq!(locator.selector.name, "Close");
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::{roles, AccessibleNode};

/// Errors that can occur during accessibility driver operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The engine reported that an operation failed.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The driver has not been connected yet.
    #[error("Not connected to accessibility backend")]
    NotConnected,

    /// The bridge process went away or closed its pipes.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The target widget does not exist in the current tree.
    #[error("No widget matching {0}")]
    NoSuchWidget(Locator),

    /// An operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend sent a message that could not be decoded.
    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),
}

/// Identifies a widget by accessible name and, optionally, role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    /// Accessible name; may contain `*`/`?` wildcards.
    pub name: String,
    /// Role name to filter by; `None` matches any role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Selector {
    /// Creates a selector matching both name and role.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: Some(role.into()),
        }
    }

    /// Creates a selector matching on name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
        }
    }

    /// Returns true if the node satisfies this selector.
    pub fn matches(&self, node: &AccessibleNode) -> bool {
        let name_matches = node
            .name
            .as_deref()
            .map_or(false, |n| name_matches(&self.name, n));
        let role_matches = match &self.role {
            Some(role) => node.is_role(role),
            None => true,
        };
        name_matches && role_matches
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "'{}' (role '{}')", self.name, role),
            None => write!(f, "'{}'", self.name),
        }
    }
}

/// The kind of toplevel window that can hold focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Frame,
    Dialog,
}

impl WindowKind {
    /// The role name used to find windows of this kind.
    pub fn role(self) -> &'static str {
        match self {
            WindowKind::Frame => roles::FRAME,
            WindowKind::Dialog => roles::DIALOG,
        }
    }
}

/// A toplevel window, identified by kind and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub kind: WindowKind,
    pub name: String,
}

impl Window {
    pub fn frame(name: impl Into<String>) -> Self {
        Self {
            kind: WindowKind::Frame,
            name: name.into(),
        }
    }

    pub fn dialog(name: impl Into<String>) -> Self {
        Self {
            kind: WindowKind::Dialog,
            name: name.into(),
        }
    }

    /// Selector that finds this window in an application tree.
    pub fn selector(&self) -> Selector {
        Selector::new(self.name.clone(), self.kind.role())
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind.role(), self.name)
    }
}

/// A widget address: a selector, optionally scoped to a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// Restricts the search to this window's subtree when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Window>,
    pub selector: Selector,
}

impl Locator {
    /// A locator searching the whole application.
    pub fn anywhere(selector: Selector) -> Self {
        Self {
            window: None,
            selector,
        }
    }

    /// A locator searching inside `window`.
    pub fn within(window: Window, selector: Selector) -> Self {
        Self {
            window: Some(window),
            selector,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.window {
            Some(window) => write!(f, "{} in {}", self.selector, window),
            None => write!(f, "{}", self.selector),
        }
    }
}

/// Returns true if the pattern contains glob wildcard characters (`*` or `?`).
fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Matches an accessible name against a selector name.
///
/// `*` and `?` are wildcards; every other character, brackets included,
/// matches itself. Without wildcards the comparison is exact.
fn name_matches(pattern: &str, name: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == name;
    }

    let mut escaped = String::with_capacity(pattern.len());
    let mut prev = None;
    for c in pattern.chars() {
        match c {
            '[' => escaped.push_str("[[]"),
            ']' => escaped.push_str("[]]"),
            // `**` is a path wildcard to glob
            '*' if prev == Some('*') => {}
            c => escaped.push(c),
        }
        prev = Some(c);
    }
    glob::Pattern::new(&escaped).map_or(false, |p| p.matches(name))
}

/// Depth-first, pre-order search for the first node matching `selector`.
pub fn search<'a>(nodes: &'a [AccessibleNode], selector: &Selector) -> Option<&'a AccessibleNode> {
    for node in nodes {
        if selector.matches(node) {
            return Some(node);
        }
        if let Some(found) = search(&node.children, selector) {
            return Some(found);
        }
    }
    None
}

/// Resolves a [`Locator`] against an application tree.
///
/// With a window, the window is located first and only its descendants are
/// searched. Returns `None` if either the window or the widget is missing.
pub fn locate<'a>(tree: &'a [AccessibleNode], locator: &Locator) -> Option<&'a AccessibleNode> {
    match &locator.window {
        Some(window) => {
            let window_node = search(tree, &window.selector())?;
            search(&window_node.children, &locator.selector)
        }
        None => search(tree, &locator.selector),
    }
}

/// Trait for the external accessibility automation engine.
///
/// Implementors provide tree snapshots and synthetic input for a named
/// application. The provided lookup methods fetch the full tree via
/// [`dump_tree`](AccessibilityDriver::dump_tree) and search locally.
///
/// All calls are single-shot: polling and timeouts belong to the caller.
#[async_trait]
pub trait AccessibilityDriver: Send + Sync {
    /// Establish the connection to the automation backend.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Check if the backend is ready to accept commands.
    fn is_connected(&self) -> bool;

    /// Snapshot the accessibility tree of `app`.
    ///
    /// Returns the application's toplevel windows. An application that is not
    /// (yet) registered with the accessibility bus yields an empty list.
    async fn dump_tree(&self, app: &str) -> Result<Vec<AccessibleNode>, DriverError>;

    /// Click the widget at `locator`.
    async fn click(&self, app: &str, locator: &Locator) -> Result<(), DriverError>;

    /// Invoke the default action of the widget at `locator` (Enter on an entry).
    async fn activate(&self, app: &str, locator: &Locator) -> Result<(), DriverError>;

    /// Replace the text contents of the widget at `locator`.
    async fn set_text(&self, app: &str, locator: &Locator, text: &str) -> Result<(), DriverError>;

    /// Type text into whatever currently has keyboard focus in `app`.
    async fn type_text(&self, app: &str, text: &str) -> Result<(), DriverError>;

    /// Send a key combination such as `<Control>w`.
    async fn key_combo(&self, app: &str, combo: &str) -> Result<(), DriverError>;

    /// Capture the screen as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Find the widget at `locator`, if present.
    async fn find(&self, app: &str, locator: &Locator) -> Result<Option<AccessibleNode>, DriverError> {
        let tree = self.dump_tree(app).await?;
        Ok(locate(&tree, locator).cloned())
    }

    /// Read the text contents of the widget at `locator`.
    ///
    /// Returns [`DriverError::NoSuchWidget`] if it is missing.
    async fn get_text(&self, app: &str, locator: &Locator) -> Result<Option<String>, DriverError> {
        match self.find(app, locator).await? {
            Some(node) => Ok(node.text),
            None => Err(DriverError::NoSuchWidget(locator.clone())),
        }
    }
}
