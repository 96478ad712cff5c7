//! Accessibility tree node types.
//!
//! This module defines the data structures representing widgets in the
//! accessibility tree of the application under test. Nodes are produced by an
//! [`AccessibilityDriver`](crate::driver::AccessibilityDriver) backend, live for
//! the duration of one lookup, and are never mutated by the harness.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Role names as reported by the accessibility bridge.
///
/// These are the lowercase, space-separated role names the scenarios match on.
pub mod roles {
    pub const APPLICATION: &str = "application";
    pub const FRAME: &str = "frame";
    pub const DIALOG: &str = "dialog";
    pub const MENU: &str = "menu";
    pub const MENU_ITEM: &str = "menu item";
    pub const PUSH_BUTTON: &str = "push button";
    pub const TOGGLE_BUTTON: &str = "toggle button";
    pub const TABLE_CELL: &str = "table cell";
    pub const PAGE_TAB: &str = "page tab";
    pub const TEXT: &str = "text";
}

/// A single widget from the accessibility tree.
///
/// Nodes form a tree via the `children` field. Only `name` and `role` take
/// part in lookups; the remaining fields are carried for assertions and
/// diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessibleNode {
    /// The accessible name, typically the visible label or window title.
    #[serde(default)]
    pub name: Option<String>,

    /// The role name (e.g. `"menu item"`, `"push button"`).
    #[serde(default)]
    pub role: Option<String>,

    /// Text contents for text-bearing widgets such as entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// The accessible description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// State names currently set on the widget (e.g. `"showing"`, `"focused"`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<String>,

    /// Child widgets.
    #[serde(default)]
    pub children: Vec<AccessibleNode>,
}

impl AccessibleNode {
    /// Creates a node with a name and role and no children.
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            role: Some(role.into()),
            ..Default::default()
        }
    }

    /// Adds a child node.
    pub fn with_child(mut self, child: AccessibleNode) -> Self {
        self.children.push(child);
        self
    }

    /// Sets the text contents.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Returns true if this node has the given role.
    pub fn is_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// Renders a tree as an indented `[role | name]` listing.
///
/// This is the format written to `tree.txt` by the failure reporter.
pub fn render_tree(nodes: &[AccessibleNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &AccessibleNode, depth: usize, out: &mut String) {
    let role = node.role.as_deref().unwrap_or("unknown");
    let name = node.name.as_deref().unwrap_or("");
    let _ = write!(out, "{:indent$}[{} | {}]", "", role, name, indent = depth * 2);
    if let Some(text) = &node.text {
        let _ = write!(out, " text={:?}", text);
    }
    out.push('\n');
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
