//! Action types and the action trail.
//!
//! Every step a scenario performs through the [`Procedure`](crate::procedural::Procedure)
//! API is recorded as an [`ActionLog`]. When a scenario fails, the trail is
//! written next to the other diagnostics so the last successful step and the
//! failing one are visible without re-running.
//!
//! # Example
//!
//! ```
//! use docprobe_core::action::{ActionLog, ActionResult, ActionType};
//!
//! let log = ActionLog::new(
//!     ActionType::Click { name: "File".to_string(), role: Some("menu".to_string()) },
//!     ActionResult::Success,
//!     Some(12),
//! );
//! println!("{} at {}", log.action.name(), log.timestamp);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The result of executing an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Failure(String),
}

/// Actions a scenario can perform.
///
/// Serialized with a `type` tag, one per line in `actions.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Launch the application, optionally with a document.
    Launch { app: String, file: Option<String> },

    /// Click a widget by name and role.
    Click { name: String, role: Option<String> },

    /// Move focus to a toplevel frame.
    FocusFrame { name: String },

    /// Move focus to a dialog.
    FocusDialog { name: String },

    /// Move focus to a widget inside the focused window.
    FocusWidget { name: String },

    /// Replace the focused widget's text.
    SetText { text: String },

    /// Invoke the focused widget's default action.
    Activate,

    /// Type into whatever has keyboard focus.
    TypeText { text: String },

    /// Send a key combination.
    KeyCombo { combo: String },

    /// Wait for a widget to disappear.
    WaitForNot { name: String, role: Option<String> },

    /// Compare the focused widget's text.
    AssertText { expected: String },
}

impl ActionType {
    /// Returns a short, static name for this action type suitable for use in
    /// tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Launch { .. } => "launch",
            ActionType::Click { .. } => "click",
            ActionType::FocusFrame { .. } => "focus_frame",
            ActionType::FocusDialog { .. } => "focus_dialog",
            ActionType::FocusWidget { .. } => "focus_widget",
            ActionType::SetText { .. } => "set_text",
            ActionType::Activate => "activate",
            ActionType::TypeText { .. } => "type_text",
            ActionType::KeyCombo { .. } => "key_combo",
            ActionType::WaitForNot { .. } => "wait_for_not",
            ActionType::AssertText { .. } => "assert_text",
        }
    }
}

/// A logged action with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: ActionType,
    pub result: ActionResult,

    /// How long the action took, including any waiting for the widget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActionLog {
    /// Creates a new entry with a fresh UUID and the current time.
    pub fn new(action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            result,
            duration_ms,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.result, ActionResult::Failure(_))
    }
}

/// Ordered record of the actions performed in one run.
#[derive(Debug, Clone, Default)]
pub struct ActionTrail {
    entries: Vec<ActionLog>,
}

impl ActionTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ActionLog) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ActionLog] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent failed action, if any.
    pub fn last_failure(&self) -> Option<&ActionLog> {
        self.entries.iter().rev().find(|e| e.is_failure())
    }

    /// Renders the trail as JSON lines.
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}
