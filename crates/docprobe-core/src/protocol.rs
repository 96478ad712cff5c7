//! JSON-lines wire protocol spoken with the accessibility bridge agent.
//!
//! The bridge is an external process that wraps the platform accessibility
//! library. The harness writes one [`Request`] per line to its stdin and reads
//! one [`Response`] per line from its stdout. Both are JSON objects tagged by
//! a `type` field.
//!
//! # Framing
//!
//! ```text
//! {"type":"Click","app":"atril","locator":{"selector":{"name":"File","role":"menu"}}}\n
//! {"type":"Ok"}\n
//! ```
//!
//! Screenshots travel base64-encoded inside [`Response::Screenshot`].
//!
//! # Example
//!
//! ```
//! use docprobe_core::protocol::{Request, Response, encode_request, decode_response};
//!
//! let line = encode_request(&Request::Ping).unwrap();
//! assert_eq!(line, "{\"type\":\"Ping\"}\n");
//!
//! let response = decode_response("{\"type\":\"Ok\"}").unwrap();
//! assert_eq!(response, Response::Ok);
//! ```

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::Locator;
use crate::element::AccessibleNode;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during protocol encoding or decoding.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line was empty or only whitespace.
    #[error("empty message")]
    Empty,

    /// The line was not a valid message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A screenshot payload was not valid base64.
    #[error("invalid screenshot payload: {0}")]
    InvalidScreenshot(String),
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A request sent to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Liveness check; answered with [`Response::Ok`].
    Ping,
    /// Snapshot the toplevel windows of an application.
    DumpTree { app: String },
    /// Click a widget.
    Click { app: String, locator: Locator },
    /// Invoke a widget's default action.
    Activate { app: String, locator: Locator },
    /// Replace a widget's text contents.
    SetText {
        app: String,
        locator: Locator,
        text: String,
    },
    /// Type into the focused widget.
    TypeText { app: String, text: String },
    /// Send a key combination like `<Control>w`.
    KeyCombo { app: String, combo: String },
    /// Capture the screen.
    Screenshot,
}

impl Request {
    /// Short static name for span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::DumpTree { .. } => "dump_tree",
            Request::Click { .. } => "click",
            Request::Activate { .. } => "activate",
            Request::SetText { .. } => "set_text",
            Request::TypeText { .. } => "type_text",
            Request::KeyCombo { .. } => "key_combo",
            Request::Screenshot => "screenshot",
        }
    }
}

/// A response from the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Tree { nodes: Vec<AccessibleNode> },
    /// Base64-encoded PNG.
    Screenshot { data: String },
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Encoding / decoding
// ---------------------------------------------------------------------------

/// Serializes a request as a single newline-terminated line.
pub fn encode_request(request: &Request) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(request)
        .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))?;
    line.push('\n');
    Ok(line)
}

/// Parses one response line (trailing newline optional).
pub fn decode_response(line: &str) -> Result<Response, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }
    serde_json::from_str(trimmed).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
}

/// Decodes the base64 payload of a [`Response::Screenshot`].
pub fn decode_screenshot(data: &str) -> Result<Vec<u8>, ProtocolError> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| ProtocolError::InvalidScreenshot(e.to_string()))
}
