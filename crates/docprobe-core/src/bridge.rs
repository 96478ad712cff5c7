//! [`AccessibilityDriver`] implementation backed by a bridge agent process.
//!
//! [`BridgeDriver`] spawns the configured bridge command with piped stdio and
//! exchanges one JSON message per line using the [`protocol`](crate::protocol)
//! module. The bridge performs the actual accessibility queries and synthetic
//! input on the live desktop.
//!
//! # Example
//!
//! ```no_run
//! use docprobe_core::bridge::BridgeDriver;
//! use docprobe_core::driver::AccessibilityDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut driver = BridgeDriver::new(vec!["docprobe-a11y-bridge".to_string()]);
//! driver.connect().await?;
//! let windows = driver.dump_tree("atril").await?;
//! println!("{} toplevel windows", windows.len());
//! # Ok(())
//! # }
//! ```

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, debug_span, info, instrument, trace, warn, Instrument};

use crate::driver::{AccessibilityDriver, DriverError, Locator};
use crate::element::AccessibleNode;
use crate::protocol::{decode_response, decode_screenshot, encode_request, Request, Response};

/// Default timeout for a single request/response exchange.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Checks that the response is [`Response::Ok`].
fn expect_ok(response: Response) -> Result<(), DriverError> {
    match response {
        Response::Ok => Ok(()),
        other => Err(DriverError::CommandFailed(format!(
            "unexpected response: {other:?}"
        ))),
    }
}

/// Live pipes to a running bridge process.
struct BridgeIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// An [`AccessibilityDriver`] that talks to a bridge agent over stdio.
///
/// The process is started by [`connect`](AccessibilityDriver::connect) and
/// killed when the driver is dropped.
pub struct BridgeDriver {
    command: Vec<String>,
    read_timeout: Duration,
    io: Mutex<Option<BridgeIo>>,
}

impl BridgeDriver {
    /// Creates a driver for the given command line (program followed by arguments).
    ///
    /// Nothing is spawned until [`connect`](AccessibilityDriver::connect) is called.
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            read_timeout: READ_TIMEOUT,
            io: Mutex::new(None),
        }
    }

    /// Overrides the per-request read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Returns the configured command line.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    fn spawn(&self) -> Result<BridgeIo, DriverError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| DriverError::CommandFailed("empty bridge command".to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::ConnectionLost(format!("failed to start {program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::ConnectionLost("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::ConnectionLost("bridge stdout unavailable".to_string()))?;

        Ok(BridgeIo {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Sends one request and reads one response.
    ///
    /// [`Response::Error`] is mapped to [`DriverError::CommandFailed`]. A
    /// timeout or broken pipe drops the connection, so later requests fail
    /// with [`DriverError::NotConnected`] instead of reading a stale reply.
    async fn send(&self, request: &Request) -> Result<Response, DriverError> {
        let span = debug_span!("bridge_send", request = request.name());
        async {
            let mut guard = self.io.lock().await;
            let io = guard.as_mut().ok_or(DriverError::NotConnected)?;

            let result = exchange(io, request, self.read_timeout).await;
            if let Err(e @ (DriverError::Timeout | DriverError::ConnectionLost(_) | DriverError::Io(_))) =
                &result
            {
                warn!(error = %e, "dropping bridge connection");
                *guard = None;
            }

            match result? {
                Response::Error { message } => Err(DriverError::CommandFailed(message)),
                other => Ok(other),
            }
        }
        .instrument(span)
        .await
    }
}

/// Writes `request` and reads the matching reply line.
async fn exchange(io: &mut BridgeIo, request: &Request, read_timeout: Duration) -> Result<Response, DriverError> {
    let line = encode_request(request)?;
    trace!(bytes = line.len(), "writing request");
    if let Err(e) = write_line(&mut io.stdin, &line).await {
        return Err(DriverError::ConnectionLost(e.to_string()));
    }

    let mut reply = String::new();
    let n = timeout(read_timeout, io.stdout.read_line(&mut reply))
        .await
        .map_err(|_| DriverError::Timeout)??;
    if n == 0 {
        let status = io.child.try_wait().ok().flatten();
        return Err(DriverError::ConnectionLost(match status {
            Some(status) => format!("bridge exited with {status}"),
            None => "bridge closed its output".to_string(),
        }));
    }

    Ok(decode_response(&reply)?)
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await
}

#[async_trait]
impl AccessibilityDriver for BridgeDriver {
    #[instrument(skip(self), level = "debug")]
    async fn connect(&mut self) -> Result<(), DriverError> {
        let io = self.spawn()?;
        *self.io.lock().await = Some(io);
        expect_ok(self.send(&Request::Ping).await?)?;
        info!(command = ?self.command, "bridge connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.io.try_lock().map(|g| g.is_some()).unwrap_or(false)
    }

    async fn dump_tree(&self, app: &str) -> Result<Vec<AccessibleNode>, DriverError> {
        let response = self
            .send(&Request::DumpTree {
                app: app.to_string(),
            })
            .await?;
        match response {
            Response::Tree { nodes } => {
                debug!(windows = nodes.len(), "tree received");
                Ok(nodes)
            }
            other => Err(DriverError::CommandFailed(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn click(&self, app: &str, locator: &Locator) -> Result<(), DriverError> {
        let response = self
            .send(&Request::Click {
                app: app.to_string(),
                locator: locator.clone(),
            })
            .await?;
        expect_ok(response)
    }

    #[instrument(skip(self), level = "debug")]
    async fn activate(&self, app: &str, locator: &Locator) -> Result<(), DriverError> {
        let response = self
            .send(&Request::Activate {
                app: app.to_string(),
                locator: locator.clone(),
            })
            .await?;
        expect_ok(response)
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_text(&self, app: &str, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let response = self
            .send(&Request::SetText {
                app: app.to_string(),
                locator: locator.clone(),
                text: text.to_string(),
            })
            .await?;
        expect_ok(response)
    }

    #[instrument(skip(self, text), level = "debug")]
    async fn type_text(&self, app: &str, text: &str) -> Result<(), DriverError> {
        let response = self
            .send(&Request::TypeText {
                app: app.to_string(),
                text: text.to_string(),
            })
            .await?;
        expect_ok(response)
    }

    #[instrument(skip(self), level = "debug")]
    async fn key_combo(&self, app: &str, combo: &str) -> Result<(), DriverError> {
        let response = self
            .send(&Request::KeyCombo {
                app: app.to_string(),
                combo: combo.to_string(),
            })
            .await?;
        expect_ok(response)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        match self.send(&Request::Screenshot).await? {
            Response::Screenshot { data } => Ok(decode_screenshot(&data)?),
            other => Err(DriverError::CommandFailed(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }
}
