//! Shared test helpers for docprobe-core integration tests.
//!
//! Provides an in-process [`MockDriver`] holding a mutable accessibility tree,
//! with optional per-widget click hooks that rewrite the tree the way a real
//! viewer would react.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use docprobe_core::config::HarnessConfig;
use docprobe_core::driver::{locate, AccessibilityDriver, DriverError, Locator};
use docprobe_core::element::{roles, AccessibleNode};

type Hook = Box<dyn Fn(&mut Vec<AccessibleNode>) + Send + Sync>;

// ---------------------------------------------------------------------------
// Tree builders
// ---------------------------------------------------------------------------

pub fn frame(title: &str) -> AccessibleNode {
    AccessibleNode::new(title, roles::FRAME)
}

#[allow(dead_code)]
pub fn dialog(title: &str) -> AccessibleNode {
    AccessibleNode::new(title, roles::DIALOG)
}

pub fn menu(name: &str, items: &[&str]) -> AccessibleNode {
    items.iter().fold(AccessibleNode::new(name, roles::MENU), |m, item| {
        m.with_child(AccessibleNode::new(*item, roles::MENU_ITEM))
    })
}

/// A viewer window with a File menu and a page-label entry.
pub fn viewer_frame(title: &str) -> AccessibleNode {
    frame(title)
        .with_child(menu("File", &["Open…", "Reload", "Close"]))
        .with_child(AccessibleNode::new("page-label-entry", roles::TEXT).with_text("1"))
}

/// Config with millisecond timings so failing lookups finish quickly.
pub fn fast_config() -> HarnessConfig {
    HarnessConfig {
        search_attempts: 3,
        search_backoff_ms: 1,
        poll_interval_ms: 5,
        launch_timeout_ms: 2_000,
        capture_screenshot: true,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Mock driver
// ---------------------------------------------------------------------------

/// In-memory [`AccessibilityDriver`].
pub struct MockDriver {
    tree: Mutex<Vec<AccessibleNode>>,
    hooks: Mutex<HashMap<String, Hook>>,
    calls: Mutex<Vec<String>>,
    last_locator: Mutex<Option<Locator>>,
    connected: AtomicBool,
    screenshot: Option<Vec<u8>>,
}

impl MockDriver {
    pub fn new(tree: Vec<AccessibleNode>) -> Self {
        Self {
            tree: Mutex::new(tree),
            hooks: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            last_locator: Mutex::new(None),
            connected: AtomicBool::new(true),
            screenshot: Some(vec![0x89, b'P', b'N', b'G']),
        }
    }

    #[allow(dead_code)]
    pub fn disconnected(tree: Vec<AccessibleNode>) -> Self {
        let driver = Self::new(tree);
        driver.connected.store(false, Ordering::SeqCst);
        driver
    }

    #[allow(dead_code)]
    pub fn without_screenshot(mut self) -> Self {
        self.screenshot = None;
        self
    }

    /// Run `hook` against the tree whenever a widget named `name` is clicked.
    #[allow(dead_code)]
    pub fn on_click<F>(self, name: &str, hook: F) -> Self
    where
        F: Fn(&mut Vec<AccessibleNode>) + Send + Sync + 'static,
    {
        self.hooks.lock().unwrap().insert(name.to_string(), Box::new(hook));
        self
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Locator of the most recent widget action.
    #[allow(dead_code)]
    pub fn last_locator(&self) -> Option<Locator> {
        self.last_locator.lock().unwrap().clone()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn require(&self, locator: &Locator) -> Result<(), DriverError> {
        *self.last_locator.lock().unwrap() = Some(locator.clone());
        let tree = self.tree.lock().unwrap();
        match locate(&tree, locator) {
            Some(_) => Ok(()),
            None => Err(DriverError::NoSuchWidget(locator.clone())),
        }
    }
}

fn node_mut<'a>(nodes: &'a mut [AccessibleNode], name: &str) -> Option<&'a mut AccessibleNode> {
    for node in nodes {
        if node.name.as_deref() == Some(name) {
            return Some(node);
        }
        if let Some(found) = node_mut(&mut node.children, name) {
            return Some(found);
        }
    }
    None
}

#[async_trait]
impl AccessibilityDriver for MockDriver {
    async fn connect(&mut self) -> Result<(), DriverError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn dump_tree(&self, _app: &str) -> Result<Vec<AccessibleNode>, DriverError> {
        if !self.is_connected() {
            return Err(DriverError::NotConnected);
        }
        Ok(self.tree.lock().unwrap().clone())
    }

    async fn click(&self, _app: &str, locator: &Locator) -> Result<(), DriverError> {
        self.require(locator)?;
        self.log(format!("click {}", locator.selector.name));
        if let Some(hook) = self.hooks.lock().unwrap().get(&locator.selector.name) {
            hook(&mut self.tree.lock().unwrap());
        }
        Ok(())
    }

    async fn activate(&self, _app: &str, locator: &Locator) -> Result<(), DriverError> {
        self.require(locator)?;
        self.log(format!("activate {}", locator.selector.name));
        Ok(())
    }

    async fn set_text(&self, _app: &str, locator: &Locator, text: &str) -> Result<(), DriverError> {
        self.require(locator)?;
        self.log(format!("set_text {} {text}", locator.selector.name));
        let mut tree = self.tree.lock().unwrap();
        if let Some(node) = node_mut(&mut tree, &locator.selector.name) {
            node.text = Some(text.to_string());
        }
        Ok(())
    }

    async fn type_text(&self, _app: &str, text: &str) -> Result<(), DriverError> {
        self.log(format!("type {text}"));
        Ok(())
    }

    async fn key_combo(&self, _app: &str, combo: &str) -> Result<(), DriverError> {
        self.log(format!("key {combo}"));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.screenshot
            .clone()
            .ok_or_else(|| DriverError::CommandFailed("no display".to_string()))
    }
}
