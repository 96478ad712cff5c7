//! In-memory stand-in for the document viewer, used by the scenario tests.
//!
//! The tree is rebuilt from [`ViewerState`] on every dump, and widget
//! actions update the state the way the real viewer reacts to them.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use docprobe_core::config::HarnessConfig;
use docprobe_core::driver::{locate, AccessibilityDriver, DriverError, Locator, WindowKind};
use docprobe_core::element::{roles, AccessibleNode};
use docprobe_core::procedural::Procedure;

use super::{about_title, ENCRYPTED_PASSWORD, ENCRYPTED_PDF, LINKS_PDF, RECENT_DOCUMENTS};

const PAGE_COUNT: u32 = 3;
const PASSWORD_DIALOG: &str = "Enter password";
const OPEN_DIALOG: &str = "Open Document";

#[derive(Debug, Clone, Default)]
pub(crate) struct ViewerState {
    pub app: String,
    pub document: Option<String>,
    pub locked: bool,
    pub dialog: Option<String>,
    pub selected_file: Option<String>,
    pub preferences: bool,
    pub find_bar: bool,
    pub help_open: bool,
    pub license_shown: bool,
    pub typed: String,
    pub failed_unlocks: u32,
    pub page: u32,
    pub page_label: String,
    pub zoom: i32,
    pub reloads: u32,
    pub bookmarks: Vec<String>,
    pub closed: bool,
    pub clicks: Vec<String>,
}

pub(crate) struct FakeViewer {
    state: Mutex<ViewerState>,
    normalize_labels: bool,
    any_password: bool,
    keep_password_dialog: bool,
    drop_on_reload: bool,
    missing_dialog: Option<String>,
}

fn item(name: &str) -> AccessibleNode {
    AccessibleNode::new(name, roles::MENU_ITEM)
}

fn button(name: &str) -> AccessibleNode {
    AccessibleNode::new(name, roles::PUSH_BUTTON)
}

fn menu(name: &str, items: &[&str]) -> AccessibleNode {
    items
        .iter()
        .fold(AccessibleNode::new(name, roles::MENU), |m, i| m.with_child(item(i)))
}

impl FakeViewer {
    /// Viewer state right after launching `app` with `file`.
    pub fn launched(app: &str, file: Option<&str>) -> Self {
        let locked = file == Some(ENCRYPTED_PDF);
        let state = ViewerState {
            app: app.to_string(),
            document: file.map(String::from),
            locked,
            dialog: locked.then(|| PASSWORD_DIALOG.to_string()),
            page: 1,
            page_label: "1".to_string(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            normalize_labels: true,
            any_password: false,
            keep_password_dialog: false,
            drop_on_reload: false,
            missing_dialog: None,
        }
    }

    /// Leave the page label as typed instead of showing the canonical label.
    pub fn without_label_normalization(mut self) -> Self {
        self.normalize_labels = false;
        self
    }

    pub fn accepting_any_password(mut self) -> Self {
        self.any_password = true;
        self
    }

    /// Unlock the document but leave the password dialog on screen.
    pub fn keeping_password_dialog(mut self) -> Self {
        self.keep_password_dialog = true;
        self
    }

    /// Reload closes the document, leaving the empty viewer window.
    pub fn dropping_document_on_reload(mut self) -> Self {
        self.drop_on_reload = true;
        self
    }

    /// Never show the dialog with this title.
    pub fn without_dialog(mut self, title: &str) -> Self {
        self.missing_dialog = Some(title.to_string());
        self
    }

    pub fn procedure(self: &Arc<Self>) -> Procedure {
        let config = HarnessConfig {
            search_attempts: 2,
            search_backoff_ms: 1,
            ..Default::default()
        };
        let app = self.lock().app.clone();
        Procedure::new(self.clone(), app, &config)
    }

    pub fn state(&self) -> ViewerState {
        self.lock().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ViewerState> {
        self.state.lock().unwrap()
    }

    fn frame_title(state: &ViewerState) -> String {
        match state.document.as_deref() {
            None => RECENT_DOCUMENTS.to_string(),
            Some(doc) if state.locked => format!("{doc} — Password Required"),
            Some(doc) if doc == ENCRYPTED_PDF => format!("{doc} — Dokument1"),
            Some(doc) => doc.to_string(),
        }
    }

    fn tree(state: &ViewerState) -> Vec<AccessibleNode> {
        if state.closed {
            return Vec::new();
        }

        let bookmarks: Vec<&str> = std::iter::once("Add Bookmark")
            .chain(state.bookmarks.iter().map(String::as_str))
            .collect();
        let mut frame = AccessibleNode::new(Self::frame_title(state), roles::FRAME)
            .with_child(menu(
                "File",
                &["Open…", "Save a Copy…", "Print…", "Properties", "Close", "Close All Windows"],
            ))
            .with_child(menu(
                "Edit",
                &[
                    "Select All",
                    "Find…",
                    "Find Next",
                    "Find Previous",
                    "Rotate Left",
                    "Rotate Right",
                    "Save Current Settings as Default",
                    "Preferences",
                ],
            ))
            .with_child(menu("View", &["Zoom In", "Zoom Out", "Reload"]))
            .with_child(menu("Go", &["Next Page", "Previous Page", "First Page", "Last Page"]))
            .with_child(menu("Bookmarks", &bookmarks))
            .with_child(menu("Help", &["Contents", "About"]))
            .with_child(AccessibleNode::new("page-label-entry", roles::TEXT).with_text(state.page_label.clone()));
        if state.find_bar {
            frame = frame.with_child(button("Find Previous"));
        }
        if state.locked {
            frame = frame.with_child(button("Unlock Document"));
        }

        let mut windows = vec![frame];
        if state.preferences {
            windows.push(AccessibleNode::new("Preferences", roles::FRAME).with_child(button("Close")));
        }
        if state.help_open {
            windows.push(AccessibleNode::new("Help", roles::FRAME));
        }
        if let Some(title) = &state.dialog {
            windows.push(Self::dialog(state, title));
        }
        windows
    }

    fn dialog(state: &ViewerState, title: &str) -> AccessibleNode {
        let dialog = AccessibleNode::new(title, roles::DIALOG);
        match title {
            PASSWORD_DIALOG => dialog
                .with_child(AccessibleNode::new("", roles::TEXT).with_text(state.typed.clone()))
                .with_child(button("Cancel"))
                .with_child(button("Unlock Document")),
            OPEN_DIALOG => dialog
                .with_child(AccessibleNode::new(LINKS_PDF, roles::TABLE_CELL))
                .with_child(button("Cancel"))
                .with_child(button("Open")),
            "Properties" => dialog
                .with_child(AccessibleNode::new("General", roles::PAGE_TAB))
                .with_child(AccessibleNode::new("Fonts", roles::PAGE_TAB))
                .with_child(button("Close")),
            t if t.starts_with("About") => dialog
                .with_child(AccessibleNode::new("License", roles::TOGGLE_BUTTON))
                .with_child(button("Close")),
            _ => dialog.with_child(button("Cancel")),
        }
    }

    fn show_dialog(&self, state: &mut ViewerState, title: &str) {
        if self.missing_dialog.as_deref() != Some(title) {
            state.dialog = Some(title.to_string());
        }
    }

    fn on_click(&self, state: &mut ViewerState, locator: &Locator) {
        let in_dialog = locator
            .window
            .as_ref()
            .is_some_and(|w| w.kind == WindowKind::Dialog);
        let name = locator.selector.name.as_str();
        let role = locator.selector.role.as_deref().unwrap_or_default();

        match (name, role) {
            ("Open…", roles::MENU_ITEM) => self.show_dialog(state, OPEN_DIALOG),
            ("Save a Copy…", roles::MENU_ITEM) => self.show_dialog(state, "Save a Copy"),
            ("Print…", roles::MENU_ITEM) => self.show_dialog(state, "Print"),
            ("Properties", roles::MENU_ITEM) => self.show_dialog(state, "Properties"),
            ("About", roles::MENU_ITEM) => {
                let title = about_title(&state.app);
                self.show_dialog(state, &title);
            }
            (_, roles::TABLE_CELL) => state.selected_file = Some(name.to_string()),
            ("Open", roles::PUSH_BUTTON) => {
                state.document = state.selected_file.take();
                state.dialog = None;
            }
            ("Cancel", roles::PUSH_BUTTON) => state.dialog = None,
            ("Close", roles::PUSH_BUTTON) => {
                if state.dialog.is_some() {
                    state.dialog = None;
                } else {
                    state.preferences = false;
                }
            }
            ("Unlock Document", roles::PUSH_BUTTON) => {
                // The frame's button reopens the dialog; the dialog's submits.
                if in_dialog {
                    if self.any_password || state.typed == ENCRYPTED_PASSWORD {
                        state.locked = false;
                        if !self.keep_password_dialog {
                            state.dialog = None;
                        }
                    } else {
                        state.failed_unlocks += 1;
                    }
                } else {
                    state.dialog = Some(PASSWORD_DIALOG.to_string());
                }
                state.typed.clear();
            }
            ("License", roles::TOGGLE_BUTTON) => state.license_shown = !state.license_shown,
            ("Close", roles::MENU_ITEM) | ("Close All Windows", roles::MENU_ITEM) => state.closed = true,
            ("Reload", roles::MENU_ITEM) => {
                state.reloads += 1;
                if self.drop_on_reload {
                    state.document = None;
                }
            }
            ("Zoom In", roles::MENU_ITEM) => state.zoom += 1,
            ("Zoom Out", roles::MENU_ITEM) => state.zoom -= 1,
            ("Next Page", roles::MENU_ITEM) => state.page = (state.page + 1).min(PAGE_COUNT),
            ("Previous Page", roles::MENU_ITEM) => state.page = state.page.saturating_sub(1).max(1),
            ("First Page", roles::MENU_ITEM) => state.page = 1,
            ("Last Page", roles::MENU_ITEM) => state.page = PAGE_COUNT,
            ("Add Bookmark", roles::MENU_ITEM) => {
                let mark = format!("Page {}", state.page);
                state.bookmarks.push(mark);
            }
            ("Find…", roles::MENU_ITEM) => state.find_bar = true,
            ("Preferences", roles::MENU_ITEM) => state.preferences = true,
            ("Contents", roles::MENU_ITEM) => state.help_open = true,
            _ => {}
        }
    }

    fn require(state: &ViewerState, locator: &Locator) -> Result<(), DriverError> {
        match locate(&Self::tree(state), locator) {
            Some(_) => Ok(()),
            None => Err(DriverError::NoSuchWidget(locator.clone())),
        }
    }
}

#[async_trait]
impl AccessibilityDriver for FakeViewer {
    async fn connect(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn dump_tree(&self, _app: &str) -> Result<Vec<AccessibleNode>, DriverError> {
        Ok(Self::tree(&self.lock()))
    }

    async fn click(&self, _app: &str, locator: &Locator) -> Result<(), DriverError> {
        let mut state = self.lock();
        Self::require(&state, locator)?;
        state.clicks.push(locator.selector.name.clone());
        self.on_click(&mut state, locator);
        Ok(())
    }

    async fn activate(&self, _app: &str, locator: &Locator) -> Result<(), DriverError> {
        let mut state = self.lock();
        Self::require(&state, locator)?;
        if locator.selector.name == "page-label-entry" && self.normalize_labels {
            state.page_label = state.page_label.to_uppercase();
        }
        Ok(())
    }

    async fn set_text(&self, _app: &str, locator: &Locator, text: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        Self::require(&state, locator)?;
        if locator.selector.name == "page-label-entry" {
            state.page_label = text.to_string();
        }
        Ok(())
    }

    async fn type_text(&self, _app: &str, text: &str) -> Result<(), DriverError> {
        self.lock().typed.push_str(text);
        Ok(())
    }

    async fn key_combo(&self, _app: &str, combo: &str) -> Result<(), DriverError> {
        let mut state = self.lock();
        if combo == "<Control>w" {
            if state.help_open {
                state.help_open = false;
            } else {
                state.closed = true;
            }
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::CommandFailed("no display".to_string()))
    }
}
