//! Menu walks: each scenario visits every item of one menu and closes the
//! viewer.

use async_trait::async_trait;

use docprobe_core::element::roles;
use docprobe_core::error::HarnessError;
use docprobe_core::harness::Scenario;
use docprobe_core::procedural::Procedure;

use super::{about_title, close_window, menu_item, open_from_chooser, LINKS_PDF, RECENT_DOCUMENTS};

pub struct BookmarksMenu;

#[async_trait]
impl Scenario for BookmarksMenu {
    fn name(&self) -> &str {
        "bookmarks-menu"
    }

    fn description(&self) -> &str {
        "Add a bookmark and jump back to it"
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        open_from_chooser(p, LINKS_PDF).await?;
        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "Bookmarks", "Add Bookmark").await?;
        menu_item(p, "Bookmarks", "Page 1").await?;
        close_window(p).await
    }
}

pub struct EditMenu;

#[async_trait]
impl Scenario for EditMenu {
    fn name(&self) -> &str {
        "edit-menu"
    }

    fn description(&self) -> &str {
        "Select, search, rotate and open preferences from the Edit menu"
    }

    fn fixture(&self) -> Option<&str> {
        Some(LINKS_PDF)
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "Edit", "Select All").await?;
        menu_item(p, "Edit", "Find…").await?;
        p.focus_frame(LINKS_PDF).await?;
        p.type_text("link").await?;
        p.click("Find Previous", roles::PUSH_BUTTON).await?;

        for item in [
            "Find Next",
            "Find Previous",
            "Rotate Left",
            "Rotate Right",
            "Save Current Settings as Default",
            "Preferences",
        ] {
            menu_item(p, "Edit", item).await?;
        }

        p.focus_frame("Preferences").await?;
        p.click("Close", roles::PUSH_BUTTON).await?;
        p.focus_frame(LINKS_PDF).await?;
        close_window(p).await
    }
}

pub struct FileMenu;

#[async_trait]
impl Scenario for FileMenu {
    fn name(&self) -> &str {
        "file-menu"
    }

    fn description(&self) -> &str {
        "Open and dismiss every dialog in the File menu"
    }

    fn fixture(&self) -> Option<&str> {
        Some(LINKS_PDF)
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        menu_item(p, "File", "Open…").await?;
        p.click("Cancel", roles::PUSH_BUTTON).await?;

        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "File", "Save a Copy…").await?;
        p.click("Cancel", roles::PUSH_BUTTON).await?;

        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "File", "Print…").await?;
        p.focus_dialog("Print").await?;
        p.click("Cancel", roles::PUSH_BUTTON).await?;

        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "File", "Properties").await?;
        p.click("Fonts", roles::PAGE_TAB).await?;
        p.click("General", roles::PAGE_TAB).await?;
        p.focus_dialog("Properties").await?;
        p.click("Close", roles::PUSH_BUTTON).await?;

        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "File", "Close All Windows").await
    }
}

pub struct GoMenu;

#[async_trait]
impl Scenario for GoMenu {
    fn name(&self) -> &str {
        "go-menu"
    }

    fn description(&self) -> &str {
        "Page through a document with the Go menu"
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        open_from_chooser(p, LINKS_PDF).await?;
        p.focus_frame(LINKS_PDF).await?;
        for item in ["Next Page", "Previous Page", "Last Page", "First Page"] {
            menu_item(p, "Go", item).await?;
        }
        close_window(p).await
    }
}

pub struct HelpMenu;

#[async_trait]
impl Scenario for HelpMenu {
    fn name(&self) -> &str {
        "help-menu"
    }

    fn description(&self) -> &str {
        "Show the About dialog and the help contents"
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        let about = about_title(p.app());

        menu_item(p, "Help", "About").await?;
        p.focus_dialog(&about).await?;
        p.click("License", roles::TOGGLE_BUTTON).await?;
        p.click("Close", roles::PUSH_BUTTON).await?;

        p.focus_frame(RECENT_DOCUMENTS).await?;
        menu_item(p, "Help", "Contents").await?;
        p.key_combo("<Control>w").await?;

        p.focus_frame(RECENT_DOCUMENTS).await?;
        close_window(p).await
    }
}

pub struct Zoom;

#[async_trait]
impl Scenario for Zoom {
    fn name(&self) -> &str {
        "zoom"
    }

    fn description(&self) -> &str {
        "Zoom in and back out"
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        open_from_chooser(p, LINKS_PDF).await?;
        p.focus_frame(LINKS_PDF).await?;
        menu_item(p, "View", "Zoom In").await?;
        menu_item(p, "View", "Zoom Out").await?;
        close_window(p).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::scenarios::viewer::FakeViewer;

    #[tokio::test]
    async fn bookmarks_menu_lists_new_bookmark() {
        let viewer = Arc::new(FakeViewer::launched("atril", None));
        let mut p = viewer.procedure();
        BookmarksMenu.run(&mut p).await.unwrap();

        let state = viewer.state();
        assert_eq!(state.document.as_deref(), Some(LINKS_PDF));
        assert_eq!(state.bookmarks, vec!["Page 1"]);
    }

    #[tokio::test]
    async fn go_menu_ends_on_first_page() {
        let viewer = Arc::new(FakeViewer::launched("atril", None));
        let mut p = viewer.procedure();
        GoMenu.run(&mut p).await.unwrap();
        assert_eq!(viewer.state().page, 1);
    }

    #[tokio::test]
    async fn zoom_returns_to_original_level() {
        let viewer = Arc::new(FakeViewer::launched("atril", None));
        let mut p = viewer.procedure();
        Zoom.run(&mut p).await.unwrap();
        assert_eq!(viewer.state().zoom, 0);
        assert!(viewer.clicks().contains(&"Zoom In".to_string()));
    }

    #[tokio::test]
    async fn help_menu_uses_application_name() {
        let viewer = Arc::new(FakeViewer::launched("xreader", None));
        let mut p = viewer.procedure();
        HelpMenu.run(&mut p).await.unwrap();

        let state = viewer.state();
        assert!(state.license_shown);
        assert!(!state.help_open);
        assert!(state.closed);
    }

    #[tokio::test]
    async fn file_menu_fails_without_properties_dialog() {
        let viewer = Arc::new(FakeViewer::launched("atril", Some(LINKS_PDF)).without_dialog("Properties"));
        let mut p = viewer.procedure();
        let err = FileMenu.run(&mut p).await.unwrap_err();

        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Fonts"));
        assert!(!viewer.state().closed);
    }
}
