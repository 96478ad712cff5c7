//! Scenarios built around a specific fixture document.

use async_trait::async_trait;
use tracing::info;

use docprobe_core::driver::Window;
use docprobe_core::element::roles;
use docprobe_core::error::HarnessError;
use docprobe_core::harness::Scenario;
use docprobe_core::procedural::Procedure;

use super::{
    close_window, menu_item, ENCRYPTED_PASSWORD, ENCRYPTED_PDF, LINKS_PDF, MIME_BIN,
    PAGE_LABELS_PDF,
};

/// Number of View → Reload round trips in [`Reload`].
pub const RELOAD_COUNT: usize = 5;

/// Typing a lowercase roman page label jumps to that page and displays the
/// document's canonical label.
pub struct FileReloading;

#[async_trait]
impl Scenario for FileReloading {
    fn name(&self) -> &str {
        "file-reloading"
    }

    fn description(&self) -> &str {
        "Page label entry normalizes 'iii' to 'III'"
    }

    fn fixture(&self) -> Option<&str> {
        Some(PAGE_LABELS_PDF)
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        p.focus_widget("page-label-entry").await?;
        p.set_widget_text("iii").await?;
        p.activate().await?;
        let shown = p.widget_text().await?;

        // The window is closed on both paths so a mismatch does not leave the
        // viewer running.
        close_window(p).await?;
        if shown != "III" {
            return Err(HarnessError::AssertionFailure(format!(
                "page label entry shows {shown:?} after entering \"iii\", expected \"III\""
            )));
        }
        Ok(())
    }
}

/// A wrong password is rejected, the right one unlocks the document.
pub struct EncryptedFile;

#[async_trait]
impl Scenario for EncryptedFile {
    fn name(&self) -> &str {
        "encrypted-file"
    }

    fn description(&self) -> &str {
        "Unlock an encrypted PDF after a failed attempt"
    }

    fn fixture(&self) -> Option<&str> {
        Some(ENCRYPTED_PDF)
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        p.focus_dialog("Enter password").await?;
        p.type_text("wrong password").await?;
        p.click("Unlock Document", roles::PUSH_BUTTON).await?;
        p.focus_dialog("Enter password").await?;
        p.click("Cancel", roles::PUSH_BUTTON).await?;

        p.focus_frame(&format!("{ENCRYPTED_PDF} — Password Required")).await?;
        p.click("Unlock Document", roles::PUSH_BUTTON).await?;
        p.type_text(ENCRYPTED_PASSWORD).await?;
        p.focus_dialog("Enter password").await?;
        p.click("Unlock Document", roles::PUSH_BUTTON).await?;
        p.wait_for_window_closed(Window::dialog("Enter password")).await?;

        p.focus_frame(&format!("{ENCRYPTED_PDF} — Dokument1")).await?;
        close_window(p).await
    }
}

/// A PDF with a `.bin` extension still opens.
pub struct WrongFileExtension;

#[async_trait]
impl Scenario for WrongFileExtension {
    fn name(&self) -> &str {
        "wrong-file-extension"
    }

    fn description(&self) -> &str {
        "Open a PDF named with a .bin extension"
    }

    fn fixture(&self) -> Option<&str> {
        Some(MIME_BIN)
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        close_window(p).await
    }
}

/// Reload the same document repeatedly.
pub struct Reload;

#[async_trait]
impl Scenario for Reload {
    fn name(&self) -> &str {
        "reload"
    }

    fn description(&self) -> &str {
        "Reload the open document five times"
    }

    fn fixture(&self) -> Option<&str> {
        Some(LINKS_PDF)
    }

    async fn run(&self, p: &mut Procedure) -> Result<(), HarnessError> {
        p.focus_frame(LINKS_PDF).await?;
        for round in 1..=RELOAD_COUNT {
            menu_item(p, "View", "Reload").await?;
            p.focus_frame(LINKS_PDF).await?;
            info!(round, "reloaded");
        }
        close_window(p).await
    }
}
