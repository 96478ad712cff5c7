//! The scenario catalogue.
//!
//! Each scenario is a unit struct implementing [`Scenario`]. Menu walks live
//! in [`menus`]; scenarios that exercise a particular fixture document live in
//! [`documents`].

use docprobe_core::element::roles;
use docprobe_core::error::HarnessError;
use docprobe_core::harness::Scenario;
use docprobe_core::procedural::Procedure;

pub mod documents;
pub mod menus;

#[cfg(test)]
pub(crate) mod viewer;

/// The plain PDF most scenarios use.
pub const LINKS_PDF: &str = "test-links.pdf";
/// Password-protected PDF; the password is [`ENCRYPTED_PASSWORD`].
pub const ENCRYPTED_PDF: &str = "test-encrypt.pdf";
pub const ENCRYPTED_PASSWORD: &str = "Foo";
/// PDF whose first pages carry lowercase roman labels.
pub const PAGE_LABELS_PDF: &str = "test-page-labels.pdf";
/// A PDF with a misleading extension.
pub const MIME_BIN: &str = "test-mime.bin";

/// Title of the empty viewer window.
pub const RECENT_DOCUMENTS: &str = "Recent Documents";

/// Every registered scenario, in catalogue order.
pub fn all() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(menus::BookmarksMenu),
        Box::new(menus::EditMenu),
        Box::new(documents::EncryptedFile),
        Box::new(menus::FileMenu),
        Box::new(documents::FileReloading),
        Box::new(menus::GoMenu),
        Box::new(menus::HelpMenu),
        Box::new(documents::Reload),
        Box::new(documents::WrongFileExtension),
        Box::new(menus::Zoom),
    ]
}

/// Look up a scenario by name.
pub fn find(name: &str) -> Option<Box<dyn Scenario>> {
    all().into_iter().find(|s| s.name() == name)
}

/// Title of the About dialog for an application, e.g. `About Xreader`.
pub fn about_title(app: &str) -> String {
    let mut chars = app.chars();
    match chars.next() {
        Some(first) => format!("About {}{}", first.to_uppercase(), chars.as_str()),
        None => "About".to_string(),
    }
}

/// Pick a menu item: click the menu, then the item.
pub(crate) async fn menu_item(p: &mut Procedure, menu: &str, item: &str) -> Result<(), HarnessError> {
    p.click(menu, roles::MENU).await?;
    p.click(item, roles::MENU_ITEM).await
}

/// File → Close.
pub(crate) async fn close_window(p: &mut Procedure) -> Result<(), HarnessError> {
    menu_item(p, "File", "Close").await
}

/// Open `file` through File → Open… and the file chooser.
pub(crate) async fn open_from_chooser(p: &mut Procedure, file: &str) -> Result<(), HarnessError> {
    menu_item(p, "File", "Open…").await?;
    p.click(file, roles::TABLE_CELL).await?;
    p.click("Open", roles::PUSH_BUTTON).await
}
