//! Menu item types for tray context menus.
//!
//! A [`MenuItem`] is a closed set of variants ([`MenuItemKind`]). Items are declared by
//! the caller, handed to [`MenuTree::build`](crate::tree::MenuTree::build) which takes
//! ownership of them, and receive their command identifier when the tree is
//! materialized into a [`Registry`](crate::registry::Registry).

use std::fmt;
use std::sync::Arc;

use crate::bitmap::{Bitmap, BitmapSource};
use crate::error::ResourceLoadError;

/// Identifier the native menu reports back when a row is selected.
pub type CommandId = u32;

/// The "no selection" identifier. Never assigned to a menu item.
pub const NO_COMMAND: CommandId = 0;

/// Behavior attached to a menu item.
///
/// The action receives the item it belongs to, after any state change made by the
/// dispatch (a checkable item has already been toggled), and may mutate it.
pub type MenuAction = Arc<dyn Fn(&mut MenuItem) + Send + Sync>;

/// Variant payload of a menu item.
pub enum MenuItemKind {
    /// A plain clickable row.
    Simple,
    /// A row with a checkmark that toggles on every selection.
    Checkable { checked: bool },
    /// A checkable row that draws its own checked/unchecked bitmaps.
    CustomCheckable {
        checked: bool,
        checked_bitmap: Bitmap,
        unchecked_bitmap: Bitmap,
    },
    /// A clickable row with a bitmap next to the text.
    Icon { bitmap: Bitmap },
    /// A horizontal divider.
    Separator,
    /// A submenu. Children are moved into the tree arena when the tree is built.
    Popup { children: Vec<MenuItem> },
}

impl fmt::Debug for MenuItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItemKind::Simple => f.write_str("Simple"),
            MenuItemKind::Checkable { checked } => f
                .debug_struct("Checkable")
                .field("checked", checked)
                .finish(),
            MenuItemKind::CustomCheckable { checked, .. } => f
                .debug_struct("CustomCheckable")
                .field("checked", checked)
                .finish_non_exhaustive(),
            MenuItemKind::Icon { bitmap } => {
                f.debug_struct("Icon").field("bitmap", bitmap).finish()
            }
            MenuItemKind::Separator => f.write_str("Separator"),
            MenuItemKind::Popup { children } => f
                .debug_struct("Popup")
                .field("children", children)
                .finish(),
        }
    }
}

/// Bitmaps a row is decorated with when rendered.
#[derive(Debug, Clone, Copy)]
pub enum Decoration<'a> {
    None,
    /// Drawn next to the text.
    Icon(&'a Bitmap),
    /// Replace the default checkmark.
    CheckMarks {
        checked: &'a Bitmap,
        unchecked: &'a Bitmap,
    },
}

/// One entry of a context menu.
pub struct MenuItem {
    text: String,
    id: CommandId,
    enabled: bool,
    kind: MenuItemKind,
    action: Option<MenuAction>,
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("text", &self.text)
            .field("id", &self.id)
            .field("enabled", &self.enabled)
            .field("kind", &self.kind)
            .field("action", &self.action.as_ref().map(|_| "<...>"))
            .finish()
    }
}

impl MenuItem {
    fn with_kind(text: impl Into<String>, kind: MenuItemKind) -> Self {
        Self {
            text: text.into(),
            id: NO_COMMAND,
            enabled: true,
            kind,
            action: None,
        }
    }

    /// A plain clickable item.
    pub fn simple<F>(text: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut MenuItem) + Send + Sync + 'static,
    {
        Self::with_kind(text, MenuItemKind::Simple).with_action(action)
    }

    /// An item that toggles its checkmark each time it is selected.
    pub fn checkable<F>(text: impl Into<String>, checked: bool, action: F) -> Self
    where
        F: Fn(&mut MenuItem) + Send + Sync + 'static,
    {
        Self::with_kind(text, MenuItemKind::Checkable { checked }).with_action(action)
    }

    /// A checkable item with custom checked/unchecked bitmaps.
    ///
    /// Fails if either bitmap cannot be loaded; no item is created in that case.
    pub fn custom_checkable<F>(
        text: impl Into<String>,
        checked: bool,
        checked_bitmap: impl Into<BitmapSource>,
        unchecked_bitmap: impl Into<BitmapSource>,
        action: F,
    ) -> Result<Self, ResourceLoadError>
    where
        F: Fn(&mut MenuItem) + Send + Sync + 'static,
    {
        let checked_bitmap = Bitmap::load(checked_bitmap)?;
        let unchecked_bitmap = Bitmap::load(unchecked_bitmap)?;
        Ok(Self::with_kind(
            text,
            MenuItemKind::CustomCheckable {
                checked,
                checked_bitmap,
                unchecked_bitmap,
            },
        )
        .with_action(action))
    }

    /// An item showing a bitmap next to its text.
    ///
    /// Fails if the bitmap cannot be loaded; no item is created in that case.
    pub fn icon<F>(
        text: impl Into<String>,
        bitmap: impl Into<BitmapSource>,
        action: F,
    ) -> Result<Self, ResourceLoadError>
    where
        F: Fn(&mut MenuItem) + Send + Sync + 'static,
    {
        let bitmap = Bitmap::load(bitmap)?;
        Ok(Self::with_kind(text, MenuItemKind::Icon { bitmap }).with_action(action))
    }

    /// A divider line.
    pub fn separator() -> Self {
        Self::with_kind(String::new(), MenuItemKind::Separator)
    }

    /// A submenu containing `children`.
    pub fn popup(text: impl Into<String>, children: Vec<MenuItem>) -> Self {
        Self::with_kind(text, MenuItemKind::Popup { children })
    }

    /// Set whether this item is enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the action invoked when this item is selected.
    ///
    /// Separators and popups are never invoked, so an action set on them is ignored.
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut MenuItem) + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Drop the action so selecting the item only changes its state.
    pub fn without_action(mut self) -> Self {
        self.action = None;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// The command identifier, or [`NO_COMMAND`] if the item has not been materialized
    /// (or is a separator).
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: CommandId) {
        self.id = id;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn kind(&self) -> &MenuItemKind {
        &self.kind
    }

    pub fn is_separator(&self) -> bool {
        matches!(self.kind, MenuItemKind::Separator)
    }

    pub fn is_popup(&self) -> bool {
        matches!(self.kind, MenuItemKind::Popup { .. })
    }

    /// Whether selecting this item can invoke it. False for separators and popups.
    pub fn is_selectable(&self) -> bool {
        !self.is_separator() && !self.is_popup()
    }

    /// Check state: `None` if the item is not checkable.
    pub fn checked(&self) -> Option<bool> {
        match self.kind {
            MenuItemKind::Checkable { checked } | MenuItemKind::CustomCheckable { checked, .. } => {
                Some(checked)
            }
            _ => None,
        }
    }

    /// Set the check state. Returns `false` if the item is not checkable.
    pub fn set_checked(&mut self, value: bool) -> bool {
        match &mut self.kind {
            MenuItemKind::Checkable { checked } | MenuItemKind::CustomCheckable { checked, .. } => {
                *checked = value;
                true
            }
            _ => false,
        }
    }

    /// Flip the check state and return the new one. `None` if the item is not checkable.
    pub fn toggle(&mut self) -> Option<bool> {
        let next = !self.checked()?;
        self.set_checked(next);
        Some(next)
    }

    /// The bitmaps this item is rendered with.
    pub fn decoration(&self) -> Decoration<'_> {
        match &self.kind {
            MenuItemKind::Icon { bitmap } => Decoration::Icon(bitmap),
            MenuItemKind::CustomCheckable {
                checked_bitmap,
                unchecked_bitmap,
                ..
            } => Decoration::CheckMarks {
                checked: checked_bitmap,
                unchecked: unchecked_bitmap,
            },
            _ => Decoration::None,
        }
    }

    /// Declared children. Empty for everything but a popup that has not been built into
    /// a tree yet.
    pub fn children(&self) -> &[MenuItem] {
        match &self.kind {
            MenuItemKind::Popup { children } => children,
            _ => &[],
        }
    }

    pub(crate) fn take_children(&mut self) -> Vec<MenuItem> {
        match &mut self.kind {
            MenuItemKind::Popup { children } => std::mem::take(children),
            _ => Vec::new(),
        }
    }

    pub(crate) fn action(&self) -> Option<&MenuAction> {
        if self.is_selectable() {
            self.action.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel() -> BitmapSource {
        BitmapSource::Rgba {
            data: vec![0, 0, 0, 255],
            width: 1,
            height: 1,
        }
    }

    fn broken() -> BitmapSource {
        BitmapSource::Rgba {
            data: vec![0; 3],
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn new_items_are_unassigned_and_enabled() {
        let item = MenuItem::simple("Open", |_| {});
        assert_eq!(item.text(), "Open");
        assert_eq!(item.id(), NO_COMMAND);
        assert!(item.is_enabled());
        assert!(item.is_selectable());
        assert_eq!(item.checked(), None);
    }

    #[test]
    fn text_is_kept_verbatim() {
        let text = "  Spaces & ampersands\tand a very long label ".repeat(20);
        let item = MenuItem::simple(text.clone(), |_| {});
        assert_eq!(item.text(), text);
    }

    #[test]
    fn toggle_flips_checkable_state() {
        let mut item = MenuItem::checkable("Wrap", false, |_| {});
        assert_eq!(item.toggle(), Some(true));
        assert_eq!(item.toggle(), Some(false));
        assert_eq!(item.checked(), Some(false));
    }

    #[test]
    fn toggle_is_noop_for_simple_items() {
        let mut item = MenuItem::simple("Open", |_| {});
        assert_eq!(item.toggle(), None);
        assert!(!item.set_checked(true));
    }

    #[test]
    fn separators_and_popups_are_not_selectable() {
        let separator = MenuItem::separator();
        let popup = MenuItem::popup("More", vec![MenuItem::simple("Inner", |_| {})])
            .with_action(|_| {});

        assert!(!separator.is_selectable());
        assert!(separator.text().is_empty());
        assert!(!popup.is_selectable());
        assert!(popup.action().is_none());
        assert_eq!(popup.children().len(), 1);
    }

    #[test]
    fn icon_item_requires_valid_bitmap() {
        let item = MenuItem::icon("Status", pixel(), |_| {}).unwrap();
        assert!(matches!(item.decoration(), Decoration::Icon(_)));

        let err = MenuItem::icon("Status", broken(), |_| {}).unwrap_err();
        assert!(matches!(err, ResourceLoadError::BufferSize { .. }));
    }

    #[test]
    fn failed_icon_only_drops_that_item() {
        let items: Vec<MenuItem> = [
            MenuItem::icon("Broken", broken(), |_| {}),
            Ok(MenuItem::simple("Open", |_| {})),
            MenuItem::icon("Status", pixel(), |_| {}),
        ]
        .into_iter()
        .filter_map(Result::ok)
        .collect();
        assert_eq!(items.len(), 2);

        let registry = crate::Registry::materialize(crate::MenuTree::build(items));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(1).map(MenuItem::text), Some("Open"));
        assert_eq!(registry.get(2).map(MenuItem::text), Some("Status"));
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn custom_checkable_fails_if_either_bitmap_is_bad() {
        assert!(MenuItem::custom_checkable("A", false, pixel(), broken(), |_| {}).is_err());
        assert!(MenuItem::custom_checkable("A", false, broken(), pixel(), |_| {}).is_err());

        let mut item = MenuItem::custom_checkable("A", true, pixel(), pixel(), |_| {}).unwrap();
        assert!(matches!(item.decoration(), Decoration::CheckMarks { .. }));
        assert_eq!(item.toggle(), Some(false));
    }

    #[test]
    fn take_children_empties_popup() {
        let mut popup = MenuItem::popup(
            "More",
            vec![MenuItem::separator(), MenuItem::simple("Inner", |_| {})],
        );
        assert_eq!(popup.take_children().len(), 2);
        assert!(popup.children().is_empty());
        assert!(popup.is_popup());
    }
}
