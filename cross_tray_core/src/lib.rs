pub mod backend;
pub mod bitmap;
pub mod context_menu;
pub mod error;
pub mod event;
pub mod menu;
pub mod registry;
pub mod render;
pub mod tray_id;
pub mod tree;

pub use backend::{BalloonIcon, BalloonTip, IconState, NotifyBackend, Waker};
pub use bitmap::{Bitmap, BitmapSource, NativeBitmap};
pub use context_menu::ContextMenu;
pub use error::{ResourceLoadError, TrayError};
pub use event::{BackendEvent, ClickTypes, TrayEvent};
pub use menu::{CommandId, Decoration, MenuAction, MenuItem, MenuItemKind, NO_COMMAND};
pub use registry::{Dispatch, IgnoreReason, Registry};
pub use render::{MenuRow, MenuSnapshot, MenuSurface, SnapshotDecoration, SnapshotEntry, render};
pub use tray_id::TrayId;
pub use tree::{MenuTree, NodeId};

/// Receives every event of a tray together with the tray's id.
pub type TrayProxy = std::sync::Arc<dyn Fn(TrayId, TrayEvent) + Send + Sync>;

#[derive(Debug)]
pub struct TrayAttributes {
    pub tooltip: String,
    pub class_name: String,
    /// `None` shows the application's default icon.
    pub icon: Option<Bitmap>,
    /// Installed as the context menu when the tray starts.
    pub menu: Option<Vec<MenuItem>>,
    /// Which gestures open the menu. Defaults to [`ClickTypes::RIGHT`].
    pub menu_on_click: ClickTypes,
    /// Whether the icon is added to the notification area on start. Defaults to `true`.
    pub mount_on_start: bool,
}

impl Default for TrayAttributes {
    fn default() -> Self {
        TrayAttributes {
            tooltip: String::new(),
            class_name: "Cross Tray Class".to_string(),
            icon: None,
            menu: None,
            menu_on_click: ClickTypes::RIGHT,
            mount_on_start: true,
        }
    }
}

impl TrayAttributes {
    /// Set the tooltip for the tray icon.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    /// Set the icon for the tray.
    pub fn with_icon(mut self, icon: Option<Bitmap>) -> Self {
        self.icon = icon;
        self
    }

    /// Set the class name for the hidden message window.
    ///
    /// WARNING: On Windows if this is the same as another window class name, it will cause issues.
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Set the context menu installed when the tray starts.
    ///
    /// The menu is displayed when the user performs one of the gestures set with
    /// [`TrayAttributes::with_menu_on_click`].
    pub fn with_menu(mut self, menu: Vec<MenuItem>) -> Self {
        self.menu = Some(menu);
        self
    }

    /// Set which gestures open the menu.
    pub fn with_menu_on_click(mut self, clicks: ClickTypes) -> Self {
        self.menu_on_click = clicks;
        self
    }

    /// Set whether the icon is mounted as soon as the tray starts.
    pub fn with_mount_on_start(mut self, mount: bool) -> Self {
        self.mount_on_start = mount;
        self
    }
}
