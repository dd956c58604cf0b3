//! The seam between the platform-independent tray and the native notification area.

use std::sync::Arc;

use dpi::PhysicalPosition;

use crate::bitmap::Bitmap;
use crate::event::BackendEvent;
use crate::menu::CommandId;
use crate::render::MenuSurface;

/// Wakes a backend blocked in [`NotifyBackend::next_event`]. Callable from any thread.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// What the notification area should display for the icon.
#[derive(Debug, Clone, Default)]
pub struct IconState {
    pub tooltip: String,
    /// `None` uses the application's default icon.
    pub icon: Option<Arc<Bitmap>>,
}

/// Icon shown next to a balloon notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BalloonIcon {
    #[default]
    None,
    Info,
    Warning,
    Error,
}

/// A balloon notification anchored to the tray icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalloonTip {
    pub title: String,
    pub text: String,
    pub icon: BalloonIcon,
}

impl BalloonTip {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            icon: BalloonIcon::None,
        }
    }

    pub fn with_icon(mut self, icon: BalloonIcon) -> Self {
        self.icon = icon;
        self
    }
}

/// Native notification-area plumbing.
///
/// A backend is created on the thread that runs the event pump and is only ever used
/// from that thread; it does not need to be `Send`.
pub trait NotifyBackend {
    /// The native menu a context menu is rendered onto.
    type Surface: MenuSurface;

    /// Block until the next event. Returns `None` once the native side is gone.
    fn next_event(&mut self) -> Option<BackendEvent>;

    /// A handle that makes a blocked [`NotifyBackend::next_event`] return
    /// [`BackendEvent::Wake`].
    fn waker(&self) -> Waker;

    /// Create an empty top-level menu surface.
    fn open_surface(&mut self) -> anyhow::Result<Self::Surface>;

    /// Display `surface` at `anchor` and block until it is dismissed.
    ///
    /// Returns the selected command identifier, or `None` if the menu was dismissed
    /// without a selection.
    fn show_and_wait(
        &mut self,
        surface: Self::Surface,
        anchor: PhysicalPosition<i32>,
    ) -> Option<CommandId>;

    /// Register the icon with the notification area.
    fn add_icon(&mut self, state: &IconState) -> anyhow::Result<()>;

    /// Update the registered icon's image and tooltip.
    fn modify_icon(&mut self, state: &IconState) -> anyhow::Result<()>;

    /// Update only the tooltip of the registered icon.
    fn modify_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()>;

    /// Show a balloon notification on the registered icon.
    fn show_balloon(&mut self, tip: &BalloonTip) -> anyhow::Result<()>;

    /// Remove the icon from the notification area.
    fn remove_icon(&mut self) -> anyhow::Result<()>;
}
