//! Error types shared by the menu model and the tray facade.

use std::path::PathBuf;

/// A bitmap source could not be turned into a usable [`Bitmap`](crate::bitmap::Bitmap).
///
/// Raised while constructing an icon or custom-checkable menu item, before the item
/// can enter a menu tree.
#[derive(Debug, thiserror::Error)]
pub enum ResourceLoadError {
    #[error("failed to read bitmap from {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode bitmap")]
    Decode(#[from] image::ImageError),

    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("RGBA buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Errors reported by a running tray icon.
#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    /// The background event pump has exited, so the request could not be delivered.
    #[error("tray event pump is not running")]
    PumpStopped,

    /// The icon must be mounted in the notification area for this operation.
    #[error("tray icon is not mounted")]
    NotMounted,

    /// A request was made from the event pump thread, e.g. from inside a menu action.
    #[error("tray requests cannot be made from the tray's own event thread")]
    Reentrant,
}
