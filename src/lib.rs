pub use cross_tray_core::*;

mod tray;
pub use tray::{TrayIcon, TrayManager};
