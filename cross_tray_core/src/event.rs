use dpi::PhysicalPosition;

use crate::menu::CommandId;

bitflags::bitflags! {
    /// Mouse gestures on the tray icon.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClickTypes: u32 {
        const LEFT = 0x01;
        const DOUBLE_LEFT = 0x02;
        const RIGHT = 0x04;
    }
}

impl Default for ClickTypes {
    fn default() -> Self {
        ClickTypes::RIGHT
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum TrayEvent {
    /// The user clicked the tray icon.
    Gesture {
        clicks: ClickTypes,

        /// Cursor position in screen coordinates when the gesture was reported.
        position: PhysicalPosition<i32>,
    },

    /// A menu row was selected. The item has been dispatched by the time this is received.
    MenuCommand {
        /// The command identifier of the selected row.
        id: CommandId,
    },
}

/// What a backend hands to the event pump.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Tray(TrayEvent),
    /// The pump was woken to process queued requests.
    Wake,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_values_are_stable() {
        assert_eq!(ClickTypes::LEFT.bits(), 0x01);
        assert_eq!(ClickTypes::DOUBLE_LEFT.bits(), 0x02);
        assert_eq!(ClickTypes::RIGHT.bits(), 0x04);
        assert_eq!(ClickTypes::default(), ClickTypes::RIGHT);
    }

    #[test]
    fn gestures_combine() {
        let menu_on = ClickTypes::LEFT | ClickTypes::RIGHT;
        assert!(menu_on.intersects(ClickTypes::RIGHT));
        assert!(!menu_on.intersects(ClickTypes::DOUBLE_LEFT));
    }
}
