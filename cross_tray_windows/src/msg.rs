use std::sync::atomic::{AtomicU32, Ordering};

use windows_sys::Win32::UI::WindowsAndMessaging::RegisterWindowMessageA;

/// A lazily-registered window message ID.
pub struct LazyMessageId {
    id: AtomicU32,

    /// Null-terminated message name.
    name: &'static str,
}

const INVALID_ID: u32 = 0x0;

impl LazyMessageId {
    const fn new(name: &'static str) -> Self {
        Self {
            id: AtomicU32::new(INVALID_ID),
            name,
        }
    }

    pub fn get(&self) -> u32 {
        let id = self.id.load(Ordering::Relaxed);

        if id != INVALID_ID {
            return id;
        }

        // SAFETY: We are sure that the pointer is a valid C string ending with '\0'.
        assert!(self.name.ends_with('\0'));
        let new_id = unsafe { RegisterWindowMessageA(self.name.as_ptr()) };

        assert_ne!(
            new_id,
            0,
            "RegisterWindowMessageA returned zero for '{}': {}",
            self.name,
            std::io::Error::last_os_error()
        );

        // `RegisterWindowMessageA` returns the same value for a given string, so racing
        // stores always write the same ID.
        self.id.store(new_id, Ordering::Relaxed);

        new_id
    }
}

// Callback message the shell sends for mouse activity on the icon.
// LPARAM holds the mouse message (WM_LBUTTONDOWN, ...), WPARAM the icon ID.
pub(crate) static TRAY_ICON_MSG_ID: LazyMessageId = LazyMessageId::new("WM_TRAYICON\0");

// Posted by a `Waker` to unblock `GetMessageW`.
// WPARAM and LPARAM are unused.
pub(crate) static WAKE_MSG_ID: LazyMessageId = LazyMessageId::new("CrossTray::WakeMsg\0");

// Broadcast by the shell when the taskbar is recreated, e.g. after explorer restarts.
pub(crate) static TASKBAR_CREATED_MSG_ID: LazyMessageId = LazyMessageId::new("TaskbarCreated\0");
