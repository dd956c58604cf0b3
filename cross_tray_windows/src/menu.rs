//! Win32 popup menus as a [`MenuSurface`].

use std::ptr;

use cross_tray_core::{Decoration, MenuRow, MenuSurface};
use tracing::warn;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, DestroyMenu, HMENU, MENUITEMINFOW, MF_BYCOMMAND, MF_CHECKED,
    MF_GRAYED, MF_POPUP, MF_SEPARATOR, MF_STRING, MIIM_BITMAP, SetMenuItemBitmaps,
    SetMenuItemInfoW,
};

use crate::bitmap;
use crate::util::encode_wide;

/// An owned popup menu. Destroying it also destroys every attached submenu.
#[derive(Debug)]
pub struct Win32Menu {
    hmenu: HMENU,
}

impl Win32Menu {
    pub(crate) fn new() -> anyhow::Result<Self> {
        let hmenu = unsafe { CreatePopupMenu() };
        if hmenu.is_null() {
            anyhow::bail!("CreatePopupMenu failed: {}", std::io::Error::last_os_error());
        }
        Ok(Win32Menu { hmenu })
    }

    pub(crate) fn hmenu(&self) -> HMENU {
        self.hmenu
    }

    /// Give up ownership, e.g. after the menu was attached to a parent.
    fn into_raw(mut self) -> HMENU {
        std::mem::replace(&mut self.hmenu, ptr::null_mut())
    }

    fn append(&self, flags: u32, id: usize, text: &str) -> bool {
        if self.hmenu.is_null() {
            return false;
        }
        let label = encode_wide(text);
        unsafe { AppendMenuW(self.hmenu, flags, id, label.as_ptr()) != 0 }
    }
}

impl Drop for Win32Menu {
    fn drop(&mut self) {
        if !self.hmenu.is_null() {
            unsafe { DestroyMenu(self.hmenu) };
        }
    }
}

impl MenuSurface for Win32Menu {
    fn add_row(&mut self, row: MenuRow<'_>) {
        let mut flags = MF_STRING;
        if !row.enabled {
            flags |= MF_GRAYED;
        }
        if row.checked == Some(true) {
            flags |= MF_CHECKED;
        }

        if !self.append(flags, row.id as usize, row.text) {
            warn!(id = row.id, "Failed to append menu row");
            return;
        }

        match row.decoration {
            Decoration::None => {}
            Decoration::Icon(bitmap) => {
                if let Some(hbitmap) = bitmap::item_bitmap(bitmap) {
                    let mut info: MENUITEMINFOW = unsafe { std::mem::zeroed() };
                    info.cbSize = std::mem::size_of::<MENUITEMINFOW>() as u32;
                    info.fMask = MIIM_BITMAP;
                    info.hbmpItem = hbitmap;
                    unsafe { SetMenuItemInfoW(self.hmenu, row.id, 0, &info) };
                }
            }
            Decoration::CheckMarks { checked, unchecked } => {
                let checked = bitmap::check_bitmap(checked);
                let unchecked = bitmap::check_bitmap(unchecked);
                if let (Some(checked), Some(unchecked)) = (checked, unchecked) {
                    unsafe {
                        SetMenuItemBitmaps(self.hmenu, row.id, MF_BYCOMMAND, unchecked, checked)
                    };
                }
            }
        }
    }

    fn add_separator(&mut self) {
        if !self.hmenu.is_null() {
            unsafe { AppendMenuW(self.hmenu, MF_SEPARATOR, 0, ptr::null()) };
        }
    }

    fn create_submenu(&mut self) -> Self {
        Win32Menu::new().unwrap_or_else(|e| {
            warn!("Failed to create submenu: {e}");
            Win32Menu {
                hmenu: ptr::null_mut(),
            }
        })
    }

    fn append_submenu(&mut self, text: &str, enabled: bool, submenu: Self) {
        if submenu.hmenu.is_null() {
            return;
        }

        let mut flags = MF_POPUP;
        if !enabled {
            flags |= MF_GRAYED;
        }
        if self.append(flags, submenu.hmenu as usize, text) {
            // Owned by this menu from now on.
            submenu.into_raw();
        }
    }
}
