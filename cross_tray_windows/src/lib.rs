//! Windows notification-area backend built on `Shell_NotifyIconW`.

#![cfg(target_os = "windows")]

mod bitmap;
mod menu;
mod msg;
mod util;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ptr;
use std::sync::Arc;

use cross_tray_core::{
    BackendEvent, BalloonIcon, BalloonTip, ClickTypes, CommandId, IconState, NotifyBackend,
    TrayEvent, Waker,
};
use dpi::PhysicalPosition;
use tracing::{debug, trace, warn};
use windows_sys::Win32::{
    Foundation::{HWND, LPARAM, LRESULT, POINT, WPARAM},
    UI::{
        Shell::{
            NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_TIP, NIIF_ERROR, NIIF_INFO, NIIF_NONE,
            NIIF_WARNING, NIM_ADD, NIM_DELETE, NIM_MODIFY, NOTIFY_ICON_MESSAGE, NOTIFYICONDATAW,
            Shell_NotifyIconW,
        },
        WindowsAndMessaging::{
            CS_DBLCLKS, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
            GWL_USERDATA, GetCursorPos, GetMessageW, HICON, IDI_APPLICATION, LoadIconW, MSG,
            PostMessageW, RegisterClassExW, SetForegroundWindow, TPM_BOTTOMALIGN, TPM_RETURNCMD,
            TPM_RIGHTALIGN, TPM_RIGHTBUTTON, TrackPopupMenu, TranslateMessage, WM_COMMAND,
            WM_LBUTTONDBLCLK, WM_LBUTTONDOWN, WM_NULL, WM_RBUTTONDOWN, WNDCLASSEXW,
            WS_EX_TOOLWINDOW,
        },
    },
};

pub use menu::Win32Menu;

use crate::bitmap::OwnedIcon;
use crate::msg::{TASKBAR_CREATED_MSG_ID, TRAY_ICON_MSG_ID, WAKE_MSG_ID};

/// The single icon each `NotifyIcon` registers with the shell.
const TRAY_ICON_UID: u32 = 1;

/// We need to post to the window from other threads, which means the handle needs to be
/// Send+Sync.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
struct SyncWindowHandle(HWND);

unsafe impl Send for SyncWindowHandle {}
unsafe impl Sync for SyncWindowHandle {}

impl SyncWindowHandle {
    fn hwnd(&self) -> HWND {
        self.0
    }
}

/// Data stored per hidden window, reached from the window procedure.
#[derive(Default)]
struct WindowData {
    queue: RefCell<VecDeque<BackendEvent>>,
    taskbar_created: Cell<bool>,
}

impl WindowData {
    fn push(&self, event: BackendEvent) {
        self.queue.borrow_mut().push_back(event);
    }
}

/// A notification-area icon owned by a hidden message window.
///
/// Must be created on the thread that calls [`NotifyBackend::next_event`], which runs
/// that thread's message loop.
pub struct NotifyIcon {
    window_handle: SyncWindowHandle,
    data: Box<WindowData>,
    icon: Option<OwnedIcon>,
    /// What was last registered with the shell; `None` while not mounted.
    mounted: Option<IconState>,
}

impl std::fmt::Debug for NotifyIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyIcon")
            .field("window_handle", &self.window_handle)
            .field("mounted", &self.mounted.is_some())
            .finish_non_exhaustive()
    }
}

impl NotifyIcon {
    /// Register `class_name` and create the hidden window that receives icon callbacks.
    pub fn new(class_name: &str) -> anyhow::Result<Self> {
        let class_name = util::encode_wide(class_name);

        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: CS_DBLCLKS,
            lpfnWndProc: Some(tray_window_callback),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: util::get_instance_handle(),
            hIcon: ptr::null_mut(),
            hCursor: ptr::null_mut(),
            hbrBackground: ptr::null_mut(),
            lpszMenuName: ptr::null(),
            lpszClassName: class_name.as_ptr(),
            hIconSm: ptr::null_mut(),
        };

        // Register the window class (ignore errors for duplicate registration)
        unsafe { RegisterClassExW(&class) };

        let hwnd = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW,
                class_name.as_ptr(),
                ptr::null(),
                0,
                0,
                0,
                0,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                util::get_instance_handle(),
                ptr::null(),
            )
        };
        if hwnd.is_null() {
            return Err(std::io::Error::last_os_error().into());
        }

        let data = Box::<WindowData>::default();
        unsafe {
            util::set_window_long(hwnd, GWL_USERDATA, &*data as *const WindowData as isize)
        };

        // Register the messages up front so the window procedure never has to.
        TRAY_ICON_MSG_ID.get();
        WAKE_MSG_ID.get();
        TASKBAR_CREATED_MSG_ID.get();

        debug!(?hwnd, "Created tray message window");
        Ok(NotifyIcon {
            window_handle: SyncWindowHandle(hwnd),
            data,
            icon: None,
            mounted: None,
        })
    }

    fn hwnd(&self) -> HWND {
        self.window_handle.hwnd()
    }

    fn notify_data(&self) -> NOTIFYICONDATAW {
        let mut nid: NOTIFYICONDATAW = unsafe { std::mem::zeroed() };
        nid.cbSize = std::mem::size_of::<NOTIFYICONDATAW>() as u32;
        nid.hWnd = self.hwnd();
        nid.uID = TRAY_ICON_UID;
        nid
    }

    /// Build the icon for `state`, returning its handle. The handle stays valid until the
    /// next call.
    fn load_icon(&mut self, state: &IconState) -> anyhow::Result<HICON> {
        self.icon = match &state.icon {
            Some(bitmap) => Some(OwnedIcon::from_bitmap(bitmap)?),
            None => None,
        };

        Ok(match &self.icon {
            Some(icon) => icon.handle(),
            None => unsafe { LoadIconW(ptr::null_mut(), IDI_APPLICATION) },
        })
    }

    fn notify(&self, message: NOTIFY_ICON_MESSAGE, nid: &NOTIFYICONDATAW) -> anyhow::Result<()> {
        if unsafe { Shell_NotifyIconW(message, nid) } == 0 {
            anyhow::bail!("Shell_NotifyIconW({message}) failed");
        }
        Ok(())
    }

    fn register(&mut self, message: NOTIFY_ICON_MESSAGE, state: &IconState) -> anyhow::Result<()> {
        let mut nid = self.notify_data();
        nid.uFlags = NIF_ICON | NIF_TIP;
        if message == NIM_ADD {
            nid.uFlags |= NIF_MESSAGE;
            nid.uCallbackMessage = TRAY_ICON_MSG_ID.get();
        }
        nid.hIcon = self.load_icon(state)?;
        util::copy_wide(&mut nid.szTip, &state.tooltip);

        self.notify(message, &nid)?;
        self.mounted = Some(state.clone());
        Ok(())
    }

    fn restore_after_taskbar_restart(&mut self) {
        if !self.data.taskbar_created.replace(false) {
            return;
        }
        let Some(state) = self.mounted.clone() else {
            return;
        };

        debug!("Taskbar recreated, adding tray icon again");
        if let Err(e) = self.register(NIM_ADD, &state) {
            warn!("Failed to restore tray icon: {e}");
        }
    }
}

impl Drop for NotifyIcon {
    fn drop(&mut self) {
        if self.mounted.is_some() {
            let nid = self.notify_data();
            unsafe { Shell_NotifyIconW(NIM_DELETE, &nid) };
        }

        unsafe {
            util::set_window_long(self.hwnd(), GWL_USERDATA, 0);
            DestroyWindow(self.hwnd());
        }
        trace!("Destroyed tray message window");
    }
}

impl NotifyBackend for NotifyIcon {
    type Surface = Win32Menu;

    fn next_event(&mut self) -> Option<BackendEvent> {
        loop {
            let queued = self.data.queue.borrow_mut().pop_front();
            if let Some(event) = queued {
                return Some(event);
            }

            self.restore_after_taskbar_restart();

            let mut msg: MSG = unsafe { std::mem::zeroed() };
            let status = unsafe { GetMessageW(&mut msg, ptr::null_mut(), 0, 0) };
            if status == 0 || status == -1 {
                debug!(status, "Tray message loop ended");
                return None;
            }

            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }

    fn waker(&self) -> Waker {
        let handle = self.window_handle;
        Arc::new(move || unsafe {
            PostMessageW(handle.hwnd(), WAKE_MSG_ID.get(), 0, 0);
        })
    }

    fn open_surface(&mut self) -> anyhow::Result<Win32Menu> {
        Win32Menu::new()
    }

    fn show_and_wait(
        &mut self,
        surface: Win32Menu,
        anchor: PhysicalPosition<i32>,
    ) -> Option<CommandId> {
        let selected = unsafe {
            SetForegroundWindow(self.hwnd());
            let selected = TrackPopupMenu(
                surface.hmenu(),
                TPM_RIGHTALIGN | TPM_BOTTOMALIGN | TPM_RIGHTBUTTON | TPM_RETURNCMD,
                anchor.x,
                anchor.y,
                0,
                self.hwnd(),
                ptr::null(),
            );
            PostMessageW(self.hwnd(), WM_NULL, 0, 0);
            selected
        };
        drop(surface);

        (selected > 0).then_some(selected as CommandId)
    }

    fn add_icon(&mut self, state: &IconState) -> anyhow::Result<()> {
        self.register(NIM_ADD, state)
    }

    fn modify_icon(&mut self, state: &IconState) -> anyhow::Result<()> {
        self.register(NIM_MODIFY, state)
    }

    fn modify_tooltip(&mut self, tooltip: &str) -> anyhow::Result<()> {
        let mut nid = self.notify_data();
        nid.uFlags = NIF_TIP;
        util::copy_wide(&mut nid.szTip, tooltip);
        self.notify(NIM_MODIFY, &nid)?;

        if let Some(state) = &mut self.mounted {
            state.tooltip = tooltip.to_string();
        }
        Ok(())
    }

    fn show_balloon(&mut self, tip: &BalloonTip) -> anyhow::Result<()> {
        let mut nid = self.notify_data();
        nid.uFlags = NIF_INFO;
        util::copy_wide(&mut nid.szInfoTitle, &tip.title);
        util::copy_wide(&mut nid.szInfo, &tip.text);
        nid.dwInfoFlags = match tip.icon {
            BalloonIcon::None => NIIF_NONE,
            BalloonIcon::Info => NIIF_INFO,
            BalloonIcon::Warning => NIIF_WARNING,
            BalloonIcon::Error => NIIF_ERROR,
        };
        self.notify(NIM_MODIFY, &nid)
    }

    fn remove_icon(&mut self) -> anyhow::Result<()> {
        let nid = self.notify_data();
        self.mounted = None;
        self.notify(NIM_DELETE, &nid)?;
        self.icon = None;
        Ok(())
    }
}

fn cursor_position() -> PhysicalPosition<i32> {
    let mut point = POINT { x: 0, y: 0 };
    unsafe { GetCursorPos(&mut point) };
    PhysicalPosition::new(point.x, point.y)
}

/// Window callback for the hidden tray window.
unsafe extern "system" fn tray_window_callback(
    window: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let userdata = unsafe { util::get_window_long(window, GWL_USERDATA) };
    if userdata == 0 {
        return unsafe { DefWindowProcW(window, msg, wparam, lparam) };
    }
    let data = unsafe { &*(userdata as *const WindowData) };

    if msg == TRAY_ICON_MSG_ID.get() {
        let clicks = match lparam as u32 {
            WM_LBUTTONDOWN => ClickTypes::LEFT,
            WM_LBUTTONDBLCLK => ClickTypes::DOUBLE_LEFT,
            WM_RBUTTONDOWN => ClickTypes::RIGHT,
            _ => return 0,
        };
        data.push(BackendEvent::Tray(TrayEvent::Gesture {
            clicks,
            position: cursor_position(),
        }));
        return 0;
    }

    if msg == WAKE_MSG_ID.get() {
        data.push(BackendEvent::Wake);
        return 0;
    }

    if msg == TASKBAR_CREATED_MSG_ID.get() {
        data.taskbar_created.set(true);
        return 0;
    }

    // Menu selections that arrive as commands instead of through `TrackPopupMenu`.
    if msg == WM_COMMAND && lparam == 0 && (wparam >> 16) & 0xFFFF == 0 {
        data.push(BackendEvent::Tray(TrayEvent::MenuCommand {
            id: (wparam & 0xFFFF) as CommandId,
        }));
        return 0;
    }

    unsafe { DefWindowProcW(window, msg, wparam, lparam) }
}
