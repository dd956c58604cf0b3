use std::{ffi::OsStr, iter::once, os::windows::ffi::OsStrExt as _};

use windows_sys::Win32::{
    Foundation::{HMODULE, HWND},
    System::SystemServices::IMAGE_DOS_HEADER,
    UI::WindowsAndMessaging::WINDOW_LONG_PTR_INDEX,
};

pub fn get_instance_handle() -> HMODULE {
    // Gets the instance handle by taking the address of the
    // pseudo-variable created by the microsoft linker:
    // https://devblogs.microsoft.com/oldnewthing/20041025-00/?p=37483

    unsafe extern "C" {
        static __ImageBase: IMAGE_DOS_HEADER;
    }

    unsafe { &__ImageBase as *const _ as _ }
}

#[inline(always)]
pub(crate) unsafe fn get_window_long(hwnd: HWND, nindex: WINDOW_LONG_PTR_INDEX) -> isize {
    #[cfg(target_pointer_width = "64")]
    return unsafe { windows_sys::Win32::UI::WindowsAndMessaging::GetWindowLongPtrW(hwnd, nindex) };
    #[cfg(target_pointer_width = "32")]
    return unsafe {
        windows_sys::Win32::UI::WindowsAndMessaging::GetWindowLongW(hwnd, nindex) as isize
    };
}

#[inline(always)]
pub(crate) unsafe fn set_window_long(
    hwnd: HWND,
    nindex: WINDOW_LONG_PTR_INDEX,
    dwnewlong: isize,
) -> isize {
    #[cfg(target_pointer_width = "64")]
    return unsafe {
        windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW(hwnd, nindex, dwnewlong)
    };
    #[cfg(target_pointer_width = "32")]
    return unsafe {
        windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongW(hwnd, nindex, dwnewlong as i32)
            as isize
    };
}

pub fn encode_wide(string: impl AsRef<OsStr>) -> Vec<u16> {
    string.as_ref().encode_wide().chain(once(0)).collect()
}

/// Copy `string` into a fixed-size wide buffer, truncating so the terminating null fits.
pub(crate) fn copy_wide(dst: &mut [u16], string: &str) {
    let Some(capacity) = dst.len().checked_sub(1) else {
        return;
    };

    let mut len = 0;
    for (slot, unit) in dst.iter_mut().zip(string.encode_utf16().take(capacity)) {
        *slot = unit;
        len += 1;
    }
    dst[len] = 0;
}
