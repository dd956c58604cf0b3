//! Native GDI handles for [`Bitmap`]s.

use std::ptr;

use cross_tray_core::{Bitmap, NativeBitmap};
use windows_sys::Win32::{
    Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateBitmap, CreateDIBSection, DIB_RGB_COLORS,
        DeleteObject, HBITMAP,
    },
    UI::WindowsAndMessaging::{
        CreateIconIndirect, DestroyIcon, GetSystemMetrics, HICON, ICONINFO, SM_CXMENUCHECK,
        SM_CXSMICON, SM_CYMENUCHECK, SM_CYSMICON,
    },
};

/// An owned `HBITMAP`, deleted on drop.
#[derive(Debug)]
pub(crate) struct OwnedBitmap(HBITMAP);

// GDI bitmap handles are process-wide.
unsafe impl Send for OwnedBitmap {}
unsafe impl Sync for OwnedBitmap {}

impl NativeBitmap for OwnedBitmap {
    fn as_raw(&self) -> usize {
        self.0 as usize
    }
}

impl Drop for OwnedBitmap {
    fn drop(&mut self) {
        unsafe { DeleteObject(self.0 as _) };
    }
}

/// An owned `HICON`, destroyed on drop.
#[derive(Debug)]
pub(crate) struct OwnedIcon(HICON);

impl OwnedIcon {
    /// Build a small notification-area icon from `bitmap`.
    pub(crate) fn from_bitmap(bitmap: &Bitmap) -> anyhow::Result<Self> {
        let (width, height) = small_icon_size();
        let rgba = bitmap.resized_rgba(width, height);

        let color = unsafe { create_dib(&rgba, width, height, false) }.ok_or_else(|| {
            anyhow::anyhow!("CreateDIBSection failed: {}", std::io::Error::last_os_error())
        })?;

        let mask_bits = vec![0u8; (width.div_ceil(16) * 2 * height) as usize];
        let mask = unsafe {
            CreateBitmap(width as i32, height as i32, 1, 1, mask_bits.as_ptr() as *const _)
        };
        if mask.is_null() {
            anyhow::bail!("CreateBitmap failed: {}", std::io::Error::last_os_error());
        }
        let mask = OwnedBitmap(mask);

        let info = ICONINFO {
            fIcon: 1,
            xHotspot: 0,
            yHotspot: 0,
            hbmMask: mask.0,
            hbmColor: color.0,
        };
        // The icon copies both bitmaps, so they are released when this scope ends.
        let hicon = unsafe { CreateIconIndirect(&info) };
        if hicon.is_null() {
            anyhow::bail!("CreateIconIndirect failed: {}", std::io::Error::last_os_error());
        }

        Ok(OwnedIcon(hicon))
    }

    pub(crate) fn handle(&self) -> HICON {
        self.0
    }
}

impl Drop for OwnedIcon {
    fn drop(&mut self) {
        unsafe { DestroyIcon(self.0) };
    }
}

fn small_icon_size() -> (u32, u32) {
    let (cx, cy) = unsafe { (GetSystemMetrics(SM_CXSMICON), GetSystemMetrics(SM_CYSMICON)) };
    (cx.max(16) as u32, cy.max(16) as u32)
}

fn check_mark_size() -> (u32, u32) {
    let (cx, cy) = unsafe { (GetSystemMetrics(SM_CXMENUCHECK), GetSystemMetrics(SM_CYMENUCHECK)) };
    (cx.max(13) as u32, cy.max(13) as u32)
}

/// The `HBITMAP` drawn next to an icon row's text.
pub(crate) fn item_bitmap(bitmap: &Bitmap) -> Option<HBITMAP> {
    native_handle(bitmap, small_icon_size())
}

/// The `HBITMAP` used in place of a check mark.
pub(crate) fn check_bitmap(bitmap: &Bitmap) -> Option<HBITMAP> {
    native_handle(bitmap, check_mark_size())
}

/// The menu bitmap for `bitmap` at the current metric size. A new size, e.g. after a
/// DPI change, gets its own handle.
fn native_handle(bitmap: &Bitmap, size: (u32, u32)) -> Option<HBITMAP> {
    let (width, height) = size;
    let raw = bitmap.native_or_init(size, |bitmap| {
        let rgba = bitmap.resized_rgba(width, height);
        let hbitmap = unsafe { create_dib(&rgba, width, height, true) }?;
        Some(Box::new(hbitmap))
    })?;
    Some(raw as HBITMAP)
}

/// Create a top-down 32bpp DIB section holding `rgba` as BGRA.
///
/// Menus draw item bitmaps with premultiplied alpha; icon color bitmaps expect
/// straight alpha.
unsafe fn create_dib(
    rgba: &[u8],
    width: u32,
    height: u32,
    premultiply: bool,
) -> Option<OwnedBitmap> {
    let mut bmi: BITMAPINFO = unsafe { std::mem::zeroed() };
    bmi.bmiHeader.biSize = std::mem::size_of::<BITMAPINFOHEADER>() as u32;
    bmi.bmiHeader.biWidth = width as i32;
    bmi.bmiHeader.biHeight = -(height as i32);
    bmi.bmiHeader.biPlanes = 1;
    bmi.bmiHeader.biBitCount = 32;
    bmi.bmiHeader.biCompression = BI_RGB;

    let mut bits: *mut std::ffi::c_void = ptr::null_mut();
    let hbitmap = unsafe {
        CreateDIBSection(ptr::null_mut(), &bmi, DIB_RGB_COLORS, &mut bits, ptr::null_mut(), 0)
    };
    if hbitmap.is_null() {
        return None;
    }
    let hbitmap = OwnedBitmap(hbitmap);
    if bits.is_null() {
        return None;
    }

    let len = width as usize * height as usize * 4;
    let dst = unsafe { std::slice::from_raw_parts_mut(bits as *mut u8, len) };
    for (dst, src) in dst.chunks_exact_mut(4).zip(rgba.chunks_exact(4)) {
        let alpha = src[3] as u32;
        let scale = |c: u8| {
            if premultiply {
                (c as u32 * alpha / 255) as u8
            } else {
                c
            }
        };
        dst[0] = scale(src[2]);
        dst[1] = scale(src[1]);
        dst[2] = scale(src[0]);
        dst[3] = src[3];
    }

    Some(hbitmap)
}
