//! Bitmap resources owned by menu items and the tray icon.
//!
//! A [`Bitmap`] always holds validated RGBA pixels. Backends attach native handles
//! lazily through [`Bitmap::native_or_init`], one per requested size; the handles live
//! exactly as long as the bitmap, so dropping the menu item that owns the bitmap
//! releases the native resources too.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use image::imageops::FilterType;
use image::{ImageBuffer, Rgba};

use crate::error::ResourceLoadError;

/// Where a bitmap comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapSource {
    /// An image file on disk, in any format the `image` crate can decode.
    Path(PathBuf),
    /// An encoded image held in memory (PNG, ICO, BMP, ...).
    Encoded(Vec<u8>),
    /// Raw RGBA8 pixels, row-major, top-down.
    Rgba {
        data: Vec<u8>,
        width: u32,
        height: u32,
    },
}

impl From<PathBuf> for BitmapSource {
    fn from(path: PathBuf) -> Self {
        BitmapSource::Path(path)
    }
}

impl From<&Path> for BitmapSource {
    fn from(path: &Path) -> Self {
        BitmapSource::Path(path.to_path_buf())
    }
}

/// A native bitmap handle created by a backend for a [`Bitmap`].
///
/// Implementors release the handle in their `Drop` impl.
pub trait NativeBitmap: fmt::Debug + Send + Sync {
    /// The raw handle value, suitable for passing across an FFI boundary.
    fn as_raw(&self) -> usize;
}

type NativeCache = Vec<((u32, u32), Box<dyn NativeBitmap>)>;

/// An owned RGBA bitmap, optionally paired with native handles.
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    native: Mutex<NativeCache>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("native", &*self.native_cache())
            .finish()
    }
}

impl Bitmap {
    /// Load a bitmap from any supported source.
    pub fn load(source: impl Into<BitmapSource>) -> Result<Self, ResourceLoadError> {
        match source.into() {
            BitmapSource::Path(path) => Self::from_path(path),
            BitmapSource::Encoded(bytes) => Self::from_encoded(&bytes),
            BitmapSource::Rgba {
                data,
                width,
                height,
            } => Self::from_rgba(data, width, height),
        }
    }

    /// Create a bitmap from raw RGBA8 pixels.
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self, ResourceLoadError> {
        if width == 0 || height == 0 {
            return Err(ResourceLoadError::InvalidDimensions { width, height });
        }

        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ResourceLoadError::BufferSize {
                expected,
                actual: rgba.len(),
            });
        }

        Ok(Bitmap {
            width,
            height,
            rgba,
            native: Mutex::default(),
        })
    }

    /// Decode an image file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResourceLoadError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|err| match err {
            image::ImageError::IoError(source) => ResourceLoadError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => ResourceLoadError::Decode(other),
        })?;

        let image = image.into_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba(image.into_raw(), width, height)
    }

    /// Decode an in-memory encoded image.
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, ResourceLoadError> {
        let image = image::load_from_memory(bytes)?.into_rgba8();
        let (width, height) = image.dimensions();
        Self::from_rgba(image.into_raw(), width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The RGBA8 pixel buffer.
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// RGBA8 pixels scaled to `width`x`height`. Returns a copy when the size already matches.
    pub fn resized_rgba(&self, width: u32, height: u32) -> Vec<u8> {
        if width == self.width && height == self.height {
            return self.rgba.clone();
        }

        match ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(self.width, self.height, &self.rgba[..]) {
            Some(view) => image::imageops::resize(&view, width, height, FilterType::Triangle)
                .into_raw(),
            // Unreachable: the buffer length is validated on construction.
            None => vec![0; width as usize * height as usize * 4],
        }
    }

    fn native_cache(&self) -> MutexGuard<'_, NativeCache> {
        self.native.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The raw native handle for `size`, if a backend has attached one.
    pub fn native(&self, size: (u32, u32)) -> Option<usize> {
        self.native_cache()
            .iter()
            .find(|(cached, _)| *cached == size)
            .map(|(_, native)| native.as_raw())
    }

    /// Return the raw native handle for `size`, creating it with `init` on first use.
    ///
    /// Handles for other sizes are kept, so a display scale change gets a fresh handle
    /// while the old one stays valid until the bitmap is dropped. If `init` fails no
    /// handle is stored and the next call retries.
    pub fn native_or_init<F>(&self, size: (u32, u32), init: F) -> Option<usize>
    where
        F: FnOnce(&Bitmap) -> Option<Box<dyn NativeBitmap>>,
    {
        let mut cache = self.native_cache();
        if let Some((_, native)) = cache.iter().find(|(cached, _)| *cached == size) {
            return Some(native.as_raw());
        }

        let created = init(self)?;
        let raw = created.as_raw();
        cache.push((size, created));
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct CountedHandle(Arc<AtomicUsize>);

    impl NativeBitmap for CountedHandle {
        fn as_raw(&self) -> usize {
            0xB17
        }
    }

    impl Drop for CountedHandle {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn red_pixels(width: u32, height: u32) -> Vec<u8> {
        [255, 0, 0, 255].repeat((width * height) as usize)
    }

    #[test]
    fn rgba_buffer_must_match_dimensions() {
        let err = Bitmap::from_rgba(vec![0; 15], 2, 2).unwrap_err();
        assert!(matches!(
            err,
            ResourceLoadError::BufferSize {
                expected: 16,
                actual: 15
            }
        ));
    }

    #[test]
    fn zero_sized_bitmap_is_rejected() {
        let err = Bitmap::from_rgba(Vec::new(), 0, 4).unwrap_err();
        assert!(matches!(
            err,
            ResourceLoadError::InvalidDimensions {
                width: 0,
                height: 4
            }
        ));
    }

    #[test]
    fn decodes_png_bytes() {
        let image = image::RgbaImage::from_raw(2, 3, red_pixels(2, 3)).unwrap();
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let bitmap = Bitmap::load(BitmapSource::Encoded(png)).unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (2, 3));
        assert_eq!(&bitmap.rgba()[0..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = Bitmap::from_encoded(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ResourceLoadError::Decode(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Bitmap::from_path("/nonexistent/cross_tray/icon.png").unwrap_err();
        match err {
            ResourceLoadError::Io { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/cross_tray/icon.png"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resize_produces_requested_size() {
        let bitmap = Bitmap::from_rgba(red_pixels(4, 4), 4, 4).unwrap();
        assert_eq!(bitmap.resized_rgba(2, 2).len(), 16);
        assert_eq!(bitmap.resized_rgba(4, 4), bitmap.rgba());
    }

    #[test]
    fn native_handle_is_created_once_and_released_with_bitmap() {
        let released = Arc::new(AtomicUsize::new(0));
        let created = AtomicUsize::new(0);
        let bitmap = Bitmap::from_rgba(red_pixels(1, 1), 1, 1).unwrap();

        for _ in 0..3 {
            let native = bitmap.native_or_init((16, 16), |_| {
                created.fetch_add(1, Ordering::SeqCst);
                Some(Box::new(CountedHandle(released.clone())))
            });
            assert_eq!(native, Some(0xB17));
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(bitmap);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_native_init_is_retried() {
        let bitmap = Bitmap::from_rgba(red_pixels(1, 1), 1, 1).unwrap();
        assert!(bitmap.native_or_init((16, 16), |_| None).is_none());
        assert!(bitmap.native((16, 16)).is_none());

        let released = Arc::new(AtomicUsize::new(0));
        assert!(
            bitmap
                .native_or_init((16, 16), |_| Some(Box::new(CountedHandle(released.clone()))))
                .is_some()
        );
        assert_eq!(bitmap.native((16, 16)), Some(0xB17));
    }

    #[test]
    fn each_size_gets_its_own_native_handle() {
        let released = Arc::new(AtomicUsize::new(0));
        let created = AtomicUsize::new(0);
        let bitmap = Bitmap::from_rgba(red_pixels(1, 1), 1, 1).unwrap();

        for size in [(16, 16), (24, 24), (16, 16), (24, 24)] {
            bitmap.native_or_init(size, |_| {
                created.fetch_add(1, Ordering::SeqCst);
                Some(Box::new(CountedHandle(released.clone())))
            });
        }

        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert!(bitmap.native((20, 20)).is_none());
        drop(bitmap);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
