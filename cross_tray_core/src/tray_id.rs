use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Identifier of a tray icon. Unique for each tray icon in the process.
///
/// Can be obtained with `TrayIcon::id`. Every event a tray reports is paired with its
/// `TrayId`, so one receiver can serve several icons.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrayId(usize);

impl TrayId {
    /// Allocate an identifier not handed out before in this process.
    pub fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Convert the `TrayId` into the underlying integer.
    ///
    /// This is useful if you need to pass the ID across an FFI boundary, or store it in an atomic.
    pub const fn into_raw(self) -> usize {
        self.0
    }

    /// Construct a `TrayId` from the underlying integer.
    ///
    /// This should only be called with integers returned from [`TrayId::into_raw`].
    pub const fn from_raw(id: usize) -> Self {
        Self(id)
    }
}

impl fmt::Debug for TrayId {
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmtr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TrayId::next();
        let b = TrayId::next();
        assert_ne!(a, b);
        assert_eq!(TrayId::from_raw(a.into_raw()), a);
    }
}
