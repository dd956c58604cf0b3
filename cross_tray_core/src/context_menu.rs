//! The shared owner of a tray's materialized context menu.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::menu::{CommandId, MenuItem};
use crate::registry::{Dispatch, IgnoreReason, Registry};
use crate::render::{MenuSurface, render};
use crate::tree::MenuTree;

/// A handle to the current context menu.
///
/// Clones share the same menu. Every operation holds the lock for its whole duration, so
/// a replacement never interleaves with a lookup and dispatch.
#[derive(Debug, Clone, Default)]
pub struct ContextMenu {
    registry: Arc<Mutex<Option<Registry>>>,
}

impl ContextMenu {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Registry>> {
        // A panicking action cannot leave the registry structurally invalid.
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build and materialize `items`, replacing the current menu.
    ///
    /// The previous registry, with its items and their bitmaps, is dropped while the
    /// lock is still held. Identifiers restart at 1.
    pub fn replace(&self, items: Vec<MenuItem>) {
        let registry = Registry::materialize(MenuTree::build(items));
        let mut guard = self.lock();
        let previous = guard.replace(registry);
        drop(previous);
        debug!("context menu replaced");
    }

    /// Drop the current menu.
    pub fn clear(&self) {
        let mut guard = self.lock();
        if guard.take().is_some() {
            debug!("context menu cleared");
        }
    }

    /// Render the current menu. Returns the number of root-level entries emitted, zero
    /// when there is no menu.
    pub fn render<S: MenuSurface>(&self, surface: &mut S) -> usize {
        match self.lock().as_ref() {
            Some(registry) => render(surface, registry),
            None => 0,
        }
    }

    /// Route a selected identifier to its item.
    ///
    /// The action runs with the lock held; it must not call back into this menu.
    pub fn dispatch(&self, id: CommandId) -> Dispatch {
        match self.lock().as_mut() {
            Some(registry) => registry.dispatch(id),
            None => {
                debug!(id, "ignoring menu command, no context menu installed");
                Dispatch::Ignored(IgnoreReason::Stale)
            }
        }
    }

    /// Run `f` against the item holding `id`, if any.
    pub fn with_item<R>(&self, id: CommandId, f: impl FnOnce(&MenuItem) -> R) -> Option<R> {
        self.lock().as_ref()?.get(id).map(f)
    }

    /// Number of identifiers in the current menu.
    pub fn len(&self) -> usize {
        self.lock().as_ref().map_or(0, Registry::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
