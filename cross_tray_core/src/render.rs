//! Rendering a materialized menu onto a menu surface.
//!
//! A [`MenuSurface`] is whatever the backend displays: a Win32 popup menu, or a
//! [`MenuSnapshot`] when the structure only needs to be inspected. Rendering reads the
//! registry and never mutates it.

use crate::menu::{CommandId, Decoration, MenuItemKind};
use crate::registry::Registry;
use crate::tree::{MenuTree, NodeId};

/// One selectable row handed to a surface.
#[derive(Debug, Clone, Copy)]
pub struct MenuRow<'a> {
    pub text: &'a str,
    pub id: CommandId,
    pub enabled: bool,
    /// `None` for rows that are not checkable.
    pub checked: Option<bool>,
    pub decoration: Decoration<'a>,
}

/// Something a menu can be drawn onto.
pub trait MenuSurface: Sized {
    /// Append a selectable row.
    fn add_row(&mut self, row: MenuRow<'_>);

    /// Append a non-selectable divider.
    fn add_separator(&mut self);

    /// Create an empty surface for a submenu. It is filled, then handed back through
    /// [`MenuSurface::append_submenu`].
    fn create_submenu(&mut self) -> Self;

    /// Attach a filled submenu under `text`.
    fn append_submenu(&mut self, text: &str, enabled: bool, submenu: Self);
}

/// Render the root-level entries of `registry` onto `surface`.
///
/// Popups without children are omitted. Returns the number of root-level entries
/// emitted, so zero means there is nothing to show.
pub fn render<S: MenuSurface>(surface: &mut S, registry: &Registry) -> usize {
    let tree = registry.tree();
    render_nodes(surface, tree, tree.roots())
}

fn render_nodes<S: MenuSurface>(surface: &mut S, tree: &MenuTree, nodes: &[NodeId]) -> usize {
    let mut emitted = 0;

    for &node in nodes {
        let Some(item) = tree.get(node) else {
            continue;
        };

        match item.kind() {
            MenuItemKind::Separator => surface.add_separator(),
            MenuItemKind::Popup { .. } => {
                let children = tree.children(node);
                if children.is_empty() {
                    continue;
                }

                let mut submenu = surface.create_submenu();
                render_nodes(&mut submenu, tree, children);
                surface.append_submenu(item.text(), item.is_enabled(), submenu);
            }
            _ => surface.add_row(MenuRow {
                text: item.text(),
                id: item.id(),
                enabled: item.is_enabled(),
                checked: item.checked(),
                decoration: item.decoration(),
            }),
        }

        emitted += 1;
    }

    emitted
}

/// Which bitmaps a snapshot row carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDecoration {
    None,
    /// Width and height of the icon bitmap.
    Icon(u32, u32),
    CheckMarks,
}

/// A rendered entry captured by [`MenuSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotEntry {
    Row {
        text: String,
        id: CommandId,
        enabled: bool,
        checked: Option<bool>,
        decoration: SnapshotDecoration,
    },
    Separator,
    Submenu {
        text: String,
        enabled: bool,
        entries: Vec<SnapshotEntry>,
    },
}

/// A surface that records the menu structure instead of displaying it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl MenuSnapshot {
    /// Render `registry` into a new snapshot.
    pub fn of(registry: &Registry) -> Self {
        let mut snapshot = MenuSnapshot::default();
        render(&mut snapshot, registry);
        snapshot
    }

    /// Identifiers of every row, depth-first.
    pub fn row_ids(&self) -> Vec<CommandId> {
        fn collect(entries: &[SnapshotEntry], ids: &mut Vec<CommandId>) {
            for entry in entries {
                match entry {
                    SnapshotEntry::Row { id, .. } => ids.push(*id),
                    SnapshotEntry::Submenu { entries, .. } => collect(entries, ids),
                    SnapshotEntry::Separator => {}
                }
            }
        }

        let mut ids = Vec::new();
        collect(&self.entries, &mut ids);
        ids
    }
}

impl MenuSurface for MenuSnapshot {
    fn add_row(&mut self, row: MenuRow<'_>) {
        let decoration = match row.decoration {
            Decoration::None => SnapshotDecoration::None,
            Decoration::Icon(bitmap) => SnapshotDecoration::Icon(bitmap.width(), bitmap.height()),
            Decoration::CheckMarks { .. } => SnapshotDecoration::CheckMarks,
        };

        self.entries.push(SnapshotEntry::Row {
            text: row.text.to_string(),
            id: row.id,
            enabled: row.enabled,
            checked: row.checked,
            decoration,
        });
    }

    fn add_separator(&mut self) {
        self.entries.push(SnapshotEntry::Separator);
    }

    fn create_submenu(&mut self) -> Self {
        MenuSnapshot::default()
    }

    fn append_submenu(&mut self, text: &str, enabled: bool, submenu: Self) {
        self.entries.push(SnapshotEntry::Submenu {
            text: text.to_string(),
            enabled,
            entries: submenu.entries,
        });
    }
}
