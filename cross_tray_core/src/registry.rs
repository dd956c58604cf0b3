//! Command identifier allocation and dispatch.
//!
//! [`Registry::materialize`] walks a [`MenuTree`] depth-first in pre-order and hands out
//! dense identifiers starting at 1. Separators are skipped and keep [`NO_COMMAND`];
//! every other node, popups included, gets the next identifier. The registry owns the
//! tree, so dropping it releases every item along with its bitmaps.

use tracing::{debug, trace};

use crate::menu::{CommandId, MenuItem, NO_COMMAND};
use crate::tree::{MenuTree, NodeId};

/// Maps command identifiers to arena nodes. Identifiers start from 1.
#[derive(Debug, Default)]
struct IdMap {
    nodes: Vec<NodeId>,
}

impl IdMap {
    fn insert(&mut self, node: NodeId) -> CommandId {
        let id = self.nodes.len() as CommandId + 1;
        self.nodes.push(node);
        id
    }

    fn get(&self, id: CommandId) -> Option<NodeId> {
        if id == NO_COMMAND {
            return None;
        }
        self.nodes.get((id - 1) as usize).copied()
    }
}

/// Why a dispatch did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The identifier was [`NO_COMMAND`].
    Sentinel,
    /// No item holds the identifier, e.g. it came from a menu that has since been replaced.
    Stale,
    /// The identifier belongs to a popup, which is never invoked.
    NotSelectable,
}

/// Outcome of [`Registry::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The item was resolved; `action` tells whether it had an action to run.
    Invoked { action: bool },
    Ignored(IgnoreReason),
}

/// The materialized menu: a tree plus its identifier table.
#[derive(Debug)]
pub struct Registry {
    tree: MenuTree,
    ids: IdMap,
}

impl Registry {
    /// Assign identifiers to every non-separator node of `tree`.
    ///
    /// # Panics
    ///
    /// Panics if a node already carries an identifier, which would mean the traversal
    /// visited it twice.
    pub fn materialize(mut tree: MenuTree) -> Self {
        let mut ids = IdMap::default();

        for node in tree.preorder() {
            let Some(item) = tree.get_mut(node) else {
                continue;
            };
            if item.is_separator() {
                continue;
            }

            assert_eq!(
                item.id(),
                NO_COMMAND,
                "menu node {node:?} was assigned an identifier twice"
            );
            let id = ids.insert(node);
            item.set_id(id);
        }

        debug!(nodes = tree.len(), ids = ids.nodes.len(), "materialized context menu");
        Registry { tree, ids }
    }

    pub fn tree(&self) -> &MenuTree {
        &self.tree
    }

    /// Number of assigned identifiers. Identifiers run from 1 to this value.
    pub fn len(&self) -> usize {
        self.ids.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.nodes.is_empty()
    }

    /// The node holding `id`.
    pub fn node_of(&self, id: CommandId) -> Option<NodeId> {
        self.ids.get(id)
    }

    pub fn get(&self, id: CommandId) -> Option<&MenuItem> {
        self.tree.get(self.ids.get(id)?)
    }

    pub fn get_mut(&mut self, id: CommandId) -> Option<&mut MenuItem> {
        let node = self.ids.get(id)?;
        self.tree.get_mut(node)
    }

    /// Route a selected identifier to its item.
    ///
    /// Checkable items are toggled before the action runs, so the action observes the
    /// new state. Unknown identifiers and non-selectable nodes are ignored.
    pub fn dispatch(&mut self, id: CommandId) -> Dispatch {
        if id == NO_COMMAND {
            trace!("ignoring empty menu selection");
            return Dispatch::Ignored(IgnoreReason::Sentinel);
        }

        let Some(item) = self.get_mut(id) else {
            debug!(id, "ignoring stale menu command");
            return Dispatch::Ignored(IgnoreReason::Stale);
        };

        if !item.is_selectable() {
            debug!(id, text = item.text(), "ignoring command for non-selectable item");
            return Dispatch::Ignored(IgnoreReason::NotSelectable);
        }

        if let Some(checked) = item.toggle() {
            trace!(id, checked, "toggled menu item");
        }

        let Some(action) = item.action().cloned() else {
            return Dispatch::Invoked { action: false };
        };

        trace!(id, text = item.text(), "invoking menu action");
        action(item);
        Dispatch::Invoked { action: true }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::menu::MenuItem;

    type Seen = Arc<Mutex<Vec<(String, Option<bool>)>>>;

    fn recording(seen: &Seen) -> impl Fn(&mut MenuItem) + Send + Sync + 'static {
        let seen = seen.clone();
        move |item: &mut MenuItem| {
            seen.lock()
                .unwrap()
                .push((item.text().to_string(), item.checked()))
        }
    }

    fn scenario(seen: &Seen) -> Registry {
        Registry::materialize(MenuTree::build(vec![
            MenuItem::simple("A", recording(seen)),
            MenuItem::popup(
                "B",
                vec![
                    MenuItem::simple("C", recording(seen)),
                    MenuItem::separator(),
                    MenuItem::checkable("D", false, recording(seen)),
                ],
            ),
        ]))
    }

    fn text_of(registry: &Registry, id: CommandId) -> &str {
        registry.get(id).unwrap().text()
    }

    #[test]
    fn identifiers_follow_preorder_and_skip_separators() {
        let seen = Seen::default();
        let registry = scenario(&seen);

        assert_eq!(registry.len(), 4);
        assert_eq!(text_of(&registry, 1), "A");
        assert_eq!(text_of(&registry, 2), "B");
        assert_eq!(text_of(&registry, 3), "C");
        assert_eq!(text_of(&registry, 4), "D");
        assert!(registry.get(5).is_none());

        let tree = registry.tree();
        let separator = tree.children(tree.roots()[1])[1];
        assert_eq!(tree.get(separator).unwrap().id(), NO_COMMAND);
    }

    #[test]
    fn identifiers_are_dense_and_unique() {
        let tree = MenuTree::build(vec![
            MenuItem::popup(
                "one",
                vec![
                    MenuItem::popup("two", vec![MenuItem::simple("three", |_| {})]),
                    MenuItem::separator(),
                    MenuItem::popup("empty", Vec::new()),
                ],
            ),
            MenuItem::separator(),
            MenuItem::checkable("four", true, |_| {}),
        ]);
        let registry = Registry::materialize(tree);

        let mut ids: Vec<CommandId> = registry
            .tree()
            .preorder()
            .into_iter()
            .filter_map(|n| registry.tree().get(n))
            .filter(|item| !item.is_separator())
            .map(MenuItem::id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=5).collect::<Vec<_>>());

        for id in 1..=5 {
            assert_eq!(registry.get(id).unwrap().id(), id);
        }
    }

    #[test]
    fn dispatch_toggles_before_invoking() {
        let seen = Seen::default();
        let mut registry = scenario(&seen);

        assert_eq!(registry.dispatch(4), Dispatch::Invoked { action: true });
        assert_eq!(registry.get(4).unwrap().checked(), Some(true));
        assert_eq!(*seen.lock().unwrap(), [("D".to_string(), Some(true))]);
    }

    #[test]
    fn toggling_n_times_follows_parity() {
        let seen = Seen::default();
        let mut registry = scenario(&seen);

        for n in 1..=7 {
            registry.dispatch(4);
            assert_eq!(registry.get(4).unwrap().checked(), Some(n % 2 == 1));
        }

        let observed: Vec<Option<bool>> = seen.lock().unwrap().iter().map(|(_, c)| *c).collect();
        assert_eq!(
            observed,
            [true, false, true, false, true, false, true].map(Some)
        );
    }

    #[test]
    fn stale_and_sentinel_ids_are_ignored() {
        let seen = Seen::default();
        let mut registry = scenario(&seen);

        assert_eq!(
            registry.dispatch(99),
            Dispatch::Ignored(IgnoreReason::Stale)
        );
        assert_eq!(
            registry.dispatch(NO_COMMAND),
            Dispatch::Ignored(IgnoreReason::Sentinel)
        );
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(registry.get(4).unwrap().checked(), Some(false));
    }

    #[test]
    fn popup_ids_are_not_invoked() {
        let seen = Seen::default();
        let mut registry = scenario(&seen);

        assert_eq!(
            registry.dispatch(2),
            Dispatch::Ignored(IgnoreReason::NotSelectable)
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn action_can_mutate_its_own_item() {
        let mut registry = Registry::materialize(MenuTree::build(vec![MenuItem::simple(
            "Run once",
            |item| {
                item.set_enabled(false);
                item.set_text("Already ran");
            },
        )]));

        registry.dispatch(1);
        let item = registry.get(1).unwrap();
        assert!(!item.is_enabled());
        assert_eq!(item.text(), "Already ran");
    }

    #[test]
    fn item_without_action_still_toggles() {
        let mut registry = Registry::materialize(MenuTree::build(vec![
            MenuItem::checkable("Quiet", false, |_| {}).without_action(),
        ]));

        assert_eq!(registry.dispatch(1), Dispatch::Invoked { action: false });
        assert_eq!(registry.get(1).unwrap().checked(), Some(true));
    }

    #[test]
    fn rematerializing_restarts_at_one() {
        let seen = Seen::default();
        let first = scenario(&seen);
        assert_eq!(first.len(), 4);
        drop(first);

        let second =
            Registry::materialize(MenuTree::build(vec![MenuItem::simple("Only", |_| {})]));
        assert_eq!(second.node_of(1), Some(second.tree().roots()[0]));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn empty_popup_still_gets_an_identifier() {
        let registry =
            Registry::materialize(MenuTree::build(vec![MenuItem::popup("Nothing", Vec::new())]));
        assert_eq!(registry.get(1).unwrap().text(), "Nothing");
    }
}
