//! Arena-backed menu forest.
//!
//! Children are owned by the arena and referenced by [`NodeId`]; the parent link is a
//! plain index, so there is no ownership cycle between a popup and its children.

use std::fmt;

use crate::menu::MenuItem;

/// Index of a node inside a [`MenuTree`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Convert the `NodeId` into the underlying arena index.
    pub const fn into_raw(self) -> usize {
        self.0
    }

    /// Construct a `NodeId` from an arena index.
    ///
    /// This should only be called with integers returned from [`NodeId::into_raw`].
    pub const fn from_raw(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, fmtr: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmtr)
    }
}

#[derive(Debug)]
struct Node {
    item: MenuItem,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A forest of menu items in declaration order.
#[derive(Debug, Default)]
pub struct MenuTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl MenuTree {
    /// Build a forest from root-level declarations, taking ownership of every item.
    ///
    /// Popup children are moved into the arena and linked to their parent. No command
    /// identifiers are assigned and no native resources are touched.
    pub fn build(items: Vec<MenuItem>) -> Self {
        let mut tree = MenuTree::default();
        for item in items {
            let node = tree.insert(item, None);
            tree.roots.push(node);
        }
        tree
    }

    fn insert(&mut self, mut item: MenuItem, parent: Option<NodeId>) -> NodeId {
        let children = item.take_children();
        let node = NodeId(self.nodes.len());
        self.nodes.push(Node {
            item,
            parent,
            children: Vec::with_capacity(children.len()),
        });

        for child in children {
            let child = self.insert(child, Some(node));
            self.nodes[node.0].children.push(child);
        }

        node
    }

    /// Root-level nodes in declaration order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of nodes in the whole forest.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeId) -> Option<&MenuItem> {
        self.nodes.get(node.0).map(|n| &n.item)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut MenuItem> {
        self.nodes.get_mut(node.0).map(|n| &mut n.item)
    }

    /// The popup containing `node`, or `None` for a root.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Children of `node` in declaration order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// All nodes, depth-first pre-order, siblings in declaration order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> MenuItem {
        MenuItem::simple(text, |_| {})
    }

    fn sample() -> MenuTree {
        MenuTree::build(vec![
            item("A"),
            MenuItem::popup(
                "B",
                vec![
                    item("C"),
                    MenuItem::popup("E", vec![item("F")]),
                    MenuItem::separator(),
                ],
            ),
            item("G"),
        ])
    }

    fn texts(tree: &MenuTree, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|&n| tree.get(n).unwrap().text().to_string())
            .collect()
    }

    #[test]
    fn roots_keep_declaration_order() {
        let tree = sample();
        assert_eq!(texts(&tree, tree.roots()), ["A", "B", "G"]);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn preorder_visits_children_before_next_sibling() {
        let tree = sample();
        assert_eq!(
            texts(&tree, &tree.preorder()),
            ["A", "B", "C", "E", "F", "", "G"]
        );
    }

    #[test]
    fn every_child_is_listed_by_its_parent() {
        let tree = sample();
        for node in tree.preorder() {
            match tree.parent(node) {
                Some(parent) => assert!(tree.children(parent).contains(&node)),
                None => assert!(tree.roots().contains(&node)),
            }
        }
    }

    #[test]
    fn popup_children_move_into_arena() {
        let tree = sample();
        let popup = tree.roots()[1];
        assert!(tree.get(popup).unwrap().children().is_empty());
        assert_eq!(tree.children(popup).len(), 3);
    }

    #[test]
    fn building_assigns_no_identifiers() {
        let tree = sample();
        assert!(tree.preorder().iter().all(|&n| tree.get(n).unwrap().id() == 0));
    }

    #[test]
    fn empty_forest() {
        let tree = MenuTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.preorder().is_empty());
        assert!(tree.get(NodeId::from_raw(0)).is_none());
        assert!(tree.children(NodeId::from_raw(3)).is_empty());
    }
}
