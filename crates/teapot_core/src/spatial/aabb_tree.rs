//! AABB tree spatial partitioning structure
//!
//! A binary tree over a fixed root box. Each tree node splits its box at the
//! midpoint of the longest axis; an item descends into a half only if it fits
//! there completely, otherwise it stays in the local list of the deepest node
//! that contains it. A half gets its own child once more than
//! [`AabbTreeConfig::split_threshold`] items are waiting for it.
//!
//! A reverse map from item key to owning tree node makes removal O(local list)
//! instead of a tree search.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use super::Aabb;

new_key_type! {
    /// Handle to a node inside an [`AabbTree`]
    pub struct TreeNodeId;
}

/// Configuration for AABB tree behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AabbTreeConfig {
    /// Items waiting for one half before that half gets a child node
    pub split_threshold: usize,
}

impl Default for AabbTreeConfig {
    fn default() -> Self {
        Self { split_threshold: 7 }
    }
}

/// Single node in the tree hierarchy
#[derive(Debug, Clone)]
pub struct TreeNode<K> {
    bounds: Aabb,
    items: Vec<(K, Aabb)>,
    left: Option<TreeNodeId>,
    right: Option<TreeNodeId>,
    parent: Option<TreeNodeId>,
}

impl<K> TreeNode<K> {
    fn new(bounds: Aabb, parent: Option<TreeNodeId>) -> Self {
        Self {
            bounds,
            items: Vec::new(),
            left: None,
            right: None,
            parent,
        }
    }

    /// World-space bounds of this node
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Items stored directly in this node
    pub fn items(&self) -> &[(K, Aabb)] {
        &self.items
    }

    /// Child covering the lower half of the split axis
    pub const fn left(&self) -> Option<TreeNodeId> {
        self.left
    }

    /// Child covering the upper half of the split axis
    pub const fn right(&self) -> Option<TreeNodeId> {
        self.right
    }

    /// Parent link; `None` for the root
    pub const fn parent(&self) -> Option<TreeNodeId> {
        self.parent
    }

    /// Existing children, left first
    pub fn children(&self) -> impl Iterator<Item = TreeNodeId> {
        self.left.into_iter().chain(self.right)
    }

    /// Check if this node is a leaf (has no children)
    pub const fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Which half of a split a child covers
#[derive(Debug, Clone, Copy)]
enum Half {
    Lower,
    Upper,
}

/// AABB tree keyed by item handles
#[derive(Debug, Clone)]
pub struct AabbTree<K: Copy + Eq + Hash> {
    nodes: SlotMap<TreeNodeId, TreeNode<K>>,
    root: TreeNodeId,
    owners: HashMap<K, TreeNodeId>,
    config: AabbTreeConfig,
}

impl<K: Copy + Eq + Hash> AabbTree<K> {
    /// Create an empty tree covering `bounds`
    pub fn new(bounds: Aabb, config: AabbTreeConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(TreeNode::new(bounds, None));
        Self {
            nodes,
            root,
            owners: HashMap::new(),
            config,
        }
    }

    /// Build a tree over `bounds` from a batch of items
    ///
    /// Items that do not fit the root box are kept in the root's local list.
    pub fn build<I>(bounds: Aabb, items: I, config: AabbTreeConfig) -> Self
    where
        I: IntoIterator<Item = (K, Aabb)>,
    {
        let mut tree = Self::new(bounds, config);
        let items: Vec<_> = items.into_iter().collect();
        let count = items.len();
        tree.subdivide(tree.root, items);
        log::debug!(
            "Built AABB tree: {count} items in {} nodes, depth {}",
            tree.nodes.len(),
            tree.depth()
        );
        tree
    }

    /// Root node handle
    pub const fn root(&self) -> TreeNodeId {
        self.root
    }

    /// Access a tree node
    pub fn node(&self, id: TreeNodeId) -> Option<&TreeNode<K>> {
        self.nodes.get(id)
    }

    /// Bounds of the root node
    pub fn bounds(&self) -> &Aabb {
        &self.nodes[self.root].bounds
    }

    /// Configuration in use
    pub const fn config(&self) -> &AabbTreeConfig {
        &self.config
    }

    /// Number of items stored
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// True if no items are stored
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Number of tree nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Tree node whose local list holds `key`
    pub fn owner_of(&self, key: &K) -> Option<TreeNodeId> {
        self.owners.get(key).copied()
    }

    /// Check if an item is stored
    pub fn contains(&self, key: &K) -> bool {
        self.owners.contains_key(key)
    }

    /// Bounds recorded for an item
    pub fn item_bounds(&self, key: &K) -> Option<&Aabb> {
        let owner = self.owners.get(key)?;
        self.nodes[*owner]
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, b)| b)
    }

    /// Longest root-to-leaf edge count; a lone root has depth 0
    pub fn depth(&self) -> usize {
        self.depth_from(self.root)
    }

    fn depth_from(&self, id: TreeNodeId) -> usize {
        self.nodes[id]
            .children()
            .map(|child| 1 + self.depth_from(child))
            .max()
            .unwrap_or(0)
    }

    /// All stored items in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &(K, Aabb)> {
        self.nodes.values().flat_map(|node| node.items.iter())
    }

    /// Insert an item
    ///
    /// Fails (returns `false`) when a valid box does not fit inside the root.
    /// Invalid boxes are always accepted and stay in the root's local list.
    /// A local list pushed past the split threshold is re-subdivided, which
    /// can move other items to new owners.
    pub fn insert(&mut self, key: K, bounds: Aabb) -> bool {
        debug_assert!(!self.owners.contains_key(&key), "item inserted twice");
        self.insert_at(self.root, key, bounds)
    }

    fn insert_at(&mut self, id: TreeNodeId, key: K, bounds: Aabb) -> bool {
        let node = &self.nodes[id];
        if bounds.is_valid() {
            if !node.bounds.contains(&bounds) {
                return false;
            }
            // Right child first, then left
            for child in [node.right, node.left].into_iter().flatten() {
                if self.nodes[child].bounds.contains(&bounds) {
                    return self.insert_at(child, key, bounds);
                }
            }
        }

        self.attach(id, key, bounds);

        if self.nodes[id].items.len() > self.config.split_threshold {
            let items = std::mem::take(&mut self.nodes[id].items);
            for (k, _) in &items {
                self.owners.remove(k);
            }
            log::debug!("Re-subdividing overflowing tree node with {} items", items.len());
            self.subdivide(id, items);
        }
        true
    }

    fn attach(&mut self, id: TreeNodeId, key: K, bounds: Aabb) {
        self.nodes[id].items.push((key, bounds));
        self.owners.insert(key, id);
    }

    /// Distribute `candidates` over node `id` and its halves
    fn subdivide(&mut self, id: TreeNodeId, candidates: Vec<(K, Aabb)>) {
        let (lower, upper) = self.nodes[id].bounds.split();

        let mut local = Vec::new();
        let mut pending_lower = Vec::new();
        let mut pending_upper = Vec::new();
        for (key, bounds) in candidates {
            if !bounds.is_valid() {
                local.push((key, bounds));
            } else if lower.contains(&bounds) {
                pending_lower.push((key, bounds));
            } else if upper.contains(&bounds) {
                pending_upper.push((key, bounds));
            } else {
                local.push((key, bounds));
            }
        }

        for (key, bounds) in local {
            self.attach(id, key, bounds);
        }
        self.distribute(id, Half::Lower, lower, pending_lower);
        self.distribute(id, Half::Upper, upper, pending_upper);
    }

    fn distribute(&mut self, id: TreeNodeId, half: Half, bounds: Aabb, pending: Vec<(K, Aabb)>) {
        let existing = match half {
            Half::Lower => self.nodes[id].left,
            Half::Upper => self.nodes[id].right,
        };

        if let Some(child) = existing {
            for (key, b) in pending {
                self.insert_at(child, key, b);
            }
        } else if pending.len() > self.config.split_threshold {
            let child = self.nodes.insert(TreeNode::new(bounds, Some(id)));
            match half {
                Half::Lower => self.nodes[id].left = Some(child),
                Half::Upper => self.nodes[id].right = Some(child),
            }
            self.subdivide(child, pending);
        } else {
            for (key, b) in pending {
                self.attach(id, key, b);
            }
        }
    }

    /// Remove an item
    ///
    /// A non-root owner left without items and children is detached from its
    /// parent. A re-subdivision triggered by the matching insert is not
    /// undone. Returns `false` if the item was not stored.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(owner) = self.owners.remove(key) else {
            debug_assert!(false, "removing an item that is not in the tree");
            return false;
        };

        let node = &mut self.nodes[owner];
        if let Some(pos) = node.items.iter().position(|(k, _)| k == key) {
            node.items.remove(pos);
        }

        if owner != self.root && node.items.is_empty() && node.is_leaf() {
            if let Some(parent) = node.parent {
                let parent = &mut self.nodes[parent];
                if parent.left == Some(owner) {
                    parent.left = None;
                } else if parent.right == Some(owner) {
                    parent.right = None;
                }
            }
            self.nodes.remove(owner);
        }
        true
    }

    /// Move an item to a new box
    ///
    /// Returns `false` when the new box does not fit the root; the item is
    /// left untouched and the caller has to rebuild the tree.
    pub fn update(&mut self, key: K, bounds: Aabb) -> bool {
        if bounds.is_valid() && !self.bounds().contains(&bounds) {
            return false;
        }
        if self.owners.contains_key(&key) {
            self.remove(&key);
        }
        self.insert(key, bounds)
    }

    /// Drop every item and child, keeping the root box
    pub fn clear(&mut self) {
        let bounds = *self.bounds();
        *self = Self::new(bounds, self.config);
    }

    /// Verify the structural invariants
    ///
    /// Every item is reachable exactly once, the reverse map points at its
    /// holder, valid item boxes lie inside their holder, child boxes lie
    /// inside their parent and parent links match.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                return false;
            };
            for (key, bounds) in &node.items {
                seen += 1;
                if self.owners.get(key) != Some(&id) {
                    return false;
                }
                if bounds.is_valid() && !node.bounds.contains(bounds) {
                    return false;
                }
            }
            for child in node.children() {
                let Some(child_node) = self.nodes.get(child) else {
                    return false;
                };
                if child_node.parent != Some(id) || !node.bounds.contains(&child_node.bounds) {
                    return false;
                }
                stack.push(child);
            }
        }
        seen == self.owners.len() && seen == self.iter().count()
    }
}
