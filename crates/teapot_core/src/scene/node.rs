//! Scene graph nodes
//!
//! The hierarchy is a tree of exclusively owned nodes. A [`GroupNode`] places
//! its children with one transform (or a looping sequence of them); a
//! [`ShapeNode`] holds the geometry batches. Traversals go through
//! [`SceneVisitor`], which lets each visitor decide how to descend.

use std::sync::Arc;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::foundation::math::Mat4;
use crate::spatial::Aabb;

use super::{Geometry, Material, PrimitiveType};

new_key_type! {
    /// Handle to a top-level node owned by a [`super::Scene`]
    pub struct NodeId;
}

bitflags! {
    /// Per-node display state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Skipped by rendering, picking and scene bounds
        const INVISIBLE = 0x1;
        /// Picked by the user
        const SELECTED = 0x2;
        /// Emphasized by the host (hover etc.)
        const HIGHLIGHTED = 0x4;
    }
}

/// Location of a node: the top-level handle plus child indices below it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    /// Top-level node
    pub root: NodeId,
    /// Child index at each group level
    pub indices: Vec<usize>,
}

impl NodePath {
    /// Path to a top-level node itself
    #[must_use]
    pub const fn top(root: NodeId) -> Self {
        Self { root, indices: Vec::new() }
    }
}

/// Double-dispatch target for scene graph traversals
pub trait SceneVisitor {
    /// Error type propagated out of the traversal
    type Error;

    /// Called for every group reached
    ///
    /// # Errors
    /// Whatever the visitor reports; traversal stops at the first error.
    fn visit_group(&mut self, group: &GroupNode) -> Result<(), Self::Error>;

    /// Called for every shape reached
    ///
    /// # Errors
    /// Whatever the visitor reports; traversal stops at the first error.
    fn visit_shape(&mut self, shape: &ShapeNode) -> Result<(), Self::Error>;
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Transform node with children
    Group(GroupNode),
    /// Geometry leaf
    Shape(ShapeNode),
}

/// A node of the scene hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    flags: NodeFlags,
    kind: NodeKind,
}

impl SceneNode {
    /// Wrap a group
    #[must_use]
    pub fn group(group: GroupNode) -> Self {
        Self { flags: NodeFlags::empty(), kind: NodeKind::Group(group) }
    }

    /// Wrap a shape
    #[must_use]
    pub fn shape(shape: ShapeNode) -> Self {
        Self { flags: NodeFlags::empty(), kind: NodeKind::Shape(shape) }
    }

    /// Display flags
    #[must_use]
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Mutable display flags
    pub fn flags_mut(&mut self) -> &mut NodeFlags {
        &mut self.flags
    }

    /// Builder: start with the given flags
    #[must_use]
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// False if flagged invisible
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.flags.contains(NodeFlags::INVISIBLE)
    }

    /// Payload
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable payload; group and shape mutators keep their bounds current
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Group payload, if any
    #[must_use]
    pub const fn as_group(&self) -> Option<&GroupNode> {
        match &self.kind {
            NodeKind::Group(g) => Some(g),
            NodeKind::Shape(_) => None,
        }
    }

    /// Shape payload, if any
    #[must_use]
    pub const fn as_shape(&self) -> Option<&ShapeNode> {
        match &self.kind {
            NodeKind::Shape(s) => Some(s),
            NodeKind::Group(_) => None,
        }
    }

    /// Bounds in the parent's coordinate system
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        match &self.kind {
            NodeKind::Group(g) => g.bounds(),
            NodeKind::Shape(s) => s.bounds(),
        }
    }

    /// True if any group at or below this node loops through several transforms
    #[must_use]
    pub fn is_animated(&self) -> bool {
        match &self.kind {
            NodeKind::Group(g) => g.is_animated(),
            NodeKind::Shape(_) => false,
        }
    }

    /// Dispatch to the matching visitor method
    ///
    /// # Errors
    /// Propagates the visitor's error.
    pub fn accept<V: SceneVisitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        match &self.kind {
            NodeKind::Group(g) => visitor.visit_group(g),
            NodeKind::Shape(s) => visitor.visit_shape(s),
        }
    }

    /// Descendant at `indices` (empty slice: this node)
    #[must_use]
    pub fn descendant(&self, indices: &[usize]) -> Option<&Self> {
        let Some((first, rest)) = indices.split_first() else {
            return Some(self);
        };
        self.as_group()?.child(*first)?.descendant(rest)
    }

    /// Flags of the descendant at `indices`
    pub fn descendant_flags_mut(&mut self, indices: &[usize]) -> Option<&mut NodeFlags> {
        let Some((first, rest)) = indices.split_first() else {
            return Some(&mut self.flags);
        };
        match &mut self.kind {
            NodeKind::Group(g) => g.children.get_mut(*first)?.descendant_flags_mut(rest),
            NodeKind::Shape(_) => None,
        }
    }

    /// Apply `f` to the flags of this node and every descendant
    pub fn for_each_flags_mut(&mut self, f: &mut impl FnMut(&mut NodeFlags)) {
        f(&mut self.flags);
        if let NodeKind::Group(g) = &mut self.kind {
            for child in &mut g.children {
                child.for_each_flags_mut(f);
            }
        }
    }
}

impl From<GroupNode> for SceneNode {
    fn from(group: GroupNode) -> Self {
        Self::group(group)
    }
}

impl From<ShapeNode> for SceneNode {
    fn from(shape: ShapeNode) -> Self {
        Self::shape(shape)
    }
}

/// Transform node owning an ordered child list
///
/// The transform is a non-empty sequence; `transform(t)` picks entry
/// `t mod len`, so a single entry is a static transform.
#[derive(Debug, Clone)]
pub struct GroupNode {
    children: Vec<SceneNode>,
    transforms: Vec<Mat4>,
    bounds: Aabb,
}

impl Default for GroupNode {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupNode {
    /// Empty group with identity transform
    #[must_use]
    pub fn new() -> Self {
        Self::with_transform(Mat4::identity())
    }

    /// Empty group with a static transform
    #[must_use]
    pub fn with_transform(transform: Mat4) -> Self {
        Self {
            children: Vec::new(),
            transforms: vec![transform],
            bounds: Aabb::empty(),
        }
    }

    /// Empty group looping through `frames`; an empty list means identity
    #[must_use]
    pub fn with_animation(frames: Vec<Mat4>) -> Self {
        let mut group = Self::new();
        group.set_animation(frames);
        group
    }

    /// Builder: append children
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = SceneNode>) -> Self {
        self.children.extend(children);
        self.recompute_bounds();
        self
    }

    /// Transform for animation tick `tick`
    #[must_use]
    pub fn transform(&self, tick: usize) -> &Mat4 {
        &self.transforms[tick % self.transforms.len()]
    }

    /// The whole transform sequence
    #[must_use]
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Replace the sequence with one static transform
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transforms = vec![transform];
        self.recompute_bounds();
    }

    /// Replace the sequence; an empty list means identity
    pub fn set_animation(&mut self, frames: Vec<Mat4>) {
        self.transforms = if frames.is_empty() { vec![Mat4::identity()] } else { frames };
        self.recompute_bounds();
    }

    /// True if this group or any descendant group has more than one frame
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.transforms.len() > 1 || self.children.iter().any(SceneNode::is_animated)
    }

    /// Children in order
    #[must_use]
    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Child at `index`
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&SceneNode> {
        self.children.get(index)
    }

    /// Append a child and return its index
    pub fn add_child(&mut self, child: SceneNode) -> usize {
        self.children.push(child);
        self.recompute_bounds();
        self.children.len() - 1
    }

    /// Detach the child at `index`
    pub fn remove_child(&mut self, index: usize) -> Option<SceneNode> {
        if index >= self.children.len() {
            return None;
        }
        let child = self.children.remove(index);
        self.recompute_bounds();
        Some(child)
    }

    /// Mutate a child, then refresh this group's bounds
    pub fn modify_child<R>(&mut self, index: usize, f: impl FnOnce(&mut SceneNode) -> R) -> Option<R> {
        let result = f(self.children.get_mut(index)?);
        self.recompute_bounds();
        Some(result)
    }

    /// Union of the children's boxes under every frame of the sequence
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    fn recompute_bounds(&mut self) {
        let mut bounds = Aabb::empty();
        for transform in &self.transforms {
            for child in &self.children {
                let b = child.bounds();
                if b.is_valid() {
                    bounds.merge(&b.transformed(transform));
                }
            }
        }
        self.bounds = bounds;
    }
}

/// Material and geometry of one batch
#[derive(Debug, Clone)]
pub struct Batch {
    /// Shared material; identity is part of the batch key
    pub material: Arc<Material>,
    /// Geometry drawn with it
    pub geometry: Arc<Geometry>,
}

/// Leaf holding geometry batches keyed by (material, primitive type)
#[derive(Debug, Clone, Default)]
pub struct ShapeNode {
    batches: Vec<Batch>,
    bounds: Aabb,
}

impl ShapeNode {
    /// Empty shape
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add one batch
    #[must_use]
    pub fn with_geometry(mut self, material: Arc<Material>, geometry: impl Into<Arc<Geometry>>) -> Self {
        self.add_geometry(material, geometry);
        self
    }

    /// Add a batch, replacing an existing one with the same material handle
    /// and primitive type
    ///
    /// Returns the replaced geometry.
    pub fn add_geometry(&mut self, material: Arc<Material>, geometry: impl Into<Arc<Geometry>>) -> Option<Arc<Geometry>> {
        let geometry = geometry.into();
        let key = (Arc::as_ptr(&material), geometry.primitive());
        let replaced = match self.position(key.0, key.1) {
            Some(pos) => {
                log::warn!("Replacing {:?} batch of an existing material", key.1);
                Some(std::mem::replace(&mut self.batches[pos].geometry, geometry))
            }
            None => {
                self.batches.push(Batch { material, geometry });
                None
            }
        };
        self.recompute_bounds();
        replaced
    }

    /// Remove the batch for a material handle and primitive type
    pub fn remove_geometry(&mut self, material: &Arc<Material>, primitive: PrimitiveType) -> Option<Arc<Geometry>> {
        let pos = self.position(Arc::as_ptr(material), primitive)?;
        let batch = self.batches.remove(pos);
        self.recompute_bounds();
        Some(batch.geometry)
    }

    /// Swap every replaceable material for `material`
    ///
    /// Batches that end up sharing a key are merged, the later one winning.
    pub fn replace_materials(&mut self, material: &Arc<Material>) {
        let old = std::mem::take(&mut self.batches);
        for batch in old {
            let target = if batch.material.replaceable {
                Arc::clone(material)
            } else {
                batch.material
            };
            let key = (Arc::as_ptr(&target), batch.geometry.primitive());
            match self.position(key.0, key.1) {
                Some(pos) => self.batches[pos].geometry = batch.geometry,
                None => self.batches.push(Batch { material: target, geometry: batch.geometry }),
            }
        }
        self.recompute_bounds();
    }

    fn position(&self, material: *const Material, primitive: PrimitiveType) -> Option<usize> {
        self.batches
            .iter()
            .position(|b| Arc::as_ptr(&b.material) == material && b.geometry.primitive() == primitive)
    }

    /// Batches; order is unspecified
    #[must_use]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Number of batches
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// True if the shape holds no batches
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Union of the batch boxes in object space
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    fn recompute_bounds(&mut self) {
        self.bounds = self
            .batches
            .iter()
            .map(|b| *b.geometry.bounds())
            .fold(Aabb::empty(), |acc, b| acc.union(&b));
    }
}
