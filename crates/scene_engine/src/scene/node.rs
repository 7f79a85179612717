//! Scene nodes
//!
//! Nodes are stored in the arena of the [`SceneGraph`](super::SceneGraph) that
//! created them and addressed by [`NodeKey`] handles. A node's parent link is a
//! plain handle, so the tree owns its nodes top-down and parents never own
//! children twice.

use std::cell::Cell;
use std::fmt;

use bitflags::bitflags;
use slotmap::new_key_type;

use crate::foundation::math::Mat4;
use crate::render::primitives::VertexGroup;
use crate::scene::Aabb;

new_key_type! {
    /// Handle to a node inside one scene graph's arena
    pub struct NodeKey;
}

/// Externally visible node identifier, unique among the members of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    /// Per-node behaviour flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Drawn by renderers; an invisible node hides its whole subtree
        const VISIBLE = 1 << 0;
        /// Takes part in collision queries
        const COLLIDABLE = 1 << 1;
        /// May be edited through the editor
        const MODIFIABLE = 1 << 2;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// A node of a scene graph
///
/// Build detached nodes with [`Node::new`] and the `with_*` methods, then hand
/// them to [`SceneGraph::insert_node`](super::SceneGraph::insert_node).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: Option<NodeId>,
    pub(crate) transformation: Mat4,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,
    pub(crate) flags: NodeFlags,
    pub(crate) model: Option<VertexGroup>,
    pub(crate) bounds: Cell<Option<Option<Aabb>>>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Create a detached node with identity transformation and all flags set
    pub fn new() -> Self {
        Self {
            id: None,
            transformation: Mat4::identity(),
            parent: None,
            children: Vec::new(),
            flags: NodeFlags::default(),
            model: None,
            bounds: Cell::new(None),
        }
    }

    /// Set the transformation relative to the parent
    pub fn with_transformation(mut self, transformation: Mat4) -> Self {
        self.transformation = transformation;
        self
    }

    /// Attach geometry
    pub fn with_model(mut self, model: VertexGroup) -> Self {
        self.model = Some(model);
        self
    }

    /// Replace the flags
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Identifier, `None` while the node is not a member of a graph
    pub const fn id(&self) -> Option<NodeId> {
        self.id
    }

    /// Transformation relative to the parent
    pub const fn transformation(&self) -> &Mat4 {
        &self.transformation
    }

    /// Parent handle, `None` for roots and detached nodes
    pub const fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    /// Child handles in insertion order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Whether the node has children
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Behaviour flags
    pub const fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Whether the node and its subtree are drawn
    pub const fn is_visible(&self) -> bool {
        self.flags.contains(NodeFlags::VISIBLE)
    }

    /// Whether the node takes part in collision queries
    pub const fn is_collidable(&self) -> bool {
        self.flags.contains(NodeFlags::COLLIDABLE)
    }

    /// Whether the node may be edited
    pub const fn is_modifiable(&self) -> bool {
        self.flags.contains(NodeFlags::MODIFIABLE)
    }

    /// Attached geometry
    pub const fn model(&self) -> Option<&VertexGroup> {
        self.model.as_ref()
    }
}
