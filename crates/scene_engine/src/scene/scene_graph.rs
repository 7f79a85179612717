//! # Scene Graph
//!
//! A rooted tree of [`Node`]s stored in a slot-map arena. The graph owns every
//! node it created, including detached subtrees that are not (or no longer)
//! reachable from the root.
//!
//! ## Invariants
//! - Every member (node reachable from the root) has an id, unique within the
//!   graph, and `get_node(id)` finds it in O(1).
//! - Detached nodes have no id.
//! - Parent links are acyclic: attaching a node under itself or one of its
//!   successors is rejected.
//! - `subgraph_roots()` lists, in attachment order, the subtrees attached
//!   directly under the root.
//!
//! ## Design
//! Parent links are arena handles rather than references, so removing a
//! subtree is an unlink plus an unindex, and the detached tree stays intact
//! for later re-attachment.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::SlotMap;

use crate::error::{EngineError, EngineResult};
use crate::foundation::math::Mat4;
use crate::render::primitives::VertexGroup;
use crate::scene::{Aabb, Node, NodeFlags, NodeId, NodeKey};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(u64);

/// A node named across graphs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Graph owning the node
    pub graph: GraphId,
    /// Node handle within that graph
    pub node: NodeKey,
}

/// Hierarchical scene graph
#[derive(Debug)]
pub struct SceneGraph {
    id: GraphId,
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
    subgraph_roots: Vec<NodeKey>,
    index: HashMap<NodeId, NodeKey>,
    next_id: u32,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph holding only its root, which gets id 0
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root_node = Node::new();
        root_node.id = Some(NodeId(0));
        let root = nodes.insert(root_node);

        let mut index = HashMap::new();
        index.insert(NodeId(0), root);

        Self {
            id: GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed)),
            nodes,
            root,
            subgraph_roots: Vec::new(),
            index,
            next_id: 1,
        }
    }

    /// Identity of this graph
    pub const fn id(&self) -> GraphId {
        self.id
    }

    /// Root node handle
    pub const fn root(&self) -> NodeKey {
        self.root
    }

    /// Name a node of this graph for use across graphs
    pub const fn node_ref(&self, node: NodeKey) -> NodeRef {
        NodeRef { graph: self.id, node }
    }

    /// Whether `node_ref` names a node of this graph
    pub fn owns(&self, node_ref: NodeRef) -> bool {
        node_ref.graph == self.id && self.nodes.contains_key(node_ref.node)
    }

    /// Look up a node by handle, member or detached
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Whether the arena holds `key`
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes reachable from the root, root included
    pub fn member_count(&self) -> usize {
        self.index.len()
    }

    /// Create a detached node with default state
    pub fn create_node(&mut self) -> NodeKey {
        self.insert_node(Node::new())
    }

    /// Move a node into the arena as a detached, childless node without id
    pub fn insert_node(&mut self, mut node: Node) -> NodeKey {
        node.id = None;
        node.parent = None;
        node.children.clear();
        node.bounds.set(None);
        self.nodes.insert(node)
    }

    /// Find the member node with the given id
    pub fn get_node(&self, id: NodeId) -> Option<NodeKey> {
        self.index.get(&id).copied()
    }

    /// Subtrees attached directly under the root, in attachment order
    pub fn subgraph_roots(&self) -> &[NodeKey] {
        &self.subgraph_roots
    }

    /// Whether `key` is reachable from the root
    pub fn is_member(&self, key: NodeKey) -> bool {
        self.node(key).is_some_and(|node| node.id.is_some())
            && self.ancestors(key).last().unwrap_or(key) == self.root
    }

    /// Whether `candidate` is a proper ancestor of `node`
    pub fn is_ancestor(&self, node: NodeKey, candidate: NodeKey) -> bool {
        self.ancestors(node).any(|ancestor| ancestor == candidate)
    }

    /// Whether `candidate` is a proper successor (descendant) of `node`
    pub fn is_successor(&self, node: NodeKey, candidate: NodeKey) -> bool {
        self.is_ancestor(candidate, node)
    }

    /// Proper ancestors of `key`, nearest first
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.node(key).and_then(Node::parent),
        }
    }

    /// `key` and all its successors in pre-order
    pub fn descendants(&self, key: NodeKey) -> Descendants<'_> {
        let stack = if self.contains(key) { vec![key] } else { Vec::new() };
        Descendants { graph: self, stack }
    }

    /// Attach `child` under `parent`
    ///
    /// Both nodes may be detached; this is how trees are assembled before
    /// being added to the graph. When `parent` is a member the new subtree is
    /// indexed immediately.
    ///
    /// # Errors
    /// `InvalidOperation` when a handle is unknown, when the link would form a
    /// cycle, or when `child` already has a parent.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> EngineResult<()> {
        self.check_link(parent, child)?;
        self.link(parent, child);
        Ok(())
    }

    /// Detach `child` from `parent`
    ///
    /// # Errors
    /// `InvalidOperation` when `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> EngineResult<()> {
        let is_child = self.node(child).is_some_and(|node| node.parent == Some(parent));
        if !is_child {
            return Err(EngineError::invalid(format!("{child:?} is not a child of {parent:?}")));
        }
        self.unlink(parent, child);
        Ok(())
    }

    /// Attach a detached subtree directly under the root
    ///
    /// # Errors
    /// See [`SceneGraph::add_subgraph_to`].
    pub fn add_subgraph(&mut self, root: NodeKey) -> EngineResult<()> {
        self.add_subgraph_to(root, self.root)
    }

    /// Attach a detached subtree under a member node
    ///
    /// Every node of the subtree receives a fresh id, assigned in pre-order.
    ///
    /// # Arguments
    /// * `root` - Root of the detached subtree
    /// * `parent` - Member node to attach under
    ///
    /// # Errors
    /// `InvalidOperation` when `parent` is `root` or one of its successors,
    /// when `root` already has a parent, or when `parent` is not a member.
    /// The graph is unchanged on error.
    pub fn add_subgraph_to(&mut self, root: NodeKey, parent: NodeKey) -> EngineResult<()> {
        self.check_link(parent, root)?;
        if !self.is_member(parent) {
            return Err(EngineError::invalid(format!(
                "cannot add subgraph under {parent:?}: parent is not part of the graph"
            )));
        }
        self.link(parent, root);
        log::debug!(
            "Added subgraph {:?} under {:?} ({} members)",
            root, parent, self.index.len()
        );
        Ok(())
    }

    /// Detach a member subtree from the graph
    ///
    /// The subtree keeps its internal structure and stays in the arena; its ids
    /// are released.
    ///
    /// # Errors
    /// `InvalidOperation` when `root` is the graph root or is not a member.
    pub fn remove_subgraph(&mut self, root: NodeKey) -> EngineResult<()> {
        if root == self.root {
            return Err(EngineError::invalid("cannot remove the root of a scene graph"));
        }
        if !self.is_member(root) {
            return Err(EngineError::invalid(format!(
                "cannot remove subgraph {root:?}: it is not part of the graph"
            )));
        }
        let parent = self.node(root).and_then(Node::parent).ok_or_else(|| {
            EngineError::invalid(format!("member {root:?} has no parent"))
        })?;
        self.unlink(parent, root);
        log::debug!("Removed subgraph {:?} ({} members left)", root, self.index.len());
        Ok(())
    }

    /// Release the storage of a detached subtree
    ///
    /// # Errors
    /// `InvalidOperation` when `root` is unknown or still attached to a parent.
    pub fn discard_subgraph(&mut self, root: NodeKey) -> EngineResult<()> {
        match self.node(root) {
            None => return Err(EngineError::invalid(format!("unknown node {root:?}"))),
            Some(node) if node.parent.is_some() || root == self.root => {
                return Err(EngineError::invalid(format!(
                    "cannot discard {root:?}: it is still attached"
                )));
            }
            Some(_) => {}
        }
        let keys: Vec<NodeKey> = self.descendants(root).collect();
        for key in keys {
            self.nodes.remove(key);
        }
        Ok(())
    }

    /// Renumber every member in pre-order starting at 0
    pub fn reset_ids(&mut self) {
        let keys: Vec<NodeKey> = self.descendants(self.root).collect();
        self.index.clear();
        let mut next = 0;
        for key in keys {
            if let Some(node) = self.nodes.get_mut(key) {
                node.id = Some(NodeId(next));
                self.index.insert(NodeId(next), key);
                next += 1;
            }
        }
        self.next_id = next;
        log::debug!("Reset ids of {} members", next);
    }

    /// Product of the transformations from the root down to `key`
    pub fn absolute_transformation(&self, key: NodeKey) -> Option<Mat4> {
        let node = self.node(key)?;
        Some(self.ancestors(key).fold(node.transformation, |world, ancestor| {
            self.nodes
                .get(ancestor)
                .map_or(world, |a| a.transformation * world)
        }))
    }

    /// Bounds of the node's geometry and all its successors', in its local frame
    ///
    /// Computed on demand and cached until something below the node changes.
    pub fn bounds(&self, key: NodeKey) -> Option<Aabb> {
        let node = self.node(key)?;
        if let Some(cached) = node.bounds.get() {
            return cached;
        }

        let own = node.model.as_ref().and_then(VertexGroup::bounds);
        let bounds = node.children.iter().fold(own, |acc, &child| {
            let child_bounds = self.node(child).and_then(|c| {
                self.bounds(child).map(|b| b.transformed(&c.transformation))
            });
            match (acc, child_bounds) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                (a, b) => a.or(b),
            }
        });
        node.bounds.set(Some(bounds));
        bounds
    }

    /// Replace a node's transformation relative to its parent
    ///
    /// # Errors
    /// `InvalidOperation` when `key` is unknown.
    pub fn set_transformation(&mut self, key: NodeKey, transformation: Mat4) -> EngineResult<()> {
        self.node_mut(key)?.transformation = transformation;
        self.invalidate_bounds(key);
        Ok(())
    }

    /// Show or hide a node and its subtree
    ///
    /// # Errors
    /// `InvalidOperation` when `key` is unknown.
    pub fn set_visible(&mut self, key: NodeKey, visible: bool) -> EngineResult<()> {
        self.node_mut(key)?.flags.set(NodeFlags::VISIBLE, visible);
        Ok(())
    }

    /// Include or exclude a node from collision queries
    ///
    /// # Errors
    /// `InvalidOperation` when `key` is unknown.
    pub fn set_collidable(&mut self, key: NodeKey, collidable: bool) -> EngineResult<()> {
        self.node_mut(key)?.flags.set(NodeFlags::COLLIDABLE, collidable);
        Ok(())
    }

    /// Allow or forbid editing a node
    ///
    /// # Errors
    /// `InvalidOperation` when `key` is unknown.
    pub fn set_modifiable(&mut self, key: NodeKey, modifiable: bool) -> EngineResult<()> {
        self.node_mut(key)?.flags.set(NodeFlags::MODIFIABLE, modifiable);
        Ok(())
    }

    /// Attach, replace or remove a node's geometry
    ///
    /// # Errors
    /// `InvalidOperation` when `key` is unknown.
    pub fn set_model(&mut self, key: NodeKey, model: Option<VertexGroup>) -> EngineResult<()> {
        self.node_mut(key)?.model = model;
        self.invalidate_bounds(key);
        Ok(())
    }

    /// Mutable access to a node's geometry
    pub fn model_mut(&mut self, key: NodeKey) -> Option<&mut VertexGroup> {
        self.invalidate_bounds(key);
        self.nodes.get_mut(key)?.model.as_mut()
    }

    fn node_mut(&mut self, key: NodeKey) -> EngineResult<&mut Node> {
        self.nodes
            .get_mut(key)
            .ok_or_else(|| EngineError::invalid(format!("unknown node {key:?}")))
    }

    fn check_link(&self, parent: NodeKey, child: NodeKey) -> EngineResult<()> {
        let child_node = self
            .node(child)
            .ok_or_else(|| EngineError::invalid(format!("unknown node {child:?}")))?;
        if !self.contains(parent) {
            return Err(EngineError::invalid(format!("unknown node {parent:?}")));
        }
        if parent == child || self.is_ancestor(parent, child) {
            return Err(EngineError::invalid(format!(
                "attaching {child:?} under {parent:?} would create a cycle"
            )));
        }
        if child == self.root || child_node.parent.is_some() {
            return Err(EngineError::invalid(format!("{child:?} already has a parent")));
        }
        Ok(())
    }

    fn link(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        self.invalidate_bounds(parent);

        if self.is_member(parent) {
            self.index_subtree(child);
            if parent == self.root {
                self.subgraph_roots.push(child);
            }
        }
    }

    fn unlink(&mut self, parent: NodeKey, child: NodeKey) {
        let was_member = self.is_member(parent);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
        self.invalidate_bounds(parent);
        self.subgraph_roots.retain(|&r| r != child);

        if was_member {
            self.unindex_subtree(child);
        }
    }

    fn index_subtree(&mut self, key: NodeKey) {
        let keys: Vec<NodeKey> = self.descendants(key).collect();
        for key in keys {
            let Some(node) = self.nodes.get_mut(key) else { continue };
            let id = match node.id {
                Some(id) if self.index.get(&id).map_or(true, |&k| k == key) => id,
                _ => {
                    let id = NodeId(self.next_id);
                    self.next_id += 1;
                    id
                }
            };
            node.id = Some(id);
            self.index.insert(id, key);
        }
    }

    fn unindex_subtree(&mut self, key: NodeKey) {
        let keys: Vec<NodeKey> = self.descendants(key).collect();
        for key in keys {
            if let Some(id) = self.nodes.get_mut(key).and_then(|node| node.id.take()) {
                self.index.remove(&id);
            }
        }
    }

    fn invalidate_bounds(&self, key: NodeKey) {
        if let Some(node) = self.node(key) {
            node.bounds.set(None);
        }
        for ancestor in self.ancestors(key) {
            if let Some(node) = self.node(ancestor) {
                node.bounds.set(None);
            }
        }
    }
}

/// Iterator over proper ancestors, nearest first
#[derive(Debug)]
pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.next?;
        self.next = self.graph.node(current).and_then(Node::parent);
        Some(current)
    }
}

/// Pre-order iterator over a subtree
#[derive(Debug)]
pub struct Descendants<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeKey>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let current = self.stack.pop()?;
        if let Some(node) = self.graph.node(current) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(current)
    }
}
