//! Scene management
//!
//! The scene graph, its nodes and bounding volumes, and the [`Scene`] that
//! bundles a graph with the cameras and lights viewing it.

pub mod bounds;
pub mod container;
pub mod node;
pub mod scene_graph;

pub use bounds::{Aabb, Frustum, Plane};
pub use container::{CameraId, Scene};
pub use node::{Node, NodeFlags, NodeId, NodeKey};
pub use scene_graph::{Ancestors, Descendants, GraphId, NodeRef, SceneGraph};
