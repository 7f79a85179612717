//! Core rendering primitives: colours, cameras, lights and vertex groups

pub mod camera;
pub mod colour;
pub mod light;
pub mod vertex_group;

pub use camera::{Camera, ProjectionMode};
pub use colour::Colour;
pub use light::Light;
pub use vertex_group::VertexGroup;
