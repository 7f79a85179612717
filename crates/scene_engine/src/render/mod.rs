//! # Rendering
//!
//! Multi-pass drawing of scene graphs through an abstract graphics context.
//!
//! ## Layout
//! - [`api`]: the graphics context trait, state scopes and context binding
//! - [`backends`]: context implementations (a software rasterizer)
//! - [`primitives`]: cameras, colours, lights and vertex groups
//! - [`renderer`]: the per-pass drawing strategy trait
//! - [`renderers`]: built-in strategies
//! - [`registry`]: key-based lookup of strategies
//! - [`engine`]: the pass list and frame traversal

pub mod api;
pub mod backends;
pub mod engine;
pub mod primitives;
pub mod registry;
pub mod renderer;
pub mod renderers;

pub use api::{Capabilities, GraphicsBinding, GraphicsContext, GraphicsError, RenderTarget, ViewportSize};
pub use engine::{FrameStats, FrameStatus, RendererId, RendererRoot, RenderingEngine};
pub use primitives::{Camera, Colour, Light, ProjectionMode, VertexGroup};
pub use registry::{Registry, RendererRegistry};
pub use renderer::{DrawItem, DrawingMode, Renderer};
