//! Graphics context abstraction shared by renderers and pickers

pub mod binding;
pub mod graphics_context;

pub use binding::GraphicsBinding;
pub use graphics_context::{
    Capabilities, DrawCall, GraphicsContext, GraphicsError, GraphicsResult, PixelReadback,
    PixelRect, Primitive, RenderTarget, StateScope, ViewportSize,
};
