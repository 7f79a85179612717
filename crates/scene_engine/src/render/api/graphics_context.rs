//! # Graphics Context
//!
//! The capability every renderer and picker draws through. It models the small
//! fixed-function surface the engines need: capability toggles, a viewport, a
//! clear colour, camera matrices, flat-coloured draws and pixel readback.
//!
//! ## Design
//! - Object safe: engines receive `&mut dyn GraphicsContext` per call and
//!   never store it.
//! - Two render targets. Picking draws to `Offscreen` so colour-id frames never
//!   reach the screen.
//! - [`StateScope`] snapshots the mutable state so a renderer's `dispose` can
//!   put back exactly what its `init` found.

use std::any::Any;

use bitflags::bitflags;
use thiserror::Error;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::primitives::{Colour, Light};

bitflags! {
    /// Toggleable pipeline state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Shade triangles with the current lights
        const LIGHTING = 1 << 0;
        /// Depth test (less-or-equal) and depth writes
        const DEPTH_TEST = 1 << 1;
        /// Discard clockwise (back-facing) triangles
        const CULL_FACE = 1 << 2;
        /// Source-alpha blending
        const BLEND = 1 << 3;
    }
}

/// Which framebuffer draws and readbacks address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderTarget {
    /// The visible framebuffer
    #[default]
    Screen,
    /// A hidden framebuffer of the same size
    Offscreen,
}

/// Primitive assembly mode of a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Three indices per triangle
    Triangles,
    /// Two indices per line segment
    Lines,
    /// One index per point
    Points,
}

/// Viewport size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ViewportSize {
    /// Create a viewport size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rectangle of pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column
    pub x: u32,
    /// Top row
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl PixelRect {
    /// Create a rectangle
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Number of pixels covered
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the rectangle lies entirely inside a viewport
    pub const fn fits(&self, viewport: ViewportSize) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= viewport.width as u64
            && self.y as u64 + self.height as u64 <= viewport.height as u64
    }
}

/// Pixels read back from the current render target, row by row from the top
#[derive(Debug, Clone, PartialEq)]
pub struct PixelReadback {
    /// Rectangle that was read
    pub rect: PixelRect,
    /// RGBA8 colour, four bytes per pixel
    pub colour: Vec<u8>,
    /// Depth in `[0, 1]`, one value per pixel
    pub depth: Vec<f32>,
}

impl PixelReadback {
    /// Colour as RGBA8 texels
    pub fn texels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.colour)
    }

    /// Texel and depth of every pixel
    pub fn samples(&self) -> impl Iterator<Item = ([u8; 4], f32)> + '_ {
        self.texels().iter().copied().zip(self.depth.iter().copied())
    }
}

/// A flat-coloured draw in model space
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Primitive assembly mode
    pub primitive: Primitive,
    /// Vertex positions in model space
    pub vertices: &'a [Vec3],
    /// Indices into `vertices`
    pub indices: &'a [u32],
    /// Flat colour
    pub colour: Colour,
    /// Model-to-world matrix
    pub model: Mat4,
}

/// Graphics context errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphicsError {
    /// Readback rectangle does not fit the viewport
    #[error("Readback rectangle {rect:?} outside {viewport:?}")]
    ReadbackOutOfBounds {
        /// Requested rectangle
        rect: PixelRect,
        /// Current viewport
        viewport: ViewportSize,
    },

    /// Draw call references vertices that do not exist or has a partial primitive
    #[error("Invalid draw call: {0}")]
    InvalidDrawCall(String),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for graphics context operations
pub type GraphicsResult<T> = Result<T, GraphicsError>;

/// Drawing surface used by renderers and pickers
pub trait GraphicsContext {
    /// Current viewport size
    fn viewport(&self) -> ViewportSize;

    /// Resize the viewport and its framebuffers
    fn set_viewport(&mut self, size: ViewportSize);

    /// Current render target
    fn render_target(&self) -> RenderTarget;

    /// Select the render target for subsequent draws, clears and readbacks
    fn set_render_target(&mut self, target: RenderTarget);

    /// Currently enabled capabilities
    fn capabilities(&self) -> Capabilities;

    /// Enable capabilities
    fn enable(&mut self, capabilities: Capabilities);

    /// Disable capabilities
    fn disable(&mut self, capabilities: Capabilities);

    /// Current clear colour
    fn clear_colour(&self) -> Colour;

    /// Set the colour `clear` fills with
    fn set_clear_colour(&mut self, colour: Colour);

    /// Clear colour and depth of the current render target
    fn clear(&mut self);

    /// Set the view and projection matrices for subsequent draws
    fn set_camera(&mut self, view: &Mat4, projection: &Mat4);

    /// Set the lights used while `LIGHTING` is enabled
    fn set_lights(&mut self, lights: &[Light]);

    /// Draw primitives
    ///
    /// # Errors
    /// `InvalidDrawCall` when an index is out of range.
    fn draw(&mut self, call: &DrawCall<'_>) -> GraphicsResult<()>;

    /// Read colour and depth from the current render target
    ///
    /// # Errors
    /// `ReadbackOutOfBounds` when `rect` does not fit the viewport.
    fn read_pixels(&self, rect: PixelRect) -> GraphicsResult<PixelReadback>;

    /// Downcast support for hosts that need the concrete context
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Snapshot of a context's mutable state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateScope {
    capabilities: Capabilities,
    clear_colour: Colour,
    viewport: ViewportSize,
    render_target: RenderTarget,
}

impl StateScope {
    /// Record the current state of `ctx`
    pub fn capture(ctx: &dyn GraphicsContext) -> Self {
        Self {
            capabilities: ctx.capabilities(),
            clear_colour: ctx.clear_colour(),
            viewport: ctx.viewport(),
            render_target: ctx.render_target(),
        }
    }

    /// Put the recorded state back
    pub fn restore(&self, ctx: &mut dyn GraphicsContext) {
        let current = ctx.capabilities();
        ctx.disable(current - self.capabilities);
        ctx.enable(self.capabilities - current);
        if ctx.clear_colour() != self.clear_colour {
            ctx.set_clear_colour(self.clear_colour);
        }
        if ctx.viewport() != self.viewport {
            ctx.set_viewport(self.viewport);
        }
        if ctx.render_target() != self.render_target {
            ctx.set_render_target(self.render_target);
        }
    }

    /// Capabilities that were enabled at capture time
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
