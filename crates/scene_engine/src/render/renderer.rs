//! # Renderer
//!
//! One rendering pass's drawing strategy. The rendering engine brackets every
//! pass with `init` and `dispose` and calls `render_vertex_group` once per
//! visible vertex group in between.
//!
//! ## Contract
//! Whatever `init` changes on the graphics context, `dispose` puts back, so
//! the next pass starts from the state the previous one found. `dispose` is
//! called even when `init` or a draw failed.

use crate::error::EngineResult;
use crate::foundation::math::Mat4;
use crate::render::api::{DrawCall, GraphicsContext, Primitive};
use crate::render::primitives::{Colour, VertexGroup};
use crate::scene::{NodeId, NodeKey};

/// How a vertex group's primitives are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawingMode {
    /// Filled triangles
    #[default]
    Faces,
    /// Triangle edges as lines
    Edges,
    /// Vertices as points
    Vertices,
}

/// A vertex group scheduled for drawing, with its accumulated transformation
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    /// Node carrying the geometry
    pub node: NodeKey,
    /// Node id, `None` for nodes outside the graph's index
    pub id: Option<NodeId>,
    /// Model-to-world matrix
    pub world: Mat4,
    /// Geometry to draw
    pub group: &'a VertexGroup,
}

/// Drawing strategy of a rendering pass
pub trait Renderer {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Current drawing mode
    fn drawing_mode(&self) -> DrawingMode;

    /// Change the drawing mode
    fn set_drawing_mode(&mut self, mode: DrawingMode);

    /// Prepare the context for this pass
    ///
    /// # Errors
    /// Implementation specific; the pass is abandoned but still disposed.
    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()>;

    /// Draw one vertex group
    ///
    /// # Errors
    /// Graphics failures from the context.
    fn render_vertex_group(&mut self, ctx: &mut dyn GraphicsContext, item: &DrawItem<'_>) -> EngineResult<()>;

    /// Restore the context state `init` found
    fn dispose(&mut self, ctx: &mut dyn GraphicsContext);
}

/// Draw a vertex group according to a drawing mode
///
/// # Errors
/// Graphics failures from the context.
pub fn draw_vertex_group(
    ctx: &mut dyn GraphicsContext,
    group: &VertexGroup,
    model: Mat4,
    colour: Colour,
    mode: DrawingMode,
) -> EngineResult<()> {
    let (primitive, indices) = match mode {
        DrawingMode::Faces => (Primitive::Triangles, std::borrow::Cow::Borrowed(group.indices())),
        DrawingMode::Edges => (Primitive::Lines, std::borrow::Cow::Owned(group.edge_indices())),
        DrawingMode::Vertices => (Primitive::Points, std::borrow::Cow::Owned(group.point_indices())),
    };
    ctx.draw(&DrawCall {
        primitive,
        vertices: group.vertices(),
        indices: &indices,
        colour,
        model,
    })?;
    Ok(())
}
