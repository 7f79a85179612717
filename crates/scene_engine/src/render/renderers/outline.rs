//! Selection outline renderer

use crate::error::EngineResult;
use crate::render::api::{Capabilities, GraphicsContext, StateScope};
use crate::render::primitives::Colour;
use crate::render::renderer::{draw_vertex_group, DrawItem, DrawingMode, Renderer};

/// Draws the edges of vertex groups in a single highlight colour, unlit and
/// without depth testing so the whole outline stays visible
#[derive(Debug)]
pub struct OutlineRenderer {
    colour: Colour,
    mode: DrawingMode,
    scope: Option<StateScope>,
}

impl Default for OutlineRenderer {
    fn default() -> Self {
        Self::new(Colour::rgb(1.0, 0.8, 0.0))
    }
}

impl OutlineRenderer {
    /// Create an outline renderer with a highlight colour
    pub fn new(colour: Colour) -> Self {
        Self {
            colour,
            mode: DrawingMode::Edges,
            scope: None,
        }
    }

    /// Highlight colour
    pub const fn colour(&self) -> Colour {
        self.colour
    }
}

impl Renderer for OutlineRenderer {
    fn name(&self) -> &'static str {
        "outline"
    }

    fn drawing_mode(&self) -> DrawingMode {
        self.mode
    }

    fn set_drawing_mode(&mut self, mode: DrawingMode) {
        self.mode = mode;
    }

    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()> {
        self.scope = Some(StateScope::capture(ctx));
        ctx.disable(Capabilities::LIGHTING | Capabilities::DEPTH_TEST | Capabilities::BLEND);
        Ok(())
    }

    fn render_vertex_group(&mut self, ctx: &mut dyn GraphicsContext, item: &DrawItem<'_>) -> EngineResult<()> {
        draw_vertex_group(ctx, item.group, item.world, self.colour, self.mode)
    }

    fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        if let Some(scope) = self.scope.take() {
            scope.restore(ctx);
        }
    }
}
