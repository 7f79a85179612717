//! Editor overlay renderer

use crate::error::EngineResult;
use crate::render::api::{Capabilities, GraphicsContext, StateScope};
use crate::render::renderer::{draw_vertex_group, DrawItem, DrawingMode, Renderer};

/// Draws vertex groups over everything already in the frame, blended by
/// their alpha. Used for manipulation widgets.
#[derive(Debug, Default)]
pub struct OverlayRenderer {
    mode: DrawingMode,
    scope: Option<StateScope>,
}

impl OverlayRenderer {
    /// Create an overlay renderer drawing faces
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for OverlayRenderer {
    fn name(&self) -> &'static str {
        "overlay"
    }

    fn drawing_mode(&self) -> DrawingMode {
        self.mode
    }

    fn set_drawing_mode(&mut self, mode: DrawingMode) {
        self.mode = mode;
    }

    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()> {
        self.scope = Some(StateScope::capture(ctx));
        ctx.disable(Capabilities::LIGHTING | Capabilities::DEPTH_TEST | Capabilities::CULL_FACE);
        ctx.enable(Capabilities::BLEND);
        Ok(())
    }

    fn render_vertex_group(&mut self, ctx: &mut dyn GraphicsContext, item: &DrawItem<'_>) -> EngineResult<()> {
        draw_vertex_group(ctx, item.group, item.world, item.group.colour(), self.mode)
    }

    fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        if let Some(scope) = self.scope.take() {
            scope.restore(ctx);
        }
    }
}
