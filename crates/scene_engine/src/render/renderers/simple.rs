//! Default scene renderer

use crate::error::EngineResult;
use crate::render::api::{Capabilities, GraphicsContext, StateScope};
use crate::render::renderer::{draw_vertex_group, DrawItem, DrawingMode, Renderer};

/// Draws vertex groups in their own colour with lighting, depth testing and
/// back-face culling
#[derive(Debug, Default)]
pub struct SimpleRenderer {
    mode: DrawingMode,
    scope: Option<StateScope>,
}

impl SimpleRenderer {
    /// Create a renderer drawing faces
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for SimpleRenderer {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn drawing_mode(&self) -> DrawingMode {
        self.mode
    }

    fn set_drawing_mode(&mut self, mode: DrawingMode) {
        self.mode = mode;
    }

    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()> {
        self.scope = Some(StateScope::capture(ctx));
        ctx.enable(Capabilities::LIGHTING | Capabilities::DEPTH_TEST | Capabilities::CULL_FACE);
        ctx.disable(Capabilities::BLEND);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::ViewportSize;
    use crate::render::backends::software::SoftwareContext;

    #[test]
    fn test_dispose_restores_capabilities() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(4, 4));
        ctx.enable(Capabilities::BLEND);
        let mut renderer = SimpleRenderer::new();

        renderer.init(&mut ctx).unwrap();
        assert!(ctx.capabilities().contains(Capabilities::LIGHTING | Capabilities::DEPTH_TEST));
        assert!(!ctx.capabilities().contains(Capabilities::BLEND));

        renderer.dispose(&mut ctx);
        assert_eq!(ctx.capabilities(), Capabilities::BLEND);
    }
}
