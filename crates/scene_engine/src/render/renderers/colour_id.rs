//! Colour-id renderer for picking
//!
//! Each node is drawn flat in a colour that encodes `id + 1` as a 24-bit RGB
//! value, so a cleared (black) pixel decodes to "no node". Lighting and
//! blending are disabled for the pass so colours reach the framebuffer
//! unchanged.

use crate::error::EngineResult;
use crate::render::api::{Capabilities, GraphicsContext, StateScope};
use crate::render::primitives::Colour;
use crate::render::renderer::{draw_vertex_group, DrawItem, DrawingMode, Renderer};
use crate::scene::NodeId;

/// Largest node id that fits the 24-bit encoding
pub const MAX_ENCODED_ID: u32 = 0x00FF_FFFE;

/// Colour encoding a node id, `None` when the id is too large
pub fn encode_id(id: NodeId) -> Option<Colour> {
    if id.0 > MAX_ENCODED_ID {
        return None;
    }
    let [_, r, g, b] = (id.0 + 1).to_be_bytes();
    Some(Colour::from_rgba8([r, g, b, 255]))
}

/// Node id encoded in a texel, `None` for background
pub fn decode_id(texel: [u8; 4]) -> Option<NodeId> {
    let value = u32::from_be_bytes([0, texel[0], texel[1], texel[2]]);
    value.checked_sub(1).map(NodeId)
}

/// Draws every node with an id in its encoded colour
#[derive(Debug, Default)]
pub struct ColourIdRenderer {
    mode: DrawingMode,
    scope: Option<StateScope>,
}

impl ColourIdRenderer {
    /// Create a colour-id renderer drawing faces
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for ColourIdRenderer {
    fn name(&self) -> &'static str {
        "colour-id"
    }

    fn drawing_mode(&self) -> DrawingMode {
        self.mode
    }

    fn set_drawing_mode(&mut self, mode: DrawingMode) {
        self.mode = mode;
    }

    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()> {
        self.scope = Some(StateScope::capture(ctx));
        ctx.disable(Capabilities::LIGHTING | Capabilities::BLEND);
        ctx.enable(Capabilities::DEPTH_TEST | Capabilities::CULL_FACE);
        Ok(())
    }

    fn render_vertex_group(&mut self, ctx: &mut dyn GraphicsContext, item: &DrawItem<'_>) -> EngineResult<()> {
        let Some(id) = item.id else {
            log::trace!("Skipping unindexed node {:?} in colour-id pass", item.node);
            return Ok(());
        };
        let Some(colour) = encode_id(id) else {
            log::warn!("Node id {} exceeds the colour-id range and cannot be picked", id);
            return Ok(());
        };
        draw_vertex_group(ctx, item.group, item.world, colour, self.mode)
    }

    fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        if let Some(scope) = self.scope.take() {
            scope.restore(ctx);
        }
    }
}
