//! # Pickers
//!
//! A picker resolves one pick against a scene. The built-in
//! [`ColourIdPicker`] renders the scene offscreen with every node in a colour
//! encoding its id, reads back the pixels under the pick and decodes them.

use std::collections::BTreeMap;

use crate::config::RenderingConfig;
use crate::error::EngineResult;
use crate::picking::{Hit, Pick, PickEvent, PickHits};
use crate::render::api::{GraphicsContext, PixelRect, RenderTarget, StateScope, ViewportSize};
use crate::render::engine::RenderingEngine;
use crate::render::primitives::{Camera, Colour};
use crate::render::registry::Registry;
use crate::render::renderers::{decode_id, ColourIdRenderer};
use crate::scene::{NodeId, Scene};

/// Slack applied before truncating converted pixel coordinates
const PIXEL_EPSILON: f32 = 1e-3;

/// Strategy resolving picks to nodes
///
/// The picking engine calls `init` once per batch, `pick_scene` for every
/// queued pick, then `dispose`, which must restore whatever `init` and the
/// picks changed on the context.
pub trait Picker {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Prepare the context for a batch of picks
    ///
    /// # Errors
    /// Implementation specific; the batch is abandoned but still disposed.
    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()>;

    /// Resolve one pick in camera-frame units
    ///
    /// Returns `None` when nothing was hit or the pick lies outside the
    /// viewport.
    ///
    /// # Errors
    /// Graphics failures from the context.
    fn pick_scene(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &Camera,
        pick: &Pick,
    ) -> EngineResult<Option<PickEvent>>;

    /// Restore the context state `init` found
    fn dispose(&mut self, ctx: &mut dyn GraphicsContext);

    /// Viewport picks are resolved in
    fn viewport_size(&self) -> ViewportSize;

    /// Change the viewport picks are resolved in
    fn set_viewport_size(&mut self, size: ViewportSize);
}

/// Registry of pickers by key
pub type PickerRegistry = Registry<dyn Picker>;

impl Registry<dyn Picker> {
    /// Registry with the built-in pickers; `colour-id` is the default
    pub fn builtin_pickers() -> Self {
        Self::new("colour-id", || Box::new(ColourIdPicker::default()))
    }
}

/// Picker rendering an offscreen colour-id pass
#[derive(Debug)]
pub struct ColourIdPicker {
    engine: RenderingEngine,
    scope: Option<StateScope>,
}

impl Default for ColourIdPicker {
    fn default() -> Self {
        let config = RenderingConfig::default();
        let viewport = ViewportSize::new(config.viewport_width, config.viewport_height);
        Self::new(viewport)
    }
}

impl ColourIdPicker {
    /// Create a picker for a viewport
    pub fn new(viewport: ViewportSize) -> Self {
        let config = RenderingConfig::default()
            .with_clear_colour(Colour::TRANSPARENT)
            .with_clears_buffers(true)
            .with_synchronize_aspect_ratio(false);
        let mut engine = RenderingEngine::new(config);
        engine.set_viewport_size(viewport);
        engine.add_renderer(Box::new(ColourIdRenderer::new()));
        Self { engine, scope: None }
    }
}

/// Pixel rectangle covered by a camera-frame pick, `None` when it starts outside
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn frame_to_viewport(pick: &Pick, camera: &Camera, viewport: ViewportSize) -> Option<PixelRect> {
    let frame_width = camera.frame_width;
    let frame_height = camera.frame_height();
    if viewport.is_empty() || frame_width <= 0.0 || frame_height <= 0.0 {
        return None;
    }
    let pixels = viewport.width as f32;
    let x = (pick.x / frame_width * pixels + PIXEL_EPSILON).floor();
    let y = (pick.y / frame_height * pixels + PIXEL_EPSILON).floor();
    if x < 0.0 || y < 0.0 || x >= viewport.width as f32 || y >= viewport.height as f32 {
        return None;
    }
    let width = (pick.width / frame_width * pixels).round().max(1.0) as u32;
    let height = (pick.height / frame_height * pixels).round().max(1.0) as u32;
    let (x, y) = (x as u32, y as u32);

    Some(PixelRect::new(
        x,
        y,
        width.min(viewport.width - x),
        height.min(viewport.height - y),
    ))
}

impl Picker for ColourIdPicker {
    fn name(&self) -> &'static str {
        "colour-id"
    }

    fn init(&mut self, ctx: &mut dyn GraphicsContext) -> EngineResult<()> {
        self.scope = Some(StateScope::capture(ctx));
        ctx.set_render_target(RenderTarget::Offscreen);
        Ok(())
    }

    fn pick_scene(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        scene: &Scene,
        camera: &Camera,
        pick: &Pick,
    ) -> EngineResult<Option<PickEvent>> {
        let Some(rect) = frame_to_viewport(pick, camera, self.engine.viewport()) else {
            log::debug!("Pick {:?} lies outside the {:?} viewport", pick, self.engine.viewport());
            return Ok(None);
        };

        self.engine.render(ctx, camera, &[scene])?;
        let readback = ctx.read_pixels(rect)?;

        let mut nearest: BTreeMap<NodeId, f32> = BTreeMap::new();
        for (texel, depth) in readback.samples() {
            if let Some(id) = decode_id(texel) {
                nearest
                    .entry(id)
                    .and_modify(|d| *d = d.min(depth))
                    .or_insert(depth);
            }
        }

        let mut hits: Vec<Hit> = nearest
            .into_iter()
            .filter_map(|(id, depth)| {
                let node = scene.graph().get_node(id);
                if node.is_none() {
                    log::warn!("Decoded unknown node id {} while picking", id);
                }
                node.map(|node| Hit { id, node, depth })
            })
            .collect();
        if hits.is_empty() {
            return Ok(None);
        }
        hits.sort_by(|a, b| a.depth.total_cmp(&b.depth).then(a.id.cmp(&b.id)));

        Ok(Some(PickEvent {
            picks: vec![PickHits { pick: *pick, hits }],
        }))
    }

    fn dispose(&mut self, ctx: &mut dyn GraphicsContext) {
        if let Some(scope) = self.scope.take() {
            scope.restore(ctx);
        }
    }

    fn viewport_size(&self) -> ViewportSize {
        self.engine.viewport()
    }

    fn set_viewport_size(&mut self, size: ViewportSize) {
        self.engine.set_viewport_size(size);
    }
}
