//! # Rendering Engine
//!
//! Draws a frame as an ordered list of passes. Each pass pairs a [`Renderer`]
//! with the root of the subtree it draws:
//!
//! - **Scene root** (the binding every pass starts with): the whole primary scene.
//! - **A node**: that node's subtree, placed by the node's absolute
//!   transformation. The node may live in any scene handed to `render`, which
//!   is how editor overlays draw from a dedicated widget scene.
//! - **Unbound**: the pass is skipped.
//!
//! ## Frame sequence
//! 1. Apply a changed viewport or clear colour, clear when configured.
//! 2. Load camera matrices and the primary scene's lights.
//! 3. For every bound pass in order: collect visible vertex groups in
//!    pre-order, then `init`, `render_vertex_group` for each, `dispose`.
//!
//! `dispose` runs even when `init` or a draw fails; the failure is returned
//! after the pass is closed and later passes are not run.

use crate::config::RenderingConfig;
use crate::error::{EngineError, EngineResult};
use crate::foundation::math::Mat4;
use crate::render::api::{GraphicsContext, ViewportSize};
use crate::render::primitives::{Camera, Colour};
use crate::render::renderer::{DrawItem, Renderer};
use crate::scene::{Frustum, NodeKey, NodeRef, Scene, SceneGraph};

/// Handle of a pass within one rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(u32);

/// Subtree a pass draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererRoot {
    /// Root of the primary scene
    SceneRoot,
    /// A specific node
    Node(NodeRef),
}

/// Counters for one drawn frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Passes that ran
    pub passes: usize,
    /// Vertex groups handed to renderers
    pub items: usize,
    /// Subtrees skipped by frustum culling
    pub culled: usize,
}

/// Outcome of a redraw request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was drawn
    Drawn(FrameStats),
    /// No graphics context was available
    Skipped,
}

struct RenderPass {
    id: RendererId,
    renderer: Box<dyn Renderer>,
    root: Option<RendererRoot>,
}

/// Multi-pass rendering engine
pub struct RenderingEngine {
    passes: Vec<RenderPass>,
    next_id: u32,
    config: RenderingConfig,
    viewport: ViewportSize,
}

impl std::fmt::Debug for RenderingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingEngine")
            .field("passes", &self.passes.iter().map(|p| (p.id, p.renderer.name(), p.root)).collect::<Vec<_>>())
            .field("viewport", &self.viewport)
            .finish()
    }
}

impl Default for RenderingEngine {
    fn default() -> Self {
        Self::new(RenderingConfig::default())
    }
}

impl RenderingEngine {
    /// Create an engine without passes
    pub fn new(config: RenderingConfig) -> Self {
        let viewport = ViewportSize::new(config.viewport_width, config.viewport_height);
        Self {
            passes: Vec::new(),
            next_id: 0,
            config,
            viewport,
        }
    }

    /// Current settings
    pub const fn config(&self) -> &RenderingConfig {
        &self.config
    }

    /// Colour frames are cleared to
    pub const fn clear_colour(&self) -> Colour {
        self.config.clear_colour
    }

    /// Change the clear colour
    pub fn set_clear_colour(&mut self, colour: Colour) {
        self.config.clear_colour = colour;
    }

    /// Whether frames start with a clear
    pub const fn clears_buffers(&self) -> bool {
        self.config.clears_buffers
    }

    /// Enable or disable clearing at frame start
    pub fn set_clears_buffers(&mut self, clears: bool) {
        self.config.clears_buffers = clears;
    }

    /// Whether resizing updates the camera aspect ratio
    pub const fn synchronizes_aspect_ratio(&self) -> bool {
        self.config.synchronize_aspect_ratio
    }

    /// Enable or disable aspect ratio synchronisation on resize
    pub fn set_synchronizes_aspect_ratio(&mut self, synchronize: bool) {
        self.config.synchronize_aspect_ratio = synchronize;
    }

    /// Enable or disable frustum culling
    pub fn set_frustum_culling(&mut self, enabled: bool) {
        self.config.frustum_culling = enabled;
    }

    /// Current viewport
    pub const fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    /// Set the viewport applied at the next frame, leaving cameras alone
    pub fn set_viewport_size(&mut self, size: ViewportSize) {
        self.viewport = size;
    }

    /// Resize the viewport and keep `camera`'s aspect ratio in step
    ///
    /// When aspect synchronisation is on, the camera's frame aspect ratio
    /// becomes `height / width`.
    ///
    /// # Arguments
    /// * `size` - New viewport size in pixels
    /// * `camera` - Camera viewing through this viewport
    #[allow(clippy::cast_precision_loss)]
    pub fn resize_viewport(&mut self, size: ViewportSize, camera: &mut Camera) {
        self.viewport = size;
        if self.config.synchronize_aspect_ratio && size.width > 0 {
            camera.frame_aspect_ratio = size.height as f32 / size.width as f32;
        }
        log::debug!(
            "Viewport resized to {}x{} (aspect {})",
            size.width, size.height, camera.frame_aspect_ratio
        );
    }

    /// Append a pass drawing the primary scene
    pub fn add_renderer(&mut self, renderer: Box<dyn Renderer>) -> RendererId {
        self.insert_renderer(self.passes.len(), renderer)
    }

    /// Insert a pass at `index` (clamped to the pass count)
    pub fn insert_renderer(&mut self, index: usize, renderer: Box<dyn Renderer>) -> RendererId {
        let id = RendererId(self.next_id);
        self.next_id += 1;
        log::debug!("Adding '{}' renderer as pass {:?}", renderer.name(), id);
        self.passes.insert(
            index.min(self.passes.len()),
            RenderPass {
                id,
                renderer,
                root: Some(RendererRoot::SceneRoot),
            },
        );
        id
    }

    /// Remove a pass and return its renderer
    pub fn remove_renderer(&mut self, id: RendererId) -> Option<Box<dyn Renderer>> {
        let index = self.passes.iter().position(|p| p.id == id)?;
        Some(self.passes.remove(index).renderer)
    }

    /// Pass handles in drawing order
    pub fn renderer_ids(&self) -> Vec<RendererId> {
        self.passes.iter().map(|p| p.id).collect()
    }

    /// Number of passes
    pub fn renderer_count(&self) -> usize {
        self.passes.len()
    }

    /// Renderer of a pass
    pub fn renderer(&self, id: RendererId) -> Option<&dyn Renderer> {
        self.pass(id).map(|p| p.renderer.as_ref())
    }

    /// Mutable renderer of a pass
    pub fn renderer_mut(&mut self, id: RendererId) -> Option<&mut (dyn Renderer + 'static)> {
        self.passes
            .iter_mut()
            .find(|p| p.id == id)
            .map(|p| p.renderer.as_mut())
    }

    /// Bind or unbind the root a pass draws
    ///
    /// `Some(node)` draws that node's subtree; `None` unbinds the pass so it
    /// is skipped and [`renderer_root`](Self::renderer_root) reports `None`.
    ///
    /// # Errors
    /// `InvalidOperation` when `id` is not a pass of this engine.
    pub fn set_renderer_root(&mut self, id: RendererId, root: Option<NodeRef>) -> EngineResult<()> {
        let pass = self.pass_mut(id)?;
        pass.root = root.map(RendererRoot::Node);
        log::debug!("Pass {:?} ('{}') root set to {:?}", id, pass.renderer.name(), pass.root);
        Ok(())
    }

    /// Bind a pass back to the primary scene's root
    ///
    /// # Errors
    /// `InvalidOperation` when `id` is not a pass of this engine.
    pub fn reset_renderer_root(&mut self, id: RendererId) -> EngineResult<()> {
        self.pass_mut(id)?.root = Some(RendererRoot::SceneRoot);
        Ok(())
    }

    /// Root a pass draws, `None` when unbound or unknown
    pub fn renderer_root(&self, id: RendererId) -> Option<RendererRoot> {
        self.pass(id).and_then(|p| p.root)
    }

    /// Draw one frame
    ///
    /// # Arguments
    /// * `ctx` - Graphics context to draw with
    /// * `camera` - Viewpoint, with its view matrix already synced
    /// * `scenes` - Primary scene first, then any scenes pass roots point into
    ///
    /// # Errors
    /// `InvalidOperation` when `scenes` is empty; otherwise the first renderer
    /// failure.
    pub fn render(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        camera: &Camera,
        scenes: &[&Scene],
    ) -> EngineResult<FrameStats> {
        let primary = *scenes
            .first()
            .ok_or_else(|| EngineError::invalid("render requires at least one scene"))?;

        if ctx.viewport() != self.viewport {
            ctx.set_viewport(self.viewport);
        }
        if ctx.clear_colour() != self.config.clear_colour {
            ctx.set_clear_colour(self.config.clear_colour);
        }
        if self.config.clears_buffers {
            ctx.clear();
        }
        ctx.set_camera(&camera.view_matrix(), &camera.projection_matrix());
        ctx.set_lights(primary.lights());

        let frustum = self.config.frustum_culling.then(|| camera.frustum());
        let mut stats = FrameStats::default();

        for pass in &mut self.passes {
            let Some(root) = pass.root else {
                log::trace!("Skipping unbound pass {:?}", pass.id);
                continue;
            };
            let Some((scene, start)) = resolve_root(root, scenes) else {
                log::warn!(
                    "Pass {:?} ('{}') is bound to {:?}, which is not in any rendered scene",
                    pass.id, pass.renderer.name(), root
                );
                continue;
            };

            let (items, culled) = collect_draw_items(scene.graph(), start, frustum.as_ref());
            stats.passes += 1;
            stats.items += items.len();
            stats.culled += culled;
            run_pass(pass.renderer.as_mut(), ctx, &items)?;
        }

        log::trace!("Frame drawn: {:?}", stats);
        Ok(stats)
    }

    fn pass(&self, id: RendererId) -> Option<&RenderPass> {
        self.passes.iter().find(|p| p.id == id)
    }

    fn pass_mut(&mut self, id: RendererId) -> EngineResult<&mut RenderPass> {
        self.passes
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EngineError::invalid(format!("no renderer {id:?} in this engine")))
    }
}

fn resolve_root<'s>(root: RendererRoot, scenes: &[&'s Scene]) -> Option<(&'s Scene, NodeKey)> {
    match root {
        RendererRoot::SceneRoot => scenes.first().map(|&scene| (scene, scene.root())),
        RendererRoot::Node(node_ref) => scenes
            .iter()
            .find(|scene| scene.graph().owns(node_ref))
            .filter(|scene| scene.graph().is_member(node_ref.node))
            .map(|&scene| (scene, node_ref.node)),
    }
}

/// Visible vertex groups under `start` in pre-order, with the number of culled subtrees
fn collect_draw_items<'g>(
    graph: &'g SceneGraph,
    start: NodeKey,
    frustum: Option<&Frustum>,
) -> (Vec<DrawItem<'g>>, usize) {
    let parent_world = graph
        .node(start)
        .and_then(|node| node.parent())
        .and_then(|parent| graph.absolute_transformation(parent))
        .unwrap_or_else(Mat4::identity);

    let mut items = Vec::new();
    let mut culled = 0;
    let mut stack = vec![(start, parent_world)];

    while let Some((key, parent_world)) = stack.pop() {
        let Some(node) = graph.node(key) else { continue };
        if !node.is_visible() {
            continue;
        }
        let world = parent_world * node.transformation();

        if let Some(frustum) = frustum {
            let outside = graph
                .bounds(key)
                .is_some_and(|bounds| !frustum.intersects_aabb(&bounds.transformed(&world)));
            if outside {
                culled += 1;
                continue;
            }
        }

        if let Some(group) = node.model() {
            items.push(DrawItem {
                node: key,
                id: node.id(),
                world,
                group,
            });
        }
        stack.extend(node.children().iter().rev().map(|&child| (child, world)));
    }

    (items, culled)
}

fn run_pass(renderer: &mut dyn Renderer, ctx: &mut dyn GraphicsContext, items: &[DrawItem<'_>]) -> EngineResult<()> {
    let result = renderer
        .init(ctx)
        .and_then(|()| items.iter().try_for_each(|item| renderer.render_vertex_group(ctx, item)));
    renderer.dispose(ctx);
    if let Err(error) = &result {
        log::warn!("Renderer '{}' failed: {}", renderer.name(), error);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::api::{Capabilities, RenderTarget};
    use crate::render::backends::software::SoftwareContext;
    use crate::render::primitives::VertexGroup;
    use crate::render::renderer::DrawingMode;
    use crate::render::renderers::SimpleRenderer;
    use crate::scene::Node;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct RecordingRenderer {
        label: &'static str,
        log: Log,
        fail_on_draw: bool,
    }

    impl RecordingRenderer {
        fn boxed(label: &'static str, log: &Log) -> Box<dyn Renderer> {
            Box::new(Self { label, log: log.clone(), fail_on_draw: false })
        }
    }

    impl Renderer for RecordingRenderer {
        fn name(&self) -> &'static str {
            self.label
        }

        fn drawing_mode(&self) -> DrawingMode {
            DrawingMode::Faces
        }

        fn set_drawing_mode(&mut self, _mode: DrawingMode) {}

        fn init(&mut self, _ctx: &mut dyn GraphicsContext) -> EngineResult<()> {
            self.log.borrow_mut().push(format!("{}:init", self.label));
            Ok(())
        }

        fn render_vertex_group(&mut self, _ctx: &mut dyn GraphicsContext, item: &DrawItem<'_>) -> EngineResult<()> {
            let id = item.id.map_or(-1, |id| i64::from(id.0));
            self.log.borrow_mut().push(format!("{}:draw:{}", self.label, id));
            if self.fail_on_draw {
                return Err(EngineError::invalid("draw failed"));
            }
            Ok(())
        }

        fn dispose(&mut self, _ctx: &mut dyn GraphicsContext) {
            self.log.borrow_mut().push(format!("{}:dispose", self.label));
        }
    }

    /// root -> a(cube) -> b(cube), root -> c(cube); ids a=1, b=2, c=3
    fn scene() -> (Scene, [NodeKey; 3]) {
        let mut scene = Scene::new("test");
        let graph = scene.graph_mut();
        let cube = || VertexGroup::cube(0.5, Colour::WHITE);
        let a = graph.insert_node(Node::new().with_model(cube()));
        let b = graph.insert_node(
            Node::new()
                .with_model(cube())
                .with_transformation(Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0))),
        );
        let c = graph.insert_node(Node::new().with_model(cube()));
        graph.add_child(a, b).unwrap();
        graph.add_subgraph(a).unwrap();
        graph.add_subgraph(c).unwrap();
        (scene, [a, b, c])
    }

    fn camera() -> Camera {
        let mut camera = Camera::new();
        camera.set_view_matrix(Mat4::new_translation(&Vec3::new(0.0, 0.0, -10.0)));
        camera
    }

    fn context() -> SoftwareContext {
        SoftwareContext::new(ViewportSize::new(80, 60))
    }

    #[test]
    fn test_passes_run_in_order_with_bracketing() {
        let (scene, _) = scene();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        engine.add_renderer(RecordingRenderer::boxed("first", &log));
        engine.add_renderer(RecordingRenderer::boxed("second", &log));

        let stats = engine.render(&mut context(), &camera(), &[&scene]).unwrap();

        assert_eq!(stats.passes, 2);
        assert_eq!(stats.items, 6);
        assert_eq!(
            *log.borrow(),
            vec![
                "first:init", "first:draw:1", "first:draw:2", "first:draw:3", "first:dispose",
                "second:init", "second:draw:1", "second:draw:2", "second:draw:3", "second:dispose",
            ]
        );
    }

    #[test]
    fn test_bound_root_draws_only_its_subtree() {
        let (scene, [_, b, _]) = scene();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        let id = engine.add_renderer(RecordingRenderer::boxed("pass", &log));

        engine.set_renderer_root(id, Some(scene.graph().node_ref(b))).unwrap();
        engine.render(&mut context(), &camera(), &[&scene]).unwrap();

        assert_eq!(*log.borrow(), vec!["pass:init", "pass:draw:2", "pass:dispose"]);
        assert_eq!(engine.renderer_root(id), Some(RendererRoot::Node(scene.graph().node_ref(b))));
    }

    #[test]
    fn test_bound_root_uses_absolute_transformation() {
        let (mut scene, [a, b, _]) = scene();
        scene
            .graph_mut()
            .set_transformation(a, Mat4::new_translation(&Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();

        let items = collect_draw_items(scene.graph(), b, None).0;

        assert_eq!(items.len(), 1);
        assert_relative_eq!(items[0].world.m14, 1.0);
        assert_relative_eq!(items[0].world.m24, 2.0);
    }

    #[test]
    fn test_unbound_pass_is_skipped() {
        let (scene, _) = scene();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        let id = engine.add_renderer(RecordingRenderer::boxed("pass", &log));

        engine.set_renderer_root(id, None).unwrap();
        let stats = engine.render(&mut context(), &camera(), &[&scene]).unwrap();

        assert!(log.borrow().is_empty());
        assert_eq!(stats.passes, 0);
        assert_eq!(engine.renderer_root(id), None);

        engine.reset_renderer_root(id).unwrap();
        assert_eq!(engine.renderer_root(id), Some(RendererRoot::SceneRoot));
    }

    #[test]
    fn test_root_in_secondary_scene() {
        let (scene, _) = scene();
        let (overlay, [_, _, c]) = self::scene();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        let id = engine.add_renderer(RecordingRenderer::boxed("overlay", &log));
        engine.set_renderer_root(id, Some(overlay.graph().node_ref(c))).unwrap();

        engine.render(&mut context(), &camera(), &[&scene]).unwrap();
        assert!(log.borrow().is_empty());

        engine.render(&mut context(), &camera(), &[&scene, &overlay]).unwrap();
        assert_eq!(*log.borrow(), vec!["overlay:init", "overlay:draw:3", "overlay:dispose"]);
    }

    #[test]
    fn test_invisible_subtree_is_skipped() {
        let (mut scene, [a, _, _]) = scene();
        scene.graph_mut().set_visible(a, false).unwrap();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        engine.add_renderer(RecordingRenderer::boxed("pass", &log));

        engine.render(&mut context(), &camera(), &[&scene]).unwrap();

        assert_eq!(*log.borrow(), vec!["pass:init", "pass:draw:3", "pass:dispose"]);
    }

    #[test]
    fn test_failing_draw_still_disposes() {
        let (scene, _) = scene();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        engine.add_renderer(Box::new(RecordingRenderer { label: "bad", log: log.clone(), fail_on_draw: true }));
        engine.add_renderer(RecordingRenderer::boxed("never", &log));

        let result = engine.render(&mut context(), &camera(), &[&scene]);

        assert!(result.is_err());
        assert_eq!(*log.borrow(), vec!["bad:init", "bad:draw:1", "bad:dispose"]);
    }

    #[test]
    fn test_frustum_culling_skips_subtrees_behind_camera() {
        let (mut scene, [a, _, _]) = scene();
        scene
            .graph_mut()
            .set_transformation(a, Mat4::new_translation(&Vec3::new(0.0, 0.0, 50.0)))
            .unwrap();
        let log = Log::default();
        let mut engine = RenderingEngine::default();
        engine.add_renderer(RecordingRenderer::boxed("pass", &log));

        let stats = engine.render(&mut context(), &camera(), &[&scene]).unwrap();
        assert_eq!(stats.culled, 1);
        assert_eq!(stats.items, 1);

        engine.set_frustum_culling(false);
        let stats = engine.render(&mut context(), &camera(), &[&scene]).unwrap();
        assert_eq!(stats.culled, 0);
        assert_eq!(stats.items, 3);
    }

    #[test]
    fn test_render_requires_scene() {
        let mut engine = RenderingEngine::default();

        let result = engine.render(&mut context(), &camera(), &[]);

        assert!(result.unwrap_err().is_invalid_operation());
    }

    #[test]
    fn test_unknown_renderer_id() {
        let mut engine = RenderingEngine::default();
        let id = engine.add_renderer(Box::new(SimpleRenderer::new()));
        engine.remove_renderer(id).unwrap();

        assert!(engine.set_renderer_root(id, None).unwrap_err().is_invalid_operation());
        assert!(engine.renderer(id).is_none());
    }

    #[test]
    fn test_insert_renderer_ordering() {
        let mut engine = RenderingEngine::default();
        let last = engine.add_renderer(Box::new(SimpleRenderer::new()));
        let first = engine.insert_renderer(0, Box::new(SimpleRenderer::new()));

        assert_eq!(engine.renderer_ids(), vec![first, last]);
    }

    #[test]
    fn test_resize_synchronizes_aspect_ratio() {
        let mut engine = RenderingEngine::default();
        let mut camera = Camera::new();

        engine.resize_viewport(ViewportSize::new(200, 200), &mut camera);
        assert_relative_eq!(camera.frame_aspect_ratio, 1.0);

        engine.set_synchronizes_aspect_ratio(false);
        engine.resize_viewport(ViewportSize::new(400, 100), &mut camera);
        assert_relative_eq!(camera.frame_aspect_ratio, 1.0);
        assert_eq!(engine.viewport(), ViewportSize::new(400, 100));
    }

    #[test]
    fn test_frame_clears_and_draws() {
        let (scene, _) = scene();
        let mut engine = RenderingEngine::new(
            RenderingConfig::default().with_clear_colour(Colour::rgb(0.0, 0.0, 1.0)),
        );
        engine.add_renderer(Box::new(SimpleRenderer::new()));
        let mut ctx = context();

        engine.render(&mut ctx, &camera(), &[&scene]).unwrap();

        assert_eq!(ctx.viewport(), ViewportSize::new(800, 600));
        assert_eq!(ctx.texel(RenderTarget::Screen, 0, 0), Some([0, 0, 255, 255]));
        assert_eq!(ctx.texel(RenderTarget::Screen, 400, 300), Some([255, 255, 255, 255]));
        assert_eq!(ctx.capabilities(), Capabilities::empty());
    }
}
