//! # Scene View
//!
//! Everything one editor viewport needs to show and pick a scene:
//!
//! - the scene, plus a dedicated widget scene holding the manipulation widget
//! - the viewing camera (a scene camera, created when the scene has none)
//! - a rendering engine with three passes:
//!   1. the scene, drawn by the preferred renderer
//!   2. the selection outline, bound to the selected node
//!   3. the widget overlay, bound to the widget root in the widget scene
//! - a picking engine per scene; widget hits win over scene hits
//!
//! The view draws only once a graphics context has been handed to it through
//! [`SceneView::display_content`]. Until then redraws and picking are skipped
//! and the missing context is reported once.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use crate::config::{CameraConfig, ConfigError, EditorConfig};
use crate::editor::dispatch::{HostDispatch, SceneHandoff};
use crate::editor::widget::{build_widget, highlight_component, Widget};
use crate::error::{EngineError, EngineResult, ListenerError};
use crate::foundation::math::{translation_of, Mat4, Vec3};
use crate::picking::{ColourIdPicker, Pick, PickEvent, PickListener, PickerRegistry, PickingEngine};
use crate::render::api::{GraphicsBinding, GraphicsContext, ViewportSize};
use crate::render::engine::{FrameStatus, RendererId, RenderingEngine};
use crate::render::primitives::Camera;
use crate::render::registry::RendererRegistry;
use crate::render::renderers::{OutlineRenderer, OverlayRenderer};
use crate::scene::{CameraId, Node, NodeKey, Scene};

type Mailbox = Rc<RefCell<Vec<PickEvent>>>;

/// Result of resolving the queued picks of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// Nothing was queued
    Idle,
    /// No graphics context; the queued picks were dropped
    Skipped,
    /// A widget handle was hit and is now the selected component
    WidgetComponent(NodeKey),
    /// The scene selection after the pick, `None` when nothing was hit
    Selected(Option<NodeKey>),
}

/// Content of one editor viewport
pub struct SceneView {
    config: EditorConfig,
    scene: Scene,
    widget_scene: Scene,
    camera: CameraId,
    engine: RenderingEngine,
    scene_pass: RendererId,
    outline_pass: RendererId,
    overlay_pass: RendererId,
    scene_picking: PickingEngine,
    widget_picking: PickingEngine,
    scene_events: Mailbox,
    widget_events: Mailbox,
    selection: Option<NodeKey>,
    widget: Widget,
    widget_root: Option<NodeKey>,
    widget_component: Option<NodeKey>,
    binding: GraphicsBinding,
    handoff: Option<Receiver<Scene>>,
}

impl std::fmt::Debug for SceneView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneView")
            .field("scene", &self.scene.name())
            .field("camera", &self.camera)
            .field("engine", &self.engine)
            .field("selection", &self.selection)
            .field("widget", &self.widget)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

fn mailbox_listener(mailbox: &Mailbox) -> Box<dyn PickListener> {
    let mailbox = Rc::clone(mailbox);
    Box::new(move |event: &PickEvent| -> Result<(), ListenerError> {
        mailbox.borrow_mut().push(event.clone());
        Ok(())
    })
}

/// Camera named by the scene's default-camera attribute, else its first
/// camera, else a new camera on +Z looking at the origin
fn viewing_camera_for(scene: &mut Scene, config: &CameraConfig) -> EngineResult<CameraId> {
    let count = scene.cameras().len();
    if let Some(value) = scene.attribute(Scene::DEFAULT_CAMERA) {
        match value.parse::<usize>() {
            Ok(index) if index < count => return Ok(CameraId(index)),
            _ => log::warn!(
                "Ignoring '{}' attribute '{}' of scene '{}'",
                Scene::DEFAULT_CAMERA, value, scene.name()
            ),
        }
    }
    if count > 0 {
        return Ok(CameraId(0));
    }

    let placement = Mat4::new_translation(&Vec3::new(0.0, 0.0, config.distance));
    let graph = scene.graph_mut();
    let node = graph.insert_node(Node::new().with_transformation(placement));
    graph.add_subgraph(node)?;
    log::info!("Scene '{}' has no camera; viewing from {} units on +Z", scene.name(), config.distance);
    scene.add_camera(Camera::from_config(config).with_node(node))
}

/// The bound context, or `None` when nothing is bound
fn acquire_context<'b>(
    binding: &'b mut GraphicsBinding,
    operation: &str,
) -> EngineResult<Option<&'b mut dyn GraphicsContext>> {
    match binding.acquire(operation) {
        Ok(ctx) => Ok(Some(ctx)),
        Err(error) if error.is_resource_unavailable() => Ok(None),
        Err(error) => Err(error),
    }
}

impl SceneView {
    /// Create a view with the built-in renderers and pickers
    ///
    /// # Errors
    /// `Config` when `config` fails validation.
    pub fn new(scene: Scene, config: EditorConfig) -> EngineResult<Self> {
        Self::with_registries(
            scene,
            config,
            &RendererRegistry::builtin_renderers(),
            &PickerRegistry::builtin_pickers(),
        )
    }

    /// Create a view choosing the scene renderer and picker from registries
    ///
    /// The scene's `preferredRenderer` and `preferredPicker` attributes take
    /// precedence over the configured preferences; unknown keys fall back to
    /// the registry defaults.
    ///
    /// # Errors
    /// `Config` when `config` fails validation.
    pub fn with_registries(
        mut scene: Scene,
        config: EditorConfig,
        renderers: &RendererRegistry,
        pickers: &PickerRegistry,
    ) -> EngineResult<Self> {
        config.validate().map_err(ConfigError::Invalid)?;
        let camera = viewing_camera_for(&mut scene, &config.camera)?;

        let renderer_key = scene
            .attribute(Scene::PREFERRED_RENDERER)
            .or(config.rendering.preferred_renderer.as_deref());
        let picker_key = scene
            .attribute(Scene::PREFERRED_PICKER)
            .or(config.picking.preferred_picker.as_deref());

        let mut engine = RenderingEngine::new(config.rendering.clone());
        let scene_pass = engine.add_renderer(renderers.create(renderer_key));
        let outline_pass = engine.add_renderer(Box::new(OutlineRenderer::default()));
        let overlay_pass = engine.add_renderer(Box::new(OverlayRenderer::new()));
        engine.set_renderer_root(outline_pass, None)?;
        engine.set_renderer_root(overlay_pass, None)?;

        let scene_events = Mailbox::default();
        let widget_events = Mailbox::default();
        let mut scene_picking = PickingEngine::with_picker(pickers.create(picker_key));
        let mut widget_picking = PickingEngine::with_picker(Box::new(ColourIdPicker::default()));
        scene_picking.add_pick_listener(mailbox_listener(&scene_events));
        widget_picking.add_pick_listener(mailbox_listener(&widget_events));

        let widget_scene = Scene::new(format!("{} widgets", scene.name()));
        log::info!("Opened view of scene '{}'", scene.name());

        let mut view = Self {
            config,
            scene,
            widget_scene,
            camera,
            engine,
            scene_pass,
            outline_pass,
            overlay_pass,
            scene_picking,
            widget_picking,
            scene_events,
            widget_events,
            selection: None,
            widget: Widget::None,
            widget_root: None,
            widget_component: None,
            binding: GraphicsBinding::new(),
            handoff: None,
        };
        let viewport = view.engine.viewport();
        view.set_picker_viewports(viewport);
        Ok(view)
    }

    /// Settings the view was created with
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The displayed scene
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Mutable access to the displayed scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Scene holding the manipulation widget
    pub const fn widget_scene(&self) -> &Scene {
        &self.widget_scene
    }

    /// Handle of the viewing camera within the scene
    pub const fn viewing_camera_id(&self) -> CameraId {
        self.camera
    }

    /// The camera the scene is viewed through
    pub fn viewing_camera(&self) -> Option<&Camera> {
        self.scene.camera(self.camera)
    }

    /// Mutable viewing camera
    pub fn viewing_camera_mut(&mut self) -> Option<&mut Camera> {
        self.scene.camera_mut(self.camera)
    }

    /// The rendering engine
    pub const fn rendering_engine(&self) -> &RenderingEngine {
        &self.engine
    }

    /// Mutable rendering engine
    pub fn rendering_engine_mut(&mut self) -> &mut RenderingEngine {
        &mut self.engine
    }

    /// Pass drawing the scene
    pub const fn scene_pass(&self) -> RendererId {
        self.scene_pass
    }

    /// Pass drawing the selection outline
    pub const fn outline_pass(&self) -> RendererId {
        self.outline_pass
    }

    /// Pass drawing the widget
    pub const fn overlay_pass(&self) -> RendererId {
        self.overlay_pass
    }

    /// Picking engine of the scene
    pub const fn scene_picking_engine(&self) -> &PickingEngine {
        &self.scene_picking
    }

    /// Picking engine of the widget scene
    pub const fn widget_picking_engine(&self) -> &PickingEngine {
        &self.widget_picking
    }

    /// Current canvas size
    pub const fn canvas_size(&self) -> ViewportSize {
        self.engine.viewport()
    }

    /// Resize the canvas
    ///
    /// Updates the rendering viewport, both pickers, and (when aspect
    /// synchronisation is on) the viewing camera's aspect ratio.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        let size = ViewportSize::new(width, height);
        match self.scene.camera_mut(self.camera) {
            Some(camera) => self.engine.resize_viewport(size, camera),
            None => self.engine.set_viewport_size(size),
        }
        self.set_picker_viewports(size);
    }

    /// Whether canvas resizes change the camera's aspect ratio
    pub const fn synchronizes_camera_aspect_ratio(&self) -> bool {
        self.engine.synchronizes_aspect_ratio()
    }

    /// Enable or disable camera aspect synchronisation on resize
    pub fn set_synchronizes_camera_aspect_ratio(&mut self, synchronize: bool) {
        self.engine.set_synchronizes_aspect_ratio(synchronize);
    }

    fn set_picker_viewports(&mut self, size: ViewportSize) {
        for engine in [&mut self.scene_picking, &mut self.widget_picking] {
            if let Some(picker) = engine.picker_mut() {
                picker.set_viewport_size(size);
            }
        }
    }

    /// Whether a graphics context is bound
    pub const fn is_context_bound(&self) -> bool {
        self.binding.is_bound()
    }

    /// The bound graphics context
    pub fn context(&self) -> Option<&dyn GraphicsContext> {
        self.binding.get()
    }

    /// Bind the context to draw with and redraw
    ///
    /// Binding again replaces the previous context, so hosts may call this on
    /// every display request.
    ///
    /// # Errors
    /// As [`redraw`](Self::redraw).
    pub fn display_content(&mut self, context: Box<dyn GraphicsContext>) -> EngineResult<FrameStatus> {
        if self.binding.bind(context).is_none() {
            log::debug!("Graphics context bound to view of '{}'", self.scene.name());
        }
        self.redraw()
    }

    /// Unbind and return the graphics context
    pub fn release_context(&mut self) -> Option<Box<dyn GraphicsContext>> {
        self.binding.unbind()
    }

    /// Draw a frame, after taking in any handed-off scene
    ///
    /// Returns [`FrameStatus::Skipped`] while no context is bound.
    ///
    /// # Errors
    /// Renderer failures.
    pub fn redraw(&mut self) -> EngineResult<FrameStatus> {
        self.receive_handoff()?;
        let Some(ctx) = acquire_context(&mut self.binding, "redraw")? else {
            return Ok(FrameStatus::Skipped);
        };
        self.scene.sync_cameras();
        let camera = self
            .scene
            .camera(self.camera)
            .ok_or_else(|| EngineError::invalid("viewing camera is missing from the scene"))?;
        let stats = self.engine.render(ctx, camera, &[&self.scene, &self.widget_scene])?;
        Ok(FrameStatus::Drawn(stats))
    }

    /// Queue a click pick at a canvas position
    ///
    /// # Errors
    /// `InvalidOperation` when the canvas has zero width.
    #[allow(clippy::cast_precision_loss)]
    pub fn pick(&mut self, x: f32, y: f32) -> EngineResult<()> {
        let size = self.config.picking.pick_size as f32;
        self.pick_area(x, y, size, size)
    }

    /// Queue a pick of a canvas rectangle, in pixels from the top-left corner
    ///
    /// # Errors
    /// `InvalidOperation` when the canvas has zero width.
    pub fn pick_area(&mut self, x: f32, y: f32, width: f32, height: f32) -> EngineResult<()> {
        let viewport = self.engine.viewport();
        let camera = self
            .scene
            .camera(self.camera)
            .ok_or_else(|| EngineError::invalid("viewing camera is missing from the scene"))?;
        let pick = Pick::new(x, y, width, height);
        self.widget_picking.pick_viewport_with(viewport, camera, pick)?;
        self.scene_picking.pick_viewport_with(viewport, camera, pick)
    }

    /// Resolve queued picks and update the selection
    ///
    /// A widget handle under the pick becomes the selected widget component
    /// and leaves the scene selection alone. Otherwise the nearest scene node
    /// becomes the selection, or the selection is cleared on a miss.
    ///
    /// # Errors
    /// Picker or listener failures.
    pub fn advance_picking(&mut self) -> EngineResult<PickOutcome> {
        if self.scene_picking.queued() == 0 && self.widget_picking.queued() == 0 {
            return Ok(PickOutcome::Idle);
        }
        let Some(ctx) = acquire_context(&mut self.binding, "picking")? else {
            self.scene_picking.clear_picks();
            self.widget_picking.clear_picks();
            return Ok(PickOutcome::Skipped);
        };
        self.scene.sync_cameras();
        let camera = self
            .scene
            .camera(self.camera)
            .ok_or_else(|| EngineError::invalid("viewing camera is missing from the scene"))?;

        let widget_result = self.widget_picking.advance(ctx, &self.widget_scene, camera);
        let scene_result = self.scene_picking.advance(ctx, &self.scene, camera);
        let widget_events: Vec<PickEvent> = self.widget_events.borrow_mut().drain(..).collect();
        let scene_events: Vec<PickEvent> = self.scene_events.borrow_mut().drain(..).collect();
        widget_result?;
        scene_result?;

        if let Some(handle) = widget_events.iter().find_map(PickEvent::nearest).map(|hit| hit.node) {
            self.set_selected_widget_component(Some(handle))?;
            return Ok(PickOutcome::WidgetComponent(handle));
        }
        let hit = scene_events.iter().find_map(PickEvent::nearest).map(|hit| hit.node);
        self.set_selected_node(hit)?;
        Ok(PickOutcome::Selected(hit))
    }

    /// Selected scene node
    pub const fn selected_node(&self) -> Option<NodeKey> {
        self.selection
    }

    /// Select a scene node, or clear the selection
    ///
    /// The outline pass follows the selection and the widget moves to the
    /// node's position. Selecting the current selection again does nothing.
    ///
    /// # Errors
    /// `InvalidOperation` when `node` is not a member of the scene.
    pub fn set_selected_node(&mut self, node: Option<NodeKey>) -> EngineResult<()> {
        if node == self.selection {
            return Ok(());
        }
        let root = match node {
            Some(node) if !self.scene.graph().is_member(node) => {
                return Err(EngineError::invalid(format!(
                    "{node:?} is not a member of scene '{}'",
                    self.scene.name()
                )));
            }
            Some(node) => Some(self.scene.graph().node_ref(node)),
            None => None,
        };
        self.engine.set_renderer_root(self.outline_pass, root)?;
        self.selection = node;
        self.place_widget()?;
        log::debug!("Selection in '{}' is now {:?}", self.scene.name(), node);
        Ok(())
    }

    /// Widget shown over the selection
    pub const fn widget(&self) -> Widget {
        self.widget
    }

    /// Root of the shown widget in the widget scene
    pub const fn widget_root(&self) -> Option<NodeKey> {
        self.widget_root
    }

    /// Show a different widget, or none
    ///
    /// # Errors
    /// Widget scene failures, which indicate a bug.
    pub fn set_widget(&mut self, widget: Widget) -> EngineResult<()> {
        if widget == self.widget {
            return Ok(());
        }
        if let Some(root) = self.widget_root.take() {
            let graph = self.widget_scene.graph_mut();
            graph.remove_subgraph(root)?;
            graph.discard_subgraph(root)?;
        }
        self.widget = widget;
        self.widget_component = None;

        match build_widget(self.widget_scene.graph_mut(), widget)? {
            Some(root) => {
                self.widget_scene.graph_mut().add_subgraph(root)?;
                self.widget_root = Some(root);
                let root_ref = self.widget_scene.graph().node_ref(root);
                self.engine.set_renderer_root(self.overlay_pass, Some(root_ref))?;
                self.place_widget()?;
            }
            None => self.engine.set_renderer_root(self.overlay_pass, None)?,
        }
        log::debug!("Widget is now {:?}", widget);
        Ok(())
    }

    /// Selected widget handle
    pub const fn selected_widget_component(&self) -> Option<NodeKey> {
        self.widget_component
    }

    /// Select a widget handle, drawing it opaque and the others translucent
    ///
    /// # Errors
    /// `InvalidOperation` when `component` is not a handle of the shown widget.
    pub fn set_selected_widget_component(&mut self, component: Option<NodeKey>) -> EngineResult<()> {
        let Some(root) = self.widget_root else {
            return match component {
                None => Ok(()),
                Some(_) => Err(EngineError::invalid("no widget is shown")),
            };
        };
        highlight_component(self.widget_scene.graph_mut(), root, component)?;
        self.widget_component = component;
        Ok(())
    }

    fn place_widget(&mut self) -> EngineResult<()> {
        let Some(root) = self.widget_root else { return Ok(()) };
        let position = self
            .selection
            .and_then(|node| self.scene.graph().absolute_transformation(node))
            .map(|world| translation_of(&world));

        let graph = self.widget_scene.graph_mut();
        match position {
            Some(position) => {
                graph.set_transformation(root, Mat4::new_translation(&position))?;
                graph.set_visible(root, true)
            }
            None => graph.set_visible(root, false),
        }
    }

    /// Open a hand-off channel for scenes built on other threads
    ///
    /// Replaces any previous channel; senders of the old one get
    /// `ResourceUnavailable` on delivery.
    pub fn handoff(&mut self, dispatch: Arc<dyn HostDispatch>) -> SceneHandoff {
        let (sender, receiver) = mpsc::channel();
        self.handoff = Some(receiver);
        SceneHandoff { sender, dispatch }
    }

    fn receive_handoff(&mut self) -> EngineResult<()> {
        let Some(scene) = self.handoff.as_ref().and_then(|receiver| receiver.try_iter().last()) else {
            return Ok(());
        };
        self.replace_scene(scene).map(drop)
    }

    /// Show a different scene, returning the previous one
    ///
    /// Clears the selection and picks the new scene's viewing camera.
    ///
    /// # Errors
    /// Scene failures while creating a default camera.
    pub fn replace_scene(&mut self, mut scene: Scene) -> EngineResult<Scene> {
        self.set_selected_node(None)?;
        self.camera = viewing_camera_for(&mut scene, &self.config.camera)?;
        let previous = std::mem::replace(&mut self.scene, scene);
        self.scene_picking.clear_picks();
        self.widget_picking.clear_picks();

        let viewport = self.engine.viewport();
        self.set_canvas_size(viewport.width, viewport.height);
        log::info!("View switched from scene '{}' to '{}'", previous.name(), self.scene.name());
        Ok(previous)
    }
}
