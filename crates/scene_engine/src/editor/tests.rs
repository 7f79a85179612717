use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;

use super::*;
use crate::config::EditorConfig;
use crate::error::{EngineError, ListenerError};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{RenderTarget, ViewportSize};
use crate::render::backends::software::SoftwareContext;
use crate::render::engine::{FrameStatus, RendererRoot};
use crate::render::primitives::{Colour, VertexGroup};
use crate::scene::{Node, NodeKey, Scene};

const CANVAS: u32 = 200;

/// Unit cube at the origin, viewed through the default camera
fn cube_scene(name: &str) -> (Scene, NodeKey) {
    let mut scene = Scene::new(name);
    let graph = scene.graph_mut();
    let cube = graph.insert_node(Node::new().with_model(VertexGroup::cube(0.5, Colour::WHITE)));
    graph.add_subgraph(cube).unwrap();
    (scene, cube)
}

fn square_view() -> (SceneView, NodeKey) {
    let (scene, cube) = cube_scene("test");
    let mut view = SceneView::new(scene, EditorConfig::default()).unwrap();
    view.set_canvas_size(CANVAS, CANVAS);
    (view, cube)
}

fn bound_view() -> (SceneView, NodeKey) {
    let (mut view, cube) = square_view();
    let status = view
        .display_content(Box::new(SoftwareContext::new(ViewportSize::new(CANVAS, CANVAS))))
        .unwrap();
    assert!(matches!(status, FrameStatus::Drawn(_)));
    (view, cube)
}

fn software(view: &SceneView) -> &SoftwareContext {
    view.context()
        .and_then(|ctx| ctx.as_any().downcast_ref::<SoftwareContext>())
        .unwrap()
}

#[test]
fn test_view_creates_default_camera() {
    let (scene, _) = cube_scene("test");
    let view = SceneView::new(scene, EditorConfig::default()).unwrap();

    let camera = view.viewing_camera().unwrap();
    assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-5);
    assert_eq!(view.scene().cameras().len(), 1);
    assert_eq!(view.rendering_engine().renderer_count(), 3);
}

#[test]
fn test_view_prefers_scene_default_camera() {
    let (mut scene, _) = cube_scene("test");
    let mut far = crate::render::primitives::Camera::new();
    far.set_view_matrix(Mat4::new_translation(&Vec3::new(0.0, 0.0, -50.0)));
    scene.add_camera(crate::render::primitives::Camera::new()).unwrap();
    let far_id = scene.add_camera(far).unwrap();
    scene.set_attribute(Scene::DEFAULT_CAMERA, "1");

    let view = SceneView::new(scene, EditorConfig::default()).unwrap();

    assert_eq!(view.viewing_camera_id(), far_id);
}

#[test]
fn test_canvas_resize_synchronizes_camera() {
    let (view, _) = square_view();

    assert_eq!(view.rendering_engine().viewport(), ViewportSize::new(CANVAS, CANVAS));
    assert_eq!(
        view.scene_picking_engine().picker().unwrap().viewport_size(),
        ViewportSize::new(CANVAS, CANVAS)
    );
    assert_eq!(
        view.widget_picking_engine().picker().unwrap().viewport_size(),
        ViewportSize::new(CANVAS, CANVAS)
    );
    assert_relative_eq!(view.viewing_camera().unwrap().frame_aspect_ratio, 1.0);
}

#[test]
fn test_canvas_resize_without_synchronization() {
    let (scene, _) = cube_scene("test");
    let mut view = SceneView::new(scene, EditorConfig::default()).unwrap();
    view.set_synchronizes_camera_aspect_ratio(false);

    view.set_canvas_size(CANVAS, CANVAS);

    assert_relative_eq!(view.viewing_camera().unwrap().frame_aspect_ratio, 0.75);
}

#[test]
fn test_redraw_without_context_is_skipped() {
    let (mut view, _) = square_view();

    assert_eq!(view.redraw().unwrap(), FrameStatus::Skipped);
    assert_eq!(view.redraw().unwrap(), FrameStatus::Skipped);
    view.pick(100.0, 100.0).unwrap();
    assert_eq!(view.advance_picking().unwrap(), PickOutcome::Skipped);
    assert_eq!(view.scene_picking_engine().queued(), 0);
}

#[test]
fn test_display_content_draws_scene() {
    let (view, _) = bound_view();
    let ctx = software(&view);

    assert_eq!(ctx.texel(RenderTarget::Screen, 100, 100), Some([255, 255, 255, 255]));
    assert_eq!(ctx.texel(RenderTarget::Screen, 5, 5), Some(Colour::BLACK.to_rgba8()));
}

#[test]
fn test_click_selects_and_miss_clears() {
    let (mut view, cube) = bound_view();

    view.pick(99.0, 99.0).unwrap();
    assert_eq!(view.advance_picking().unwrap(), PickOutcome::Selected(Some(cube)));
    assert_eq!(view.selected_node(), Some(cube));
    assert_eq!(
        view.rendering_engine().renderer_root(view.outline_pass()),
        Some(RendererRoot::Node(view.scene().graph().node_ref(cube)))
    );

    view.pick(5.0, 5.0).unwrap();
    assert_eq!(view.advance_picking().unwrap(), PickOutcome::Selected(None));
    assert_eq!(view.rendering_engine().renderer_root(view.outline_pass()), None);
    assert_eq!(view.advance_picking().unwrap(), PickOutcome::Idle);
}

#[test]
fn test_selection_outline_is_drawn() {
    let (mut view, cube) = bound_view();
    view.set_selected_node(Some(cube)).unwrap();

    let FrameStatus::Drawn(stats) = view.redraw().unwrap() else {
        panic!("frame was skipped");
    };

    assert_eq!(stats.passes, 2);
    assert_eq!(stats.items, 2);
}

#[test]
fn test_selecting_foreign_node_fails() {
    let (mut view, _) = square_view();
    let stray = view.scene_mut().graph_mut().create_node();

    let result = view.set_selected_node(Some(stray));

    assert!(result.unwrap_err().is_invalid_operation());
    assert_eq!(view.selected_node(), None);
}

#[test]
fn test_widget_lifecycle() {
    let (mut view, cube) = square_view();
    view.scene_mut()
        .graph_mut()
        .set_transformation(cube, Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)))
        .unwrap();
    view.set_selected_node(Some(cube)).unwrap();

    view.set_widget(Widget::Rotation).unwrap();
    let root = view.widget_root().unwrap();
    assert_eq!(view.widget_scene().graph().subgraph_roots(), &[root]);
    assert_eq!(
        view.rendering_engine().renderer_root(view.overlay_pass()),
        Some(RendererRoot::Node(view.widget_scene().graph().node_ref(root)))
    );
    let placement = view.widget_scene().graph().absolute_transformation(root).unwrap();
    assert_relative_eq!(placement.m14, 1.0);
    assert_relative_eq!(placement.m24, 2.0);
    assert_relative_eq!(placement.m34, 3.0);

    view.set_widget(Widget::None).unwrap();
    assert!(view.widget_scene().graph().subgraph_roots().is_empty());
    assert_eq!(view.rendering_engine().renderer_root(view.overlay_pass()), None);
    assert_eq!(view.widget_scene().graph().member_count(), 1);
}

#[test]
fn test_widget_hidden_without_selection() {
    let (mut view, cube) = square_view();
    view.set_widget(Widget::Translation).unwrap();
    let root = view.widget_root().unwrap();
    assert!(!view.widget_scene().graph().node(root).unwrap().is_visible());

    view.set_selected_node(Some(cube)).unwrap();
    assert!(view.widget_scene().graph().node(root).unwrap().is_visible());
}

#[test]
fn test_widget_pick_takes_precedence() {
    let (mut view, cube) = bound_view();
    view.set_selected_node(Some(cube)).unwrap();
    view.set_widget(Widget::Rotation).unwrap();
    let root = view.widget_root().unwrap();
    let handles = view.widget_scene().graph().node(root).unwrap().children().to_vec();

    // The Z ring crosses the +X axis around column 119
    view.pick_area(115.0, 95.0, 8.0, 8.0).unwrap();
    let outcome = view.advance_picking().unwrap();

    let PickOutcome::WidgetComponent(handle) = outcome else {
        panic!("expected a widget hit, got {outcome:?}");
    };
    assert!(handles.contains(&handle));
    assert_eq!(view.selected_widget_component(), Some(handle));
    assert_eq!(view.selected_node(), Some(cube));
    let alpha = view.widget_scene().graph().node(handle).unwrap().model().unwrap().colour().a;
    assert_relative_eq!(alpha, 1.0);
}

#[test]
fn test_preferred_renderer_from_scene_attribute() {
    let (mut scene, _) = cube_scene("test");
    scene.set_attribute(Scene::PREFERRED_RENDERER, "overlay");
    let view = SceneView::new(scene, EditorConfig::default()).unwrap();
    assert_eq!(view.rendering_engine().renderer(view.scene_pass()).unwrap().name(), "overlay");

    let (mut scene, _) = cube_scene("test");
    scene.set_attribute(Scene::PREFERRED_RENDERER, "no-such-renderer");
    let view = SceneView::new(scene, EditorConfig::default()).unwrap();
    assert_eq!(view.rendering_engine().renderer(view.scene_pass()).unwrap().name(), "simple");
}

#[test]
fn test_invalid_config_is_rejected() {
    let (scene, _) = cube_scene("test");
    let mut config = EditorConfig::default();
    config.picking.pick_size = 0;

    let result = SceneView::new(scene, config);

    assert!(matches!(result, Err(EngineError::Config(_))));
}

#[derive(Default)]
struct CountingDispatch {
    requests: AtomicUsize,
}

impl HostDispatch for CountingDispatch {
    fn request_display(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_scene_handoff_from_worker_thread() {
    let (mut view, cube) = bound_view();
    view.set_selected_node(Some(cube)).unwrap();
    let dispatch = Arc::new(CountingDispatch::default());
    let handoff = view.handoff(dispatch.clone());

    std::thread::spawn(move || {
        let (scene, _) = cube_scene("loaded");
        handoff.deliver(scene)
    })
    .join()
    .unwrap()
    .unwrap();

    assert_eq!(dispatch.requests.load(Ordering::SeqCst), 1);
    assert_eq!(view.scene().name(), "test");

    assert!(matches!(view.redraw().unwrap(), FrameStatus::Drawn(_)));
    assert_eq!(view.scene().name(), "loaded");
    assert_eq!(view.selected_node(), None);
    assert_relative_eq!(view.viewing_camera().unwrap().frame_aspect_ratio, 1.0);
}

#[test]
fn test_handoff_after_view_dropped() {
    let (mut view, _) = square_view();
    let handoff = view.handoff(Arc::new(CountingDispatch::default()));
    drop(view);

    let result = handoff.deliver(Scene::new("late"));

    assert!(result.unwrap_err().is_resource_unavailable());
}

type Heard = Rc<RefCell<Vec<SceneChangedEvent>>>;

fn recorder(heard: &Heard) -> Box<dyn SceneChangedListener> {
    let heard = heard.clone();
    Box::new(move |event: &SceneChangedEvent| -> Result<(), ListenerError> {
        heard.borrow_mut().push(event.clone());
        Ok(())
    })
}

fn event(name: &str, kind: SceneChangeKind) -> SceneChangedEvent {
    SceneChangedEvent { name: name.to_string(), kind }
}

#[test]
fn test_session_activates_first_scene() {
    let heard = Heard::default();
    let mut session = EditorSession::new(EditorConfig::default()).unwrap();
    session.add_scene_changed_listener(recorder(&heard));

    session.open_scene("first", cube_scene("first").0).unwrap();
    session.open_scene("second", cube_scene("second").0).unwrap();

    assert_eq!(session.active_scene(), Some("first"));
    assert_eq!(session.active_view().unwrap().scene().name(), "first");
    assert_eq!(*heard.borrow(), vec![event("first", SceneChangeKind::Activated)]);
    assert_eq!(session.scene_names().collect::<Vec<_>>(), vec!["first", "second"]);
}

#[test]
fn test_session_switching_and_modification() {
    let heard = Heard::default();
    let mut session = EditorSession::new(EditorConfig::default()).unwrap();
    session.open_scene("first", cube_scene("first").0).unwrap();
    session.open_scene("second", cube_scene("second").0).unwrap();
    let id = session.add_scene_changed_listener(recorder(&heard));

    session.set_active_scene("second").unwrap();
    session.set_active_scene("second").unwrap();
    session.notify_scene_modified("first").unwrap();

    assert_eq!(
        *heard.borrow(),
        vec![
            event("second", SceneChangeKind::Activated),
            event("first", SceneChangeKind::Modified),
        ]
    );

    assert!(session.remove_scene_changed_listener(id).is_some());
    session.set_active_scene("first").unwrap();
    assert_eq!(heard.borrow().len(), 2);
}

#[test]
fn test_session_rejects_unknown_and_duplicate_names() {
    let mut session = EditorSession::new(EditorConfig::default()).unwrap();
    session.open_scene("scene", cube_scene("scene").0).unwrap();

    assert!(session.open_scene("scene", Scene::new("again")).unwrap_err().is_invalid_operation());
    assert!(session.set_active_scene("missing").unwrap_err().is_invalid_operation());
    assert!(session.notify_scene_modified("missing").unwrap_err().is_invalid_operation());
}

#[test]
fn test_session_close_active_scene() {
    let mut session = EditorSession::new(EditorConfig::default()).unwrap();
    session.open_scene("scene", cube_scene("scene").0).unwrap();

    let view = session.close_scene("scene").unwrap();

    assert_eq!(view.scene().name(), "scene");
    assert_eq!(session.active_scene(), None);
    assert!(session.active_view().is_none());
    assert!(session.close_scene("scene").is_none());
}

#[test]
fn test_session_listener_failure_is_reported_after_fan_out() {
    let heard = Heard::default();
    let mut session = EditorSession::new(EditorConfig::default()).unwrap();
    session.add_scene_changed_listener(Box::new(|_: &SceneChangedEvent| -> Result<(), ListenerError> {
        Err("refused".into())
    }));
    session.add_scene_changed_listener(recorder(&heard));

    let result = session.open_scene("scene", cube_scene("scene").0);

    assert!(matches!(result, Err(EngineError::Listener { index: 0, .. })));
    assert_eq!(heard.borrow().len(), 1);
    assert!(session.view("scene").is_some());
}
