//! Headless editor demo
//!
//! Builds a scene of randomly placed cubes, renders it into a software
//! context, picks the centre of the canvas, attaches a translation widget to
//! the selection and finally replaces the scene from a loader thread.
//!
//! Usage: `editor_demo [config.toml|config.ron]`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;
use scene_engine::config::ConfigError;
use scene_engine::editor::{HostDispatch, SceneChangedEvent};
use scene_engine::error::ListenerError;
use scene_engine::foundation::logging;
use scene_engine::prelude::*;
use scene_engine::render::RenderTarget;
use thiserror::Error;

const CANVAS_WIDTH: u32 = 640;
const CANVAS_HEIGHT: u32 = 480;
const CUBE_COUNT: usize = 12;

#[derive(Debug, Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Scene '{0}' is not open")]
    MissingScene(String),
    #[error("Loader thread panicked")]
    Loader,
}

/// Counts display requests coming from the loader thread
#[derive(Default)]
struct RedrawCounter {
    requests: AtomicUsize,
}

impl HostDispatch for RedrawCounter {
    fn request_display(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        log::debug!("Loader requested a redraw");
    }
}

fn random_scene(name: &str, count: usize) -> EngineResult<Scene> {
    let mut rng = rand::thread_rng();
    let mut scene = Scene::new(name);
    let graph = scene.graph_mut();

    // Keep one cube at the origin so the centre pick has something to hit
    let centre = graph.insert_node(Node::new().with_model(VertexGroup::cube(0.5, Colour::WHITE)));
    graph.add_subgraph(centre)?;

    for _ in 1..count {
        let position = Vec3::new(
            rng.gen_range(-4.0..4.0),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-4.0..0.0),
        );
        let colour = Colour::rgb(rng.gen(), rng.gen(), rng.gen());
        let node = graph.insert_node(
            Node::new()
                .with_transformation(Mat4::new_translation(&position))
                .with_model(VertexGroup::cube(rng.gen_range(0.2..0.6), colour)),
        );
        graph.add_subgraph(node)?;
    }

    log::info!("Generated scene '{}' with {} nodes", name, graph.member_count());
    Ok(scene)
}

fn log_frame(status: FrameStatus) {
    match status {
        FrameStatus::Drawn(stats) => log::info!(
            "Frame drawn: {} passes, {} items, {} culled",
            stats.passes,
            stats.items,
            stats.culled
        ),
        FrameStatus::Skipped => log::warn!("Frame skipped, no graphics context bound"),
    }
}

fn log_coverage(view: &SceneView) {
    let coverage = view
        .context()
        .and_then(|ctx| ctx.as_any().downcast_ref::<SoftwareContext>())
        .map(|ctx| (ctx.count_texels_not(RenderTarget::Screen, [0, 0, 0, 255]), ctx.stats()));
    if let Some((covered, stats)) = coverage {
        log::info!(
            "Canvas coverage: {} texels, {} draw calls, {} fragments",
            covered,
            stats.draw_calls,
            stats.fragments
        );
    }
}

fn run(config: EditorConfig) -> Result<(), DemoError> {
    let mut session = EditorSession::new(config)?;
    session.add_scene_changed_listener(Box::new(
        |event: &SceneChangedEvent| -> Result<(), ListenerError> {
            log::info!("Scene '{}' {:?}", event.name, event.kind);
            Ok(())
        },
    ));

    let name = "cubes";
    session.open_scene(name, random_scene(name, CUBE_COUNT)?)?;
    let view = session
        .view_mut(name)
        .ok_or_else(|| DemoError::MissingScene(name.to_string()))?;

    view.set_canvas_size(CANVAS_WIDTH, CANVAS_HEIGHT);
    let context = SoftwareContext::new(ViewportSize::new(CANVAS_WIDTH, CANVAS_HEIGHT));
    log_frame(view.display_content(Box::new(context))?);
    log_coverage(view);

    #[allow(clippy::cast_precision_loss)]
    let (centre_x, centre_y) = (CANVAS_WIDTH as f32 / 2.0, CANVAS_HEIGHT as f32 / 2.0);
    view.pick(centre_x, centre_y)?;
    match view.advance_picking()? {
        PickOutcome::Selected(Some(node)) => {
            let id = view.scene().graph().node(node).and_then(Node::id);
            log::info!("Selected node {:?}", id);
        }
        outcome => log::info!("Pick finished with {:?}", outcome),
    }

    view.set_widget(Widget::Translation)?;
    log_frame(view.redraw()?);
    log_coverage(view);

    let dispatch = Arc::new(RedrawCounter::default());
    let handoff = view.handoff(dispatch.clone());
    let loader = std::thread::spawn(move || -> EngineResult<()> {
        let scene = random_scene("reloaded", CUBE_COUNT / 2)?;
        handoff.deliver(scene)
    });
    loader.join().map_err(|_| DemoError::Loader)??;

    log::info!("Display requests from loader: {}", dispatch.requests.load(Ordering::SeqCst));
    log_frame(view.redraw()?);
    log::info!("Now showing scene '{}'", view.scene().name());

    session.notify_scene_modified(name)?;
    Ok(())
}

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => match EditorConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                logging::init();
                log::error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        },
        None => EditorConfig::default(),
    };

    logging::init_with_level(&config.log_level);
    log::info!("Starting editor demo");

    if let Err(e) = run(config) {
        log::error!("Editor demo failed: {}", e);
        std::process::exit(1);
    }

    log::info!("Editor demo finished");
}
