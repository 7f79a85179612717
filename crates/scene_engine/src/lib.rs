//! # Scene Engine
//!
//! Scene graph, multi-pass rendering and colour-id picking for interactive
//! scene editors, independent of any windowing toolkit.
//!
//! ## Features
//!
//! - **Scene Graph**: arena-backed node tree with stable integer ids
//! - **Multi-Pass Rendering**: ordered renderers, each bound to its own subtree
//! - **Picking**: device rectangles resolved to nodes via a colour-id pass
//! - **Editor Layer**: sessions, viewports, selection outline and widgets
//! - **Headless**: a software graphics context for tests and tooling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let mut scene = Scene::new("demo");
//!     let cube = scene
//!         .graph_mut()
//!         .insert_node(Node::new().with_model(VertexGroup::cube(0.5, Colour::WHITE)));
//!     scene.graph_mut().add_subgraph(cube)?;
//!
//!     let mut session = EditorSession::new(EditorConfig::default())?;
//!     let view = session.open_scene("demo", scene)?;
//!     view.set_canvas_size(640, 480);
//!     view.display_content(Box::new(SoftwareContext::new(ViewportSize::new(640, 480))))?;
//!
//!     view.pick(320.0, 240.0)?;
//!     view.advance_picking()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod editor;
pub mod error;
pub mod foundation;
pub mod picking;
pub mod render;
pub mod scene;

pub use error::{EngineError, EngineResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, EditorConfig},
        editor::{EditorSession, PickOutcome, SceneView, Widget},
        error::{EngineError, EngineResult},
        foundation::math::{Mat4, Vec3},
        picking::{Pick, PickEvent, PickingEngine},
        render::{
            backends::software::SoftwareContext, Camera, Colour, FrameStatus, GraphicsContext, Renderer,
            RenderingEngine, VertexGroup, ViewportSize,
        },
        scene::{Node, NodeId, NodeKey, Scene, SceneGraph},
    };
}
