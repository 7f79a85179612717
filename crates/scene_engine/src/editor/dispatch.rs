//! Hand-off of scenes built off the graphics thread
//!
//! Scene loading may run on a worker thread, but only the thread owning the
//! graphics context may touch a [`SceneView`](super::SceneView). A worker
//! delivers its scene through a [`SceneHandoff`], which queues it and asks the
//! host to schedule a display on the graphics thread. The view picks the
//! scene up at its next `redraw`.

use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::scene::Scene;

/// Host primitive scheduling work on the graphics thread
pub trait HostDispatch: Send + Sync {
    /// Ask the host to call the view's `redraw` on the graphics thread soon
    fn request_display(&self);
}

/// Sending end of a view's scene hand-off channel
#[derive(Clone)]
pub struct SceneHandoff {
    pub(crate) sender: Sender<Scene>,
    pub(crate) dispatch: Arc<dyn HostDispatch>,
}

impl std::fmt::Debug for SceneHandoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneHandoff").finish_non_exhaustive()
    }
}

impl SceneHandoff {
    /// Queue `scene` for the view and request a display
    ///
    /// # Errors
    /// `ResourceUnavailable` when the view no longer accepts hand-offs.
    pub fn deliver(&self, scene: Scene) -> EngineResult<()> {
        let name = scene.name().to_string();
        self.sender.send(scene).map_err(|_| {
            EngineError::ResourceUnavailable(format!("scene view dropped before '{name}' was delivered"))
        })?;
        log::debug!("Scene '{}' handed off; requesting display", name);
        self.dispatch.request_display();
        Ok(())
    }
}
