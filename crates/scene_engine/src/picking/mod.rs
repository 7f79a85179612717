//! # Picking
//!
//! Resolves selection rectangles to scene-graph nodes.
//!
//! A [`Pick`] starts in device pixels (origin top-left) and is converted in
//! place to camera-frame units by [`viewport_to_frame`]. The
//! [`PickingEngine`](engine::PickingEngine) queues picks and resolves them
//! through a [`Picker`](picker::Picker) on `advance`, fanning the resulting
//! [`PickEvent`]s out to registered listeners.

pub mod engine;
pub mod listener;
pub mod picker;

pub use engine::PickingEngine;
pub use listener::{ListenerId, PickListener};
pub use picker::{ColourIdPicker, Picker, PickerRegistry};

use crate::error::{EngineError, EngineResult};
use crate::render::api::ViewportSize;
use crate::render::primitives::Camera;
use crate::scene::{NodeId, NodeKey};

/// Selection rectangle, in device pixels or camera-frame units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pick {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Pick {
    /// Create a pick rectangle
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// A node under a pick rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Id of the node at pick time
    pub id: NodeId,
    /// Node handle in the picked scene's graph
    pub node: NodeKey,
    /// Nearest window-space depth sampled for the node, in `[0, 1]`
    pub depth: f32,
}

/// Nodes hit by one pick, nearest first
#[derive(Debug, Clone, PartialEq)]
pub struct PickHits {
    /// The pick in camera-frame units
    pub pick: Pick,
    /// Hit nodes ordered nearest to the camera first
    pub hits: Vec<Hit>,
}

/// Result of resolving picks
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PickEvent {
    /// One entry per resolved pick
    pub picks: Vec<PickHits>,
}

impl PickEvent {
    /// Nearest hit of the first pick that hit anything
    pub fn nearest(&self) -> Option<&Hit> {
        self.picks.iter().find_map(|p| p.hits.first())
    }

    /// Whether no pick hit anything
    pub fn is_empty(&self) -> bool {
        self.picks.iter().all(|p| p.hits.is_empty())
    }
}

/// Queue state of a picking engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickingState {
    /// Nothing queued
    Idle,
    /// Picks are waiting for the next `advance`
    Queued,
}

/// Convert a pick from device pixels to camera-frame units, in place
///
/// Both axes are scaled by the horizontal pixel-to-frame ratio: `x` and
/// `width` map onto the frame width, `y` and `height` onto the frame height,
/// each divided by the viewport width.
///
/// # Errors
/// `InvalidOperation` for a zero-width viewport.
#[allow(clippy::cast_precision_loss)]
pub fn viewport_to_frame(viewport: ViewportSize, camera: &Camera, pick: &mut Pick) -> EngineResult<()> {
    if viewport.width == 0 {
        return Err(EngineError::invalid("cannot convert picks for a zero-width viewport"));
    }
    let pixels = viewport.width as f32;
    let frame_width = camera.frame_width;
    let frame_height = camera.frame_height();

    pick.x = pick.x / pixels * frame_width;
    pick.y = pick.y / pixels * frame_height;
    pick.width = pick.width / pixels * frame_width;
    pick.height = pick.height / pixels * frame_height;
    Ok(())
}
