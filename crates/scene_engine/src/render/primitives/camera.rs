//! # Camera
//!
//! A viewpoint described by a frame on the near clipping plane. The frame has a
//! width, an aspect ratio (height / width) and an offset of its centre from the
//! view axis; the projection is the off-axis frustum (or box, when orthogonal)
//! through that frame.
//!
//! ## Design
//! - The camera is a plain value owned by its [`Scene`](crate::scene::Scene).
//! - Its view transform comes from an optional node in the same scene. The
//!   view matrix is cached and refreshed by `Scene::sync_cameras`, so engines
//!   only need `&Camera` and never reach into the graph.

use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;
use crate::foundation::math::{translation_of, Mat4, Mat4Ext, Vec3};
use crate::scene::{Frustum, NodeKey};

/// Projection kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Perspective projection through the near-plane frame
    #[default]
    Perspective,
    /// Parallel projection of the frame
    Orthogonal,
}

/// Camera viewing a scene
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Node whose absolute transformation places the camera
    pub node: Option<NodeKey>,
    /// Horizontal offset of the frame centre from the view axis
    pub frame_x: f32,
    /// Vertical offset of the frame centre from the view axis
    pub frame_y: f32,
    /// Width of the frame on the near plane
    pub frame_width: f32,
    /// Frame height divided by frame width
    pub frame_aspect_ratio: f32,
    /// Distance to the near clipping plane
    pub near_clipping_distance: f32,
    /// Distance to the far clipping plane
    pub far_clipping_distance: f32,
    /// Projection kind
    pub projection_mode: ProjectionMode,
    view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    /// Create a camera with default frame and clipping distances
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera from editor camera settings
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            node: None,
            frame_x: 0.0,
            frame_y: 0.0,
            frame_width: config.frame_width,
            frame_aspect_ratio: config.frame_aspect_ratio,
            near_clipping_distance: config.near_clipping_distance,
            far_clipping_distance: config.far_clipping_distance,
            projection_mode: config.projection,
            view: Mat4::identity(),
        }
    }

    /// Attach the camera to a node of its scene
    pub fn with_node(mut self, node: NodeKey) -> Self {
        self.node = Some(node);
        self
    }

    /// Height of the frame on the near plane
    pub fn frame_height(&self) -> f32 {
        self.frame_width * self.frame_aspect_ratio
    }

    /// Frame edges on the near plane as `(left, right, bottom, top)`
    pub fn frame_bounds(&self) -> (f32, f32, f32, f32) {
        let half_width = self.frame_width * 0.5;
        let half_height = self.frame_height() * 0.5;
        (
            self.frame_x - half_width,
            self.frame_x + half_width,
            self.frame_y - half_height,
            self.frame_y + half_height,
        )
    }

    /// Projection matrix for the current frame and mode
    pub fn projection_matrix(&self) -> Mat4 {
        let (left, right, bottom, top) = self.frame_bounds();
        match self.projection_mode {
            ProjectionMode::Perspective => Mat4::frustum(
                left, right, bottom, top,
                self.near_clipping_distance, self.far_clipping_distance,
            ),
            ProjectionMode::Orthogonal => Mat4::orthographic(
                left, right, bottom, top,
                self.near_clipping_distance, self.far_clipping_distance,
            ),
        }
    }

    /// Cached world-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Replace the cached view matrix
    ///
    /// Cameras attached to a node have this overwritten by `Scene::sync_cameras`.
    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Place the camera from its node's absolute transformation
    pub(crate) fn sync_from_world(&mut self, world: &Mat4) {
        self.view = world.try_inverse().unwrap_or_else(|| {
            log::warn!("Camera node transformation is singular; using identity view");
            Mat4::identity()
        });
    }

    /// Combined projection * view matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }

    /// World-space camera position
    pub fn position(&self) -> Vec3 {
        self.view
            .try_inverse()
            .map_or_else(Vec3::zeros, |world| translation_of(&world))
    }

    /// Clip planes of the view volume, for culling
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use crate::scene::Aabb;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_frame() {
        let camera = Camera::new();

        assert_relative_eq!(camera.frame_width, 0.1);
        assert_relative_eq!(camera.frame_aspect_ratio, 0.75);
        assert_relative_eq!(camera.frame_height(), 0.075);
        assert_relative_eq!(camera.near_clipping_distance, 0.1);
        assert_relative_eq!(camera.far_clipping_distance, 1000.0);
    }

    #[test]
    fn test_frame_corner_projects_to_ndc_corner() {
        let camera = Camera::new();
        let (_, right, _, top) = camera.frame_bounds();

        let ndc = camera
            .view_projection()
            .transform_point(&Point3::new(right, top, -camera.near_clipping_distance));

        assert_relative_eq!(ndc.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_frustum_culls_boxes_behind_camera() {
        let mut camera = Camera::new();
        camera.sync_from_world(&Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0)));
        let frustum = camera.frustum();

        let in_front = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let behind = Aabb::new(Vec3::new(-1.0, -1.0, 20.0), Vec3::new(1.0, 1.0, 22.0));

        assert!(frustum.intersects_aabb(&in_front));
        assert!(!frustum.intersects_aabb(&behind));
    }

    #[test]
    fn test_position_follows_view() {
        let mut camera = Camera::new();
        camera.sync_from_world(&Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)));

        assert_relative_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-5);
    }
}
