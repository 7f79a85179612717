//! Scenes: a scene graph together with the cameras and lights that view it

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::render::primitives::{Camera, Light};
use crate::scene::{GraphId, NodeKey, SceneGraph};

/// Index of a camera within its scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub usize);

/// A scene graph plus its cameras, lights and metadata attributes
#[derive(Debug)]
pub struct Scene {
    name: String,
    graph: SceneGraph,
    cameras: Vec<Camera>,
    lights: Vec<Light>,
    attributes: BTreeMap<String, String>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("untitled")
    }
}

impl Scene {
    /// Attribute naming the registry key of the preferred scene renderer
    pub const PREFERRED_RENDERER: &'static str = "preferredRenderer";
    /// Attribute naming the registry key of the preferred picker
    pub const PREFERRED_PICKER: &'static str = "preferredPicker";
    /// Attribute holding the index of the camera editors view the scene through
    pub const DEFAULT_CAMERA: &'static str = "defaultCamera";

    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: SceneGraph::new(),
            cameras: Vec::new(),
            lights: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the scene's graph
    pub const fn id(&self) -> GraphId {
        self.graph.id()
    }

    /// Root node of the scene graph
    pub const fn root(&self) -> NodeKey {
        self.graph.root()
    }

    /// The scene graph
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable access to the scene graph
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    /// Add a camera
    ///
    /// # Errors
    /// `InvalidOperation` when the camera is attached to a node this scene's
    /// graph does not hold.
    pub fn add_camera(&mut self, camera: Camera) -> EngineResult<CameraId> {
        if let Some(node) = camera.node {
            if !self.graph.contains(node) {
                return Err(EngineError::invalid(format!(
                    "camera node {node:?} does not belong to scene '{}'",
                    self.name
                )));
            }
        }
        self.cameras.push(camera);
        let id = CameraId(self.cameras.len() - 1);
        self.sync_camera(id);
        Ok(id)
    }

    /// Look up a camera
    pub fn camera(&self, id: CameraId) -> Option<&Camera> {
        self.cameras.get(id.0)
    }

    /// Mutable access to a camera
    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut Camera> {
        self.cameras.get_mut(id.0)
    }

    /// All cameras in insertion order
    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// Add a light
    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    /// All lights
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Read a metadata attribute
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set a metadata attribute
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Refresh every node-attached camera's view from its node's current placement
    pub fn sync_cameras(&mut self) {
        for index in 0..self.cameras.len() {
            self.sync_camera(CameraId(index));
        }
    }

    fn sync_camera(&mut self, id: CameraId) {
        let Some(camera) = self.cameras.get_mut(id.0) else { return };
        if let Some(world) = camera.node.and_then(|node| self.graph.absolute_transformation(node)) {
            camera.sync_from_world(&world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_camera_follows_node() {
        let mut scene = Scene::new("test");
        let node = scene.graph_mut().create_node();
        scene.graph_mut().add_subgraph(node).unwrap();
        scene
            .graph_mut()
            .set_transformation(node, Mat4::new_translation(&Vec3::new(0.0, 0.0, 10.0)))
            .unwrap();
        let id = scene.add_camera(Camera::new().with_node(node)).unwrap();
        assert_relative_eq!(scene.camera(id).unwrap().position(), Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-5);

        scene
            .graph_mut()
            .set_transformation(node, Mat4::new_translation(&Vec3::new(0.0, 3.0, 10.0)))
            .unwrap();
        scene.sync_cameras();

        assert_relative_eq!(scene.camera(id).unwrap().position(), Vec3::new(0.0, 3.0, 10.0), epsilon = 1e-5);
    }

    #[test]
    fn test_camera_node_must_belong_to_scene() {
        let mut scene = Scene::new("test");
        let discarded = scene.graph_mut().create_node();
        scene.graph_mut().discard_subgraph(discarded).unwrap();

        assert!(scene.add_camera(Camera::new().with_node(discarded)).unwrap_err().is_invalid_operation());
        assert!(scene.cameras().is_empty());
    }

    #[test]
    fn test_attributes() {
        let mut scene = Scene::new("test");
        scene.set_attribute(Scene::PREFERRED_RENDERER, "outline");

        assert_eq!(scene.attribute(Scene::PREFERRED_RENDERER), Some("outline"));
        assert_eq!(scene.attribute(Scene::PREFERRED_PICKER), None);
    }
}
