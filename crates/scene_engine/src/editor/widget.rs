//! Manipulation widgets
//!
//! A widget is a small subgraph drawn over the selected node: three axis
//! handles under a common root. Handles are translucent until selected.

use crate::error::{EngineError, EngineResult};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::primitives::{Colour, VertexGroup};
use crate::scene::{Node, NodeKey, SceneGraph};

/// Alpha of handles that are not selected
pub const IDLE_ALPHA: f32 = 0.5;
/// Alpha of the selected handle
pub const SELECTED_ALPHA: f32 = 1.0;

const HANDLE_LENGTH: f32 = 1.0;
const HANDLE_THICKNESS: f32 = 0.05;
const RING_INNER_RADIUS: f32 = 0.9;
const RING_SEGMENTS: u32 = 32;

/// Widget shown over the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Widget {
    /// No widget
    #[default]
    None,
    /// One bar per axis
    Translation,
    /// One ring per axis
    Rotation,
}

/// Axis of a widget handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// X axis, red
    X,
    /// Y axis, green
    Y,
    /// Z axis, blue
    Z,
}

impl Axis {
    /// All axes in handle order
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Handle colour at idle alpha
    pub const fn colour(self) -> Colour {
        match self {
            Axis::X => Colour::rgba(1.0, 0.0, 0.0, IDLE_ALPHA),
            Axis::Y => Colour::rgba(0.0, 1.0, 0.0, IDLE_ALPHA),
            Axis::Z => Colour::rgba(0.0, 0.0, 1.0, IDLE_ALPHA),
        }
    }

    fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::new(1.0, 0.0, 0.0),
            Axis::Y => Vec3::new(0.0, 1.0, 0.0),
            Axis::Z => Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

fn translation_handle(axis: Axis) -> Node {
    let half = Vec3::new(HANDLE_THICKNESS, HANDLE_THICKNESS, HANDLE_THICKNESS) * 0.5;
    let max = half + axis.unit() * HANDLE_LENGTH;
    Node::new().with_model(VertexGroup::cuboid(-half, max, axis.colour()))
}

fn rotation_handle(axis: Axis) -> Node {
    // Rings are built in the XY plane, which is already normal to Z
    let orientation = match axis {
        Axis::X => Mat4::rotation_y(std::f32::consts::FRAC_PI_2),
        Axis::Y => Mat4::rotation_x(std::f32::consts::FRAC_PI_2),
        Axis::Z => Mat4::identity(),
    };
    Node::new()
        .with_model(VertexGroup::annulus(RING_INNER_RADIUS, HANDLE_LENGTH, RING_SEGMENTS, axis.colour()))
        .with_transformation(orientation)
}

/// Build a widget as a detached subtree of `graph`
///
/// Returns the widget root, or `None` for [`Widget::None`]. Handles are the
/// root's children in [`Axis::ALL`] order.
///
/// # Errors
/// Propagates graph failures, which indicate a bug.
pub fn build_widget(graph: &mut SceneGraph, widget: Widget) -> EngineResult<Option<NodeKey>> {
    let handle: fn(Axis) -> Node = match widget {
        Widget::None => return Ok(None),
        Widget::Translation => translation_handle,
        Widget::Rotation => rotation_handle,
    };
    let root = graph.create_node();
    for axis in Axis::ALL {
        let child = graph.insert_node(handle(axis));
        graph.add_child(root, child)?;
    }
    log::debug!("Built {:?} widget", widget);
    Ok(Some(root))
}

/// Make `selected` opaque and every other handle under `root` translucent
///
/// # Errors
/// `InvalidOperation` when `selected` is not a handle of the widget.
pub fn highlight_component(graph: &mut SceneGraph, root: NodeKey, selected: Option<NodeKey>) -> EngineResult<()> {
    let handles = graph
        .node(root)
        .map(|node| node.children().to_vec())
        .ok_or_else(|| EngineError::invalid("widget root is not in the widget graph"))?;
    if let Some(selected) = selected {
        if !handles.contains(&selected) {
            return Err(EngineError::invalid(format!("{selected:?} is not a widget handle")));
        }
    }
    for handle in handles {
        let alpha = if Some(handle) == selected { SELECTED_ALPHA } else { IDLE_ALPHA };
        if let Some(model) = graph.model_mut(handle) {
            let colour = model.colour().with_alpha(alpha);
            model.set_colour(colour);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_none_builds_nothing() {
        let mut graph = SceneGraph::new();
        assert_eq!(build_widget(&mut graph, Widget::None).unwrap(), None);
        assert_eq!(graph.member_count(), 1);
    }

    #[test]
    fn test_widgets_have_three_translucent_handles() {
        for widget in [Widget::Translation, Widget::Rotation] {
            let mut graph = SceneGraph::new();
            let root = build_widget(&mut graph, widget).unwrap().unwrap();

            let handles = graph.node(root).unwrap().children().to_vec();
            assert_eq!(handles.len(), 3);
            for (handle, axis) in handles.iter().zip(Axis::ALL) {
                let colour = graph.node(*handle).unwrap().model().unwrap().colour();
                assert_eq!(colour, axis.colour());
            }
            assert!(!graph.is_member(root));
        }
    }

    #[test]
    fn test_translation_handles_point_along_axes() {
        let mut graph = SceneGraph::new();
        let root = build_widget(&mut graph, Widget::Translation).unwrap().unwrap();
        let y_handle = graph.node(root).unwrap().children()[1];

        let bounds = graph.bounds(y_handle).unwrap();

        assert_relative_eq!(bounds.max.y, HANDLE_LENGTH + HANDLE_THICKNESS * 0.5);
        assert_relative_eq!(bounds.max.x, HANDLE_THICKNESS * 0.5);
    }

    #[test]
    fn test_highlight_component() {
        let mut graph = SceneGraph::new();
        let root = build_widget(&mut graph, Widget::Rotation).unwrap().unwrap();
        let handles = graph.node(root).unwrap().children().to_vec();

        highlight_component(&mut graph, root, Some(handles[2])).unwrap();
        let alpha = |key| graph.node(key).unwrap().model().unwrap().colour().a;
        assert_relative_eq!(alpha(handles[2]), SELECTED_ALPHA);
        assert_relative_eq!(alpha(handles[0]), IDLE_ALPHA);

        highlight_component(&mut graph, root, None).unwrap();
        assert_relative_eq!(graph.node(handles[2]).unwrap().model().unwrap().colour().a, IDLE_ALPHA);

        assert!(highlight_component(&mut graph, root, Some(root)).unwrap_err().is_invalid_operation());
    }
}
