//! Vertex groups: the renderable geometry attached to scene nodes
//!
//! A vertex group is an indexed triangle list with a single flat colour.
//! Renderers decide whether it is drawn as faces, edges or vertices.

use std::collections::BTreeSet;

use crate::error::{EngineError, EngineResult};
use crate::foundation::math::Vec3;
use crate::render::primitives::Colour;
use crate::scene::Aabb;

/// Indexed triangle geometry with a flat colour
#[derive(Debug, Clone, PartialEq)]
pub struct VertexGroup {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    colour: Colour,
}

/// Corner order of a box: bit 0 selects max x, bit 1 max y, bit 2 max z.
/// Each face is wound counter-clockwise seen from outside.
const CUBOID_INDICES: [u32; 36] = [
    4, 5, 7, 4, 7, 6, // +Z
    1, 0, 2, 1, 2, 3, // -Z
    5, 1, 3, 5, 3, 7, // +X
    0, 4, 6, 0, 6, 2, // -X
    6, 7, 3, 6, 3, 2, // +Y
    0, 1, 5, 0, 5, 4, // -Y
];

impl VertexGroup {
    /// Create a vertex group from a triangle list
    ///
    /// # Arguments
    /// * `vertices` - Vertex positions in the node's local frame
    /// * `indices` - Three indices per triangle, counter-clockwise front faces
    /// * `colour` - Flat colour of the whole group
    ///
    /// # Errors
    /// `InvalidOperation` when the index count is not a multiple of three or
    /// an index is out of range.
    pub fn from_triangles(vertices: Vec<Vec3>, indices: Vec<u32>, colour: Colour) -> EngineResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(EngineError::invalid(format!(
                "triangle list has {} indices, not a multiple of three",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(EngineError::invalid(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }
        Ok(Self { vertices, indices, colour })
    }

    /// Axis-aligned box between two corners
    pub fn cuboid(min: Vec3, max: Vec3, colour: Colour) -> Self {
        let vertices = (0..8u32)
            .map(|corner| {
                Vec3::new(
                    if corner & 1 == 0 { min.x } else { max.x },
                    if corner & 2 == 0 { min.y } else { max.y },
                    if corner & 4 == 0 { min.z } else { max.z },
                )
            })
            .collect();
        Self {
            vertices,
            indices: CUBOID_INDICES.to_vec(),
            colour,
        }
    }

    /// Cube centred on the origin
    pub fn cube(half_extent: f32, colour: Colour) -> Self {
        let extent = Vec3::new(half_extent, half_extent, half_extent);
        Self::cuboid(-extent, extent, colour)
    }

    /// Flat double-sided ring in the XY plane centred on the origin
    ///
    /// # Arguments
    /// * `inner_radius` - Radius of the hole
    /// * `outer_radius` - Outer radius
    /// * `segments` - Number of quads around the ring (at least 3)
    /// * `colour` - Flat colour
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn annulus(inner_radius: f32, outer_radius: f32, segments: u32, colour: Colour) -> Self {
        let segments = segments.max(3);
        let mut vertices = Vec::with_capacity(segments as usize * 2);
        for i in 0..segments {
            let angle = std::f32::consts::TAU * i as f32 / segments as f32;
            let (sin, cos) = angle.sin_cos();
            vertices.push(Vec3::new(cos * inner_radius, sin * inner_radius, 0.0));
            vertices.push(Vec3::new(cos * outer_radius, sin * outer_radius, 0.0));
        }

        let mut indices = Vec::with_capacity(segments as usize * 12);
        for i in 0..segments {
            let j = (i + 1) % segments;
            let (inner_i, outer_i) = (2 * i, 2 * i + 1);
            let (inner_j, outer_j) = (2 * j, 2 * j + 1);
            indices.extend_from_slice(&[inner_i, outer_i, outer_j, inner_i, outer_j, inner_j]);
            indices.extend_from_slice(&[inner_i, outer_j, outer_i, inner_i, inner_j, outer_j]);
        }

        Self { vertices, indices, colour }
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Flat colour
    pub const fn colour(&self) -> Colour {
        self.colour
    }

    /// Replace the flat colour
    pub fn set_colour(&mut self, colour: Colour) {
        self.colour = colour;
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Unique triangle edges as index pairs, for line drawing
    pub fn edge_indices(&self) -> Vec<u32> {
        let edges: BTreeSet<(u32, u32)> = self
            .indices
            .chunks_exact(3)
            .flat_map(|t| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])])
            .map(|(a, b)| (a.min(b), a.max(b)))
            .collect();
        edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
    }

    /// Indices of every vertex, for point drawing
    #[allow(clippy::cast_possible_truncation)]
    pub fn point_indices(&self) -> Vec<u32> {
        (0..self.vertices.len() as u32).collect()
    }

    /// Bounding box of the vertices in the local frame
    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }
}
