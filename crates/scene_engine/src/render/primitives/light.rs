//! Directional lights applied by lit renderers

use crate::foundation::math::Vec3;
use crate::render::primitives::Colour;

/// Directional light with an ambient term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Direction the light travels, normalized
    pub direction: Vec3,
    /// Light colour
    pub colour: Colour,
    /// Ambient contribution in `[0, 1]`
    pub ambient: f32,
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, colour: Colour, ambient: f32) -> Self {
        Self {
            direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::z()),
            colour,
            ambient,
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::directional(Vec3::new(-0.3, -0.5, -1.0), Colour::WHITE, 0.2)
    }
}
