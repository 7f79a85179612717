//! Scan conversion helpers
//!
//! Screen space has its origin at the top-left pixel corner with y growing
//! downwards; pixel centres sit at half-integer coordinates. Depth is the
//! window-space value in `[0, 1]`.

use crate::foundation::math::Vec4;
use crate::render::api::ViewportSize;

/// Vertices with a clip-space w at or below this are dropped
const MIN_W: f32 = 1e-6;

/// A vertex after projection, perspective divide and viewport mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Map a clip-space position to the viewport, `None` when behind the eye
pub(super) fn to_screen(clip: &Vec4, viewport: ViewportSize) -> Option<ScreenVertex> {
    if clip.w <= MIN_W {
        return None;
    }
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    let ndc_z = clip.z / clip.w;
    #[allow(clippy::cast_precision_loss)]
    let (width, height) = (viewport.width as f32, viewport.height as f32);
    Some(ScreenVertex {
        x: (ndc_x + 1.0) * 0.5 * width,
        y: (1.0 - ndc_y) * 0.5 * height,
        z: (ndc_z + 1.0) * 0.5,
    })
}

/// Twice the signed area of `abc` in normalized device orientation
///
/// Positive for counter-clockwise triangles as seen by the camera. Screen y
/// points down, so the screen-space cross product is negated.
pub(super) fn signed_area(a: &ScreenVertex, b: &ScreenVertex, c: &ScreenVertex) -> f32 {
    -((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x))
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Pixel range `[start, end)` covered by `[min, max]` on an axis of `size` pixels
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn pixel_span(min: f32, max: f32, size: u32) -> (u32, u32) {
    let start = min.floor().max(0.0) as u32;
    let end = (max.ceil().max(0.0) as u32).min(size);
    (start.min(size), end)
}

/// Visit every pixel whose centre lies inside the triangle
///
/// The callback receives the pixel and its interpolated depth. Either
/// winding is accepted; culling is the caller's decision.
#[allow(clippy::cast_precision_loss)]
pub(super) fn rasterize_triangle(
    a: &ScreenVertex,
    b: &ScreenVertex,
    c: &ScreenVertex,
    viewport: ViewportSize,
    mut fragment: impl FnMut(u32, u32, f32),
) {
    let area = edge(a, b, c.x, c.y);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let (x0, x1) = pixel_span(a.x.min(b.x).min(c.x), a.x.max(b.x).max(c.x), viewport.width);
    let (y0, y1) = pixel_span(a.y.min(b.y).min(c.y), a.y.max(b.y).max(c.y), viewport.height);

    for py in y0..y1 {
        for px in x0..x1 {
            let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
            let w0 = edge(b, c, cx, cy) / area;
            let w1 = edge(c, a, cx, cy) / area;
            let w2 = edge(a, b, cx, cy) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let z = w0 * a.z + w1 * b.z + w2 * c.z;
            if (0.0..=1.0).contains(&z) {
                fragment(px, py, z);
            }
        }
    }
}

/// Visit the pixels of a line segment with a DDA walk
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(super) fn rasterize_line(
    a: &ScreenVertex,
    b: &ScreenVertex,
    viewport: ViewportSize,
    mut fragment: impl FnMut(u32, u32, f32),
) {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let point = ScreenVertex {
            x: a.x + dx * t,
            y: a.y + dy * t,
            z: a.z + (b.z - a.z) * t,
        };
        rasterize_point(&point, viewport, &mut fragment);
    }
}

/// Visit the pixel containing a point
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub(super) fn rasterize_point(
    p: &ScreenVertex,
    viewport: ViewportSize,
    mut fragment: impl FnMut(u32, u32, f32),
) {
    if p.x < 0.0 || p.y < 0.0 || !(0.0..=1.0).contains(&p.z) {
        return;
    }
    let (px, py) = (p.x.floor() as u32, p.y.floor() as u32);
    if px < viewport.width && py < viewport.height {
        fragment(px, py, p.z);
    }
}
