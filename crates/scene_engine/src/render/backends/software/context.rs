//! # Software Graphics Context
//!
//! A complete CPU implementation of [`GraphicsContext`]: two RGBA8 + depth
//! framebuffers (screen and offscreen), less-or-equal depth testing, back-face
//! culling, Lambert lighting, source-alpha blending and pixel readback.
//!
//! Triangles with a vertex behind the eye are dropped rather than clipped,
//! which is adequate for editor previews and picking.
//!
//! Resizing reallocates both framebuffers. The previous screen contents are
//! kept aside and come back when the viewport returns to their size, so a
//! picker working at another resolution does not wipe the visible frame.

use std::any::Any;

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::render::api::{
    Capabilities, DrawCall, GraphicsContext, GraphicsError, GraphicsResult, PixelReadback,
    PixelRect, Primitive, RenderTarget, ViewportSize,
};
use crate::render::primitives::{Colour, Light};

use super::raster::{self, ScreenVertex};

/// Counters accumulated by draw calls since the last reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStats {
    /// Draw calls issued
    pub draw_calls: usize,
    /// Triangles, lines or points submitted
    pub primitives: usize,
    /// Fragments that passed the depth test and were written
    pub fragments: usize,
}

#[derive(Debug, Clone)]
struct Framebuffer {
    colour: Vec<[u8; 4]>,
    depth: Vec<f32>,
}

impl Framebuffer {
    fn new(size: ViewportSize) -> Self {
        let pixels = size.width as usize * size.height as usize;
        Self {
            colour: vec![[0; 4]; pixels],
            depth: vec![1.0; pixels],
        }
    }

    fn clear(&mut self, colour: [u8; 4]) {
        self.colour.fill(colour);
        self.depth.fill(1.0);
    }
}

/// Headless rasterising graphics context
#[derive(Debug, Clone)]
pub struct SoftwareContext {
    viewport: ViewportSize,
    screen: Framebuffer,
    parked_screen: Option<(ViewportSize, Framebuffer)>,
    offscreen: Framebuffer,
    target: RenderTarget,
    capabilities: Capabilities,
    clear_colour: Colour,
    view: Mat4,
    projection: Mat4,
    lights: Vec<Light>,
    stats: DrawStats,
}

impl SoftwareContext {
    /// Create a context with both framebuffers sized to `viewport`
    pub fn new(viewport: ViewportSize) -> Self {
        Self {
            viewport,
            screen: Framebuffer::new(viewport),
            parked_screen: None,
            offscreen: Framebuffer::new(viewport),
            target: RenderTarget::Screen,
            capabilities: Capabilities::empty(),
            clear_colour: Colour::TRANSPARENT,
            view: Mat4::identity(),
            projection: Mat4::identity(),
            lights: Vec::new(),
            stats: DrawStats::default(),
        }
    }

    /// Colour of one pixel of a framebuffer
    pub fn texel(&self, target: RenderTarget, x: u32, y: u32) -> Option<[u8; 4]> {
        let index = self.index(x, y)?;
        Some(self.framebuffer(target).colour[index])
    }

    /// Depth of one pixel of a framebuffer
    pub fn depth(&self, target: RenderTarget, x: u32, y: u32) -> Option<f32> {
        let index = self.index(x, y)?;
        Some(self.framebuffer(target).depth[index])
    }

    /// Number of pixels of a framebuffer that differ from `colour`
    pub fn count_texels_not(&self, target: RenderTarget, colour: [u8; 4]) -> usize {
        self.framebuffer(target).colour.iter().filter(|&&c| c != colour).count()
    }

    /// Counters since creation or the last reset
    pub const fn stats(&self) -> DrawStats {
        self.stats
    }

    /// Zero the draw counters
    pub fn reset_stats(&mut self) {
        self.stats = DrawStats::default();
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.viewport.width && y < self.viewport.height)
            .then(|| y as usize * self.viewport.width as usize + x as usize)
    }

    const fn framebuffer(&self, target: RenderTarget) -> &Framebuffer {
        match target {
            RenderTarget::Screen => &self.screen,
            RenderTarget::Offscreen => &self.offscreen,
        }
    }

    fn shade(&self, colour: Colour, world: [Vec3; 3]) -> Colour {
        if !self.capabilities.contains(Capabilities::LIGHTING) || self.lights.is_empty() {
            return colour;
        }
        let normal = (world[1] - world[0])
            .cross(&(world[2] - world[0]))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::z);

        let (mut r, mut g, mut b) = (0.0, 0.0, 0.0);
        for light in &self.lights {
            let diffuse = normal.dot(&-light.direction).max(0.0);
            let intensity = (light.ambient + diffuse).min(1.0);
            r += colour.r * light.colour.r * intensity;
            g += colour.g * light.colour.g * intensity;
            b += colour.b * light.colour.b * intensity;
        }
        Colour::rgba(r.min(1.0), g.min(1.0), b.min(1.0), colour.a)
    }

    fn write_fragment(&mut self, x: u32, y: u32, z: f32, colour: Colour) {
        let Some(index) = self.index(x, y) else { return };
        let capabilities = self.capabilities;
        let framebuffer = match self.target {
            RenderTarget::Screen => &mut self.screen,
            RenderTarget::Offscreen => &mut self.offscreen,
        };

        if capabilities.contains(Capabilities::DEPTH_TEST) {
            if z > framebuffer.depth[index] {
                return;
            }
            framebuffer.depth[index] = z;
        }

        let texel = if capabilities.contains(Capabilities::BLEND) {
            let dst = Colour::from_rgba8(framebuffer.colour[index]);
            let a = colour.a;
            Colour::rgba(
                colour.r * a + dst.r * (1.0 - a),
                colour.g * a + dst.g * (1.0 - a),
                colour.b * a + dst.b * (1.0 - a),
                a + dst.a * (1.0 - a),
            )
        } else {
            colour
        };
        framebuffer.colour[index] = texel.to_rgba8();
        self.stats.fragments += 1;
    }
}

impl GraphicsContext for SoftwareContext {
    fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    fn set_viewport(&mut self, size: ViewportSize) {
        if size != self.viewport {
            log::debug!("Software context resized to {}x{}", size.width, size.height);
            let screen = match self.parked_screen.take() {
                Some((parked, framebuffer)) if parked == size => framebuffer,
                _ => Framebuffer::new(size),
            };
            let previous = std::mem::replace(&mut self.screen, screen);
            self.parked_screen = Some((self.viewport, previous));
            self.viewport = size;
            self.offscreen = Framebuffer::new(size);
        }
    }

    fn render_target(&self) -> RenderTarget {
        self.target
    }

    fn set_render_target(&mut self, target: RenderTarget) {
        self.target = target;
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn enable(&mut self, capabilities: Capabilities) {
        self.capabilities.insert(capabilities);
    }

    fn disable(&mut self, capabilities: Capabilities) {
        self.capabilities.remove(capabilities);
    }

    fn clear_colour(&self) -> Colour {
        self.clear_colour
    }

    fn set_clear_colour(&mut self, colour: Colour) {
        self.clear_colour = colour;
    }

    fn clear(&mut self) {
        let colour = self.clear_colour.to_rgba8();
        match self.target {
            RenderTarget::Screen => self.screen.clear(colour),
            RenderTarget::Offscreen => self.offscreen.clear(colour),
        }
    }

    fn set_camera(&mut self, view: &Mat4, projection: &Mat4) {
        self.view = *view;
        self.projection = *projection;
    }

    fn set_lights(&mut self, lights: &[Light]) {
        self.lights = lights.to_vec();
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> GraphicsResult<()> {
        let arity = match call.primitive {
            Primitive::Triangles => 3,
            Primitive::Lines => 2,
            Primitive::Points => 1,
        };
        if call.indices.len() % arity != 0 {
            return Err(GraphicsError::InvalidDrawCall(format!(
                "{} indices do not form whole {:?}",
                call.indices.len(),
                call.primitive
            )));
        }
        if let Some(bad) = call.indices.iter().find(|&&i| i as usize >= call.vertices.len()) {
            return Err(GraphicsError::InvalidDrawCall(format!(
                "index {} out of range for {} vertices",
                bad,
                call.vertices.len()
            )));
        }

        self.stats.draw_calls += 1;
        self.stats.primitives += call.indices.len() / arity;

        let mvp = self.projection * self.view * call.model;
        let viewport = self.viewport;
        let screen: Vec<Option<ScreenVertex>> = call
            .vertices
            .iter()
            .map(|v| raster::to_screen(&(mvp * Vec4::new(v.x, v.y, v.z, 1.0)), viewport))
            .collect();
        let mut fragments = Vec::new();

        match call.primitive {
            Primitive::Triangles => {
                let cull = self.capabilities.contains(Capabilities::CULL_FACE);
                for triangle in call.indices.chunks_exact(3) {
                    let corners = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
                    let (Some(a), Some(b), Some(c)) = (screen[corners[0]], screen[corners[1]], screen[corners[2]]) else {
                        continue;
                    };
                    if cull && raster::signed_area(&a, &b, &c) <= 0.0 {
                        continue;
                    }
                    let world = corners.map(|i| call.model.transform_point(&Point3::from(call.vertices[i])).coords);
                    let colour = self.shade(call.colour, world);
                    raster::rasterize_triangle(&a, &b, &c, viewport, |x, y, z| fragments.push((x, y, z, colour)));
                }
            }
            Primitive::Lines => {
                for line in call.indices.chunks_exact(2) {
                    if let (Some(a), Some(b)) = (screen[line[0] as usize], screen[line[1] as usize]) {
                        raster::rasterize_line(&a, &b, viewport, |x, y, z| fragments.push((x, y, z, call.colour)));
                    }
                }
            }
            Primitive::Points => {
                for &index in call.indices {
                    if let Some(p) = screen[index as usize] {
                        raster::rasterize_point(&p, viewport, |x, y, z| fragments.push((x, y, z, call.colour)));
                    }
                }
            }
        }

        for (x, y, z, colour) in fragments {
            self.write_fragment(x, y, z, colour);
        }
        Ok(())
    }

    fn read_pixels(&self, rect: PixelRect) -> GraphicsResult<PixelReadback> {
        if !rect.fits(self.viewport) {
            return Err(GraphicsError::ReadbackOutOfBounds {
                rect,
                viewport: self.viewport,
            });
        }
        let framebuffer = self.framebuffer(self.target);
        let mut texels = Vec::with_capacity(rect.area());
        let mut depth = Vec::with_capacity(rect.area());
        for y in rect.y..rect.y + rect.height {
            let start = y as usize * self.viewport.width as usize + rect.x as usize;
            let end = start + rect.width as usize;
            texels.extend_from_slice(&framebuffer.colour[start..end]);
            depth.extend_from_slice(&framebuffer.depth[start..end]);
        }
        Ok(PixelReadback {
            rect,
            colour: bytemuck::cast_slice(&texels).to_vec(),
            depth,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::StateScope;
    use approx::assert_relative_eq;

    const RED: Colour = Colour::rgb(1.0, 0.0, 0.0);
    const BLUE: Colour = Colour::rgb(0.0, 0.0, 1.0);

    fn triangle(z: f32) -> [Vec3; 3] {
        [Vec3::new(-1.0, -1.0, z), Vec3::new(1.0, -1.0, z), Vec3::new(0.0, 1.0, z)]
    }

    fn draw(ctx: &mut SoftwareContext, vertices: &[Vec3], indices: &[u32], colour: Colour) {
        ctx.draw(&DrawCall {
            primitive: Primitive::Triangles,
            vertices,
            indices,
            colour,
            model: Mat4::identity(),
        })
        .unwrap();
    }

    #[test]
    fn test_clear_fills_current_target() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(4, 4));
        ctx.set_clear_colour(BLUE);

        ctx.clear();

        assert_eq!(ctx.texel(RenderTarget::Screen, 3, 3), Some([0, 0, 255, 255]));
        assert_eq!(ctx.texel(RenderTarget::Offscreen, 3, 3), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_triangle_covers_centre() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.enable(Capabilities::DEPTH_TEST);

        draw(&mut ctx, &triangle(0.0), &[0, 1, 2], RED);

        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([255, 0, 0, 255]));
        assert_relative_eq!(ctx.depth(RenderTarget::Screen, 4, 4).unwrap(), 0.5);
        assert_eq!(ctx.texel(RenderTarget::Screen, 0, 0), Some([0, 0, 0, 0]));
        assert_eq!(ctx.stats().draw_calls, 1);
    }

    #[test]
    fn test_cull_face_discards_clockwise() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.enable(Capabilities::CULL_FACE);

        draw(&mut ctx, &triangle(0.0), &[0, 2, 1], RED);
        assert_eq!(ctx.count_texels_not(RenderTarget::Screen, [0, 0, 0, 0]), 0);

        ctx.disable(Capabilities::CULL_FACE);
        draw(&mut ctx, &triangle(0.0), &[0, 2, 1], RED);
        assert!(ctx.count_texels_not(RenderTarget::Screen, [0, 0, 0, 0]) > 0);
    }

    #[test]
    fn test_depth_test_keeps_nearest() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.enable(Capabilities::DEPTH_TEST);

        draw(&mut ctx, &triangle(-0.5), &[0, 1, 2], RED);
        draw(&mut ctx, &triangle(0.5), &[0, 1, 2], BLUE);
        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([255, 0, 0, 255]));

        ctx.disable(Capabilities::DEPTH_TEST);
        draw(&mut ctx, &triangle(0.5), &[0, 1, 2], BLUE);
        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_blend_mixes_with_destination() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.set_clear_colour(Colour::WHITE);
        ctx.clear();
        ctx.enable(Capabilities::BLEND);

        draw(&mut ctx, &triangle(0.0), &[0, 1, 2], Colour::rgba(0.0, 0.0, 0.0, 0.5));

        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([128, 128, 128, 255]));
    }

    #[test]
    fn test_lighting_darkens_faces_turned_away() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.enable(Capabilities::LIGHTING);
        ctx.set_lights(&[Light::directional(Vec3::new(0.0, 0.0, 1.0), Colour::WHITE, 0.25)]);

        draw(&mut ctx, &triangle(0.0), &[0, 1, 2], Colour::WHITE);

        // Facing +Z while the light travels +Z: ambient only
        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([64, 64, 64, 255]));
    }

    #[test]
    fn test_offscreen_target_is_separate() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.set_render_target(RenderTarget::Offscreen);

        draw(&mut ctx, &triangle(0.0), &[0, 1, 2], RED);

        assert_eq!(ctx.texel(RenderTarget::Offscreen, 4, 4), Some([255, 0, 0, 255]));
        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([0, 0, 0, 0]));
        let readback = ctx.read_pixels(PixelRect::new(4, 4, 1, 1)).unwrap();
        assert_eq!(readback.texels(), &[[255, 0, 0, 255]]);
    }

    #[test]
    fn test_read_pixels_bounds() {
        let ctx = SoftwareContext::new(ViewportSize::new(8, 8));

        assert!(ctx.read_pixels(PixelRect::new(6, 6, 2, 2)).is_ok());
        assert!(matches!(
            ctx.read_pixels(PixelRect::new(7, 7, 2, 2)),
            Err(GraphicsError::ReadbackOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_invalid_draw_call() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        let result = ctx.draw(&DrawCall {
            primitive: Primitive::Triangles,
            vertices: &triangle(0.0),
            indices: &[0, 1, 5],
            colour: RED,
            model: Mat4::identity(),
        });

        assert!(matches!(result, Err(GraphicsError::InvalidDrawCall(_))));
    }

    #[test]
    fn test_state_scope_restores() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        ctx.enable(Capabilities::LIGHTING);
        let scope = StateScope::capture(&ctx);

        ctx.disable(Capabilities::LIGHTING);
        ctx.enable(Capabilities::BLEND | Capabilities::DEPTH_TEST);
        ctx.set_clear_colour(RED);
        ctx.set_render_target(RenderTarget::Offscreen);
        scope.restore(&mut ctx);

        assert_eq!(ctx.capabilities(), Capabilities::LIGHTING);
        assert_eq!(ctx.clear_colour(), Colour::TRANSPARENT);
        assert_eq!(ctx.render_target(), RenderTarget::Screen);
    }

    #[test]
    fn test_resize_round_trip_keeps_screen() {
        let mut ctx = SoftwareContext::new(ViewportSize::new(8, 8));
        draw(&mut ctx, &triangle(0.0), &[0, 1, 2], RED);
        let scope = StateScope::capture(&ctx);

        ctx.set_viewport(ViewportSize::new(4, 4));
        ctx.set_render_target(RenderTarget::Offscreen);
        ctx.set_clear_colour(BLUE);
        ctx.clear();
        assert_eq!(ctx.texel(RenderTarget::Screen, 2, 2), Some([0, 0, 0, 0]));
        scope.restore(&mut ctx);

        assert_eq!(ctx.viewport(), ViewportSize::new(8, 8));
        assert_eq!(ctx.texel(RenderTarget::Screen, 4, 4), Some([255, 0, 0, 255]));
        assert_eq!(ctx.texel(RenderTarget::Offscreen, 4, 4), Some([0, 0, 0, 0]));

        ctx.set_viewport(ViewportSize::new(6, 6));
        ctx.set_viewport(ViewportSize::new(5, 5));
        ctx.set_viewport(ViewportSize::new(8, 8));
        assert_eq!(ctx.count_texels_not(RenderTarget::Screen, [0, 0, 0, 0]), 0);
    }
}
