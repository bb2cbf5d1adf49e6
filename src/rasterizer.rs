//! Edge-function scanline rasterizer.
//!
//! Walks the bounding box of a screen-space triangle, using the sign of the
//! edge function at each pixel center to test containment (Pineda 1988) and
//! the resulting barycentric weights, corrected for perspective, to
//! interpolate depth, color and texture coordinates.

use crate::color::RgbF32;
use crate::framebuffer::{DepthBuffer, RasterTarget};
use crate::math::vec2::Vec2;
use crate::pixel::Pixel;
use crate::shader::ShaderFlags;
use crate::texture::Texture;

/// A single screen-space vertex, already viewport-mapped.
#[derive(Clone, Copy, Debug)]
pub struct ScreenVertex {
    pub x: f32,
    pub y: f32,
    /// `1/w` for perspective projections, or `2 - ndc_z` for orthographic;
    /// in both cases a finite, positive value used for both the depth test
    /// and perspective-correct attribute interpolation.
    pub inv_w: f32,
    pub color: RgbF32,
    pub texcoord: Vec2,
}

/// A fully resolved triangle ready for scan conversion.
pub struct ScreenTriangle {
    pub vertices: [ScreenVertex; 3],
    pub flags: ShaderFlags,
}

#[inline]
fn edge_function(a: (f32, f32), b: (f32, f32), p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Rasterizes `tri` into `target`, depth-testing against `depth` when
/// present and sampling `texture` when [`ShaderFlags::TEXTURE`] is set.
pub fn rasterize_triangle<P: Pixel>(
    tri: &ScreenTriangle,
    target: &mut RasterTarget<'_, P>,
    mut depth: Option<&mut DepthBuffer<'_>>,
    texture: Option<&Texture<'_>>,
) {
    let [v0, v1, v2] = tri.vertices;
    let p0 = (v0.x, v0.y);
    let p1 = (v1.x, v1.y);
    let p2 = (v2.x, v2.y);

    let area = edge_function(p0, p1, p2);
    if area.abs() < f32::EPSILON {
        return;
    }
    let inv_area = 1.0 / area;

    let min_x = p0.0.min(p1.0).min(p2.0).floor().max(0.0) as i32;
    let max_x = p0.0.max(p1.0).max(p2.0).ceil().min(target.width() as f32) as i32;
    let min_y = p0.1.min(p1.1).min(p2.1).floor().max(0.0) as i32;
    let max_y = p0.1.max(p1.1).max(p2.1).ceil().min(target.height() as f32) as i32;

    let gouraud = tri.flags.contains(ShaderFlags::GOURAUD);
    let textured = tri.flags.contains(ShaderFlags::TEXTURE) && texture.is_some();

    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge_function(p1, p2, p) * inv_area;
            let w1 = edge_function(p2, p0, p) * inv_area;
            let w2 = edge_function(p0, p1, p) * inv_area;

            // Accept pixels strictly inside for either winding order.
            let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0) || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
            if !inside {
                continue;
            }

            let inv_w = w0 * v0.inv_w + w1 * v1.inv_w + w2 * v2.inv_w;
            if inv_w <= 0.0 {
                continue;
            }

            if let Some(d) = depth.as_deref_mut() {
                if !d.test_and_set(x, y, inv_w) {
                    continue;
                }
            }

            // Perspective-correct weighting: divide each barycentric weight
            // by its vertex's inv_w before interpolating, then renormalize.
            let pw0 = w0 * v0.inv_w;
            let pw1 = w1 * v1.inv_w;
            let pw2 = w2 * v2.inv_w;
            let norm = 1.0 / (pw0 + pw1 + pw2);

            let color = if textured {
                let u = (pw0 * v0.texcoord.x + pw1 * v1.texcoord.x + pw2 * v2.texcoord.x) * norm;
                let v = (pw0 * v0.texcoord.y + pw1 * v1.texcoord.y + pw2 * v2.texcoord.y) * norm;
                let texel = texture.unwrap().sample(u, v);
                if gouraud {
                    let light = RgbF32::new(
                        pw0 * v0.color.r + pw1 * v1.color.r + pw2 * v2.color.r,
                        pw0 * v0.color.g + pw1 * v1.color.g + pw2 * v2.color.g,
                        pw0 * v0.color.b + pw1 * v1.color.b + pw2 * v2.color.b,
                    )
                    .scale(norm);
                    texel * light
                } else {
                    texel * v0.color
                }
            } else if gouraud {
                RgbF32::new(
                    pw0 * v0.color.r + pw1 * v1.color.r + pw2 * v2.color.r,
                    pw0 * v0.color.g + pw1 * v1.color.g + pw2 * v2.color.g,
                    pw0 * v0.color.b + pw1 * v1.color.b + pw2 * v2.color.b,
                )
                .scale(norm)
            } else {
                v0.color
            };

            target.set_pixel(x, y, color);
        }
    }
}
