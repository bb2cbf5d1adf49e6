//! Directional light and Phong shading.
//!
//! Builds on the teacher's single-term `intensity()` model with a full
//! ambient + diffuse + specular evaluation and a lookup table for the
//! specular power term, since `powf` is one of the more expensive
//! transcendental calls a per-pixel or per-vertex shader can make.

use crate::color::RgbF32;
use crate::math::vec3::Vec3;

/// A directional light, parameterized the way a fixed-function pipeline
/// would be: separate ambient/diffuse/specular color terms rather than a
/// single intensity, so each term can be tuned (or zeroed) independently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Normalized direction the light travels *toward* the surface.
    pub direction: Vec3,
    pub ambient: RgbF32,
    pub diffuse: RgbF32,
    pub specular: RgbF32,
}

impl DirectionalLight {
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction: direction.normalize(),
            ambient: RgbF32::new(0.1, 0.1, 0.1),
            diffuse: RgbF32::WHITE,
            specular: RgbF32::WHITE,
        }
    }
}

/// Surface reflectance properties combined with the light to produce a
/// final color. `specular_exponent` must be a positive integer; zero or
/// negative values are clamped to 1 when the power table is rebuilt.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub color: RgbF32,
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
    pub specular_strength: f32,
    pub specular_exponent: i32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: RgbF32::WHITE,
            ambient_strength: 1.0,
            diffuse_strength: 1.0,
            specular_strength: 1.0,
            specular_exponent: 32,
        }
    }
}

/// 16-entry lookup table approximating `x.powf(exponent)` over the range of
/// `x` where the result is non-negligible. Rebuilt only when the exponent
/// changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowTable {
    exponent: i32,
    lo: f32,
    entries: [f32; 16],
}

impl Default for PowTable {
    fn default() -> Self {
        let mut t = PowTable { exponent: 0, lo: 0.0, entries: [0.0; 16] };
        t.rebuild(1);
        t
    }
}

impl PowTable {
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Rebuilds the table for a new exponent. A no-op if the exponent hasn't
    /// changed, so callers can call this unconditionally from a setter.
    pub fn rebuild(&mut self, exponent: i32) {
        let exponent = exponent.max(1);
        if exponent == self.exponent {
            return;
        }
        self.exponent = exponent;
        let e = exponent as f32;
        // Above exponent 8, low input values contribute nothing visible to
        // the highlight; narrowing the table to [lo, 1] keeps resolution
        // where the curve is steep.
        self.lo = 1.0 - (e.min(8.0) / e);
        for (i, slot) in self.entries.iter_mut().enumerate() {
            let t = i as f32 / 15.0;
            let x = self.lo + t * (1.0 - self.lo);
            *slot = x.powf(e);
        }
    }

    /// Linearly interpolated approximation of `x.powf(exponent)` for
    /// `x` in `[0, 1]`. Returns `0.0` below the tabulated range and `1.0`
    /// at or above `x = 1`.
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        if x <= self.lo {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let t = (x - self.lo) / (1.0 - self.lo) * 15.0;
        let i0 = t.floor() as usize;
        let i1 = (i0 + 1).min(15);
        let frac = t - i0 as f32;
        self.entries[i0] + (self.entries[i1] - self.entries[i0]) * frac
    }
}

/// Ambient/diffuse/specular light-times-strength products, recomputed once
/// whenever the light or material strengths change (see
/// [`crate::renderer::DerivedCache`]) instead of on every shaded vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PremultipliedLight {
    pub ambient: RgbF32,
    pub diffuse: RgbF32,
    pub specular: RgbF32,
}

impl PremultipliedLight {
    pub fn recompute(light: &DirectionalLight, material: &Material) -> Self {
        Self {
            ambient: light.ambient.scale(material.ambient_strength),
            diffuse: light.diffuse.scale(material.diffuse_strength),
            specular: light.specular.scale(material.specular_strength),
        }
    }
}

/// Evaluates ambient + diffuse + specular Phong shading from already
/// computed dot products.
///
/// `v_diffuse` and `v_specular` are `N·L` and `N·H` respectively, where `N`
/// may be an un-renormalized transformed normal as long as `L` and `H` were
/// pre-scaled by the same normal's inverse length (see
/// [`crate::renderer::DerivedCache`]) so the dot products come out as if `N`
/// had been normalized.
pub fn shade(
    premul: &PremultipliedLight,
    pow_table: &PowTable,
    v_diffuse: f32,
    v_specular: f32,
    object_color: Option<RgbF32>,
) -> RgbF32 {
    let diffuse = premul.diffuse.scale(v_diffuse.max(0.0));
    let specular = premul.specular.scale(pow_table.eval(v_specular.max(0.0)));

    let lit = (premul.ambient + diffuse + specular).clamp01();
    match object_color {
        Some(oc) => lit * oc,
        None => lit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pow_table_endpoints_match_exact_power() {
        let mut t = PowTable::default();
        t.rebuild(4);
        assert_relative_eq!(t.eval(1.0), 1.0, epsilon = 1e-5);
        assert_eq!(t.eval(0.0), 0.0);
    }

    #[test]
    fn pow_table_is_monotonic() {
        let mut t = PowTable::default();
        t.rebuild(16);
        let mut prev = t.eval(0.0);
        let mut x = 0.0;
        while x <= 1.0 {
            let v = t.eval(x);
            assert!(v >= prev - 1e-6, "pow table not monotonic at x={x}");
            prev = v;
            x += 0.01;
        }
    }

    #[test]
    fn pow_table_rebuild_is_a_no_op_for_same_exponent() {
        let mut t = PowTable::default();
        t.rebuild(10);
        let snapshot = t;
        t.rebuild(10);
        assert_eq!(t, snapshot);
    }

    #[test]
    fn shade_clamps_and_applies_object_color() {
        let light = DirectionalLight {
            direction: Vec3::new(0.0, 0.0, 1.0),
            ambient: RgbF32::new(0.2, 0.2, 0.2),
            diffuse: RgbF32::WHITE,
            specular: RgbF32::BLACK,
        };
        let material = Material { color: RgbF32::new(1.0, 0.0, 0.0), ..Default::default() };
        let pow_table = PowTable::default();
        let premul = PremultipliedLight::recompute(&light, &material);
        let c = shade(&premul, &pow_table, 1.0, 0.0, Some(material.color));
        assert_relative_eq!(c.r, 1.0, epsilon = 1e-4);
        assert_eq!(c.g, 0.0);
        assert_eq!(c.b, 0.0);
    }

    #[test]
    fn premultiplied_light_scales_by_material_strength() {
        let light = DirectionalLight {
            direction: Vec3::new(0.0, 0.0, 1.0),
            ambient: RgbF32::new(0.2, 0.2, 0.2),
            diffuse: RgbF32::WHITE,
            specular: RgbF32::WHITE,
        };
        let material = Material { diffuse_strength: 0.5, ..Default::default() };
        let premul = PremultipliedLight::recompute(&light, &material);
        assert_eq!(premul.diffuse, RgbF32::new(0.5, 0.5, 0.5));
    }
}
