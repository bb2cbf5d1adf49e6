//! Renderer context: the long-lived state a frame is drawn against, plus the
//! transform/cull/clip/shade primitive pipeline and mesh traversal that turn
//! model-space geometry into calls into [`crate::rasterizer`].

use crate::color::RgbF32;
use crate::error::{DrawError, DrawResult};
use crate::framebuffer::{DepthBuffer, RasterTarget};
use crate::light::{self, DirectionalLight, Material, PowTable, PremultipliedLight};
use crate::math::mat4::Mat4;
use crate::math::vec2::Vec2;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::mesh::{self, BoundsTest, Mesh};
use crate::pixel::Pixel;
use crate::rasterizer::{rasterize_triangle, ScreenTriangle, ScreenVertex};
use crate::shader::ShaderFlags;
use crate::texture::Texture;

/// Which half of the projection pipeline is active: whether vertices go
/// through a perspective divide or not. Set implicitly by whichever of
/// [`RenderContext::set_orthographic`]/[`RenderContext::set_frustum`]/
/// [`RenderContext::set_perspective`] was called last, rather than being a
/// separate compile-time knob — see DESIGN.md for why this stays a runtime
/// field instead of a const generic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Back-face culling direction. The variant names the winding that's
/// discarded; [`CullMode::direction`] exposes the `+1`/`-1`/`0` encoding used
/// internally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    #[default]
    Disabled,
    ClockwiseBack,
    CounterClockwiseBack,
}

impl CullMode {
    fn direction(self) -> f32 {
        match self {
            CullMode::Disabled => 0.0,
            CullMode::ClockwiseBack => 1.0,
            CullMode::CounterClockwiseBack => -1.0,
        }
    }
}

/// Values derived from the model/view matrices, the light, and the material,
/// recomputed in full by [`DerivedCache::recompute`] whenever any of those
/// change (eager recompute rather than a dirty bit, so repeated identical
/// setter calls leave the cache bit-for-bit unchanged).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedCache {
    pub model_view: Mat4,
    /// `1 / |M_model_view · (0,0,1)|`, compensating dot products against
    /// un-renormalized transformed normals for model-view rescaling.
    pub norm_inverse: f32,
    /// Unit light vector, view space, pointing from surface to light.
    pub light_view: Vec3,
    /// Unit half-vector `normalize(light_view + (0,0,1))`.
    pub half_vector: Vec3,
    /// `light_view` scaled by `norm_inverse`, for dotting with un-normalized normals.
    pub light_scaled: Vec3,
    /// `half_vector` scaled by `norm_inverse`.
    pub half_scaled: Vec3,
    pub premul: PremultipliedLight,
}

impl DerivedCache {
    fn recompute(model: &Mat4, view: &Mat4, light: &DirectionalLight, material: &Material) -> Self {
        let model_view = *view * *model;

        let z_axis = model_view.transform_vector(Vec3::new(0.0, 0.0, 1.0));
        let z_mag = z_axis.magnitude();
        let norm_inverse = if z_mag > f32::EPSILON { 1.0 / z_mag } else { 1.0 };

        let light_view = (-view.transform_vector(light.direction)).normalize();
        let half_vector = (light_view + Vec3::new(0.0, 0.0, 1.0)).normalize();

        Self {
            model_view,
            norm_inverse,
            light_view,
            half_vector,
            light_scaled: light_view * norm_inverse,
            half_scaled: half_vector * norm_inverse,
            premul: PremultipliedLight::recompute(light, material),
        }
    }
}

/// Per-vertex results of the transform/project/(per-vertex)shade steps,
/// cached across a mesh chain so a vertex carried over from the previous
/// triangle (see [`crate::mesh::DecodedTriangle`]) isn't redone.
#[derive(Clone, Copy, Debug)]
struct VertexAttrs {
    view_pos: Vec3,
    ndc_x: f32,
    ndc_y: f32,
    ndc_z: f32,
    inv_w: f32,
    clip_ok: bool,
    /// Raw `(N·L, N·H)` dot products for Gouraud shading, not yet run
    /// through [`light::shade`] — the final evaluation (and the possible
    /// double-sided sign flip, see [`RenderContext::assemble_triangle`]) is
    /// deferred to triangle-assembly time since it depends on which triangle
    /// a cached vertex currently appears in.
    lighting: Option<(f32, f32)>,
    texcoord: Vec2,
}

/// Renders shaded, depth-tested triangles into a caller-attached raster
/// target. `LX`/`LY` are the compile-time viewport dimensions (`1..=2048`);
/// `DEPTH_TEST` selects, at compile time, whether a depth buffer is required.
pub struct RenderContext<'a, P: Pixel, const LX: usize, const LY: usize, const DEPTH_TEST: bool> {
    raster_target: Option<RasterTarget<'a, P>>,
    depth_buffer: Option<DepthBuffer<'a>>,
    offset: (i32, i32),

    projection: Mat4,
    projection_mode: ProjectionMode,
    view: Mat4,
    model: Mat4,

    light: DirectionalLight,
    material: Material,
    cull: CullMode,

    cache: DerivedCache,
    pow_table: PowTable,
}

impl<'a, P: Pixel, const LX: usize, const LY: usize, const DEPTH_TEST: bool>
    RenderContext<'a, P, LX, LY, DEPTH_TEST>
{
    pub fn new() -> Self {
        assert!((1..=2048).contains(&LX), "viewport width out of range");
        assert!((1..=2048).contains(&LY), "viewport height out of range");

        let model = Mat4::identity();
        let view = Mat4::identity();
        let light = DirectionalLight::new(Vec3::new(0.0, 0.0, 1.0));
        let material = Material::default();
        let cache = DerivedCache::recompute(&model, &view, &light, &material);
        let mut pow_table = PowTable::default();
        pow_table.rebuild(material.specular_exponent);

        Self {
            raster_target: None,
            depth_buffer: None,
            offset: (0, 0),
            projection: Mat4::identity().invert_y_axis(),
            projection_mode: ProjectionMode::Perspective,
            view,
            model,
            light,
            material,
            cull: CullMode::Disabled,
            cache,
            pow_table,
        }
    }

    // ---- attachment -----------------------------------------------------

    pub fn attach_raster_target(&mut self, target: RasterTarget<'a, P>) {
        self.raster_target = Some(target);
    }

    pub fn attach_depth_buffer(&mut self, depth: DepthBuffer<'a>) {
        self.depth_buffer = Some(depth);
    }

    pub fn clear_depth_buffer(&mut self) {
        if let Some(d) = self.depth_buffer.as_mut() {
            d.clear();
        }
    }

    pub fn set_offset(&mut self, ox: i32, oy: i32) {
        self.offset = (ox, oy);
    }

    // ---- matrix / light / material setters -------------------------------

    /// Sets the projection matrix directly, in the caller's Y-up convention;
    /// the row flip baked into the stored matrix is applied here.
    pub fn set_projection(&mut self, m: Mat4, mode: ProjectionMode) {
        self.projection = m.invert_y_axis();
        self.projection_mode = mode;
    }

    /// Returns the projection matrix as the caller would expect to see it
    /// (Y row un-flipped), the inverse of [`Self::set_projection`].
    pub fn get_projection(&self) -> Mat4 {
        self.projection.invert_y_axis()
    }

    pub fn set_orthographic(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.projection = Mat4::set_ortho(left, right, bottom, top, near, far).invert_y_axis();
        self.projection_mode = ProjectionMode::Orthographic;
    }

    pub fn set_frustum(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.projection = Mat4::set_frustum(left, right, bottom, top, near, far).invert_y_axis();
        self.projection_mode = ProjectionMode::Perspective;
    }

    pub fn set_perspective(&mut self, fov_y: f32, aspect_ratio: f32, near: f32, far: f32) {
        self.projection = Mat4::set_perspective(fov_y, aspect_ratio, near, far).invert_y_axis();
        self.projection_mode = ProjectionMode::Perspective;
    }

    pub fn set_view(&mut self, m: Mat4) {
        self.view = m;
        self.recompute_cache();
    }

    pub fn get_view(&self) -> Mat4 {
        self.view
    }

    pub fn set_look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.set_view(Mat4::set_look_at(eye, target, up));
    }

    pub fn set_model(&mut self, m: Mat4) {
        self.model = m;
        self.recompute_cache();
    }

    pub fn get_model(&self) -> Mat4 {
        self.model
    }

    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.light.direction = direction.normalize();
        self.recompute_cache();
    }

    pub fn set_light_ambient(&mut self, color: RgbF32) {
        self.light.ambient = color;
        self.recompute_cache();
    }

    pub fn set_light_diffuse(&mut self, color: RgbF32) {
        self.light.diffuse = color;
        self.recompute_cache();
    }

    pub fn set_light_specular(&mut self, color: RgbF32) {
        self.light.specular = color;
        self.recompute_cache();
    }

    pub fn set_material_color(&mut self, color: RgbF32) {
        self.material.color = color;
        self.recompute_cache();
    }

    pub fn set_material_strengths(&mut self, ambient: f32, diffuse: f32, specular: f32) {
        self.material.ambient_strength = ambient;
        self.material.diffuse_strength = diffuse;
        self.material.specular_strength = specular;
        self.recompute_cache();
    }

    pub fn set_specular_exponent(&mut self, exponent: i32) {
        self.material.specular_exponent = exponent;
        self.pow_table.rebuild(exponent);
    }

    pub fn set_cull_mode(&mut self, cull: CullMode) {
        self.cull = cull;
    }

    fn recompute_cache(&mut self) {
        self.cache = DerivedCache::recompute(&self.model, &self.view, &self.light, &self.material);
    }

    fn coarse_bound(&self) -> f32 {
        2048.0 / (LX.max(LY) as f32)
    }

    // ---- per-vertex pipeline step ----------------------------------------

    fn compute_vertex(
        &self,
        position: Vec3,
        normal: Option<Vec3>,
        texcoord: Vec2,
        gouraud: bool,
        bound: f32,
    ) -> VertexAttrs {
        let view_pos = self.cache.model_view.transform_point(position);
        let clip = self.projection.transform_vec4(Vec4::point(view_pos.x, view_pos.y, view_pos.z));

        let (ndc_x, ndc_y, ndc_z, inv_w) = match self.projection_mode {
            ProjectionMode::Perspective => {
                if clip.w > f32::EPSILON {
                    (clip.x / clip.w, clip.y / clip.w, clip.z / clip.w, 1.0 / clip.w)
                } else {
                    (clip.x, clip.y, clip.z, 0.0)
                }
            }
            ProjectionMode::Orthographic => (clip.x, clip.y, clip.z, 2.0 - clip.z),
        };

        let clip_ok = view_pos.z < 0.0
            && ndc_x >= -bound
            && ndc_x <= bound
            && ndc_y >= -bound
            && ndc_y <= bound
            && ndc_z >= -1.0
            && ndc_z <= 1.0;

        let lighting = if gouraud {
            normal.map(|n| {
                let n_view = self.cache.model_view.transform_vector(n);
                (n_view.dot(self.cache.light_scaled), n_view.dot(self.cache.half_scaled))
            })
        } else {
            None
        };

        VertexAttrs { view_pos, ndc_x, ndc_y, ndc_z, inv_w, clip_ok, lighting, texcoord }
    }

    fn viewport_map(&self, ndc_x: f32, ndc_y: f32) -> (f32, f32) {
        let x = (ndc_x * 0.5 + 0.5) * (LX as f32 - 1.0) - self.offset.0 as f32;
        let y = (ndc_y * 0.5 + 0.5) * (LY as f32 - 1.0) - self.offset.1 as f32;
        (x, y)
    }

    /// Culls, coarse-clips, shades and viewport-maps three already-projected
    /// vertices into a [`ScreenTriangle`] ready for the rasterizer, or
    /// returns `None` if the triangle should be discarded.
    fn assemble_triangle(&self, v: [VertexAttrs; 3], flags: ShaderFlags) -> Option<ScreenTriangle> {
        if !(v[0].clip_ok && v[1].clip_ok && v[2].clip_ok) {
            return None;
        }

        let e1 = v[1].view_pos - v[0].view_pos;
        let e2 = v[2].view_pos - v[0].view_pos;
        let face_normal = e1.cross(e2);

        let camera_dot = match self.projection_mode {
            ProjectionMode::Orthographic => -face_normal.z,
            ProjectionMode::Perspective => face_normal.dot(v[0].view_pos),
        };

        let direction = self.cull.direction();
        if direction != 0.0 && camera_dot * direction > 0.0 {
            return None;
        }

        let back_facing = self.cull == CullMode::Disabled && camera_dot > 0.0;
        let object_color =
            if flags.contains(ShaderFlags::TEXTURE) { None } else { Some(self.material.color) };

        let colors = if flags.contains(ShaderFlags::GOURAUD) {
            let mut cs = [RgbF32::BLACK; 3];
            for i in 0..3 {
                let (mut vd, mut vs) = v[i].lighting.unwrap_or((0.0, 0.0));
                if back_facing {
                    vd = -vd;
                    vs = -vs;
                }
                cs[i] = light::shade(&self.cache.premul, &self.pow_table, vd, vs, object_color);
            }
            cs
        } else {
            let mag = face_normal.magnitude();
            if mag < f32::EPSILON {
                return None;
            }
            let n = face_normal / mag;
            let mut vd = n.dot(self.cache.light_view);
            let mut vs = n.dot(self.cache.half_vector);
            if back_facing {
                vd = -vd;
                vs = -vs;
            }
            let c = light::shade(&self.cache.premul, &self.pow_table, vd, vs, object_color);
            [c, c, c]
        };

        let mut vertices = [ScreenVertex {
            x: 0.0,
            y: 0.0,
            inv_w: 0.0,
            color: RgbF32::BLACK,
            texcoord: Vec2::ZERO,
        }; 3];
        for i in 0..3 {
            let (x, y) = self.viewport_map(v[i].ndc_x, v[i].ndc_y);
            vertices[i] = ScreenVertex { x, y, inv_w: v[i].inv_w, color: colors[i], texcoord: v[i].texcoord };
        }

        Some(ScreenTriangle { vertices, flags })
    }

    fn preconditions(&self) -> DrawResult {
        if self.raster_target.is_none() {
            return Err(DrawError::NoRasterTarget);
        }
        if DEPTH_TEST && self.depth_buffer.is_none() {
            return Err(DrawError::NoDepthBuffer);
        }
        Ok(())
    }

    fn rasterize(&mut self, tri: &ScreenTriangle, texture: Option<&Texture<'_>>) {
        let target = self.raster_target.as_mut().expect("checked by preconditions");
        let depth = self.depth_buffer.as_mut();
        rasterize_triangle(tri, target, depth, texture);
    }

    // ---- single triangle / quad -------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn draw_triangle(
        &mut self,
        positions: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
        texcoords: Option<[Vec2; 3]>,
        texture: Option<&Texture<'_>>,
        flags: ShaderFlags,
    ) -> DrawResult {
        self.preconditions()?;
        let flags = flags.masked(normals.is_some(), texcoords.is_some() && texture.is_some());
        if flags.contains(ShaderFlags::TEXTURE) && texcoords.is_some() && texture.is_none() {
            return Err(DrawError::MissingGeometry);
        }

        let gouraud = flags.contains(ShaderFlags::GOURAUD);
        let bound = self.coarse_bound();
        let v: [VertexAttrs; 3] = std::array::from_fn(|i| {
            self.compute_vertex(
                positions[i],
                normals.map(|n| n[i]),
                texcoords.map(|t| t[i]).unwrap_or(Vec2::ZERO),
                gouraud,
                bound,
            )
        });

        if let Some(tri) = self.assemble_triangle(v, flags) {
            self.rasterize(&tri, texture);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_quad(
        &mut self,
        positions: [Vec3; 4],
        normals: Option<[Vec3; 4]>,
        texcoords: Option<[Vec2; 4]>,
        texture: Option<&Texture<'_>>,
        flags: ShaderFlags,
    ) -> DrawResult {
        self.preconditions()?;
        let flags = flags.masked(normals.is_some(), texcoords.is_some() && texture.is_some());
        if flags.contains(ShaderFlags::TEXTURE) && texcoords.is_some() && texture.is_none() {
            return Err(DrawError::MissingGeometry);
        }

        let gouraud = flags.contains(ShaderFlags::GOURAUD);
        let bound = self.coarse_bound();
        let v: [VertexAttrs; 4] = std::array::from_fn(|i| {
            self.compute_vertex(
                positions[i],
                normals.map(|n| n[i]),
                texcoords.map(|t| t[i]).unwrap_or(Vec2::ZERO),
                gouraud,
                bound,
            )
        });

        if let Some(tri) = self.assemble_triangle([v[0], v[1], v[2]], flags) {
            self.rasterize(&tri, texture);
        }
        if let Some(tri) = self.assemble_triangle([v[0], v[2], v[3]], flags) {
            self.rasterize(&tri, texture);
        }
        Ok(())
    }

    /// Draws an array of independent triangles sharing one texture and
    /// shading mode. An empty slice is the "null vertex array" error case.
    pub fn draw_triangles(
        &mut self,
        triangles: &[([Vec3; 3], Option<[Vec3; 3]>, Option<[Vec2; 3]>)],
        texture: Option<&Texture<'_>>,
        flags: ShaderFlags,
    ) -> DrawResult {
        self.preconditions()?;
        if triangles.is_empty() {
            return Err(DrawError::MissingGeometry);
        }
        for &(positions, normals, texcoords) in triangles {
            self.draw_triangle(positions, normals, texcoords, texture, flags)?;
        }
        Ok(())
    }

    // ---- mesh traversal ----------------------------------------------------

    /// Draws `mesh` and every mesh chained through [`Mesh::next`], in order.
    pub fn draw_mesh(&mut self, mesh: &Mesh<'_>, flags: ShaderFlags, use_mesh_material: bool) -> DrawResult {
        let mut current = Some(mesh);
        let mut result = Ok(());
        while let Some(m) = current {
            let r = self.draw_one_mesh(m, flags, use_mesh_material);
            if r.is_err() && result.is_ok() {
                result = r;
            }
            current = m.next;
        }
        result
    }

    fn draw_one_mesh(&mut self, mesh: &Mesh<'_>, flags: ShaderFlags, use_mesh_material: bool) -> DrawResult {
        self.preconditions()?;
        let flags = flags.masked(mesh.has_normals(), mesh.has_texcoords());

        if mesh.vertices.is_empty() {
            return Err(DrawError::MissingGeometry);
        }
        if flags.contains(ShaderFlags::TEXTURE) && mesh.texcoords.is_some() && mesh.texture.is_none() {
            return Err(DrawError::MissingGeometry);
        }
        if mesh.faces.is_empty() {
            return Ok(());
        }

        let saved_material = self.material;
        let saved_cache = self.cache;
        if use_mesh_material {
            self.material = mesh.material;
            self.recompute_cache();
        }

        let bound = self.coarse_bound();
        let proj_model_view = self.projection * self.cache.model_view;
        // FullyInside vs. Straddling only matters for skipping the (already
        // cheap) per-vertex clip test; only the FullyOutside case, which
        // discards the whole mesh, is worth special-casing here.
        let outside = matches!(
            mesh::test_bounds(&mesh.bounding_box, &proj_model_view, bound),
            BoundsTest::FullyOutside
        );
        if outside {
            if use_mesh_material {
                self.material = saved_material;
                self.cache = saved_cache;
            }
            return Ok(());
        }

        let gouraud = flags.contains(ShaderFlags::GOURAUD);
        let mut slots: [Option<VertexAttrs>; 3] = [None, None, None];

        for tri in mesh.chains() {
            for i in 0..3 {
                if tri.is_new[i] {
                    let rec = tri.slots[i];
                    let position = mesh.vertex(rec.vertex);
                    let normal = rec.normal.map(|n| mesh.normal(n));
                    let texcoord = rec.texcoord.map(|t| mesh.texcoord(t)).unwrap_or(Vec2::ZERO);
                    slots[i] = Some(self.compute_vertex(position, normal, texcoord, gouraud, bound));
                }
            }
            let v = [slots[0].unwrap(), slots[1].unwrap(), slots[2].unwrap()];
            if let Some(screen_tri) = self.assemble_triangle(v, flags) {
                self.rasterize(&screen_tri, mesh.texture.as_ref());
            }
        }

        if use_mesh_material {
            self.material = saved_material;
            self.cache = saved_cache;
        }
        Ok(())
    }
}

impl<'a, P: Pixel, const LX: usize, const LY: usize, const DEPTH_TEST: bool> Default
    for RenderContext<'a, P, LX, LY, DEPTH_TEST>
{
    fn default() -> Self {
        Self::new()
    }
}
