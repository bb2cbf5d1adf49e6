//! Packed indexed mesh representation and triangle-chain face stream decoding.
//!
//! A mesh is a bag of borrowed arrays (vertices, optional normals, optional
//! texcoords, an optional texture) plus a `faces` stream encoding triangles
//! as run-length chains that share vertices with their predecessor, the way
//! a triangle strip would, to avoid re-submitting shared vertex indices.
//! None of this owns its backing storage: a mesh is as disposable as a
//! borrow, the same ownership model as [`crate::framebuffer::RasterTarget`].

use crate::light::Material;
use crate::math::vec3::Vec3;
use crate::texture::Texture;

/// Axis-aligned bounding box in model space. All-zero is the sentinel for
/// "uninitialized" (the mesh author never computed one), in which case the
/// caller should skip the cheap discard/cliptest-elision pass entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn is_uninitialized(&self) -> bool {
        self.min == Vec3::ZERO && self.max == Vec3::ZERO
    }

    /// The eight corners of the box, in a fixed but otherwise unspecified order.
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }
}

/// One vertex reference inside a face-stream triangle: an index into
/// `Mesh::vertices`, and optionally into `Mesh::texcoords`/`Mesh::normals`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexRecord {
    pub vertex: u16,
    pub texcoord: Option<u16>,
    pub normal: Option<u16>,
}

/// Bit 15 of a successor record's vertex index selects which of the two
/// predecessor-triangle vertices (slot 0 or slot 1) is retained; see
/// [`ChainDecoder`].
const RETAIN_SLOT0: u16 = 0x8000;
const VERTEX_INDEX_MASK: u16 = 0x7fff;

/// A single decoded triangle, naming which of its three slots actually hold
/// newly-read vertex data this call (`is_new`) versus data carried over,
/// unchanged, from the previous triangle in the chain. A caller that caches
/// per-vertex transform/shading results only needs to redo that work for
/// slots where `is_new` is `true` — the whole point of the chain encoding.
#[derive(Clone, Copy, Debug)]
pub struct DecodedTriangle {
    pub slots: [VertexRecord; 3],
    pub is_new: [bool; 3],
}

/// Decodes the `faces` grammar from §6 into a sequence of [`DecodedTriangle`].
///
/// ```text
/// stream  := chain*  0
/// chain   := N  vertex_rec  vertex_rec  vertex_rec  (succ_rec){N-1}
/// vertex_rec := vid [ tid ] [ nid ]
/// succ_rec   := (vid | (vid|0x8000)) [ tid ] [ nid ]
/// ```
pub struct ChainDecoder<'a> {
    stream: &'a [u16],
    cursor: usize,
    has_texcoords: bool,
    has_normals: bool,
    /// Vertices of the previously emitted triangle, in slot order.
    prev: [VertexRecord; 3],
    /// Triangles remaining in the chain currently being decoded (including
    /// the one about to be produced); `0` means "read a new chain header".
    remaining_in_chain: u32,
}

impl<'a> ChainDecoder<'a> {
    pub fn new(stream: &'a [u16], has_texcoords: bool, has_normals: bool) -> Self {
        Self {
            stream,
            cursor: 0,
            has_texcoords,
            has_normals,
            prev: [VertexRecord { vertex: 0, texcoord: None, normal: None }; 3],
            remaining_in_chain: 0,
        }
    }

    fn take(&mut self) -> Option<u16> {
        let v = *self.stream.get(self.cursor)?;
        self.cursor += 1;
        Some(v)
    }

    fn read_vertex_record(&mut self, raw_vid: u16) -> Option<VertexRecord> {
        let vertex = raw_vid & VERTEX_INDEX_MASK;
        let texcoord = if self.has_texcoords { Some(self.take()?) } else { None };
        let normal = if self.has_normals { Some(self.take()?) } else { None };
        Some(VertexRecord { vertex, texcoord, normal })
    }
}

impl<'a> Iterator for ChainDecoder<'a> {
    type Item = DecodedTriangle;

    fn next(&mut self) -> Option<DecodedTriangle> {
        if self.remaining_in_chain == 0 {
            let n = self.take()?;
            if n == 0 {
                return None;
            }
            self.remaining_in_chain = n as u32;

            let raw0 = self.take()?;
            let v0 = self.read_vertex_record(raw0)?;
            let raw1 = self.take()?;
            let v1 = self.read_vertex_record(raw1)?;
            let raw2 = self.take()?;
            let v2 = self.read_vertex_record(raw2)?;

            self.prev = [v0, v1, v2];
            self.remaining_in_chain -= 1;
            return Some(DecodedTriangle { slots: self.prev, is_new: [true, true, true] });
        }

        let raw_vid = self.take()?;
        let retain_slot0 = raw_vid & RETAIN_SLOT0 != 0;
        let new_vertex = self.read_vertex_record(raw_vid)?;

        let retained = if retain_slot0 { self.prev[0] } else { self.prev[1] };
        let carried = self.prev[2];
        let slots = [retained, carried, new_vertex];

        self.prev = slots;
        self.remaining_in_chain -= 1;
        Some(DecodedTriangle { slots, is_new: [false, false, true] })
    }
}

/// A borrowed, packed indexed mesh: vertex/normal/texcoord arrays, a texture,
/// a triangle-chain face stream, a model-space bounding box, a material, and
/// an optional link to the next mesh drawn in the same call.
pub struct Mesh<'a> {
    pub vertices: &'a [Vec3],
    pub normals: Option<&'a [Vec3]>,
    pub texcoords: Option<&'a [crate::math::vec2::Vec2]>,
    pub texture: Option<Texture<'a>>,
    pub faces: &'a [u16],
    pub bounding_box: BoundingBox,
    pub material: Material,
    pub next: Option<&'a Mesh<'a>>,
}

impl<'a> Mesh<'a> {
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_texcoords(&self) -> bool {
        self.texcoords.is_some() && self.texture.is_some()
    }

    pub fn chains(&self) -> ChainDecoder<'a> {
        ChainDecoder::new(self.faces, self.texcoords.is_some(), self.normals.is_some())
    }

    pub fn vertex(&self, i: u16) -> Vec3 {
        self.vertices[i as usize]
    }

    pub fn normal(&self, i: u16) -> Vec3 {
        self.normals.expect("normal index present without a normal array")[i as usize]
    }

    pub fn texcoord(&self, i: u16) -> crate::math::vec2::Vec2 {
        self.texcoords.expect("texcoord index present without a texcoord array")[i as usize]
    }
}

/// Outcome of testing a mesh's bounding box against the loose frustum bound,
/// run once before traversal instead of per-triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundsTest {
    /// All eight corners fail the same frustum plane: draw nothing.
    FullyOutside,
    /// Every corner is strictly inside the loose clip bound: per-triangle
    /// clip tests can be skipped for this mesh.
    FullyInside,
    /// Straddles the frustum boundary: fall back to per-triangle clip tests.
    Straddling,
}

/// The six frustum planes a corner can fail, tracked as a bitmask so
/// "all corners failed the *same* plane" can be detected across corners.
const PLANE_LEFT: u8 = 1 << 0;
const PLANE_RIGHT: u8 = 1 << 1;
const PLANE_BOTTOM: u8 = 1 << 2;
const PLANE_TOP: u8 = 1 << 3;
const PLANE_NEAR: u8 = 1 << 4;
const PLANE_FAR: u8 = 1 << 5;

/// Projects the mesh's eight bounding-box corners through `proj_model_view`
/// and classifies the result per [`BoundsTest`]. `bound` is the same coarse
/// clip bound used for per-triangle testing (`2048 / max(LX, LY)`).
pub fn test_bounds(
    bbox: &BoundingBox,
    proj_model_view: &crate::math::mat4::Mat4,
    bound: f32,
) -> BoundsTest {
    if bbox.is_uninitialized() {
        return BoundsTest::Straddling;
    }

    let mut failed_planes_intersection = u8::MAX;
    let mut any_outside = false;
    let mut all_strictly_inside = true;

    for corner in bbox.corners() {
        let clip = proj_model_view.transform_vec4(crate::math::vec4::Vec4::point(
            corner.x, corner.y, corner.z,
        ));
        let (x, y, z) = if clip.w.abs() > f32::EPSILON {
            (clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
        } else {
            (clip.x, clip.y, clip.z)
        };

        let mut failed = 0u8;
        if x < -bound {
            failed |= PLANE_LEFT;
        }
        if x > bound {
            failed |= PLANE_RIGHT;
        }
        if y < -bound {
            failed |= PLANE_BOTTOM;
        }
        if y > bound {
            failed |= PLANE_TOP;
        }
        if z < -1.0 {
            failed |= PLANE_NEAR;
        }
        if z > 1.0 {
            failed |= PLANE_FAR;
        }

        if failed != 0 {
            any_outside = true;
            all_strictly_inside = false;
        }
        failed_planes_intersection &= failed;
    }

    if failed_planes_intersection != 0 {
        return BoundsTest::FullyOutside;
    }
    if !any_outside && all_strictly_inside {
        return BoundsTest::FullyInside;
    }
    BoundsTest::Straddling
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_chain_matches_one_triangle_per_chain() {
        // Single chain of 2 triangles sharing an edge.
        let stream: Vec<u16> = vec![
            2, // N
            0, 1, 2, // full triangle
            RETAIN_SLOT0 | 3, // successor: keep slot0 (v0), new vertex 3
            0, // terminator
        ];
        let tris: Vec<_> = ChainDecoder::new(&stream, false, false).collect();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[0].slots.map(|s| s.vertex), [0, 1, 2]);
        assert_eq!(tris[0].is_new, [true, true, true]);
        assert_eq!(tris[1].slots.map(|s| s.vertex), [0, 2, 3]);
        assert_eq!(tris[1].is_new, [false, false, true]);
    }

    #[test]
    fn degenerate_chain_of_single_triangle_chains_has_all_new_slots() {
        let stream: Vec<u16> = vec![1, 0, 1, 2, 1, 2, 3, 4, 0];
        let tris: Vec<_> = ChainDecoder::new(&stream, false, false).collect();
        assert_eq!(tris.len(), 2);
        assert!(tris.iter().all(|t| t.is_new == [true, true, true]));
    }

    #[test]
    fn zero_terminates_immediately() {
        let stream: Vec<u16> = vec![0];
        let tris: Vec<_> = ChainDecoder::new(&stream, false, false).collect();
        assert!(tris.is_empty());
    }

    #[test]
    fn texcoord_and_normal_fields_are_read_when_present() {
        let stream: Vec<u16> = vec![
            1, // N
            0, 10, 20, // v0: vertex=0 tid=10 nid=20
            1, 11, 21, // v1
            2, 12, 22, // v2
            0,
        ];
        let tris: Vec<_> = ChainDecoder::new(&stream, true, true).collect();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].slots[0], VertexRecord { vertex: 0, texcoord: Some(10), normal: Some(20) });
        assert_eq!(tris[0].slots[2], VertexRecord { vertex: 2, texcoord: Some(12), normal: Some(22) });
    }

    #[test]
    fn fully_outside_when_all_corners_fail_same_plane() {
        let bbox = BoundingBox::new(Vec3::new(10.0, 10.0, 10.0), Vec3::new(11.0, 11.0, 11.0));
        let proj = crate::math::mat4::Mat4::identity();
        assert_eq!(test_bounds(&bbox, &proj, 1.0), BoundsTest::FullyOutside);
    }

    #[test]
    fn fully_inside_when_every_corner_is_within_bound() {
        let bbox = BoundingBox::new(Vec3::new(-0.1, -0.1, -0.1), Vec3::new(0.1, 0.1, 0.1));
        let proj = crate::math::mat4::Mat4::identity();
        assert_eq!(test_bounds(&bbox, &proj, 1.0), BoundsTest::FullyInside);
    }

    #[test]
    fn uninitialized_bbox_skips_the_test() {
        let bbox = BoundingBox::default();
        let proj = crate::math::mat4::Mat4::identity();
        assert_eq!(test_bounds(&bbox, &proj, 1.0), BoundsTest::Straddling);
    }
}
