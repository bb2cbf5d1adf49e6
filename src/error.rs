//! Draw-call errors.
//!
//! Precondition violations (no raster target attached, depth test enabled
//! without a buffer, missing geometry) are reported through `Result`, the
//! idiomatic Rust counterpart to the small-integer return codes a
//! constrained, exception-free host environment would use. [`DrawError::code`]
//! exposes that integer for callers bridging to such a host.
//!
//! Degenerate primitives (zero-area triangles, back faces, geometry that
//! fails the coarse clip test) are not errors: they are silently discarded
//! and `draw_*` returns `Ok(())`, since skipping them is the renderer's
//! normal, expected behavior rather than a caller mistake.

use std::error::Error;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawError {
    /// No raster target has been attached.
    NoRasterTarget,
    /// Depth testing is enabled but no depth buffer has been attached, or
    /// the attached buffer does not match the viewport dimensions.
    NoDepthBuffer,
    /// The call requires geometry (e.g. vertices, faces) that was not
    /// supplied, or was supplied empty.
    MissingGeometry,
}

impl DrawError {
    /// The small integer code a caller without `Result` support would see.
    pub fn code(self) -> i32 {
        match self {
            DrawError::NoRasterTarget => -1,
            DrawError::NoDepthBuffer => -2,
            DrawError::MissingGeometry => -3,
        }
    }
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawError::NoRasterTarget => write!(f, "no raster target attached"),
            DrawError::NoDepthBuffer => write!(f, "depth test enabled but no depth buffer attached"),
            DrawError::MissingGeometry => write!(f, "required geometry is missing or empty"),
        }
    }
}

impl Error for DrawError {}

/// Successful draw calls return this; kept as a type alias so call sites
/// read `-> DrawResult` rather than `-> Result<(), DrawError>`.
pub type DrawResult = Result<(), DrawError>;
