//! Cube face axis table and equirectangular mapping.

use std::f64::consts::PI;
use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// One of the six faces of a skybox cube.
///
/// Declaration order is the material order of a cube mesh
/// (+X, -X, +Y, -Y, +Z, -Z) and is used wherever faces are iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CubeFace {
    Right,
    Left,
    Top,
    Bottom,
    Front,
    Back,
}

impl CubeFace {
    /// All faces in cube-mesh order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::Right,
        CubeFace::Left,
        CubeFace::Top,
        CubeFace::Bottom,
        CubeFace::Front,
        CubeFace::Back,
    ];

    /// Lowercase face label, also used as the exported file stem.
    pub fn name(&self) -> &'static str {
        match self {
            CubeFace::Right => "right",
            CubeFace::Left => "left",
            CubeFace::Top => "top",
            CubeFace::Bottom => "bottom",
            CubeFace::Front => "front",
            CubeFace::Back => "back",
        }
    }

    /// Outward axis of the face.
    pub fn axis(&self) -> DVec3 {
        self.direction(0.0, 0.0)
    }

    /// Unnormalised sampling direction for face-local coordinates `a`, `b` in `[-1, 1]`.
    ///
    /// `a` grows to the right of the face image, `b` grows downwards.
    pub fn direction(&self, a: f64, b: f64) -> DVec3 {
        match self {
            CubeFace::Right => DVec3::new(1.0, -b, -a),
            CubeFace::Left => DVec3::new(-1.0, -b, a),
            CubeFace::Top => DVec3::new(a, 1.0, b),
            CubeFace::Bottom => DVec3::new(a, -1.0, -b),
            CubeFace::Front => DVec3::new(a, -b, 1.0),
            CubeFace::Back => DVec3::new(-a, -b, -1.0),
        }
    }
}

impl fmt::Display for CubeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Face-local coordinates of pixel `(x, y)` on a face of side `face_size`.
///
/// Uses the pixel's top-left corner, so `x = 0` maps to `-1` and the last
/// column stays just short of `+1`.
pub fn face_coords(x: u32, y: u32, face_size: u32) -> (f64, f64) {
    let size = face_size as f64;
    let a = 2.0 * x as f64 / size - 1.0;
    let b = 2.0 * y as f64 / size - 1.0;
    (a, b)
}

/// Unit sampling direction through pixel `(x, y)` of `face`.
pub fn face_pixel_direction(face: CubeFace, x: u32, y: u32, face_size: u32) -> DVec3 {
    let (a, b) = face_coords(x, y, face_size);
    face.direction(a, b).normalize()
}

/// Convert a unit direction to equirectangular texture coordinates.
///
/// The seam lies at `u = 0 / 1` (the -X axis) and `v = 0` is straight up.
pub fn direction_to_equirect(direction: DVec3) -> (f64, f64) {
    let u = 0.5 + direction.z.atan2(direction.x) / (2.0 * PI);
    // Guard asin against rounding just outside [-1, 1].
    let v = 0.5 - direction.y.clamp(-1.0, 1.0).asin() / PI;
    (u, v)
}

/// Source pixel for texture coordinates on a `width` x `height` panorama.
pub fn equirect_to_pixel(u: f64, v: f64, width: u32, height: u32) -> (u32, u32) {
    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);
    let x = (u * max_x as f64).floor().clamp(0.0, max_x as f64) as u32;
    let y = (v * max_y as f64).floor().clamp(0.0, max_y as f64) as u32;
    (x, y)
}

/// Source pixel sampled by pixel `(x, y)` of `face` under nearest-neighbour lookup.
pub fn source_pixel(face: CubeFace, x: u32, y: u32, face_size: u32, width: u32, height: u32) -> (u32, u32) {
    let (u, v) = direction_to_equirect(face_pixel_direction(face, x, y, face_size));
    equirect_to_pixel(u, v, width, height)
}
