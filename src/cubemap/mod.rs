//! Equirectangular to cube-face reprojection.
//!
//! Every pixel of every face is turned into a ray from the cube centre,
//! converted to equirectangular texture coordinates and sampled from the
//! panorama. The conversion is a pure function of the source pixels and
//! [`ReprojectOptions`]; faces are independent and may be filled in parallel
//! without changing the output.

mod projection;
mod sampling;

use std::collections::BTreeMap;
use std::time::Instant;

use image::{imageops, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyboxError};

pub use projection::{
    direction_to_equirect, equirect_to_pixel, face_coords, face_pixel_direction, source_pixel, CubeFace,
};
pub use sampling::SampleFilter;

/// Default per-face resolution in pixels.
pub const DEFAULT_FACE_SIZE: u32 = 512;

/// Options controlling a single reprojection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReprojectOptions {
    /// Side length of each output face in pixels.
    pub face_size: u32,
    /// Source sampling filter.
    pub filter: SampleFilter,
    /// Fill the six faces on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ReprojectOptions {
    fn default() -> Self {
        Self {
            face_size: DEFAULT_FACE_SIZE,
            filter: SampleFilter::Nearest,
            parallel: true,
        }
    }
}

impl ReprojectOptions {
    pub fn with_face_size(mut self, face_size: u32) -> Self {
        self.face_size = face_size;
        self
    }

    pub fn with_filter(mut self, filter: SampleFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// A complete set of six square cube faces.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeFaces {
    face_size: u32,
    faces: BTreeMap<CubeFace, RgbaImage>,
}

impl CubeFaces {
    /// Side length of every face.
    pub fn face_size(&self) -> u32 {
        self.face_size
    }

    pub fn get(&self, face: CubeFace) -> &RgbaImage {
        // Constructed only by `reproject_to_cube_faces`, which fills all six.
        &self.faces[&face]
    }

    /// Faces in cube-mesh order (right, left, top, bottom, front, back).
    pub fn iter(&self) -> impl Iterator<Item = (CubeFace, &RgbaImage)> {
        self.faces.iter().map(|(face, image)| (*face, image))
    }

    /// Horizontal atlas of all six faces in cube-mesh order.
    pub fn to_strip(&self) -> RgbaImage {
        let size = self.face_size;
        let mut strip = RgbaImage::new(size * 6, size);
        for (index, (_, image)) in self.iter().enumerate() {
            imageops::replace(&mut strip, image, (index as u32 * size) as i64, 0);
        }
        strip
    }
}

/// Reproject an equirectangular panorama onto the six faces of a cube.
///
/// Either all six faces are produced or an error is returned.
pub fn reproject_to_cube_faces(source: &RgbaImage, options: &ReprojectOptions) -> Result<CubeFaces> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(SkyboxError::EmptyImage { width, height });
    }
    if options.face_size == 0 {
        return Err(SkyboxError::InvalidFaceSize(options.face_size));
    }

    let aspect = width as f64 / height as f64;
    if (aspect - 2.0).abs() > 0.02 {
        log::warn!(
            "Panorama is {}x{} (aspect {:.3}); equirectangular sources are 2:1, faces will be distorted",
            width,
            height,
            aspect
        );
    }

    let started = Instant::now();
    let faces: BTreeMap<CubeFace, RgbaImage> = if options.parallel {
        CubeFace::ALL
            .par_iter()
            .map(|&face| (face, render_face(source, face, options)))
            .collect()
    } else {
        CubeFace::ALL
            .iter()
            .map(|&face| (face, render_face(source, face, options)))
            .collect()
    };

    log::info!(
        "Reprojected {}x{} panorama to 6 faces of {}px ({}) in {:.1}ms",
        width,
        height,
        options.face_size,
        options.filter,
        started.elapsed().as_secs_f64() * 1000.0
    );

    Ok(CubeFaces {
        face_size: options.face_size,
        faces,
    })
}

/// Fill one face.
pub fn render_face(source: &RgbaImage, face: CubeFace, options: &ReprojectOptions) -> RgbaImage {
    let size = options.face_size;
    let started = Instant::now();

    let image = RgbaImage::from_fn(size, size, |x, y| {
        let direction = face_pixel_direction(face, x, y, size);
        let (u, v) = direction_to_equirect(direction);
        options.filter.sample(source, u, v)
    });

    log::debug!("Rendered {} face in {:.1}ms", face, started.elapsed().as_secs_f64() * 1000.0);
    image
}
