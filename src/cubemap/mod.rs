//! Cubemap container, face geometry, and direction mapping.

#![allow(dead_code)]

use crate::geometry::*;
use crate::image::*;
use crate::math::*;

/// One of the six axis-aligned cube faces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    /// -X
    NX,
    /// +X
    PX,
    /// -Y
    NY,
    /// +Y
    PY,
    /// -Z
    NZ,
    /// +Z
    PZ,
}

impl Face {
    /// All six faces, in ordinal order.
    pub const ALL: [Face; 6] = [Face::NX, Face::PX, Face::NY, Face::PY, Face::NZ, Face::PZ];

    /// Returns the fixed two-letter token for this face, as used by external
    /// naming and serialization code.
    pub fn name(self) -> &'static str {
        match self {
            Face::NX => "nx",
            Face::PX => "px",
            Face::NY => "ny",
            Face::PY => "py",
            Face::NZ => "nz",
            Face::PZ => "pz",
        }
    }

    /// Maps the continuous texel coordinate `(x, y)` on this face of a
    /// `dim`-sized cubemap to a unit direction. Coordinates sweep the face
    /// over [0, dim] in both axes; fractional and slightly out-of-range
    /// values are valid.
    ///
    /// * `dim` - Cubemap face dimension.
    /// * `x`   - Continuous column coordinate.
    /// * `y`   - Continuous row coordinate.
    pub fn direction(self, dim: usize, x: f64, y: f64) -> Vector3d {
        let scale = 2.0 / dim as f64;
        let cx = x * scale - 1.0;
        let cy = 1.0 - y * scale;

        let dir = match self {
            Face::PX => Vector3::new(1.0, cy, -cx),
            Face::NX => Vector3::new(-1.0, cy, cx),
            Face::PY => Vector3::new(cx, 1.0, -cy),
            Face::NY => Vector3::new(cx, -1.0, cy),
            Face::PZ => Vector3::new(cx, cy, 1.0),
            Face::NZ => Vector3::new(-cx, cy, -1.0),
        };
        dir / (cx * cx + cy * cy + 1.0).sqrt()
    }
}

/// Orientation of the cross layout packing six faces into one image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Geometry {
    /// 4·dim × 3·dim cross.
    HorizontalCross,
    /// 3·dim × 4·dim cross.
    VerticalCross,
}

impl Geometry {
    /// Returns the nominal cross-image size for face dimension `dim`.
    ///
    /// * `dim` - Cubemap face dimension.
    pub fn cross_size(self, dim: usize) -> (usize, usize) {
        match self {
            Geometry::HorizontalCross => (4 * dim, 3 * dim),
            Geometry::VerticalCross => (3 * dim, 4 * dim),
        }
    }

    /// Returns the tile origin of `face` within a cross image of this
    /// orientation.
    ///
    /// * `face` - The cube face.
    /// * `dim`  - Cubemap face dimension.
    pub fn face_offset(self, face: Face, dim: usize) -> (usize, usize) {
        match face {
            Face::NX => (0, dim),
            Face::PX => (2 * dim, dim),
            Face::NY => (dim, 2 * dim),
            Face::PY => (dim, 0),
            Face::NZ => match self {
                // TODO: validate the NZ tile position in vertical crosses
                // against reference imagery; the placement below the PZ tile
                // is historical.
                Geometry::VerticalCross => (dim, 3 * dim),
                Geometry::HorizontalCross => (3 * dim, dim),
            },
            Face::PZ => (dim, dim),
        }
    }
}

/// Allocates a zero-initialized cross-layout image for face dimension `dim`,
/// with one extra row and column of texels so edge filtering can read one
/// texel past every face.
///
/// * `dim`      - Cubemap face dimension.
/// * `geometry` - Cross orientation.
pub fn create_cross_image(dim: usize, geometry: Geometry) -> Image {
    let (width, height) = geometry.cross_size(dim);
    Image::with_layout(width, height, width + 1, height + 1)
}

/// Face-local address of a direction: the face it pierces plus `(s, t)` in
/// [0, 1] across that face.
#[derive(Copy, Clone, Debug)]
pub struct Address {
    /// The face the direction passes through.
    pub face: Face,

    /// Horizontal face coordinate in [0, 1].
    pub s: f64,

    /// Vertical face coordinate in [0, 1].
    pub t: f64,
}

/// Six square faces of equal dimension bound as windows into one owned
/// cross-layout image.
#[derive(Clone, Debug)]
pub struct Cubemap {
    /// Face dimension in texels.
    dim: usize,

    /// Cross orientation of the backing image.
    geometry: Geometry,

    /// Backing cross-layout image; sole owner of the pixel storage.
    image: Image,
}

impl Cubemap {
    /// Creates a cubemap of face dimension `dim` backed by a freshly
    /// allocated, zero-initialized cross image.
    ///
    /// * `dim`      - Face dimension in texels.
    /// * `geometry` - Cross orientation.
    pub fn new(dim: usize, geometry: Geometry) -> Self {
        assert!(dim > 0, "cubemap dimension must be non-zero");
        Self {
            dim,
            geometry,
            image: create_cross_image(dim, geometry),
        }
    }

    /// Returns the face dimension in texels.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the cross orientation.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Sets the cross orientation. Changing the orientation reallocates the
    /// backing image and discards the current texel content.
    ///
    /// * `geometry` - Cross orientation.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        if self.geometry != geometry {
            self.geometry = geometry;
            self.image = create_cross_image(self.dim, geometry);
        }
    }

    /// Returns the backing cross image.
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Returns the backing cross image mutably.
    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    /// Returns the tile origin of `face` within the backing image.
    ///
    /// * `face` - The cube face.
    pub fn face_offset(&self, face: Face) -> (usize, usize) {
        self.geometry.face_offset(face, self.dim)
    }

    /// Returns the image window holding `face`.
    ///
    /// * `face` - The cube face.
    pub fn face(&self, face: Face) -> ImageView<'_> {
        let (x, y) = self.face_offset(face);
        self.image.sub_view(x, y, self.dim, self.dim)
    }

    /// Maps a continuous texel coordinate on a face of this cubemap to a
    /// unit direction.
    ///
    /// * `face` - The cube face.
    /// * `x`    - Continuous column coordinate.
    /// * `y`    - Continuous row coordinate.
    pub fn direction_for(&self, face: Face, x: f64, y: f64) -> Vector3d {
        face.direction(self.dim, x, y)
    }

    /// Resolves a direction to the face it pierces and the face-local
    /// `(s, t)` coordinate, by major-axis selection.
    ///
    /// * `direction` - The direction; need not be normalized.
    pub fn address_for(direction: &Vector3d) -> Address {
        let a = direction.abs();

        let (face, sc, tc, ma) = if a.x >= a.y && a.x >= a.z {
            if direction.x >= 0.0 {
                (Face::PX, -direction.z, -direction.y, a.x)
            } else {
                (Face::NX, direction.z, -direction.y, a.x)
            }
        } else if a.y >= a.z {
            if direction.y >= 0.0 {
                (Face::PY, direction.x, direction.z, a.y)
            } else {
                (Face::NY, direction.x, -direction.z, a.y)
            }
        } else if direction.z >= 0.0 {
            (Face::PZ, direction.x, -direction.y, a.z)
        } else {
            (Face::NZ, -direction.x, -direction.y, a.z)
        };

        // ma >= |sc| and ma >= |tc|, so s and t land in [0, 1]
        Address {
            face,
            s: (sc / ma + 1.0) * 0.5,
            t: (tc / ma + 1.0) * 0.5,
        }
    }

    /// Returns the texel nearest to where `direction` pierces the cube.
    ///
    /// * `direction` - The sampling direction.
    pub fn sample_at(&self, direction: &Vector3d) -> Texel {
        let addr = Self::address_for(direction);
        let x = min((addr.s * self.dim as f64) as usize, self.dim - 1);
        let y = min((addr.t * self.dim as f64) as usize, self.dim - 1);
        *self.face(addr.face).texel(x, y)
    }

    /// Returns the bilinearly filtered color where `direction` pierces the
    /// cube.
    ///
    /// * `direction` - The sampling direction.
    pub fn filter_at(&self, direction: &Vector3d) -> Texel {
        let addr = Self::address_for(direction);
        let upper = self.dim as f64 * ONE_MINUS_EPSILON;
        let x = min(addr.s * self.dim as f64, upper);
        let y = min(addr.t * self.dim as f64, upper);
        self.face(addr.face).filter_at(x, y)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn face_names_are_total_and_unique() {
        let names: HashSet<&str> = Face::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), 6);
        for name in ["nx", "px", "ny", "py", "nz", "pz"] {
            assert!(names.contains(name));
        }
    }

    #[test]
    fn face_centers_point_along_axes() {
        let dim = 16;
        let half = dim as f64 / 2.0;
        assert_eq!(Face::PX.direction(dim, half, half), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(Face::NX.direction(dim, half, half), Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(Face::PY.direction(dim, half, half), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(Face::NY.direction(dim, half, half), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(Face::PZ.direction(dim, half, half), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(Face::NZ.direction(dim, half, half), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn address_round_trips_texel_centers() {
        let dim = 8;
        for face in Face::ALL {
            for y in 0..dim {
                for x in 0..dim {
                    let d = face.direction(dim, x as f64 + 0.5, y as f64 + 0.5);
                    let addr = Cubemap::address_for(&d);
                    assert_eq!(addr.face, face);
                    assert!((addr.s * dim as f64 - (x as f64 + 0.5)).abs() < 1e-9);
                    assert!((addr.t * dim as f64 - (y as f64 + 0.5)).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn sample_constant_cubemap() {
        let mut cm = Cubemap::new(4, Geometry::HorizontalCross);
        let c = Texel::new(0.25, 0.5, 0.75);
        for y in 0..cm.image().height() {
            for texel in cm.image_mut().row_mut(y) {
                *texel = c;
            }
        }

        for face in Face::ALL {
            let d = face.direction(4, 1.7, 3.2);
            assert_eq!(cm.sample_at(&d), c);
        }
    }

    #[test]
    fn vertical_cross_moves_nz() {
        let dim = 4;
        let h = Geometry::HorizontalCross;
        let v = Geometry::VerticalCross;
        assert_eq!(h.face_offset(Face::NZ, dim), (3 * dim, dim));
        assert_eq!(v.face_offset(Face::NZ, dim), (dim, 3 * dim));
        for face in Face::ALL {
            if face != Face::NZ {
                assert_eq!(h.face_offset(face, dim), v.face_offset(face, dim));
            }
        }
    }

    #[test]
    fn cross_image_is_padded() {
        let image = create_cross_image(4, Geometry::HorizontalCross);
        assert_eq!((image.width(), image.height()), (16, 12));
        assert!(image.stride() >= 17);
        assert!(image.pixels().len() >= image.stride() * 13);
        assert_eq!(image.bytes_per_row() % ROW_ALIGNMENT, 0);
    }

    proptest! {
        #[test]
        fn directions_are_unit_length(
            x in -0.5..16.5f64,
            y in -0.5..16.5f64,
            i in 0usize..6,
        ) {
            let d = Face::ALL[i].direction(16, x, y);
            prop_assert!((d.length() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn address_stays_in_range(
            x in -1.0..1.0f64,
            y in -1.0..1.0f64,
            z in -1.0..1.0f64,
        ) {
            prop_assume!(x != 0.0 || y != 0.0 || z != 0.0);
            let addr = Cubemap::address_for(&Vector3::new(x, y, z));
            prop_assert!((0.0..=1.0).contains(&addr.s));
            prop_assert!((0.0..=1.0).contains(&addr.t));
        }
    }
}
