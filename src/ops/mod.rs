//! Cubemap operations: projection, reduction, packing, mirroring, and
//! per-texel solid-angle weighting.

#![allow(dead_code)]

use crate::cubemap::*;
use crate::geometry::*;
use crate::image::*;
use crate::math::*;
use crate::sampling::*;

/// Runs `scanline` over every face row of `cm`, fanning the rows out across
/// worker threads. Each worker owns one `S` created by `init`; the states
/// are returned for the caller to reduce. Rows are disjoint spans of the
/// backing cross buffer, so workers never alias.
///
/// * `cm`       - The cubemap whose rows are processed.
/// * `init`     - Creates one scratch state per worker.
/// * `scanline` - Transform applied to `(state, face, row index, row)`; the
///                row length is the cubemap dimension.
pub fn process<S, I, P>(cm: &mut Cubemap, init: I, scanline: P) -> Vec<S>
where
    S: Send,
    I: Fn() -> S + Sync,
    P: Fn(&mut S, Face, usize, &mut [Texel]) + Sync,
{
    let dim = cm.dim();
    let geometry = cm.geometry();
    let stride = cm.image().stride();
    let height = cm.image().height();
    let pixels = cm.image_mut().pixels_mut();

    // Carve every face row out of the shared cross buffer. A buffer row can
    // hold rows of several faces, so it is split left to right into disjoint
    // spans.
    let mut jobs: Vec<(Face, usize, &mut [Texel])> = Vec::with_capacity(6 * dim);
    for (yy, buf_row) in pixels.chunks_mut(stride).take(height).enumerate() {
        let mut spans: Vec<(Face, usize, usize)> = Face::ALL
            .iter()
            .filter_map(|&f| {
                let (ox, oy) = geometry.face_offset(f, dim);
                (oy..oy + dim).contains(&yy).then_some((f, ox, oy))
            })
            .collect();
        spans.sort_unstable_by_key(|&(_, ox, _)| ox);

        let mut rest = buf_row;
        let mut consumed = 0;
        for (f, ox, oy) in spans {
            let tail = rest.split_at_mut(ox - consumed).1;
            let (span, tail) = tail.split_at_mut(dim);
            jobs.push((f, yy - oy, span));
            rest = tail;
            consumed = ox + dim;
        }
    }

    let workers = min(num_cpus::get(), jobs.len());
    crossbeam::thread::scope(|scope| {
        let (tx, rx) = crossbeam_channel::bounded(workers);
        let init = &init;
        let scanline = &scanline;

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let rxc: crossbeam_channel::Receiver<(Face, usize, &mut [Texel])> = rx.clone();
                scope.spawn(move |_| {
                    let mut state = init();
                    for (f, y, span) in rxc.iter() {
                        scanline(&mut state, f, y, span);
                    }
                    state
                })
            })
            .collect();
        drop(rx);

        for job in jobs {
            tx.send(job).unwrap();
        }
        drop(tx);

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap()
}

/// Stateless convenience wrapper over [`process`].
///
/// * `cm`       - The cubemap whose rows are processed.
/// * `scanline` - Transform applied to `(face, row index, row)`.
pub fn process_rows<P>(cm: &mut Cubemap, scanline: P)
where
    P: Fn(Face, usize, &mut [Texel]) + Sync,
{
    process(
        cm,
        || (),
        |_: &mut (), f: Face, y: usize, span: &mut [Texel]| scanline(f, y, span),
    );
}

/// Projects an equirectangular panorama onto a cubemap with adaptive
/// supersampling: each destination texel takes as many source samples as the
/// bounding box of its projected footprint covers source pixels, placed with
/// the Hammersley set and box averaged.
///
/// * `dst` - Destination cubemap.
/// * `src` - Source equirectangular image.
pub fn equirectangular_to_cubemap(dst: &mut Cubemap, src: &Image) {
    let width = src.width();
    let height = src.height();
    if width != 2 * height {
        warn!("equirectangular source is {width}x{height}, expected a 2:1 aspect");
    }
    info!(
        "Projecting {width}x{height} equirectangular image onto a {} cubemap",
        dst.dim()
    );

    let dim = dst.dim();

    // x = cos(phi) sin(theta)
    // y = sin(phi)
    // z = cos(phi) cos(theta)
    let to_rectilinear = move |s: Vector3d| -> Vector2d {
        let xf = s.x.atan2(s.z) * INV_PI; // range [-1.0, 1.0]
        let yf = s.y.asin() * (2.0 * INV_PI); // range [-1.0, 1.0]
        Vector2::new(
            (xf + 1.0) * 0.5 * (width - 1) as f64, // range [0, width [
            (1.0 - yf) * 0.5 * (height - 1) as f64, // range [0, height[
        )
    };

    process_rows(dst, |f, y, row| {
        let yd = y as f64;
        for (x, out) in row.iter_mut().enumerate() {
            let xd = x as f64;

            // The sample count comes from the texel's footprint in the
            // source: the bounding box of its four projected corners.
            let p0 = to_rectilinear(f.direction(dim, xd, yd));
            let p1 = to_rectilinear(f.direction(dim, xd + 1.0, yd));
            let p2 = to_rectilinear(f.direction(dim, xd, yd + 1.0));
            let p3 = to_rectilinear(f.direction(dim, xd + 1.0, yd + 1.0));
            let lo = p0.min(&p1).min(&p2).min(&p3);
            let hi = p0.max(&p1).max(&p2).max(&p3);
            let dx = max(1.0, hi.x - lo.x);
            let dy = max(1.0, hi.y - lo.y);
            let num_samples = (dx * dy) as usize;

            let inv_samples = 1.0 / num_samples as f64;
            let mut c = Texel::default();
            for sample in 0..num_samples {
                // Spread the samples over the destination texel and pull the
                // source pixel each lands on.
                let h = hammersley(sample as u32, inv_samples);
                let s = f.direction(dim, xd + h.x, yd + h.y);
                let pos = to_rectilinear(s);
                c += *src.texel(pos.x as usize, pos.y as usize);
            }
            c *= inv_samples as Float;

            *out = c;
        }
    });
}

/// Reduces `src` into the smaller cubemap `dst` with a box filter; the
/// filter radius is fixed by the scale factor. `src`'s dimension must be an
/// integer multiple of `dst`'s.
///
/// * `dst` - Destination cubemap.
/// * `src` - Source cubemap.
pub fn downsample_cubemap_level_box_filter(dst: &mut Cubemap, src: &Cubemap) {
    assert!(
        src.dim() % dst.dim() == 0,
        "source dimension {} is not a multiple of destination dimension {}",
        src.dim(),
        dst.dim()
    );
    let scale = (src.dim() / dst.dim()) as f64;

    process_rows(dst, |f, y, row| {
        let image = src.face(f);
        for (x, out) in row.iter_mut().enumerate() {
            *out = image.filter_at(x as f64 * scale + 0.5, y as f64 * scale + 0.5);
        }
    });
}

/// Copies the tile of `face` out of the cross image into the cubemap. The
/// tile position follows the source image's orientation (vertical cross when
/// its height exceeds its width).
///
/// * `cm`    - Destination cubemap.
/// * `face`  - The cube face.
/// * `image` - Source cross image.
pub fn set_face_from_cross(cm: &mut Cubemap, face: Face, image: &Image) {
    let dim = cm.dim();
    let src_geometry = if image.height() > image.width() {
        Geometry::VerticalCross
    } else {
        Geometry::HorizontalCross
    };
    let (sx, sy) = src_geometry.face_offset(face, dim);
    assert!(
        sx + dim <= image.width() && sy + dim <= image.height(),
        "cross image {}x{} too small for a {} cubemap",
        image.width(),
        image.height(),
        dim
    );

    let (dx, dy) = cm.face_offset(face);
    for y in 0..dim {
        let src_row = &image.row(sy + y)[sx..sx + dim];
        cm.image_mut().row_mut(dy + y)[dx..dx + dim].copy_from_slice(src_row);
    }
}

/// Infers the cross orientation from the source image's aspect ratio, sets
/// the cubemap's geometry accordingly, and copies all six face tiles.
///
/// * `cm`    - Destination cubemap.
/// * `image` - Source cross image.
pub fn set_all_faces_from_cross(cm: &mut Cubemap, image: &Image) {
    cm.set_geometry(if image.height() > image.width() {
        Geometry::VerticalCross
    } else {
        Geometry::HorizontalCross
    });
    for face in Face::ALL {
        set_face_from_cross(cm, face, image);
    }
}

/// Copies `src` into the top-left corner of `dst`, which must be at least as
/// large in both axes.
///
/// * `dst` - Destination image.
/// * `src` - Source image.
pub fn copy_image(dst: &mut Image, src: &Image) {
    assert!(
        dst.width() >= src.width() && dst.height() >= src.height(),
        "cannot copy {}x{} image into {}x{} image",
        src.width(),
        src.height(),
        dst.width(),
        dst.height()
    );
    for y in 0..src.height() {
        dst.row_mut(y)[..src.width()].copy_from_slice(src.row(y));
    }
}

/// Writes into every destination texel the source color sampled along the
/// destination direction reflected across the YZ plane, producing a
/// handedness-flipped copy of `src`.
///
/// * `dst` - Destination cubemap.
/// * `src` - Source cubemap.
pub fn mirror_cubemap(dst: &mut Cubemap, src: &Cubemap) {
    let dim = dst.dim();
    process_rows(dst, |f, y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let n = f.direction(dim, x as f64, y as f64);
            *out = src.filter_at(&Vector3::new(-n.x, n.y, n.z));
        }
    });
}

/// Fills the cubemap with a per-face colored checkerboard at HDR intensity,
/// for validating face orientation and cross layout against reference
/// imagery.
///
/// * `cm`             - Destination cubemap.
/// * `grid_frequency` - Number of grid cells across one face.
pub fn generate_uv_grid(cm: &mut Cubemap, grid_frequency: usize) {
    const COLORS: [Texel; 6] = [
        Texel { r: 1.0, g: 0.0, b: 0.0 }, // nx - red
        Texel { r: 1.0, g: 1.0, b: 1.0 }, // px - white
        Texel { r: 0.0, g: 1.0, b: 0.0 }, // ny - green
        Texel { r: 0.0, g: 0.0, b: 1.0 }, // py - blue
        Texel { r: 1.0, g: 0.0, b: 1.0 }, // nz - magenta
        Texel { r: 1.0, g: 1.0, b: 0.0 }, // pz - yellow
    ];
    const HDR_INTENSITY: Float = 5.0;

    assert!(
        grid_frequency > 0 && grid_frequency <= cm.dim(),
        "grid frequency {} out of range for a {} cubemap",
        grid_frequency,
        cm.dim()
    );
    let grid_size = cm.dim() / grid_frequency;

    process_rows(cm, |f, y, row| {
        for (x, out) in row.iter_mut().enumerate() {
            let grid = (((x / grid_size) ^ (y / grid_size)) & 1) == 1;
            *out = if grid {
                COLORS[f as usize] * HDR_INTENSITY
            } else {
                Texel::default()
            };
        }
    });
}

/*
 * Area of a cube face's quadrant projected onto a sphere
 *
 *  1 +---+----------+
 *    |   |          |
 *    |---+----------|
 *    |   |(x,y)     |
 *    |   |          |
 *    |   |          |
 * -1 +---+----------+
 *   -1              1
 *
 * The quadrant (-1,1)-(x,y) is projected onto the unit sphere.
 */
#[inline]
fn sphere_quadrant_area(x: f64, y: f64) -> f64 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

/// Returns the solid angle in steradians subtended on the unit sphere by
/// texel `(u, v)` of a `dim`-sized cube face, in closed form.
///
/// * `dim` - Cubemap face dimension.
/// * `u`   - Texel column.
/// * `v`   - Texel row.
pub fn solid_angle(dim: usize, u: usize, v: usize) -> f64 {
    let i_dim = 1.0 / dim as f64;
    let s = (u as f64 + 0.5) * 2.0 * i_dim - 1.0;
    let t = (v as f64 + 0.5) * 2.0 * i_dim - 1.0;
    let x0 = s - i_dim;
    let y0 = t - i_dim;
    let x1 = s + i_dim;
    let y1 = t + i_dim;
    sphere_quadrant_area(x0, y0) - sphere_quadrant_area(x0, y1) - sphere_quadrant_area(x1, y0)
        + sphere_quadrant_area(x1, y1)
}

/// Clamps every channel of every texel to 256. Radiance above 256 cannot be
/// represented once the data is RGBM encoded, and destabilizes the
/// importance-sampled prefiltering and spherical-harmonic projection that
/// consume these images.
///
/// * `image` - The image to clamp in place.
pub fn clamp(image: &mut Image) {
    for y in 0..image.height() {
        for texel in image.row_mut(y) {
            texel.r = min(texel.r, 256.0);
            texel.g = min(texel.g, 256.0);
            texel.b = min(texel.b, 256.0);
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
