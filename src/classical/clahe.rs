//! Contrast-limited adaptive histogram equalization on a single 8-bit plane.

use image::GrayImage;

const BINS: usize = 256;

/// Equalize `plane` with CLAHE.
///
/// The plane is divided into `tiles_x` x `tiles_y` tiles. Each tile gets its
/// own clipped-histogram lookup table, and every pixel is mapped through a
/// bilinear blend of the four nearest tile tables. When the plane size is not
/// a multiple of the grid, the tiles extend past the edge and sample a
/// reflected border.
///
/// `clip_limit` is relative to a uniform histogram; a clip limit of 1.0
/// disables contrast enhancement in practice.
///
/// Callers must pass a non-empty plane and a non-zero grid.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn equalize(plane: &GrayImage, clip_limit: f32, (tiles_x, tiles_y): (u32, u32)) -> GrayImage {
    let (width, height) = plane.dimensions();
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);
    let tile_area = (tile_w * tile_h) as usize;

    let clip = ((clip_limit * tile_area as f32 / BINS as f32) as usize).max(1);
    let lut_scale = 255.0 / tile_area as f32;

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = tile_histogram(plane, tx * tile_w, ty * tile_h, tile_w, tile_h);
            clip_histogram(&mut hist, clip);
            luts.push(cumulative_lut(&hist, lut_scale));
        }
    }

    let lut = |tx: usize, ty: usize| &luts[ty * tiles_x as usize + tx];
    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;

    let x_taps: Vec<(usize, usize, f32)> = (0..width)
        .map(|x| interpolation_tap(x, inv_tw, tiles_x))
        .collect();

    let mut out = GrayImage::new(width, height);
    for y in 0..height {
        let (ty1, ty2, ya) = interpolation_tap(y, inv_th, tiles_y);
        for (x, &(tx1, tx2, xa)) in x_taps.iter().enumerate() {
            let v = plane.get_pixel(x as u32, y)[0] as usize;
            let top = f32::from(lut(tx1, ty1)[v]).mul_add(1.0 - xa, f32::from(lut(tx2, ty1)[v]) * xa);
            let bottom =
                f32::from(lut(tx1, ty2)[v]).mul_add(1.0 - xa, f32::from(lut(tx2, ty2)[v]) * xa);
            let value = top.mul_add(1.0 - ya, bottom * ya);
            out.put_pixel(x as u32, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }

    out
}

/// Neighbouring tile indices and the blend weight of the second one.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn interpolation_tap(pos: u32, inv_tile: f32, tiles: u32) -> (usize, usize, f32) {
    let t = (pos as f32).mul_add(inv_tile, -0.5);
    let t1 = t.floor();
    let weight = t - t1;
    let last = tiles as i64 - 1;
    let first = (t1 as i64).clamp(0, last);
    let second = (t1 as i64 + 1).clamp(0, last);
    (first as usize, second as usize, weight)
}

fn tile_histogram(plane: &GrayImage, x0: u32, y0: u32, tile_w: u32, tile_h: u32) -> [usize; BINS] {
    let (width, height) = plane.dimensions();
    let mut hist = [0usize; BINS];
    for y in y0..y0 + tile_h {
        let sy = reflect_101(y, height);
        for x in x0..x0 + tile_w {
            let sx = reflect_101(x, width);
            hist[plane.get_pixel(sx, sy)[0] as usize] += 1;
        }
    }
    hist
}

/// Clip every bin at `limit` and spread the excess evenly over all bins.
fn clip_histogram(hist: &mut [usize; BINS], limit: usize) {
    let mut clipped = 0;
    for bin in hist.iter_mut() {
        if *bin > limit {
            clipped += *bin - limit;
            *bin = limit;
        }
    }

    let batch = clipped / BINS;
    let mut residual = clipped - batch * BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn cumulative_lut(hist: &[usize; BINS], scale: f32) -> [u8; BINS] {
    let mut lut = [0u8; BINS];
    let mut sum = 0usize;
    for (entry, &count) in lut.iter_mut().zip(hist) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Mirror an out-of-range coordinate back into `0..len` without repeating
/// the edge sample (`gfedcb|abcdefgh|gfedcba`).
pub(crate) fn reflect_101(pos: u32, len: u32) -> u32 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let p = pos % period;
    if p < len {
        p
    } else {
        period - p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(0, 5), 0);
        assert_eq!(reflect_101(4, 5), 4);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(8, 5), 0);
        assert_eq!(reflect_101(9, 5), 1);
        assert_eq!(reflect_101(7, 1), 0);
    }

    #[test]
    fn test_clip_preserves_total_count() {
        let mut hist = [0usize; BINS];
        hist[10] = 1000;
        hist[200] = 37;
        clip_histogram(&mut hist, 12);

        assert_eq!(hist.iter().sum::<usize>(), 1037);
        assert!(hist.iter().all(|&b| b <= 12 + 1000 / BINS + 1));
    }

    #[test]
    fn test_uniform_plane_stays_uniform() {
        let plane = GrayImage::from_pixel(64, 48, Luma([40]));
        let out = equalize(&plane, 3.0, (8, 8));

        let first = out.get_pixel(0, 0)[0];
        assert!(out.pixels().all(|p| p[0] == first));
    }

    #[test]
    fn test_dark_gradient_is_stretched() {
        let plane = GrayImage::from_fn(64, 64, |x, _| Luma([(x / 2) as u8]));
        let out = equalize(&plane, 3.0, (8, 8));

        let max_in = plane.pixels().map(|p| p[0]).max().unwrap();
        let max_out = out.pixels().map(|p| p[0]).max().unwrap();
        assert!(max_out > max_in, "expected stretch, got {max_out} <= {max_in}");
    }

    #[test]
    fn test_handles_planes_smaller_than_grid() {
        let plane = GrayImage::from_fn(5, 3, |x, y| Luma([(x * 40 + y * 10) as u8]));
        let out = equalize(&plane, 3.0, (8, 8));
        assert_eq!(out.dimensions(), (5, 3));
    }
}
