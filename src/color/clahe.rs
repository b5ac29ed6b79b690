//! Contrast-limited adaptive histogram equalization of a single 8-bit plane.

use std::borrow::Cow;

use rayon::prelude::*;

use crate::color::space::saturate_u8;

const HIST_SIZE: usize = 256;

/// Default tile grid, columns x rows
pub const DEFAULT_TILE_GRID: (u32, u32) = (8, 8);

/// CLAHE operator for 8-bit single-channel planes
///
/// The plane is split into a grid of tiles; each tile gets its own
/// equalization LUT built from a clipped histogram, and every output sample is
/// a bilinear blend of the LUTs of the four nearest tile centres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clahe {
    clip_limit: f32,
    tiles_x: u32,
    tiles_y: u32,
}

impl Clahe {
    /// `clip_limit` is relative to a uniform histogram; `<= 0` disables clipping
    pub fn new(clip_limit: f32, tile_grid: (u32, u32)) -> Self {
        Self {
            clip_limit,
            tiles_x: tile_grid.0.max(1),
            tiles_y: tile_grid.1.max(1),
        }
    }

    pub fn clip_limit(&self) -> f32 {
        self.clip_limit
    }

    pub fn tile_grid(&self) -> (u32, u32) {
        (self.tiles_x, self.tiles_y)
    }

    /// Equalize `src` (`width * height` samples, row-major)
    pub fn apply(&self, src: &[u8], width: u32, height: u32) -> Vec<u8> {
        let width = width as usize;
        let height = height as usize;
        debug_assert_eq!(src.len(), width * height);
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let tiles_x = self.tiles_x as usize;
        let tiles_y = self.tiles_y as usize;

        // Planes that do not split evenly are mirrored out on the bottom/right.
        // When only one axis is uneven the other one still gains a full tile
        // of padding; tile sizes are derived from the padded plane.
        let (ext, ext_width, ext_height) = if width % tiles_x == 0 && height % tiles_y == 0 {
            (Cow::Borrowed(src), width, height)
        } else {
            let ext_width = width + tiles_x - width % tiles_x;
            let ext_height = height + tiles_y - height % tiles_y;
            (
                Cow::Owned(pad_reflect_101(src, width, height, ext_width, ext_height)),
                ext_width,
                ext_height,
            )
        };

        let tile_width = ext_width / tiles_x;
        let tile_height = ext_height / tiles_y;
        let tile_area = tile_width * tile_height;

        let clip = if self.clip_limit > 0.0 {
            Some(((self.clip_limit * tile_area as f32 / HIST_SIZE as f32) as u32).max(1))
        } else {
            None
        };
        let lut_scale = (HIST_SIZE - 1) as f32 / tile_area as f32;

        let luts: Vec<[u8; HIST_SIZE]> = (0..tiles_x * tiles_y)
            .into_par_iter()
            .map(|tile| {
                let tx = tile % tiles_x;
                let ty = tile / tiles_x;
                let mut hist = [0u32; HIST_SIZE];
                for row in ty * tile_height..(ty + 1) * tile_height {
                    let start = row * ext_width + tx * tile_width;
                    for &v in &ext[start..start + tile_width] {
                        hist[v as usize] += 1;
                    }
                }
                if let Some(clip) = clip {
                    clip_histogram(&mut hist, clip);
                }
                build_lut(&hist, lut_scale)
            })
            .collect();

        let columns = interpolation_axis(width, tile_width, tiles_x);
        let rows = interpolation_axis(height, tile_height, tiles_y);

        let mut dst = vec![0u8; width * height];
        dst.par_chunks_mut(width)
            .zip(src.par_chunks(width))
            .enumerate()
            .for_each(|(y, (out_row, in_row))| {
                let row = &rows[y];
                let top = row.lo * tiles_x;
                let bottom = row.hi * tiles_x;
                for (x, (out, &v)) in out_row.iter_mut().zip(in_row).enumerate() {
                    let col = &columns[x];
                    let v = v as usize;
                    let upper = luts[top + col.lo][v] as f32 * (1.0 - col.weight)
                        + luts[top + col.hi][v] as f32 * col.weight;
                    let lower = luts[bottom + col.lo][v] as f32 * (1.0 - col.weight)
                        + luts[bottom + col.hi][v] as f32 * col.weight;
                    *out = saturate_u8(upper * (1.0 - row.weight) + lower * row.weight);
                }
            });

        dst
    }
}

/// Neighbouring tile indices and the weight of the higher one for one coordinate
#[derive(Debug, Clone, Copy)]
struct AxisSample {
    lo: usize,
    hi: usize,
    weight: f32,
}

fn interpolation_axis(len: usize, tile_len: usize, tiles: usize) -> Vec<AxisSample> {
    let inv = 1.0 / tile_len as f32;
    (0..len)
        .map(|i| {
            let pos = i as f32 * inv - 0.5;
            let lo = pos.floor();
            let weight = pos - lo;
            let lo = lo as i64;
            AxisSample {
                lo: lo.max(0) as usize,
                hi: ((lo + 1) as usize).min(tiles - 1),
                weight,
            }
        })
        .collect()
}

/// Clip every bin at `clip` and spread the excess back over the histogram
fn clip_histogram(hist: &mut [u32; HIST_SIZE], clip: u32) {
    let mut clipped = 0u32;
    for bin in hist.iter_mut() {
        if *bin > clip {
            clipped += *bin - clip;
            *bin = clip;
        }
    }

    let batch = clipped / HIST_SIZE as u32;
    let mut residual = (clipped - batch * HIST_SIZE as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual != 0 {
        let step = (HIST_SIZE / residual).max(1);
        let mut i = 0;
        while i < HIST_SIZE && residual > 0 {
            hist[i] += 1;
            i += step;
            residual -= 1;
        }
    }
}

fn build_lut(hist: &[u32; HIST_SIZE], scale: f32) -> [u8; HIST_SIZE] {
    let mut lut = [0u8; HIST_SIZE];
    let mut sum = 0u32;
    for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = saturate_u8(sum as f32 * scale);
    }
    lut
}

/// Mirror `src` out to `ext_width` x `ext_height` without repeating the edge sample
fn pad_reflect_101(
    src: &[u8],
    width: usize,
    height: usize,
    ext_width: usize,
    ext_height: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(ext_width * ext_height);
    let columns: Vec<usize> = (0..ext_width).map(|x| reflect_101(x, width)).collect();
    for y in 0..ext_height {
        let row = &src[reflect_101(y, height) * width..][..width];
        out.extend(columns.iter().map(|&x| row[x]));
    }
    out
}

fn reflect_101(pos: usize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let mut p = pos as i64;
    let len = len as i64;
    loop {
        if p < 0 {
            p = -p;
        } else if p >= len {
            p = 2 * len - 2 - p;
        } else {
            return p as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        let idx: Vec<usize> = (0..7).map(|i| reflect_101(i, 4)).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 2, 1, 0]);
        // padding wider than the plane keeps bouncing
        assert_eq!(reflect_101(7, 4), 1);
        assert_eq!(reflect_101(5, 1), 0);
    }

    #[test]
    fn test_clip_histogram_conserves_mass() {
        let mut hist = [0u32; HIST_SIZE];
        hist[0] = 1000;
        hist[10] = 24;
        clip_histogram(&mut hist, 4);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist.iter().all(|&c| c <= 4 + 1000 / 256 + 1));
    }

    #[test]
    fn test_clip_histogram_spreads_residual_from_zero() {
        // one 16x16 tile of a constant plane
        let mut hist = [0u32; HIST_SIZE];
        hist[0] = 256;
        clip_histogram(&mut hist, 1);
        // 255 excess counts: no full batch, residual 255 at stride 1
        assert_eq!(hist[0], 2);
        assert_eq!(hist[254], 1);
        assert_eq!(hist[255], 0);
    }

    #[test]
    fn test_output_has_input_size() {
        let clahe = Clahe::new(2.0, (8, 8));
        let src: Vec<u8> = (0..37 * 23).map(|i| (i * 7 % 256) as u8).collect();
        let out = clahe.apply(&src, 37, 23);
        assert_eq!(out.len(), src.len());
    }

    #[test]
    fn test_constant_plane_stays_constant() {
        let clahe = Clahe::new(0.5, (8, 8));
        let src = vec![0u8; 128 * 128];
        let out = clahe.apply(&src, 128, 128);
        let first = out[0];
        assert!(out.iter().all(|&v| v == first));
        // only the redistributed excess lifts black
        assert!(first <= 2, "black mapped to {}", first);
    }

    #[test]
    fn test_single_tile_without_clipping_is_global_equalization() {
        let src: Vec<u8> = (0..64).collect();
        let out = Clahe::new(0.0, (1, 1)).apply(&src, 64, 1);
        assert_eq!(out[0], 4);
        assert_eq!(out[63], 255);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_deterministic() {
        let src: Vec<u8> = (0..96 * 54).map(|i| ((i * 31) ^ (i >> 3)) as u8).collect();
        let clahe = Clahe::new(1.5, (8, 8));
        assert_eq!(clahe.apply(&src, 96, 54), clahe.apply(&src, 96, 54));
    }
}
