use rayon::prelude::*;

use crate::color::space::saturate_u8;
use crate::config::check_unit_interval;
use crate::error::Result;
use crate::video::types::Frame;

/// Weighted per-sample mix: `original * (1 - factor) + processed * factor`
///
/// Each sample is rounded to nearest and clamped to `[0, 255]`.
pub fn blend_frames(original: &Frame, processed: &Frame, factor: f32) -> Result<Frame> {
    check_unit_interval("postprocess.blend_factor", factor)?;
    original.ensure_same_size(processed)?;

    let keep = 1.0 - factor;
    let mut out = original.clone();
    out.as_raw_mut()
        .par_chunks_mut(4096)
        .zip(processed.as_raw().par_chunks(4096))
        .for_each(|(dst, src)| {
            for (o, &m) in dst.iter_mut().zip(src) {
                *o = saturate_u8(*o as f32 * keep + m as f32 * factor);
            }
        });
    Ok(out)
}
