use crate::{
    color::clahe::{Clahe, DEFAULT_TILE_GRID},
    color::space::{hsv_to_rgb, lab_to_rgb, rgb_to_hsv, rgb_to_lab, scale_saturation},
    config::{check_clip_limit, check_unit_interval, PostProcessConfig},
    error::Result,
    video::types::Frame,
};

/// Per-frame contrast normalization and saturation cap
///
/// Each Lab channel of the source frame is equalized with CLAHE, then the
/// saturation of the result is scaled down in HSV.
///
/// The reference frame is validated but does not feed the tile statistics:
/// equalization only looks at the source frame. Callers that pass the previous
/// frame get exactly the same output as if they passed the source itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHistogramMatcher {
    saturation_scale: f32,
    clahe: Clahe,
}

impl FrameHistogramMatcher {
    /// `saturation_scale` must be in `[0, 1]`, `clahe_clip_limit` in `(0, 4]`
    pub fn new(
        saturation_scale: f32,
        clahe_clip_limit: f32,
        tile_grid: (u32, u32),
    ) -> Result<Self> {
        check_unit_interval("postprocess.saturation_scale", saturation_scale)?;
        check_clip_limit("postprocess.clahe_clip_limit", clahe_clip_limit)?;
        Ok(Self {
            saturation_scale,
            clahe: Clahe::new(clahe_clip_limit, tile_grid),
        })
    }

    pub fn from_config(config: &PostProcessConfig) -> Result<Self> {
        Self::new(config.saturation_scale, config.clahe_clip_limit, config.tile_grid)
    }

    pub fn saturation_scale(&self) -> f32 {
        self.saturation_scale
    }

    pub fn clahe(&self) -> &Clahe {
        &self.clahe
    }

    /// Produce the contrast/saturation-normalized variant of `source`
    ///
    /// Fails with a frame error if either frame is empty or their sizes differ.
    pub fn match_frame(&self, source: &Frame, reference: &Frame) -> Result<Frame> {
        source.ensure_not_empty()?;
        reference.ensure_not_empty()?;
        source.ensure_same_size(reference)?;

        let (width, height) = (source.width(), source.height());

        let mut lab = rgb_to_lab(source);
        for channel in lab.channels.iter_mut() {
            *channel = self.clahe.apply(channel, width, height);
        }
        let equalized = lab_to_rgb(&lab);

        let mut hsv = rgb_to_hsv(&equalized);
        scale_saturation(&mut hsv, self.saturation_scale);
        Ok(hsv_to_rgb(&hsv))
    }
}

/// One-shot form of [`FrameHistogramMatcher::match_frame`] with the default 8x8 grid
pub fn match_histograms(
    source: &Frame,
    reference: &Frame,
    saturation_scale: f32,
    clahe_clip_limit: f32,
) -> Result<Frame> {
    FrameHistogramMatcher::new(saturation_scale, clahe_clip_limit, DEFAULT_TILE_GRID)?
        .match_frame(source, reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::space::rgb_to_hsv_pixel;
    use crate::error::{ColorizerError, ConfigError, FrameError};
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    fn random_frame(width: u32, height: u32, seed: u64) -> Frame {
        let mut rng = SmallRng::seed_from_u64(seed);
        Frame::from_fn(width, height, |_, _| [rng.gen(), rng.gen(), rng.gen()])
    }

    fn gradient_frame(width: u32, height: u32) -> Frame {
        Frame::from_fn(width, height, |x, y| {
            [
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) * 127 / (width + height)) as u8,
            ]
        })
    }

    #[test]
    fn test_preserves_dimensions() {
        let frame = random_frame(67, 41, 1);
        let out = match_histograms(&frame, &frame, 1.0, 2.0).unwrap();
        assert_eq!(out.width(), 67);
        assert_eq!(out.height(), 41);
    }

    #[test]
    fn test_reference_content_does_not_matter() {
        let source = gradient_frame(64, 48);
        let matcher = FrameHistogramMatcher::new(0.8, 0.5, (8, 8)).unwrap();

        let against_self = matcher.match_frame(&source, &source).unwrap();
        let against_other = matcher
            .match_frame(&source, &random_frame(64, 48, 7))
            .unwrap();
        assert_eq!(against_self, against_other);
    }

    #[test]
    fn test_zero_saturation_gives_grey() {
        let source = random_frame(32, 32, 3);
        let out = match_histograms(&source, &source, 0.0, 0.5).unwrap();
        for pixel in out.as_raw().chunks_exact(3) {
            assert_eq!(pixel[0], pixel[1]);
            assert_eq!(pixel[1], pixel[2]);
            assert_eq!(rgb_to_hsv_pixel([pixel[0], pixel[1], pixel[2]])[1], 0);
        }
    }

    #[test]
    fn test_saturation_is_reduced() {
        let source = gradient_frame(64, 64);
        let full = match_histograms(&source, &source, 1.0, 0.5).unwrap();
        let half = match_histograms(&source, &source, 0.5, 0.5).unwrap();

        let mean_saturation = |frame: &Frame| {
            let total: u64 = frame
                .as_raw()
                .chunks_exact(3)
                .map(|p| rgb_to_hsv_pixel([p[0], p[1], p[2]])[1] as u64)
                .sum();
            total as f64 / frame.pixel_count() as f64
        };

        assert!(mean_saturation(&half) < mean_saturation(&full) * 0.6);
    }

    #[test]
    fn test_mismatched_reference_is_rejected() {
        let source = random_frame(16, 16, 1);
        let reference = random_frame(16, 8, 2);
        let err = match_histograms(&source, &reference, 0.8, 0.5).unwrap_err();
        assert!(matches!(
            err,
            ColorizerError::Frame(FrameError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_frame_is_rejected() {
        let empty = Frame::new_black(0, 0);
        let err = match_histograms(&empty, &empty, 0.8, 0.5).unwrap_err();
        assert!(matches!(err, ColorizerError::Frame(FrameError::Empty { .. })));
    }

    #[test]
    fn test_parameter_ranges() {
        assert!(FrameHistogramMatcher::new(1.1, 0.5, (8, 8)).is_err());
        assert!(FrameHistogramMatcher::new(-0.1, 0.5, (8, 8)).is_err());
        assert!(FrameHistogramMatcher::new(0.8, 0.0, (8, 8)).is_err());
        assert!(FrameHistogramMatcher::new(0.8, 4.5, (8, 8)).is_err());
        assert!(FrameHistogramMatcher::new(0.0, 4.0, (8, 8)).is_ok());

        let err = FrameHistogramMatcher::new(0.8, f32::NAN, (8, 8)).unwrap_err();
        assert!(matches!(
            err,
            ColorizerError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let source = random_frame(40, 30, 11);
        let a = match_histograms(&source, &source, 0.8, 0.5).unwrap();
        let b = match_histograms(&source, &source, 0.8, 0.5).unwrap();
        assert_eq!(a, b);
    }
}
