//! 8-bit CIE L\*a\*b\* and HSV views of RGB frames.
//!
//! Both views use the common 8-bit encodings: Lab stores `L * 255 / 100` and
//! `a + 128`, `b + 128` (sRGB primaries, D65 white); HSV stores hue in
//! half-degrees (0..180) and saturation/value in 0..255.

use palette::white_point::D65;
use palette::{Hsv, IntoColor, Lab, LinSrgb, Srgb};

use crate::video::types::Frame;

type LabD65 = Lab<D65, f32>;

/// Three same-sized 8-bit channel planes of one frame in some color space
///
/// Only ever lives for the duration of a single processing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlanes {
    pub width: u32,
    pub height: u32,
    pub channels: [Vec<u8>; 3],
}

impl ChannelPlanes {
    fn with_capacity(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            channels: [
                Vec::with_capacity(len),
                Vec::with_capacity(len),
                Vec::with_capacity(len),
            ],
        }
    }

    fn push(&mut self, sample: [u8; 3]) {
        for (channel, value) in self.channels.iter_mut().zip(sample) {
            channel.push(value);
        }
    }

    fn sample(&self, index: usize) -> [u8; 3] {
        [
            self.channels[0][index],
            self.channels[1][index],
            self.channels[2][index],
        ]
    }

    /// Re-interleave the planes into a frame, mapping every sample with `f`
    fn to_frame<F>(&self, f: F) -> Frame
    where
        F: Fn([u8; 3]) -> [u8; 3],
    {
        let mut data = Vec::with_capacity(self.channels[0].len() * 3);
        for index in 0..self.channels[0].len() {
            data.extend_from_slice(&f(self.sample(index)));
        }
        Frame::new(
            image::RgbImage::from_raw(self.width, self.height, data)
                .unwrap_or_else(|| image::RgbImage::new(self.width, self.height)),
        )
    }
}

/// Round to nearest and saturate into the u8 range
#[inline]
pub(crate) fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn srgb_from_u8(rgb: [u8; 3]) -> Srgb<f32> {
    Srgb::new(rgb[0], rgb[1], rgb[2]).into_format()
}

#[inline]
fn srgb_to_u8(srgb: Srgb<f32>) -> [u8; 3] {
    [
        saturate_u8(srgb.red * 255.0),
        saturate_u8(srgb.green * 255.0),
        saturate_u8(srgb.blue * 255.0),
    ]
}

/// Convert one RGB sample to 8-bit Lab
pub fn rgb_to_lab_pixel(rgb: [u8; 3]) -> [u8; 3] {
    // sRGB is D65-based, so LinSrgb -> Lab(D65) needs no adaptation
    let lin: LinSrgb<f32> = srgb_from_u8(rgb).into_linear();
    let lab: LabD65 = lin.into_color();

    [
        saturate_u8(lab.l * 255.0 / 100.0),
        saturate_u8(lab.a + 128.0),
        saturate_u8(lab.b + 128.0),
    ]
}

/// Convert one 8-bit Lab sample back to RGB
pub fn lab_to_rgb_pixel(lab: [u8; 3]) -> [u8; 3] {
    let lab = LabD65::new(
        lab[0] as f32 * 100.0 / 255.0,
        lab[1] as f32 - 128.0,
        lab[2] as f32 - 128.0,
    );
    let lin: LinSrgb<f32> = lab.into_color();
    srgb_to_u8(Srgb::from_linear(lin))
}

/// Convert one RGB sample to 8-bit HSV (hue in half-degrees)
pub fn rgb_to_hsv_pixel(rgb: [u8; 3]) -> [u8; 3] {
    let hsv: Hsv = srgb_from_u8(rgb).into_color();

    let mut h = (hsv.hue.into_positive_degrees() / 2.0).round();
    if h >= 180.0 {
        h -= 180.0;
    }

    [h as u8, saturate_u8(hsv.saturation * 255.0), saturate_u8(hsv.value * 255.0)]
}

/// Convert one 8-bit HSV sample back to RGB
pub fn hsv_to_rgb_pixel(hsv: [u8; 3]) -> [u8; 3] {
    if hsv[1] == 0 {
        return [hsv[2]; 3];
    }

    let hsv = Hsv::new_srgb(
        hsv[0] as f32 * 2.0,
        hsv[1] as f32 / 255.0,
        hsv[2] as f32 / 255.0,
    );
    srgb_to_u8(hsv.into_color())
}

fn split_frame<F>(frame: &Frame, f: F) -> ChannelPlanes
where
    F: Fn([u8; 3]) -> [u8; 3],
{
    let mut planes = ChannelPlanes::with_capacity(frame.width(), frame.height());
    for pixel in frame.as_raw().chunks_exact(3) {
        planes.push(f([pixel[0], pixel[1], pixel[2]]));
    }
    planes
}

pub fn rgb_to_lab(frame: &Frame) -> ChannelPlanes {
    split_frame(frame, rgb_to_lab_pixel)
}

pub fn lab_to_rgb(planes: &ChannelPlanes) -> Frame {
    planes.to_frame(lab_to_rgb_pixel)
}

pub fn rgb_to_hsv(frame: &Frame) -> ChannelPlanes {
    split_frame(frame, rgb_to_hsv_pixel)
}

pub fn hsv_to_rgb(planes: &ChannelPlanes) -> Frame {
    planes.to_frame(hsv_to_rgb_pixel)
}

/// Multiply the saturation plane of an HSV view by `scale`
///
/// Results are truncated toward zero and clamped to 0..=255, so every output
/// value is at most `scale` times its input.
pub fn scale_saturation(hsv: &mut ChannelPlanes, scale: f32) {
    for s in hsv.channels[1].iter_mut() {
        *s = (*s as f32 * scale).clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_of_black_and_white() {
        assert_eq!(rgb_to_lab_pixel([0, 0, 0]), [0, 128, 128]);
        assert_eq!(rgb_to_lab_pixel([255, 255, 255]), [255, 128, 128]);
    }

    #[test]
    fn test_lab_of_pure_red() {
        // L* ~= 53.2, a* ~= 80.1, b* ~= 67.2
        let [l, a, b] = rgb_to_lab_pixel([255, 0, 0]);
        assert!((l as i32 - 136).abs() <= 1, "L = {}", l);
        assert!((a as i32 - 208).abs() <= 1, "a = {}", a);
        assert!((b as i32 - 195).abs() <= 1, "b = {}", b);
    }

    #[test]
    fn test_lab_roundtrip_is_close() {
        for rgb in [[12, 200, 90], [255, 128, 0], [40, 40, 40], [0, 0, 255], [250, 240, 230]] {
            let back = lab_to_rgb_pixel(rgb_to_lab_pixel(rgb));
            for c in 0..3 {
                assert!(
                    (back[c] as i32 - rgb[c] as i32).abs() <= 3,
                    "{:?} -> {:?}",
                    rgb,
                    back
                );
            }
        }
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(rgb_to_hsv_pixel([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv_pixel([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv_pixel([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv_pixel([90, 90, 90]), [0, 0, 90]);

        assert_eq!(hsv_to_rgb_pixel([0, 255, 255]), [255, 0, 0]);
        assert_eq!(hsv_to_rgb_pixel([60, 255, 255]), [0, 255, 0]);
        assert_eq!(hsv_to_rgb_pixel([120, 255, 255]), [0, 0, 255]);
    }

    #[test]
    fn test_zero_saturation_is_grey() {
        for v in [0u8, 17, 128, 255] {
            assert_eq!(hsv_to_rgb_pixel([77, 0, v]), [v, v, v]);
        }
    }

    #[test]
    fn test_scale_saturation_never_exceeds_scaled_input() {
        let frame = Frame::from_fn(16, 16, |x, y| [(x * 16) as u8, (y * 16) as u8, 200]);
        let mut hsv = rgb_to_hsv(&frame);
        let before = hsv.channels[1].clone();

        scale_saturation(&mut hsv, 0.8);

        for (after, before) in hsv.channels[1].iter().zip(before) {
            assert!(*after as f32 <= before as f32 * 0.8 + 1e-3);
        }
    }

    #[test]
    fn test_planes_roundtrip_through_frame() {
        let frame = Frame::from_fn(5, 3, |x, y| [(x * 40) as u8, (y * 80) as u8, 33]);
        let hsv = rgb_to_hsv(&frame);
        assert_eq!(hsv.width, 5);
        assert_eq!(hsv.channels[0].len(), 15);

        let back = hsv_to_rgb(&hsv);
        assert_eq!(back.width(), 5);
        assert_eq!(back.height(), 3);
    }
}
