use std::fmt;
use std::str::FromStr;

use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Represents a single video frame
///
/// A thin wrapper around an RGB image buffer. Samples are stored in
/// R, G, B order, 8 bits per channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        let buffer = ImageBuffer::new(width, height);
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    /// Create a frame by evaluating `f` at every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 3],
    {
        let buffer = ImageBuffer::from_fn(width, height, |x, y| Rgb(f(x, y)));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.buffer.width() as usize * self.buffer.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Raw interleaved RGB samples, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Mutable raw interleaved RGB samples, row-major
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        let actual = data.len();
        ImageBuffer::from_raw(width, height, data)
            .map(|buffer| Self { buffer })
            .ok_or_else(|| FrameError::BufferSize { expected, actual }.into())
    }

    /// Fail with `FrameError::Empty` if the frame has no pixels
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(FrameError::Empty {
                width: self.width(),
                height: self.height(),
            }
            .into());
        }
        Ok(())
    }

    /// Fail with `FrameError::DimensionMismatch` unless `other` has the same size
    pub fn ensure_same_size(&self, other: &Frame) -> Result<()> {
        if self.width() != other.width() || self.height() != other.height() {
            return Err(FrameError::DimensionMismatch {
                expected_width: self.width(),
                expected_height: self.height(),
                actual_width: other.width(),
                actual_height: other.height(),
            }
            .into());
        }
        Ok(())
    }
}

/// Exact rational frame rate, e.g. `30000/1001`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_30: Self = Self::new(30, 1);

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    pub fn to_fps_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    pub fn is_valid(&self) -> bool {
        self.numerator > 0 && self.denominator > 0
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for FrameRate {
    type Err = String;

    /// Parses ffprobe's `"num/den"` notation, or a plain integer rate
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((num, den)) => (num, den),
            None => (s, "1"),
        };
        let numerator = num.parse::<u32>().map_err(|e| format!("bad frame rate '{}': {}", s, e))?;
        let denominator = den.parse::<u32>().map_err(|e| format!("bad frame rate '{}': {}", s, e))?;
        Ok(Self::new(numerator, denominator))
    }
}

/// Format metadata for a video stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,

    /// Codec name as reported by the container (e.g. "h264")
    pub codec: String,

    /// Number of frames, if the container records it
    pub frame_count: Option<u64>,

    /// Duration in seconds, if known
    pub duration: Option<f64>,
}

impl VideoInfo {
    /// Size in bytes of one raw rgb24 frame
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Best available frame count: recorded count, else duration x rate
    pub fn estimated_frame_count(&self) -> Option<u64> {
        self.frame_count.or_else(|| {
            self.duration
                .map(|d| (d * self.frame_rate.to_fps_f64()).round() as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_from_rgb_bytes_checks_size() {
        assert!(Frame::from_rgb_bytes(2, 2, vec![0; 12]).is_ok());
        let err = Frame::from_rgb_bytes(2, 2, vec![0; 11]).unwrap_err();
        assert!(err.to_string().contains("11"));
    }

    #[test]
    fn test_empty_frame_rejected() {
        assert!(Frame::new_black(0, 10).ensure_not_empty().is_err());
        assert!(Frame::new_black(1, 1).ensure_not_empty().is_ok());
    }

    #[test]
    fn test_same_size_check() {
        let a = Frame::new_black(4, 4);
        let b = Frame::new_black(4, 5);
        assert!(a.ensure_same_size(&a.clone()).is_ok());
        assert!(a.ensure_same_size(&b).is_err());
    }

    #[test]
    fn test_frame_rate_parsing() {
        let ntsc: FrameRate = "30000/1001".parse().unwrap();
        assert_eq!(ntsc, FrameRate::new(30000, 1001));
        assert!((ntsc.to_fps_f64() - 29.97).abs() < 0.01);

        let plain: FrameRate = "25".parse().unwrap();
        assert_eq!(plain, FrameRate::FPS_25);
        assert_eq!(plain.to_string(), "25/1");

        assert!("abc".parse::<FrameRate>().is_err());
        assert!(!FrameRate::new(0, 0).is_valid());
    }

    #[test]
    fn test_estimated_frame_count() {
        let mut info = VideoInfo {
            width: 4,
            height: 2,
            frame_rate: FrameRate::FPS_30,
            codec: "h264".into(),
            frame_count: None,
            duration: Some(2.0),
        };
        assert_eq!(info.frame_size(), 24);
        assert_eq!(info.estimated_frame_count(), Some(60));
        info.frame_count = Some(59);
        assert_eq!(info.estimated_frame_count(), Some(59));
    }
}
