//! # Color Processing
//!
//! Per-frame contrast and saturation normalization used by the temporal
//! post-processing pass.
//!
//! - [`space`]: 8-bit Lab and HSV planar views of RGB frames
//! - [`clahe`]: contrast-limited adaptive histogram equalization
//! - [`matcher`]: the per-frame pipeline combining both
//!
//! ## Usage
//!
//! ```rust,no_run
//! use video_colorizer::color::FrameHistogramMatcher;
//! use video_colorizer::video::Frame;
//!
//! # fn main() -> video_colorizer::Result<()> {
//! let frame = Frame::new_filled(320, 240, [40, 80, 120]);
//! let matcher = FrameHistogramMatcher::new(0.8, 0.5, (8, 8))?;
//! let normalized = matcher.match_frame(&frame, &frame)?;
//! # Ok(())
//! # }
//! ```

pub mod space;
pub mod clahe;
pub mod matcher;

pub use clahe::{Clahe, DEFAULT_TILE_GRID};
pub use matcher::{match_histograms, FrameHistogramMatcher};
pub use space::ChannelPlanes;
