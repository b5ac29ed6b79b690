//! # Temporal Post-Processing
//!
//! Stabilizes the contrast and saturation of a colorized video frame by frame:
//! each frame is normalized with the [`FrameHistogramMatcher`](crate::color::FrameHistogramMatcher)
//! and blended back over itself.
//!
//! ```rust,no_run
//! use video_colorizer::config::PostProcessConfig;
//! use video_colorizer::postprocess::TemporalBlendPipeline;
//! use video_colorizer::progress::{CancelToken, TracingProgress};
//! use video_colorizer::video::EncoderParams;
//!
//! # fn main() -> video_colorizer::Result<()> {
//! let pipeline =
//!     TemporalBlendPipeline::new(&PostProcessConfig::default(), EncoderParams::default())?;
//! let summary = pipeline.run(
//!     "clip_color.mp4",
//!     "clip_final.mp4",
//!     &TracingProgress::new(),
//!     &CancelToken::new(),
//! )?;
//! println!("{} frames written", summary.frames_written);
//! # Ok(())
//! # }
//! ```

pub mod blend;
pub mod pipeline;

pub use blend::blend_frames;
pub use pipeline::{PostProcessSummary, TemporalBlendPipeline};
