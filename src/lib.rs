//! # Video Colorizer
//!
//! Batch-colorize black-and-white videos and stabilize the colorized result
//! with a temporal contrast/saturation pass.
//!
//! The colorization model runs as an external worker; this library drives it,
//! moves its results into place and post-processes every video frame by frame:
//! CLAHE on each Lab channel, a saturation cap in HSV, then a blend with the
//! raw frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use video_colorizer::{
//!     batch::{discover_inputs, InputSpec},
//!     colorize::CommandColorizer,
//!     config::Config,
//!     BatchEngine,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let colorizer = CommandColorizer::from_config(&config.colorize);
//! let engine = BatchEngine::new(config, Box::new(colorizer))?;
//!
//! let inputs = discover_inputs(&InputSpec::Files(vec!["old_reel.mp4".into()]))?;
//! let report = engine.run(&inputs).await?;
//! report.log_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Frames, probing, FFmpeg-backed decoding and encoding
//! - [`color`] - Lab/HSV conversion, CLAHE and the per-frame matcher
//! - [`postprocess`] - The temporal blend pipeline
//! - [`colorize`] - The upstream colorization collaborator
//! - [`batch`] - Input discovery and the batch engine
//! - [`config`] - Configuration management
//!
//! ## Custom Colorizers
//!
//! Anything that can turn a path into a colorized video can stand in for the
//! worker process by implementing [`Colorizer`](colorize::Colorizer):
//!
//! ```rust,no_run
//! use std::path::Path;
//! use video_colorizer::colorize::{ColorizeFuture, ColorizedVideo, Colorizer};
//! use video_colorizer::progress::ProgressSink;
//!
//! struct AlreadyColor;
//!
//! impl Colorizer for AlreadyColor {
//!     fn name(&self) -> &str {
//!         "already-color"
//!     }
//!
//!     fn colorize<'a>(
//!         &'a self,
//!         input: &'a Path,
//!         _render_factor: u32,
//!         _progress: &'a dyn ProgressSink,
//!     ) -> ColorizeFuture<'a> {
//!         Box::pin(async move {
//!             let copy = input.with_extension("copy.mp4");
//!             tokio::fs::copy(input, &copy).await?;
//!             Ok(ColorizedVideo::standalone(copy))
//!         })
//!     }
//! }
//! ```

pub mod batch;
pub mod color;
pub mod colorize;
pub mod config;
pub mod error;
pub mod postprocess;
pub mod progress;
pub mod subprocess;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    batch::{BatchEngine, BatchReport},
    color::{match_histograms, FrameHistogramMatcher},
    config::Config,
    error::{ColorizerError, Result},
    postprocess::TemporalBlendPipeline,
};
