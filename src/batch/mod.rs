//! # Batch Processing
//!
//! Input discovery and the engine that walks a list of black-and-white
//! videos through colorization and temporal post-processing.
//!
//! ```rust,no_run
//! use video_colorizer::batch::{discover_inputs, BatchEngine, InputSpec};
//! use video_colorizer::colorize::CommandColorizer;
//! use video_colorizer::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> video_colorizer::Result<()> {
//! let config = Config::default();
//! let colorizer = CommandColorizer::from_config(&config.colorize);
//! let engine = BatchEngine::new(config, Box::new(colorizer))?;
//!
//! let inputs = discover_inputs(&InputSpec::Directory {
//!     path: "archive/".into(),
//!     recursive: false,
//! })?;
//! let report = engine.run(&inputs).await?;
//! report.log_summary();
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod engine;

pub use discovery::{discover_inputs, is_previous_output, InputSpec, OutputPaths};
pub use engine::{BatchEngine, BatchReport, FailedVideo, ProcessedVideo, SkippedVideo};
