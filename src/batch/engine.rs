use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::{
    batch::discovery::{is_previous_output, OutputPaths},
    colorize::Colorizer,
    config::Config,
    error::{ColorizerError, Result},
    postprocess::{PostProcessSummary, TemporalBlendPipeline},
    progress::{CancelToken, NullProgress, ProgressSink},
};

/// A video that went all the way through
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedVideo {
    pub input: PathBuf,
    /// `None` when colorization was skipped
    pub color_output: Option<PathBuf>,
    pub final_output: PathBuf,
    pub frames_written: u64,
}

/// A video that was left alone, with the reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedVideo {
    pub input: PathBuf,
    pub reason: String,
}

/// A video whose processing failed, with the error message
#[derive(Debug, Clone, PartialEq)]
pub struct FailedVideo {
    pub input: PathBuf,
    pub error: String,
}

/// Outcome of a whole batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: Vec<ProcessedVideo>,
    pub skipped: Vec<SkippedVideo>,
    pub failed: Vec<FailedVideo>,
    /// The batch stopped early on request
    pub cancelled: bool,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    pub fn log_summary(&self) {
        info!("📊 Batch summary:");
        info!("   Processed: {}", self.processed.len());
        info!("   Skipped:   {}", self.skipped.len());
        info!("   Failed:    {}", self.failed.len());
        for failed in &self.failed {
            warn!("   ❌ {:?}: {}", failed.input, failed.error);
        }
        if self.cancelled {
            warn!("   Batch was cancelled before finishing");
        }
    }
}

/// Drives colorization and post-processing over a list of videos
///
/// Videos are handled one at a time. For each input:
/// 1. Prior outputs (`*_color.mp4`, `*_final.mp4`) are skipped
/// 2. Inputs whose outputs already exist are skipped
/// 3. The colorizer result is moved to `<out>/<stem>_color.mp4`
/// 4. The temporal pass writes `<out>/<stem>_final.mp4`
///
/// A failing video is recorded and the batch moves on.
pub struct BatchEngine {
    config: Config,
    colorizer: Box<dyn Colorizer>,
    pipeline: Arc<TemporalBlendPipeline>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
    skip_colorize: bool,
}

impl BatchEngine {
    pub fn new(config: Config, colorizer: Box<dyn Colorizer>) -> Result<Self> {
        config.validate()?;
        let pipeline =
            TemporalBlendPipeline::new(&config.postprocess, config.output.encoder.clone())?;
        Ok(Self {
            config,
            colorizer,
            pipeline: Arc::new(pipeline),
            progress: Arc::new(NullProgress),
            cancel: CancelToken::new(),
            skip_colorize: false,
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Treat inputs as already colorized and only post-process them
    pub fn skip_colorize(mut self, skip: bool) -> Self {
        self.skip_colorize = skip;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output.directory
    }

    /// Process every input in order
    pub async fn run(&self, inputs: &[PathBuf]) -> Result<BatchReport> {
        let started = Instant::now();
        let output_dir = self.output_dir().to_path_buf();
        tokio::fs::create_dir_all(&output_dir).await?;

        info!("🎬 Starting batch of {} video(s)", inputs.len());
        info!("   Output: {:?}", output_dir);
        if self.skip_colorize {
            info!("   Colorization: skipped");
        } else {
            info!(
                "   Colorizer: {} (render factor {})",
                self.colorizer.name(),
                self.config.colorize.render_factor
            );
        }

        let mut report = BatchReport::default();

        for (index, input) in inputs.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if let Some(reason) = self.skip_reason(input, &output_dir) {
                info!("⏭️  Skipping {:?}: {}", input, reason);
                report.skipped.push(SkippedVideo {
                    input: input.clone(),
                    reason,
                });
                continue;
            }

            info!("▶️  [{}/{}] {:?}", index + 1, inputs.len(), input);

            match self.process_one(input, &output_dir).await {
                Ok(done) => {
                    info!("   ✅ Final video: {:?}", done.final_output);
                    report.processed.push(done);
                }
                Err(ColorizerError::Cancelled) => {
                    warn!("Cancelled while processing {:?}", input);
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    error!("Failed to process {:?}: {}", input, e);
                    report.failed.push(FailedVideo {
                        input: input.clone(),
                        error: e.user_message(),
                    });
                }
            }
        }

        info!("🎉 Batch finished in {:.1}s", started.elapsed().as_secs_f64());
        Ok(report)
    }

    fn skip_reason(&self, input: &Path, output_dir: &Path) -> Option<String> {
        if is_previous_output(input) {
            return Some("appears to be a colorized output".to_string());
        }

        let outputs = OutputPaths::for_input(input, output_dir);
        if self.skip_colorize {
            if outputs.final_video.is_file() {
                return Some(format!("{:?} already exists", outputs.final_video));
            }
        } else if outputs.all_exist() {
            return Some(format!(
                "{:?} and {:?} already exist",
                outputs.color, outputs.final_video
            ));
        }

        None
    }

    async fn process_one(&self, input: &Path, output_dir: &Path) -> Result<ProcessedVideo> {
        let outputs = OutputPaths::for_input(input, output_dir);

        let (colorized, color_output) = if self.skip_colorize {
            (input.to_path_buf(), None)
        } else {
            let result = self
                .colorizer
                .colorize(input, self.config.colorize.render_factor, self.progress.as_ref())
                .await?;
            let moved = result.persist(&outputs.color).await?;
            info!("   Colorized video saved at {:?}", moved);
            (moved.clone(), Some(moved))
        };

        if self.cancel.is_cancelled() {
            return Err(ColorizerError::Cancelled);
        }

        let summary = self.post_process(colorized, outputs.final_video.clone()).await?;

        Ok(ProcessedVideo {
            input: input.to_path_buf(),
            color_output,
            final_output: outputs.final_video,
            frames_written: summary.frames_written,
        })
    }

    /// Run the frame loop on the blocking pool
    async fn post_process(&self, input: PathBuf, output: PathBuf) -> Result<PostProcessSummary> {
        let pipeline = Arc::clone(&self.pipeline);
        let progress = Arc::clone(&self.progress);
        let cancel = self.cancel.clone();

        tokio::task::spawn_blocking(move || {
            pipeline.run(&input, &output, progress.as_ref(), &cancel)
        })
        .await
        .map_err(|e| ColorizerError::generic(format!("post-processing task failed: {}", e)))?
    }
}
