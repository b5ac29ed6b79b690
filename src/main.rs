use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{ArgGroup, Parser};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_colorizer::{
    batch::{discover_inputs, BatchEngine, InputSpec},
    colorize::CommandColorizer,
    config::Config,
    error::VideoError,
    progress::{CancelToken, JsonProgressPrinter, ProgressSink, TracingProgress},
    video::check_ffmpeg_available,
};

#[derive(Parser)]
#[command(
    name = "video-colorizer",
    version,
    about = "Colorize black-and-white videos and stabilize the result",
    long_about = "Video-Colorizer runs a colorization worker over every input video, then smooths the colorized frames with per-frame CLAHE, a saturation cap and a blend with the raw frame."
)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "input_dir"])))]
struct Cli {
    /// Input video files
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Directory containing input videos (*.mp4)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Scan the input directory recursively
    #[arg(short, long)]
    recursive: bool,

    /// Directory for *_color.mp4 and *_final.mp4 outputs
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Colorization render factor (usually 10-40)
    #[arg(long)]
    render_factor: Option<u32>,

    /// Saturation scale (0.0-1.0)
    #[arg(long)]
    saturation_scale: Option<f32>,

    /// CLAHE clip limit (0.0-4.0)
    #[arg(long)]
    clahe_clip_limit: Option<f32>,

    /// Blend factor between original and equalized frames (0.0-1.0)
    #[arg(long)]
    blend_factor: Option<f32>,

    /// Treat inputs as already colorized and only post-process them
    #[arg(long)]
    skip_colorize: bool,

    /// FFmpeg encoder for the final videos
    #[arg(long)]
    codec: Option<String>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print progress as JSON lines on stdout
    #[arg(long)]
    json_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command line values win over the configuration file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }
        if let Some(render_factor) = self.render_factor {
            config.colorize.render_factor = render_factor;
        }
        if let Some(scale) = self.saturation_scale {
            config.postprocess.saturation_scale = scale;
        }
        if let Some(clip) = self.clahe_clip_limit {
            config.postprocess.clahe_clip_limit = clip;
        }
        if let Some(blend) = self.blend_factor {
            config.postprocess.blend_factor = blend;
        }
        if let Some(codec) = &self.codec {
            config.output.encoder.codec = codec.clone();
        }
    }

    fn input_spec(&self) -> InputSpec {
        match &self.input_dir {
            Some(dir) => InputSpec::Directory {
                path: dir.clone(),
                recursive: self.recursive,
            },
            None => InputSpec::Files(self.input.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON progress owns stdout
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Video-Colorizer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path).map_err(|e| anyhow::anyhow!(e.user_message()))?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    cli.apply_overrides(&mut config);
    config.validate().map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if !check_ffmpeg_available() {
        bail!(VideoError::FfmpegMissing);
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.processing.threads)
        .build_global()
        .ok();

    let inputs = discover_inputs(&cli.input_spec())?;
    if inputs.is_empty() {
        warn!("No input videos provided or found");
        return Ok(());
    }
    info!("Found {} video(s) to process", inputs.len());

    let progress: Arc<dyn ProgressSink> = if cli.json_progress {
        Arc::new(JsonProgressPrinter::stdout())
    } else {
        Arc::new(TracingProgress::new())
    };

    let cancel = CancelToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current frame");
            ctrl_c_cancel.cancel();
        }
    });

    let colorizer = CommandColorizer::from_config(&config.colorize);
    let engine = BatchEngine::new(config, Box::new(colorizer))?
        .with_progress(progress)
        .with_cancel(cancel)
        .skip_colorize(cli.skip_colorize);

    let report = engine.run(&inputs).await?;
    report.log_summary();

    if report.cancelled {
        bail!("Batch cancelled");
    }
    if !report.failed.is_empty() {
        bail!("{} of {} video(s) failed", report.failed.len(), inputs.len());
    }

    info!("All done! Outputs are in {:?}", engine.output_dir());
    Ok(())
}
