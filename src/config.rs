use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    color::DEFAULT_TILE_GRID,
    error::{ConfigError, Result},
    video::EncoderParams,
};

/// Saturation multiplier applied after equalization (0.0 = grey, 1.0 = unchanged)
pub const DEFAULT_SATURATION_SCALE: f32 = 0.8;

/// CLAHE clip limit; values below 1.0 keep noise amplification low
pub const DEFAULT_CLAHE_CLIP_LIMIT: f32 = 0.5;

/// Weight of the equalized frame in the final blend
pub const DEFAULT_BLEND_FACTOR: f32 = 0.6;

/// Render factor handed to the colorization model
pub const DEFAULT_RENDER_FACTOR: u32 = 21;

pub const DEFAULT_OUTPUT_DIR: &str = "colorized_videos";

/// Main configuration for the video colorizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Temporal post-processing settings
    pub postprocess: PostProcessConfig,

    /// Output location and encoding
    pub output: OutputConfig,

    /// Upstream colorization worker
    pub colorize: ColorizeConfig,

    /// Thread pool sizing
    pub processing: ProcessingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.postprocess.validate()?;
        self.output.validate()?;
        self.colorize.validate()?;
        self.processing.validate()?;
        Ok(())
    }
}

/// Fail unless `value` lies in `[0, 1]`
pub fn check_unit_interval(key: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string()
        }.into());
    }
    Ok(())
}

/// Fail unless `value` lies in `(0, 4]`
pub fn check_clip_limit(key: &str, value: f32) -> Result<()> {
    if !(value > 0.0 && value <= 4.0) {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string()
        }.into());
    }
    Ok(())
}

/// Reject a zero render factor and warn about unusual ones
pub fn check_render_factor(render_factor: u32) -> Result<()> {
    if render_factor == 0 {
        return Err(ConfigError::InvalidValue {
            key: "colorize.render_factor".to_string(),
            value: render_factor.to_string()
        }.into());
    }
    if !(10..=40).contains(&render_factor) {
        warn!("Render factor {} is outside the usual 10-40 range", render_factor);
    }
    Ok(())
}

/// Temporal post-processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessConfig {
    /// Saturation scale (0.0-1.0)
    pub saturation_scale: f32,

    /// CLAHE clip limit (0.0 exclusive - 4.0)
    pub clahe_clip_limit: f32,

    /// Blend between the original frame (0.0) and the equalized frame (1.0)
    pub blend_factor: f32,

    /// CLAHE tile grid (columns, rows)
    pub tile_grid: (u32, u32),

    /// Keep a partially written output file when a run fails
    pub keep_partial_output: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            saturation_scale: DEFAULT_SATURATION_SCALE,
            clahe_clip_limit: DEFAULT_CLAHE_CLIP_LIMIT,
            blend_factor: DEFAULT_BLEND_FACTOR,
            tile_grid: DEFAULT_TILE_GRID,
            keep_partial_output: false,
        }
    }
}

impl PostProcessConfig {
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("postprocess.saturation_scale", self.saturation_scale)?;
        check_clip_limit("postprocess.clahe_clip_limit", self.clahe_clip_limit)?;
        check_unit_interval("postprocess.blend_factor", self.blend_factor)?;

        if self.tile_grid.0 == 0 || self.tile_grid.1 == 0 {
            return Err(ConfigError::InvalidValue {
                key: "postprocess.tile_grid".to_string(),
                value: format!("{}x{}", self.tile_grid.0, self.tile_grid.1)
            }.into());
        }

        Ok(())
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<name>_color.mp4` and `<name>_final.mp4`
    pub directory: PathBuf,

    /// Encoder settings for post-processed videos
    pub encoder: EncoderParams,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            encoder: EncoderParams::default(),
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if self.encoder.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "output.encoder.codec".to_string(),
                value: self.encoder.codec.clone()
            }.into());
        }

        if let Some(quality) = self.encoder.quality {
            if quality > 100 {
                return Err(ConfigError::InvalidValue {
                    key: "output.encoder.quality".to_string(),
                    value: quality.to_string()
                }.into());
            }
        }

        Ok(())
    }
}

/// Colorization worker configuration
///
/// The worker is run with its working directory set to a per-video scratch
/// directory and must leave its result at `<result_dir>/<stem>.mp4` there.
/// `args` may contain `{input}`, `{render_factor}`, `{stem}` and `{workdir}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorizeConfig {
    /// Model quality/detail knob (typically 10-40)
    pub render_factor: u32,

    /// Worker executable
    pub program: String,

    /// Worker arguments
    pub args: Vec<String>,

    /// Result location relative to the working directory
    pub result_dir: PathBuf,
}

impl Default for ColorizeConfig {
    fn default() -> Self {
        Self {
            render_factor: DEFAULT_RENDER_FACTOR,
            program: "deoldify-worker".to_string(),
            args: vec![
                "--input".to_string(),
                "{input}".to_string(),
                "--render-factor".to_string(),
                "{render_factor}".to_string(),
            ],
            result_dir: PathBuf::from("video/result"),
        }
    }
}

impl ColorizeConfig {
    fn validate(&self) -> Result<()> {
        check_render_factor(self.render_factor)?;

        if self.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "colorize.program".to_string(),
                value: self.program.clone()
            }.into());
        }

        Ok(())
    }
}

/// Thread pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Worker threads for per-frame data parallelism
    pub threads: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
        }
    }
}

impl ProcessingConfig {
    fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.threads".to_string(),
                value: self.threads.to_string()
            }.into());
        }
        Ok(())
    }
}
