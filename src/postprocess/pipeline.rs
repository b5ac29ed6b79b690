use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{
    color::FrameHistogramMatcher,
    config::{check_unit_interval, PostProcessConfig},
    error::{ColorizerError, Result, VideoError},
    postprocess::blend::blend_frames,
    progress::{CancelToken, Phase, ProgressEvent, ProgressSink},
    video::{EncoderParams, FrameReader, FrameSink, FrameSource, FrameWriter, VideoInfo},
};

/// Outcome of one post-processing run
#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub info: VideoInfo,
}

/// Temporal contrast/saturation stabilization of a colorized video
///
/// The pipeline walks the input once:
/// 1. Frame 0 only seeds `previous` and is never written
/// 2. Every later frame is normalized by the [`FrameHistogramMatcher`]
/// 3. The normalized frame is blended back over the raw frame
/// 4. `previous` advances to the raw frame, not the blended one
///
/// An N-frame input therefore yields N-1 output frames, output frame `i`
/// corresponding to input frame `i + 1`.
#[derive(Debug, Clone)]
pub struct TemporalBlendPipeline {
    matcher: FrameHistogramMatcher,
    blend_factor: f32,
    keep_partial_output: bool,
    encoder: EncoderParams,
}

impl TemporalBlendPipeline {
    pub fn new(config: &PostProcessConfig, encoder: EncoderParams) -> Result<Self> {
        check_unit_interval("postprocess.blend_factor", config.blend_factor)?;
        Ok(Self {
            matcher: FrameHistogramMatcher::from_config(config)?,
            blend_factor: config.blend_factor,
            keep_partial_output: config.keep_partial_output,
            encoder,
        })
    }

    pub fn matcher(&self) -> &FrameHistogramMatcher {
        &self.matcher
    }

    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    /// Post-process `input` into `output` through FFmpeg
    ///
    /// The output keeps the input's dimensions and exact frame rate. On
    /// failure a partially written output is removed unless configured
    /// otherwise.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PostProcessSummary> {
        let input = input.as_ref();
        let output = output.as_ref();
        let started = Instant::now();

        info!("🎨 Post-processing {:?} -> {:?}", input, output);

        let mut reader = FrameReader::open(input)?;
        let result = FrameWriter::create(output, reader.info(), &self.encoder)
            .and_then(|mut writer| self.process(&mut reader, &mut writer, progress, cancel));

        let summary = self.settle_output(result, output)?;
        info!(
            "   ✅ Wrote {} frames in {:.1}s",
            summary.frames_written,
            started.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    /// Pass `result` through, deleting `output` first if it failed
    fn settle_output<T>(&self, result: Result<T>, output: &Path) -> Result<T> {
        if result.is_err() && !self.keep_partial_output && output.exists() {
            debug!("Removing partial output {:?}", output);
            if let Err(remove_err) = std::fs::remove_file(output) {
                warn!("Could not remove partial output {:?}: {}", output, remove_err);
            }
        }
        result
    }

    /// Run the frame loop between any source and sink
    pub fn process<S, K>(
        &self,
        source: &mut S,
        sink: &mut K,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PostProcessSummary>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let info = source.info().clone();

        let mut previous = source.next_frame()?.ok_or_else(|| {
            ColorizerError::from(VideoError::OpenFailed {
                path: source.name().to_string(),
                reason: "video contains no frames".to_string(),
            })
        })?;

        // Written frames exclude the seed frame
        let total = info.estimated_frame_count().unwrap_or(0).saturating_sub(1);
        let mut frames_read = 1u64;
        let mut frames_written = 0u64;

        debug!(
            "Blending with factor {:.2} (saturation {:.2}, clip limit {:.2})",
            self.blend_factor,
            self.matcher.saturation_scale(),
            self.matcher.clahe().clip_limit()
        );

        loop {
            if cancel.is_cancelled() {
                return Err(ColorizerError::Cancelled);
            }

            let Some(frame) = source.next_frame()? else {
                break;
            };
            frames_read += 1;

            let matched = self.matcher.match_frame(&frame, &previous)?;
            let blended = blend_frames(&frame, &matched, self.blend_factor)?;
            sink.write_frame(&blended)?;
            frames_written += 1;

            progress.report(
                Phase::PostProcess,
                ProgressEvent::new(frames_written, total.max(frames_written)),
            );

            previous = frame;
        }

        sink.finish()?;

        if frames_written == 0 {
            warn!("{} has a single frame; output is empty", source.name());
        }

        Ok(PostProcessSummary {
            frames_read,
            frames_written,
            info,
        })
    }
}
