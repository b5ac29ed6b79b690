// Writes a synthetic grayscale clip for end-to-end runs without real footage

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::info;

use video_colorizer::video::{
    check_ffmpeg_available, EncoderParams, Frame, FrameRate, FrameSink, FrameWriter, VideoInfo,
};

#[derive(Parser)]
#[command(name = "synth-clip", about = "Write a moving-gradient test clip with seeded film noise")]
struct Args {
    /// Output video path
    #[arg(short, long, default_value = "synthetic.mp4")]
    output: PathBuf,

    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Number of frames to write
    #[arg(short, long, default_value_t = 48)]
    frames: u32,

    /// Frame rate, "num/den" or an integer
    #[arg(long, default_value = "24")]
    fps: FrameRate,

    /// Noise amplitude (0-255)
    #[arg(long, default_value_t = 12)]
    noise: u8,

    /// RNG seed
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// FFmpeg encoder
    #[arg(long, default_value = "libx264")]
    codec: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if !check_ffmpeg_available() {
        bail!("ffmpeg/ffprobe not found on PATH");
    }
    if args.width == 0 || args.height == 0 || !args.fps.is_valid() {
        bail!("width, height and fps must be positive");
    }

    let info = VideoInfo {
        width: args.width,
        height: args.height,
        frame_rate: args.fps,
        codec: args.codec.clone(),
        frame_count: Some(args.frames as u64),
        duration: None,
    };
    let params = EncoderParams {
        codec: args.codec.clone(),
        ..EncoderParams::default()
    };

    info!(
        "🎞️  Writing {} frames of {}x{} @ {} to {:?}",
        args.frames, args.width, args.height, args.fps, args.output
    );

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut writer = FrameWriter::create(&args.output, &info, &params)?;
    let noise = args.noise as i16;
    let span = (args.width + args.height).max(1);

    for index in 0..args.frames {
        let shift = index * 4;
        let frame = Frame::from_fn(args.width, args.height, |x, y| {
            let base = ((x + y + shift) % span) * 255 / span;
            let grain = if noise > 0 { rng.gen_range(-noise..=noise) } else { 0 };
            let v = (base as i16 + grain).clamp(0, 255) as u8;
            [v, v, v]
        });
        writer.write_frame(&frame)?;
    }
    writer.finish()?;

    info!("✅ Done");
    Ok(())
}
