//! # Video I/O Module
//!
//! Probing, sequential decoding and encoding of video files through external
//! `ffprobe`/`ffmpeg` processes, plus the frame types shared by the rest of
//! the crate.

pub mod types;
pub mod stream;
pub mod probe;

mod decoder;
mod encoder;

pub use types::{Frame, FrameRate, VideoInfo};
pub use stream::{FrameSink, FrameSource, MemorySink, MemorySource};
pub use probe::probe_video;
pub use decoder::FrameReader;
pub use encoder::{EncoderParams, FrameWriter};

use crate::subprocess::tool_available;

/// Whether both `ffmpeg` and `ffprobe` can be executed
pub fn check_ffmpeg_available() -> bool {
    tool_available("ffmpeg") && tool_available("ffprobe")
}
