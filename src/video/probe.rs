//! Stream metadata via `ffprobe`.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ColorizerError, Result, VideoError};
use crate::video::types::{FrameRate, VideoInfo};

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees, normalized to 0..360
    ///
    /// Newer ffprobe builds report a display matrix in `side_data_list`; older
    /// ones use the `rotate` tag.
    fn rotation(&self) -> i64 {
        let degrees = self
            .side_data_list
            .iter()
            .find_map(|side| side.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0.0);
        (degrees.round() as i64).rem_euclid(360)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe the first video stream of `path`
pub fn probe_video<P: AsRef<Path>>(path: P) -> Result<VideoInfo> {
    let path = path.as_ref();
    let path_str = path.display().to_string();

    if !path.is_file() {
        return Err(VideoError::OpenFailed {
            path: path_str,
            reason: "file does not exist".to_string(),
        }
        .into());
    }

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries",
            "stream=codec_name,width,height,r_frame_rate,avg_frame_rate,nb_frames,duration\
             :stream_side_data=rotation:stream_tags=rotate:format=duration",
            "-of", "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| VideoError::OpenFailed {
            path: path_str.clone(),
            reason: format!("ffprobe could not be started: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VideoError::OpenFailed {
            path: path_str,
            reason: format!("ffprobe failed: {}", stderr.trim()),
        }
        .into());
    }

    parse_probe_json(&output.stdout).map_err(|reason| {
        ColorizerError::from(VideoError::OpenFailed {
            path: path_str,
            reason,
        })
    })
}

fn parse_probe_json(json: &[u8]) -> std::result::Result<VideoInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|e| format!("invalid ffprobe output: {}", e))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let mut width = stream.width.unwrap_or(0);
    let mut height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(format!("invalid video dimensions {}x{}", width, height));
    }

    // ffmpeg auto-rotates while decoding, so frames arrive in display orientation
    let rotation = stream.rotation();
    if rotation % 180 == 90 {
        debug!("Stream is rotated by {} degrees; decoding as {}x{}", rotation, height, width);
        std::mem::swap(&mut width, &mut height);
    }

    // r_frame_rate is the container's base rate; avg_frame_rate is a fallback
    // for streams that leave it as 0/0.
    let frame_rate = [stream.r_frame_rate.as_deref(), stream.avg_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(|s| s.parse::<FrameRate>().ok())
        .find(FrameRate::is_valid)
        .ok_or_else(|| "stream has no usable frame rate".to_string())?;

    let frame_count = stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok());
    let duration = stream
        .duration
        .or_else(|| probe.format.and_then(|f| f.duration))
        .and_then(|d| d.parse::<f64>().ok());

    if frame_count.is_none() {
        warn!("Container does not record a frame count; progress totals are estimates");
    }

    let info = VideoInfo {
        width,
        height,
        frame_rate,
        codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
        frame_count,
        duration,
    };

    debug!(
        "Probed video: {}x{} @ {} fps ({}), {:?} frames",
        info.width, info.height, info.frame_rate, info.codec, info.frame_count
    );

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_json() {
        let json = br#"{
            "programs": [],
            "streams": [{
                "codec_name": "h264",
                "width": 640,
                "height": 360,
                "r_frame_rate": "30000/1001",
                "avg_frame_rate": "30000/1001",
                "nb_frames": "300",
                "duration": "10.010000"
            }],
            "format": { "duration": "10.010000" }
        }"#;

        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.width, 640);
        assert_eq!(info.height, 360);
        assert_eq!(info.frame_rate, FrameRate::new(30000, 1001));
        assert_eq!(info.codec, "h264");
        assert_eq!(info.frame_count, Some(300));
        assert_eq!(info.duration, Some(10.01));
    }

    #[test]
    fn test_parse_probe_falls_back_to_avg_rate() {
        let json = br#"{
            "streams": [{
                "codec_name": "vp9",
                "width": 320,
                "height": 240,
                "r_frame_rate": "0/0",
                "avg_frame_rate": "25/1"
            }],
            "format": { "duration": "4.0" }
        }"#;

        let info = parse_probe_json(json).unwrap();
        assert_eq!(info.frame_rate, FrameRate::FPS_25);
        assert_eq!(info.frame_count, None);
        assert_eq!(info.estimated_frame_count(), Some(100));
    }

    #[test]
    fn test_parse_probe_swaps_dimensions_for_portrait_rotation() {
        let json = br#"{
            "streams": [{
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30/1",
                "side_data_list": [{
                    "side_data_type": "Display Matrix",
                    "displaymatrix": "...",
                    "rotation": -90
                }]
            }]
        }"#;

        let info = parse_probe_json(json).unwrap();
        assert_eq!((info.width, info.height), (1080, 1920));
        assert_eq!(info.frame_size(), 1080 * 1920 * 3);
    }

    #[test]
    fn test_parse_probe_rotation_tag_and_upside_down() {
        let tagged = br#"{
            "streams": [{
                "width": 640, "height": 480, "r_frame_rate": "25/1",
                "tags": { "rotate": "270" }
            }]
        }"#;
        let info = parse_probe_json(tagged).unwrap();
        assert_eq!((info.width, info.height), (480, 640));

        let flipped = br#"{
            "streams": [{
                "width": 640, "height": 480, "r_frame_rate": "25/1",
                "side_data_list": [{ "rotation": 180 }]
            }]
        }"#;
        let info = parse_probe_json(flipped).unwrap();
        assert_eq!((info.width, info.height), (640, 480));
    }

    #[test]
    fn test_parse_probe_without_video_stream() {
        let err = parse_probe_json(br#"{"streams": []}"#).unwrap_err();
        assert!(err.contains("no video stream"));
    }

    #[test]
    fn test_probe_missing_file() {
        let err = probe_video("/definitely/not/here.mp4").unwrap_err();
        assert!(matches!(
            err,
            crate::error::ColorizerError::Video(VideoError::OpenFailed { .. })
        ));
    }
}
