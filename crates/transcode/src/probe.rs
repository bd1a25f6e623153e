use crate::{TranscodeError, Transcoder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Geometry and timing of a video's first video stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// Frame rate as ffprobe reports it, e.g. "30000/1001"
    pub frame_rate: String,
    pub codec_name: Option<String>,
    /// Frame count from the container header, when known
    pub frame_count: Option<u64>,
}

impl VideoInfo {
    /// Bytes in one rgb24 frame
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

// ffprobe JSON, only the fields we read

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

pub(crate) fn parse_probe_output(json: &str) -> Result<VideoInfo, TranscodeError> {
    let parsed: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| TranscodeError::ProbeError(format!("Failed to parse JSON: {e}")))?;

    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| TranscodeError::ProbeError("no video stream".to_string()))?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(TranscodeError::ProbeError(
                "video stream has no dimensions".to_string(),
            ))
        }
    };

    Ok(VideoInfo {
        width,
        height,
        frame_rate: stream
            .r_frame_rate
            .filter(|r| r != "0/0")
            .unwrap_or_else(|| "25/1".to_string()),
        codec_name: stream.codec_name,
        frame_count: stream.nb_frames.and_then(|n| n.parse().ok()),
    })
}

impl Transcoder {
    /// Probe the first video stream of `path`
    pub fn probe(&self, path: &Path) -> Result<VideoInfo, TranscodeError> {
        if !path.exists() {
            return Err(TranscodeError::FileNotFound(path.display().to_string()));
        }

        let output = Command::new(self.ffprobe())
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_streams",
                "-print_format",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| TranscodeError::ProbeError(format!("Failed to execute ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscodeError::ProbeError(stderr.trim().to_string()));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            "Probed {}: {}x{} @ {} ({:?})",
            path.display(),
            info.width,
            info.height,
            info.frame_rate,
            info.codec_name
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [{
                "index": 0,
                "codec_name": "h264",
                "codec_type": "video",
                "width": 320,
                "height": 240,
                "r_frame_rate": "30000/1001",
                "nb_frames": "90"
            }]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!((info.width, info.height), (320, 240));
        assert_eq!(info.codec_name.as_deref(), Some("h264"));
        assert_eq!(info.frame_count, Some(90));
        assert_eq!(info.frame_len(), 320 * 240 * 3);
        assert_eq!(info.frame_rate, "30000/1001");
    }

    #[test]
    fn test_parse_probe_without_video() {
        let err = parse_probe_output(r#"{"streams": []}"#).unwrap_err();
        assert!(matches!(err, TranscodeError::ProbeError(_)));
        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn test_unknown_rate_falls_back() {
        let info =
            parse_probe_output(r#"{"streams":[{"width":2,"height":2,"r_frame_rate":"0/0"}]}"#)
                .unwrap();
        assert_eq!(info.frame_rate, "25/1");
        assert_eq!(info.frame_count, None);
    }
}
