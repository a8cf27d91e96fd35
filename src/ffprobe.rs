use crate::config::MediaConfig;
use crate::error::{Error, Result};
use crate::process::run_tool;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Codecs whose duration ffprobe reports wrongly (webm/vp8 streams carry none).
const UNRELIABLE_DURATION_CODECS: &[&str] = &["vp8"];

/// Basic facts about the first video stream of a file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    /// Whole seconds, truncated. `None` when the codec's duration can't be trusted.
    pub duration_seconds: Option<u64>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    sample_aspect_ratio: Option<String>,
}

/// Turns `ffprobe -show_streams -print_format json` output into a [`VideoInfo`].
///
/// Returns `Ok(None)` when the first stream is not a video stream.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Option<VideoInfo>> {
    let output: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| Error::tool_output("ffprobe", e))?;
    let stream = output
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| Error::tool_output("ffprobe", "no streams in output"))?;

    if stream.codec_type != "video" {
        return Ok(None);
    }

    let codec = stream.codec_name.unwrap_or_default();
    let duration_seconds = if UNRELIABLE_DURATION_CODECS.contains(&codec.as_str()) {
        None
    } else {
        let raw = stream
            .duration
            .ok_or_else(|| Error::tool_output("ffprobe", "video stream has no duration"))?;
        let seconds: f64 = raw
            .trim()
            .parse()
            .map_err(|_| Error::tool_output("ffprobe", format!("bad duration {raw:?}")))?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(Error::tool_output("ffprobe", format!("bad duration {raw:?}")));
        }
        Some(seconds.trunc() as u64)
    };

    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(Error::tool_output("ffprobe", "video stream has no resolution"));
    };

    if let Some(sar) = stream.sample_aspect_ratio.as_deref() {
        if sar != "1:1" {
            warn!("Pixel aspect ratio is not square: {sar} ({codec}, {width}x{height})");
        }
    }

    Ok(Some(VideoInfo {
        duration_seconds,
        width,
        height,
    }))
}

/// Reads stream metadata with `ffprobe`.
#[derive(Clone, Debug)]
pub struct VideoProbe {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl VideoProbe {
    pub fn new(binary: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.ffprobe_bin.clone(), config.process_timeout())
    }

    pub async fn probe(&self, path: &Path) -> Result<Option<VideoInfo>> {
        let args = [
            OsStr::new("-loglevel"),
            OsStr::new("error"),
            OsStr::new("-show_streams"),
            path.as_os_str(),
            OsStr::new("-print_format"),
            OsStr::new("json"),
        ];
        let output = run_tool(&self.binary, &args, self.timeout).await?;
        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: self.binary.display().to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        parse_probe_output(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vp8_has_no_duration() -> Result<()> {
        let json = br#"{"streams": [{
            "codec_type": "video", "codec_name": "vp8",
            "width": 640, "height": 360, "sample_aspect_ratio": "1:1"
        }]}"#;
        let info = parse_probe_output(json)?;
        assert_eq!(
            info,
            Some(VideoInfo {
                duration_seconds: None,
                width: 640,
                height: 360
            })
        );
        Ok(())
    }

    #[test]
    fn duration_is_truncated() -> Result<()> {
        let json = br#"{"streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
             "duration": "12.7", "sample_aspect_ratio": "1:1"},
            {"codec_type": "audio", "codec_name": "aac", "duration": "12.70"}
        ]}"#;
        let info = parse_probe_output(json)?.expect("video stream");
        assert_eq!(info.duration_seconds, Some(12));
        assert_eq!((info.width, info.height), (1280, 720));
        Ok(())
    }

    #[test]
    fn non_square_pixels_are_not_fatal() -> Result<()> {
        let json = br#"{"streams": [{"codec_type": "video", "codec_name": "mpeg2video",
            "width": 720, "height": 576, "duration": "3.0", "sample_aspect_ratio": "16:15"}]}"#;
        assert_eq!(parse_probe_output(json)?.map(|i| i.duration_seconds), Some(Some(3)));
        Ok(())
    }

    #[test]
    fn audio_first_is_not_a_video() -> Result<()> {
        let json = br#"{"streams": [{"codec_type": "audio", "codec_name": "mp3"}]}"#;
        assert_eq!(parse_probe_output(json)?, None);
        Ok(())
    }

    #[test]
    fn malformed_output_is_tool_error() {
        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{"streams": []}"#,
            br#"{"format": {}}"#,
            br#"{"streams": [{"codec_type": "video", "codec_name": "h264", "width": 1, "height": 1}]}"#,
            br#"{"streams": [{"codec_type": "video", "codec_name": "h264", "duration": "N/A", "width": 1, "height": 1}]}"#,
        ];
        for json in cases {
            let err = parse_probe_output(json).unwrap_err();
            assert!(matches!(err, Error::ExternalToolOutput { .. }), "{err}");
        }
    }

    #[tokio::test]
    async fn failing_probe_is_tool_error() {
        let err = VideoProbe::new("false", None)
            .probe(Path::new("clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExternalTool { .. }), "{err}");
    }

    #[tokio::test]
    async fn unparsable_probe_output_is_tool_error() {
        // `echo` exits 0 but prints its arguments instead of JSON.
        let err = VideoProbe::new("echo", None)
            .probe(Path::new("clip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExternalToolOutput { .. }), "{err}");
    }
}
