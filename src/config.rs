use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// An exact output size in pixels. Both sides are always greater than zero.
///
/// Serialized as a `[width, height]` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(u32, u32)", into = "(u32, u32)")]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 {
            return Err(Error::invalid("width", width));
        }
        if height == 0 {
            return Err(Error::invalid("height", height));
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<(u32, u32)> for TargetSize {
    type Error = Error;

    fn try_from((width, height): (u32, u32)) -> Result<Self> {
        Self::new(width, height)
    }
}

impl From<TargetSize> for (u32, u32) {
    fn from(size: TargetSize) -> Self {
        (size.width, size.height)
    }
}

/// Largest side a JPEG can store.
pub const MAX_JPEG_SIDE: u32 = u16::MAX as u32;

/// One entry of the thumbnail table. The label is the key it is stored under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThumbnailSpec {
    /// Bounding box for plain thumbnails, exact size for cropped ones.
    pub size: TargetSize,
    /// Resize-and-crop to exactly `size` instead of fitting inside it.
    pub crop: bool,
}

impl ThumbnailSpec {
    pub fn new(width: u32, height: u32, crop: bool) -> Result<Self> {
        let spec = Self {
            size: TargetSize::new(width, height)?,
            crop,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Thumbnails are JPEG, so neither side may exceed [`MAX_JPEG_SIDE`].
    pub fn validate(&self) -> Result<()> {
        let TargetSize { width, height } = self.size;
        if width > MAX_JPEG_SIDE || height > MAX_JPEG_SIDE {
            return Err(Error::invalid("thumbnail size", format!("{width}x{height}")));
        }
        Ok(())
    }
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

/// Everything the media helpers need from the host application.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Thumbnail label -> spec. Labels end up in file names.
    #[serde(default)]
    pub thumbnails: BTreeMap<String, ThumbnailSpec>,
    /// Path to the `ffprobe` binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_bin: PathBuf,
    /// Path to the `ffmpeg` binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_bin: PathBuf,
    /// Kill external tools that run longer than this. `None` waits forever.
    #[serde(default)]
    pub process_timeout_secs: Option<u64>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            thumbnails: BTreeMap::new(),
            ffprobe_bin: default_ffprobe(),
            ffmpeg_bin: default_ffmpeg(),
            process_timeout_secs: None,
        }
    }
}

impl MediaConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw).map_err(|e| match e {
            Error::Config { message, .. } => Error::Config {
                path: Some(path.to_path_buf()),
                message,
            },
            other => other,
        })
    }

    /// Parses and validates a JSON config document.
    ///
    /// Malformed JSON is a [`Error::Config`]; well-formed JSON with missing or
    /// wrongly typed fields is an [`Error::InvalidArgument`].
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: MediaConfig = serde_json::from_str(raw).map_err(|e| {
            if e.classify() == serde_json::error::Category::Data {
                Error::invalid("config", e)
            } else {
                Error::Config {
                    path: None,
                    message: e.to_string(),
                }
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (label, spec) in &self.thumbnails {
            let bad_char = label
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_control());
            if label.is_empty() || bad_char || label == "." || label == ".." {
                return Err(Error::invalid("thumbnail label", format!("{label:?}")));
            }
            spec.validate()?;
        }
        if self.process_timeout_secs == Some(0) {
            return Err(Error::invalid("process_timeout_secs", 0));
        }
        Ok(())
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() -> Result<()> {
        let config = MediaConfig::from_json_str(
            r#"{
                "thumbnails": {
                    "small": { "size": [100, 100], "crop": false },
                    "big": { "size": [300, 200], "crop": true }
                },
                "ffprobe_bin": "/usr/local/bin/ffprobe",
                "ffmpeg_bin": "/usr/local/bin/ffmpeg",
                "process_timeout_secs": 30
            }"#,
        )?;
        assert_eq!(config.thumbnails.len(), 2);
        assert_eq!(config.thumbnails["big"], ThumbnailSpec::new(300, 200, true)?);
        assert_eq!(config.ffmpeg_bin, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.process_timeout(), Some(Duration::from_secs(30)));
        Ok(())
    }

    #[test]
    fn binaries_default_to_path_lookup() -> Result<()> {
        let config = MediaConfig::from_json_str("{}")?;
        assert!(config.thumbnails.is_empty());
        assert_eq!(config.ffprobe_bin, PathBuf::from("ffprobe"));
        assert_eq!(config.ffmpeg_bin, PathBuf::from("ffmpeg"));
        assert_eq!(config.process_timeout(), None);
        Ok(())
    }

    #[test]
    fn spec_missing_crop_is_invalid_argument() {
        let err = MediaConfig::from_json_str(r#"{"thumbnails": {"small": {"size": [10, 10]}}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    }

    #[test]
    fn zero_size_is_invalid_argument() {
        let err = MediaConfig::from_json_str(
            r#"{"thumbnails": {"small": {"size": [0, 10], "crop": true}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    }

    #[test]
    fn size_beyond_jpeg_limit_is_rejected() {
        let err = MediaConfig::from_json_str(
            r#"{"thumbnails": {"banner": {"size": [70000, 100], "crop": true}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "thumbnail size", .. }), "{err}");
        assert!(ThumbnailSpec::new(MAX_JPEG_SIDE, 1, false).is_ok());
        assert!(ThumbnailSpec::new(1, MAX_JPEG_SIDE + 1, false).is_err());
    }

    #[test]
    fn unknown_spec_field_is_rejected() {
        let err = MediaConfig::from_json_str(
            r#"{"thumbnails": {"s": {"size": [1, 1], "crop": true, "anchor": "top"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    }

    #[test]
    fn label_with_separator_is_rejected() {
        let err = MediaConfig::from_json_str(
            r#"{"thumbnails": {"../x": {"size": [1, 1], "crop": true}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "thumbnail label", .. }));
    }

    #[test]
    fn broken_json_is_config_error() {
        let err = MediaConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config { path: None, .. }), "{err}");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = MediaConfig::from_json_str(r#"{"process_timeout_secs": 0}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
