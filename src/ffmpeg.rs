use crate::config::MediaConfig;
use crate::error::{Error, Result};
use crate::process::run_tool;
use crate::utils::derived_path;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

/// Container/codec combination produced by [`VideoEncoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    /// H.264 + AAC, `+faststart`.
    Mp4,
    /// VP8, no audio.
    Webm,
}

impl VideoFormat {
    pub fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Webm => "webm",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for VideoFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mp4" => Ok(VideoFormat::Mp4),
            "webm" => Ok(VideoFormat::Webm),
            other => Err(Error::invalid("video format", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub format: VideoFormat,
    /// Output height in pixels; width follows the aspect ratio, rounded to even.
    pub height: u32,
}

impl EncodeRequest {
    pub fn new(source: impl Into<PathBuf>, format: VideoFormat, height: u32) -> Result<Self> {
        if height == 0 {
            return Err(Error::invalid("height", height));
        }
        Ok(Self {
            source: source.into(),
            format,
            height,
        })
    }

    /// `{source-stem}-{height}p.{format}` next to the source.
    pub fn output_path(&self) -> PathBuf {
        derived_path(
            &self.source,
            &format!("{}p", self.height),
            self.format.extension(),
        )
    }
}

fn verbose_from_env() -> bool {
    std::env::var_os("VERBOSE").is_some_and(|v| !v.is_empty())
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Transcodes videos with `ffmpeg`.
#[derive(Clone, Debug)]
pub struct VideoEncoder {
    binary: PathBuf,
    timeout: Option<Duration>,
    verbose: bool,
}

impl VideoEncoder {
    /// ffmpeg's own logging stays quiet unless `VERBOSE` is set to a non-empty value.
    pub fn new(binary: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            verbose: verbose_from_env(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.ffmpeg_bin.clone(), config.process_timeout())
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Full ffmpeg argument list for `request`, destination last.
    pub fn encode_args(&self, request: &EncodeRequest) -> Vec<String> {
        let scale = format!("scale=-2:{}", request.height);
        let mut args = vec!["-i".to_string(), path_str(&request.source)];

        #[rustfmt::skip]
        let codec_args: Vec<&str> = match request.format {
            VideoFormat::Mp4 => vec![
                "-threads", "1",
                "-vf", scale.as_str(),
                "-vcodec", "libx264",
                "-pix_fmt", "yuv420p",
                "-preset", "fast",
                "-crf", "20",
                "-acodec", "libfdk_aac", "-ab", "112k", "-ar", "44100",
                "-movflags", "+faststart",
            ],
            VideoFormat::Webm => vec![
                "-vf", scale.as_str(),
                "-vcodec", "libvpx",
                "-g", "120",
                "-lag-in-frames", "16",
                "-deadline", "good",
                "-cpu-used", "0",
                "-vprofile", "0",
                "-qmax", "51", "-qmin", "11",
                "-slices", "4",
                "-b:v", "2M",
                "-an",
                "-f", "webm",
            ],
        };
        args.extend(codec_args.into_iter().map(String::from));

        if !self.verbose {
            args.extend(["-loglevel".to_string(), "quiet".to_string()]);
        }
        args.push(path_str(&request.output_path()));
        args
    }

    /// The invocation as a single shell-like line, for diagnostics.
    pub fn command_line(&self, args: &[String]) -> String {
        let mut line = path_str(&self.binary);
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Transcodes `source` and returns the output path.
    ///
    /// A non-zero exit is logged with its code and command line and reported as `Ok(None)`.
    /// `Err` means ffmpeg could not be started or was killed by the timeout.
    pub async fn encode(
        &self,
        source: &Path,
        format: VideoFormat,
        height: u32,
    ) -> Result<Option<PathBuf>> {
        let request = EncodeRequest::new(source, format, height)?;
        let args = self.encode_args(&request);
        let dst = request.output_path();

        info!("Encoding {} to {format}", source.display());
        let output = run_tool(&self.binary, &args, self.timeout).await?;
        self.relay_stderr(&output.stderr);
        if output.status.success() {
            info!("Successfully encoded {}", dst.display());
            return Ok(Some(dst));
        }

        let code = output
            .status
            .code()
            .map_or_else(|| output.status.to_string(), |c| c.to_string());
        error!(
            "Error during encode (code {code}): {}",
            self.command_line(&args)
        );
        Ok(None)
    }

    /// ffmpeg's own log lines: `info` when verbose, `debug` otherwise.
    fn relay_stderr(&self, stderr: &[u8]) {
        let stderr = String::from_utf8_lossy(stderr);
        let lines = stderr.split(['\n', '\r']).map(str::trim_end).filter(|l| !l.is_empty());
        for line in lines {
            if self.verbose {
                info!("ffmpeg: {line}");
            } else {
                debug!("ffmpeg: {line}");
            }
        }
    }
}
