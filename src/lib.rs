//! # Pillar Media Helpers
//!
//! Image thumbnails and ffmpeg/ffprobe helpers used by a media web application.
//!
//! - [`ThumbnailGenerator`] writes a configured set of JPEG thumbnails next to a source
//!   image, skipping sizes that already exist.
//! - [`CropResizer`] scales an image uniformly and crops it to an exact size, keeping the
//!   top, middle or bottom (left, center or right) of the overhanging axis.
//! - [`VideoProbe`] reads duration and resolution of a video's first stream with `ffprobe`.
//! - [`VideoEncoder`] transcodes a video to mp4 or webm at a given height with `ffmpeg`.
//!
//! Image work is synchronous. The video helpers are `async` and run on `tokio`.
//!
//! ## Requirements
//!
//! - **FFmpeg** and **FFprobe** at the paths given in [`MediaConfig`] (by default looked
//!   up in `PATH`).
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use pillar_media::{MediaConfig, ThumbnailGenerator, VideoEncoder, VideoFormat, VideoProbe};
//!
//! #[tokio::main]
//! async fn main() -> pillar_media::Result<()> {
//!     let config = MediaConfig::from_json_str(
//!         r#"{"thumbnails": {"small": {"size": [100, 100], "crop": false},
//!                             "big": {"size": [300, 300], "crop": true}}}"#,
//!     )?;
//!
//!     let stats = ThumbnailGenerator::from_config(&config)
//!         .generate(Path::new("uploads/cat.png"), true)?;
//!     println!("{stats:?}");
//!
//!     let video = Path::new("uploads/clip.mov");
//!     if let Some(info) = VideoProbe::from_config(&config).probe(video).await? {
//!         println!("{}x{}", info.width, info.height);
//!     }
//!     let encoded = VideoEncoder::from_config(&config)
//!         .encode(video, VideoFormat::Webm, 480)
//!         .await?;
//!     println!("{encoded:?}");
//!     Ok(())
//! }
//! ```

mod config;
mod error;
// Module for interacting with the `ffmpeg` command-line tool.
mod ffmpeg;
// Module for interacting with the `ffprobe` command-line tool.
mod ffprobe;
mod process;
pub mod thumbnails;
mod utils;

pub use config::{MediaConfig, TargetSize, ThumbnailSpec};
pub use error::{Error, Result};
pub use ffmpeg::{EncodeRequest, VideoEncoder, VideoFormat};
pub use ffprobe::{VideoInfo, VideoProbe, parse_probe_output};
pub use process::run_tool;
pub use thumbnails::{
    CropAnchor, CropBox, CropPlan, CropResizer, ThumbnailGenerator, ThumbnailRenderer,
    ThumbnailResult, ThumbnailStats, fit_within, plan_crop, thumbnail_path,
};
