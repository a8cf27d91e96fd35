use crate::config::{MediaConfig, TargetSize, ThumbnailSpec};
use crate::error::Result;
use crate::thumbnails::crop_resize::{CropAnchor, CropResizer, save_jpeg};
use crate::utils::derived_path;
use image::{DynamicImage, ImageReader};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Pixel work needed by [`ThumbnailGenerator`].
#[cfg_attr(test, mockall::automock)]
pub trait ThumbnailRenderer {
    /// Exactly `size`, cropping the overhang at `anchor`.
    fn crop(
        &mut self,
        img: &DynamicImage,
        size: TargetSize,
        anchor: CropAnchor,
    ) -> Result<DynamicImage>;

    /// Shrunk to fit inside `bound`.
    fn fit(&mut self, img: &DynamicImage, bound: TargetSize) -> Result<DynamicImage>;
}

impl ThumbnailRenderer for CropResizer {
    fn crop(
        &mut self,
        img: &DynamicImage,
        size: TargetSize,
        anchor: CropAnchor,
    ) -> Result<DynamicImage> {
        self.resize_and_crop(img, size, anchor)
    }

    fn fit(&mut self, img: &DynamicImage, bound: TargetSize) -> Result<DynamicImage> {
        self.thumbnail(img, bound)
    }
}

/// What was read back from a freshly written thumbnail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThumbnailStats {
    pub path: PathBuf,
    /// File size in bytes.
    pub length: u64,
    pub width: u32,
    pub height: u32,
    /// `image/<format>` of the file as written.
    pub content_type: String,
    /// Lowercase hex SHA-256 of the file contents.
    pub checksum: String,
}

/// Per-label outcome when stats are requested.
///
/// A thumbnail that was already on disk is only reported as [`ThumbnailResult::Existing`];
/// its stats are not read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ThumbnailResult {
    Existing,
    Created(ThumbnailStats),
}

/// Where the thumbnail for `label` of `source` lives.
pub fn thumbnail_path(source: &Path, label: &str) -> PathBuf {
    derived_path(source, label, "jpg")
}

fn read_stats(path: &Path) -> Result<ThumbnailStats> {
    let bytes = fs::read(path)?;
    let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
    let content_type = reader
        .format()
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let (width, height) = reader.into_dimensions()?;

    Ok(ThumbnailStats {
        path: path.to_path_buf(),
        length: bytes.len() as u64,
        width,
        height,
        content_type,
        checksum: hex::encode(Sha256::digest(&bytes)),
    })
}

/// Produces every configured thumbnail size for a source image.
pub struct ThumbnailGenerator<R = CropResizer> {
    specs: BTreeMap<String, ThumbnailSpec>,
    renderer: R,
}

impl ThumbnailGenerator<CropResizer> {
    pub fn new(specs: BTreeMap<String, ThumbnailSpec>) -> Self {
        Self::with_renderer(specs, CropResizer::new())
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.thumbnails.clone())
    }
}

impl<R: ThumbnailRenderer> ThumbnailGenerator<R> {
    pub fn with_renderer(specs: BTreeMap<String, ThumbnailSpec>, renderer: R) -> Self {
        Self { specs, renderer }
    }

    pub fn specs(&self) -> &BTreeMap<String, ThumbnailSpec> {
        &self.specs
    }

    /// Writes `{source-stem}-{label}.jpg` next to `source` for every configured label.
    ///
    /// Thumbnails that already exist as regular files are left alone. With `collect_stats`
    /// each label maps to a [`ThumbnailResult`], otherwise every value is `None`. The source
    /// is only decoded when at least one thumbnail is missing.
    pub fn generate(
        &mut self,
        source: &Path,
        collect_stats: bool,
    ) -> Result<BTreeMap<String, Option<ThumbnailResult>>> {
        let mut results = BTreeMap::new();
        let mut pending = Vec::new();

        for (label, spec) in &self.specs {
            let dst = thumbnail_path(source, label);
            if dst.is_file() {
                debug!("Thumbnail {label} already exists at {}", dst.display());
                results.insert(
                    label.clone(),
                    collect_stats.then_some(ThumbnailResult::Existing),
                );
            } else {
                pending.push((label, spec, dst));
            }
        }

        if pending.is_empty() {
            return Ok(results);
        }

        let img = image::open(source)?;
        for (label, spec, dst) in pending {
            let thumb = if spec.crop {
                self.renderer.crop(&img, spec.size, CropAnchor::Middle)?
            } else {
                self.renderer.fit(&img, spec.size)?
            };
            save_jpeg(&thumb, &dst)?;
            info!(
                "Generated {label} thumbnail {}x{} at {}",
                thumb.width(),
                thumb.height(),
                dst.display()
            );

            let result = if collect_stats {
                Some(ThumbnailResult::Created(read_stats(&dst)?))
            } else {
                None
            };
            results.insert(label.clone(), result);
        }

        Ok(results)
    }
}
