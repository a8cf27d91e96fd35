//! Image thumbnails: crop geometry and per-label orchestration.

pub mod crop_resize;
pub mod photo_thumbnails;

pub use crop_resize::{CropAnchor, CropBox, CropPlan, CropResizer, fit_within, plan_crop};
pub use photo_thumbnails::{
    ThumbnailGenerator, ThumbnailRenderer, ThumbnailResult, ThumbnailStats, thumbnail_path,
};
