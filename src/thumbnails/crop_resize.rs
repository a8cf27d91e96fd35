//! Resize-then-crop geometry and the pixel work behind it.
//!
//! All rounding is round-half-away-from-zero (`f64::round`).
use crate::config::TargetSize;
use crate::error::{Error, Result};
use crate::utils::staging_path;
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, ImageFormat, RgbImage, imageops};
use std::cmp::Ordering;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

/// Which end of the overhanging axis survives the crop.
///
/// On the horizontal axis `Top` keeps the left edge and `Bottom` the right edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropAnchor {
    Top,
    Middle,
    Bottom,
}

impl FromStr for CropAnchor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "top" | "left" => Ok(CropAnchor::Top),
            "middle" | "center" => Ok(CropAnchor::Middle),
            "bottom" | "right" => Ok(CropAnchor::Bottom),
            other => Err(Error::invalid("crop anchor", other)),
        }
    }
}

impl CropAnchor {
    fn offset(self, excess: u32) -> u32 {
        match self {
            CropAnchor::Top => 0,
            CropAnchor::Middle => (excess as f64 / 2.0).round() as u32,
            CropAnchor::Bottom => excess,
        }
    }
}

/// Pixel box inside the resized image, right/bottom exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Uniform-scale size of the source plus the box cut out of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropPlan {
    pub scaled: (u32, u32),
    pub crop_box: CropBox,
}

impl CropPlan {
    /// False when the aspect ratios already match and the box covers the whole image.
    pub fn needs_crop(&self) -> bool {
        (self.crop_box.width(), self.crop_box.height()) != self.scaled
    }
}

fn scale_len(len: u32, num: u32, den: u32) -> u32 {
    (len as f64 * num as f64 / den as f64).round() as u32
}

fn check_source(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::invalid("source size", format!("{width}x{height}")));
    }
    Ok(())
}

/// Computes how to scale `source` and which box to cut so the result is exactly `target`.
///
/// Ratios are compared by cross-multiplication so equal ratios are detected exactly.
pub fn plan_crop(source: (u32, u32), target: TargetSize, anchor: CropAnchor) -> Result<CropPlan> {
    let (src_w, src_h) = source;
    check_source(src_w, src_h)?;
    let (w, h) = (target.width, target.height);

    let target_side = w as u64 * src_h as u64;
    let source_side = src_w as u64 * h as u64;

    let plan = match target_side.cmp(&source_side) {
        // Target is relatively wider: match widths, trim rows.
        Ordering::Greater => {
            let scaled_h = scale_len(w, src_h, src_w).max(h);
            let top = anchor.offset(scaled_h - h);
            CropPlan {
                scaled: (w, scaled_h),
                crop_box: CropBox {
                    left: 0,
                    top,
                    right: w,
                    bottom: top + h,
                },
            }
        }
        // Target is relatively taller: match heights, trim columns.
        Ordering::Less => {
            let scaled_w = scale_len(h, src_w, src_h).max(w);
            let left = anchor.offset(scaled_w - w);
            CropPlan {
                scaled: (scaled_w, h),
                crop_box: CropBox {
                    left,
                    top: 0,
                    right: left + w,
                    bottom: h,
                },
            }
        }
        Ordering::Equal => CropPlan {
            scaled: (w, h),
            crop_box: CropBox {
                left: 0,
                top: 0,
                right: w,
                bottom: h,
            },
        },
    };
    Ok(plan)
}

/// Size of a plain thumbnail: shrink to fit inside `bound`, never enlarge.
pub fn fit_within(source: (u32, u32), bound: TargetSize) -> Result<(u32, u32)> {
    let (src_w, src_h) = source;
    check_source(src_w, src_h)?;
    let (bw, bh) = (bound.width, bound.height);
    if src_w <= bw && src_h <= bh {
        return Ok(source);
    }
    if bw as u64 * src_h as u64 <= bh as u64 * src_w as u64 {
        Ok((bw, scale_len(bw, src_h, src_w).clamp(1, bh)))
    } else {
        Ok((scale_len(bh, src_w, src_h).clamp(1, bw), bh))
    }
}

/// Encodes `img` as JPEG and moves it onto `dst` only once it is complete.
///
/// A failed encode or write leaves nothing at `dst`.
pub(crate) fn save_jpeg(img: &DynamicImage, dst: &Path) -> Result<()> {
    let mut encoded = Cursor::new(Vec::new());
    img.write_to(&mut encoded, ImageFormat::Jpeg)?;

    let staging = staging_path(dst);
    let written = fs::write(&staging, encoded.get_ref())
        .and_then(|()| fs::rename(&staging, dst));
    if let Err(e) = written {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }
    Ok(())
}

/// Resizes images with a reusable `fast_image_resize` resizer.
///
/// Output is always RGB8 since everything ends up as JPEG.
pub struct CropResizer {
    resizer: Resizer,
    options: ResizeOptions,
}

impl Default for CropResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl CropResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3)),
        }
    }

    fn resize_rgb(&mut self, src: RgbImage, width: u32, height: u32) -> Result<RgbImage> {
        if src.dimensions() == (width, height) {
            return Ok(src);
        }
        let (src_w, src_h) = src.dimensions();
        let src_image =
            Image::from_vec_u8(src_w, src_h, src.into_raw(), PixelType::U8x3).map_err(Error::resize)?;
        let mut dst_image = Image::new(width, height, PixelType::U8x3);
        self.resizer
            .resize(&src_image, &mut dst_image, &self.options)
            .map_err(Error::resize)?;

        RgbImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| Error::resize("resized buffer does not match its dimensions"))
    }

    /// Scales `img` uniformly then crops it to exactly `target`.
    pub fn resize_and_crop(
        &mut self,
        img: &DynamicImage,
        target: TargetSize,
        anchor: CropAnchor,
    ) -> Result<DynamicImage> {
        let rgb = img.to_rgb8();
        let plan = plan_crop(rgb.dimensions(), target, anchor)?;
        let (scaled_w, scaled_h) = plan.scaled;
        let resized = self.resize_rgb(rgb, scaled_w, scaled_h)?;
        if !plan.needs_crop() {
            return Ok(DynamicImage::ImageRgb8(resized));
        }

        let b = plan.crop_box;
        let cropped = imageops::crop_imm(&resized, b.left, b.top, b.width(), b.height()).to_image();
        Ok(DynamicImage::ImageRgb8(cropped))
    }

    /// Shrinks `img` to fit inside `bound`, keeping its aspect ratio.
    pub fn thumbnail(&mut self, img: &DynamicImage, bound: TargetSize) -> Result<DynamicImage> {
        let rgb = img.to_rgb8();
        let (w, h) = fit_within(rgb.dimensions(), bound)?;
        Ok(DynamicImage::ImageRgb8(self.resize_rgb(rgb, w, h)?))
    }

    /// File-level resize-and-crop. The anchor is checked before anything is read or written.
    pub fn resize_and_crop_file(
        &mut self,
        src: &Path,
        dst: &Path,
        target: TargetSize,
        anchor: &str,
    ) -> Result<()> {
        let anchor: CropAnchor = anchor.parse()?;
        let img = image::open(src)?;
        let out = self.resize_and_crop(&img, target, anchor)?;
        save_jpeg(&out, dst)
    }
}
