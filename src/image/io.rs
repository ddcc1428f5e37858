//! Image collaborators built on the `image` and `imageproc` crates.
//!
//! Available when the `image-io` feature is enabled. These helpers turn a
//! photograph into the binary edge map the matcher consumes (grayscale,
//! Gaussian blur, Canny), crop scene and exemplar to their edge content, and
//! draw the winning pose as an overlay.

use crate::image::{CropRect, EdgeMap};
use crate::search::Match;
use crate::util::{EdgeMatchError, EdgeMatchResult};
use ::image::{imageops, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

/// Parameters for edge extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeParams {
    /// Gaussian blur sigma; 0 disables blurring.
    pub sigma: f32,
    /// Side of the Gaussian kernel in pixels; must be odd. 0 sizes the
    /// kernel from `sigma`.
    pub kernel_size: u32,
    /// Canny low threshold, derived from the image median when `None`.
    pub low_threshold: Option<f32>,
    /// Canny high threshold, derived from the image median when `None`.
    pub high_threshold: Option<f32>,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            kernel_size: 7,
            low_threshold: Some(50.0),
            high_threshold: Some(55.0),
        }
    }
}

/// Loads a color image from disk.
pub fn load_rgb<P: AsRef<Path>>(path: P) -> EdgeMatchResult<RgbImage> {
    let img = ::image::open(path).map_err(|err| EdgeMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    Ok(img.to_rgb8())
}

/// Median-based Canny thresholds: `0.66·median` and `1.33·median`.
pub fn auto_thresholds(gray: &GrayImage) -> (f32, f32) {
    let mut hist = [0usize; 256];
    for p in gray.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    let half = (gray.width() as usize * gray.height() as usize).div_ceil(2);
    let mut seen = 0usize;
    let mut median = 0usize;
    for (value, &count) in hist.iter().enumerate() {
        seen += count;
        if seen >= half {
            median = value;
            break;
        }
    }
    let median = median as f32;
    let low = (0.66 * median).max(1.0);
    let high = (1.33 * median).min(255.0).max(low + 1.0);
    (low, high)
}

/// Normalised 1-D Gaussian weights over `size` taps.
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let half = i64::from(size / 2);
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

fn blur(gray: &GrayImage, params: &EdgeParams) -> EdgeMatchResult<GrayImage> {
    if params.kernel_size != 0 && params.kernel_size % 2 == 0 {
        return Err(EdgeMatchError::InvalidConfig {
            reason: "kernel_size must be odd, or 0 to derive it from sigma",
        });
    }
    if !(params.sigma > 0.0 && params.sigma.is_finite()) {
        return Ok(gray.clone());
    }
    if params.kernel_size == 0 {
        return Ok(imageproc::filter::gaussian_blur_f32(gray, params.sigma));
    }
    let kernel = gaussian_kernel(params.kernel_size, params.sigma);
    Ok(imageproc::filter::separable_filter_equal(gray, &kernel))
}

/// Blurs and runs Canny on a grayscale image.
pub fn detect_edges(gray: &GrayImage, params: &EdgeParams) -> EdgeMatchResult<EdgeMap> {
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    if width == 0 || height == 0 {
        return Err(EdgeMatchError::InvalidDimensions { width, height });
    }
    let blurred = blur(gray, params)?;
    let (auto_low, auto_high) = auto_thresholds(&blurred);
    let low = params.low_threshold.unwrap_or(auto_low);
    let high = params.high_threshold.unwrap_or(auto_high).max(low);
    let edges = imageproc::edges::canny(&blurred, low, high);
    EdgeMap::from_mask(edges.as_raw(), width, height)
}

/// Converts a color image to grayscale and extracts its edges.
pub fn edges_from_rgb(img: &RgbImage, params: &EdgeParams) -> EdgeMatchResult<EdgeMap> {
    let gray = imageops::grayscale(img);
    detect_edges(&gray, params)
}

/// Crops a color image to `rect`.
pub fn crop_rgb(img: &RgbImage, rect: CropRect) -> RgbImage {
    imageops::crop_imm(
        img,
        rect.x as u32,
        rect.y as u32,
        rect.width as u32,
        rect.height as u32,
    )
    .to_image()
}

/// Trims an edge map to its edge bounding box and crops the matching color
/// image identically. Returns `None` when the map has no edges.
pub fn trim(edges: &EdgeMap, color: &RgbImage) -> EdgeMatchResult<Option<(EdgeMap, RgbImage)>> {
    if edges.width() != color.width() as usize || edges.height() != color.height() as usize {
        return Err(EdgeMatchError::InvalidDimensions {
            width: color.width() as usize,
            height: color.height() as usize,
        });
    }
    Ok(edges
        .crop_to_edges()
        .map(|(cropped, rect)| (cropped, crop_rgb(color, rect))))
}

/// Renders an edge map as a black and white image.
pub fn edge_map_to_gray(edges: &EdgeMap) -> GrayImage {
    let data = edges.as_slice().iter().map(|&v| v * 255).collect();
    GrayImage::from_raw(edges.width() as u32, edges.height() as u32, data)
        .unwrap_or_else(|| GrayImage::new(edges.width() as u32, edges.height() as u32))
}

/// Draws the winning pose's box on `canvas`. Returns false if there is none.
pub fn draw_overlay(canvas: &mut RgbImage, result: &Match) -> bool {
    let Some((x, y, w, h)) = result.overlay_rect() else {
        return false;
    };
    let rect = Rect::at(x as i32, y as i32).of_size(w, h);
    let color = if result.matched {
        Rgb([0, 200, 0])
    } else {
        Rgb([220, 0, 0])
    };
    draw_hollow_rect_mut(canvas, rect, color);
    true
}

/// Draws the overlay on a copy of `scene` and writes `<dir>/<label>.png`.
pub fn save_overlay<P: AsRef<Path>>(
    scene: &RgbImage,
    result: &Match,
    dir: P,
    label: &str,
) -> EdgeMatchResult<PathBuf> {
    let mut canvas = scene.clone();
    draw_overlay(&mut canvas, result);
    let path = dir.as_ref().join(format!("{label}.png"));
    canvas.save(&path).map_err(|err| EdgeMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    Ok(path)
}
