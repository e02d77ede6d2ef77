use std::{fmt, path::Path};

use glam::Vec2;
use image::{DynamicImage, GenericImageView, Rgb};
use imageproc::map::map_colors;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{
    analysis::bbox::Bbox,
    consts::RETRY_BRIGHTNESS,
    error::{DocfieldError, ImageOpenSnafu},
};

/// Image transform applied to a crop before it is OCR'd again.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Augmentation {
    Identity,
    Grayscale,
    /// Multiplies every channel by the factor.
    Brightness(f32),
}

impl Augmentation {
    /// Identity, grayscale, then each factor of [`RETRY_BRIGHTNESS`].
    pub fn default_cascade() -> Vec<Augmentation> {
        let mut cascade = vec![Augmentation::Identity, Augmentation::Grayscale];
        cascade.extend(RETRY_BRIGHTNESS.iter().map(|f| Augmentation::Brightness(*f)));
        cascade
    }

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            Augmentation::Identity => image.clone(),
            Augmentation::Grayscale => image.grayscale(),
            Augmentation::Brightness(factor) => {
                let factor = factor.max(0.0);
                let rgb = image.to_rgb8();
                let scaled = map_colors(&rgb, |Rgb(channels)| {
                    Rgb(channels.map(|c| (c as f32 * factor).round().min(255.0) as u8))
                });
                DynamicImage::ImageRgb8(scaled)
            }
        }
    }
}

impl fmt::Display for Augmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Augmentation::Identity => write!(f, "identity"),
            Augmentation::Grayscale => write!(f, "grayscale"),
            Augmentation::Brightness(factor) => write!(f, "brightness({factor})"),
        }
    }
}

pub fn open_image(path: impl AsRef<Path>) -> Result<DynamicImage, DocfieldError> {
    let path = path.as_ref();
    image::open(path).context(ImageOpenSnafu {
        path: path.display().to_string(),
    })
}

/// Rotates clockwise by a multiple of 90 degrees. Other angles are refused.
pub fn rotate(image: &DynamicImage, angle: u16) -> Option<DynamicImage> {
    match angle % 360 {
        0 => Some(image.clone()),
        90 => Some(image.rotate90()),
        180 => Some(image.rotate180()),
        270 => Some(image.rotate270()),
        _ => None,
    }
}

/// Crops `region` out of `image`, clamped to the image bounds.
///
/// Returns the crop and its top-left corner in image coordinates, or `None`
/// when nothing of the region lies inside the image.
pub fn crop_region(image: &DynamicImage, region: &Bbox) -> Option<(DynamicImage, Vec2)> {
    let (image_width, image_height) = image.dimensions();
    let clamped = region.clamp(
        Vec2::ZERO,
        Vec2::new(image_width as f32, image_height as f32),
    );

    let x = clamped.min.x.floor() as u32;
    let y = clamped.min.y.floor() as u32;
    let width = (clamped.max.x.ceil() as u32).min(image_width).saturating_sub(x);
    let height = (clamped.max.y.ceil() as u32).min(image_height).saturating_sub(y);

    if width == 0 || height == 0 {
        return None;
    }

    Some((
        image.crop_imm(x, y, width, height),
        Vec2::new(x as f32, y as f32),
    ))
}
