pub mod augment;
pub mod ocr;

pub use augment::{Augmentation, crop_region, open_image, rotate};
pub use ocr::OcrEngine;
