use image::DynamicImage;

use crate::{error::DocfieldError, layout::token::Token};

/// Text detection and recognition backend.
///
/// Implementations return tokens in the pixel frame of the image they were
/// given. Any closure with the right signature is an engine, which is how
/// tests and callers holding precomputed OCR output plug in.
pub trait OcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Token>, DocfieldError>;
}

impl<F> OcrEngine for F
where
    F: Fn(&DynamicImage) -> Result<Vec<Token>, DocfieldError>,
{
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Token>, DocfieldError> {
        self(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::bbox::Bbox;

    #[test]
    fn test_closure_engine() {
        let engine = |image: &DynamicImage| -> Result<Vec<Token>, DocfieldError> {
            let bbox = Bbox::from_edges(0.0, 0.0, image.width() as f32, image.height() as f32);
            Ok(vec![Token::from_bbox(bbox, "全图", 1.0)])
        };

        let tokens = engine.recognize(&DynamicImage::new_rgb8(40, 20)).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].bbox().width(), 40.0);
    }
}
