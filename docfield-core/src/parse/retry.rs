use std::collections::BTreeMap;

use image::DynamicImage;
use tracing::*;

use crate::{
    inference::{
        augment::{Augmentation, crop_region},
        ocr::OcrEngine,
    },
    layout::{
        region::FieldRegion,
        result::{ExtractionResult, FieldState},
        token::Token,
    },
};

use super::matcher::Matcher;

/// Re-OCRs the regions of unresolved fields under a bounded list of image
/// augmentations.
pub struct Retry<'a> {
    matcher: Matcher<'a>,
    augmentations: &'a [Augmentation],
    min_confidence: f32,
}

impl<'a> Retry<'a> {
    pub fn new(
        matcher: Matcher<'a>,
        augmentations: &'a [Augmentation],
        min_confidence: f32,
    ) -> Self {
        Self {
            matcher,
            augmentations,
            min_confidence,
        }
    }

    /// Runs the cascade on the upright image.
    ///
    /// Only fields unresolved before a step can change during it, so a value
    /// found earlier is never replaced. Crop OCR failures count as an empty
    /// recognition.
    pub fn run<O: OcrEngine + ?Sized>(
        &self,
        mut result: ExtractionResult,
        image: &DynamicImage,
        ocr: &O,
    ) -> ExtractionResult {
        for augmentation in self.augmentations {
            let open: Vec<(String, FieldRegion)> = result
                .fields
                .iter()
                .filter(|(_, value)| !value.is_resolved())
                .filter_map(|(name, value)| value.region.map(|region| (name.clone(), region)))
                .collect();
            if open.is_empty() {
                break;
            }
            debug!("Retry with {} on {} fields.", augmentation, open.len());

            let state = FieldState::Recovered(augmentation.to_string());
            for (name, region) in open {
                let Some((crop, offset)) = crop_region(image, &region.rect) else {
                    debug!("Region of `{}` lies outside the image.", name);
                    continue;
                };

                let tokens: Vec<Token> = match ocr.recognize(&augmentation.apply(&crop)) {
                    Ok(tokens) => tokens
                        .into_iter()
                        .filter(|token| token.confidence >= self.min_confidence)
                        .map(|token| token.translated(offset))
                        .collect(),
                    Err(e) => {
                        warn!("OCR on the `{}` crop failed under {}: {}", name, augmentation, e);
                        Vec::new()
                    }
                };
                if tokens.is_empty() {
                    continue;
                }

                let regions = BTreeMap::from([(name.clone(), region)]);
                let attempt = self
                    .matcher
                    .run(result.clone(), &tokens, &regions, Some(&name), &state);
                result = result.merge_unresolved(attempt);

                if result.is_resolved(&name) {
                    info!("Recovered `{}` with {}.", name, augmentation);
                }
            }
        }

        result
    }
}
