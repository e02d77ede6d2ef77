use image::DynamicImage;
use rayon::prelude::*;
use tracing::*;
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    error::DocfieldError,
    inference::{augment::rotate, ocr::OcrEngine},
    layout::{
        result::{ExtractionRecord, ExtractionResult, FieldState},
        token::{RotationTokens, Token, sort_reading_order},
    },
    template::{Template, TemplateSet},
};

use super::{
    classify::{classify, match_template},
    locate::locate,
    matcher::Matcher,
    postprocess::{apply_rules, status},
    retry::Retry,
};

/// Field extraction over a fixed template set.
///
/// The engine holds no per-document state and is shared freely between
/// threads; every call creates its own [`ExtractionResult`].
#[derive(Clone, Debug)]
pub struct Engine {
    templates: TemplateSet,
    config: EngineConfig,
}

impl Engine {
    pub fn new(templates: TemplateSet, config: EngineConfig) -> Result<Self, DocfieldError> {
        config.validate()?;
        info!("Engine ready with {} templates.", templates.len());
        Ok(Self { templates, config })
    }

    /// Built-in templates and default configuration.
    pub fn builtin() -> Result<Self, DocfieldError> {
        Self::new(TemplateSet::builtin()?, EngineConfig::default())
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Output record using the configured unrecognized label.
    pub fn record(&self, result: &ExtractionResult) -> ExtractionRecord {
        result.to_record(&self.config.unrecognized_status)
    }

    /// Runs the pipeline on OCR output already computed for each rotation.
    ///
    /// Rotations are tried in configured order; angles missing from
    /// `rotations` are skipped. Without an image there is nothing to re-OCR,
    /// so the retry stage does not run.
    pub fn extract_tokens(&self, rotations: &[RotationTokens]) -> ExtractionResult {
        self.extract_tokens_with_id(Uuid::new_v4(), rotations)
    }

    #[instrument(skip_all, fields(request = %request_id))]
    pub fn extract_tokens_with_id(
        &self,
        request_id: Uuid,
        rotations: &[RotationTokens],
    ) -> ExtractionResult {
        let prepared: Vec<(u16, Vec<Token>)> = self
            .config
            .rotations
            .iter()
            .filter_map(|angle| {
                rotations
                    .iter()
                    .find(|rotation| rotation.angle == *angle)
                    .map(|rotation| (*angle, self.prepare(rotation.tokens.clone())))
            })
            .collect();

        let candidates = prepared
            .iter()
            .map(|(angle, tokens)| (*angle, tokens.as_slice()));
        let Some(classification) = classify(candidates, &self.templates) else {
            info!("No template accepted the document.");
            return ExtractionResult::unrecognized(request_id);
        };

        let tokens = prepared
            .iter()
            .find(|(angle, _)| *angle == classification.angle)
            .map(|(_, tokens)| tokens.as_slice())
            .unwrap_or_default();

        self.resolve(
            request_id,
            classification.angle,
            classification.template,
            tokens,
            None,
        )
    }

    /// Runs the full pipeline on an image.
    ///
    /// Rotations are OCR'd lazily in configured order until one classifies.
    /// A failure of the full-image OCR is returned; failures on retry crops
    /// are only logged.
    pub fn extract<O: OcrEngine>(
        &self,
        image: &DynamicImage,
        ocr: &O,
    ) -> Result<ExtractionResult, DocfieldError> {
        self.extract_with_id(Uuid::new_v4(), image, ocr)
    }

    #[instrument(skip_all, fields(request = %request_id))]
    pub fn extract_with_id<O: OcrEngine>(
        &self,
        request_id: Uuid,
        image: &DynamicImage,
        ocr: &O,
    ) -> Result<ExtractionResult, DocfieldError> {
        for angle in &self.config.rotations {
            let Some(upright) = rotate(image, *angle) else {
                warn!("Skipping unsupported rotation {}.", angle);
                continue;
            };

            let tokens = self.prepare(ocr.recognize(&upright)?);
            debug!("{} tokens at {} degrees.", tokens.len(), angle);

            if let Some((template, rank)) = match_template(&tokens, &self.templates) {
                debug!("Classified as `{}` at {} degrees, rank {:?}.", template.id, angle, rank);
                return Ok(self.resolve(
                    request_id,
                    *angle,
                    template,
                    &tokens,
                    Some((&upright, ocr as &dyn OcrEngine)),
                ));
            }
        }

        info!("No template accepted the document.");
        Ok(ExtractionResult::unrecognized(request_id))
    }

    /// [`Engine::extract_tokens`] over many documents in parallel. Results
    /// keep the input order.
    pub fn extract_batch_tokens(&self, documents: &[Vec<RotationTokens>]) -> Vec<ExtractionResult> {
        documents
            .par_iter()
            .map(|rotations| self.extract_tokens(rotations))
            .collect()
    }

    /// [`Engine::extract`] over many images in parallel. Results keep the
    /// input order.
    pub fn extract_batch<O: OcrEngine + Sync>(
        &self,
        images: &[DynamicImage],
        ocr: &O,
    ) -> Vec<Result<ExtractionResult, DocfieldError>> {
        images
            .par_iter()
            .map(|image| self.extract(image, ocr))
            .collect()
    }

    fn prepare(&self, tokens: Vec<Token>) -> Vec<Token> {
        let mut tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|token| {
                token.confidence >= self.config.min_confidence && !token.text.trim().is_empty()
            })
            .collect();
        if self.config.sort_tokens {
            sort_reading_order(&mut tokens);
        }
        tokens
    }

    /// Locate, match, retry and post-process for a classified document.
    fn resolve(
        &self,
        request_id: Uuid,
        angle: u16,
        template: &Template,
        tokens: &[Token],
        upright: Option<(&DynamicImage, &dyn OcrEngine)>,
    ) -> ExtractionResult {
        let result =
            ExtractionResult::classified(request_id, angle, &template.id, template.field_names());

        let regions = locate(template, tokens);
        let matcher = Matcher::new(
            template,
            self.config.overlap_threshold,
            self.config.auto_clean_text,
        );
        let mut result = matcher.run(result, tokens, &regions, None, &FieldState::Matched);

        if let Some((image, ocr)) = upright
            && !result.unresolved_fields().is_empty()
        {
            result = Retry::new(matcher, &self.config.augmentations, self.config.min_confidence)
                .run(result, image, ocr);
        }

        let mut result = apply_rules(template, result, tokens);
        result.status = status(template, &result);
        info!(
            template = %template.id,
            angle,
            status = ?result.status,
            "Extraction finished."
        );

        result
    }
}
