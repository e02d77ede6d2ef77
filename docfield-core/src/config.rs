use std::{fs, path::Path};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{
    consts::{OVERLAP_THRESHOLD, ROTATION_SCAN_ORDER, UNRECOGNIZED_STATUS},
    error::{ConfigSnafu, DocfieldError, IoReadSnafu, JsonSnafu},
    inference::augment::Augmentation,
};

/// Tunables of the extraction pipeline.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum overlap on each axis for a token to belong to a field region.
    pub overlap_threshold: f32,
    /// Clockwise rotations tried by the classifier, in order.
    pub rotations: Vec<u16>,
    /// Retry cascade for fields left unresolved by the first pass.
    pub augmentations: Vec<Augmentation>,
    /// Sort tokens into reading order before classification.
    pub sort_tokens: bool,
    /// Repair mojibake and odd unicode in token text before cleanup.
    pub auto_clean_text: bool,
    /// Tokens recognized with lower confidence are dropped.
    pub min_confidence: f32,
    /// Status label written for documents no template accepts.
    pub unrecognized_status: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: OVERLAP_THRESHOLD,
            rotations: ROTATION_SCAN_ORDER.to_vec(),
            augmentations: Augmentation::default_cascade(),
            sort_tokens: true,
            auto_clean_text: true,
            min_confidence: 0.0,
            unrecognized_status: UNRECOGNIZED_STATUS.to_string(),
        }
    }
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        check(
            self.overlap_threshold,
            self.rotations.as_deref(),
            self.augmentations.as_deref(),
            self.min_confidence,
        )
    }
}

/// Shared by the builder and by configs loaded from JSON. `None` means the
/// default is used, which is always valid.
fn check(
    overlap_threshold: Option<f32>,
    rotations: Option<&[u16]>,
    augmentations: Option<&[Augmentation]>,
    min_confidence: Option<f32>,
) -> Result<(), String> {
    if let Some(threshold) = overlap_threshold
        && !(threshold > 0.0 && threshold <= 1.0)
    {
        return Err(format!("overlap_threshold {threshold} is outside (0, 1]"));
    }
    if let Some(rotations) = rotations {
        if rotations.is_empty() {
            return Err("rotations is empty".to_string());
        }
        if let Some(angle) = rotations.iter().find(|angle| **angle % 90 != 0 || **angle >= 360) {
            return Err(format!("rotation {angle} is not one of 0, 90, 180, 270"));
        }
    }
    if let Some(confidence) = min_confidence
        && !(0.0..=1.0).contains(&confidence)
    {
        return Err(format!("min_confidence {confidence} is outside [0, 1]"));
    }
    for augmentation in augmentations.unwrap_or_default() {
        if let Augmentation::Brightness(factor) = augmentation
            && *factor <= 0.0
        {
            return Err(format!("brightness factor {factor} must be positive"));
        }
    }
    Ok(())
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Re-runs the builder checks, for configs that did not come from the
    /// builder.
    pub fn validate(&self) -> Result<(), DocfieldError> {
        check(
            Some(self.overlap_threshold),
            Some(self.rotations.as_slice()),
            Some(self.augmentations.as_slice()),
            Some(self.min_confidence),
        )
        .map_err(|message| ConfigSnafu { message }.build())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, DocfieldError> {
        let path = path.as_ref();
        let path_name = path.display().to_string();
        let content = fs::read_to_string(path).context(IoReadSnafu { path: &path_name })?;
        let config: EngineConfig =
            serde_json::from_str(&content).context(JsonSnafu { path: &path_name })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.overlap_threshold, 0.6);
        assert_eq!(config.rotations, vec![0, 90, 180, 270]);
        assert_eq!(config.augmentations.len(), 4);
        assert_eq!(config.unrecognized_status, "unrecognized");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validation() {
        let config = EngineConfig::builder()
            .overlap_threshold(0.7f32)
            .rotations(vec![0u16, 180])
            .unrecognized_status("非身份证")
            .build()
            .unwrap();
        assert_eq!(config.rotations, vec![0, 180]);
        assert!(config.sort_tokens);

        assert!(EngineConfig::builder().overlap_threshold(1.5f32).build().is_err());
        assert!(EngineConfig::builder().rotations(vec![45u16]).build().is_err());
        assert!(
            EngineConfig::builder()
                .augmentations(vec![Augmentation::Brightness(0.0)])
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_config_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"overlap_threshold": 0.5, "augmentations": ["identity", {"brightness": 0.7}]}"#,
        )
        .unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.overlap_threshold, 0.5);
        assert_eq!(
            config.augmentations,
            vec![Augmentation::Identity, Augmentation::Brightness(0.7)]
        );
        assert_eq!(config.rotations, vec![0, 90, 180, 270]);

        fs::write(&path, r#"{"overlap_threshold": 0.0}"#).unwrap();
        assert!(matches!(
            EngineConfig::from_json_file(&path),
            Err(DocfieldError::Config { .. })
        ));
    }
}
