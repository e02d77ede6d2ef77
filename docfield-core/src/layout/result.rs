use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::region::FieldRegion;

/// Why a field has no value yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unresolved {
    /// Not yet processed by the matcher.
    Pending,
    /// No anchor located the field and no candidate could be synthesized.
    NoRegion,
    /// A region exists but no token passed the overlap test and cleanup.
    NoMatch,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unresolved::Pending => write!(f, "not processed yet"),
            Unresolved::NoRegion => write!(f, "no anchor located the field"),
            Unresolved::NoMatch => write!(f, "no token matched the field region"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum FieldState {
    Unresolved(Unresolved),
    /// Matched from the full-image OCR pass.
    Matched,
    /// Matched during retry under the named augmentation.
    Recovered(String),
    /// Filled with a template default.
    Defaulted,
    /// Derived from another field or a global token scan.
    Derived,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub text: String,
    pub region: Option<FieldRegion>,
    pub state: FieldState,
}

impl FieldValue {
    pub fn unresolved(reason: Unresolved) -> Self {
        Self {
            text: String::new(),
            region: None,
            state: FieldState::Unresolved(reason),
        }
    }

    pub fn resolved(
        text: impl Into<String>,
        region: Option<FieldRegion>,
        state: FieldState,
    ) -> Self {
        Self {
            text: text.into(),
            region,
            state,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.state, FieldState::Unresolved(_))
    }

    pub fn unresolved_reason(&self) -> Option<Unresolved> {
        match self.state {
            FieldState::Unresolved(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    Blurry,
    Unrecognized,
}

/// Result of one extraction call.
///
/// Each pipeline stage takes the result by value and returns the updated
/// copy; the value is never shared between calls.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub request_id: Uuid,
    /// Clockwise rotation that made the document upright.
    pub angle: u16,
    pub template: Option<String>,
    pub status: Status,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ExtractionResult {
    pub fn unrecognized(request_id: Uuid) -> Self {
        Self {
            request_id,
            angle: 0,
            template: None,
            status: Status::Unrecognized,
            fields: BTreeMap::new(),
        }
    }

    /// A fresh result for a classified document, every field pending.
    pub fn classified<'a, I>(request_id: Uuid, angle: u16, template: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            request_id,
            angle,
            template: Some(template.to_string()),
            status: Status::Blurry,
            fields: fields
                .into_iter()
                .map(|name| (name.to_string(), FieldValue::unresolved(Unresolved::Pending)))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.text.as_str())
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FieldValue::is_resolved)
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn unresolved_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_resolved())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Takes from `attempt` only the fields that are unresolved here.
    ///
    /// Fields already resolved in `self` are kept as they are, whatever the
    /// attempt says about them.
    pub fn merge_unresolved(mut self, attempt: ExtractionResult) -> Self {
        for (name, value) in attempt.fields {
            let open = self.fields.get(&name).is_none_or(|current| !current.is_resolved());
            if open && value.is_resolved() {
                self.fields.insert(name, value);
            }
        }
        self
    }

    /// Flat output record. Unresolved fields appear as empty strings.
    pub fn to_record(&self, unrecognized_label: &str) -> ExtractionRecord {
        let status = match self.status {
            Status::Ok => "ok".to_string(),
            Status::Blurry => "blurry".to_string(),
            Status::Unrecognized => unrecognized_label.to_string(),
        };

        ExtractionRecord {
            request_id: self.request_id,
            angle: self.angle,
            status,
            template: self.template.clone(),
            fields: self
                .fields
                .iter()
                .map(|(name, value)| (name.clone(), value.text.clone()))
                .collect(),
            regions: self
                .fields
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .region
                        .map(|region| (name.clone(), region.rect.to_pixels()))
                })
                .collect(),
        }
    }
}

/// Serialized per-document output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub request_id: Uuid,
    pub angle: u16,
    pub status: String,
    pub template: Option<String>,
    pub fields: BTreeMap<String, String>,
    pub regions: BTreeMap<String, [u32; 4]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::bbox::Bbox;

    #[test]
    fn test_merge_keeps_resolved_fields() {
        let id = Uuid::new_v4();
        let mut base = ExtractionResult::classified(id, 0, "t", ["name", "sex"]);
        base.set(
            "name",
            FieldValue::resolved("张三", None, FieldState::Matched),
        );

        let mut attempt = base.clone();
        attempt.set(
            "name",
            FieldValue::resolved("张二", None, FieldState::Recovered("grayscale".into())),
        );
        attempt.set(
            "sex",
            FieldValue::resolved("男", None, FieldState::Recovered("grayscale".into())),
        );

        let merged = base.merge_unresolved(attempt);
        assert_eq!(merged.text("name"), Some("张三"));
        assert_eq!(merged.text("sex"), Some("男"));
        assert!(merged.unresolved_fields().is_empty());
    }

    #[test]
    fn test_record_clips_regions() {
        let mut result = ExtractionResult::classified(Uuid::new_v4(), 90, "t", ["name", "address"]);
        result.status = Status::Blurry;
        result.set(
            "name",
            FieldValue::resolved(
                "张三",
                Some(FieldRegion::matched(Bbox::from_edges(-4.0, 10.2, 90.0, 30.0))),
                FieldState::Matched,
            ),
        );
        result.set("address", FieldValue::unresolved(Unresolved::NoMatch));

        let record = result.to_record("unrecognized");
        assert_eq!(record.status, "blurry");
        assert_eq!(record.angle, 90);
        assert_eq!(record.fields["address"], "");
        assert_eq!(record.regions["name"], [0, 10, 90, 30]);
        assert!(!record.regions.contains_key("address"));
    }

    #[test]
    fn test_unrecognized_record_label() {
        let result = ExtractionResult::unrecognized(Uuid::new_v4());
        let record = result.to_record("非身份证");
        assert_eq!(record.status, "非身份证");
        assert!(record.fields.is_empty());
    }
}
