pub mod builtin;
pub mod cleanup;
pub mod pattern;
pub mod rules;
pub mod set;
pub mod spec;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{DocfieldError, InvalidTemplateSnafu};

pub use cleanup::{CharClass, CleanupStep};
pub use pattern::Pattern;
pub use rules::{CanonicalFormat, PostRule};
pub use set::TemplateSet;
pub use spec::{
    AnchorGeometry, AnchorSpec, Constraint, Edge, FieldSpec, OffsetRect, Reference, Unit,
};

fn default_version() -> u32 {
    1
}

/// Declarative description of one document type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub description: String,
    /// Keyword groups in top-to-bottom, left-to-right document order. Each
    /// group holds alternative spellings of one anchor.
    pub orientation: Vec<Vec<String>>,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub post: Vec<PostRule>,
}

impl Template {
    pub fn new(id: &str, description: &str, orientation: &[&[&str]]) -> Self {
        Self {
            id: id.to_string(),
            version: default_version(),
            description: description.to_string(),
            orientation: orientation
                .iter()
                .map(|group| group.iter().map(|k| k.to_string()).collect())
                .collect(),
            fields: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn rule(mut self, rule: PostRule) -> Self {
        self.post.push(rule);
        self
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }

    /// Checks the references inside the template. Runs on every template
    /// before it enters a [`TemplateSet`].
    pub fn validate(&self) -> Result<(), DocfieldError> {
        let template = self.id.as_str();
        ensure!(
            !template.trim().is_empty(),
            InvalidTemplateSnafu {
                template,
                message: "empty id",
            }
        );
        ensure!(
            self.orientation.iter().filter(|g| !g.is_empty()).count() >= 2,
            InvalidTemplateSnafu {
                template,
                message: "orientation needs at least two keyword groups",
            }
        );
        ensure!(
            !self.fields.is_empty(),
            InvalidTemplateSnafu {
                template,
                message: "no fields",
            }
        );

        let mut names = HashSet::new();
        for field in &self.fields {
            ensure!(
                names.insert(field.name.as_str()),
                InvalidTemplateSnafu {
                    template,
                    message: format!("duplicate field `{}`", field.name),
                }
            );
        }

        for field in &self.fields {
            for anchor in &field.anchors {
                ensure!(
                    anchor.keywords.iter().any(|k| !k.trim().is_empty()),
                    InvalidTemplateSnafu {
                        template,
                        message: format!("anchor of `{}` has no keyword", field.name),
                    }
                );
                for constraint in &anchor.constrains {
                    ensure!(
                        names.contains(constraint.field.as_str()),
                        InvalidTemplateSnafu {
                            template,
                            message: format!(
                                "anchor of `{}` constrains unknown field `{}`",
                                field.name, constraint.field
                            ),
                        }
                    );
                    ensure!(
                        constraint.weight > 0.0,
                        InvalidTemplateSnafu {
                            template,
                            message: format!(
                                "constraint on `{}` needs a positive weight",
                                constraint.field
                            ),
                        }
                    );
                }
            }
        }

        for rule in &self.post {
            if let Some(unknown) = rule.fields().into_iter().find(|f| !names.contains(f)) {
                return InvalidTemplateSnafu {
                    template,
                    message: format!("post rule references unknown field `{unknown}`"),
                }
                .fail();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Template {
        Template::new("sample", "two fields", &[&["姓名"], &["性别"]])
            .field(
                FieldSpec::new("name")
                    .anchor(AnchorSpec::new(&["姓名"]).region(OffsetRect::line(0.5, 8.0))),
            )
            .field(
                FieldSpec::new("sex")
                    .anchor(AnchorSpec::new(&["性别"]).region(OffsetRect::line(0.5, 3.0))),
            )
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        let duplicate = sample().field(FieldSpec::new("name"));
        assert!(matches!(
            duplicate.validate(),
            Err(DocfieldError::InvalidTemplate { .. })
        ));

        let unknown_rule = sample().rule(PostRule::default_value("ethnicity", "汉"));
        assert!(unknown_rule.validate().is_err());

        let mut one_group = sample();
        one_group.orientation.truncate(1);
        assert!(one_group.validate().is_err());

        let unknown_constraint = sample().field(
            FieldSpec::new("birth").anchor(AnchorSpec::new(&["出生"]).constrains(
                "address",
                OffsetRect::line(0.0, 1.0),
                1.0,
            )),
        );
        assert!(unknown_constraint.validate().is_err());
    }

    #[test]
    fn test_template_json() {
        let json = r#"{
            "id": "visa",
            "orientation": [["签证"], ["姓名"]],
            "fields": [{"name": "name", "anchors": [{"keywords": ["姓名"]}]}],
            "post": [{"rule": "canonicalize", "field": "name", "format": "compact"}]
        }"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(template.version, 1);
        assert!(template.validate().is_ok());
        assert_eq!(template.field_names().collect::<Vec<_>>(), vec!["name"]);
    }
}
