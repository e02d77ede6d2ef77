use serde::{Deserialize, Serialize};

/// Output format applied by [`PostRule::Canonicalize`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalFormat {
    /// `YYYY-MM-DD`.
    Date,
    /// `YYYY-MM-DD~YYYY-MM-DD`, or `YYYY-MM-DD~长期` for open-ended validity.
    DateRange,
    Digits,
    /// Upper-case check character, no separators.
    IdNumber,
    /// Digits with at most one decimal point, thousands separators removed.
    Amount,
    /// All whitespace removed.
    Compact,
}

fn default_male() -> String {
    "男".to_string()
}

fn default_female() -> String {
    "女".to_string()
}

/// Deterministic rule run after matching and retry, in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PostRule {
    Default {
        field: String,
        value: String,
    },
    SexFromId {
        id_field: String,
        target: String,
        #[serde(default = "default_male")]
        male: String,
        #[serde(default = "default_female")]
        female: String,
    },
    BirthFromId {
        id_field: String,
        target: String,
    },
    /// Earliest and latest dates among all tokens, for documents printing an
    /// issue date and an expiry date without reliable labels.
    DatePair {
        first: String,
        second: String,
        #[serde(default)]
        exclude_keywords: Vec<String>,
    },
    Canonicalize {
        field: String,
        format: CanonicalFormat,
    },
}

impl PostRule {
    pub fn default_value(field: &str, value: &str) -> Self {
        PostRule::Default {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn sex_from_id(id_field: &str, target: &str) -> Self {
        PostRule::SexFromId {
            id_field: id_field.to_string(),
            target: target.to_string(),
            male: default_male(),
            female: default_female(),
        }
    }

    pub fn birth_from_id(id_field: &str, target: &str) -> Self {
        PostRule::BirthFromId {
            id_field: id_field.to_string(),
            target: target.to_string(),
        }
    }

    pub fn date_pair(first: &str, second: &str, exclude_keywords: &[&str]) -> Self {
        PostRule::DatePair {
            first: first.to_string(),
            second: second.to_string(),
            exclude_keywords: exclude_keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn canonicalize(field: &str, format: CanonicalFormat) -> Self {
        PostRule::Canonicalize {
            field: field.to_string(),
            format,
        }
    }

    /// Every field name the rule reads or writes.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            PostRule::Default { field, .. } | PostRule::Canonicalize { field, .. } => {
                vec![field.as_str()]
            }
            PostRule::SexFromId {
                id_field, target, ..
            }
            | PostRule::BirthFromId { id_field, target } => {
                vec![id_field.as_str(), target.as_str()]
            }
            PostRule::DatePair { first, second, .. } => vec![first.as_str(), second.as_str()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_rule_json() {
        let json = r#"[
            {"rule": "default", "field": "ethnicity", "value": "汉"},
            {"rule": "sex_from_id", "id_field": "id_number", "target": "sex"},
            {"rule": "canonicalize", "field": "valid_period", "format": "date_range"}
        ]"#;
        let rules: Vec<PostRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0], PostRule::default_value("ethnicity", "汉"));
        assert_eq!(rules[1], PostRule::sex_from_id("id_number", "sex"));
        assert_eq!(rules[2].fields(), vec!["valid_period"]);
    }
}
