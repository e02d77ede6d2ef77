use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::ResultExt;

use crate::error::{DocfieldError, PatternSnafu};

/// A regular expression compiled once when the template is built or loaded.
///
/// Serializes as its source string; a pattern that fails to compile fails
/// template deserialization instead of surfacing at match time.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, DocfieldError> {
        Regex::new(pattern)
            .map(Self)
            .context(PatternSnafu { pattern })
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_serde() {
        let pattern: Pattern = serde_json::from_str(r#""[男女]""#).unwrap();
        assert!(pattern.regex().is_match("性别男"));
        assert_eq!(serde_json::to_string(&pattern).unwrap(), r#""[男女]""#);

        // Invalid source fails at load time
        assert!(serde_json::from_str::<Pattern>(r#""(unclosed""#).is_err());
        assert!(matches!(
            Pattern::new("(unclosed"),
            Err(DocfieldError::Pattern { .. })
        ));
    }
}
