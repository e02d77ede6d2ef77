use serde::{Deserialize, Serialize};

use crate::text::normalize::{find_keyword, find_keyword_span};

use super::pattern::Pattern;

/// Separators OCR leaves between a label and its value.
const LABEL_SEPARATORS: &[char] = &[':', '：', '.', '·', ' ', '\u{3000}'];

/// Character classes used by validation and filtering steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharClass {
    Digit,
    Alnum,
    Han,
    /// Digits plus the `X` check character of identity numbers.
    IdChar,
    /// Digits, decimal point and thousands separator.
    Amount,
}

impl CharClass {
    pub fn contains(&self, ch: char) -> bool {
        match self {
            CharClass::Digit => ch.is_ascii_digit(),
            CharClass::Alnum => ch.is_ascii_alphanumeric(),
            CharClass::Han => matches!(ch, '\u{3400}'..='\u{4DBF}' | '\u{4E00}'..='\u{9FFF}'),
            CharClass::IdChar => ch.is_ascii_digit() || ch == 'X' || ch == 'x',
            CharClass::Amount => ch.is_ascii_digit() || ch == '.' || ch == ',',
        }
    }
}

/// One step of a field's cleanup chain.
///
/// Every step maps the candidate text to a new text, or rejects the token
/// by returning `None`; a rejected token is skipped and matching carries on
/// with the next one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleanupStep {
    /// Remove a literal label prefix. A token holding only the label is
    /// rejected; a single remaining character keeps the full text.
    StripLabel { labels: Vec<String> },
    /// Keep what follows the first keyword found anywhere in the text.
    AfterKeyword { keywords: Vec<String> },
    /// Keep the first capture group (or whole match) of `pattern`.
    Capture {
        pattern: Pattern,
        #[serde(default = "default_true")]
        required: bool,
    },
    /// Reject tokens containing any of these keywords.
    RejectKeywords { keywords: Vec<String> },
    /// Keep only characters of `class`.
    Retain { class: CharClass },
    /// Delete every listed character.
    Remove { chars: String },
    /// Reject tokens where fewer than `min_ratio` of the characters are in `class`.
    Require { class: CharClass, min_ratio: f32 },
    /// Reject tokens outside a character-count range.
    Length {
        #[serde(default)]
        min: usize,
        #[serde(default)]
        max: Option<usize>,
    },
    Replace { from: String, to: String },
}

fn default_true() -> bool {
    true
}

impl CleanupStep {
    pub fn strip_label(labels: &[&str]) -> Self {
        CleanupStep::StripLabel {
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn after_keyword(keywords: &[&str]) -> Self {
        CleanupStep::AfterKeyword {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn reject(keywords: &[&str]) -> Self {
        CleanupStep::RejectKeywords {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Required capture: tokens the pattern does not match are rejected.
    pub fn capture(pattern: Pattern) -> Self {
        CleanupStep::Capture {
            pattern,
            required: true,
        }
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        match self {
            CleanupStep::StripLabel { labels } => strip_label(text, labels),
            CleanupStep::AfterKeyword { keywords } => after_keyword(text, keywords),
            CleanupStep::Capture { pattern, required } => capture(text, pattern, *required),
            CleanupStep::RejectKeywords { keywords } => reject_keywords(text, keywords),
            CleanupStep::Retain { class } => retain(text, *class),
            CleanupStep::Remove { chars } => {
                Some(text.chars().filter(|ch| !chars.contains(*ch)).collect())
            }
            CleanupStep::Require { class, min_ratio } => require(text, *class, *min_ratio),
            CleanupStep::Length { min, max } => length(text, *min, *max),
            CleanupStep::Replace { from, to } => Some(text.replace(from.as_str(), to)),
        }
    }
}

/// Runs a cleanup chain. An empty result counts as a rejection.
pub fn run_chain(steps: &[CleanupStep], text: &str) -> Option<String> {
    let cleaned = steps
        .iter()
        .try_fold(text.trim().to_string(), |text, step| step.apply(&text))?;
    let cleaned = cleaned.trim();

    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Labels and keywords are matched on normalized text, so OCR spacing
/// inside a label ("姓 名") does not hide it.
fn strip_label(text: &str, labels: &[String]) -> Option<String> {
    let text = text.trim_start();
    let Some(end) = labels.iter().find_map(|label| {
        find_keyword_span(text, std::slice::from_ref(label))
            .filter(|(_, span)| span.start == 0)
            .map(|(_, span)| span.end)
    }) else {
        return Some(text.to_string());
    };

    let rest = text[end..].trim_matches(LABEL_SEPARATORS);
    match rest.chars().count() {
        0 => None,
        1 => Some(text.to_string()),
        _ => Some(rest.to_string()),
    }
}

fn after_keyword(text: &str, keywords: &[String]) -> Option<String> {
    let Some((_, span)) = find_keyword_span(text, keywords) else {
        return Some(text.to_string());
    };

    let rest = text[span.end..].trim_matches(LABEL_SEPARATORS);
    (!rest.is_empty()).then(|| rest.to_string())
}

fn capture(text: &str, pattern: &Pattern, required: bool) -> Option<String> {
    match pattern.regex().captures(text) {
        Some(caps) => caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string()),
        None if required => None,
        None => Some(text.to_string()),
    }
}

fn reject_keywords(text: &str, keywords: &[String]) -> Option<String> {
    let normalized = crate::text::normalize(text);
    find_keyword(&normalized, keywords)
        .is_none()
        .then(|| text.to_string())
}

fn retain(text: &str, class: CharClass) -> Option<String> {
    let kept: String = text.chars().filter(|ch| class.contains(*ch)).collect();
    (!kept.is_empty()).then_some(kept)
}

fn require(text: &str, class: CharClass, min_ratio: f32) -> Option<String> {
    let (total, hits) = text
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .fold((0usize, 0usize), |(total, hits), ch| {
            (total + 1, hits + usize::from(class.contains(ch)))
        });
    if total == 0 {
        return None;
    }

    (hits as f32 / total as f32 >= min_ratio).then(|| text.to_string())
}

fn length(text: &str, min: usize, max: Option<usize>) -> Option<String> {
    let count = text.chars().count();
    (count >= min && max.is_none_or(|max| count <= max)).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_label() {
        let step = CleanupStep::strip_label(&["姓名"]);
        assert_eq!(step.apply("姓名张三").as_deref(), Some("张三"));
        assert_eq!(step.apply("姓名：张三").as_deref(), Some("张三"));
        // Label only
        assert_eq!(step.apply("姓名"), None);
        // Single character suffix keeps the full text
        assert_eq!(step.apply("姓名李").as_deref(), Some("姓名李"));
        // No label
        assert_eq!(step.apply("张三").as_deref(), Some("张三"));
        // Label split by OCR spacing
        assert_eq!(step.apply("姓 名 张三").as_deref(), Some("张三"));
        assert_eq!(step.apply("姓　名：王五").as_deref(), Some("王五"));
        // Label elsewhere in the text is not a prefix
        assert_eq!(step.apply("张三姓名").as_deref(), Some("张三姓名"));
    }

    #[test]
    fn test_after_keyword() {
        let step = CleanupStep::after_keyword(&["民族"]);
        assert_eq!(step.apply("性别男民族汉").as_deref(), Some("汉"));
        assert_eq!(step.apply("民族"), None);
        assert_eq!(step.apply("汉").as_deref(), Some("汉"));
        assert_eq!(step.apply("民 族 汉").as_deref(), Some("汉"));
        assert_eq!(step.apply("性别 男 民　族：回").as_deref(), Some("回"));
    }

    #[test]
    fn test_capture() {
        let step = CleanupStep::capture(Pattern::new("[男女]").unwrap());
        assert_eq!(step.apply("性别男").as_deref(), Some("男"));
        assert_eq!(step.apply("性别"), None);

        let optional = CleanupStep::Capture {
            pattern: Pattern::new(r"(\d{2}/\d{2})").unwrap(),
            required: false,
        };
        assert_eq!(optional.apply("VALID THRU 09/28").as_deref(), Some("09/28"));
        assert_eq!(optional.apply("09-28").as_deref(), Some("09-28"));
    }

    #[test]
    fn test_reject_and_require() {
        let reject = CleanupStep::reject(&["公民身份号码"]);
        assert_eq!(reject.apply("公民身份 号码"), None);
        assert_eq!(reject.apply("张三").as_deref(), Some("张三"));

        let require = CleanupStep::Require {
            class: CharClass::IdChar,
            min_ratio: 0.9,
        };
        assert_eq!(
            require.apply("44030419900307123X").as_deref(),
            Some("44030419900307123X")
        );
        assert_eq!(require.apply("住址广东省深圳市"), None);
    }

    #[test]
    fn test_retain_and_length() {
        let retain = CleanupStep::Retain {
            class: CharClass::Digit,
        };
        assert_eq!(
            retain.apply("6222 0212 3456 7890").as_deref(),
            Some("6222021234567890")
        );
        assert_eq!(retain.apply("卡号"), None);

        let length = CleanupStep::Length {
            min: 12,
            max: Some(19),
        };
        assert!(length.apply("6222021234567890").is_some());
        assert!(length.apply("62220212").is_none());
    }

    #[test]
    fn test_run_chain() {
        let steps = vec![
            CleanupStep::strip_label(&["性别"]),
            CleanupStep::capture(Pattern::new("[男女]").unwrap()),
        ];
        assert_eq!(run_chain(&steps, " 性别男 ").as_deref(), Some("男"));
        assert_eq!(run_chain(&steps, "性别"), None);
        assert_eq!(run_chain(&[], "   "), None);
    }

    #[test]
    fn test_cleanup_json() {
        let json = r#"[
            {"kind": "strip_label", "labels": ["住址"]},
            {"kind": "capture", "pattern": "(\\d+)", "required": false},
            {"kind": "length", "min": 2}
        ]"#;
        let steps: Vec<CleanupStep> = serde_json::from_str(json).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(run_chain(&steps, "住址某街道12号").as_deref(), Some("12"));
    }
}
