use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::*;

use crate::{
    layout::{
        result::{ExtractionResult, FieldState, FieldValue, Status},
        token::Token,
    },
    template::{CanonicalFormat, PostRule, Template},
    text::{
        date::{canonical_date, canonical_date_range, find_dates, format_date},
        id_number::{IdNumber, Sex},
        normalize::{contains_any, normalize},
    },
};

/// Applies the template's post rules in declaration order.
///
/// Defaulted and derived values only fill fields that are still
/// unresolved; canonicalization rewrites resolved text in place.
pub fn apply_rules(
    template: &Template,
    mut result: ExtractionResult,
    tokens: &[Token],
) -> ExtractionResult {
    for rule in &template.post {
        match rule {
            PostRule::Default { field, value } => {
                fill(&mut result, field, value.clone(), FieldState::Defaulted);
            }
            PostRule::SexFromId {
                id_field,
                target,
                male,
                female,
            } => {
                if let Some(id) = id_number(&result, id_field) {
                    let sex = match id.sex() {
                        Sex::Male => male,
                        Sex::Female => female,
                    };
                    fill(&mut result, target, sex.clone(), FieldState::Derived);
                }
            }
            PostRule::BirthFromId { id_field, target } => {
                if let Some(id) = id_number(&result, id_field) {
                    fill(&mut result, target, format_date(id.birth_date()), FieldState::Derived);
                }
            }
            PostRule::DatePair {
                first,
                second,
                exclude_keywords,
            } => {
                result = date_pair(result, tokens, first, second, exclude_keywords);
            }
            PostRule::Canonicalize { field, format } => {
                let Some(value) = result.fields.get_mut(field.as_str()) else {
                    continue;
                };
                if !value.is_resolved() {
                    continue;
                }
                match canonicalize(&value.text, *format) {
                    Some(text) => value.text = text,
                    None => debug!("`{}` left as {:?}, not a {:?}.", field, value.text, format),
                }
            }
        }
    }

    result
}

/// `ok` when every field is resolved, `blurry` otherwise.
pub fn status(template: &Template, result: &ExtractionResult) -> Status {
    let missing: Vec<&str> = template
        .fields
        .iter()
        .filter(|field| !result.is_resolved(&field.name))
        .map(|field| field.name.as_str())
        .collect();

    if missing.is_empty() {
        Status::Ok
    } else {
        debug!("Fields unresolved: {:?}.", missing);
        Status::Blurry
    }
}

pub fn canonicalize(text: &str, format: CanonicalFormat) -> Option<String> {
    match format {
        CanonicalFormat::Date => canonical_date(text),
        CanonicalFormat::DateRange => canonical_date_range(text),
        CanonicalFormat::Digits => {
            let digits: String = text.chars().filter(char::is_ascii_digit).collect();
            (!digits.is_empty()).then_some(digits)
        }
        CanonicalFormat::IdNumber => IdNumber::parse(text).map(|id| id.as_str().to_string()),
        CanonicalFormat::Amount => canonical_amount(text),
        CanonicalFormat::Compact => {
            let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
            (!compact.is_empty()).then_some(compact)
        }
    }
}

/// Digits with at most one decimal point. Thousands separators, currency
/// signs and anything after a second point are dropped.
fn canonical_amount(text: &str) -> Option<String> {
    let mut amount = String::new();
    let mut seen_point = false;
    for ch in text.chars() {
        match ch {
            '0'..='9' => amount.push(ch),
            '.' if !seen_point && !amount.is_empty() => {
                seen_point = true;
                amount.push(ch);
            }
            '.' => break,
            _ => {}
        }
    }

    let amount = amount.trim_end_matches('.');
    (!amount.is_empty()).then(|| amount.to_string())
}

fn fill(result: &mut ExtractionResult, field: &str, text: String, state: FieldState) {
    if result.is_resolved(field) {
        return;
    }
    trace!("`{}` filled with {:?} ({:?}).", field, text, state);
    result.set(field, FieldValue::resolved(text, None, state));
}

fn id_number(result: &ExtractionResult, field: &str) -> Option<IdNumber> {
    if !result.is_resolved(field) {
        return None;
    }
    let id = IdNumber::parse(result.text(field)?)?;
    if !id.checksum_valid() {
        warn!("Identity number in `{}` fails its checksum, deriving anyway.", field);
    }
    Some(id)
}

fn date_pair(
    mut result: ExtractionResult,
    tokens: &[Token],
    first: &str,
    second: &str,
    exclude_keywords: &[String],
) -> ExtractionResult {
    let dates: BTreeSet<NaiveDate> = tokens
        .iter()
        .filter(|token| !contains_any(&normalize(&token.text), exclude_keywords))
        .flat_map(|token| find_dates(&token.text))
        .collect();
    if dates.len() < 2 {
        return result;
    }

    let formatted: Vec<String> = dates.into_iter().map(format_date).collect();
    match (result.is_resolved(first), result.is_resolved(second)) {
        (false, false) => {
            if let (Some(earliest), Some(latest)) = (formatted.first(), formatted.last()) {
                fill(&mut result, first, earliest.clone(), FieldState::Derived);
                fill(&mut result, second, latest.clone(), FieldState::Derived);
            }
        }
        (true, false) | (false, true) => {
            let (known, open) = if result.is_resolved(first) {
                (first, second)
            } else {
                (second, first)
            };
            let taken = result.text(known).and_then(canonical_date);
            if let Some(date) = formatted.iter().find(|date| Some(*date) != taken.as_ref()) {
                fill(&mut result, open, date.clone(), FieldState::Derived);
            }
        }
        (true, true) => {}
    }

    result
}
