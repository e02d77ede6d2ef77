use std::collections::BTreeMap;

use tracing::*;

use crate::{
    analysis::bbox::Bbox,
    layout::{
        region::FieldRegion,
        result::{ExtractionResult, FieldState, FieldValue, Unresolved},
        token::Token,
    },
    template::{FieldSpec, Template, cleanup::run_chain},
};

/// Both overlap ratios of `token` against `region` exceed `threshold`.
pub fn overlaps(token: &Bbox, region: &Bbox, threshold: f32) -> bool {
    token
        .coverage_by(region)
        .is_some_and(|(height, width)| height > threshold && width > threshold)
}

/// Assigns tokens to fields by geometric overlap and runs each field's
/// cleanup chain.
#[derive(Clone, Copy, Debug)]
pub struct Matcher<'t> {
    template: &'t Template,
    threshold: f32,
    auto_clean_text: bool,
}

impl<'t> Matcher<'t> {
    pub fn new(template: &'t Template, threshold: f32, auto_clean_text: bool) -> Self {
        Self {
            template,
            threshold,
            auto_clean_text,
        }
    }

    /// Resolves every field still unresolved in `result`.
    ///
    /// `only` restricts matching to one field. Newly resolved fields carry
    /// `state`; fields that stay open keep their region and record why.
    pub fn run(
        &self,
        mut result: ExtractionResult,
        tokens: &[Token],
        regions: &BTreeMap<String, FieldRegion>,
        only: Option<&str>,
        state: &FieldState,
    ) -> ExtractionResult {
        for field in &self.template.fields {
            if only.is_some_and(|name| name != field.name) || result.is_resolved(&field.name) {
                continue;
            }

            let value = match regions.get(&field.name) {
                Some(region) => self
                    .match_field(field, region, tokens, state)
                    .unwrap_or_else(|| FieldValue {
                        text: String::new(),
                        region: Some(*region),
                        state: FieldState::Unresolved(Unresolved::NoMatch),
                    }),
                None => FieldValue::unresolved(Unresolved::NoRegion),
            };

            if let Some(reason) = value.unresolved_reason() {
                trace!("Field `{}` unresolved: {}.", field.name, reason);
            } else {
                debug!("Field `{}` = {:?}.", field.name, value.text);
            }
            result.set(&field.name, value);
        }

        result
    }

    fn prepare(&self, text: &str) -> String {
        let text = text.trim();
        if self.auto_clean_text {
            plsfix::fix_text(text, None)
        } else {
            text.to_string()
        }
    }

    fn match_field(
        &self,
        field: &FieldSpec,
        region: &FieldRegion,
        tokens: &[Token],
        state: &FieldState,
    ) -> Option<FieldValue> {
        let mut parts: Vec<String> = Vec::new();
        let mut matched: Option<Bbox> = None;

        for token in tokens {
            let bbox = token.bbox();
            if !overlaps(&bbox, &region.rect, self.threshold) {
                continue;
            }

            let Some(text) = run_chain(&field.cleanup, &self.prepare(&token.text)) else {
                trace!("Cleanup of `{}` rejected {:?}.", field.name, token.text);
                continue;
            };

            if !field.accumulate {
                return Some(FieldValue::resolved(
                    text,
                    Some(FieldRegion::matched(bbox)),
                    state.clone(),
                ));
            }

            parts.push(text);
            matched = Some(matched.map_or(bbox, |acc| acc.union(&bbox)));
        }

        let rect = matched?;
        Some(FieldValue::resolved(
            parts.join(&field.join),
            Some(FieldRegion::matched(rect)),
            state.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{
        consts::OVERLAP_THRESHOLD,
        template::{AnchorSpec, CleanupStep, OffsetRect, builtin::id_card_front},
        parse::locate::locate,
    };

    fn token(left: f32, top: f32, right: f32, bottom: f32, text: &str) -> Token {
        Token::from_bbox(Bbox::from_edges(left, top, right, bottom), text, 0.9)
    }

    fn pending(template: &Template) -> ExtractionResult {
        ExtractionResult::classified(Uuid::new_v4(), 0, &template.id, template.field_names())
    }

    #[test]
    fn test_overlap_rule_needs_both_axes() {
        let region = Bbox::from_edges(0.0, 0.0, 100.0, 20.0);
        assert!(overlaps(&Bbox::from_edges(10.0, 2.0, 50.0, 22.0), &region, 0.6));
        // Tall overlap, shifted sideways
        assert!(!overlaps(&Bbox::from_edges(70.0, 0.0, 130.0, 20.0), &region, 0.6));
        // Wide overlap, shifted down
        assert!(!overlaps(&Bbox::from_edges(10.0, 10.0, 50.0, 30.0), &region, 0.6));
        // Exactly at the threshold is not enough
        assert!(!overlaps(&Bbox::from_edges(40.0, 0.0, 140.0, 20.0), &region, 0.6));
    }

    #[test]
    fn test_overlap_monotonicity() {
        let region = Bbox::from_edges(0.0, 0.0, 100.0, 20.0);
        let token = Bbox::from_edges(30.0, 0.0, 130.0, 20.0);
        let accepted = overlaps(&token, &region, OVERLAP_THRESHOLD);
        assert!(accepted);

        // Growing the region can only keep an accepted token accepted
        for grow in [1.0, 5.0, 25.0, 100.0] {
            let larger = Bbox::from_edges(-grow, -grow, 100.0 + grow, 20.0 + grow);
            assert!(overlaps(&token, &larger, OVERLAP_THRESHOLD));
        }
    }

    #[test]
    fn test_first_accepted_token_tightens_region() {
        let template = Template::new("t", "", &[&["姓名"], &["性别"]]).field(
            FieldSpec::new("name")
                .anchor(AnchorSpec::new(&["姓名"]).region(OffsetRect::line(0.5, 8.0)))
                .clean(CleanupStep::strip_label(&["姓名"])),
        );
        let tokens = vec![
            token(10.0, 10.0, 50.0, 30.0, "姓名"),
            token(60.0, 10.0, 100.0, 30.0, "张三"),
            token(110.0, 10.0, 150.0, 30.0, "李四"),
        ];
        let regions = locate(&template, &tokens);

        let result = Matcher::new(&template, OVERLAP_THRESHOLD, true).run(
            pending(&template),
            &tokens,
            &regions,
            None,
            &FieldState::Matched,
        );
        let name = result.field("name").unwrap();
        // Label-only token rejected, next one wins
        assert_eq!(name.text, "张三");
        assert_eq!(
            name.region,
            Some(FieldRegion::matched(Bbox::from_edges(60.0, 10.0, 100.0, 30.0)))
        );
    }

    #[test]
    fn test_accumulated_address() {
        let template = id_card_front().unwrap();
        let tokens = vec![
            token(20.0, 200.0, 100.0, 220.0, "住址广东省深圳市"),
            token(60.0, 225.0, 300.0, 245.0, "南山区科技园路1号"),
            token(20.0, 300.0, 140.0, 320.0, "公民身份号码"),
        ];
        let regions = locate(&template, &tokens);

        let result = Matcher::new(&template, OVERLAP_THRESHOLD, true).run(
            pending(&template),
            &tokens,
            &regions,
            Some("address"),
            &FieldState::Matched,
        );
        let address = result.field("address").unwrap();
        assert_eq!(address.text, "广东省深圳市南山区科技园路1号");
        // Bottom edge extended to the last contributor
        assert_eq!(address.region.unwrap().rect.max.y, 245.0);

        // Restricted run leaves other fields pending
        assert_eq!(
            result.field("name").unwrap().unresolved_reason(),
            Some(Unresolved::Pending)
        );
    }

    #[test]
    fn test_unmatched_field_keeps_region() {
        let template = id_card_front().unwrap();
        let tokens = vec![token(10.0, 10.0, 50.0, 30.0, "姓名")];
        let regions = locate(&template, &tokens);

        let result = Matcher::new(&template, OVERLAP_THRESHOLD, false).run(
            pending(&template),
            &tokens,
            &regions,
            None,
            &FieldState::Matched,
        );
        let name = result.field("name").unwrap();
        assert_eq!(name.unresolved_reason(), Some(Unresolved::NoMatch));
        assert!(name.region.is_some());
        assert_eq!(
            result.field("sex").unwrap().unresolved_reason(),
            Some(Unresolved::NoMatch)
        );
        assert_eq!(
            result.field("address").unwrap().unresolved_reason(),
            Some(Unresolved::NoRegion)
        );
    }
}
