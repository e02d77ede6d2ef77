use std::collections::BTreeMap;

use tracing::*;

use crate::{
    layout::{
        region::{Candidate, FieldRegion, synthesize},
        token::{Token, document_extent},
    },
    template::{AnchorGeometry, Template},
    text::normalize::find_keyword,
};

/// Measures an anchor token: per-character width over the normalized text
/// and line height, with the matched keyword's character span.
pub fn anchor_geometry(
    token: &Token,
    normalized: &str,
    keyword_start: usize,
    keyword_end: usize,
) -> Option<AnchorGeometry> {
    let unit = token.quad.char_unit(normalized.chars().count())?;
    Some(AnchorGeometry {
        bbox: token.bbox(),
        unit,
        keyword_start,
        keyword_end,
    })
}

/// Expected region of every field that can be located.
///
/// A field's own anchor gives its exact region, first hit in scan order
/// winning. Fields without one get the weighted centroid of the candidates
/// other anchors propose for them. Fields absent from the map have no region.
pub fn locate(template: &Template, tokens: &[Token]) -> BTreeMap<String, FieldRegion> {
    let extent = document_extent(tokens);

    let mut exact: BTreeMap<String, FieldRegion> = BTreeMap::new();
    let mut candidates: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    // Hits seen so far per (field, anchor), for `occurrence`
    let mut hits: BTreeMap<(usize, usize), usize> = BTreeMap::new();

    for token in tokens {
        let normalized = token.normalized_text();

        for (field_index, field) in template.fields.iter().enumerate() {
            for (anchor_index, anchor) in field.anchors.iter().enumerate() {
                let Some((keyword, start, end)) = find_keyword(&normalized, &anchor.keywords)
                else {
                    continue;
                };

                let seen = hits.entry((field_index, anchor_index)).or_default();
                *seen += 1;
                if *seen - 1 != anchor.occurrence {
                    continue;
                }

                let Some(geometry) = anchor_geometry(token, &normalized, start, end) else {
                    debug!("Anchor `{}` on a zero-sized token, skipped.", keyword);
                    continue;
                };
                trace!("Anchor `{}` for `{}` at {:?}.", keyword, field.name, geometry.bbox);

                if let Some(rect) = anchor.region
                    && !exact.contains_key(&field.name)
                    && let Some(rect) = rect.resolve(&geometry, extent.as_ref())
                {
                    exact.insert(field.name.clone(), FieldRegion::exact(rect));
                }

                for constraint in &anchor.constrains {
                    candidates
                        .entry(constraint.field.clone())
                        .or_default()
                        .push(Candidate::new(
                            constraint.rect.resolve_edges(&geometry),
                            constraint.weight,
                        ));
                }
            }
        }
    }

    let mut regions = exact;
    for field in &template.fields {
        if regions.contains_key(&field.name) {
            continue;
        }
        let Some(field_candidates) = candidates.get(&field.name) else {
            continue;
        };
        match synthesize(field_candidates, extent.as_ref()) {
            Some(region) => {
                regions.insert(field.name.clone(), region);
            }
            None => debug!("No region could be synthesized for `{}`.", field.name),
        }
    }

    regions
}
