use tracing::*;

use crate::{
    layout::token::Token,
    template::{Template, TemplateSet},
    text::normalize::{contains_any, normalize},
};

/// Accepted rotation and template for a document.
#[derive(Clone, Debug)]
pub struct Classification<'t> {
    pub angle: u16,
    pub template: &'t Template,
    pub rank: Vec<usize>,
}

/// 1-based index of the first token containing each keyword group, in group
/// order. Groups that occur nowhere are left out.
pub fn rank<S: AsRef<str>>(normalized: &[S], groups: &[Vec<String>]) -> Vec<usize> {
    groups
        .iter()
        .filter_map(|group| {
            normalized
                .iter()
                .position(|text| contains_any(text.as_ref(), group))
                .map(|index| index + 1)
        })
        .collect()
}

/// At least two groups found, in non-decreasing order. Equal neighbours are
/// allowed since one merged token can carry two consecutive anchors.
pub fn is_ordered(rank: &[usize]) -> bool {
    rank.len() > 1 && rank.windows(2).all(|pair| pair[0] <= pair[1])
}

/// First template, in registration order, whose anchors appear in order.
pub fn match_template<'t>(
    tokens: &[Token],
    templates: &'t TemplateSet,
) -> Option<(&'t Template, Vec<usize>)> {
    let normalized: Vec<String> = tokens.iter().map(|t| normalize(&t.text)).collect();

    templates.iter().find_map(|template| {
        let rank = rank(&normalized, &template.orientation);
        trace!("Template `{}` rank {:?}.", template.id, rank);
        is_ordered(&rank).then_some((template, rank))
    })
}

/// Tries each rotation in the given order and stops at the first accepted
/// one. Rotations are the outer loop, so an upright match for any template
/// beats a rotated match for an earlier template.
pub fn classify<'t, 'a, I>(rotations: I, templates: &'t TemplateSet) -> Option<Classification<'t>>
where
    I: IntoIterator<Item = (u16, &'a [Token])>,
{
    rotations.into_iter().find_map(|(angle, tokens)| {
        let (template, rank) = match_template(tokens, templates)?;
        debug!("Classified as `{}` at {} degrees.", template.id, angle);
        Some(Classification {
            angle,
            template,
            rank,
        })
    })
}
