use serde::{Deserialize, Serialize};

use crate::analysis::bbox::Bbox;

/// How a field region was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionOrigin {
    /// Offset directly from the field's own anchor token.
    Exact,
    /// Weighted centroid of candidates contributed by other anchors.
    Synthesized,
    /// Tightened to the token(s) that resolved the field.
    Matched,
}

/// A field's expected rectangle in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRegion {
    pub rect: Bbox,
    pub origin: RegionOrigin,
}

impl FieldRegion {
    pub fn exact(rect: Bbox) -> Self {
        Self {
            rect,
            origin: RegionOrigin::Exact,
        }
    }

    pub fn matched(rect: Bbox) -> Self {
        Self {
            rect,
            origin: RegionOrigin::Matched,
        }
    }
}

/// A candidate rectangle with possibly unconstrained edges.
///
/// Edges are `[left, top, right, bottom]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub edges: [Option<f32>; 4],
    pub weight: f32,
}

impl Candidate {
    pub fn new(edges: [Option<f32>; 4], weight: f32) -> Self {
        Self { edges, weight }
    }
}

/// Weight-normalized centroid of candidate rectangles.
///
/// Each edge is `Σ(edge · weight) / Σ(weight)` over the candidates that
/// constrain it. Candidates with a non-positive or non-finite weight are
/// ignored. An edge nobody constrains takes its value from `fallback`; with
/// no fallback the region cannot be formed. Returns `None` when no candidate
/// contributes at all or the resulting rectangle is degenerate.
pub fn synthesize(candidates: &[Candidate], fallback: Option<&Bbox>) -> Option<FieldRegion> {
    let usable: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.weight.is_finite() && c.weight > 0.0)
        .collect();
    if usable.is_empty() {
        return None;
    }

    let fallback_edges = fallback.map(|b| [b.min.x, b.min.y, b.max.x, b.max.y]);

    let mut edges = [0.0f32; 4];
    for (index, edge) in edges.iter_mut().enumerate() {
        // Summed in f64 so candidates agreeing on an edge reproduce it exactly
        let (sum, weight) = usable
            .iter()
            .filter_map(|c| {
                let weight = f64::from(c.weight);
                c.edges[index].map(|value| (f64::from(value) * weight, weight))
            })
            .fold((0.0f64, 0.0f64), |(s, w), (value, weight)| (s + value, w + weight));

        *edge = if weight > 0.0 {
            (sum / weight) as f32
        } else {
            fallback_edges?[index]
        };
    }

    let rect = Bbox::from_edges(edges[0], edges[1], edges[2], edges[3]);
    if rect.is_degenerate() {
        return None;
    }

    Some(FieldRegion {
        rect,
        origin: RegionOrigin::Synthesized,
    })
}
