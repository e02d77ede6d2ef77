use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::analysis::bbox::Bbox;

use super::cleanup::CleanupStep;

/// Point of the anchor token an edge is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    Left,
    Right,
    Top,
    Bottom,
    /// Where the matched keyword begins inside the token.
    KeywordStart,
    /// Where the matched keyword ends inside the token.
    KeywordEnd,
}

/// Which anchor unit an offset is counted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Per-character width of the anchor token.
    Width,
    /// Line height of the anchor token.
    Height,
}

/// One edge of a region: `reference + offset * unit`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: Reference,
    pub offset: f32,
    /// Defaults to height for `top`/`bottom` references, width otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl Edge {
    pub fn new(from: Reference, offset: f32) -> Self {
        Self {
            from,
            offset,
            unit: None,
        }
    }

    pub fn left(offset: f32) -> Self {
        Self::new(Reference::Left, offset)
    }

    pub fn right(offset: f32) -> Self {
        Self::new(Reference::Right, offset)
    }

    pub fn top(offset: f32) -> Self {
        Self::new(Reference::Top, offset)
    }

    pub fn bottom(offset: f32) -> Self {
        Self::new(Reference::Bottom, offset)
    }

    pub fn keyword_start(offset: f32) -> Self {
        Self::new(Reference::KeywordStart, offset)
    }

    pub fn keyword_end(offset: f32) -> Self {
        Self::new(Reference::KeywordEnd, offset)
    }

    /// Counts the offset in line heights, for horizontal distances on
    /// documents whose value column sits far from a short label.
    pub fn in_heights(mut self) -> Self {
        self.unit = Some(Unit::Height);
        self
    }

    pub fn resolve(&self, anchor: &AnchorGeometry) -> f32 {
        let bbox = &anchor.bbox;
        let base = match self.from {
            Reference::Left => bbox.min.x,
            Reference::Right => bbox.max.x,
            Reference::Top => bbox.min.y,
            Reference::Bottom => bbox.max.y,
            Reference::KeywordStart => bbox.min.x + anchor.keyword_start as f32 * anchor.unit.x,
            Reference::KeywordEnd => bbox.min.x + anchor.keyword_end as f32 * anchor.unit.x,
        };

        let unit = match self.unit {
            Some(unit) => unit,
            None => match self.from {
                Reference::Top | Reference::Bottom => Unit::Height,
                _ => Unit::Width,
            },
        };
        let scale = match unit {
            Unit::Width => anchor.unit.x,
            Unit::Height => anchor.unit.y,
        };

        base + self.offset * scale
    }
}

/// A rectangle expressed relative to an anchor token.
///
/// An edge left as `None` is unconstrained by this anchor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetRect {
    #[serde(default)]
    pub left: Option<Edge>,
    #[serde(default)]
    pub top: Option<Edge>,
    #[serde(default)]
    pub right: Option<Edge>,
    #[serde(default)]
    pub bottom: Option<Edge>,
}

impl OffsetRect {
    pub fn new(left: Edge, top: Edge, right: Edge, bottom: Edge) -> Self {
        Self {
            left: Some(left),
            top: Some(top),
            right: Some(right),
            bottom: Some(bottom),
        }
    }

    /// The anchor's own line, from `before` units left of the token to
    /// `after` units right of it.
    pub fn line(before: f32, after: f32) -> Self {
        Self::new(
            Edge::left(-before),
            Edge::top(-0.25),
            Edge::right(after),
            Edge::bottom(0.25),
        )
    }

    /// Rows `from..to` line heights below the anchor's top edge, spanning
    /// `left..right` character widths from the anchor's left edge.
    pub fn rows(from: f32, to: f32, left: f32, right: f32) -> Self {
        Self::new(
            Edge::left(left),
            Edge::top(from),
            Edge::left(right),
            Edge::top(to),
        )
    }

    /// Same as [`OffsetRect::rows`] with horizontal offsets counted in line
    /// heights.
    pub fn rows_in_heights(from: f32, to: f32, left: f32, right: f32) -> Self {
        Self::new(
            Edge::left(left).in_heights(),
            Edge::top(from),
            Edge::left(right).in_heights(),
            Edge::top(to),
        )
    }

    pub fn resolve_edges(&self, anchor: &AnchorGeometry) -> [Option<f32>; 4] {
        [self.left, self.top, self.right, self.bottom].map(|edge| edge.map(|e| e.resolve(anchor)))
    }

    /// Resolves to a rectangle, taking unconstrained edges from `extent`.
    pub fn resolve(&self, anchor: &AnchorGeometry, extent: Option<&Bbox>) -> Option<Bbox> {
        let fallback = extent.map(|b| [b.min.x, b.min.y, b.max.x, b.max.y]);
        let edges = self.resolve_edges(anchor);

        let mut resolved = [0.0f32; 4];
        for (index, edge) in edges.iter().enumerate() {
            resolved[index] = match edge {
                Some(value) => *value,
                None => fallback?[index],
            };
        }

        let rect = Bbox::from_edges(resolved[0], resolved[1], resolved[2], resolved[3]);
        (!rect.is_degenerate()).then_some(rect)
    }
}

/// Measurements of a token that matched an anchor keyword.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorGeometry {
    pub bbox: Bbox,
    /// Per-character width and line height.
    pub unit: Vec2,
    /// Character offsets of the matched keyword inside the token text.
    pub keyword_start: usize,
    pub keyword_end: usize,
}

/// A region an anchor proposes for some other field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub field: String,
    pub rect: OffsetRect,
    pub weight: f32,
}

impl Constraint {
    pub fn new(field: impl Into<String>, rect: OffsetRect, weight: f32) -> Self {
        Self {
            field: field.into(),
            rect,
            weight,
        }
    }
}

/// Literal keywords that locate a field, and what they imply for others.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub keywords: Vec<String>,
    /// Which matching token to use, counted from zero in scan order.
    #[serde(default)]
    pub occurrence: usize,
    /// Region of the owning field relative to the anchor.
    #[serde(default)]
    pub region: Option<OffsetRect>,
    #[serde(default)]
    pub constrains: Vec<Constraint>,
}

impl AnchorSpec {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.as_ref().to_string()).collect(),
            occurrence: 0,
            region: None,
            constrains: Vec::new(),
        }
    }

    pub fn region(mut self, rect: OffsetRect) -> Self {
        self.region = Some(rect);
        self
    }

    pub fn occurrence(mut self, occurrence: usize) -> Self {
        self.occurrence = occurrence;
        self
    }

    pub fn constrains(mut self, field: &str, rect: OffsetRect, weight: f32) -> Self {
        self.constrains.push(Constraint::new(field, rect, weight));
        self
    }
}

/// Static description of one field of a document template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub anchors: Vec<AnchorSpec>,
    #[serde(default)]
    pub cleanup: Vec<CleanupStep>,
    /// Concatenate every matching token instead of stopping at the first.
    #[serde(default)]
    pub accumulate: bool,
    /// Separator between accumulated tokens.
    #[serde(default)]
    pub join: String,
}

impl FieldSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            anchors: Vec::new(),
            cleanup: Vec::new(),
            accumulate: false,
            join: String::new(),
        }
    }

    pub fn anchor(mut self, anchor: AnchorSpec) -> Self {
        self.anchors.push(anchor);
        self
    }

    pub fn clean(mut self, step: CleanupStep) -> Self {
        self.cleanup.push(step);
        self
    }

    pub fn accumulate(mut self, join: &str) -> Self {
        self.accumulate = true;
        self.join = join.to_string();
        self
    }
}
