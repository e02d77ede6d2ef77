use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bbox::Bbox;

/// Four corner points of a detected text box, clockwise from top-left.
///
/// Detection models emit slightly skewed quadrilaterals rather than
/// axis-aligned rectangles, so edge lengths are measured point to point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quad(pub [Vec2; 4]);

impl Quad {
    pub fn new(top_left: Vec2, top_right: Vec2, bottom_right: Vec2, bottom_left: Vec2) -> Self {
        Self([top_left, top_right, bottom_right, bottom_left])
    }

    /// Axis-aligned quad covering `bbox`.
    pub fn from_bbox(bbox: &Bbox) -> Self {
        Self::new(
            bbox.min,
            Vec2::new(bbox.max.x, bbox.min.y),
            bbox.max,
            Vec2::new(bbox.min.x, bbox.max.y),
        )
    }

    pub fn bbox(&self) -> Bbox {
        let [a, b, c, d] = self.0;

        Bbox::new(a.min(b).min(c).min(d), a.max(b).max(c).max(d))
    }

    /// Mean of the left and right edge lengths.
    pub fn mean_height(&self) -> f32 {
        let [tl, tr, br, bl] = self.0;

        (tl.distance(bl) + tr.distance(br)) / 2.0
    }

    /// Mean of the top and bottom edge lengths.
    pub fn mean_width(&self) -> f32 {
        let [tl, tr, br, bl] = self.0;

        (tl.distance(tr) + bl.distance(br)) / 2.0
    }

    /// Per-character unit `(w, h)` for a box holding `chars` characters.
    ///
    /// `w` is the mean edge width shared evenly across the characters and
    /// `h` the mean edge height. Returns `None` for empty text or a
    /// collapsed quad.
    pub fn char_unit(&self, chars: usize) -> Option<Vec2> {
        if chars == 0 {
            return None;
        }

        let unit = Vec2::new(self.mean_width() / chars as f32, self.mean_height());
        (unit.x > 0.0 && unit.y > 0.0).then_some(unit)
    }

    pub fn translate(&self, offset: Vec2) -> Self {
        Self(self.0.map(|point| point + offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_bbox() {
        let quad = Quad::new(
            Vec2::new(10.0, 12.0),
            Vec2::new(90.0, 10.0),
            Vec2::new(91.0, 30.0),
            Vec2::new(11.0, 32.0),
        );
        let bbox = quad.bbox();
        assert_eq!(bbox.min, Vec2::new(10.0, 10.0));
        assert_eq!(bbox.max, Vec2::new(91.0, 32.0));
    }

    #[test]
    fn test_quad_char_unit() {
        let quad = Quad::from_bbox(&Bbox::from_edges(0.0, 0.0, 80.0, 20.0));
        assert_eq!(quad.mean_width(), 80.0);
        assert_eq!(quad.mean_height(), 20.0);
        assert_eq!(quad.char_unit(4), Some(Vec2::new(20.0, 20.0)));

        // No characters, no unit
        assert_eq!(quad.char_unit(0), None);

        // Collapsed quad
        let flat = Quad::from_bbox(&Bbox::from_edges(0.0, 5.0, 80.0, 5.0));
        assert_eq!(flat.char_unit(4), None);
    }

    #[test]
    fn test_quad_translate() {
        let quad = Quad::from_bbox(&Bbox::from_edges(0.0, 0.0, 10.0, 5.0));
        let moved = quad.translate(Vec2::new(3.0, 4.0));
        assert_eq!(moved.bbox(), Bbox::from_edges(3.0, 4.0, 13.0, 9.0));
    }

    #[test]
    fn test_quad_serde_points() {
        let quad: Quad = serde_json::from_str("[[0,0],[10,0],[10,5],[0,5]]").unwrap();
        assert_eq!(quad.bbox(), Bbox::from_edges(0.0, 0.0, 10.0, 5.0));
    }
}
