use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned rectangle in image coordinates.
///
/// `min` is the top-left corner and `max` the bottom-right corner; y grows
/// downward as in every image the OCR engine returns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    /// The top-left corner.
    pub min: Vec2,
    /// The bottom-right corner.
    pub max: Vec2,
}

impl Bbox {
    /// Creates a new bounding box from its two corners.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use docfield_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0));
    /// assert_eq!(bbox.width(), 10.0);
    /// ```
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from its four edges.
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            min: Vec2::new(left, top),
            max: Vec2::new(right, bottom),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// A box is degenerate when it has no positive extent on either axis.
    pub fn is_degenerate(&self) -> bool {
        !(self.max.x > self.min.x && self.max.y > self.min.y)
    }

    /// Width and height of the overlap between two boxes.
    ///
    /// Each component is clamped at zero, so disjoint boxes yield
    /// `Vec2::ZERO` on the axis where they do not meet.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use docfield_core::analysis::bbox::Bbox;
    /// let a = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 4.0));
    /// let b = Bbox::new(Vec2::new(2.0, 1.0), Vec2::new(6.0, 6.0));
    /// assert_eq!(a.overlap_extent(&b), Vec2::new(2.0, 3.0));
    /// ```
    pub fn overlap_extent(&self, other: &Self) -> Vec2 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        (max - min).max(Vec2::ZERO)
    }

    /// Fraction of this box's own height and width covered by `region`.
    ///
    /// Returns `(h1 / h, w1 / w)`. A box with zero height or width has no
    /// meaningful ratio and yields `None`.
    pub fn coverage_by(&self, region: &Self) -> Option<(f32, f32)> {
        let height = self.height();
        let width = self.width();
        if height <= 0.0 || width <= 0.0 {
            return None;
        }

        let extent = self.overlap_extent(region);

        Some((extent.y / height, extent.x / width))
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Clamps the bounding box coordinates to stay within the specified bounds.
    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds).min(max_bounds),
            max: self.max.min(max_bounds).max(min_bounds),
        }
    }

    /// Integer `[x0, y0, x1, y1]` with every coordinate clipped at zero.
    pub fn to_pixels(&self) -> [u32; 4] {
        let clip = |v: f32| v.round().max(0.0) as u32;

        [
            clip(self.min.x),
            clip(self.min.y),
            clip(self.max.x),
            clip(self.max.y),
        ]
    }
}
