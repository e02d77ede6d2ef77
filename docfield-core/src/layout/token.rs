use std::cmp::Ordering;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{bbox::Bbox, quad::Quad},
    consts::LINE_TOLERANCE,
    text::normalize,
};

/// One text region returned by the OCR engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub quad: Quad,
    pub text: String,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl Token {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }

    /// Token covering an axis-aligned rectangle.
    pub fn from_bbox(bbox: Bbox, text: impl Into<String>, confidence: f32) -> Self {
        Self::new(Quad::from_bbox(&bbox), text, confidence)
    }

    pub fn bbox(&self) -> Bbox {
        self.quad.bbox()
    }

    pub fn normalized_text(&self) -> String {
        normalize(&self.text)
    }

    /// Same token shifted by `offset`, used to move tokens recognized on a
    /// crop back into the frame of the full image.
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            quad: self.quad.translate(offset),
            text: self.text.clone(),
            confidence: self.confidence,
        }
    }
}

/// OCR output for one rotation of the input image.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RotationTokens {
    /// Clockwise rotation in degrees applied before recognition.
    pub angle: u16,
    pub tokens: Vec<Token>,
}

impl RotationTokens {
    pub fn new(angle: u16, tokens: Vec<Token>) -> Self {
        Self { angle, tokens }
    }
}

/// Sorts tokens top-to-bottom, then left-to-right within a line.
///
/// Two tokens share a line when their vertical centers differ by less than
/// `LINE_TOLERANCE` of the smaller token height. Lines are formed greedily
/// from the topmost token so the result does not depend on input order.
pub fn sort_reading_order(tokens: &mut Vec<Token>) {
    tokens.sort_by(|a, b| {
        a.bbox()
            .center()
            .y
            .partial_cmp(&b.bbox().center().y)
            .unwrap_or(Ordering::Equal)
    });

    let mut lines: Vec<Vec<Token>> = Vec::new();
    for token in tokens.drain(..) {
        let bbox = token.bbox();
        let same_line = lines.last().and_then(|line| line.first()).is_some_and(|head| {
            let head_box = head.bbox();
            let tolerance = head_box.height().min(bbox.height()) * LINE_TOLERANCE;
            (bbox.center().y - head_box.center().y).abs() < tolerance
        });

        match lines.last_mut() {
            Some(line) if same_line => line.push(token),
            _ => lines.push(vec![token]),
        }
    }

    for mut line in lines {
        line.sort_by(|a, b| {
            a.bbox()
                .min
                .x
                .partial_cmp(&b.bbox().min.x)
                .unwrap_or(Ordering::Equal)
        });
        tokens.extend(line);
    }
}

/// Bounding box of every token, the fallback extent for unconstrained edges.
pub fn document_extent(tokens: &[Token]) -> Option<Bbox> {
    tokens
        .iter()
        .map(Token::bbox)
        .reduce(|acc, bbox| acc.union(&bbox))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(left: f32, top: f32, right: f32, bottom: f32, text: &str) -> Token {
        Token::from_bbox(Bbox::from_edges(left, top, right, bottom), text, 0.9)
    }

    #[test]
    fn test_sort_reading_order() {
        let mut tokens = vec![
            token(120.0, 52.0, 160.0, 72.0, "男"),
            token(10.0, 10.0, 90.0, 30.0, "姓名张三"),
            token(10.0, 50.0, 70.0, 70.0, "性别"),
            token(10.0, 100.0, 200.0, 120.0, "住址"),
        ];
        sort_reading_order(&mut tokens);

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["姓名张三", "性别", "男", "住址"]);
    }

    #[test]
    fn test_document_extent() {
        let tokens = vec![
            token(10.0, 10.0, 90.0, 30.0, "a"),
            token(5.0, 50.0, 70.0, 80.0, "b"),
        ];
        assert_eq!(
            document_extent(&tokens),
            Some(Bbox::from_edges(5.0, 10.0, 90.0, 80.0))
        );
        assert_eq!(document_extent(&[]), None);
    }

    #[test]
    fn test_token_deserialize() {
        let json = r#"{"quad": [[0,0],[40,0],[40,20],[0,20]], "text": "性别男"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.confidence, 1.0);
        assert_eq!(token.bbox().width(), 40.0);

        let moved = token.translated(Vec2::new(10.0, 5.0));
        assert_eq!(moved.bbox(), Bbox::from_edges(10.0, 5.0, 50.0, 25.0));
    }
}
