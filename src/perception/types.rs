use serde::{Deserialize, Serialize};

/// Screen position in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One OCR result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Corners in order: top-left, top-right, bottom-right, bottom-left.
    pub bbox: [Point; 4],
    pub text: String,
    /// 0.0–1.0
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: [Point; 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }

    /// Axis-aligned box from its top-left and bottom-right corners.
    pub fn from_rect(x1: i32, y1: i32, x2: i32, y2: i32, text: impl Into<String>, confidence: f32) -> Self {
        Self::new(
            [
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ],
            text,
            confidence,
        )
    }

    /// Midpoint of the diagonal between corner 0 and corner 2.
    pub fn centroid(&self) -> Point {
        let [tl, _, br, _] = self.bbox;
        let mid = |a: i32, b: i32| ((i64::from(a) + i64::from(b)) / 2) as i32;
        Point::new(mid(tl.x, br.x), mid(tl.y, br.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_uses_the_diagonal() {
        let d = Detection::from_rect(50, 180, 150, 220, "进入避难所", 0.9);
        assert_eq!(d.centroid(), Point::new(100, 200));
    }

    #[test]
    fn centroid_of_saturated_corners_does_not_overflow() {
        let d = Detection::from_rect(i32::MAX - 10, i32::MAX - 4, i32::MAX, i32::MAX, "x", 0.5);
        assert_eq!(d.centroid(), Point::new(i32::MAX - 5, i32::MAX - 2));
    }

    #[test]
    fn centroid_ignores_skewed_side_corners() {
        let d = Detection::new(
            [
                Point::new(10, 10),
                Point::new(500, -40),
                Point::new(30, 50),
                Point::new(-300, 90),
            ],
            "x",
            0.5,
        );
        assert_eq!(d.centroid(), Point::new(20, 30));
    }
}
