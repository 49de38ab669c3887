use std::fmt;

/// A pixel position in (row, column) order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    pub row: i32,
    pub col: i32,
}

impl PixelCoord {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for PixelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A detected face: inclusive top-left and bottom-right corners.
///
/// Both corners belong to the face, so a box whose corners coincide covers
/// exactly one pixel. `probability` and `landmarks` are only populated when
/// the locator is asked to annotate its boxes.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub top_left: PixelCoord,
    pub bottom_right: PixelCoord,
    pub probability: Option<f32>,
    /// Facial keypoints as (row, col), in image coordinates.
    pub landmarks: Option<Vec<(f32, f32)>>,
}

impl BoundingBox {
    pub fn new(top_left: PixelCoord, bottom_right: PixelCoord) -> Self {
        Self {
            top_left,
            bottom_right,
            probability: None,
            landmarks: None,
        }
    }

    /// Inclusive height: `bottom - top + 1`. Zero or negative when degenerate.
    pub fn height(&self) -> i64 {
        self.bottom_right.row as i64 - self.top_left.row as i64 + 1
    }

    /// Inclusive width: `right - left + 1`. Zero or negative when degenerate.
    pub fn width(&self) -> i64 {
        self.bottom_right.col as i64 - self.top_left.col as i64 + 1
    }

    pub fn is_degenerate(&self) -> bool {
        self.height() <= 0 || self.width() <= 0
    }

    /// True when every pixel of the box lies inside an image of the given size.
    pub fn fits_within(&self, image_height: u32, image_width: u32) -> bool {
        self.top_left.row >= 0
            && self.top_left.col >= 0
            && (self.bottom_right.row as i64) < image_height as i64
            && (self.bottom_right.col as i64) < image_width as i64
    }

    /// Mirror the box around the vertical center line of an image.
    pub fn mirrored(&self, image_width: u32) -> Self {
        let last_col = image_width as i32 - 1;
        let flip = |col: f32| last_col as f32 - col;
        Self {
            top_left: PixelCoord::new(self.top_left.row, last_col - self.bottom_right.col),
            bottom_right: PixelCoord::new(self.bottom_right.row, last_col - self.top_left.col),
            probability: self.probability,
            landmarks: self
                .landmarks
                .as_ref()
                .map(|pts| pts.iter().map(|&(r, c)| (r, flip(c))).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bbox(top: i32, left: i32, bottom: i32, right: i32) -> BoundingBox {
        BoundingBox::new(PixelCoord::new(top, left), PixelCoord::new(bottom, right))
    }

    #[test]
    fn test_inclusive_size() {
        let b = bbox(10, 10, 59, 59);
        assert_eq!(b.height(), 50);
        assert_eq!(b.width(), 50);
    }

    #[test]
    fn test_single_pixel_box_is_not_degenerate() {
        let b = bbox(5, 5, 5, 5);
        assert_eq!((b.height(), b.width()), (1, 1));
        assert!(!b.is_degenerate());
    }

    #[rstest]
    #[case::empty_rows(bbox(11, 10, 10, 20))]
    #[case::empty_cols(bbox(10, 21, 20, 20))]
    #[case::inverted(bbox(30, 30, 10, 10))]
    fn test_degenerate(#[case] b: BoundingBox) {
        assert!(b.is_degenerate());
    }

    #[rstest]
    #[case::inside(bbox(0, 0, 99, 79), true)]
    #[case::bottom_edge(bbox(0, 0, 100, 79), false)]
    #[case::right_edge(bbox(0, 0, 99, 80), false)]
    #[case::negative_row(bbox(-1, 0, 10, 10), false)]
    #[case::negative_col(bbox(0, -1, 10, 10), false)]
    fn test_fits_within(#[case] b: BoundingBox, #[case] expected: bool) {
        assert_eq!(b.fits_within(100, 80), expected);
    }

    #[test]
    fn test_mirrored_flips_columns_only() {
        let b = bbox(10, 0, 20, 9);
        let m = b.mirrored(100);
        assert_eq!(m.top_left, PixelCoord::new(10, 90));
        assert_eq!(m.bottom_right, PixelCoord::new(20, 99));
        assert_eq!(m.width(), b.width());
    }

    #[test]
    fn test_mirrored_twice_is_identity() {
        let mut b = bbox(3, 12, 40, 33);
        b.landmarks = Some(vec![(5.0, 15.0)]);
        assert_eq!(b.mirrored(64).mirrored(64), b);
    }

    #[test]
    fn test_pixel_coord_display() {
        assert_eq!(PixelCoord::new(4, 7).to_string(), "(4, 7)");
    }
}
