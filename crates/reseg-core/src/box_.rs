//! Box - Rectangle regions
//!
//! Used for scope offsets (the bounding box of a text region within the
//! page) and for the extent of masks and polygons.

use crate::error::{Error, Result};

/// A rectangle region
///
/// A small `Copy` type; right and bottom edges are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Box {
    /// Left x coordinate
    pub x: i32,
    /// Top y coordinate
    pub y: i32,
    /// Width
    pub w: i32,
    /// Height
    pub h: i32,
}

impl Box {
    /// Create a new box
    ///
    /// # Errors
    ///
    /// Returns an error if width or height is negative.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Result<Self> {
        if w < 0 || h < 0 {
            return Err(Error::InvalidParameter(format!(
                "box dimensions must be non-negative: w={}, h={}",
                w, h
            )));
        }
        Ok(Self { x, y, w, h })
    }

    /// Create a box without validation
    pub const fn new_unchecked(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Smallest box holding all given integer points
    ///
    /// The box covers the pixels the points fall on, so a single point
    /// gives a 1x1 box. Returns `None` for an empty slice.
    pub fn from_points(points: &[(i32, i32)]) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self {
            x: min_x,
            y: min_y,
            w: max_x - min_x + 1,
            h: max_y - min_y + 1,
        })
    }

    /// Get the right x coordinate (exclusive)
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Get the bottom y coordinate (exclusive)
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Get the area
    #[inline]
    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Check if the box is empty (zero area)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Compute the intersection of two boxes
    pub fn intersect(&self, other: &Box) -> Option<Box> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Box {
                x,
                y,
                w: right - x,
                h: bottom - y,
            })
        } else {
            None
        }
    }

    /// Clip the box to a `width` x `height` raster anchored at the origin
    pub fn clip(&self, width: u32, height: u32) -> Option<Box> {
        self.intersect(&Box::new_unchecked(0, 0, width as i32, height as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_creation() {
        let b = Box::new(10, 20, 100, 50).unwrap();
        assert_eq!(b.right(), 110);
        assert_eq!(b.bottom(), 70);
        assert_eq!(b.area(), 5000);
        assert!(Box::new(0, 0, -1, 5).is_err());
    }

    #[test]
    fn test_from_points() {
        let b = Box::from_points(&[(3, 4), (10, 2), (5, 9)]).unwrap();
        assert_eq!(b, Box::new_unchecked(3, 2, 8, 8));
        assert!(Box::from_points(&[]).is_none());
    }

    #[test]
    fn test_box_intersection() {
        let b1 = Box::new_unchecked(0, 0, 100, 100);
        let b2 = Box::new_unchecked(50, 50, 100, 100);
        assert_eq!(b1.intersect(&b2), Some(Box::new_unchecked(50, 50, 50, 50)));

        let b3 = Box::new_unchecked(100, 0, 10, 10);
        assert!(b1.intersect(&b3).is_none());
    }

    #[test]
    fn test_clip() {
        let b = Box::new_unchecked(-5, 90, 20, 20);
        assert_eq!(b.clip(100, 100), Some(Box::new_unchecked(0, 90, 15, 10)));
        assert!(Box::new_unchecked(200, 0, 5, 5).clip(100, 100).is_none());
    }
}
