//! Foundation types shared by the loops and the scan converter.
//!
//! Rounding, mask coverage, half-open clip rectangles and filling rules.

use core::ops::Sub;

/// Round a non-negative value to the nearest integer, half up.
#[inline]
pub fn uround(v: f64) -> u32 {
    (v + 0.5) as u32
}

/// Per-pixel mask coverage; 0 leaves the destination alone, 255 is full.
pub type CoverType = u8;

// ============================================================================
// Filling rule
// ============================================================================

/// Winding rule used by the polygon filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillingRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillingRule {
    /// Mask applied to the running winding counter before testing it
    /// against zero.
    #[inline]
    pub fn counter_mask(self) -> i32 {
        match self {
            FillingRule::NonZero => -1,
            FillingRule::EvenOdd => 1,
        }
    }
}

// ============================================================================
// Rect
// ============================================================================

/// A half-open rectangle: `x1 <= x < x2`, `y1 <= y < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect<T: Copy> {
    pub x1: T,
    pub y1: T,
    pub x2: T,
    pub y2: T,
}

impl<T: Copy + PartialOrd + Sub<Output = T>> Rect<T> {
    pub fn new(x1: T, y1: T, x2: T, y2: T) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Intersect `self` with `r` in place. Returns `false` if the result
    /// is empty.
    pub fn clip(&mut self, r: &Self) -> bool {
        if self.x2 > r.x2 {
            self.x2 = r.x2;
        }
        if self.y2 > r.y2 {
            self.y2 = r.y2;
        }
        if self.x1 < r.x1 {
            self.x1 = r.x1;
        }
        if self.y1 < r.y1 {
            self.y1 = r.y1;
        }
        !self.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !(self.x1 < self.x2 && self.y1 < self.y2)
    }

    pub fn hit_test(&self, x: T, y: T) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    pub fn width(&self) -> T {
        self.x2 - self.x1
    }

    pub fn height(&self) -> T {
        self.y2 - self.y1
    }
}

pub type RectI = Rect<i32>;

impl RectI {
    /// Rectangle covering `0..width` by `0..height`.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uround() {
        assert_eq!(uround(0.5), 1);
        assert_eq!(uround(1.4), 1);
        assert_eq!(uround(254.5), 255);
    }

    #[test]
    fn test_counter_mask() {
        assert_eq!(2 & FillingRule::NonZero.counter_mask(), 2);
        assert_eq!(2 & FillingRule::EvenOdd.counter_mask(), 0);
        assert_eq!(-1 & FillingRule::EvenOdd.counter_mask(), 1);
    }

    #[test]
    fn test_rect_clip_half_open() {
        let mut r = RectI::new(-5, -5, 20, 8);
        assert!(r.clip(&RectI::from_size(10, 10)));
        assert_eq!(r, RectI::new(0, 0, 10, 8));
        assert!(r.hit_test(9, 7));
        assert!(!r.hit_test(10, 7));
        assert!(!r.hit_test(9, 8));
    }

    #[test]
    fn test_rect_clip_disjoint() {
        let mut r = RectI::new(20, 20, 30, 30);
        assert!(!r.clip(&RectI::from_size(10, 10)));
        assert!(r.is_empty());
    }
}
