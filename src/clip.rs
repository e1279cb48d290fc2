//! Outcode clipping of one segment against a `[min, max]` interval.
//!
//! Both the draw and fill paths of the scan converter clip one axis at a
//! time: `a` is the coordinate being tested and `b` the other coordinate,
//! which is interpolated when `a` is moved onto the boundary. The same code
//! runs on `f32` path coordinates and on `i32` fixed-point coordinates;
//! interpolation always happens in `f64`.

// ============================================================================
// Clip coordinates
// ============================================================================

/// A coordinate type the clipper can interpolate.
pub trait ClipCoord: Copy + PartialOrd {
    fn to_f64(self) -> f64;
    /// Conversion back truncates toward zero for integer types.
    fn from_f64(v: f64) -> Self;
}

impl ClipCoord for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl ClipCoord for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl ClipCoord for i32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i32
    }
}

// ============================================================================
// Clip results
// ============================================================================

/// Outcome of clipping the first endpoint of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipResult {
    /// Moved onto the lower boundary.
    MinClipped,
    /// Moved onto the upper boundary.
    MaxClipped,
    NotClipped,
    /// Both endpoints are outside on the same side.
    Invisible,
}

impl ClipResult {
    #[inline]
    pub fn is_clipped(self) -> bool {
        matches!(self, ClipResult::MinClipped | ClipResult::MaxClipped)
    }
}

#[inline]
fn interpolate<T: ClipCoord>(a1: T, b1: T, a2: T, b2: T, t: f64) -> T {
    let (a1, b1, a2, b2) = (a1.to_f64(), b1.to_f64(), a2.to_f64(), b2.to_f64());
    T::from_f64(b1 + (t - a1) * (b2 - b1) / (a2 - a1))
}

/// Clip endpoint `(a1, b1)` of the segment towards `(a2, b2)` against
/// `[min, max]` on the `a` axis.
///
/// Only the first endpoint is moved; call again with the endpoints swapped
/// to clip the other end.
pub fn test_and_clip<T: ClipCoord>(
    min: T,
    max: T,
    a1: &mut T,
    b1: &mut T,
    a2: T,
    b2: T,
) -> ClipResult {
    let (res, t) = if *a1 < min {
        if a2 < min {
            return ClipResult::Invisible;
        }
        (ClipResult::MinClipped, min)
    } else if *a1 > max {
        if a2 > max {
            return ClipResult::Invisible;
        }
        (ClipResult::MaxClipped, max)
    } else {
        return ClipResult::NotClipped;
    };
    *b1 = interpolate(*a1, *b1, a2, b2, t.to_f64());
    *a1 = t;
    res
}

/// Clip-and-clamp used by the filler for the horizontal axis.
///
/// Behaves like [`test_and_clip`] but returns the point `(a3, b3)` that
/// joins the boundary to the original `b1`: a segment hanging off the
/// lower side is walked back along the boundary so its vertical extent,
/// and thus its winding contribution, is preserved. A segment entirely
/// below `min` collapses onto the boundary instead of being dropped; one
/// entirely above `max` stays invisible since the filler closes right-side
/// spans itself.
pub fn clip_clamp<T: ClipCoord>(
    min: T,
    max: T,
    a1: &mut T,
    b1: &mut T,
    a2: &mut T,
    b2: T,
) -> (ClipResult, T, T) {
    let mut a3 = *a1;
    let b3 = *b1;
    let res = match test_and_clip(min, max, a1, b1, *a2, b2) {
        res @ (ClipResult::MinClipped | ClipResult::MaxClipped) => {
            a3 = *a1;
            res
        }
        ClipResult::Invisible if *a1 > max => ClipResult::Invisible,
        ClipResult::Invisible => {
            *a1 = min;
            *a2 = min;
            ClipResult::NotClipped
        }
        ClipResult::NotClipped => ClipResult::NotClipped,
    };
    (res, a3, b3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_untouched() {
        let (mut a, mut b) = (5.0f32, 1.0f32);
        assert_eq!(test_and_clip(0.0, 10.0, &mut a, &mut b, 7.0, 3.0), ClipResult::NotClipped);
        assert_eq!((a, b), (5.0, 1.0));
    }

    #[test]
    fn test_min_clip_interpolates() {
        let (mut a, mut b) = (-10.0f64, 0.0f64);
        let r = test_and_clip(0.0, 100.0, &mut a, &mut b, 10.0, 20.0);
        assert_eq!(r, ClipResult::MinClipped);
        assert!(r.is_clipped());
        assert_eq!(a, 0.0);
        assert!((b - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_clip_integer_truncates() {
        let (mut a, mut b) = (30i32, 0i32);
        let r = test_and_clip(0, 20, &mut a, &mut b, 0, 7);
        assert_eq!(r, ClipResult::MaxClipped);
        assert_eq!(a, 20);
        // 0 + (20 - 30) * 7 / -30 = 2.33
        assert_eq!(b, 2);
    }

    #[test]
    fn test_invisible_same_side() {
        let (mut a, mut b) = (-5, 0);
        assert_eq!(test_and_clip(0, 10, &mut a, &mut b, -1, 5), ClipResult::Invisible);
        let (mut a, mut b) = (15, 0);
        assert_eq!(test_and_clip(0, 10, &mut a, &mut b, 11, 5), ClipResult::Invisible);
    }

    #[test]
    fn test_nan_is_not_clipped() {
        let (mut a, mut b) = (f32::NAN, 0.0f32);
        assert_eq!(test_and_clip(0.0, 1.0, &mut a, &mut b, 0.5, 0.5), ClipResult::NotClipped);
    }

    #[test]
    fn test_clamp_left_walks_back_to_boundary() {
        let (mut x1, mut y1, mut x2) = (-10i32, 0i32, 10i32);
        let (res, x3, y3) = clip_clamp(0, 100, &mut x1, &mut y1, &mut x2, 20);
        assert_eq!(res, ClipResult::MinClipped);
        assert_eq!((x1, y1), (0, 10));
        // Boundary point at the original y.
        assert_eq!((x3, y3), (0, 0));
    }

    #[test]
    fn test_clamp_fully_left_collapses() {
        let (mut x1, mut y1, mut x2) = (-10i32, 0i32, -3i32);
        let (res, _, _) = clip_clamp(0, 100, &mut x1, &mut y1, &mut x2, 20);
        assert_eq!(res, ClipResult::NotClipped);
        assert_eq!((x1, x2), (0, 0));
        assert_eq!(y1, 0);
    }

    #[test]
    fn test_clamp_fully_right_invisible() {
        let (mut x1, mut y1, mut x2) = (200i32, 0i32, 150i32);
        let (res, _, _) = clip_clamp(0, 100, &mut x1, &mut y1, &mut x2, 20);
        assert_eq!(res, ClipResult::Invisible);
    }
}
