//! Packed 32-bit ARGB colors and 8-bit channel arithmetic.
//!
//! The canonical intermediate format of every general loop is a
//! non-premultiplied `0xAARRGGBB` word. `Argb` unpacks it into channels;
//! the fixed-point helpers here are shared by the generic blend loops and
//! by the hand-written direct loops so both produce identical pixels.

use crate::basics::uround;

const BASE_SHIFT: u32 = 8;
const BASE_MASK: u32 = (1 << BASE_SHIFT) - 1;
const BASE_MSB: u32 = 1 << (BASE_SHIFT - 1);

/// Non-premultiplied 8-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Argb {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Argb {
    pub const TRANSPARENT: Argb = Argb::new(0, 0, 0, 0);
    pub const BLACK: Argb = Argb::new(255, 0, 0, 0);
    pub const WHITE: Argb = Argb::new(255, 255, 255, 255);

    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(255, r, g, b)
    }

    #[inline]
    pub const fn from_packed(v: u32) -> Self {
        Self {
            a: (v >> 24) as u8,
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    #[inline]
    pub const fn to_packed(self) -> u32 {
        ((self.a as u32) << 24) | ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Gray level of the color channels.
    #[inline]
    pub fn luminance(&self) -> u8 {
        ((77 * self.r as u32 + 150 * self.g as u32 + 29 * self.b as u32 + 128) >> 8) as u8
    }

    pub fn from_gray(v: u8) -> Self {
        Self::opaque(v, v, v)
    }

    /// Multiply the color channels by alpha.
    pub fn premultiply(self) -> Self {
        match self.a {
            255 => self,
            0 => Self::TRANSPARENT,
            a => Self::new(
                a,
                multiply(self.r, a),
                multiply(self.g, a),
                multiply(self.b, a),
            ),
        }
    }

    /// Inverse of `premultiply`, saturating channels that exceed alpha.
    pub fn demultiply(self) -> Self {
        match self.a {
            255 => self,
            0 => Self::TRANSPARENT,
            a => Self::new(
                a,
                demultiply_value(self.r, a),
                demultiply_value(self.g, a),
                demultiply_value(self.b, a),
            ),
        }
    }

    /// Alpha scaled by an 8-bit factor such as extra alpha or mask coverage.
    pub fn scale_alpha(self, k: u8) -> Self {
        Self { a: multiply(self.a, k), ..self }
    }
}

impl From<u32> for Argb {
    fn from(v: u32) -> Self {
        Self::from_packed(v)
    }
}

impl From<Argb> for u32 {
    fn from(c: Argb) -> Self {
        c.to_packed()
    }
}

// ============================================================================
// Channel arithmetic
// ============================================================================

/// `a * b / 255`, rounded.
#[inline]
pub fn multiply(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + BASE_MSB;
    (((t >> BASE_SHIFT) + t) >> BASE_SHIFT) as u8
}

/// `a * 255 / b`, saturating at 255.
#[inline]
pub fn demultiply_value(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        0
    } else if a >= b {
        BASE_MASK as u8
    } else {
        ((a as u32 * BASE_MASK + (b as u32 >> 1)) / b as u32) as u8
    }
}

#[inline]
pub fn to_unit(a: u8) -> f64 {
    a as f64 / BASE_MASK as f64
}

#[inline]
pub fn from_unit(v: f64) -> u8 {
    uround(v.clamp(0.0, 1.0) * BASE_MASK as f64) as u8
}

/// Extra alpha in `[0, 1]` as an 8-bit factor.
#[inline]
pub fn alpha_to_u8(extra_alpha: f32) -> u8 {
    from_unit(extra_alpha as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing() {
        let c = Argb::from_packed(0x80FF4020);
        assert_eq!(c, Argb::new(0x80, 0xFF, 0x40, 0x20));
        assert_eq!(c.to_packed(), 0x80FF4020);
        assert_eq!(u32::from(Argb::WHITE), 0xFFFFFFFF);
    }

    #[test]
    fn test_multiply_bounds() {
        assert_eq!(multiply(255, 255), 255);
        assert_eq!(multiply(255, 0), 0);
        assert_eq!(multiply(128, 255), 128);
        assert_eq!(multiply(128, 128), 64);
    }

    #[test]
    fn test_premultiply_demultiply() {
        let c = Argb::new(128, 255, 128, 0);
        let p = c.premultiply();
        assert_eq!(p, Argb::new(128, 128, 64, 0));
        let d = p.demultiply();
        assert_eq!(d.a, 128);
        assert_eq!(d.r, 255);
        assert!((d.g as i32 - 128).abs() <= 1);
        assert_eq!(Argb::new(0, 9, 9, 9).premultiply(), Argb::TRANSPARENT);
    }

    #[test]
    fn test_luminance() {
        assert_eq!(Argb::WHITE.luminance(), 255);
        assert_eq!(Argb::BLACK.luminance(), 0);
        assert_eq!(Argb::opaque(255, 0, 0).luminance(), 77);
    }

    #[test]
    fn test_alpha_to_u8() {
        assert_eq!(alpha_to_u8(1.0), 255);
        assert_eq!(alpha_to_u8(0.0), 0);
        assert_eq!(alpha_to_u8(2.0), 255);
        assert_eq!(alpha_to_u8(0.5), 128);
    }
}
