//! Porter-Duff compositing rules and per-pixel ARGB blending.
//!
//! Every rule is expressed as a pair of fractions `(Fs, Fd)` applied in a
//! premultiplied f64 working space:
//!
//! ```text
//! Cr = Cs * Fs + Cd * Fd
//! Ar = As * Fs + Ad * Fd
//! ```
//!
//! Mask coverage `c` folds in as `Fs' = c * Fs` and `Fd' = (1 - c) + c * Fd`,
//! so a partially covered pixel interpolates between the destination and the
//! fully composited result. Colors enter and leave non-premultiplied.
//!
//! XOR *mode* (raw word toggling) is not a blend rule; it lives in
//! `CompositeInfo::xor_pixel` and is carried out by the pixel layouts.

use crate::basics::CoverType;
use crate::color::{from_unit, to_unit, Argb};
use crate::type_lattice::CompositeType;

// ============================================================================
// CompositeRule
// ============================================================================

/// The twelve Porter-Duff rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CompositeRule {
    Clear = 0,
    Src = 1,
    Dst = 2,
    #[default]
    SrcOver = 3,
    DstOver = 4,
    SrcIn = 5,
    DstIn = 6,
    SrcOut = 7,
    DstOut = 8,
    SrcAtop = 9,
    DstAtop = 10,
    Xor = 11,
}

impl CompositeRule {
    pub const ALL: [CompositeRule; 12] = [
        CompositeRule::Clear,
        CompositeRule::Src,
        CompositeRule::Dst,
        CompositeRule::SrcOver,
        CompositeRule::DstOver,
        CompositeRule::SrcIn,
        CompositeRule::DstIn,
        CompositeRule::SrcOut,
        CompositeRule::DstOut,
        CompositeRule::SrcAtop,
        CompositeRule::DstAtop,
        CompositeRule::Xor,
    ];

    /// Source and destination fractions for the given alphas.
    #[inline]
    pub fn fractions(self, sa: f64, da: f64) -> (f64, f64) {
        match self {
            CompositeRule::Clear => (0.0, 0.0),
            CompositeRule::Src => (1.0, 0.0),
            CompositeRule::Dst => (0.0, 1.0),
            CompositeRule::SrcOver => (1.0, 1.0 - sa),
            CompositeRule::DstOver => (1.0 - da, 1.0),
            CompositeRule::SrcIn => (da, 0.0),
            CompositeRule::DstIn => (0.0, sa),
            CompositeRule::SrcOut => (1.0 - da, 0.0),
            CompositeRule::DstOut => (0.0, 1.0 - sa),
            CompositeRule::SrcAtop => (da, 1.0 - sa),
            CompositeRule::DstAtop => (1.0 - da, sa),
            CompositeRule::Xor => (1.0 - da, 1.0 - sa),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompositeRule::Clear => "Clear",
            CompositeRule::Src => "Src",
            CompositeRule::Dst => "Dst",
            CompositeRule::SrcOver => "SrcOver",
            CompositeRule::DstOver => "DstOver",
            CompositeRule::SrcIn => "SrcIn",
            CompositeRule::DstIn => "DstIn",
            CompositeRule::SrcOut => "SrcOut",
            CompositeRule::DstOut => "DstOut",
            CompositeRule::SrcAtop => "SrcAtop",
            CompositeRule::DstAtop => "DstAtop",
            CompositeRule::Xor => "Xor",
        }
    }
}

// ============================================================================
// CompositeInfo
// ============================================================================

/// Per-invocation compositing parameters.
///
/// `xor_pixel` and `alpha_mask` are only consulted by XOR-mode loops:
/// destination words become `dst ^ ((src ^ xor_pixel) & !alpha_mask)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeInfo {
    pub rule: CompositeRule,
    pub extra_alpha: f32,
    /// Raw XOR mode instead of a Porter-Duff blend.
    pub xor: bool,
    pub xor_pixel: u32,
    pub alpha_mask: u32,
}

impl CompositeInfo {
    pub fn new(rule: CompositeRule) -> Self {
        Self {
            rule,
            extra_alpha: 1.0,
            xor: false,
            xor_pixel: 0,
            alpha_mask: 0,
        }
    }

    pub fn with_extra_alpha(mut self, extra_alpha: f32) -> Self {
        self.extra_alpha = extra_alpha.clamp(0.0, 1.0);
        self
    }

    /// XOR-mode parameters. The rule is irrelevant for XOR loops.
    pub fn xor_mode(xor_pixel: u32, alpha_mask: u32) -> Self {
        Self {
            rule: CompositeRule::Src,
            extra_alpha: 1.0,
            xor: true,
            xor_pixel,
            alpha_mask,
        }
    }

    pub fn extra_alpha_u8(&self) -> u8 {
        crate::color::alpha_to_u8(self.extra_alpha)
    }

    /// The composite lattice node to look loops up under.
    pub fn composite_type(&self) -> CompositeType {
        if self.xor {
            CompositeType::xor_mode()
        } else {
            CompositeType::for_rule(self.rule, self.extra_alpha)
        }
    }
}

impl Default for CompositeInfo {
    fn default() -> Self {
        Self::new(CompositeRule::SrcOver)
    }
}

// ============================================================================
// Premultiplied f64 working space
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PremulArgb {
    a: f64,
    r: f64,
    g: f64,
    b: f64,
}

impl PremulArgb {
    #[inline]
    fn from_argb(c: Argb) -> Self {
        let a = to_unit(c.a);
        Self {
            a,
            r: to_unit(c.r) * a,
            g: to_unit(c.g) * a,
            b: to_unit(c.b) * a,
        }
    }

    #[inline]
    fn combine(s: &Self, fs: f64, d: &Self, fd: f64) -> Self {
        Self {
            a: s.a * fs + d.a * fd,
            r: s.r * fs + d.r * fd,
            g: s.g * fs + d.g * fd,
            b: s.b * fs + d.b * fd,
        }
    }

    #[inline]
    fn to_argb(self) -> Argb {
        if self.a <= 0.0 {
            return Argb::TRANSPARENT;
        }
        let inv = 1.0 / self.a;
        Argb::new(
            from_unit(self.a),
            from_unit(self.r * inv),
            from_unit(self.g * inv),
            from_unit(self.b * inv),
        )
    }
}

// ============================================================================
// Blending
// ============================================================================

/// Composite `src` onto `dst` under `rule` with mask coverage `cover`.
///
/// Extra alpha is expected to be folded into `src.a` by the caller.
#[inline]
pub fn blend_argb(rule: CompositeRule, src: Argb, dst: Argb, cover: CoverType) -> Argb {
    if cover == 0 {
        return dst;
    }
    if cover == 255 {
        match rule {
            CompositeRule::Clear => return Argb::TRANSPARENT,
            CompositeRule::Src => return src,
            CompositeRule::Dst => return dst,
            CompositeRule::SrcOver if src.a == 255 => return src,
            _ => {}
        }
    }
    let s = PremulArgb::from_argb(src);
    let d = PremulArgb::from_argb(dst);
    let (fs, fd) = rule.fractions(s.a, d.a);
    let c = cover as f64 / 255.0;
    PremulArgb::combine(&s, fs * c, &d, (1.0 - c) + fd * c).to_argb()
}

/// `blend_argb` on packed words.
#[inline]
pub fn blend_packed(rule: CompositeRule, src: u32, dst: u32, cover: CoverType) -> u32 {
    blend_argb(rule, Argb::from_packed(src), Argb::from_packed(dst), cover).to_packed()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Argb = Argb::opaque(255, 0, 0);
    const BLUE: Argb = Argb::opaque(0, 0, 255);

    #[test]
    fn test_default_rule() {
        assert_eq!(CompositeRule::default(), CompositeRule::SrcOver);
        assert_eq!(CompositeInfo::default().extra_alpha, 1.0);
    }

    #[test]
    fn test_clear_src_dst() {
        assert_eq!(blend_argb(CompositeRule::Clear, RED, BLUE, 255), Argb::TRANSPARENT);
        assert_eq!(blend_argb(CompositeRule::Src, RED, BLUE, 255), RED);
        assert_eq!(blend_argb(CompositeRule::Dst, RED, BLUE, 255), BLUE);
    }

    #[test]
    fn test_src_over_opaque() {
        assert_eq!(blend_argb(CompositeRule::SrcOver, RED, BLUE, 255), RED);
    }

    #[test]
    fn test_src_over_half_alpha() {
        let half_red = Argb::new(128, 255, 0, 0);
        let out = blend_argb(CompositeRule::SrcOver, half_red, BLUE, 255);
        assert_eq!(out.a, 255);
        assert!((out.r as i32 - 128).abs() <= 1);
        assert!((out.b as i32 - 127).abs() <= 1);
    }

    #[test]
    fn test_zero_cover_keeps_dst() {
        for rule in CompositeRule::ALL {
            assert_eq!(blend_argb(rule, RED, BLUE, 0), BLUE);
        }
    }

    #[test]
    fn test_partial_cover_interpolates() {
        let out = blend_argb(CompositeRule::Src, RED, BLUE, 128);
        assert_eq!(out.a, 255);
        assert!((out.r as i32 - 128).abs() <= 1);
        assert!((out.b as i32 - 127).abs() <= 1);
    }

    #[test]
    fn test_xor_rule_of_opaques_is_clear() {
        assert_eq!(blend_argb(CompositeRule::Xor, RED, BLUE, 255), Argb::TRANSPARENT);
    }

    #[test]
    fn test_dst_out_and_src_in() {
        assert_eq!(blend_argb(CompositeRule::DstOut, RED, BLUE, 255), Argb::TRANSPARENT);
        assert_eq!(blend_argb(CompositeRule::SrcIn, RED, Argb::TRANSPARENT, 255), Argb::TRANSPARENT);
        assert_eq!(blend_argb(CompositeRule::SrcIn, RED, BLUE, 255), RED);
    }

    #[test]
    fn test_xor_mode_info() {
        let info = CompositeInfo::xor_mode(0xFFFFFFFF, 0xFF000000);
        assert_eq!(info.xor_pixel, 0xFFFFFFFF);
        assert_eq!(info.alpha_mask, 0xFF000000);
        assert!(info.composite_type().is_xor_mode());
    }

    #[test]
    fn test_composite_type_of_blend() {
        let info = CompositeInfo::new(CompositeRule::SrcOver);
        assert_eq!(info.composite_type(), CompositeType::src_over_no_ea());
        let info = info.with_extra_alpha(0.5);
        assert_eq!(info.composite_type(), CompositeType::src_over());
    }
}
