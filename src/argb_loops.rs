//! Loops on the canonical 32-bit ARGB format, format converters, XOR
//! blits and the direct SrcOver mask fills.
//!
//! The ARGB composite loops are the generic implementations every
//! synthesized primitive bottoms out in: they must exist for every
//! Porter-Duff rule. Converters are plain `Src` blits between any two
//! layouts.

use std::sync::Arc;

use crate::basics::{CoverType, RectI};
use crate::color::Argb;
use crate::comp_op::{blend_packed, CompositeInfo, CompositeRule};
use crate::error::LoopResult;
use crate::pixel_layout::PixelLayout;
use crate::primitive::{BlitLoop, LoopOp, MaskBlitLoop, MaskFillLoop, Primitive};
use crate::surface::{BlitRegion, CoverageMask, Surface};
use crate::type_lattice::{CompositeType, SurfaceType};

/// Clip `region` to both surfaces. Also returns the shift of the clipped
/// destination origin, needed to keep masks aligned.
pub(crate) fn clip_blit(region: &BlitRegion, src: &Surface, dst: &Surface) -> Option<(BlitRegion, (i32, i32))> {
    let dst_bounds = dst.bounds();
    let r = region.clipped(&src.bounds(), &dst_bounds, &dst_bounds)?;
    let shift = r.shift_from(region);
    Some((r, shift))
}

/// Source color with extra alpha folded into its alpha channel.
#[inline]
fn with_extra_alpha(argb: u32, extra: u8) -> u32 {
    if extra == 255 {
        argb
    } else {
        Argb::from_packed(argb).scale_alpha(extra).to_packed()
    }
}

// ============================================================================
// Converters
// ============================================================================

/// `Src` copy between any two layouts through ARGB.
#[derive(Debug, Default)]
pub struct ConvertBlit;

impl BlitLoop for ConvertBlit {
    fn blit(&self, src: &Surface, dst: &mut Surface, _comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()> {
        let Some((r, _)) = clip_blit(region, src, dst) else {
            return Ok(());
        };
        if src.layout() == dst.layout() {
            for y in 0..r.height {
                for x in 0..r.width {
                    if let Some(v) = src.get_value(r.src_x + x, r.src_y + y) {
                        dst.store_value(r.dst_x + x, r.dst_y + y, &v);
                    }
                }
            }
            return Ok(());
        }
        for y in 0..r.height {
            for x in 0..r.width {
                let argb = src.get_argb(r.src_x + x, r.src_y + y);
                dst.set_argb(r.dst_x + x, r.dst_y + y, argb);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Generic ARGB composite loops
// ============================================================================

/// Porter-Duff blit and mask blit on ARGB surfaces under any rule.
#[derive(Debug, Default)]
pub struct ArgbCompositeBlit;

impl ArgbCompositeBlit {
    fn run(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        let Some((r, (ox, oy))) = clip_blit(region, src, dst) else {
            return Ok(());
        };
        let extra = comp.extra_alpha_u8();
        for y in 0..r.height {
            for x in 0..r.width {
                let cover: CoverType = mask.map_or(255, |m| m.get(x + ox, y + oy));
                if cover == 0 {
                    continue;
                }
                let (dx, dy) = (r.dst_x + x, r.dst_y + y);
                let s = with_extra_alpha(src.get_argb(r.src_x + x, r.src_y + y), extra);
                let d = dst.get_argb(dx, dy);
                dst.set_argb(dx, dy, blend_packed(comp.rule, s, d, cover));
            }
        }
        Ok(())
    }
}

impl BlitLoop for ArgbCompositeBlit {
    fn blit(&self, src: &Surface, dst: &mut Surface, comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()> {
        self.run(src, dst, comp, region, None)
    }
}

impl MaskBlitLoop for ArgbCompositeBlit {
    fn mask_blit(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        self.run(src, dst, comp, region, mask)
    }
}

/// Solid color through a coverage mask on ARGB surfaces under any rule.
#[derive(Debug, Default)]
pub struct ArgbMaskFill;

impl MaskFillLoop for ArgbMaskFill {
    fn mask_fill(
        &self,
        dst: &mut Surface,
        comp: &CompositeInfo,
        color: u32,
        rect: &RectI,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        let mut r = *rect;
        if !r.clip(&dst.bounds()) {
            return Ok(());
        }
        let s = with_extra_alpha(color, comp.extra_alpha_u8());
        for y in r.y1..r.y2 {
            for x in r.x1..r.x2 {
                let cover = mask.map_or(255, |m| m.get(x - rect.x1, y - rect.y1));
                if cover == 0 {
                    continue;
                }
                let d = dst.get_argb(x, y);
                dst.set_argb(x, y, blend_packed(comp.rule, s, d, cover));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Direct SrcOver mask fill
// ============================================================================

/// SrcOver mask fill straight into an opaque destination layout. Fully
/// covered pixels of an opaque color are stored pre-encoded.
#[derive(Debug)]
pub struct SrcOverMaskFill {
    layout: PixelLayout,
}

impl SrcOverMaskFill {
    pub fn new(layout: PixelLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }
}

impl MaskFillLoop for SrcOverMaskFill {
    fn mask_fill(
        &self,
        dst: &mut Surface,
        comp: &CompositeInfo,
        color: u32,
        rect: &RectI,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        let mut r = *rect;
        if !r.clip(&dst.bounds()) {
            return Ok(());
        }
        let s = with_extra_alpha(color, comp.extra_alpha_u8());
        if s >> 24 == 0 {
            return Ok(());
        }
        let solid = (s >> 24 == 0xFF).then(|| self.layout.encode_argb(s));
        for y in r.y1..r.y2 {
            for x in r.x1..r.x2 {
                let cover = mask.map_or(255, |m| m.get(x - rect.x1, y - rect.y1));
                match (cover, &solid) {
                    (0, _) => {}
                    (255, Some(v)) => dst.store_value(x, y, v),
                    _ => {
                        let d = dst.get_argb(x, y);
                        dst.set_argb(x, y, blend_packed(CompositeRule::SrcOver, s, d, cover));
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// XOR blit
// ============================================================================

/// XOR-mode blit. Source pixels with alpha below one half are skipped.
#[derive(Debug, Default)]
pub struct XorBlit;

impl BlitLoop for XorBlit {
    fn blit(&self, src: &Surface, dst: &mut Surface, comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()> {
        let Some((r, _)) = clip_blit(region, src, dst) else {
            return Ok(());
        };
        let layout = dst.layout();
        for y in 0..r.height {
            for x in 0..r.width {
                let s = src.get_argb(r.src_x + x, r.src_y + y);
                if s >> 24 < 0x80 {
                    continue;
                }
                let v = layout.xor_value(s, comp.xor_pixel, comp.alpha_mask);
                dst.xor_value(r.dst_x + x, r.dst_y + y, &v);
            }
        }
        Ok(())
    }
}

// ============================================================================
// Primitives
// ============================================================================

/// Converter, generic composite and XOR blit primitives.
pub fn argb_primitives() -> Vec<Primitive> {
    let composite = Arc::new(ArgbCompositeBlit);
    vec![
        Primitive::new(
            SurfaceType::any(),
            CompositeType::src_no_ea(),
            SurfaceType::any(),
            LoopOp::Blit(Arc::new(ConvertBlit)),
        ),
        Primitive::new(
            SurfaceType::int_argb(),
            CompositeType::any_alpha(),
            SurfaceType::int_argb(),
            LoopOp::Blit(composite.clone()),
        ),
        Primitive::new(
            SurfaceType::int_argb(),
            CompositeType::any_alpha(),
            SurfaceType::int_argb(),
            LoopOp::MaskBlit(composite),
        ),
        Primitive::new(
            SurfaceType::any_color(),
            CompositeType::any_alpha(),
            SurfaceType::int_argb(),
            LoopOp::MaskFill(Arc::new(ArgbMaskFill)),
        ),
        Primitive::new(
            SurfaceType::any(),
            CompositeType::xor_mode(),
            SurfaceType::any(),
            LoopOp::Blit(Arc::new(XorBlit)),
        ),
    ]
}

/// The direct SrcOver mask fill for `layout`.
pub fn src_over_mask_fill(layout: PixelLayout) -> Primitive {
    Primitive::new(
        SurfaceType::any_color(),
        CompositeType::src_over(),
        layout.surface_type(),
        LoopOp::MaskFill(Arc::new(SrcOverMaskFill::new(layout))),
    )
}

/// Layouts that have a direct SrcOver mask fill.
pub const DIRECT_MASK_FILL_LAYOUTS: [PixelLayout; 3] = [
    PixelLayout::IntRgb,
    PixelLayout::ThreeByteBgr,
    PixelLayout::ByteGray,
];

#[cfg(test)]
mod tests {
    use super::*;

    const RED: u32 = 0xFFFF0000;
    const HALF_BLUE: u32 = 0x800000FF;

    #[test]
    fn test_convert_between_layouts() {
        let mut src = Surface::new(PixelLayout::IntArgb, 3, 3);
        src.set_argb(1, 1, RED);
        let mut dst = Surface::new(PixelLayout::ThreeByteBgr, 3, 3);
        ConvertBlit
            .blit(&src, &mut dst, &CompositeInfo::new(CompositeRule::Src), &BlitRegion::aligned(0, 0, 3, 3))
            .unwrap();
        assert_eq!(dst.get_argb(1, 1), RED);
        assert_eq!(dst.get_argb(0, 0), 0xFF000000);
    }

    #[test]
    fn test_convert_clips_to_both_surfaces() {
        let src = Surface::filled(PixelLayout::IntRgb, 2, 2, RED);
        let mut dst = Surface::new(PixelLayout::IntRgb, 4, 4);
        ConvertBlit
            .blit(&src, &mut dst, &CompositeInfo::new(CompositeRule::Src), &BlitRegion::new(0, 0, 1, 1, 10, 10))
            .unwrap();
        assert_eq!(dst.get_argb(1, 1), RED);
        assert_eq!(dst.get_argb(2, 2), RED);
        assert_eq!(dst.get_argb(3, 3), 0xFF000000);
        assert_eq!(dst.get_argb(0, 0), 0xFF000000);
    }

    #[test]
    fn test_composite_blit_src_over() {
        let src = Surface::filled(PixelLayout::IntArgb, 1, 1, HALF_BLUE);
        let mut dst = Surface::filled(PixelLayout::IntArgb, 1, 1, RED);
        ArgbCompositeBlit
            .blit(&src, &mut dst, &CompositeInfo::new(CompositeRule::SrcOver), &BlitRegion::aligned(0, 0, 1, 1))
            .unwrap();
        let out = Argb::from_packed(dst.get_argb(0, 0));
        assert_eq!(out.a, 255);
        assert!((out.r as i32 - 127).abs() <= 1);
        assert!((out.b as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_mask_blit_alignment_after_clip() {
        let src = Surface::filled(PixelLayout::IntArgb, 4, 4, RED);
        let mut dst = Surface::new(PixelLayout::IntArgb, 4, 4);
        // Only mask column 2 is set; the region starts one pixel left of
        // the surface, so that column lands on x = 1.
        let mask = CoverageMask::from_fn(4, 1, |x, _| if x == 2 { 255 } else { 0 });
        ArgbCompositeBlit
            .mask_blit(
                &src,
                &mut dst,
                &CompositeInfo::new(CompositeRule::Src),
                &BlitRegion::new(0, 0, -1, 0, 4, 1),
                Some(&mask),
            )
            .unwrap();
        assert_eq!(dst.get_argb(1, 0), RED);
        assert_eq!(dst.get_argb(0, 0), 0);
        assert_eq!(dst.get_argb(2, 0), 0);
    }

    #[test]
    fn test_mask_fill_extra_alpha() {
        let mut dst = Surface::new(PixelLayout::IntArgb, 2, 1);
        let comp = CompositeInfo::new(CompositeRule::Src).with_extra_alpha(0.5);
        ArgbMaskFill
            .mask_fill(&mut dst, &comp, RED, &RectI::new(0, 0, 1, 1), None)
            .unwrap();
        let out = Argb::from_packed(dst.get_argb(0, 0));
        assert!((out.a as i32 - 128).abs() <= 1);
        assert_eq!(out.r, 255);
        assert_eq!(dst.get_argb(1, 0), 0);
    }

    #[test]
    fn test_direct_src_over_opaque_store() {
        let mut dst = Surface::filled(PixelLayout::ByteGray, 3, 1, 0xFF000000);
        let mask = CoverageMask::new(3, 1, vec![255, 0, 128]);
        SrcOverMaskFill::new(PixelLayout::ByteGray)
            .mask_fill(&mut dst, &CompositeInfo::default(), 0xFFFFFFFF, &RectI::new(0, 0, 3, 1), Some(&mask))
            .unwrap();
        assert_eq!(dst.get_argb(0, 0), 0xFFFFFFFF);
        assert_eq!(dst.get_argb(1, 0), 0xFF000000);
        let g = Argb::from_packed(dst.get_argb(2, 0)).g;
        assert!((g as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_xor_blit_skips_translucent_source() {
        let mut src = Surface::new(PixelLayout::IntArgb, 2, 1);
        src.set_argb(0, 0, 0xFFFFFFFF);
        src.set_argb(1, 0, 0x7FFFFFFF);
        let mut dst = Surface::new(PixelLayout::IntRgb, 2, 1);
        let comp = CompositeInfo::xor_mode(0, 0);
        XorBlit.blit(&src, &mut dst, &comp, &BlitRegion::aligned(0, 0, 2, 1)).unwrap();
        assert_eq!(dst.get_argb(0, 0), 0xFFFFFFFF);
        assert_eq!(dst.get_argb(1, 0), 0xFF000000);
        XorBlit.blit(&src, &mut dst, &comp, &BlitRegion::aligned(0, 0, 2, 1)).unwrap();
        assert_eq!(dst.get_argb(0, 0), 0xFF000000);
    }

    #[test]
    fn test_primitive_set_kinds() {
        let prims = argb_primitives();
        assert_eq!(prims.len(), 5);
        assert!(prims.iter().any(|p| p.comp_type().is_xor_mode()));
        let direct = src_over_mask_fill(PixelLayout::IntRgb);
        assert_eq!(direct.dst_type(), &SurfaceType::int_rgb());
    }
}
