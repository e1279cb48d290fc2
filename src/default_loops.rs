//! The standard loop set.
//!
//! Concrete loops cover the ARGB composites, format conversion, XOR blits,
//! solid shapes and the direct SrcOver mask fills. Everything else is
//! synthesized on demand by the general handlers registered here.

use std::sync::Arc;

use crate::argb_loops::{argb_primitives, src_over_mask_fill, DIRECT_MASK_FILL_LAYOUTS};
use crate::general_loops::{GeneralBlit, GeneralFillRect, GeneralFillSpans, GeneralMaskFill};
use crate::primitive::{PrimitiveKind, PrimitiveSignature};
use crate::registry::{GeneralPrimitive, PrimitiveRegistry, RegistryOptions};
use crate::shape_loops::{shape_primitives, GeneralShape, SolidShapes};
use crate::type_lattice::{CompositeType, SurfaceType};

/// Add the standard loops and general handlers to `registry`.
#[tracing::instrument(level = "debug", skip_all)]
pub fn register_default_loops(registry: &PrimitiveRegistry) {
    registry.register(argb_primitives());

    // Opaque paint under Src or plain SrcOver is a store on every layout.
    let solid = SolidShapes::solid();
    registry.register(shape_primitives(
        solid,
        &SurfaceType::any_color(),
        &CompositeType::src_no_ea(),
        &SurfaceType::any(),
    ));
    registry.register(shape_primitives(
        solid,
        &SurfaceType::opaque_color(),
        &CompositeType::src_over_no_ea(),
        &SurfaceType::any(),
    ));
    registry.register(shape_primitives(
        SolidShapes::xor(),
        &SurfaceType::any_color(),
        &CompositeType::xor_mode(),
        &SurfaceType::any(),
    ));

    for layout in DIRECT_MASK_FILL_LAYOUTS {
        let signature = PrimitiveSignature::new(
            PrimitiveKind::MaskFill,
            SurfaceType::any_color(),
            CompositeType::src_over(),
            layout.surface_type(),
        );
        registry.register_proxy(signature, move || src_over_mask_fill(layout));
    }

    let mut generals: Vec<Arc<dyn GeneralPrimitive>> = vec![
        Arc::new(GeneralBlit::blit()),
        Arc::new(GeneralBlit::mask_blit()),
        Arc::new(GeneralMaskFill),
        Arc::new(GeneralFillRect),
        Arc::new(GeneralFillSpans),
    ];
    generals.extend(
        GeneralShape::KINDS
            .iter()
            .filter_map(|&k| GeneralShape::new(k))
            .map(|g| Arc::new(g) as Arc<dyn GeneralPrimitive>),
    );
    for g in generals {
        registry.register_general(g);
    }
    tracing::debug!(entries = registry.len(), "default loops registered");
}

/// A registry holding the standard loops.
pub fn default_registry(options: RegistryOptions) -> PrimitiveRegistry {
    let registry = PrimitiveRegistry::with_options(options);
    register_default_loops(&registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::RectI;
    use crate::comp_op::{CompositeInfo, CompositeRule};
    use crate::pixel_layout::PixelLayout;
    use crate::primitive::RenderState;
    use crate::surface::Surface;

    fn count(s: &Surface, argb: u32) -> usize {
        s.to_argb_vec().into_iter().filter(|&p| p == argb).count()
    }

    #[test]
    fn test_every_kind_resolves_for_src_over() {
        let reg = default_registry(RegistryOptions::default());
        let src = SurfaceType::any_color();
        let comp = CompositeType::src_over();
        for layout in [PixelLayout::IntRgb, PixelLayout::UshortGray, PixelLayout::FloatGray] {
            let dst = layout.surface_type();
            for kind in [
                PrimitiveKind::MaskFill,
                PrimitiveKind::FillRect,
                PrimitiveKind::FillSpans,
                PrimitiveKind::DrawLine,
                PrimitiveKind::DrawRect,
                PrimitiveKind::DrawPolygons,
                PrimitiveKind::DrawPath,
                PrimitiveKind::FillPath,
            ] {
                let p = reg.locate(kind, &src, &comp, &dst).unwrap();
                assert!(p.is_some(), "{} for {}", kind, dst);
            }
        }
    }

    #[test]
    fn test_direct_mask_fill_found_through_proxy() {
        let reg = default_registry(RegistryOptions::default());
        let p = reg
            .locate_prim(
                PrimitiveKind::MaskFill,
                &SurfaceType::opaque_color(),
                &CompositeType::src_over_no_ea(),
                &SurfaceType::three_byte_bgr(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(p.dst_type(), &SurfaceType::three_byte_bgr());
        assert_eq!(p.comp_type(), &CompositeType::src_over());
    }

    #[test]
    fn test_opaque_fill_uses_solid_loop() {
        let reg = default_registry(RegistryOptions::default());
        let state = RenderState::new(0xFF00FF00);
        let p = reg
            .locate(
                PrimitiveKind::FillRect,
                &state.source_type(),
                &state.composite_type(),
                &SurfaceType::ushort_565_rgb(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(p.dst_type(), &SurfaceType::any());

        let mut dst = Surface::new(PixelLayout::Ushort565Rgb, 8, 8);
        p.fill_rect(&mut dst, &state, &RectI::new(2, 2, 6, 5)).unwrap();
        assert_eq!(count(&dst, 0xFF00FF00), 12);
    }

    #[test]
    fn test_translucent_fill_is_synthesized() {
        let reg = default_registry(RegistryOptions::default());
        let state = RenderState::new(0x80FFFFFF)
            .with_composite(CompositeInfo::new(CompositeRule::SrcOver));
        let dst_type = SurfaceType::ushort_gray();
        let p = reg
            .locate(PrimitiveKind::FillRect, &state.source_type(), &state.composite_type(), &dst_type)
            .unwrap()
            .unwrap();
        assert_eq!(p.dst_type(), &dst_type);

        let mut dst = Surface::filled(PixelLayout::UshortGray, 4, 4, 0xFF000000);
        p.fill_rect(&mut dst, &state, &RectI::new(0, 0, 4, 4)).unwrap();
        let gray = dst.get_argb(1, 1) & 0xFF;
        assert!((0x70..=0x90).contains(&gray), "gray {:#x}", gray);
    }

    #[test]
    fn test_xor_line_resolves_to_xor_loop() {
        let reg = default_registry(RegistryOptions::default());
        let state = RenderState::new(0xFFFFFFFF).with_composite(CompositeInfo::xor_mode(0, 0));
        let p = reg
            .locate(
                PrimitiveKind::DrawLine,
                &state.source_type(),
                &state.composite_type(),
                &SurfaceType::byte_gray(),
            )
            .unwrap()
            .unwrap();
        assert_eq!(p.comp_type(), &CompositeType::xor_mode());
        let mut dst = Surface::new(PixelLayout::ByteGray, 12, 4);
        p.draw_line(&mut dst, &state, 0, 1, 10, 1).unwrap();
        p.draw_line(&mut dst, &state, 0, 1, 10, 1).unwrap();
        assert_eq!(count(&dst, 0xFF000000), 48);
    }
}
