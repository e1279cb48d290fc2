use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use raster_loops::argb_loops::{argb_primitives, SrcOverMaskFill, DIRECT_MASK_FILL_LAYOUTS};
use raster_loops::general_loops::GeneralMaskFill;
use raster_loops::primitive::{FillRectLoop, LoopOp, MaskFillLoop};
use raster_loops::render_cache::RenderCache;
use raster_loops::type_lattice::UniqueIdTable;
use raster_loops::{
    default_registry, RegistryOptions,
    CompositeInfo, CompositeRule, CompositeType, CoverageMask, GeneralPrimitive, LoopError, LoopResult,
    PixelLayout, Primitive, PrimitiveKind, PrimitiveRegistry, PrimitiveSignature, RectI, RenderState,
    Surface, SurfaceType,
};

struct NoopFill;

impl FillRectLoop for NoopFill {
    fn fill_rect(&self, _dst: &mut Surface, _state: &RenderState, _rect: &RectI) -> LoopResult<()> {
        Ok(())
    }
}

fn fill(src: SurfaceType, comp: CompositeType, dst: SurfaceType) -> Primitive {
    Primitive::new(src, comp, dst, LoopOp::FillRect(Arc::new(NoopFill)))
}

/// Signature of the FillRect primitive found for the request, as text.
fn find(r: &PrimitiveRegistry, src: SurfaceType, comp: CompositeType, dst: SurfaceType) -> Option<String> {
    r.locate_prim(PrimitiveKind::FillRect, &src, &comp, &dst)
        .unwrap()
        .map(|p| p.signature().to_string())
}

fn named(src: &str, comp: &str, dst: &str) -> Option<String> {
    Some(format!("FillRect({src}, {comp}, {dst})"))
}

#[test]
fn test_most_specific_registration_wins_on_every_axis() {
    let r = PrimitiveRegistry::new();
    r.register([
        fill(SurfaceType::any(), CompositeType::any(), SurfaceType::any()),
        fill(SurfaceType::any(), CompositeType::any(), SurfaceType::any_int()),
        fill(SurfaceType::any_color(), CompositeType::any(), SurfaceType::any_int()),
        fill(SurfaceType::any_color(), CompositeType::src_over(), SurfaceType::any_int()),
    ]);

    let opaque = SurfaceType::opaque_color;
    assert_eq!(
        find(&r, opaque(), CompositeType::src_over_no_ea(), SurfaceType::int_rgb()),
        named("AnyColor", "SrcOver", "AnyInt")
    );
    assert_eq!(
        find(&r, opaque(), CompositeType::dst_in(), SurfaceType::int_rgb()),
        named("AnyColor", "Any", "AnyInt")
    );
    assert_eq!(
        find(&r, SurfaceType::int_argb(), CompositeType::src_over(), SurfaceType::int_bgr()),
        named("Any", "Any", "AnyInt")
    );
    assert_eq!(
        find(&r, opaque(), CompositeType::src_over(), SurfaceType::byte_gray()),
        named("Any", "Any", "Any")
    );
}

#[test]
fn test_destination_generalizes_last() {
    let r = PrimitiveRegistry::new();
    r.register([
        fill(SurfaceType::any(), CompositeType::any(), SurfaceType::ushort_gray()),
        fill(SurfaceType::any_color(), CompositeType::src(), SurfaceType::any_short()),
    ]);
    assert_eq!(
        find(&r, SurfaceType::any_color(), CompositeType::src(), SurfaceType::ushort_gray()),
        named("Any", "Any", "UshortGray")
    );
}

#[test]
fn test_proxy_builds_lazily_and_once() {
    let r = PrimitiveRegistry::new();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    r.register_proxy(
        PrimitiveSignature::new(
            PrimitiveKind::FillRect,
            SurfaceType::any_color(),
            CompositeType::src(),
            SurfaceType::four_byte_abgr(),
        ),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            fill(SurfaceType::any_color(), CompositeType::src(), SurfaceType::four_byte_abgr())
        },
    );
    assert_eq!(built.load(Ordering::SeqCst), 0);
    for _ in 0..4 {
        assert_eq!(
            find(&r, SurfaceType::opaque_color(), CompositeType::src_no_ea(), SurfaceType::four_byte_abgr()),
            named("AnyColor", "Src", "4ByteAbgr")
        );
    }
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_proxy_with_wrong_signature_is_a_fault() {
    let r = PrimitiveRegistry::new();
    r.register_proxy(
        PrimitiveSignature::new(
            PrimitiveKind::FillRect,
            SurfaceType::any_color(),
            CompositeType::src(),
            SurfaceType::int_bgr(),
        ),
        || fill(SurfaceType::any_color(), CompositeType::src_over(), SurfaceType::int_bgr()),
    );
    let err = r
        .locate_prim(
            PrimitiveKind::FillRect,
            &SurfaceType::any_color(),
            &CompositeType::src(),
            &SurfaceType::int_bgr(),
        )
        .unwrap_err();
    assert!(matches!(err, LoopError::ProxyMismatch { .. }));
    assert!(!err.is_refusal());
}

#[test]
fn test_id_assignment_is_stable_and_bounded() {
    let table = UniqueIdTable::new("integration");
    let first = table.id_for("first").unwrap();
    assert_eq!(table.id_for("first").unwrap(), first);
    let ids: Vec<u8> = (0..254).map(|i| table.id_for(&format!("n{i}")).unwrap()).collect();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());
    assert!(!ids.contains(&first));
    assert!(matches!(
        table.id_for("overflow"),
        Err(LoopError::IdSpaceExhausted { .. })
    ));
}

#[test]
fn test_render_cache_keys_on_node_identity() {
    let a = SurfaceType::any_int().derive_subtype("IntegrationTwin").unwrap();
    let b = SurfaceType::any_int().derive_subtype("IntegrationTwin").unwrap();
    assert_eq!(a.unique_id(), b.unique_id());

    let cache = RenderCache::new(4);
    let comp = CompositeType::src();
    cache.put(&a, &comp, &SurfaceType::int_rgb(), "a");
    assert_eq!(cache.get(&a, &comp, &SurfaceType::int_rgb()), Some("a"));
    assert_eq!(cache.get(&b, &comp, &SurfaceType::int_rgb()), None);
}

/// Counts synthesis requests.
struct Counting(AtomicUsize);

impl GeneralPrimitive for Counting {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::FillRect
    }

    fn make_primitive(
        &self,
        _registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(fill(src.clone(), comp.clone(), dst.clone()))
    }
}

#[test]
fn test_locate_cached_separates_same_descriptor_twins() {
    let a = SurfaceType::any_color().derive_subtype("IntegrationPaint").unwrap();
    let b = SurfaceType::any_color().derive_subtype("IntegrationPaint").unwrap();
    let general = Arc::new(Counting(AtomicUsize::new(0)));
    let r = PrimitiveRegistry::new();
    r.register_general(general.clone());

    let comp = CompositeType::src();
    let dst = SurfaceType::int_rgb();
    let pa = r.locate_cached(PrimitiveKind::FillRect, &a, &comp, &dst).unwrap().unwrap();
    let pb = r.locate_cached(PrimitiveKind::FillRect, &b, &comp, &dst).unwrap().unwrap();
    assert!(!Arc::ptr_eq(&pa, &pb));
    assert_eq!(general.0.load(Ordering::SeqCst), 2);

    let again = r.locate_cached(PrimitiveKind::FillRect, &a, &comp, &dst).unwrap().unwrap();
    assert!(Arc::ptr_eq(&pa, &again));
    assert_eq!(general.0.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Synthesis parity
// ============================================================================

fn gradient(layout: PixelLayout) -> Surface {
    let mut s = Surface::new(layout, 9, 7);
    for y in 0..7 {
        for x in 0..9 {
            let v = (x * 28 + y * 3) as u32;
            s.set_argb(x, y, 0xFF000000 | (v << 16) | ((255 - v) << 8) | (y as u32 * 36));
        }
    }
    s
}

#[test]
fn test_synthesized_mask_fill_matches_direct_loop() {
    let synth = PrimitiveRegistry::new();
    synth.register(argb_primitives());
    synth.register_general(Arc::new(GeneralMaskFill));

    let mask = CoverageMask::from_fn(7, 5, |x, y| ((x * 40 + y * 23) % 256) as u8);
    let comp = CompositeInfo::new(CompositeRule::SrcOver);
    let rect = RectI::new(1, 1, 8, 6);

    for layout in DIRECT_MASK_FILL_LAYOUTS {
        let p = synth
            .locate(
                PrimitiveKind::MaskFill,
                &SurfaceType::any_color(),
                &comp.composite_type(),
                &layout.surface_type(),
            )
            .unwrap()
            .unwrap();
        for color in [0xFF3366CCu32, 0x80FF8000] {
            let mut direct = gradient(layout);
            SrcOverMaskFill::new(layout)
                .mask_fill(&mut direct, &comp, color, &rect, Some(&mask))
                .unwrap();
            let mut general = gradient(layout);
            p.mask_fill(&mut general, &comp, color, &rect, Some(&mask)).unwrap();
            assert_eq!(
                direct.to_argb_vec(),
                general.to_argb_vec(),
                "{layout:?} color {color:#010x}"
            );
        }
    }
}

// ============================================================================
// Concurrent lookups
// ============================================================================

#[test]
fn test_racing_lookups_share_one_proxy_instance() {
    const THREADS: usize = 8;
    let r = PrimitiveRegistry::new();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    r.register_proxy(
        PrimitiveSignature::new(
            PrimitiveKind::FillRect,
            SurfaceType::any_color(),
            CompositeType::src(),
            SurfaceType::ushort_555_rgb(),
        ),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            fill(SurfaceType::any_color(), CompositeType::src(), SurfaceType::ushort_555_rgb())
        },
    );

    let barrier = Barrier::new(THREADS);
    let found: Vec<Arc<Primitive>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let (r, barrier) = (&r, &barrier);
                s.spawn(move || {
                    let (src, comp, dst) =
                        (SurfaceType::any_color(), CompositeType::src(), SurfaceType::ushort_555_rgb());
                    barrier.wait();
                    let p = if i % 2 == 0 {
                        r.locate_cached(PrimitiveKind::FillRect, &src, &comp, &dst)
                    } else {
                        r.locate(PrimitiveKind::FillRect, &src, &comp, &dst)
                    };
                    p.unwrap().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(found.len(), THREADS);
    assert!(found.iter().all(|p| Arc::ptr_eq(p, &found[0])));
}

#[test]
fn test_shared_synthesized_fill_from_many_threads() {
    const THREADS: usize = 6;
    let registry = default_registry(RegistryOptions::default());
    let state = RenderState::new(0x80FF8040);
    let fill = registry
        .locate_cached(
            PrimitiveKind::FillRect,
            &state.source_type(),
            &state.composite_type(),
            &SurfaceType::ushort_gray(),
        )
        .unwrap()
        .unwrap();

    let barrier = Barrier::new(THREADS);
    let results: Vec<Vec<u32>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let (fill, state, barrier) = (&fill, &state, &barrier);
                s.spawn(move || {
                    let mut dst = gradient(PixelLayout::UshortGray);
                    barrier.wait();
                    for _ in 0..20 {
                        fill.fill_rect(&mut dst, state, &RectI::new(1, 1, 8, 6)).unwrap();
                    }
                    dst.to_argb_vec()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut expected = gradient(PixelLayout::UshortGray);
    for _ in 0..20 {
        fill.fill_rect(&mut expected, &state, &RectI::new(1, 1, 8, 6)).unwrap();
    }
    let expected = expected.to_argb_vec();
    assert!(results.iter().all(|r| *r == expected));
}
