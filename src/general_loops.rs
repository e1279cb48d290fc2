//! Synthesis of primitives that have no registered loop.
//!
//! Blit, MaskBlit and MaskFill are rebuilt on top of the generic ARGB
//! loops: the source is converted to a temporary ARGB surface, and unless
//! a loop that writes the real destination from ARGB exists, the
//! destination region is converted out, composited in ARGB and converted
//! back. FillRect is built from MaskFill and FillSpans from FillRect.
//!
//! Each synthesized primitive owns a `ScratchPool` behind its own mutex;
//! concurrent calls on the same instance run one at a time.

use std::borrow::Cow;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use crate::basics::RectI;
use crate::comp_op::{CompositeInfo, CompositeRule};
use crate::error::{LoopError, LoopResult};
use crate::pixel_layout::PixelLayout;
use crate::primitive::{
    BlitLoop, FillRectLoop, FillSpansLoop, LoopOp, MaskBlitLoop, MaskFillLoop, Primitive, PrimitiveKind,
    RenderState,
};
use crate::registry::{GeneralPrimitive, PrimitiveRegistry};
use crate::surface::{BlitRegion, CoverageMask, Surface};
use crate::type_lattice::{CompositeType, SurfaceType};

// ============================================================================
// ScratchPool
// ============================================================================

/// Temporary ARGB surfaces reused across calls of one synthesized
/// primitive. A cached surface is reused when it is at least as large as
/// needed, otherwise it is replaced by one that is.
#[derive(Debug, Default)]
pub struct ScratchPool {
    src: Option<Surface>,
    dst: Option<Surface>,
    allocations: usize,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surfaces allocated so far.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Lease a surface of at least `w` x `h` from `slot`. The surface goes
    /// back into `slot` when the lease drops, on error paths too.
    fn lease<'a>(slot: &'a mut Option<Surface>, allocations: &mut usize, w: i32, h: i32) -> Scratch<'a> {
        let (w, h) = (w.max(1) as u32, h.max(1) as u32);
        let surface = match slot.take() {
            Some(s) if s.width() >= w && s.height() >= h => s,
            old => {
                let (ow, oh) = old.map_or((0, 0), |s| (s.width(), s.height()));
                *allocations += 1;
                Surface::new(PixelLayout::IntArgb, w.max(ow), h.max(oh))
            }
        };
        Scratch { slot, surface }
    }
}

/// Scratch surface on loan from a `ScratchPool` slot.
struct Scratch<'a> {
    slot: &'a mut Option<Surface>,
    surface: Surface,
}

impl Deref for Scratch<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        &self.surface
    }
}

impl DerefMut for Scratch<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        let empty = Surface::new(PixelLayout::IntArgb, 0, 0);
        *self.slot = Some(std::mem::replace(&mut self.surface, empty));
    }
}

/// `mask` re-based so that `(0, 0)` is the pixel `(ox, oy)` of the
/// original.
fn shift_mask(mask: Option<&CoverageMask>, ox: i32, oy: i32, w: i32, h: i32) -> Option<Cow<'_, CoverageMask>> {
    let m = mask?;
    if ox == 0 && oy == 0 {
        return Some(Cow::Borrowed(m));
    }
    Some(Cow::Owned(CoverageMask::from_fn(w as u32, h as u32, |x, y| {
        m.get(x as i32 + ox, y as i32 + oy)
    })))
}

fn src_copy() -> CompositeInfo {
    CompositeInfo::new(CompositeRule::Src)
}

// ============================================================================
// Lookup helpers
// ============================================================================

fn require(found: Option<Arc<Primitive>>, kind: PrimitiveKind, comp: &CompositeType) -> LoopResult<Arc<Primitive>> {
    found.ok_or_else(|| LoopError::missing_generic_loop(kind.name(), comp.descriptor()))
}

/// Converter blit from `src` to `dst`, without synthesis.
fn converter(registry: &PrimitiveRegistry, src: &SurfaceType, dst: &SurfaceType) -> LoopResult<Arc<Primitive>> {
    let copy = CompositeType::src_no_ea();
    require(registry.locate_prim(PrimitiveKind::Blit, src, &copy, dst)?, PrimitiveKind::Blit, &copy)
}

/// Converters into and out of ARGB for a destination that is not ARGB.
#[derive(Debug, Clone)]
struct DstConverters {
    to_argb: Arc<Primitive>,
    from_argb: Arc<Primitive>,
}

impl DstConverters {
    fn locate(registry: &PrimitiveRegistry, dst: &SurfaceType) -> LoopResult<Option<Self>> {
        let argb = SurfaceType::int_argb();
        if *dst == argb {
            return Ok(None);
        }
        Ok(Some(Self {
            to_argb: converter(registry, dst, &argb)?,
            from_argb: converter(registry, &argb, dst)?,
        }))
    }
}

// ============================================================================
// Synthesized blits
// ============================================================================

/// Blit or MaskBlit through ARGB temporaries.
pub struct GeneralCompositeBlit {
    kind: PrimitiveKind,
    src_conv: Option<Arc<Primitive>>,
    op: Arc<Primitive>,
    dst_conv: Option<DstConverters>,
    pool: Mutex<ScratchPool>,
}

impl GeneralCompositeBlit {
    /// True when the destination goes through an ARGB round trip.
    pub fn round_trips_destination(&self) -> bool {
        self.dst_conv.is_some()
    }

    pub fn converts_source(&self) -> bool {
        self.src_conv.is_some()
    }

    /// Scratch surfaces allocated so far.
    pub fn scratch_allocations(&self) -> usize {
        self.pool.lock().unwrap_or_else(|e| e.into_inner()).allocations()
    }

    fn invoke(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        match self.kind {
            PrimitiveKind::MaskBlit => self.op.mask_blit(src, dst, comp, region, mask),
            _ => self.op.blit(src, dst, comp, region),
        }
    }

    fn run(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        let dst_bounds = dst.bounds();
        let Some(r) = region.clipped(&src.bounds(), &dst_bounds, &dst_bounds) else {
            return Ok(());
        };
        let (ox, oy) = r.shift_from(region);
        let (w, h) = (r.width, r.height);
        let mask = shift_mask(mask, ox, oy, w, h);
        let mask = mask.as_deref();

        let mut guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        let pool = &mut *guard;
        let src_tmp = match &self.src_conv {
            Some(c) => {
                let mut t = ScratchPool::lease(&mut pool.src, &mut pool.allocations, w, h);
                c.blit(src, &mut t, &src_copy(), &BlitRegion::new(r.src_x, r.src_y, 0, 0, w, h))?;
                Some(t)
            }
            None => None,
        };
        let (op_src, sx, sy) = match &src_tmp {
            Some(t) => (&**t, 0, 0),
            None => (src, r.src_x, r.src_y),
        };
        match &self.dst_conv {
            None => self.invoke(op_src, dst, comp, &BlitRegion::new(sx, sy, r.dst_x, r.dst_y, w, h), mask),
            Some(dc) => {
                let mut t = ScratchPool::lease(&mut pool.dst, &mut pool.allocations, w, h);
                dc.to_argb
                    .blit(dst, &mut t, &src_copy(), &BlitRegion::new(r.dst_x, r.dst_y, 0, 0, w, h))?;
                self.invoke(op_src, &mut t, comp, &BlitRegion::new(sx, sy, 0, 0, w, h), mask)?;
                dc.from_argb
                    .blit(&t, dst, &src_copy(), &BlitRegion::new(0, 0, r.dst_x, r.dst_y, w, h))
            }
        }
    }
}

impl BlitLoop for GeneralCompositeBlit {
    fn blit(&self, src: &Surface, dst: &mut Surface, comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()> {
        self.run(src, dst, comp, region, None)
    }
}

impl MaskBlitLoop for GeneralCompositeBlit {
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

/// General handler for `Blit` or `MaskBlit`.
#[derive(Debug, Clone, Copy)]
pub struct GeneralBlit {
    kind: PrimitiveKind,
}

impl GeneralBlit {
    pub fn blit() -> Self {
        Self {
            kind: PrimitiveKind::Blit,
        }
    }

    pub fn mask_blit() -> Self {
        Self {
            kind: PrimitiveKind::MaskBlit,
        }
    }

    /// Compose the loop for `(src, comp, dst)` from registered pieces.
    pub fn build(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<GeneralCompositeBlit> {
        if comp.is_xor_mode() {
            return Err(LoopError::cannot_synthesize(self.kind.name(), comp.descriptor()));
        }
        let argb = SurfaceType::int_argb();
        let src_conv = if *src == argb {
            None
        } else {
            Some(converter(registry, src, &argb)?)
        };
        let (op, dst_conv) = match registry.locate_prim(self.kind, &argb, comp, dst)? {
            Some(direct) => (direct, None),
            None => {
                let generic = require(registry.locate_prim(self.kind, &argb, comp, &argb)?, self.kind, comp)?;
                (generic, DstConverters::locate(registry, dst)?)
            }
        };
        Ok(GeneralCompositeBlit {
            kind: self.kind,
            src_conv,
            op,
            dst_conv,
            pool: Mutex::new(ScratchPool::new()),
        })
    }
}

impl GeneralPrimitive for GeneralBlit {
    fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    #[tracing::instrument(level = "debug", skip_all, fields(kind = %self.kind, src = %src, comp = %comp, dst = %dst))]
    fn make_primitive(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive> {
        let l = Arc::new(self.build(registry, src, comp, dst)?);
        tracing::debug!(
            converts_source = l.converts_source(),
            round_trip = l.round_trips_destination(),
            "composed blit"
        );
        let op = match self.kind {
            PrimitiveKind::MaskBlit => LoopOp::MaskBlit(l),
            _ => LoopOp::Blit(l),
        };
        Ok(Primitive::new(src.clone(), comp.clone(), dst.clone(), op))
    }
}

// ============================================================================
// Synthesized mask fill
// ============================================================================

/// MaskFill through an ARGB copy of the destination region.
pub struct GeneralMaskFillLoop {
    op: Arc<Primitive>,
    dst_conv: Option<DstConverters>,
    pool: Mutex<ScratchPool>,
}

impl GeneralMaskFillLoop {
    /// Scratch surfaces allocated so far.
    pub fn scratch_allocations(&self) -> usize {
        self.pool.lock().unwrap_or_else(|e| e.into_inner()).allocations()
    }
}

impl MaskFillLoop for GeneralMaskFillLoop {
    fn mask_fill(
        &self,
        dst: &mut Surface,
        comp: &CompositeInfo,
        color: u32,
        rect: &RectI,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        let Some(dc) = &self.dst_conv else {
            return self.op.mask_fill(dst, comp, color, rect, mask);
        };
        let mut r = *rect;
        if !r.clip(&dst.bounds()) {
            return Ok(());
        }
        let (w, h) = (r.width(), r.height());
        let mask = shift_mask(mask, r.x1 - rect.x1, r.y1 - rect.y1, w, h);

        let mut guard = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        let pool = &mut *guard;
        let mut t = ScratchPool::lease(&mut pool.dst, &mut pool.allocations, w, h);
        dc.to_argb
            .blit(dst, &mut t, &src_copy(), &BlitRegion::new(r.x1, r.y1, 0, 0, w, h))?;
        self.op
            .mask_fill(&mut t, comp, color, &RectI::new(0, 0, w, h), mask.as_deref())?;
        dc.from_argb
            .blit(&t, dst, &src_copy(), &BlitRegion::new(0, 0, r.x1, r.y1, w, h))
    }
}

/// General handler for `MaskFill`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralMaskFill;

impl GeneralMaskFill {
    pub fn build(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<GeneralMaskFillLoop> {
        let kind = PrimitiveKind::MaskFill;
        if comp.is_xor_mode() {
            return Err(LoopError::cannot_synthesize(kind.name(), comp.descriptor()));
        }
        let argb = SurfaceType::int_argb();
        let op = require(registry.locate_prim(kind, src, comp, &argb)?, kind, comp)?;
        Ok(GeneralMaskFillLoop {
            op,
            dst_conv: DstConverters::locate(registry, dst)?,
            pool: Mutex::new(ScratchPool::new()),
        })
    }
}

impl GeneralPrimitive for GeneralMaskFill {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::MaskFill
    }

    #[tracing::instrument(level = "debug", skip_all, fields(src = %src, comp = %comp, dst = %dst))]
    fn make_primitive(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive> {
        let l = self.build(registry, src, comp, dst)?;
        Ok(Primitive::new(
            src.clone(),
            comp.clone(),
            dst.clone(),
            LoopOp::MaskFill(Arc::new(l)),
        ))
    }
}

// ============================================================================
// FillRect and FillSpans
// ============================================================================

/// FillRect as an unmasked MaskFill.
pub struct MaskFillRect {
    fill: Arc<Primitive>,
}

impl FillRectLoop for MaskFillRect {
    fn fill_rect(&self, dst: &mut Surface, state: &RenderState, rect: &RectI) -> LoopResult<()> {
        let mut r = *rect;
        if !r.clip(&state.device_clip(dst)) {
            return Ok(());
        }
        self.fill.mask_fill(dst, &state.composite, state.color, &r, None)
    }
}

/// FillSpans as one FillRect per span.
pub struct RectSpans {
    rects: Arc<Primitive>,
}

impl FillSpansLoop for RectSpans {
    fn fill_spans(&self, dst: &mut Surface, state: &RenderState, spans: &[RectI]) -> LoopResult<()> {
        for span in spans {
            self.rects.fill_rect(dst, state, span)?;
        }
        Ok(())
    }
}

/// The primitive of `kind` a composed loop delegates to. A miss means the
/// composition is not supported for this signature.
fn delegate(
    registry: &PrimitiveRegistry,
    wanted: PrimitiveKind,
    via: PrimitiveKind,
    src: &SurfaceType,
    comp: &CompositeType,
    dst: &SurfaceType,
) -> LoopResult<Arc<Primitive>> {
    registry
        .locate(via, src, comp, dst)?
        .ok_or_else(|| LoopError::cannot_synthesize(wanted.name(), comp.descriptor()))
}

/// General handler for `FillRect`, built from `MaskFill`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralFillRect;

impl GeneralPrimitive for GeneralFillRect {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::FillRect
    }

    fn make_primitive(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive> {
        let fill = delegate(registry, PrimitiveKind::FillRect, PrimitiveKind::MaskFill, src, comp, dst)?;
        Ok(Primitive::new(
            src.clone(),
            comp.clone(),
            dst.clone(),
            LoopOp::FillRect(Arc::new(MaskFillRect { fill })),
        ))
    }
}

/// General handler for `FillSpans`, built from `FillRect`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralFillSpans;

impl GeneralPrimitive for GeneralFillSpans {
    fn kind(&self) -> PrimitiveKind {
        PrimitiveKind::FillSpans
    }

    fn make_primitive(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive> {
        let rects = delegate(registry, PrimitiveKind::FillSpans, PrimitiveKind::FillRect, src, comp, dst)?;
        Ok(Primitive::new(
            src.clone(),
            comp.clone(),
            dst.clone(),
            LoopOp::FillSpans(Arc::new(RectSpans { rects })),
        ))
    }
}

/// Span-level delegate shared with the shape loops.
pub(crate) fn span_delegate(
    registry: &PrimitiveRegistry,
    wanted: PrimitiveKind,
    src: &SurfaceType,
    comp: &CompositeType,
    dst: &SurfaceType,
) -> LoopResult<Arc<Primitive>> {
    delegate(registry, wanted, PrimitiveKind::FillSpans, src, comp, dst)
}
