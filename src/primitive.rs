//! Rendering primitives: one loop bound to a (source, composite,
//! destination) signature.
//!
//! Every operation kind has its own loop trait. A `Primitive` pairs a
//! `PrimitiveSignature` with a `LoopOp`, the tagged union over those
//! traits, and exposes one typed entry point per kind. Calling the entry
//! point of another kind is a `WrongLoopKind` fault.
//!
//! Tracing is a decorator: `Primitive::traced` wraps the loop in a
//! `Traced` holder that logs each invocation before delegating.

use std::fmt;
use std::sync::Arc;

use crate::basics::{FillingRule, RectI};
use crate::comp_op::CompositeInfo;
use crate::error::{LoopError, LoopResult};
use crate::path::Path;
use crate::process_path::StrokeControl;
use crate::surface::{BlitRegion, CoverageMask, Surface};
use crate::type_lattice::{CompositeType, SurfaceType};

// ============================================================================
// PrimitiveKind
// ============================================================================

/// Operation kinds. The discriminant is the high byte of the unique id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Blit = 0,
    MaskBlit = 1,
    MaskFill = 2,
    FillRect = 3,
    FillSpans = 4,
    DrawLine = 5,
    DrawRect = 6,
    DrawPolygons = 7,
    DrawPath = 8,
    FillPath = 9,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 10] = [
        PrimitiveKind::Blit,
        PrimitiveKind::MaskBlit,
        PrimitiveKind::MaskFill,
        PrimitiveKind::FillRect,
        PrimitiveKind::FillSpans,
        PrimitiveKind::DrawLine,
        PrimitiveKind::DrawRect,
        PrimitiveKind::DrawPolygons,
        PrimitiveKind::DrawPath,
        PrimitiveKind::FillPath,
    ];

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Blit => "Blit",
            PrimitiveKind::MaskBlit => "MaskBlit",
            PrimitiveKind::MaskFill => "MaskFill",
            PrimitiveKind::FillRect => "FillRect",
            PrimitiveKind::FillSpans => "FillSpans",
            PrimitiveKind::DrawLine => "DrawLine",
            PrimitiveKind::DrawRect => "DrawRect",
            PrimitiveKind::DrawPolygons => "DrawPolygons",
            PrimitiveKind::DrawPath => "DrawPath",
            PrimitiveKind::FillPath => "FillPath",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// PrimitiveSignature
// ============================================================================

/// Operation kind plus the three lattice axes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveSignature {
    pub kind: PrimitiveKind,
    pub src: SurfaceType,
    pub comp: CompositeType,
    pub dst: SurfaceType,
}

impl PrimitiveSignature {
    pub fn new(kind: PrimitiveKind, src: SurfaceType, comp: CompositeType, dst: SurfaceType) -> Self {
        Self {
            kind,
            src,
            comp,
            dst,
        }
    }

    /// Packed search key: `kind << 24 | dst << 16 | comp << 8 | src`.
    #[inline]
    pub fn unique_id(&self) -> u32 {
        make_unique_id(self.kind, &self.src, &self.comp, &self.dst)
    }

    /// Exact match on kind and on every axis by node identity.
    pub fn matches(&self, kind: PrimitiveKind, src: &SurfaceType, comp: &CompositeType, dst: &SurfaceType) -> bool {
        self.kind == kind && self.src == *src && self.comp == *comp && self.dst == *dst
    }
}

impl fmt::Display for PrimitiveSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}, {})", self.kind, self.src, self.comp, self.dst)
    }
}

/// The packed id of a signature that does not exist yet.
#[inline]
pub fn make_unique_id(kind: PrimitiveKind, src: &SurfaceType, comp: &CompositeType, dst: &SurfaceType) -> u32 {
    (kind.id() as u32) << 24
        | (dst.unique_id() as u32) << 16
        | (comp.unique_id() as u32) << 8
        | src.unique_id() as u32
}

// ============================================================================
// RenderState
// ============================================================================

/// Per-call parameters of the solid-color shape loops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    /// Non-premultiplied ARGB paint color.
    pub color: u32,
    pub composite: CompositeInfo,
    /// Device clip; loops also clip to the destination bounds.
    pub clip: RectI,
    pub stroke: StrokeControl,
    /// Integer offset added to every coordinate.
    pub translate: (i32, i32),
}

impl RenderState {
    /// Largest clip the scan converter accepts without clamping.
    pub const MAX_CLIP: i32 = 1 << 20;

    pub fn new(color: u32) -> Self {
        Self {
            color,
            composite: CompositeInfo::default(),
            clip: RectI::new(-Self::MAX_CLIP, -Self::MAX_CLIP, Self::MAX_CLIP, Self::MAX_CLIP),
            stroke: StrokeControl::Normalize,
            translate: (0, 0),
        }
    }

    pub fn with_composite(mut self, composite: CompositeInfo) -> Self {
        self.composite = composite;
        self
    }

    pub fn with_clip(mut self, clip: RectI) -> Self {
        self.clip = clip;
        self
    }

    pub fn with_stroke(mut self, stroke: StrokeControl) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn with_translation(mut self, tx: i32, ty: i32) -> Self {
        self.translate = (tx, ty);
        self
    }

    /// Lattice source type of the paint color.
    pub fn source_type(&self) -> SurfaceType {
        if self.color >> 24 == 0xFF {
            SurfaceType::opaque_color()
        } else {
            SurfaceType::any_color()
        }
    }

    pub fn composite_type(&self) -> CompositeType {
        self.composite.composite_type()
    }

    /// Clip intersected with the bounds of `dst`.
    pub fn device_clip(&self, dst: &Surface) -> RectI {
        let mut r = self.clip;
        if !r.clip(&dst.bounds()) {
            return RectI::new(0, 0, 0, 0);
        }
        r
    }
}

/// One polyline of a `DrawPolygons` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polyline {
    pub points: Vec<(i32, i32)>,
    /// Join the last point back to the first.
    pub closed: bool,
}

impl Polyline {
    pub fn new(points: Vec<(i32, i32)>, closed: bool) -> Self {
        Self { points, closed }
    }
}

// ============================================================================
// Loop traits
// ============================================================================

/// Copy or blend `region` of `src` into `dst`.
pub trait BlitLoop: Send + Sync {
    fn blit(&self, src: &Surface, dst: &mut Surface, comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()>;
}

/// Blit through an optional coverage mask aligned with the destination
/// origin of `region`.
pub trait MaskBlitLoop: Send + Sync {
    fn mask_blit(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()>;
}

/// Blend a solid color over `rect` through an optional coverage mask
/// aligned with the top-left corner of `rect`.
pub trait MaskFillLoop: Send + Sync {
    fn mask_fill(
        &self,
        dst: &mut Surface,
        comp: &CompositeInfo,
        color: u32,
        rect: &RectI,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()>;
}

pub trait FillRectLoop: Send + Sync {
    fn fill_rect(&self, dst: &mut Surface, state: &RenderState, rect: &RectI) -> LoopResult<()>;
}

/// Fill a batch of span rectangles with the paint color.
pub trait FillSpansLoop: Send + Sync {
    fn fill_spans(&self, dst: &mut Surface, state: &RenderState, spans: &[RectI]) -> LoopResult<()>;
}

/// Single-pixel-wide line, both endpoints included.
pub trait DrawLineLoop: Send + Sync {
    fn draw_line(&self, dst: &mut Surface, state: &RenderState, x0: i32, y0: i32, x1: i32, y1: i32) -> LoopResult<()>;
}

/// Outline of the `w + 1` by `h + 1` pixel rectangle at `(x, y)`.
pub trait DrawRectLoop: Send + Sync {
    fn draw_rect(&self, dst: &mut Surface, state: &RenderState, x: i32, y: i32, w: i32, h: i32) -> LoopResult<()>;
}

pub trait DrawPolygonsLoop: Send + Sync {
    fn draw_polygons(&self, dst: &mut Surface, state: &RenderState, polys: &[Polyline]) -> LoopResult<()>;
}

pub trait DrawPathLoop: Send + Sync {
    fn draw_path(&self, dst: &mut Surface, state: &RenderState, path: &Path) -> LoopResult<()>;
}

pub trait FillPathLoop: Send + Sync {
    fn fill_path(&self, dst: &mut Surface, state: &RenderState, path: &Path, rule: FillingRule) -> LoopResult<()>;
}

// ============================================================================
// LoopOp
// ============================================================================

/// A loop of one operation kind.
#[derive(Clone)]
pub enum LoopOp {
    Blit(Arc<dyn BlitLoop>),
    MaskBlit(Arc<dyn MaskBlitLoop>),
    MaskFill(Arc<dyn MaskFillLoop>),
    FillRect(Arc<dyn FillRectLoop>),
    FillSpans(Arc<dyn FillSpansLoop>),
    DrawLine(Arc<dyn DrawLineLoop>),
    DrawRect(Arc<dyn DrawRectLoop>),
    DrawPolygons(Arc<dyn DrawPolygonsLoop>),
    DrawPath(Arc<dyn DrawPathLoop>),
    FillPath(Arc<dyn FillPathLoop>),
}

impl LoopOp {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            LoopOp::Blit(_) => PrimitiveKind::Blit,
            LoopOp::MaskBlit(_) => PrimitiveKind::MaskBlit,
            LoopOp::MaskFill(_) => PrimitiveKind::MaskFill,
            LoopOp::FillRect(_) => PrimitiveKind::FillRect,
            LoopOp::FillSpans(_) => PrimitiveKind::FillSpans,
            LoopOp::DrawLine(_) => PrimitiveKind::DrawLine,
            LoopOp::DrawRect(_) => PrimitiveKind::DrawRect,
            LoopOp::DrawPolygons(_) => PrimitiveKind::DrawPolygons,
            LoopOp::DrawPath(_) => PrimitiveKind::DrawPath,
            LoopOp::FillPath(_) => PrimitiveKind::FillPath,
        }
    }

    fn traced(&self, label: Arc<str>) -> LoopOp {
        match self {
            LoopOp::Blit(l) => LoopOp::Blit(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::MaskBlit(l) => LoopOp::MaskBlit(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::MaskFill(l) => LoopOp::MaskFill(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::FillRect(l) => LoopOp::FillRect(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::FillSpans(l) => LoopOp::FillSpans(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::DrawLine(l) => LoopOp::DrawLine(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::DrawRect(l) => LoopOp::DrawRect(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::DrawPolygons(l) => LoopOp::DrawPolygons(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::DrawPath(l) => LoopOp::DrawPath(Arc::new(Traced::new(label, l.clone()))),
            LoopOp::FillPath(l) => LoopOp::FillPath(Arc::new(Traced::new(label, l.clone()))),
        }
    }
}

impl fmt::Debug for LoopOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoopOp::{}", self.kind())
    }
}

// ============================================================================
// Primitive
// ============================================================================

/// A loop bound to its signature. Shared as `Arc<Primitive>`.
#[derive(Debug, Clone)]
pub struct Primitive {
    signature: PrimitiveSignature,
    op: LoopOp,
    traced: bool,
}

impl Primitive {
    /// The kind is taken from `op`.
    pub fn new(src: SurfaceType, comp: CompositeType, dst: SurfaceType, op: LoopOp) -> Self {
        Self {
            signature: PrimitiveSignature::new(op.kind(), src, comp, dst),
            op,
            traced: false,
        }
    }

    pub fn signature(&self) -> &PrimitiveSignature {
        &self.signature
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.signature.kind
    }

    pub fn src_type(&self) -> &SurfaceType {
        &self.signature.src
    }

    pub fn comp_type(&self) -> &CompositeType {
        &self.signature.comp
    }

    pub fn dst_type(&self) -> &SurfaceType {
        &self.signature.dst
    }

    pub fn unique_id(&self) -> u32 {
        self.signature.unique_id()
    }

    pub fn op(&self) -> &LoopOp {
        &self.op
    }

    pub fn is_traced(&self) -> bool {
        self.traced
    }

    /// Same primitive with a logging decorator around the loop. Wrapping
    /// twice is a no-op.
    pub fn traced(&self) -> Primitive {
        if self.traced {
            return self.clone();
        }
        let label: Arc<str> = Arc::from(self.signature.to_string());
        Self {
            signature: self.signature.clone(),
            op: self.op.traced(label),
            traced: true,
        }
    }

    fn wrong_kind(&self, expected: PrimitiveKind) -> LoopError {
        LoopError::wrong_loop_kind(expected.name(), self.kind().name())
    }

    pub fn blit(&self, src: &Surface, dst: &mut Surface, comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()> {
        match &self.op {
            LoopOp::Blit(l) => l.blit(src, dst, comp, region),
            _ => Err(self.wrong_kind(PrimitiveKind::Blit)),
        }
    }

    pub fn mask_blit(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        match &self.op {
            LoopOp::MaskBlit(l) => l.mask_blit(src, dst, comp, region, mask),
            _ => Err(self.wrong_kind(PrimitiveKind::MaskBlit)),
        }
    }

    pub fn mask_fill(
        &self,
        dst: &mut Surface,
        comp: &CompositeInfo,
        color: u32,
        rect: &RectI,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        match &self.op {
            LoopOp::MaskFill(l) => l.mask_fill(dst, comp, color, rect, mask),
            _ => Err(self.wrong_kind(PrimitiveKind::MaskFill)),
        }
    }

    pub fn fill_rect(&self, dst: &mut Surface, state: &RenderState, rect: &RectI) -> LoopResult<()> {
        match &self.op {
            LoopOp::FillRect(l) => l.fill_rect(dst, state, rect),
            _ => Err(self.wrong_kind(PrimitiveKind::FillRect)),
        }
    }

    pub fn fill_spans(&self, dst: &mut Surface, state: &RenderState, spans: &[RectI]) -> LoopResult<()> {
        match &self.op {
            LoopOp::FillSpans(l) => l.fill_spans(dst, state, spans),
            _ => Err(self.wrong_kind(PrimitiveKind::FillSpans)),
        }
    }

    pub fn draw_line(&self, dst: &mut Surface, state: &RenderState, x0: i32, y0: i32, x1: i32, y1: i32) -> LoopResult<()> {
        match &self.op {
            LoopOp::DrawLine(l) => l.draw_line(dst, state, x0, y0, x1, y1),
            _ => Err(self.wrong_kind(PrimitiveKind::DrawLine)),
        }
    }

    pub fn draw_rect(&self, dst: &mut Surface, state: &RenderState, x: i32, y: i32, w: i32, h: i32) -> LoopResult<()> {
        match &self.op {
            LoopOp::DrawRect(l) => l.draw_rect(dst, state, x, y, w, h),
            _ => Err(self.wrong_kind(PrimitiveKind::DrawRect)),
        }
    }

    pub fn draw_polygons(&self, dst: &mut Surface, state: &RenderState, polys: &[Polyline]) -> LoopResult<()> {
        match &self.op {
            LoopOp::DrawPolygons(l) => l.draw_polygons(dst, state, polys),
            _ => Err(self.wrong_kind(PrimitiveKind::DrawPolygons)),
        }
    }

    pub fn draw_path(&self, dst: &mut Surface, state: &RenderState, path: &Path) -> LoopResult<()> {
        match &self.op {
            LoopOp::DrawPath(l) => l.draw_path(dst, state, path),
            _ => Err(self.wrong_kind(PrimitiveKind::DrawPath)),
        }
    }

    pub fn fill_path(&self, dst: &mut Surface, state: &RenderState, path: &Path, rule: FillingRule) -> LoopResult<()> {
        match &self.op {
            LoopOp::FillPath(l) => l.fill_path(dst, state, path, rule),
            _ => Err(self.wrong_kind(PrimitiveKind::FillPath)),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.traced {
            write!(f, "Traced({})", self.signature)
        } else {
            write!(f, "{}", self.signature)
        }
    }
}

// ============================================================================
// Trace decorator
// ============================================================================

/// Logs each call at trace level, then delegates.
pub struct Traced<L: ?Sized> {
    label: Arc<str>,
    inner: Arc<L>,
}

impl<L: ?Sized> Traced<L> {
    pub fn new(label: Arc<str>, inner: Arc<L>) -> Self {
        Self { label, inner }
    }
}

impl BlitLoop for Traced<dyn BlitLoop> {
    fn blit(&self, src: &Surface, dst: &mut Surface, comp: &CompositeInfo, region: &BlitRegion) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, ?region, "blit");
        self.inner.blit(src, dst, comp, region)
    }
}

impl MaskBlitLoop for Traced<dyn MaskBlitLoop> {
    fn mask_blit(
        &self,
        src: &Surface,
        dst: &mut Surface,
        comp: &CompositeInfo,
        region: &BlitRegion,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, ?region, masked = mask.is_some(), "mask_blit");
        self.inner.mask_blit(src, dst, comp, region, mask)
    }
}

impl MaskFillLoop for Traced<dyn MaskFillLoop> {
    fn mask_fill(
        &self,
        dst: &mut Surface,
        comp: &CompositeInfo,
        color: u32,
        rect: &RectI,
        mask: Option<&CoverageMask>,
    ) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, color, ?rect, masked = mask.is_some(), "mask_fill");
        self.inner.mask_fill(dst, comp, color, rect, mask)
    }
}

impl FillRectLoop for Traced<dyn FillRectLoop> {
    fn fill_rect(&self, dst: &mut Surface, state: &RenderState, rect: &RectI) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, ?rect, "fill_rect");
        self.inner.fill_rect(dst, state, rect)
    }
}

impl FillSpansLoop for Traced<dyn FillSpansLoop> {
    fn fill_spans(&self, dst: &mut Surface, state: &RenderState, spans: &[RectI]) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, spans = spans.len(), "fill_spans");
        self.inner.fill_spans(dst, state, spans)
    }
}

impl DrawLineLoop for Traced<dyn DrawLineLoop> {
    fn draw_line(&self, dst: &mut Surface, state: &RenderState, x0: i32, y0: i32, x1: i32, y1: i32) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, x0, y0, x1, y1, "draw_line");
        self.inner.draw_line(dst, state, x0, y0, x1, y1)
    }
}

impl DrawRectLoop for Traced<dyn DrawRectLoop> {
    fn draw_rect(&self, dst: &mut Surface, state: &RenderState, x: i32, y: i32, w: i32, h: i32) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, x, y, w, h, "draw_rect");
        self.inner.draw_rect(dst, state, x, y, w, h)
    }
}

impl DrawPolygonsLoop for Traced<dyn DrawPolygonsLoop> {
    fn draw_polygons(&self, dst: &mut Surface, state: &RenderState, polys: &[Polyline]) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, polys = polys.len(), "draw_polygons");
        self.inner.draw_polygons(dst, state, polys)
    }
}

impl DrawPathLoop for Traced<dyn DrawPathLoop> {
    fn draw_path(&self, dst: &mut Surface, state: &RenderState, path: &Path) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, segments = path.len(), "draw_path");
        self.inner.draw_path(dst, state, path)
    }
}

impl FillPathLoop for Traced<dyn FillPathLoop> {
    fn fill_path(&self, dst: &mut Surface, state: &RenderState, path: &Path, rule: FillingRule) -> LoopResult<()> {
        tracing::trace!(primitive = %self.label, segments = path.len(), ?rule, "fill_path");
        self.inner.fill_path(dst, state, path, rule)
    }
}
