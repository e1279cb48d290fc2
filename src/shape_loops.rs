//! Solid-color shape loops.
//!
//! Geometry is walked once, against any `PixelSink`. The registered
//! solid and XOR loops hand it a writer over the destination surface; the
//! general handlers hand it a span collector and pass the spans on to
//! whatever FillSpans primitive the registry resolves for the signature.
//!
//! `translate` applies to line, rectangle, polygon and path coordinates.
//! FillRect and FillSpans take device coordinates.

use std::sync::Arc;

use crate::basics::{FillingRule, RectI};
use crate::bresenham;
use crate::error::{LoopError, LoopResult};
use crate::general_loops::span_delegate;
use crate::path::Path;
use crate::pixel_writer::{PixelSink, SolidPixelWriter, SpanForwarder, XorPixelWriter};
use crate::primitive::{
    DrawLineLoop, DrawPathLoop, DrawPolygonsLoop, DrawRectLoop, FillPathLoop, FillRectLoop, FillSpansLoop, LoopOp,
    Polyline, Primitive, PrimitiveKind, RenderState,
};
use crate::process_path::ScanConverter;
use crate::registry::{GeneralPrimitive, PrimitiveRegistry};
use crate::surface::Surface;
use crate::type_lattice::{CompositeType, SurfaceType};

// ============================================================================
// Geometry
// ============================================================================

fn scan_converter(state: &RenderState, clip: RectI) -> ScanConverter {
    ScanConverter::new(clip)
        .with_translation(state.translate.0, state.translate.1)
        .with_stroke_control(state.stroke)
}

/// Rows of `rect` inside `clip` as scanlines.
pub fn rect_spans<S: PixelSink + ?Sized>(sink: &mut S, clip: &RectI, rect: &RectI) {
    let mut r = *rect;
    if !r.clip(clip) {
        return;
    }
    for y in r.y1..r.y2 {
        sink.write_scanline(r.x1, r.x2 - 1, y);
    }
}

/// Rectangle from edges computed in i64, clamped to the i32 range. The
/// clamp never changes the part inside an i32 clip.
fn clamped_rect(x1: i64, y1: i64, x2: i64, y2: i64) -> RectI {
    let c = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    RectI::new(c(x1), c(y1), c(x2), c(y2))
}

pub fn line<S: PixelSink + ?Sized>(sink: &mut S, state: &RenderState, clip: &RectI, x0: i32, y0: i32, x1: i32, y1: i32) {
    let (tx, ty) = (state.translate.0 as i64, state.translate.1 as i64);
    sink.set_target_region(*clip);
    bresenham::draw_clipped_line(
        sink,
        x0 as i64 + tx,
        y0 as i64 + ty,
        x1 as i64 + tx,
        y1 as i64 + ty,
        clip,
    );
}

/// Outline of the pixels `x..=x + w` by `y..=y + h`, each written once.
/// Rectangles less than two pixels across on either axis are filled.
pub fn rect_outline<S: PixelSink + ?Sized>(
    sink: &mut S,
    state: &RenderState,
    clip: &RectI,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
) {
    if w < 0 || h < 0 {
        return;
    }
    let x = x as i64 + state.translate.0 as i64;
    let y = y as i64 + state.translate.1 as i64;
    let (w, h) = (w as i64, h as i64);
    sink.set_target_region(*clip);
    if w < 2 || h < 2 {
        rect_spans(sink, clip, &clamped_rect(x, y, x + w + 1, y + h + 1));
        return;
    }
    rect_spans(sink, clip, &clamped_rect(x, y, x + w + 1, y + 1));
    rect_spans(sink, clip, &clamped_rect(x, y + 1, x + 1, y + h));
    rect_spans(sink, clip, &clamped_rect(x + w, y + 1, x + w + 1, y + h));
    rect_spans(sink, clip, &clamped_rect(x, y + h, x + w + 1, y + h + 1));
}

/// Each polyline becomes one subpath of the draw-mode scan converter.
pub fn polygons<S: PixelSink + ?Sized>(sink: &mut S, state: &RenderState, clip: &RectI, polys: &[Polyline]) {
    let mut path = Path::new();
    for poly in polys {
        let mut points = poly.points.iter();
        let Some(&(x, y)) = points.next() else {
            continue;
        };
        path.move_to(x as f32, y as f32);
        for &(x, y) in points {
            path.line_to(x as f32, y as f32);
        }
        if poly.closed {
            path.close();
        }
    }
    scan_converter(state, *clip).draw_path(&path, sink);
}

pub fn path_outline<S: PixelSink + ?Sized>(sink: &mut S, state: &RenderState, clip: &RectI, path: &Path) {
    scan_converter(state, *clip).draw_path(path, sink);
}

pub fn path_fill<S: PixelSink + ?Sized>(sink: &mut S, state: &RenderState, clip: &RectI, path: &Path, rule: FillingRule) {
    scan_converter(state, *clip).fill_path(path, rule, sink);
}

// ============================================================================
// Solid and XOR loops
// ============================================================================

/// Destination writer of the solid loops.
enum ShapeWriter<'a> {
    Solid(SolidPixelWriter<'a>),
    Xor(XorPixelWriter<'a>),
}

impl<'a> ShapeWriter<'a> {
    fn new(dst: &'a mut Surface, state: &RenderState, xor: bool) -> Self {
        if xor {
            let c = &state.composite;
            ShapeWriter::Xor(XorPixelWriter::new(dst, state.color, c.xor_pixel, c.alpha_mask))
        } else {
            ShapeWriter::Solid(SolidPixelWriter::new(dst, state.color))
        }
    }
}

impl PixelSink for ShapeWriter<'_> {
    fn set_target_region(&mut self, region: RectI) {
        match self {
            ShapeWriter::Solid(w) => w.set_target_region(region),
            ShapeWriter::Xor(w) => w.set_target_region(region),
        }
    }

    fn write_pixel(&mut self, x: i32, y: i32) {
        match self {
            ShapeWriter::Solid(w) => w.write_pixel(x, y),
            ShapeWriter::Xor(w) => w.write_pixel(x, y),
        }
    }

    fn write_scanline(&mut self, x0: i32, x1: i32, y: i32) {
        match self {
            ShapeWriter::Solid(w) => w.write_scanline(x0, x1, y),
            ShapeWriter::Xor(w) => w.write_scanline(x0, x1, y),
        }
    }
}

/// Every shape kind written straight into the destination, either storing
/// the paint color or XOR-ing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidShapes {
    xor: bool,
}

impl SolidShapes {
    pub fn solid() -> Self {
        Self { xor: false }
    }

    pub fn xor() -> Self {
        Self { xor: true }
    }

    fn with_writer(&self, dst: &mut Surface, state: &RenderState, f: impl FnOnce(&mut ShapeWriter<'_>, &RectI)) {
        let clip = state.device_clip(dst);
        if clip.is_empty() {
            return;
        }
        let mut w = ShapeWriter::new(dst, state, self.xor);
        w.set_target_region(clip);
        f(&mut w, &clip);
    }
}

impl FillRectLoop for SolidShapes {
    fn fill_rect(&self, dst: &mut Surface, state: &RenderState, rect: &RectI) -> LoopResult<()> {
        self.with_writer(dst, state, |w, clip| rect_spans(w, clip, rect));
        Ok(())
    }
}

impl FillSpansLoop for SolidShapes {
    fn fill_spans(&self, dst: &mut Surface, state: &RenderState, spans: &[RectI]) -> LoopResult<()> {
        self.with_writer(dst, state, |w, clip| {
            for span in spans {
                rect_spans(w, clip, span);
            }
        });
        Ok(())
    }
}

impl DrawLineLoop for SolidShapes {
    fn draw_line(&self, dst: &mut Surface, state: &RenderState, x0: i32, y0: i32, x1: i32, y1: i32) -> LoopResult<()> {
        self.with_writer(dst, state, |w, clip| line(w, state, clip, x0, y0, x1, y1));
        Ok(())
    }
}

impl DrawRectLoop for SolidShapes {
    fn draw_rect(&self, dst: &mut Surface, state: &RenderState, x: i32, y: i32, w: i32, h: i32) -> LoopResult<()> {
        self.with_writer(dst, state, |sink, clip| rect_outline(sink, state, clip, x, y, w, h));
        Ok(())
    }
}

impl DrawPolygonsLoop for SolidShapes {
    fn draw_polygons(&self, dst: &mut Surface, state: &RenderState, polys: &[Polyline]) -> LoopResult<()> {
        self.with_writer(dst, state, |w, clip| polygons(w, state, clip, polys));
        Ok(())
    }
}

impl DrawPathLoop for SolidShapes {
    fn draw_path(&self, dst: &mut Surface, state: &RenderState, path: &Path) -> LoopResult<()> {
        self.with_writer(dst, state, |w, clip| path_outline(w, state, clip, path));
        Ok(())
    }
}

impl FillPathLoop for SolidShapes {
    fn fill_path(&self, dst: &mut Surface, state: &RenderState, path: &Path, rule: FillingRule) -> LoopResult<()> {
        self.with_writer(dst, state, |w, clip| path_fill(w, state, clip, path, rule));
        Ok(())
    }
}

/// Shape kinds, in registration order.
pub const SHAPE_KINDS: [PrimitiveKind; 7] = [
    PrimitiveKind::FillRect,
    PrimitiveKind::FillSpans,
    PrimitiveKind::DrawLine,
    PrimitiveKind::DrawRect,
    PrimitiveKind::DrawPolygons,
    PrimitiveKind::DrawPath,
    PrimitiveKind::FillPath,
];

/// One primitive per shape kind for the given signature axes.
pub fn shape_primitives(
    shapes: SolidShapes,
    src: &SurfaceType,
    comp: &CompositeType,
    dst: &SurfaceType,
) -> Vec<Primitive> {
    let l = Arc::new(shapes);
    let ops = [
        LoopOp::FillRect(l.clone()),
        LoopOp::FillSpans(l.clone()),
        LoopOp::DrawLine(l.clone()),
        LoopOp::DrawRect(l.clone()),
        LoopOp::DrawPolygons(l.clone()),
        LoopOp::DrawPath(l.clone()),
        LoopOp::FillPath(l),
    ];
    ops.into_iter()
        .map(|op| Primitive::new(src.clone(), comp.clone(), dst.clone(), op))
        .collect()
}

// ============================================================================
// Span-delegating loops
// ============================================================================

/// Shapes rasterized into spans, then filled by a FillSpans primitive.
pub struct SpanShapes {
    spans: Arc<Primitive>,
}

impl SpanShapes {
    fn run(
        &self,
        dst: &mut Surface,
        state: &RenderState,
        f: impl FnOnce(&mut dyn PixelSink, &RectI),
    ) -> LoopResult<()> {
        let clip = state.device_clip(dst);
        if clip.is_empty() {
            return Ok(());
        }
        let mut rects = Vec::new();
        let mut sink = SpanForwarder::new(clip, |x0, x1, y| rects.push(RectI::new(x0, y, x1 + 1, y + 1)));
        f(&mut sink, &clip);
        if rects.is_empty() {
            return Ok(());
        }
        self.spans.fill_spans(dst, state, &rects)
    }
}

impl DrawLineLoop for SpanShapes {
    fn draw_line(&self, dst: &mut Surface, state: &RenderState, x0: i32, y0: i32, x1: i32, y1: i32) -> LoopResult<()> {
        self.run(dst, state, |s, clip| line(s, state, clip, x0, y0, x1, y1))
    }
}

impl DrawRectLoop for SpanShapes {
    fn draw_rect(&self, dst: &mut Surface, state: &RenderState, x: i32, y: i32, w: i32, h: i32) -> LoopResult<()> {
        self.run(dst, state, |s, clip| rect_outline(s, state, clip, x, y, w, h))
    }
}

impl DrawPolygonsLoop for SpanShapes {
    fn draw_polygons(&self, dst: &mut Surface, state: &RenderState, polys: &[Polyline]) -> LoopResult<()> {
        self.run(dst, state, |s, clip| polygons(s, state, clip, polys))
    }
}

impl DrawPathLoop for SpanShapes {
    fn draw_path(&self, dst: &mut Surface, state: &RenderState, path: &Path) -> LoopResult<()> {
        self.run(dst, state, |s, clip| path_outline(s, state, clip, path))
    }
}

impl FillPathLoop for SpanShapes {
    fn fill_path(&self, dst: &mut Surface, state: &RenderState, path: &Path, rule: FillingRule) -> LoopResult<()> {
        self.run(dst, state, |s, clip| path_fill(s, state, clip, path, rule))
    }
}

/// General handler for the geometric kinds, built from FillSpans.
#[derive(Debug, Clone, Copy)]
pub struct GeneralShape {
    kind: PrimitiveKind,
}

impl GeneralShape {
    /// Kinds this handler can build.
    pub const KINDS: [PrimitiveKind; 5] = [
        PrimitiveKind::DrawLine,
        PrimitiveKind::DrawRect,
        PrimitiveKind::DrawPolygons,
        PrimitiveKind::DrawPath,
        PrimitiveKind::FillPath,
    ];

    /// `None` for kinds that are not span-built shapes.
    pub fn new(kind: PrimitiveKind) -> Option<Self> {
        Self::KINDS.contains(&kind).then_some(Self { kind })
    }
}

impl GeneralPrimitive for GeneralShape {
    fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    fn make_primitive(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive> {
        let spans = span_delegate(registry, self.kind, src, comp, dst)?;
        let l = Arc::new(SpanShapes { spans });
        let op = match self.kind {
            PrimitiveKind::DrawLine => LoopOp::DrawLine(l),
            PrimitiveKind::DrawRect => LoopOp::DrawRect(l),
            PrimitiveKind::DrawPolygons => LoopOp::DrawPolygons(l),
            PrimitiveKind::DrawPath => LoopOp::DrawPath(l),
            PrimitiveKind::FillPath => LoopOp::FillPath(l),
            other => return Err(LoopError::wrong_loop_kind("shape", other.name())),
        };
        Ok(Primitive::new(src.clone(), comp.clone(), dst.clone(), op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comp_op::CompositeInfo;
    use crate::pixel_layout::PixelLayout;
    use crate::pixel_writer::PixelRecorder;
    use std::collections::HashSet;

    const WHITE: u32 = 0xFFFFFFFF;
    const BLACK: u32 = 0xFF000000;

    fn lit(s: &Surface) -> HashSet<(i32, i32)> {
        let mut out = HashSet::new();
        for y in 0..s.height() as i32 {
            for x in 0..s.width() as i32 {
                if s.get_argb(x, y) != BLACK {
                    out.insert((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn test_rect_outline_writes_each_pixel_once() {
        let mut rec = PixelRecorder::new();
        let state = RenderState::new(WHITE);
        rect_outline(&mut rec, &state, &RectI::new(0, 0, 100, 100), 2, 3, 4, 5);
        let covered = rec.covered();
        let unique: HashSet<_> = covered.iter().copied().collect();
        assert_eq!(covered.len(), unique.len());
        // Perimeter of a 5 x 6 pixel box.
        assert_eq!(unique.len(), 2 * 5 + 2 * 4);
        assert!(unique.contains(&(2, 3)));
        assert!(unique.contains(&(6, 8)));
        assert!(!unique.contains(&(4, 5)));
    }

    #[test]
    fn test_thin_rect_is_filled() {
        let mut rec = PixelRecorder::new();
        rect_outline(&mut rec, &RenderState::new(WHITE), &RectI::new(0, 0, 100, 100), 0, 0, 5, 1);
        assert_eq!(rec.covered().len(), 12);
        let mut rec = PixelRecorder::new();
        rect_outline(&mut rec, &RenderState::new(WHITE), &RectI::new(0, 0, 100, 100), 0, 0, 5, -1);
        assert!(rec.covered().is_empty());
    }

    #[test]
    fn test_solid_line_translated_and_clipped() {
        let mut dst = Surface::new(PixelLayout::IntRgb, 8, 8);
        let state = RenderState::new(WHITE)
            .with_translation(1, 1)
            .with_clip(RectI::new(0, 0, 5, 8));
        SolidShapes::solid().draw_line(&mut dst, &state, 0, 0, 9, 0).unwrap();
        let px = lit(&dst);
        assert_eq!(px.len(), 4);
        assert!(px.contains(&(1, 1)));
        assert!(px.contains(&(4, 1)));
    }

    #[test]
    fn test_translation_past_i32_max_is_clipped_away() {
        let clip = RectI::new(0, 0, 10, 10);
        let state = RenderState::new(WHITE).with_translation(1, 0);
        let mut rec = PixelRecorder::new();
        line(&mut rec, &state, &clip, i32::MAX, 0, i32::MAX, 0);
        rect_outline(&mut rec, &state, &clip, i32::MAX, 0, 4, 4);
        rect_outline(&mut rec, &state, &clip, i32::MAX - 2, 0, i32::MAX, 1);
        assert!(rec.covered().is_empty());

        let mut dst = Surface::new(PixelLayout::IntRgb, 10, 10);
        let solid = SolidShapes::solid();
        solid.draw_line(&mut dst, &state, i32::MAX, 0, i32::MAX, 9).unwrap();
        solid.draw_rect(&mut dst, &state, i32::MAX, 0, 3, 3).unwrap();
        assert!(lit(&dst).is_empty());
    }

    #[test]
    fn test_wide_rect_keeps_visible_edges() {
        // Left edge at 2; the right edge lies past i32::MAX.
        let mut rec = PixelRecorder::new();
        let state = RenderState::new(WHITE).with_translation(1, 0);
        rect_outline(&mut rec, &state, &RectI::new(0, 0, 8, 8), 1, 1, i32::MAX, 4);
        let px: HashSet<_> = rec.covered().into_iter().collect();
        assert!(px.contains(&(2, 3)));
        assert!(px.contains(&(7, 1)));
        assert!(px.contains(&(7, 5)));
        assert!(!px.contains(&(7, 3)));
    }

    #[test]
    fn test_xor_rect_twice_restores() {
        let mut dst = Surface::filled(PixelLayout::ThreeByteBgr, 6, 6, BLACK);
        let state = RenderState::new(WHITE).with_composite(CompositeInfo::xor_mode(0, 0));
        let xor = SolidShapes::xor();
        xor.draw_rect(&mut dst, &state, 0, 0, 5, 5).unwrap();
        assert_eq!(lit(&dst).len(), 20);
        xor.draw_rect(&mut dst, &state, 0, 0, 5, 5).unwrap();
        assert!(lit(&dst).is_empty());
    }

    #[test]
    fn test_fill_path_square() {
        let mut dst = Surface::new(PixelLayout::ByteGray, 12, 12);
        let path = Path::polygon(&[(1.5, 1.5), (5.5, 1.5), (5.5, 5.5), (1.5, 5.5)], true);
        SolidShapes::solid()
            .fill_path(&mut dst, &RenderState::new(WHITE), &path, FillingRule::NonZero)
            .unwrap();
        let px = lit(&dst);
        assert_eq!(px.len(), 16);
        assert!(px.contains(&(2, 2)));
        assert!(px.contains(&(5, 5)));
    }

    #[test]
    fn test_polygons_open_and_closed() {
        let mut rec = PixelRecorder::new();
        let state = RenderState::new(WHITE);
        let clip = RectI::new(0, 0, 50, 50);
        let open = Polyline::new(vec![(0, 0), (10, 0), (10, 10)], false);
        polygons(&mut rec, &state, &clip, &[open.clone()]);
        let open_px: HashSet<_> = rec.covered().into_iter().collect();
        assert_eq!(open_px.len(), 21);

        let mut rec = PixelRecorder::new();
        let closed = Polyline::new(open.points.clone(), true);
        polygons(&mut rec, &state, &clip, &[closed, Polyline::default()]);
        let closed_px: HashSet<_> = rec.covered().into_iter().collect();
        assert!(closed_px.is_superset(&open_px));
        assert!(closed_px.contains(&(5, 5)));
    }

    #[test]
    fn test_general_shape_kinds() {
        assert!(GeneralShape::new(PrimitiveKind::DrawPath).is_some());
        assert!(GeneralShape::new(PrimitiveKind::Blit).is_none());
        assert!(GeneralShape::new(PrimitiveKind::FillSpans).is_none());
    }

    #[test]
    fn test_shape_primitives_cover_all_kinds() {
        let prims = shape_primitives(
            SolidShapes::solid(),
            &SurfaceType::any_color(),
            &CompositeType::src_no_ea(),
            &SurfaceType::any(),
        );
        let kinds: Vec<_> = prims.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, SHAPE_KINDS.to_vec());
    }
}
