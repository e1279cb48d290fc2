//! Scan conversion of paths.
//!
//! `ScanConverter` walks a `Path`, clips every segment against the clip
//! rectangle and flattens curves with adaptive forward differencing. In
//! draw mode the flattened segments become 1-pixel lines written straight
//! into a `PixelSink`; in fill mode they are collected into a `FillData`
//! polygon and handed to the active edge filler.
//!
//! Internally coordinates are fixed point with `MDP_PREC` fractional bits.
//! Pixel `i` covers `[i - 0.5, i + 0.5)` in user space, so a fixed point
//! value maps to its pixel with `(v + MDP_HALF_MULT) >> MDP_PREC`.

use crate::basics::{FillingRule, RectI};
use crate::bresenham::draw_line;
use crate::clip::{clip_clamp, test_and_clip, ClipResult};
use crate::fill_polygon::FillStore;
use crate::path::{Path, PathSegment};
use crate::pixel_writer::PixelSink;

// ============================================================================
// Fixed point and forward differencing constants
// ============================================================================

pub(crate) const MDP_PREC: i32 = 10;
pub(crate) const MDP_MULT: i32 = 1 << MDP_PREC;
pub(crate) const MDP_HALF_MULT: i32 = MDP_MULT >> 1;
pub(crate) const MDP_W_MASK: i32 = -MDP_MULT;
pub(crate) const MDP_MULT_F: f32 = MDP_MULT as f32;

/// Largest monotonic curve piece, in pixels, flattened without splitting.
const MAX_CUB_SIZE: f32 = 256.0;
const MAX_QUAD_SIZE: f32 = 1024.0;

/// Extra precision bits of the forward differencing.
const FWD_PREC: i32 = 7;

/// Default step counts are `1 << DF_*_STEPS`.
const DF_CUB_STEPS: i32 = 3;
const DF_QUAD_STEPS: i32 = 2;

const DF_CUB_SHIFT: i32 = FWD_PREC + DF_CUB_STEPS * 3 - MDP_PREC;
const DF_QUAD_SHIFT: i32 = FWD_PREC + DF_QUAD_STEPS * 2 - MDP_PREC;

const DF_CUB_COUNT: i32 = 1 << DF_CUB_STEPS;
const DF_QUAD_COUNT: i32 = 1 << DF_QUAD_STEPS;

/// Step halving/doubling thresholds on the differences.
const DF_CUB_DEC_BND: i32 = 1 << (DF_CUB_STEPS * 3 + FWD_PREC + 2);
const DF_CUB_INC_BND: i32 = 1 << (DF_CUB_STEPS * 3 + FWD_PREC - 1);
const DF_QUAD_DEC_BND: i32 = 1 << (DF_QUAD_STEPS * 2 + FWD_PREC + 2);

const CUB_A_MULT: f32 = (1 << FWD_PREC) as f32;
const CUB_B_MULT: f32 = (1 << (DF_CUB_STEPS + FWD_PREC + 1)) as f32;
const CUB_C_MULT: f32 = (1 << (DF_CUB_STEPS * 2 + FWD_PREC)) as f32;

const QUAD_A_MULT: f32 = (1 << FWD_PREC) as f32;
const QUAD_B_MULT: f32 = (1 << (DF_QUAD_STEPS + FWD_PREC)) as f32;

/// Path coordinates outside this range are rejected.
const UPPER_BND: f32 = f32::MAX / 4.0;
const LOWER_BND: f32 = -UPPER_BND;

/// Clip bounds are clamped to this range so that fixed point fits in `i32`.
const UPPER_OUT_BND: i32 = 1 << (30 - MDP_PREC);
const LOWER_OUT_BND: i32 = -UPPER_OUT_BND;

/// Keeps the right and bottom clip edges open.
const EPSF: f32 = 1.0 / MDP_MULT_F;

#[inline]
pub(crate) fn to_fixed(v: f32) -> i32 {
    (v * MDP_MULT_F) as i32
}

#[inline]
fn is_valid(x: f32, y: f32) -> bool {
    x < UPPER_BND && x > LOWER_BND && y < UPPER_BND && y > LOWER_BND
}

// ============================================================================
// Configuration
// ============================================================================

/// Where sample points sit relative to path coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeControl {
    /// Integer coordinates land on pixel centers.
    #[default]
    Normalize,
    /// Coordinates are shifted by half a pixel, so integer coordinates land
    /// on pixel corners.
    Pure,
}

/// Clip rectangle in the forms the converter needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClipBounds {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
    pub x_min_f: f32,
    pub y_min_f: f32,
    pub x_max_f: f32,
    pub y_max_f: f32,
}

impl ClipBounds {
    pub(crate) fn new(clip: &RectI) -> Self {
        let adjust = |v: i32| v.clamp(LOWER_OUT_BND, UPPER_OUT_BND);
        let (x_min, y_min) = (adjust(clip.x1), adjust(clip.y1));
        let (x_max, y_max) = (adjust(clip.x2), adjust(clip.y2));
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            x_min_f: x_min as f32 - 0.5,
            y_min_f: y_min as f32 - 0.5,
            x_max_f: x_max as f32 - 0.5 - EPSF,
            y_max_f: y_max as f32 - 0.5 - EPSF,
        }
    }

    /// The clamped integer clip rectangle.
    pub(crate) fn rect(&self) -> RectI {
        RectI::new(self.x_min, self.y_min, self.x_max, self.y_max)
    }
}

/// Receiver of flattened fixed point segments.
pub(crate) trait FixedLineSink {
    /// `check_bounds` is set when the segment may leave the clip;
    /// `end_sub_path` when it ends at a clip boundary.
    fn process_fixed_line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        check_bounds: bool,
        end_sub_path: bool,
    );

    fn end_sub_path(&mut self);

    /// A new connected subpath begins.
    fn begin_sub_path(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipMode {
    Draw,
    Fill,
}

// ============================================================================
// ScanConverter
// ============================================================================

/// Converts paths into pixels (draw) or spans (fill) inside a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConverter {
    clip: RectI,
    trans_x: i32,
    trans_y: i32,
    stroke: StrokeControl,
}

impl ScanConverter {
    pub fn new(clip: RectI) -> Self {
        Self {
            clip,
            trans_x: 0,
            trans_y: 0,
            stroke: StrokeControl::default(),
        }
    }

    /// Integer offset added to every path coordinate.
    pub fn with_translation(mut self, trans_x: i32, trans_y: i32) -> Self {
        self.trans_x = trans_x;
        self.trans_y = trans_y;
        self
    }

    pub fn with_stroke_control(mut self, stroke: StrokeControl) -> Self {
        self.stroke = stroke;
        self
    }

    pub fn clip(&self) -> RectI {
        self.clip
    }

    pub fn stroke_control(&self) -> StrokeControl {
        self.stroke
    }

    /// Draw the outline of `path` as connected 1-pixel lines.
    ///
    /// Within one subpath no pixel is written an even number of times, so
    /// XOR sinks leave every touched pixel toggled on.
    #[tracing::instrument(level = "trace", skip_all, fields(segments = path.len()))]
    pub fn draw_path<S: PixelSink + ?Sized>(&self, path: &Path, sink: &mut S) {
        if self.clip.is_empty() {
            return;
        }
        let bounds = ClipBounds::new(&self.clip);
        sink.set_target_region(bounds.rect());
        let mut stroker = Stroker::new(&bounds, sink);
        PathProcessor::new(&bounds, ClipMode::Draw, &mut stroker).run(
            path,
            self.trans_x as f32,
            self.trans_y as f32,
            self.stroke,
        );
    }

    /// Fill the interior of `path` under `rule`. Open subpaths are closed
    /// implicitly.
    #[tracing::instrument(level = "trace", skip_all, fields(segments = path.len(), rule = ?rule))]
    pub fn fill_path<S: PixelSink + ?Sized>(&self, path: &Path, rule: FillingRule, sink: &mut S) {
        if self.clip.is_empty() {
            return;
        }
        let bounds = ClipBounds::new(&self.clip);
        let mut store = FillStore::new(&bounds);
        PathProcessor::new(&bounds, ClipMode::Fill, &mut store).run(
            path,
            self.trans_x as f32,
            self.trans_y as f32,
            self.stroke,
        );
        let data = store.into_data();
        tracing::trace!(points = data.len(), "polygon collected");
        sink.set_target_region(bounds.rect());
        data.fill_polygon(rule, bounds.x_max - 1, sink);
    }
}

// ============================================================================
// Draw mode: fixed point segments to pixels
// ============================================================================

/// First and last pixel drawn in the current subpath.
#[derive(Debug, Clone, Copy, Default)]
struct PixelInfo {
    drawn: bool,
    first: (i32, i32),
    last: (i32, i32),
}

impl PixelInfo {
    #[inline]
    fn is_end(&self, p: (i32, i32)) -> bool {
        self.first == p || self.last == p
    }

    fn start(&mut self, p: (i32, i32)) {
        self.drawn = true;
        self.first = p;
        self.last = p;
    }
}

struct Stroker<'a, S: PixelSink + ?Sized> {
    bounds: &'a ClipBounds,
    sink: &'a mut S,
    info: PixelInfo,
}

impl<'a, S: PixelSink + ?Sized> Stroker<'a, S> {
    fn new(bounds: &'a ClipBounds, sink: &'a mut S) -> Self {
        Self {
            bounds,
            sink,
            info: PixelInfo::default(),
        }
    }

    fn point(&mut self, fx: i32, fy: i32, check_bounds: bool) {
        let p = (fx >> MDP_PREC, fy >> MDP_PREC);
        let b = self.bounds;
        if check_bounds && (b.y_min > p.1 || b.y_max <= p.1 || b.x_min > p.0 || b.x_max <= p.0) {
            return;
        }
        if !self.info.drawn {
            self.info.start(p);
            self.sink.write_pixel(p.0, p.1);
        } else if !self.info.is_end(p) {
            self.sink.write_pixel(p.0, p.1);
            self.info.last = p;
        }
    }

    fn line(&mut self, fx0: i32, fy0: i32, fx1: i32, fy1: i32, check_bounds: bool) {
        let p0 = (fx0 >> MDP_PREC, fy0 >> MDP_PREC);
        let p1 = (fx1 >> MDP_PREC, fy1 >> MDP_PREC);

        if p0 == p1 {
            if !self.info.drawn {
                self.info.start(p0);
                self.sink.write_pixel(p0.0, p0.1);
            } else if !self.info.is_end(p0) {
                self.sink.write_pixel(p0.0, p0.1);
                self.info.last = p0;
            }
            return;
        }

        // A joint pixel already drawn is written once more before the line
        // covers it again, keeping its write count odd.
        if self.info.drawn && self.info.is_end(p0) {
            self.sink.write_pixel(p0.0, p0.1);
        }

        let clip = self.bounds.rect();
        draw_line(
            &mut *self.sink,
            p0.0,
            p0.1,
            p1.0,
            p1.1,
            check_bounds.then_some(&clip),
        );

        if !self.info.drawn {
            self.info.start(p0);
        }
        if self.info.is_end(p1) {
            self.sink.write_pixel(p1.0, p1.1);
        }
        self.info.last = p1;
    }
}

/// Move an endpoint that is not on a cell edge to where the segment
/// leaves its cell towards `(bx, by)`, the far column and row edges.
#[inline]
fn snap_to_cell_edge(x: i32, y: i32, bx: i32, by: i32, dx: i64, dy: i64) -> (i32, i32) {
    let fy = y & MDP_W_MASK;
    let cross = y as i64 + ((bx - x) as i64 * dy) / dx;
    if cross >= fy as i64 && cross <= fy as i64 + MDP_MULT as i64 {
        (bx, cross as i32 + MDP_HALF_MULT)
    } else {
        let cross = x as i64 + ((by - y) as i64 * dx) / dy;
        (cross as i32 + MDP_HALF_MULT, by)
    }
}

impl<S: PixelSink + ?Sized> FixedLineSink for Stroker<'_, S> {
    fn process_fixed_line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        check_bounds: bool,
        _end_sub_path: bool,
    ) {
        // Both ends inside one cell.
        let c = (x1 ^ x2) | (y1 ^ y2);
        if c & MDP_W_MASK == 0 {
            if c == 0 {
                self.point(x1 + MDP_HALF_MULT, y1 + MDP_HALF_MULT, check_bounds);
            }
            return;
        }

        let ((rx1, ry1), (rx2, ry2)) = if x1 == x2 || y1 == y2 {
            (
                (x1 + MDP_HALF_MULT, y1 + MDP_HALF_MULT),
                (x2 + MDP_HALF_MULT, y2 + MDP_HALF_MULT),
            )
        } else {
            let dx = x2 as i64 - x1 as i64;
            let dy = y2 as i64 - y1 as i64;
            let (fx1, fy1) = (x1 & MDP_W_MASK, y1 & MDP_W_MASK);
            let (fx2, fy2) = (x2 & MDP_W_MASK, y2 & MDP_W_MASK);

            let start = if fx1 == x1 || fy1 == y1 {
                (x1 + MDP_HALF_MULT, y1 + MDP_HALF_MULT)
            } else {
                let bx1 = if x1 < x2 { fx1 + MDP_MULT } else { fx1 };
                let by1 = if y1 < y2 { fy1 + MDP_MULT } else { fy1 };
                snap_to_cell_edge(x1, y1, bx1, by1, dx, dy)
            };
            let end = if fx2 == x2 || fy2 == y2 {
                (x2 + MDP_HALF_MULT, y2 + MDP_HALF_MULT)
            } else {
                let bx2 = if x1 > x2 { fx2 + MDP_MULT } else { fx2 };
                let by2 = if y1 > y2 { fy2 + MDP_MULT } else { fy2 };
                snap_to_cell_edge(x2, y2, bx2, by2, dx, dy)
            };
            (start, end)
        };

        self.line(rx1, ry1, rx2, ry2, check_bounds);
    }

    fn end_sub_path(&mut self) {}

    fn begin_sub_path(&mut self) {
        self.info = PixelInfo::default();
    }
}

// ============================================================================
// Path walking, clipping and curve flattening
// ============================================================================

struct PathProcessor<'a, C: FixedLineSink> {
    bounds: &'a ClipBounds,
    mode: ClipMode,
    out: &'a mut C,
}

impl<'a, C: FixedLineSink> PathProcessor<'a, C> {
    fn new(bounds: &'a ClipBounds, mode: ClipMode, out: &'a mut C) -> Self {
        Self { bounds, mode, out }
    }

    fn run(&mut self, path: &Path, trans_x: f32, trans_y: f32, stroke: StrokeControl) {
        let (mut tx, mut ty) = (trans_x, trans_y);
        let mut close = [0.0f32; 2];
        if stroke == StrokeControl::Pure {
            close = [-0.5, -0.5];
            tx -= 0.5;
            ty -= 0.5;
        }

        let mut cur = [0.0f32; 2];
        let mut skip = false;
        let mut started = false;

        for seg in path {
            match *seg {
                PathSegment::MoveTo(x, y) => {
                    if started && !skip {
                        self.finish_sub_path(cur, close);
                    }
                    cur = [x + tx, y + ty];
                    if is_valid(cur[0], cur[1]) {
                        started = true;
                        skip = false;
                        close = cur;
                        self.out.begin_sub_path();
                    } else {
                        tracing::trace!(x, y, "skipping invalid move");
                        skip = true;
                    }
                }
                PathSegment::LineTo(x, y) => {
                    let last = [x + tx, y + ty];
                    if !is_valid(last[0], last[1]) {
                        tracing::trace!(x, y, "skipping invalid line");
                        continue;
                    }
                    if skip {
                        cur = last;
                        close = last;
                        started = true;
                        skip = false;
                        self.out.begin_sub_path();
                    } else {
                        self.process_line(cur, last);
                        cur = last;
                    }
                }
                PathSegment::QuadTo(cx, cy, x, y) => {
                    let ctrl = [cx + tx, cy + ty];
                    let last = [x + tx, y + ty];
                    if !is_valid(last[0], last[1]) {
                        tracing::trace!(x, y, "skipping invalid quad");
                        continue;
                    }
                    if skip {
                        cur = last;
                        close = last;
                        started = true;
                        skip = false;
                        self.out.begin_sub_path();
                    } else {
                        if is_valid(ctrl[0], ctrl[1]) {
                            let mut c = [cur[0], cur[1], ctrl[0], ctrl[1], last[0], last[1]];
                            self.process_quad(&mut c);
                        } else {
                            self.process_line(cur, last);
                        }
                        cur = last;
                    }
                }
                PathSegment::CubicTo(c1x, c1y, c2x, c2y, x, y) => {
                    let c1 = [c1x + tx, c1y + ty];
                    let c2 = [c2x + tx, c2y + ty];
                    let last = [x + tx, y + ty];
                    if !is_valid(last[0], last[1]) {
                        tracing::trace!(x, y, "skipping invalid cubic");
                        continue;
                    }
                    if skip {
                        cur = last;
                        close = last;
                        started = true;
                        skip = false;
                        self.out.begin_sub_path();
                    } else {
                        if is_valid(c1[0], c1[1]) && is_valid(c2[0], c2[1]) {
                            let mut c = [
                                cur[0], cur[1], c1[0], c1[1], c2[0], c2[1], last[0], last[1],
                            ];
                            self.process_cubic(&mut c);
                        } else {
                            self.process_line(cur, last);
                        }
                        cur = last;
                    }
                }
                PathSegment::Close => {
                    if started && !skip {
                        if cur != close {
                            self.process_line(cur, close);
                            cur = close;
                        }
                        self.out.end_sub_path();
                    }
                }
            }
        }

        if started && !skip {
            self.finish_sub_path(cur, close);
        }
    }

    /// End a subpath that was not explicitly closed.
    fn finish_sub_path(&mut self, cur: [f32; 2], close: [f32; 2]) {
        if self.mode == ClipMode::Fill && cur != close {
            self.process_line(cur, close);
        }
        self.out.end_sub_path();
    }

    fn process_line(&mut self, p1: [f32; 2], p2: [f32; 2]) {
        let b = *self.bounds;
        let [mut x1, mut y1] = p1;
        let [mut x2, mut y2] = p2;

        let res = test_and_clip(b.y_min_f, b.y_max_f, &mut y1, &mut x1, y2, x2);
        if res == ClipResult::Invisible {
            return;
        }
        let mut clipped = res.is_clipped();
        let res = test_and_clip(b.y_min_f, b.y_max_f, &mut y2, &mut x2, y1, x1);
        if res == ClipResult::Invisible {
            return;
        }
        let mut last_clipped = res.is_clipped();
        clipped |= last_clipped;

        match self.mode {
            ClipMode::Draw => {
                let res = test_and_clip(b.x_min_f, b.x_max_f, &mut x1, &mut y1, x2, y2);
                if res == ClipResult::Invisible {
                    return;
                }
                clipped |= res.is_clipped();
                let res = test_and_clip(b.x_min_f, b.x_max_f, &mut x2, &mut y2, x1, y1);
                if res == ClipResult::Invisible {
                    return;
                }
                last_clipped |= res.is_clipped();
                clipped |= last_clipped;
                self.out.process_fixed_line(
                    to_fixed(x1),
                    to_fixed(y1),
                    to_fixed(x2),
                    to_fixed(y2),
                    clipped,
                    last_clipped,
                );
            }
            ClipMode::Fill => {
                let (res, x3, y3) = clip_clamp(b.x_min_f, b.x_max_f, &mut x1, &mut y1, &mut x2, y2);
                let (fx1, fy1) = (to_fixed(x1), to_fixed(y1));
                match res {
                    ClipResult::MinClipped => self.out.process_fixed_line(
                        to_fixed(x3),
                        to_fixed(y3),
                        fx1,
                        fy1,
                        false,
                        last_clipped,
                    ),
                    ClipResult::Invisible => return,
                    _ => {}
                }

                let (res, x3, y3) = clip_clamp(b.x_min_f, b.x_max_f, &mut x2, &mut y2, &mut x1, y1);
                last_clipped |= res == ClipResult::MaxClipped;
                let (fx2, fy2) = (to_fixed(x2), to_fixed(y2));
                self.out
                    .process_fixed_line(fx1, fy1, fx2, fy2, false, last_clipped);
                if res == ClipResult::MinClipped {
                    self.out.process_fixed_line(
                        fx2,
                        fy2,
                        to_fixed(x3),
                        to_fixed(y3),
                        false,
                        last_clipped,
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Quadratic curves
    // ------------------------------------------------------------------------

    /// Split at the x and y extrema, then process each monotonic piece.
    fn process_quad(&mut self, c: &mut [f32; 6]) {
        let mut params = [0.0f64; 2];
        let mut cnt = 0;

        if let Some(t) = quad_extremum(c[0], c[2], c[4]) {
            params[0] = t;
            cnt = 1;
        }
        if let Some(t) = quad_extremum(c[1], c[3], c[5]) {
            if cnt == 0 {
                params[0] = t;
                cnt = 1;
            } else if params[0] > t {
                params[1] = params[0];
                params[0] = t;
                cnt = 2;
            } else if params[0] < t {
                params[1] = t;
                cnt = 2;
            }
        }

        if cnt > 0 {
            self.first_monotonic_part_of_quad(c, params[0] as f32);
        }
        if cnt == 2 {
            let t = params[1] - params[0];
            if t > 0.0 {
                // Rescale to the remaining piece.
                self.first_monotonic_part_of_quad(c, (t / (1.0 - params[0])) as f32);
            }
        }
        self.process_monotonic_quad(c);
    }

    /// Cut `c` at `t`: the head is processed, `c` keeps the tail.
    fn first_monotonic_part_of_quad(&mut self, c: &mut [f32; 6], t: f32) {
        let mut c1 = [0.0f32; 6];
        c1[0] = c[0];
        c1[1] = c[1];
        c1[2] = c[0] + t * (c[2] - c[0]);
        c1[3] = c[1] + t * (c[3] - c[1]);
        c[2] += t * (c[4] - c[2]);
        c[3] += t * (c[5] - c[3]);
        c[0] = c1[2] + t * (c[2] - c1[2]);
        c[1] = c1[3] + t * (c[3] - c1[3]);
        c1[4] = c[0];
        c1[5] = c[1];
        self.process_monotonic_quad(&mut c1);
    }

    fn process_monotonic_quad(&mut self, c: &mut [f32; 6]) {
        let b = *self.bounds;
        let (x_min, x_max) = min_max(&[c[0], c[2], c[4]]);
        let (y_min, y_max) = min_max(&[c[1], c[3], c[5]]);

        if !self.curve_visible(c, x_min, x_max, y_min, y_max) {
            return;
        }

        if x_max - x_min > MAX_QUAD_SIZE || y_max - y_min > MAX_QUAD_SIZE {
            let mut c1 = [0.0f32; 6];
            c1[4] = c[4];
            c1[5] = c[5];
            c1[2] = (c[2] + c[4]) / 2.0;
            c1[3] = (c[3] + c[5]) / 2.0;
            c[2] = (c[0] + c[2]) / 2.0;
            c[3] = (c[1] + c[3]) / 2.0;
            c[4] = (c[2] + c1[2]) / 2.0;
            c[5] = (c[3] + c1[3]) / 2.0;
            c1[0] = c[4];
            c1[1] = c[5];
            self.process_monotonic_quad(c);
            self.process_monotonic_quad(&mut c1);
        } else {
            let check_bounds = b.x_min_f >= x_min
                || b.x_max_f <= x_max
                || b.y_min_f >= y_min
                || b.y_max_f <= y_max;
            self.draw_monotonic_quad(c, check_bounds);
        }
    }

    fn draw_monotonic_quad(&mut self, c: &[f32; 6], check_bounds: bool) {
        let x0 = to_fixed(c[0]);
        let y0 = to_fixed(c[1]);
        let xe = to_fixed(c[4]);
        let ye = to_fixed(c[5]);

        // Fractional part of the start point.
        let mut px = (x0 & !MDP_W_MASK) << DF_QUAD_SHIFT;
        let mut py = (y0 & !MDP_W_MASK) << DF_QUAD_SHIFT;

        let mut count = DF_QUAD_COUNT;
        let mut shift = DF_QUAD_SHIFT;

        let ax = ((c[0] - 2.0 * c[2] + c[4]) * QUAD_A_MULT) as i32;
        let ay = ((c[1] - 2.0 * c[3] + c[5]) * QUAD_A_MULT) as i32;
        let bx = ((-2.0 * c[0] + 2.0 * c[2]) * QUAD_B_MULT) as i32;
        let by = ((-2.0 * c[1] + 2.0 * c[3]) * QUAD_B_MULT) as i32;

        let ddpx = ax.wrapping_mul(2);
        let ddpy = ay.wrapping_mul(2);
        let mut dpx = ax.wrapping_add(bx);
        let mut dpy = ay.wrapping_add(by);

        let (mut x2, mut y2) = (x0, y0);
        let mut max_dd = ddpx.wrapping_abs().max(ddpy.wrapping_abs());
        let x0w = x0 & MDP_W_MASK;
        let y0w = y0 & MDP_W_MASK;
        let dx = xe.wrapping_sub(x0);
        let dy = ye.wrapping_sub(y0);

        // Curvature is constant, so the step is settled before drawing.
        while max_dd > DF_QUAD_DEC_BND {
            dpx = (dpx << 1).wrapping_sub(ax);
            dpy = (dpy << 1).wrapping_sub(ay);
            count <<= 1;
            max_dd >>= 2;
            px <<= 2;
            py <<= 2;
            shift += 2;
        }

        for _ in 1..count {
            px = px.wrapping_add(dpx);
            py = py.wrapping_add(dpy);
            dpx = dpx.wrapping_add(ddpx);
            dpy = dpy.wrapping_add(ddpy);

            let (x1, y1) = (x2, y2);
            x2 = x0w.wrapping_add(px >> shift);
            y2 = y0w.wrapping_add(py >> shift);

            // Never step past the end point.
            if (xe.wrapping_sub(x2) ^ dx) < 0 {
                x2 = xe;
            }
            if (ye.wrapping_sub(y2) ^ dy) < 0 {
                y2 = ye;
            }
            self.out
                .process_fixed_line(x1, y1, x2, y2, check_bounds, false);
        }

        // The last step lands on the exact end point.
        self.out
            .process_fixed_line(x2, y2, xe, ye, check_bounds, false);
    }

    // ------------------------------------------------------------------------
    // Cubic curves
    // ------------------------------------------------------------------------

    fn process_cubic(&mut self, c: &mut [f32; 8]) {
        let mut params = [0.0f64; 4];
        let mut cnt = 0usize;

        if !is_ordered(&[c[0], c[2], c[4], c[6]]) {
            let a = (-c[0] + 3.0 * c[2] - 3.0 * c[4] + c[6]) as f64;
            let b = (2.0 * (c[0] - 2.0 * c[2] + c[4])) as f64;
            let cc = (-c[0] + c[2]) as f64;
            solve_quad_in_range(a, b, cc, &mut params, &mut cnt);
        }
        if !is_ordered(&[c[1], c[3], c[5], c[7]]) {
            let a = (-c[1] + 3.0 * c[3] - 3.0 * c[5] + c[7]) as f64;
            let b = (2.0 * (c[1] - 2.0 * c[3] + c[5])) as f64;
            let cc = (-c[1] + c[3]) as f64;
            solve_quad_in_range(a, b, cc, &mut params, &mut cnt);
        }

        if cnt > 0 {
            let params = &mut params[..cnt];
            // At most four roots; insertion sort.
            for i in 1..params.len() {
                let value = params[i];
                let mut j = i;
                while j > 0 && params[j - 1] > value {
                    params[j] = params[j - 1];
                    j -= 1;
                }
                params[j] = value;
            }

            self.first_monotonic_part_of_cubic(c, params[0] as f32);
            for i in 1..params.len() {
                let t = params[i] - params[i - 1];
                if t > 0.0 {
                    self.first_monotonic_part_of_cubic(c, (t / (1.0 - params[i - 1])) as f32);
                }
            }
        }
        self.process_monotonic_cubic(c);
    }

    fn first_monotonic_part_of_cubic(&mut self, c: &mut [f32; 8], t: f32) {
        let mut c1 = [0.0f32; 8];
        c1[0] = c[0];
        c1[1] = c[1];
        let tx = c[2] + t * (c[4] - c[2]);
        let ty = c[3] + t * (c[5] - c[3]);
        c1[2] = c[0] + t * (c[2] - c[0]);
        c1[3] = c[1] + t * (c[3] - c[1]);
        c1[4] = c1[2] + t * (tx - c1[2]);
        c1[5] = c1[3] + t * (ty - c1[3]);
        c[4] += t * (c[6] - c[4]);
        c[5] += t * (c[7] - c[5]);
        c[2] = tx + t * (c[4] - tx);
        c[3] = ty + t * (c[5] - ty);
        c[0] = c1[4] + t * (c[2] - c1[4]);
        c[1] = c1[5] + t * (c[3] - c1[5]);
        c1[6] = c[0];
        c1[7] = c[1];
        self.process_monotonic_cubic(&mut c1);
    }

    fn process_monotonic_cubic(&mut self, c: &mut [f32; 8]) {
        let b = *self.bounds;
        let (x_min, x_max) = min_max(&[c[0], c[2], c[4], c[6]]);
        let (y_min, y_max) = min_max(&[c[1], c[3], c[5], c[7]]);

        if !self.curve_visible(c, x_min, x_max, y_min, y_max) {
            return;
        }

        if x_max - x_min > MAX_CUB_SIZE || y_max - y_min > MAX_CUB_SIZE {
            let mut c1 = [0.0f32; 8];
            c1[6] = c[6];
            c1[7] = c[7];
            c1[4] = (c[4] + c[6]) / 2.0;
            c1[5] = (c[5] + c[7]) / 2.0;
            let tx = (c[2] + c[4]) / 2.0;
            let ty = (c[3] + c[5]) / 2.0;
            c1[2] = (tx + c1[4]) / 2.0;
            c1[3] = (ty + c1[5]) / 2.0;
            c[2] = (c[0] + c[2]) / 2.0;
            c[3] = (c[1] + c[3]) / 2.0;
            c[4] = (c[2] + tx) / 2.0;
            c[5] = (c[3] + ty) / 2.0;
            c[6] = (c[4] + c1[2]) / 2.0;
            c[7] = (c[5] + c1[3]) / 2.0;
            c1[0] = c[6];
            c1[1] = c[7];
            self.process_monotonic_cubic(c);
            self.process_monotonic_cubic(&mut c1);
        } else {
            let check_bounds = b.x_min_f > x_min
                || b.x_max_f < x_max
                || b.y_min_f > y_min
                || b.y_max_f < y_max;
            self.draw_monotonic_cubic(c, check_bounds);
        }
    }

    fn draw_monotonic_cubic(&mut self, c: &[f32; 8], check_bounds: bool) {
        let x0 = to_fixed(c[0]);
        let y0 = to_fixed(c[1]);
        let xe = to_fixed(c[6]);
        let ye = to_fixed(c[7]);

        let mut px = (x0 & !MDP_W_MASK) << DF_CUB_SHIFT;
        let mut py = (y0 & !MDP_W_MASK) << DF_CUB_SHIFT;

        let mut inc_bnd1 = DF_CUB_INC_BND;
        let mut inc_bnd2 = DF_CUB_INC_BND << 1;
        let mut dec_bnd1 = DF_CUB_DEC_BND;
        let mut dec_bnd2 = DF_CUB_DEC_BND << 1;

        let mut count = DF_CUB_COUNT;
        let mut shift = DF_CUB_SHIFT;

        let ax = ((-c[0] + 3.0 * c[2] - 3.0 * c[4] + c[6]) * CUB_A_MULT) as i32;
        let ay = ((-c[1] + 3.0 * c[3] - 3.0 * c[5] + c[7]) * CUB_A_MULT) as i32;
        let bx = ((3.0 * c[0] - 6.0 * c[2] + 3.0 * c[4]) * CUB_B_MULT) as i32;
        let by = ((3.0 * c[1] - 6.0 * c[3] + 3.0 * c[5]) * CUB_B_MULT) as i32;
        let cx = ((-3.0 * c[0] + 3.0 * c[2]) * CUB_C_MULT) as i32;
        let cy = ((-3.0 * c[1] + 3.0 * c[3]) * CUB_C_MULT) as i32;

        let dddpx = ax.wrapping_mul(6);
        let dddpy = ay.wrapping_mul(6);
        let mut ddpx = dddpx.wrapping_add(bx);
        let mut ddpy = dddpy.wrapping_add(by);
        let mut dpx = ax.wrapping_add(bx >> 1).wrapping_add(cx);
        let mut dpy = ay.wrapping_add(by >> 1).wrapping_add(cy);

        let (mut x2, mut y2) = (x0, y0);
        let x0w = x0 & MDP_W_MASK;
        let y0w = y0 & MDP_W_MASK;
        let dx = xe.wrapping_sub(x0);
        let dy = ye.wrapping_sub(y0);

        // |v| > bnd1, as a single unsigned comparison.
        let exceeds = |v: i32, bnd1: i32, bnd2: i32| (v.wrapping_add(bnd1) as u32) > bnd2 as u32;

        while count > 0 {
            // Halve the step while the second difference is too large.
            while exceeds(ddpx, dec_bnd1, dec_bnd2) || exceeds(ddpy, dec_bnd1, dec_bnd2) {
                ddpx = (ddpx << 1).wrapping_sub(dddpx);
                ddpy = (ddpy << 1).wrapping_sub(dddpy);
                dpx = (dpx << 2).wrapping_sub(ddpx >> 1);
                dpy = (dpy << 2).wrapping_sub(ddpy >> 1);
                count <<= 1;
                dec_bnd1 <<= 3;
                dec_bnd2 <<= 3;
                inc_bnd1 <<= 3;
                inc_bnd2 <<= 3;
                px <<= 3;
                py <<= 3;
                shift += 3;
            }

            // Double it again on even steps while the first difference is small.
            while count & 1 == 0
                && shift > DF_CUB_SHIFT
                && !exceeds(dpx, inc_bnd1, inc_bnd2)
                && !exceeds(dpy, inc_bnd1, inc_bnd2)
            {
                dpx = (dpx >> 2).wrapping_add(ddpx >> 3);
                dpy = (dpy >> 2).wrapping_add(ddpy >> 3);
                ddpx = ddpx.wrapping_add(dddpx) >> 1;
                ddpy = ddpy.wrapping_add(dddpy) >> 1;
                count >>= 1;
                dec_bnd1 >>= 3;
                dec_bnd2 >>= 3;
                inc_bnd1 >>= 3;
                inc_bnd2 >>= 3;
                px >>= 3;
                py >>= 3;
                shift -= 3;
            }

            count -= 1;

            if count > 0 {
                px = px.wrapping_add(dpx);
                py = py.wrapping_add(dpy);
                dpx = dpx.wrapping_add(ddpx);
                dpy = dpy.wrapping_add(ddpy);
                ddpx = ddpx.wrapping_add(dddpx);
                ddpy = ddpy.wrapping_add(dddpy);

                let (x1, y1) = (x2, y2);
                x2 = x0w.wrapping_add(px >> shift);
                y2 = y0w.wrapping_add(py >> shift);

                if (xe.wrapping_sub(x2) ^ dx) < 0 {
                    x2 = xe;
                }
                if (ye.wrapping_sub(y2) ^ dy) < 0 {
                    y2 = ye;
                }
                self.out
                    .process_fixed_line(x1, y1, x2, y2, check_bounds, false);
            } else {
                self.out
                    .process_fixed_line(x2, y2, xe, ye, check_bounds, false);
            }
        }
    }

    /// Cull a monotonic curve against the clip. In fill mode a curve left
    /// of the clip is flattened onto the left edge instead of dropped.
    fn curve_visible<const N: usize>(
        &self,
        c: &mut [f32; N],
        x_min: f32,
        x_max: f32,
        y_min: f32,
        y_max: f32,
    ) -> bool {
        let b = self.bounds;
        match self.mode {
            ClipMode::Draw => !(b.x_max_f < x_min
                || b.x_min_f > x_max
                || b.y_max_f < y_min
                || b.y_min_f > y_max),
            ClipMode::Fill => {
                if b.y_max_f < y_min || b.y_min_f > y_max || b.x_max_f < x_min {
                    return false;
                }
                if b.x_min_f > x_max {
                    for x in c.iter_mut().step_by(2) {
                        *x = b.x_min_f;
                    }
                }
                true
            }
        }
    }
}

// ============================================================================
// Curve helpers
// ============================================================================

#[inline]
fn min_max(v: &[f32]) -> (f32, f32) {
    let mut lo = v[0];
    let mut hi = v[0];
    for &x in &v[1..] {
        if x < lo {
            lo = x;
        }
        if x > hi {
            hi = x;
        }
    }
    (lo, hi)
}

/// True if the values are monotonic in either direction.
#[inline]
fn is_ordered(v: &[f32]) -> bool {
    v.windows(2).all(|w| w[0] <= w[1]) || v.windows(2).all(|w| w[0] >= w[1])
}

/// Parameter of the extremum of a quadratic Bezier coordinate in `(0, 1)`.
fn quad_extremum(p0: f32, p1: f32, p2: f32) -> Option<f64> {
    if is_ordered(&[p0, p1, p2]) {
        return None;
    }
    let a = (p0 - 2.0 * p1 + p2) as f64;
    if a == 0.0 {
        return None;
    }
    let t = (p0 - p1) as f64 / a;
    (t > 0.0 && t < 1.0).then_some(t)
}

/// Append the roots of `a*t^2 + b*t + c` inside `(0, 1)` to `res`.
fn solve_quad_in_range(a: f64, b: f64, c: f64, res: &mut [f64; 4], cnt: &mut usize) {
    let mut push = |t: f64| {
        if t > 0.0 && t < 1.0 {
            res[*cnt] = t;
            *cnt += 1;
        }
    };
    if a != 0.0 {
        let d = b * b - 4.0 * a * c;
        if d < 0.0 {
            return;
        }
        let mut d = d.sqrt();
        // Pick the sign that keeps b + d large in magnitude.
        if b < 0.0 {
            d = -d;
        }
        let q = (b + d) / -2.0;
        push(q / a);
        if d == 0.0 || q == 0.0 {
            return;
        }
        push(c / q);
    } else if b != 0.0 {
        push(-c / b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_writer::PixelRecorder;
    use std::collections::HashSet;

    fn draw(path: &Path, clip: RectI) -> Vec<(i32, i32)> {
        let mut rec = PixelRecorder::new();
        ScanConverter::new(clip).draw_path(path, &mut rec);
        rec.covered()
    }

    fn line(x0: f32, y0: f32, x1: f32, y1: f32) -> Path {
        let mut p = Path::new();
        p.move_to(x0, y0).line_to(x1, y1);
        p
    }

    #[test]
    fn test_clip_bounds_are_half_open() {
        let b = ClipBounds::new(&RectI::new(0, 0, 10, 20));
        assert_eq!(b.x_min_f, -0.5);
        assert!(b.x_max_f < 9.5 && b.x_max_f > 9.49);
        let huge = ClipBounds::new(&RectI::new(i32::MIN, 0, i32::MAX, 1));
        assert_eq!(huge.x_min, LOWER_OUT_BND);
        assert_eq!(huge.x_max, UPPER_OUT_BND);
    }

    #[test]
    fn test_horizontal_line_pixels() {
        let px = draw(&line(0.0, 0.0, 10.0, 0.0), RectI::new(0, 0, 20, 20));
        assert_eq!(px.len(), 11);
        let set: HashSet<_> = px.iter().copied().collect();
        assert_eq!(set.len(), 11);
        assert!((0..=10).all(|x| set.contains(&(x, 0))));
    }

    #[test]
    fn test_single_point_segment() {
        let px = draw(&line(3.2, 4.1, 3.2, 4.1), RectI::new(0, 0, 20, 20));
        assert_eq!(px, vec![(3, 4)]);
    }

    #[test]
    fn test_connected_polyline_writes_each_pixel_odd_times() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0).line_to(10.0, 0.0).line_to(10.0, 10.0);
        let px = draw(&p, RectI::new(0, 0, 20, 20));
        let mut counts = std::collections::HashMap::new();
        for q in px {
            *counts.entry(q).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 21);
        assert!(counts.values().all(|&n| n % 2 == 1));
    }

    #[test]
    fn test_clipped_line_stays_inside() {
        let clip = RectI::new(0, 0, 8, 8);
        let px = draw(&line(-20.0, 3.0, 40.0, 5.0), clip);
        assert!(!px.is_empty());
        assert!(px.iter().all(|&(x, y)| clip.hit_test(x, y)));
    }

    #[test]
    fn test_invalid_points_are_skipped() {
        let mut p = Path::new();
        p.move_to(f32::NAN, 0.0)
            .line_to(2.0, 2.0)
            .line_to(f32::INFINITY, 2.0)
            .line_to(6.0, 2.0);
        let px = draw(&p, RectI::new(0, 0, 10, 10));
        let set: HashSet<_> = px.into_iter().collect();
        assert_eq!(set.len(), 5);
        assert!((2..=6).all(|x| set.contains(&(x, 2))));
    }

    #[test]
    fn test_pure_stroke_shifts_half_pixel() {
        let mut rec = PixelRecorder::new();
        ScanConverter::new(RectI::new(0, 0, 10, 10))
            .with_stroke_control(StrokeControl::Pure)
            .draw_path(&line(1.5, 1.5, 1.5, 1.5), &mut rec);
        assert_eq!(rec.covered(), vec![(1, 1)]);
    }

    #[test]
    fn test_translation() {
        let mut rec = PixelRecorder::new();
        ScanConverter::new(RectI::new(0, 0, 10, 10))
            .with_translation(3, 2)
            .draw_path(&line(0.0, 0.0, 0.0, 0.0), &mut rec);
        assert_eq!(rec.covered(), vec![(3, 2)]);
    }

    #[test]
    fn test_quad_extremum() {
        assert_eq!(quad_extremum(0.0, 10.0, 0.0), Some(0.5));
        assert_eq!(quad_extremum(0.0, 5.0, 10.0), None);
    }

    #[test]
    fn test_solve_quad_in_range() {
        // (t - 0.25)(t - 0.75) = t^2 - t + 0.1875
        let mut res = [0.0; 4];
        let mut cnt = 0;
        solve_quad_in_range(1.0, -1.0, 0.1875, &mut res, &mut cnt);
        assert_eq!(cnt, 2);
        let mut r = res[..2].to_vec();
        r.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((r[0] - 0.25).abs() < 1e-12);
        assert!((r[1] - 0.75).abs() < 1e-12);
        cnt = 0;
        solve_quad_in_range(0.0, 2.0, -1.0, &mut res, &mut cnt);
        assert_eq!((cnt, res[0]), (1, 0.5));
    }

    #[test]
    fn test_quad_curve_is_connected() {
        let mut p = Path::new();
        p.move_to(1.0, 1.0).quad_to(30.0, 1.0, 30.0, 30.0);
        let px = draw(&p, RectI::new(0, 0, 40, 40));
        let set: HashSet<_> = px.iter().copied().collect();
        assert!(set.contains(&(1, 1)));
        assert!(set.contains(&(30, 30)));
        for &(x, y) in &set {
            if (x, y) == (1, 1) {
                continue;
            }
            let has_neighbor = (-1..=1)
                .flat_map(|dx| (-1..=1).map(move |dy| (dx, dy)))
                .filter(|&d| d != (0, 0))
                .any(|(dx, dy)| set.contains(&(x + dx, y + dy)));
            assert!(has_neighbor, "isolated pixel {x},{y}");
        }
    }

    #[test]
    fn test_cubic_reaches_endpoint() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0)
            .cubic_to(50.0, 0.0, -20.0, 40.0, 30.0, 40.0);
        let px = draw(&p, RectI::new(-50, -50, 100, 100));
        assert!(px.contains(&(0, 0)));
        assert!(px.contains(&(30, 40)));
    }

    // ------------------------------------------------------------------------
    // Flattening accuracy
    // ------------------------------------------------------------------------

    #[derive(Default)]
    struct Segments(Vec<[f64; 4]>);

    impl FixedLineSink for Segments {
        fn process_fixed_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, _: bool, _: bool) {
            let m = MDP_MULT as f64;
            self.0.push([x1 as f64 / m, y1 as f64 / m, x2 as f64 / m, y2 as f64 / m]);
        }

        fn end_sub_path(&mut self) {}
    }

    fn flatten(path: &Path) -> Vec<[f64; 4]> {
        let bounds = ClipBounds::new(&RectI::new(-20000, -20000, 20000, 20000));
        let mut segs = Segments::default();
        PathProcessor::new(&bounds, ClipMode::Draw, &mut segs).run(path, 0.0, 0.0, StrokeControl::Normalize);
        segs.0
    }

    fn cubic_at(c: &[f64; 8], t: f64) -> (f64, f64) {
        let u = 1.0 - t;
        let (a, b, cc, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        (
            a * c[0] + b * c[2] + cc * c[4] + d * c[6],
            a * c[1] + b * c[3] + cc * c[5] + d * c[7],
        )
    }

    fn dist_to_segment(p: (f64, f64), s: &[f64; 4]) -> f64 {
        let (dx, dy) = (s[2] - s[0], s[3] - s[1]);
        let len2 = dx * dx + dy * dy;
        let t = if len2 == 0.0 {
            0.0
        } else {
            (((p.0 - s[0]) * dx + (p.1 - s[1]) * dy) / len2).clamp(0.0, 1.0)
        };
        let (qx, qy) = (s[0] + t * dx, s[1] + t * dy);
        ((p.0 - qx).powi(2) + (p.1 - qy).powi(2)).sqrt()
    }

    /// Symmetric distance between the flattened polyline and the curve,
    /// sampled densely along both.
    fn hausdorff(segs: &[[f64; 4]], c: &[f64; 8]) -> f64 {
        const N: usize = 4000;
        let curve: Vec<_> = (0..=N).map(|i| cubic_at(c, i as f64 / N as f64)).collect();
        let to_poly = curve
            .iter()
            .map(|&p| segs.iter().map(|s| dist_to_segment(p, s)).fold(f64::MAX, f64::min))
            .fold(0.0, f64::max);
        let to_curve = segs
            .iter()
            .flat_map(|s| [(s[0], s[1]), (s[2], s[3])])
            .map(|p| {
                curve
                    .windows(2)
                    .map(|w| dist_to_segment(p, &[w[0].0, w[0].1, w[1].0, w[1].1]))
                    .fold(f64::MAX, f64::min)
            })
            .fold(0.0, f64::max);
        to_poly.max(to_curve)
    }

    #[test]
    fn test_cubic_flattening_within_a_pixel() {
        for c in [
            [0.0, 0.0, 50.0, 0.0, -20.0, 40.0, 30.0, 40.0],
            [10.0, 10.0, 900.0, 50.0, -300.0, 700.0, 800.0, 800.0],
            [3.0, 90.0, 3.5, -40.0, 120.0, 200.0, 121.0, 5.0],
        ] {
            let mut p = Path::new();
            p.move_to(c[0] as f32, c[1] as f32).cubic_to(
                c[2] as f32,
                c[3] as f32,
                c[4] as f32,
                c[5] as f32,
                c[6] as f32,
                c[7] as f32,
            );
            let segs = flatten(&p);
            assert!(!segs.is_empty());
            let d = hausdorff(&segs, &c);
            assert!(d < 1.0, "distance {d} for {c:?}");
        }
    }

    #[test]
    fn test_quad_flattening_within_a_pixel() {
        // A quadratic is the cubic with control points 1/3 and 2/3 of the
        // way toward the quadratic control point.
        let (p0, q, p2) = ((1.0, 1.0), (300.0, 1.0), (300.0, 250.0));
        let lerp = |a: (f64, f64), b: (f64, f64), t: f64| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
        let c1 = lerp(p0, q, 2.0 / 3.0);
        let c2 = lerp(p2, q, 2.0 / 3.0);
        let c = [p0.0, p0.1, c1.0, c1.1, c2.0, c2.1, p2.0, p2.1];

        let mut p = Path::new();
        p.move_to(p0.0 as f32, p0.1 as f32)
            .quad_to(q.0 as f32, q.1 as f32, p2.0 as f32, p2.1 as f32);
        let d = hausdorff(&flatten(&p), &c);
        assert!(d < 1.0, "distance {d}");
    }

    #[test]
    fn test_huge_curve_terminates_at_endpoint() {
        let mut p = Path::new();
        p.move_to(0.0, 0.0)
            .cubic_to(10000.0, 0.0, 0.0, 10000.0, 10000.0, 10000.0);
        let segs = flatten(&p);
        let last = segs.last().copied().unwrap();
        assert_eq!((last[2], last[3]), (10000.0, 10000.0));
        // Joined end to start.
        for w in segs.windows(2) {
            assert_eq!((w[0][2], w[0][3]), (w[1][0], w[1][1]));
        }
    }
}
