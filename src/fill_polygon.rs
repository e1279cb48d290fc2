//! Active edge filler.
//!
//! Fills the flattened polygon collected by the scan converter. Points are
//! bucketed by the scanline band they fall in; the sweep inserts an edge
//! when the first of its endpoints is reached and removes it at the second,
//! keeps the active list sorted by x, and walks it with a winding counter
//! to emit inclusive spans. Scanlines pass through pixel centers.

use crate::basics::FillingRule;
use crate::clip::{clip_clamp, test_and_clip, ClipResult};
use crate::pixel_writer::PixelSink;
use crate::process_path::{ClipBounds, FixedLineSink, MDP_MULT, MDP_MULT_F, MDP_PREC, MDP_W_MASK};

/// Above this `|dx|` the initial edge values are computed in `f64`.
const CALC_BND: i64 = 1 << (30 - MDP_PREC);

// ============================================================================
// FillData
// ============================================================================

/// One polygon vertex in fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillPoint {
    pub x: i32,
    pub y: i32,
    /// No edge connects this point to the next one.
    pub last_point: bool,
}

/// Flattened polygon: consecutive points are joined by edges unless the
/// first of them ends a chain.
#[derive(Debug, Clone, Default)]
pub struct FillData {
    points: Vec<FillPoint>,
    y_min: i32,
    y_max: i32,
}

impl FillData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, x: i32, y: i32, last_point: bool) {
        if self.points.is_empty() {
            self.y_min = y;
            self.y_max = y;
        } else {
            self.y_min = self.y_min.min(y);
            self.y_max = self.y_max.max(y);
        }
        self.points.push(FillPoint { x, y, last_point });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[FillPoint] {
        &self.points
    }

    /// True if the last stored point ends its chain.
    pub fn is_ended(&self) -> bool {
        self.points.last().map_or(false, |p| p.last_point)
    }

    /// Mark the last stored point as the end of its chain.
    pub fn set_ended(&mut self) {
        if let Some(p) = self.points.last_mut() {
            p.last_point = true;
        }
    }

    /// Scan the polygon and emit spans into `sink` under `rule`.
    ///
    /// Spans left open at the end of a row run to `right_bound`, the last
    /// clip column, provided they start at or before it.
    pub fn fill_polygon<S: PixelSink + ?Sized>(
        &self,
        rule: FillingRule,
        right_bound: i32,
        sink: &mut S,
    ) {
        let n = self.points.len();
        if n <= 1 {
            return;
        }
        let pts = &self.points;
        let counter_mask = rule.counter_mask();

        let hash_size = (((self.y_max as i64 - self.y_min as i64) >> MDP_PREC) + 4) as usize;
        let hash_offset = (self.y_min - 1) & MDP_W_MASK;

        // Bucket heads and per-point chains, newest first.
        let mut buckets: Vec<Option<usize>> = vec![None; hash_size];
        let mut next_by_y: Vec<Option<usize>> = vec![None; n];
        for (i, p) in pts.iter().enumerate() {
            let k = ((p.y as i64 - hash_offset as i64 - 1) >> MDP_PREC) as usize;
            next_by_y[i] = buckets[k];
            buckets[k] = Some(i);
        }

        let mut edges = EdgeList::with_capacity(n);
        let mut y = hash_offset as i64 + MDP_MULT as i64;

        for head in buckets {
            if y > self.y_max as i64 {
                break;
            }
            let cy = y as i32;

            let mut cur = head;
            while let Some(i) = cur {
                if i > 0 && !pts[i - 1].last_point {
                    edges.update(pts, i - 1, pts[i - 1].y, cy);
                }
                if !pts[i].last_point && i + 1 < n {
                    edges.update(pts, i, pts[i + 1].y, cy);
                }
                cur = next_by_y[i];
            }

            if !edges.active.is_empty() {
                edges.sort_active();
                edges.emit_row(counter_mask, right_bound, cy >> MDP_PREC, sink);
            }
            y += MDP_MULT as i64;
        }
    }
}

// ============================================================================
// Active edges
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Edge {
    x: i64,
    dx: i64,
    dir: i32,
}

/// Edge storage plus the x-ordered active list.
struct EdgeList {
    edges: Vec<Edge>,
    /// Edge starting at each point, while active.
    edge_of: Vec<Option<usize>>,
    active: Vec<usize>,
}

impl EdgeList {
    fn with_capacity(n: usize) -> Self {
        Self {
            edges: Vec::with_capacity(n),
            edge_of: vec![None; n],
            active: Vec::new(),
        }
    }

    /// Reaching one endpoint of the edge `p -> p + 1` at scanline `cy`,
    /// with `other_y` the y of its opposite endpoint: drop the edge once
    /// both ends are passed, otherwise start it.
    fn update(&mut self, pts: &[FillPoint], p: usize, other_y: i32, cy: i32) {
        match self.edge_of[p] {
            Some(e) if other_y <= cy => {
                if let Some(pos) = self.active.iter().position(|&a| a == e) {
                    self.active.remove(pos);
                }
                self.edge_of[p] = None;
            }
            _ if other_y > cy => self.insert(pts, p, cy),
            _ => {}
        }
    }

    fn insert(&mut self, pts: &[FillPoint], p: usize, cy: i32) {
        let (a, b) = (pts[p], pts[p + 1]);
        // Horizontal edges never cross a scanline.
        if a.y == b.y {
            return;
        }
        let dx = b.x as i64 - a.x as i64;
        let dy = b.y as i64 - a.y as i64;
        let (dir, x, from) = if a.y < b.y {
            (-1, a.x as i64, cy as i64 - a.y as i64)
        } else {
            (1, b.x as i64, cy as i64 - b.y as i64)
        };

        let (step, offset) = if dx.abs() > CALC_BND {
            (
                ((dx as f64) * MDP_MULT as f64 / dy as f64) as i64,
                ((dx as f64) * from as f64 / dy as f64) as i64,
            )
        } else {
            ((dx << MDP_PREC) / dy, (dx * from) / dy)
        };

        let id = self.edges.len();
        self.edges.push(Edge {
            x: x + offset,
            dx: step,
            dir,
        });
        self.active.insert(0, id);
        self.edge_of[p] = Some(id);
    }

    /// Bubble sort by x. The list barely changes between rows, so each
    /// pass only runs up to the last swap of the previous one.
    fn sort_active(&mut self) {
        let edges = &self.edges;
        let mut end = self.active.len();
        while end > 1 {
            let mut last_swap = 0;
            for i in 1..end {
                if edges[self.active[i - 1]].x > edges[self.active[i]].x {
                    self.active.swap(i - 1, i);
                    last_swap = i;
                }
            }
            end = last_swap;
        }
    }

    fn emit_row<S: PixelSink + ?Sized>(
        &mut self,
        counter_mask: i32,
        right_bound: i32,
        row: i32,
        sink: &mut S,
    ) {
        let mut counter = 0i32;
        let mut drawing = false;
        let mut xl = 0i32;
        for &e in &self.active {
            let edge = &mut self.edges[e];
            counter += edge.dir;
            let inside = counter & counter_mask != 0;
            if inside && !drawing {
                xl = ((edge.x + MDP_MULT as i64 - 1) >> MDP_PREC) as i32;
                drawing = true;
            } else if !inside && drawing {
                let xr = ((edge.x - 1) >> MDP_PREC) as i32;
                if xl <= xr {
                    sink.write_scanline(xl, xr, row);
                }
                drawing = false;
            }
            edge.x += edge.dx;
        }
        // Shapes clipped on the right leave the last span open.
        if drawing && xl <= right_bound {
            sink.write_scanline(xl, right_bound, row);
        }
    }
}

// ============================================================================
// FillStore: clipped segments into FillData
// ============================================================================

/// Collects flattened segments for filling. Segments that may leave the
/// clip are cut at the top and bottom and clamped at the left edge in
/// fixed point before they are stored.
pub(crate) struct FillStore {
    out_x_min: i32,
    out_x_max: i32,
    out_y_min: i32,
    out_y_max: i32,
    data: FillData,
}

impl FillStore {
    pub(crate) fn new(bounds: &ClipBounds) -> Self {
        Self {
            out_x_min: (bounds.x_min_f * MDP_MULT_F) as i32,
            out_x_max: (bounds.x_max_f * MDP_MULT_F) as i32,
            out_y_min: (bounds.y_min_f * MDP_MULT_F) as i32,
            out_y_max: (bounds.y_max_f * MDP_MULT_F) as i32,
            data: FillData::new(),
        }
    }

    pub(crate) fn into_data(self) -> FillData {
        self.data
    }

    fn store_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, end_sub_path: bool) {
        if self.data.is_empty() || self.data.is_ended() {
            self.data.add_point(x1, y1, false);
        }
        self.data.add_point(x2, y2, false);
        if end_sub_path {
            self.data.set_ended();
        }
    }
}

impl FixedLineSink for FillStore {
    fn process_fixed_line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        check_bounds: bool,
        end_sub_path: bool,
    ) {
        if !check_bounds {
            self.store_line(x1, y1, x2, y2, end_sub_path);
            return;
        }

        let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);
        let (y_lo, y_hi) = (self.out_y_min, self.out_y_max);
        let (x_lo, x_hi) = (self.out_x_min, self.out_x_max);

        if test_and_clip(y_lo, y_hi, &mut y1, &mut x1, y2, x2) == ClipResult::Invisible {
            return;
        }
        let res = test_and_clip(y_lo, y_hi, &mut y2, &mut x2, y1, x1);
        if res == ClipResult::Invisible {
            return;
        }
        let mut last_clipped = res.is_clipped();

        let (res, x3, y3) = clip_clamp(x_lo, x_hi, &mut x1, &mut y1, &mut x2, y2);
        match res {
            ClipResult::MinClipped => self.store_line(x3, y3, x1, y1, last_clipped),
            ClipResult::Invisible => return,
            _ => {}
        }

        let (res, x3, y3) = clip_clamp(x_lo, x_hi, &mut x2, &mut y2, &mut x1, y1);
        last_clipped |= res == ClipResult::MaxClipped;
        self.store_line(x1, y1, x2, y2, last_clipped);
        if res == ClipResult::MinClipped {
            self.store_line(x2, y2, x3, y3, last_clipped);
        }
    }

    fn end_sub_path(&mut self) {
        self.data.set_ended();
    }
}
