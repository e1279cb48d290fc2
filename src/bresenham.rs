//! Exact integer line stepping.
//!
//! One pixel per step along the dominant axis; the minor axis accumulates
//! `2 * minor` per step and advances when the error reaches `2 * major`.
//! Both endpoints are included. The minor offset after `k` steps has the
//! closed form `(2*k*minor + major) / (2*major)`, which lets a clipped line
//! jump straight to its first visible step with the same pixels an
//! unclipped walk would produce.

use crate::basics::RectI;
use crate::pixel_writer::PixelSink;

/// Bresenham stepper over the pixels of `(x0, y0) ..= (x1, y1)`.
///
/// Positions are tracked in i64 so that lines spanning the whole i32 range
/// step without overflow.
#[derive(Debug, Clone)]
pub struct LineStepper {
    x: i64,
    y: i64,
    sx: i64,
    sy: i64,
    x_major: bool,
    d_major: i64,
    d_minor: i64,
    err: i64,
    remaining: u64,
}

impl LineStepper {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self::wide(x0 as i64, y0 as i64, x1 as i64, y1 as i64)
    }

    /// Stepper over endpoints that may lie outside the i32 range, such as
    /// translated device coordinates. Spans must stay below 2^62. Iterating
    /// it only yields exact positions inside the i32 range; `draw_clipped_line`
    /// filters the rest.
    pub fn wide(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let x_major = dx >= dy;
        let (d_major, d_minor) = if x_major { (dx, dy) } else { (dy, dx) };
        Self {
            x: x0,
            y: y0,
            sx: if x1 >= x0 { 1 } else { -1 },
            sy: if y1 >= y0 { 1 } else { -1 },
            x_major,
            d_major,
            d_minor,
            err: d_major,
            remaining: d_major as u64 + 1,
        }
    }

    /// True if x is the dominant axis.
    #[inline]
    pub fn is_x_major(&self) -> bool {
        self.x_major
    }

    /// Pixels left to emit.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.remaining
    }

    /// Minor-axis offset after `k` steps from the start.
    #[inline]
    fn minor_offset(&self, k: i64) -> i64 {
        if self.d_major == 0 {
            return 0;
        }
        let (k, minor, major) = (k as i128, self.d_minor as i128, self.d_major as i128);
        // At most k, so it fits back in i64.
        ((2 * k * minor + major) / (2 * major)) as i64
    }

    /// Advance `k` steps without emitting. Only valid from the start.
    pub fn advance(&mut self, k: u64) {
        let k = k.min(self.remaining);
        if k == 0 {
            return;
        }
        let m = self.minor_offset(k as i64);
        let err = self.d_major as i128 + 2 * k as i128 * self.d_minor as i128 - 2 * m as i128 * self.d_major as i128;
        // 0 <= err < 2 * d_major.
        self.err = err as i64;
        if self.x_major {
            self.x += self.sx * k as i64;
            self.y += self.sy * m;
        } else {
            self.y += self.sy * k as i64;
            self.x += self.sx * m;
        }
        self.remaining -= k;
    }

    /// Next position at full width.
    fn next_wide(&mut self) -> Option<(i64, i64)> {
        if self.remaining == 0 {
            return None;
        }
        let p = (self.x, self.y);
        self.remaining -= 1;
        self.err += 2 * self.d_minor;
        let bump = self.err >= 2 * self.d_major;
        if bump {
            self.err -= 2 * self.d_major;
        }
        if self.x_major {
            self.x += self.sx;
            if bump {
                self.y += self.sy;
            }
        } else {
            self.y += self.sy;
            if bump {
                self.x += self.sx;
            }
        }
        Some(p)
    }
}

impl Iterator for LineStepper {
    type Item = (i32, i32);

    /// Positions of a stepper built with `new` lie between i32 endpoints.
    fn next(&mut self) -> Option<(i32, i32)> {
        self.next_wide().map(|(x, y)| (x as i32, y as i32))
    }
}

/// Step range `[first, last]` along the major axis that stays inside `lo..hi`.
fn major_range(start: i64, step: i64, count: u64, lo: i32, hi: i32) -> Option<(u64, u64)> {
    if count == 0 || lo >= hi {
        return None;
    }
    let (lo, hi) = (lo as i64, hi as i64);
    let (a, b) = if step > 0 {
        (lo - start, hi - 1 - start)
    } else {
        (start - (hi - 1), start - lo)
    };
    let first = a.max(0);
    let last = b.min(count as i64 - 1);
    if first > last {
        None
    } else {
        Some((first as u64, last as u64))
    }
}

/// Draw `(x0, y0) ..= (x1, y1)` into `sink`. With a clip, only pixels inside
/// it are written and the walk starts at the first step that can be visible.
pub fn draw_line<S: PixelSink + ?Sized>(
    sink: &mut S,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    clip: Option<&RectI>,
) {
    match clip {
        Some(clip) => draw_clipped_line(sink, x0 as i64, y0 as i64, x1 as i64, y1 as i64, clip),
        None => {
            for (x, y) in LineStepper::new(x0, y0, x1, y1) {
                sink.write_pixel(x, y);
            }
        }
    }
}

/// Clipped line over wide endpoints. Pixels outside `clip` are never
/// produced, so the i32 range only bounds what is written.
pub fn draw_clipped_line<S: PixelSink + ?Sized>(sink: &mut S, x0: i64, y0: i64, x1: i64, y1: i64, clip: &RectI) {
    let mut stepper = LineStepper::wide(x0, y0, x1, y1);
    let range = if stepper.x_major {
        major_range(x0, stepper.sx, stepper.len(), clip.x1, clip.x2)
    } else {
        major_range(y0, stepper.sy, stepper.len(), clip.y1, clip.y2)
    };
    let Some((first, last)) = range else {
        return;
    };
    stepper.advance(first);
    for _ in first..=last {
        let Some((x, y)) = stepper.next_wide() else {
            break;
        };
        let inside = x >= clip.x1 as i64 && x < clip.x2 as i64 && y >= clip.y1 as i64 && y < clip.y2 as i64;
        if inside {
            sink.write_pixel(x as i32, y as i32);
        }
    }
}
