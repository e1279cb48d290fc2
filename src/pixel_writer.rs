//! Pixel sinks: the seam between geometry and storage.
//!
//! The scan converter, the line stepper and the simple shape loops only
//! ever talk to a `PixelSink`. Concrete sinks decide what a "write" means:
//! store a solid pixel, XOR raw words, forward spans to another primitive,
//! or record coordinates.

use crate::basics::RectI;
use crate::pixel_layout::PixelValue;
use crate::surface::Surface;

/// Receives pixels and horizontal spans.
pub trait PixelSink {
    /// Restrict all further writes to `region` (intersected with the
    /// sink's own storage bounds).
    fn set_target_region(&mut self, region: RectI);

    fn write_pixel(&mut self, x: i32, y: i32);

    /// Write pixels `x0..=x1` of row `y`.
    fn write_scanline(&mut self, x0: i32, x1: i32, y: i32) {
        for x in x0..=x1 {
            self.write_pixel(x, y);
        }
    }
}

impl<S: PixelSink + ?Sized> PixelSink for &mut S {
    fn set_target_region(&mut self, region: RectI) {
        (**self).set_target_region(region)
    }

    fn write_pixel(&mut self, x: i32, y: i32) {
        (**self).write_pixel(x, y)
    }

    fn write_scanline(&mut self, x0: i32, x1: i32, y: i32) {
        (**self).write_scanline(x0, x1, y)
    }
}

// ============================================================================
// SolidPixelWriter
// ============================================================================

/// Stores one pre-encoded pixel value.
pub struct SolidPixelWriter<'a> {
    dst: &'a mut Surface,
    value: PixelValue,
    region: RectI,
}

impl<'a> SolidPixelWriter<'a> {
    pub fn new(dst: &'a mut Surface, argb: u32) -> Self {
        let value = dst.layout().encode_argb(argb);
        let region = dst.bounds();
        Self { dst, value, region }
    }
}

impl PixelSink for SolidPixelWriter<'_> {
    fn set_target_region(&mut self, region: RectI) {
        let mut r = region;
        r.clip(&self.dst.bounds());
        self.region = r;
    }

    #[inline]
    fn write_pixel(&mut self, x: i32, y: i32) {
        if self.region.hit_test(x, y) {
            self.dst.store_value(x, y, &self.value);
        }
    }

    fn write_scanline(&mut self, x0: i32, x1: i32, y: i32) {
        if y < self.region.y1 || y >= self.region.y2 {
            return;
        }
        let x0 = x0.max(self.region.x1);
        let x1 = x1.min(self.region.x2 - 1);
        for x in x0..=x1 {
            self.dst.store_value(x, y, &self.value);
        }
    }
}

// ============================================================================
// XorPixelWriter
// ============================================================================

/// XORs `(encode(color) ^ encode(xor_pixel)) & !encode(alpha_mask)` into
/// the destination words. Writing the same pixel twice restores it.
pub struct XorPixelWriter<'a> {
    dst: &'a mut Surface,
    value: PixelValue,
    region: RectI,
}

impl<'a> XorPixelWriter<'a> {
    pub fn new(dst: &'a mut Surface, argb: u32, xor_pixel: u32, alpha_mask: u32) -> Self {
        let value = dst.layout().xor_value(argb, xor_pixel, alpha_mask);
        let region = dst.bounds();
        Self { dst, value, region }
    }
}

impl PixelSink for XorPixelWriter<'_> {
    fn set_target_region(&mut self, region: RectI) {
        let mut r = region;
        r.clip(&self.dst.bounds());
        self.region = r;
    }

    #[inline]
    fn write_pixel(&mut self, x: i32, y: i32) {
        if self.region.hit_test(x, y) {
            self.dst.xor_value(x, y, &self.value);
        }
    }
}

// ============================================================================
// SpanForwarder
// ============================================================================

/// Turns every write into a span handed to a callback. Used to route
/// scan-converted geometry into another primitive's span loop.
pub struct SpanForwarder<F: FnMut(i32, i32, i32)> {
    region: RectI,
    emit: F,
}

impl<F: FnMut(i32, i32, i32)> SpanForwarder<F> {
    /// `emit(x0, x1, y)` receives inclusive spans already clipped to `region`.
    pub fn new(region: RectI, emit: F) -> Self {
        Self { region, emit }
    }
}

impl<F: FnMut(i32, i32, i32)> PixelSink for SpanForwarder<F> {
    fn set_target_region(&mut self, region: RectI) {
        self.region = region;
    }

    fn write_pixel(&mut self, x: i32, y: i32) {
        if self.region.hit_test(x, y) {
            (self.emit)(x, x, y);
        }
    }

    fn write_scanline(&mut self, x0: i32, x1: i32, y: i32) {
        if y < self.region.y1 || y >= self.region.y2 {
            return;
        }
        let x0 = x0.max(self.region.x1);
        let x1 = x1.min(self.region.x2 - 1);
        if x0 <= x1 {
            (self.emit)(x0, x1, y);
        }
    }
}

// ============================================================================
// PixelRecorder
// ============================================================================

/// Records writes in order, without storage.
#[derive(Debug, Default, Clone)]
pub struct PixelRecorder {
    region: Option<RectI>,
    pub pixels: Vec<(i32, i32)>,
    pub spans: Vec<(i32, i32, i32)>,
}

impl PixelRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All covered pixels, individual writes and span members alike.
    pub fn covered(&self) -> Vec<(i32, i32)> {
        let mut out = self.pixels.clone();
        for &(x0, x1, y) in &self.spans {
            out.extend((x0..=x1).map(|x| (x, y)));
        }
        out
    }
}

impl PixelSink for PixelRecorder {
    fn set_target_region(&mut self, region: RectI) {
        self.region = Some(region);
    }

    fn write_pixel(&mut self, x: i32, y: i32) {
        if self.region.map_or(true, |r| r.hit_test(x, y)) {
            self.pixels.push((x, y));
        }
    }

    fn write_scanline(&mut self, x0: i32, x1: i32, y: i32) {
        self.spans.push((x0, x1, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel_layout::PixelLayout;

    #[test]
    fn test_solid_writer_respects_region() {
        let mut s = Surface::new(PixelLayout::IntArgb, 5, 5);
        {
            let mut w = SolidPixelWriter::new(&mut s, 0xFFFF0000);
            w.set_target_region(RectI::new(1, 1, 3, 3));
            w.write_pixel(0, 0);
            w.write_pixel(2, 2);
            w.write_scanline(-5, 10, 1);
        }
        assert_eq!(s.get_argb(0, 0), 0);
        assert_eq!(s.get_argb(2, 2), 0xFFFF0000);
        assert_eq!(s.get_argb(1, 1), 0xFFFF0000);
        assert_eq!(s.get_argb(3, 1), 0);
    }

    #[test]
    fn test_xor_writer_double_write_cancels() {
        let mut s = Surface::filled(PixelLayout::IntRgb, 2, 1, 0xFF808080);
        {
            let mut w = XorPixelWriter::new(&mut s, 0xFFFFFFFF, 0xFF000000, 0);
            w.write_pixel(0, 0);
            w.write_pixel(1, 0);
            w.write_pixel(1, 0);
        }
        assert_eq!(s.get_argb(0, 0), 0xFF7F7F7F);
        assert_eq!(s.get_argb(1, 0), 0xFF808080);
    }

    #[test]
    fn test_xor_writer_bytes() {
        let mut s = Surface::new(PixelLayout::ThreeByteBgr, 1, 1);
        {
            let mut w = XorPixelWriter::new(&mut s, 0xFF0000FF, 0, 0);
            w.write_pixel(0, 0);
        }
        assert_eq!(s.get_argb(0, 0), 0xFF0000FF);
    }

    #[test]
    fn test_span_forwarder_clips() {
        let mut spans = Vec::new();
        {
            let mut f = SpanForwarder::new(RectI::new(0, 0, 10, 10), |a, b, y| spans.push((a, b, y)));
            f.write_scanline(-3, 4, 2);
            f.write_scanline(12, 14, 2);
            f.write_pixel(9, 9);
            f.write_pixel(10, 9);
        }
        assert_eq!(spans, vec![(0, 4, 2), (9, 9, 9)]);
    }

    #[test]
    fn test_recorder_covered() {
        let mut r = PixelRecorder::new();
        r.write_pixel(1, 1);
        r.write_scanline(3, 5, 0);
        assert_eq!(r.covered(), vec![(1, 1), (3, 0), (4, 0), (5, 0)]);
    }
}
