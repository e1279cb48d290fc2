//! In-memory surfaces, blit regions and coverage masks.
//!
//! A `Surface` pairs tagged sample storage with the `PixelLayout` that
//! encodes it and the lattice `SurfaceType` used for primitive lookup.
//! Surfaces are row-major with no padding between rows.

use crate::basics::{CoverType, RectI};
use crate::pixel_layout::{PixelLayout, PixelValue, SampleBuffer};
use crate::type_lattice::SurfaceType;

// ============================================================================
// Surface
// ============================================================================

#[derive(Debug, Clone)]
pub struct Surface {
    layout: PixelLayout,
    surface_type: SurfaceType,
    width: u32,
    height: u32,
    samples: SampleBuffer,
}

impl Surface {
    /// A zero-filled surface described by the layout's standard type.
    pub fn new(layout: PixelLayout, width: u32, height: u32) -> Self {
        Self {
            layout,
            surface_type: layout.surface_type(),
            width,
            height,
            samples: layout.new_buffer(width as usize * height as usize),
        }
    }

    /// A surface filled with one color.
    pub fn filled(layout: PixelLayout, width: u32, height: u32, argb: u32) -> Self {
        let mut s = Self::new(layout, width, height);
        s.fill(argb);
        s
    }

    /// Override the lattice type, e.g. with a custom subtype of the layout's
    /// standard type that has its own registered loops.
    pub fn with_surface_type(mut self, surface_type: SurfaceType) -> Self {
        self.surface_type = surface_type;
        self
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn surface_type(&self) -> &SurfaceType {
        &self.surface_type
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> RectI {
        RectI::from_size(self.width, self.height)
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.layout.samples_per_pixel()
    }

    #[inline]
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Raw words of a pixel. `None` outside the surface.
    pub fn get_value(&self, x: i32, y: i32) -> Option<PixelValue> {
        if !self.contains(x, y) {
            return None;
        }
        Some(
            self.samples
                .read(self.offset(x, y), self.layout.samples_per_pixel()),
        )
    }

    /// Non-premultiplied ARGB of a pixel; transparent black outside.
    pub fn get_argb(&self, x: i32, y: i32) -> u32 {
        self.get_value(x, y)
            .map(|v| self.layout.decode_argb(&v))
            .unwrap_or(0)
    }

    /// Store raw words. Writes outside the surface are dropped.
    pub fn store_value(&mut self, x: i32, y: i32, value: &PixelValue) {
        if self.contains(x, y) {
            let off = self.offset(x, y);
            self.samples.write(off, value);
        }
    }

    pub fn set_argb(&mut self, x: i32, y: i32, argb: u32) {
        let v = self.layout.encode_argb(argb);
        self.store_value(x, y, &v);
    }

    /// XOR raw words into a pixel. Writes outside the surface are dropped.
    pub fn xor_value(&mut self, x: i32, y: i32, value: &PixelValue) {
        if self.contains(x, y) {
            let off = self.offset(x, y);
            self.samples.xor(off, value);
        }
    }

    pub fn fill(&mut self, argb: u32) {
        let v = self.layout.encode_argb(argb);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                self.store_value(x, y, &v);
            }
        }
    }

    /// Every pixel as ARGB, row by row.
    pub fn to_argb_vec(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                out.push(self.get_argb(x, y));
            }
        }
        out
    }
}

// ============================================================================
// BlitRegion
// ============================================================================

/// Source and destination origins of a rectangular transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlitRegion {
    pub src_x: i32,
    pub src_y: i32,
    pub dst_x: i32,
    pub dst_y: i32,
    pub width: i32,
    pub height: i32,
}

impl BlitRegion {
    pub fn new(src_x: i32, src_y: i32, dst_x: i32, dst_y: i32, width: i32, height: i32) -> Self {
        Self {
            src_x,
            src_y,
            dst_x,
            dst_y,
            width,
            height,
        }
    }

    /// Same origin in source and destination.
    pub fn aligned(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x, y, width, height)
    }

    /// Shrink the region so both ends stay inside their bounds and the
    /// destination stays inside `clip`. `None` when nothing remains.
    pub fn clipped(&self, src_bounds: &RectI, dst_bounds: &RectI, clip: &RectI) -> Option<Self> {
        let mut dst = RectI::new(
            self.dst_x,
            self.dst_y,
            self.dst_x.saturating_add(self.width),
            self.dst_y.saturating_add(self.height),
        );
        if !dst.clip(dst_bounds) || !dst.clip(clip) {
            return None;
        }
        // Source bounds mapped into destination space.
        let dx = self.dst_x - self.src_x;
        let dy = self.dst_y - self.src_y;
        let src_in_dst = RectI::new(
            src_bounds.x1 + dx,
            src_bounds.y1 + dy,
            src_bounds.x2 + dx,
            src_bounds.y2 + dy,
        );
        if !dst.clip(&src_in_dst) {
            return None;
        }
        Some(Self::new(
            dst.x1 - dx,
            dst.y1 - dy,
            dst.x1,
            dst.y1,
            dst.width(),
            dst.height(),
        ))
    }

    /// Offset of this region's destination origin relative to `origin`.
    pub fn shift_from(&self, origin: &BlitRegion) -> (i32, i32) {
        (self.dst_x - origin.dst_x, self.dst_y - origin.dst_y)
    }
}

// ============================================================================
// CoverageMask
// ============================================================================

/// 8-bit coverage aligned with the destination origin of an operation:
/// mask `(0, 0)` covers the first destination pixel of the region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageMask {
    width: u32,
    height: u32,
    data: Vec<CoverType>,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32, data: Vec<CoverType>) -> Self {
        let mut data = data;
        data.resize(width as usize * height as usize, 0);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> CoverType) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Coverage at `(x, y)`, zero outside the mask.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> CoverType {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_set_get() {
        let mut s = Surface::new(PixelLayout::IntRgb, 4, 3);
        s.set_argb(2, 1, 0xFF123456);
        assert_eq!(s.get_argb(2, 1), 0xFF123456);
        assert_eq!(s.get_argb(0, 0), 0xFF000000);
        assert_eq!(s.get_argb(9, 9), 0);
        s.set_argb(-1, 0, 0xFFFFFFFF);
        assert_eq!(s.surface_type(), &SurfaceType::int_rgb());
    }

    #[test]
    fn test_surface_fill() {
        let s = Surface::filled(PixelLayout::ThreeByteBgr, 2, 2, 0xFF0000FF);
        assert!(s.to_argb_vec().iter().all(|&p| p == 0xFF0000FF));
    }

    #[test]
    fn test_xor_value_toggles() {
        let mut s = Surface::new(PixelLayout::IntArgb, 1, 1);
        let v = PixelValue::new(&[0xFF00FF00]);
        s.xor_value(0, 0, &v);
        assert_eq!(s.get_argb(0, 0), 0xFF00FF00);
        s.xor_value(0, 0, &v);
        assert_eq!(s.get_argb(0, 0), 0);
    }

    #[test]
    fn test_blit_region_clipping() {
        let src = RectI::from_size(10, 10);
        let dst = RectI::from_size(8, 8);
        let r = BlitRegion::new(2, 2, -1, 5, 6, 6);
        let c = r.clipped(&src, &dst, &RectI::new(0, 0, 100, 100)).unwrap();
        assert_eq!(c, BlitRegion::new(3, 2, 0, 5, 5, 3));
        assert!(r.clipped(&src, &dst, &RectI::new(50, 50, 60, 60)).is_none());
    }

    #[test]
    fn test_blit_region_source_limits() {
        let src = RectI::from_size(4, 4);
        let dst = RectI::from_size(10, 10);
        let r = BlitRegion::new(2, 2, 0, 0, 5, 5);
        let c = r.clipped(&src, &dst, &dst).unwrap();
        assert_eq!(c, BlitRegion::new(2, 2, 0, 0, 2, 2));
    }

    #[test]
    fn test_mask_outside_is_zero() {
        let m = CoverageMask::from_fn(2, 2, |x, y| (x + y * 2) as u8 * 10);
        assert_eq!(m.get(1, 1), 30);
        assert_eq!(m.get(2, 0), 0);
        assert_eq!(m.get(-1, 0), 0);
    }
}
