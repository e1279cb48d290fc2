//! Pixel encodings and tagged sample storage.
//!
//! A `PixelLayout` says how one ARGB color is packed into storage words.
//! Storage itself is a `SampleBuffer`, a tagged union over the five word
//! widths. All raw access (read, write, XOR) goes through one generic
//! routine over the private `Word` trait, which moves every word through its
//! `u64` bit pattern. Float and double samples therefore XOR exactly like
//! integers do: bit for bit.

use crate::color::Argb;
use crate::type_lattice::SurfaceType;

// ============================================================================
// Words
// ============================================================================

/// Storage word width of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Byte,
    Short,
    Int,
    Float,
    Double,
}

trait Word: Copy + Default {
    fn to_bits(self) -> u64;
    fn from_bits(bits: u64) -> Self;
}

impl Word for u8 {
    fn to_bits(self) -> u64 {
        self as u64
    }
    fn from_bits(bits: u64) -> Self {
        bits as u8
    }
}

impl Word for u16 {
    fn to_bits(self) -> u64 {
        self as u64
    }
    fn from_bits(bits: u64) -> Self {
        bits as u16
    }
}

impl Word for u32 {
    fn to_bits(self) -> u64 {
        self as u64
    }
    fn from_bits(bits: u64) -> Self {
        bits as u32
    }
}

impl Word for f32 {
    fn to_bits(self) -> u64 {
        f32::to_bits(self) as u64
    }
    fn from_bits(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }
}

impl Word for f64 {
    fn to_bits(self) -> u64 {
        f64::to_bits(self)
    }
    fn from_bits(bits: u64) -> Self {
        f64::from_bits(bits)
    }
}

/// One encoded pixel: up to four storage words as raw bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelValue {
    words: [u64; 4],
    len: u8,
}

impl PixelValue {
    pub fn new(words: &[u64]) -> Self {
        let mut v = Self::default();
        let n = words.len().min(4);
        v.words[..n].copy_from_slice(&words[..n]);
        v.len = n as u8;
        v
    }

    pub fn zero(len: usize) -> Self {
        Self {
            words: [0; 4],
            len: len.min(4) as u8,
        }
    }

    pub fn words(&self) -> &[u64] {
        &self.words[..self.len as usize]
    }

    /// `(self ^ xor) & !mask`, word by word.
    pub fn xor_value(&self, xor: &PixelValue, mask: &PixelValue) -> PixelValue {
        let mut out = *self;
        for i in 0..self.len as usize {
            out.words[i] = (self.words[i] ^ xor.words[i]) & !mask.words[i];
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Write,
    Xor,
}

fn read_words<W: Word>(src: &[W]) -> PixelValue {
    let mut value = PixelValue::default();
    for (i, w) in src.iter().take(4).enumerate() {
        value.words[i] = w.to_bits();
    }
    value.len = src.len().min(4) as u8;
    value
}

fn access_words<W: Word>(dst: &mut [W], value: &PixelValue, op: Access) {
    match op {
        Access::Write => {
            for (d, &v) in dst.iter_mut().zip(value.words()) {
                *d = W::from_bits(v);
            }
        }
        Access::Xor => {
            for (d, &v) in dst.iter_mut().zip(value.words()) {
                *d = W::from_bits(d.to_bits() ^ v);
            }
        }
    }
}

// ============================================================================
// SampleBuffer
// ============================================================================

/// Raw sample storage, one variant per word width.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    Byte(Vec<u8>),
    Short(Vec<u16>),
    Int(Vec<u32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl SampleBuffer {
    pub fn zeroed(kind: SampleKind, len: usize) -> Self {
        match kind {
            SampleKind::Byte => SampleBuffer::Byte(vec![0; len]),
            SampleKind::Short => SampleBuffer::Short(vec![0; len]),
            SampleKind::Int => SampleBuffer::Int(vec![0; len]),
            SampleKind::Float => SampleBuffer::Float(vec![0.0; len]),
            SampleKind::Double => SampleBuffer::Double(vec![0.0; len]),
        }
    }

    pub fn kind(&self) -> SampleKind {
        match self {
            SampleBuffer::Byte(_) => SampleKind::Byte,
            SampleBuffer::Short(_) => SampleKind::Short,
            SampleBuffer::Int(_) => SampleKind::Int,
            SampleBuffer::Float(_) => SampleKind::Float,
            SampleBuffer::Double(_) => SampleKind::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::Byte(v) => v.len(),
            SampleBuffer::Short(v) => v.len(),
            SampleBuffer::Int(v) => v.len(),
            SampleBuffer::Float(v) => v.len(),
            SampleBuffer::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn access(&mut self, offset: usize, value: &PixelValue, op: Access) {
        let range = offset..offset + value.len as usize;
        match self {
            SampleBuffer::Byte(v) => access_words(&mut v[range], value, op),
            SampleBuffer::Short(v) => access_words(&mut v[range], value, op),
            SampleBuffer::Int(v) => access_words(&mut v[range], value, op),
            SampleBuffer::Float(v) => access_words(&mut v[range], value, op),
            SampleBuffer::Double(v) => access_words(&mut v[range], value, op),
        }
    }

    /// Raw words of the pixel starting at `offset`.
    pub fn read(&self, offset: usize, n: usize) -> PixelValue {
        let range = offset..offset + n;
        match self {
            SampleBuffer::Byte(v) => read_words(&v[range]),
            SampleBuffer::Short(v) => read_words(&v[range]),
            SampleBuffer::Int(v) => read_words(&v[range]),
            SampleBuffer::Float(v) => read_words(&v[range]),
            SampleBuffer::Double(v) => read_words(&v[range]),
        }
    }

    pub fn write(&mut self, offset: usize, value: &PixelValue) {
        self.access(offset, value, Access::Write);
    }

    /// XOR raw words into the pixel starting at `offset`.
    pub fn xor(&mut self, offset: usize, value: &PixelValue) {
        self.access(offset, value, Access::Xor);
    }
}

// ============================================================================
// PixelLayout
// ============================================================================

/// How one pixel is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    IntArgb,
    IntArgbPre,
    IntRgb,
    IntBgr,
    ThreeByteBgr,
    FourByteAbgr,
    ByteGray,
    UshortGray,
    Ushort565Rgb,
    Ushort555Rgb,
    FloatGray,
    DoubleGray,
}

impl PixelLayout {
    pub const ALL: [PixelLayout; 12] = [
        PixelLayout::IntArgb,
        PixelLayout::IntArgbPre,
        PixelLayout::IntRgb,
        PixelLayout::IntBgr,
        PixelLayout::ThreeByteBgr,
        PixelLayout::FourByteAbgr,
        PixelLayout::ByteGray,
        PixelLayout::UshortGray,
        PixelLayout::Ushort565Rgb,
        PixelLayout::Ushort555Rgb,
        PixelLayout::FloatGray,
        PixelLayout::DoubleGray,
    ];

    pub fn sample_kind(self) -> SampleKind {
        match self {
            PixelLayout::IntArgb
            | PixelLayout::IntArgbPre
            | PixelLayout::IntRgb
            | PixelLayout::IntBgr => SampleKind::Int,
            PixelLayout::ThreeByteBgr | PixelLayout::FourByteAbgr | PixelLayout::ByteGray => {
                SampleKind::Byte
            }
            PixelLayout::UshortGray | PixelLayout::Ushort565Rgb | PixelLayout::Ushort555Rgb => {
                SampleKind::Short
            }
            PixelLayout::FloatGray => SampleKind::Float,
            PixelLayout::DoubleGray => SampleKind::Double,
        }
    }

    /// Storage words per pixel.
    pub fn samples_per_pixel(self) -> usize {
        match self {
            PixelLayout::ThreeByteBgr => 3,
            PixelLayout::FourByteAbgr => 4,
            _ => 1,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(
            self,
            PixelLayout::IntArgb | PixelLayout::IntArgbPre | PixelLayout::FourByteAbgr
        )
    }

    /// The lattice node describing this layout.
    pub fn surface_type(self) -> SurfaceType {
        match self {
            PixelLayout::IntArgb => SurfaceType::int_argb(),
            PixelLayout::IntArgbPre => SurfaceType::int_argb_pre(),
            PixelLayout::IntRgb => SurfaceType::int_rgb(),
            PixelLayout::IntBgr => SurfaceType::int_bgr(),
            PixelLayout::ThreeByteBgr => SurfaceType::three_byte_bgr(),
            PixelLayout::FourByteAbgr => SurfaceType::four_byte_abgr(),
            PixelLayout::ByteGray => SurfaceType::byte_gray(),
            PixelLayout::UshortGray => SurfaceType::ushort_gray(),
            PixelLayout::Ushort565Rgb => SurfaceType::ushort_565_rgb(),
            PixelLayout::Ushort555Rgb => SurfaceType::ushort_555_rgb(),
            PixelLayout::FloatGray => SurfaceType::float_gray(),
            PixelLayout::DoubleGray => SurfaceType::double_gray(),
        }
    }

    /// Layout whose lattice node is exactly `t`.
    pub fn for_surface_type(t: &SurfaceType) -> Option<PixelLayout> {
        Self::ALL.into_iter().find(|l| l.surface_type() == *t)
    }

    /// Pack a non-premultiplied ARGB color. Layouts without alpha drop it.
    pub fn encode_argb(self, argb: u32) -> PixelValue {
        let c = Argb::from_packed(argb);
        match self {
            PixelLayout::IntArgb => PixelValue::new(&[argb as u64]),
            PixelLayout::IntArgbPre => PixelValue::new(&[c.premultiply().to_packed() as u64]),
            PixelLayout::IntRgb => PixelValue::new(&[(argb & 0x00FF_FFFF) as u64]),
            PixelLayout::IntBgr => PixelValue::new(&[
                ((c.b as u64) << 16) | ((c.g as u64) << 8) | c.r as u64,
            ]),
            PixelLayout::ThreeByteBgr => PixelValue::new(&[c.b as u64, c.g as u64, c.r as u64]),
            PixelLayout::FourByteAbgr => {
                PixelValue::new(&[c.a as u64, c.b as u64, c.g as u64, c.r as u64])
            }
            PixelLayout::ByteGray => PixelValue::new(&[c.luminance() as u64]),
            PixelLayout::UshortGray => PixelValue::new(&[c.luminance() as u64 * 257]),
            PixelLayout::Ushort565Rgb => PixelValue::new(&[((c.r as u64 >> 3) << 11)
                | ((c.g as u64 >> 2) << 5)
                | (c.b as u64 >> 3)]),
            PixelLayout::Ushort555Rgb => PixelValue::new(&[((c.r as u64 >> 3) << 10)
                | ((c.g as u64 >> 3) << 5)
                | (c.b as u64 >> 3)]),
            PixelLayout::FloatGray => {
                PixelValue::new(&[(c.luminance() as f32 / 255.0).to_bits() as u64])
            }
            PixelLayout::DoubleGray => {
                PixelValue::new(&[(c.luminance() as f64 / 255.0).to_bits()])
            }
        }
    }

    /// Unpack raw words into a non-premultiplied ARGB color.
    pub fn decode_argb(self, value: &PixelValue) -> u32 {
        let w = value.words();
        match self {
            PixelLayout::IntArgb => w[0] as u32,
            PixelLayout::IntArgbPre => Argb::from_packed(w[0] as u32).demultiply().to_packed(),
            PixelLayout::IntRgb => 0xFF00_0000 | (w[0] as u32 & 0x00FF_FFFF),
            PixelLayout::IntBgr => {
                let v = w[0] as u32;
                Argb::opaque(v as u8, (v >> 8) as u8, (v >> 16) as u8).to_packed()
            }
            PixelLayout::ThreeByteBgr => Argb::opaque(w[2] as u8, w[1] as u8, w[0] as u8).to_packed(),
            PixelLayout::FourByteAbgr => {
                Argb::new(w[0] as u8, w[3] as u8, w[2] as u8, w[1] as u8).to_packed()
            }
            PixelLayout::ByteGray => Argb::from_gray(w[0] as u8).to_packed(),
            PixelLayout::UshortGray => Argb::from_gray((w[0] >> 8) as u8).to_packed(),
            PixelLayout::Ushort565Rgb => {
                let v = w[0] as u32;
                let r = (v >> 11) & 0x1F;
                let g = (v >> 5) & 0x3F;
                let b = v & 0x1F;
                Argb::opaque(
                    ((r << 3) | (r >> 2)) as u8,
                    ((g << 2) | (g >> 4)) as u8,
                    ((b << 3) | (b >> 2)) as u8,
                )
                .to_packed()
            }
            PixelLayout::Ushort555Rgb => {
                let v = w[0] as u32;
                let r = (v >> 10) & 0x1F;
                let g = (v >> 5) & 0x1F;
                let b = v & 0x1F;
                Argb::opaque(
                    ((r << 3) | (r >> 2)) as u8,
                    ((g << 3) | (g >> 2)) as u8,
                    ((b << 3) | (b >> 2)) as u8,
                )
                .to_packed()
            }
            PixelLayout::FloatGray => {
                let v = f32::from_bits(w[0] as u32);
                Argb::from_gray(crate::color::from_unit(v as f64)).to_packed()
            }
            PixelLayout::DoubleGray => {
                let v = f64::from_bits(w[0]);
                Argb::from_gray(crate::color::from_unit(v)).to_packed()
            }
        }
    }

    /// Words to XOR into the destination for a source color in XOR mode:
    /// `(encode(src) ^ encode(xor)) & !encode(mask)`.
    pub fn xor_value(self, src_argb: u32, xor_pixel: u32, alpha_mask: u32) -> PixelValue {
        let mask = if alpha_mask == 0 {
            PixelValue::zero(self.samples_per_pixel())
        } else {
            self.encode_raw_mask(alpha_mask)
        };
        self.encode_argb(src_argb)
            .xor_value(&self.encode_argb(xor_pixel), &mask)
    }

    // Masks are bit patterns, not colors: alpha must survive for layouts that
    // carry it and premultiplication must not touch the bits.
    fn encode_raw_mask(self, mask: u32) -> PixelValue {
        match self {
            PixelLayout::IntArgbPre => PixelValue::new(&[mask as u64]),
            _ => self.encode_argb(mask),
        }
    }

    pub fn new_buffer(self, pixels: usize) -> SampleBuffer {
        SampleBuffer::zeroed(self.sample_kind(), pixels * self.samples_per_pixel())
    }
}
