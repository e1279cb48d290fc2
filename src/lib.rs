//! # raster-loops
//!
//! Rendering-primitive dispatch over a pixel-format / composite type
//! lattice, with a fixed-point path scan converter and an active-edge
//! polygon filler.
//!
//! A rendering request is an operation kind plus three lattice types:
//! source, composite and destination. The registry finds the most
//! specific loop registered for them, walking each lattice toward its
//! root. When no loop matches, a general handler synthesizes one by
//! converting both sides through 32-bit ARGB and running the generic ARGB
//! loop in between.
//!
//! ## Architecture
//!
//! 1. **Type lattice**: `SurfaceType` and `CompositeType` trees with
//!    stable 8-bit ids
//! 2. **Registry**: exact and ancestor lookup, lazy proxies, general
//!    fallbacks, per-kind render caches
//! 3. **Loops**: ARGB composites, converters, XOR, solid shapes and the
//!    synthesized compositions
//! 4. **Scan converter**: paths to pixels in draw mode (Bresenham with
//!    de-duplication) or fill mode (edge buckets and an active edge list)
//! 5. **Pixel writers**: the sinks the scan converter feeds
//!
//! ```
//! use raster_loops::{
//!     default_registry, PixelLayout, PrimitiveKind, RectI, RegistryOptions, RenderState, Surface,
//! };
//!
//! let registry = default_registry(RegistryOptions::default());
//! let mut dst = Surface::new(PixelLayout::ByteGray, 16, 16);
//! let state = RenderState::new(0xFFFFFFFF);
//! let fill = registry
//!     .locate_cached(PrimitiveKind::FillRect, &state.source_type(), &state.composite_type(), dst.surface_type())
//!     .unwrap()
//!     .unwrap();
//! fill.fill_rect(&mut dst, &state, &RectI::new(2, 2, 6, 6)).unwrap();
//! assert_eq!(dst.get_argb(3, 3), 0xFFFFFFFF);
//! ```

// Foundation
pub mod basics;
pub mod color;
pub mod comp_op;
pub mod error;

// Types and storage
pub mod pixel_layout;
pub mod surface;
pub mod type_lattice;

// Scan conversion
pub mod bresenham;
pub mod clip;
pub mod fill_polygon;
pub mod path;
pub mod pixel_writer;
pub mod process_path;

// Dispatch
pub mod primitive;
pub mod registry;
pub mod render_cache;

// Loops
pub mod argb_loops;
pub mod default_loops;
pub mod general_loops;
pub mod shape_loops;

pub use basics::{FillingRule, RectI};
pub use comp_op::{CompositeInfo, CompositeRule};
pub use default_loops::{default_registry, register_default_loops};
pub use error::{LoopError, LoopResult};
pub use path::Path;
pub use pixel_layout::PixelLayout;
pub use pixel_writer::PixelSink;
pub use primitive::{Polyline, Primitive, PrimitiveKind, PrimitiveSignature, RenderState};
pub use process_path::{ScanConverter, StrokeControl};
pub use registry::{GeneralPrimitive, PrimitiveRegistry, RegistryOptions};
pub use surface::{BlitRegion, CoverageMask, Surface};
pub use type_lattice::{CompositeType, SurfaceType};
