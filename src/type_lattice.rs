//! Surface-format and composite-rule type lattices.
//!
//! Each axis is a tree of reference-counted nodes rooted at a single `Any`
//! node. A node carries a descriptor string, a small integer id drawn from
//! the axis's process-wide `UniqueIdTable`, and a link to its supertype.
//!
//! Identity is by node, not by descriptor: two nodes derived with the same
//! descriptor share an id but are different types for `is_derived_from`,
//! for equality, and for the render cache.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, OnceLock};

use crate::comp_op::CompositeRule;
use crate::error::{LoopError, LoopResult};

// ============================================================================
// UniqueIdTable
// ============================================================================

/// Largest id a descriptor can receive. Ids start at 1.
pub const MAX_TYPE_ID: u8 = 255;

/// Assigns a stable small id to each distinct descriptor string.
///
/// Ids are handed out in registration order from 1 to 255 and are never
/// reused. The 256th distinct descriptor is refused.
#[derive(Debug)]
pub struct UniqueIdTable {
    axis: &'static str,
    ids: Mutex<HashMap<String, u8>>,
}

impl UniqueIdTable {
    pub fn new(axis: &'static str) -> Self {
        Self {
            axis,
            ids: Mutex::new(HashMap::new()),
        }
    }

    pub fn axis(&self) -> &'static str {
        self.axis
    }

    /// Id for `descriptor`, assigning the next free one on first sight.
    pub fn id_for(&self, descriptor: &str) -> LoopResult<u8> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&id) = ids.get(descriptor) {
            return Ok(id);
        }
        if ids.len() >= MAX_TYPE_ID as usize {
            return Err(LoopError::id_space_exhausted(self.axis, descriptor));
        }
        let id = ids.len() as u8 + 1;
        ids.insert(descriptor.to_owned(), id);
        tracing::trace!(axis = self.axis, descriptor, id, "assigned type id");
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Axes
// ============================================================================

/// One axis of the primitive signature.
pub trait Axis: Send + Sync + 'static {
    const NAME: &'static str;
    const ROOT: &'static str;

    /// The process-wide id table of this axis. Initialized once, never reset.
    fn ids() -> &'static UniqueIdTable;
}

#[derive(Debug)]
pub enum SurfaceAxis {}

#[derive(Debug)]
pub enum CompositeAxis {}

impl Axis for SurfaceAxis {
    const NAME: &'static str = "surface";
    const ROOT: &'static str = "Any";

    fn ids() -> &'static UniqueIdTable {
        static IDS: OnceLock<UniqueIdTable> = OnceLock::new();
        IDS.get_or_init(|| UniqueIdTable::new(Self::NAME))
    }
}

impl Axis for CompositeAxis {
    const NAME: &'static str = "composite";
    const ROOT: &'static str = "Any";

    fn ids() -> &'static UniqueIdTable {
        static IDS: OnceLock<UniqueIdTable> = OnceLock::new();
        IDS.get_or_init(|| UniqueIdTable::new(Self::NAME))
    }
}

// ============================================================================
// LatticeType
// ============================================================================

struct Node<A: Axis> {
    descriptor: String,
    id: u8,
    parent: Option<LatticeType<A>>,
    _axis: PhantomData<fn() -> A>,
}

/// A node in one of the type lattices. Cloning shares the node.
pub struct LatticeType<A: Axis>(Arc<Node<A>>);

pub type SurfaceType = LatticeType<SurfaceAxis>;
pub type CompositeType = LatticeType<CompositeAxis>;

impl<A: Axis> LatticeType<A> {
    fn new_node(descriptor: &str, parent: Option<Self>) -> LoopResult<Self> {
        let id = A::ids().id_for(descriptor)?;
        Ok(Self(Arc::new(Node {
            descriptor: descriptor.to_owned(),
            id,
            parent,
            _axis: PhantomData,
        })))
    }

    /// Create a new node whose supertype is `self`.
    pub fn derive_subtype(&self, descriptor: &str) -> LoopResult<Self> {
        Self::new_node(descriptor, Some(self.clone()))
    }

    /// Subtype creation for the built-in lattices.
    ///
    /// # Panics
    ///
    /// Panics if the id space of the axis is already exhausted, which can
    /// only happen when callers registered hundreds of custom descriptors
    /// before touching the standard types.
    fn builtin_subtype(&self, descriptor: &str) -> Self {
        match self.derive_subtype(descriptor) {
            Ok(t) => t,
            Err(e) => panic!("cannot create built-in {} type {descriptor}: {e}", A::NAME),
        }
    }

    fn builtin_root() -> Self {
        match Self::new_node(A::ROOT, None) {
            Ok(t) => t,
            Err(e) => panic!("cannot create {} lattice root: {e}", A::NAME),
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.0.descriptor
    }

    pub fn unique_id(&self) -> u8 {
        self.0.id
    }

    /// Parent node, or `None` at the root.
    pub fn super_type(&self) -> Option<Self> {
        self.0.parent.clone()
    }

    /// True if `self` or any of its ancestors is the very node `other`.
    pub fn is_derived_from(&self, other: &Self) -> bool {
        self.ancestors().any(|t| t == *other)
    }

    /// `self`, then its parent, and so on up to the root.
    pub fn ancestors(&self) -> Ancestors<A> {
        Ancestors {
            next: Some(self.clone()),
        }
    }

    /// Address of the shared node, the identity key of render caches.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl<A: Axis> Clone for LatticeType<A> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<A: Axis> PartialEq for LatticeType<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<A: Axis> Eq for LatticeType<A> {}

impl<A: Axis> Hash for LatticeType<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl<A: Axis> fmt::Debug for LatticeType<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}#{})", A::NAME, self.0.descriptor, self.0.id)
    }
}

impl<A: Axis> fmt::Display for LatticeType<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.descriptor)
    }
}

/// Iterator over a node and its supertypes.
pub struct Ancestors<A: Axis> {
    next: Option<LatticeType<A>>,
}

impl<A: Axis> Iterator for Ancestors<A> {
    type Item = LatticeType<A>;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next.take()?;
        self.next = cur.super_type();
        Some(cur)
    }
}

// ============================================================================
// Standard lattices
// ============================================================================

macro_rules! standard_types {
    ($ty:ident { $( $(#[$m:meta])* $name:ident => $parent:ident, $desc:expr; )* }) => {
        impl $ty {
            $(
                $(#[$m])*
                pub fn $name() -> $ty {
                    static CELL: OnceLock<$ty> = OnceLock::new();
                    CELL.get_or_init(|| $ty::$parent().builtin_subtype($desc)).clone()
                }
            )*
        }
    };
}

impl SurfaceType {
    /// Root of the surface lattice.
    pub fn any() -> SurfaceType {
        static CELL: OnceLock<SurfaceType> = OnceLock::new();
        CELL.get_or_init(SurfaceType::builtin_root).clone()
    }
}

standard_types!(SurfaceType {
    /// Any solid color source.
    any_color => any, "AnyColor";
    /// Solid color with full alpha.
    opaque_color => any_color, "OpaqueColor";
    any_int => any, "AnyInt";
    int_argb => any_int, "IntArgb";
    int_argb_pre => any_int, "IntArgbPre";
    int_rgb => any_int, "IntRgb";
    int_bgr => any_int, "IntBgr";
    any_3byte => any, "Any3Byte";
    three_byte_bgr => any_3byte, "3ByteBgr";
    any_4byte => any, "Any4Byte";
    four_byte_abgr => any_4byte, "4ByteAbgr";
    any_byte => any, "AnyByte";
    byte_gray => any_byte, "ByteGray";
    any_short => any, "AnyShort";
    ushort_gray => any_short, "UshortGray";
    ushort_565_rgb => any_short, "Ushort565Rgb";
    ushort_555_rgb => any_short, "Ushort555Rgb";
    any_float => any, "AnyFloat";
    float_gray => any_float, "FloatGray";
    any_double => any, "AnyDouble";
    double_gray => any_double, "DoubleGray";
});

impl CompositeType {
    /// Root of the composite lattice.
    pub fn any() -> CompositeType {
        static CELL: OnceLock<CompositeType> = OnceLock::new();
        CELL.get_or_init(CompositeType::builtin_root).clone()
    }

    /// Composite type for a Porter-Duff rule.
    ///
    /// `Src` and `SrcOver` without extra alpha map to their `NoEa`
    /// subtypes so loops that ignore extra alpha can be found first.
    pub fn for_rule(rule: CompositeRule, extra_alpha: f32) -> CompositeType {
        let no_ea = extra_alpha >= 1.0;
        match rule {
            CompositeRule::Clear => Self::clear(),
            CompositeRule::Src if no_ea => Self::src_no_ea(),
            CompositeRule::Src => Self::src(),
            CompositeRule::Dst => Self::dst(),
            CompositeRule::SrcOver if no_ea => Self::src_over_no_ea(),
            CompositeRule::SrcOver => Self::src_over(),
            CompositeRule::DstOver => Self::dst_over(),
            CompositeRule::SrcIn => Self::src_in(),
            CompositeRule::DstIn => Self::dst_in(),
            CompositeRule::SrcOut => Self::src_out(),
            CompositeRule::DstOut => Self::dst_out(),
            CompositeRule::SrcAtop => Self::src_atop(),
            CompositeRule::DstAtop => Self::dst_atop(),
            CompositeRule::Xor => Self::porter_duff_xor(),
        }
    }

    /// True for XOR mode, which toggles raw bits instead of blending.
    pub fn is_xor_mode(&self) -> bool {
        self.is_derived_from(&Self::xor_mode())
    }
}

standard_types!(CompositeType {
    /// Any Porter-Duff blend.
    any_alpha => any, "AnyAlpha";
    clear => any_alpha, "Clear";
    src => any_alpha, "Src";
    /// `Src` with extra alpha of exactly one.
    src_no_ea => src, "SrcNoEa";
    dst => any_alpha, "Dst";
    src_over => any_alpha, "SrcOver";
    /// `SrcOver` with extra alpha of exactly one.
    src_over_no_ea => src_over, "SrcOverNoEa";
    dst_over => any_alpha, "DstOver";
    src_in => any_alpha, "SrcIn";
    dst_in => any_alpha, "DstIn";
    src_out => any_alpha, "SrcOut";
    dst_out => any_alpha, "DstOut";
    src_atop => any_alpha, "SrcAtop";
    dst_atop => any_alpha, "DstAtop";
    porter_duff_xor => any_alpha, "AlphaXor";
    /// Raw XOR mode.
    xor_mode => any, "Xor";
});
