//! Primitive registry: exact and ancestor lookup, lazy proxies, general
//! fallbacks and per-kind render caches.
//!
//! The table is a flat list sorted by packed unique id on demand. Lookup
//! walks the three lattices from the requested types up to their roots,
//! destination outermost and composite innermost, and binary-searches the
//! table at each step. When nothing matches, the general handler
//! registered for the kind is asked to synthesize a primitive.
//!
//! A registry is an ordinary value; build as many as needed. All methods
//! take `&self` and lock internally. Proxy factories and general
//! synthesis run with no table lock held, so they may call back into the
//! registry. A proxy factory runs at most once; lookups racing on the same
//! proxy wait for it, so a factory must not look up its own signature.

use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{LoopError, LoopResult};
use crate::primitive::{make_unique_id, Primitive, PrimitiveKind, PrimitiveSignature};
use crate::render_cache::RenderCache;
use crate::type_lattice::{CompositeType, SurfaceType};

// ============================================================================
// Configuration
// ============================================================================

/// Tunables of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Entries per operation kind in the `locate_cached` caches.
    pub render_cache_capacity: usize,
    /// Wrap every primitive handed out in the logging decorator.
    pub trace_primitives: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            render_cache_capacity: 8,
            trace_primitives: false,
        }
    }
}

// ============================================================================
// Proxies and general handlers
// ============================================================================

/// Deferred constructor of a registered primitive.
pub type ProxyFactory = Box<dyn Fn() -> Primitive + Send + Sync>;

struct PrimitiveProxy {
    signature: PrimitiveSignature,
    factory: ProxyFactory,
    /// Outcome of the one factory run; racing lookups wait for it.
    instance: OnceLock<LoopResult<Arc<Primitive>>>,
}

impl PrimitiveProxy {
    /// Run the factory and check the result against the advertised
    /// signature.
    fn instantiate(&self) -> LoopResult<Primitive> {
        let p = (self.factory)();
        let s = &self.signature;
        if !p.signature().matches(s.kind, &s.src, &s.comp, &s.dst) {
            return Err(LoopError::proxy_mismatch(
                s.to_string(),
                p.signature().to_string(),
            ));
        }
        Ok(p)
    }
}

/// Fallback for one operation kind that builds a primitive for any
/// signature it supports.
pub trait GeneralPrimitive: Send + Sync {
    fn kind(&self) -> PrimitiveKind;

    /// Build a primitive for `(src, comp, dst)`, looking up the loops it
    /// composes in `registry`.
    ///
    /// `CannotSynthesize` marks a signature the handler does not support;
    /// the registry treats it as a miss. Any other error is a
    /// configuration fault.
    fn make_primitive(
        &self,
        registry: &PrimitiveRegistry,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Primitive>;
}

// ============================================================================
// Table
// ============================================================================

#[derive(Clone)]
enum Slot {
    Ready(Arc<Primitive>),
    Proxy(Arc<PrimitiveProxy>),
}

struct Entry {
    id: u32,
    slot: Slot,
}

impl Entry {
    fn signature(&self) -> &PrimitiveSignature {
        match &self.slot {
            Slot::Ready(p) => p.signature(),
            Slot::Proxy(p) => &p.signature,
        }
    }
}

#[derive(Default)]
struct Table {
    entries: Vec<Entry>,
    needs_sort: bool,
}

impl Table {
    fn push(&mut self, id: u32, slot: Slot) {
        self.entries.push(Entry { id, slot });
        self.needs_sort = true;
    }

    fn sort_if_needed(&mut self) {
        if self.needs_sort {
            // Stable: among equal ids the latest registration stays last.
            self.entries.sort_by_key(|e| e.id);
            self.needs_sort = false;
        }
    }

    /// Index of the newest entry with `id`. The table must be sorted.
    fn find(&self, id: u32) -> Option<usize> {
        let end = self.entries.partition_point(|e| e.id <= id);
        if end > 0 && self.entries[end - 1].id == id {
            Some(end - 1)
        } else {
            None
        }
    }
}

// ============================================================================
// PrimitiveRegistry
// ============================================================================

pub struct PrimitiveRegistry {
    options: RegistryOptions,
    table: Mutex<Table>,
    generals: Mutex<Vec<Arc<dyn GeneralPrimitive>>>,
    caches: [RenderCache<Arc<Primitive>>; 10],
}

impl Default for PrimitiveRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            options,
            table: Mutex::new(Table::default()),
            generals: Mutex::new(Vec::new()),
            caches: std::array::from_fn(|_| RenderCache::new(options.render_cache_capacity)),
        }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    fn table(&self) -> std::sync::MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn prepare(&self, p: Primitive) -> Arc<Primitive> {
        if self.options.trace_primitives {
            Arc::new(p.traced())
        } else {
            Arc::new(p)
        }
    }

    fn invalidate_caches(&self) {
        for c in &self.caches {
            c.clear();
        }
    }

    /// Number of table entries, proxies included.
    pub fn len(&self) -> usize {
        self.table().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Signatures of every table entry in search order.
    pub fn signatures(&self) -> Vec<PrimitiveSignature> {
        let mut table = self.table();
        table.sort_if_needed();
        table.entries.iter().map(|e| e.signature().clone()).collect()
    }

    /// Add primitives to the exact-match table. A later registration with
    /// the same unique id shadows an earlier one.
    pub fn register<I: IntoIterator<Item = Primitive>>(&self, prims: I) {
        let prims: Vec<Arc<Primitive>> = prims.into_iter().map(|p| self.prepare(p)).collect();
        if prims.is_empty() {
            return;
        }
        tracing::debug!(count = prims.len(), "registering primitives");
        let mut table = self.table();
        for p in prims {
            table.push(p.unique_id(), Slot::Ready(p));
        }
        drop(table);
        self.invalidate_caches();
    }

    /// Register a primitive that is built on first lookup. The factory must
    /// produce a primitive with exactly `signature`.
    pub fn register_proxy<F>(&self, signature: PrimitiveSignature, factory: F)
    where
        F: Fn() -> Primitive + Send + Sync + 'static,
    {
        tracing::debug!(%signature, "registering proxy");
        let id = signature.unique_id();
        let proxy = PrimitiveProxy {
            signature,
            factory: Box::new(factory),
            instance: OnceLock::new(),
        };
        self.table().push(id, Slot::Proxy(Arc::new(proxy)));
        self.invalidate_caches();
    }

    /// Register the fallback handler of one kind. The first handler
    /// registered for a kind is the one used.
    pub fn register_general(&self, general: Arc<dyn GeneralPrimitive>) {
        tracing::debug!(kind = %general.kind(), "registering general primitive");
        self.generals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(general);
        self.invalidate_caches();
    }

    fn general_for(&self, kind: PrimitiveKind) -> Option<Arc<dyn GeneralPrimitive>> {
        self.generals
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|g| g.kind() == kind)
            .cloned()
    }

    /// Exact or ancestor match, without synthesis.
    ///
    /// Errors only when a matched proxy instantiates into a primitive that
    /// disagrees with its advertised signature.
    pub fn locate_prim(
        &self,
        kind: PrimitiveKind,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Option<Arc<Primitive>>> {
        let found = {
            let mut table = self.table();
            table.sort_if_needed();
            let mut found = None;
            'walk: for d in dst.ancestors() {
                for s in src.ancestors() {
                    for c in comp.ancestors() {
                        let id = make_unique_id(kind, &s, &c, &d);
                        if let Some(i) = table.find(id) {
                            found = Some(table.entries[i].slot.clone());
                            break 'walk;
                        }
                    }
                }
            }
            found
        };
        match found {
            None => Ok(None),
            Some(Slot::Ready(p)) => Ok(Some(p)),
            Some(Slot::Proxy(proxy)) => self.resolve_proxy(&proxy).map(Some),
        }
    }

    /// Instantiate a proxy and swap it for the result in the table. The
    /// factory runs once per proxy; every caller gets the same instance or
    /// the same fault.
    fn resolve_proxy(&self, proxy: &Arc<PrimitiveProxy>) -> LoopResult<Arc<Primitive>> {
        let p = proxy
            .instance
            .get_or_init(|| {
                tracing::debug!(signature = %proxy.signature, "instantiating proxy");
                proxy.instantiate().map(|p| self.prepare(p)).map_err(|e| {
                    tracing::warn!(error = %e, "proxy instantiation failed");
                    e
                })
            })
            .clone()?;
        let mut table = self.table();
        for e in table.entries.iter_mut() {
            if matches!(&e.slot, Slot::Proxy(q) if Arc::ptr_eq(q, proxy)) {
                e.slot = Slot::Ready(p.clone());
                break;
            }
        }
        Ok(p)
    }

    /// Find a primitive for the signature, synthesizing one from the
    /// kind's general handler when the table has no match.
    ///
    /// `Ok(None)` is an ordinary miss: no match and either no general
    /// handler or a handler that refuses the signature.
    #[tracing::instrument(level = "debug", skip_all, fields(kind = %kind, src = %src, comp = %comp, dst = %dst))]
    pub fn locate(
        &self,
        kind: PrimitiveKind,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Option<Arc<Primitive>>> {
        if let Some(p) = self.locate_prim(kind, src, comp, dst)? {
            return Ok(Some(p));
        }
        let Some(general) = self.general_for(kind) else {
            tracing::debug!("no match and no general primitive");
            return Ok(None);
        };
        match general.make_primitive(self, src, comp, dst) {
            Ok(p) => {
                tracing::debug!(primitive = %p, "synthesized");
                Ok(Some(self.prepare(p)))
            }
            Err(e) if e.is_refusal() => {
                tracing::debug!(error = %e, "synthesis refused");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// `locate` through the per-kind render cache. Only hits are cached.
    pub fn locate_cached(
        &self,
        kind: PrimitiveKind,
        src: &SurfaceType,
        comp: &CompositeType,
        dst: &SurfaceType,
    ) -> LoopResult<Option<Arc<Primitive>>> {
        let cache = &self.caches[kind.id() as usize];
        if let Some(p) = cache.get(src, comp, dst) {
            return Ok(Some(p));
        }
        let p = self.locate(kind, src, comp, dst)?;
        match &p {
            Some(p) => cache.put(src, comp, dst, p.clone()),
            None => tracing::debug!(%kind, %src, %comp, %dst, "primitive not found"),
        }
        Ok(p)
    }
}

impl std::fmt::Debug for PrimitiveRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveRegistry")
            .field("options", &self.options)
            .field("entries", &self.len())
            .finish()
    }
}
