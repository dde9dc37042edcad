//! Comparator bridge.
//!
//! The engine's comparator type is a bare `(a, b) -> int` function pointer
//! with no user-data slot. Three native entry points satisfy it:
//!
//! - [`lmbridge_cmp_baseline`]: byte order, no managed code involved
//! - [`lmbridge_cmp_single`]: forwards to the one process-wide comparator
//! - one trampoline per context slot: each recovers its [`ContextId`] from
//!   the registry and forwards to the comparator registered under it
//!
//! Which one a database uses is chosen once, at setup, through
//! [`DispatchMode`] and [`install_comparator`].
//!
//! # Caller obligations
//!
//! A comparator must define a strict total order that stays the same for
//! the lifetime of the data, across restarts. The engine persists keys in
//! that order; changing it makes existing data unreadable in order. A
//! comparator must not allocate on the engine's behalf, block, call into the
//! engine, or panic. Panics are trapped (see [`crate::FaultPolicy`]) but
//! leave the operation that triggered them with an unspecified result.

use crate::buffer::bytes_of;
use crate::config::{BridgeConfig, FaultPolicy};
use crate::error::{BridgeError, BridgeResult};
use crate::fault::{self, CallbackFault, FaultKind};
use crate::marshal::check;
use lmbridge_engine::{Dbi, Engine, MdbCmpFunc, MdbVal, TxnHandle};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ffi::c_int;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};

/// A managed key or data ordering.
pub trait Comparator: Send + Sync {
    /// Orders `a` relative to `b`.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

impl<F> Comparator for F
where
    F: Fn(&[u8], &[u8]) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self(a, b)
    }
}

/// The reference order: bytewise over the common prefix, then the shorter
/// buffer first.
pub fn baseline_compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Converts an ordering to the engine's `-1 / 0 / 1` convention.
pub(crate) const fn to_native(ordering: Ordering) -> c_int {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Native baseline comparator.
///
/// # Safety
///
/// `a` and `b` must be null or point at descriptors of readable memory.
#[no_mangle]
pub unsafe extern "C" fn lmbridge_cmp_baseline(a: *const MdbVal, b: *const MdbVal) -> c_int {
    to_native(baseline_compare(bytes_of(a), bytes_of(b)))
}

/// Native single-dispatch comparator.
///
/// # Safety
///
/// `a` and `b` must be null or point at descriptors of readable memory.
#[no_mangle]
pub unsafe extern "C" fn lmbridge_cmp_single(a: *const MdbVal, b: *const MdbVal) -> c_int {
    to_native(ComparatorRegistry::global().dispatch_single(bytes_of(a), bytes_of(b)))
}

unsafe extern "C" fn context_trampoline<const SLOT: usize>(
    a: *const MdbVal,
    b: *const MdbVal,
) -> c_int {
    to_native(ComparatorRegistry::global().dispatch_slot(SLOT, bytes_of(a), bytes_of(b)))
}

/// Number of context comparators that can be registered at once.
pub const MAX_CONTEXTS: usize = 32;

macro_rules! trampoline_table {
    ($($slot:literal),* $(,)?) => {
        [$(context_trampoline::<$slot> as MdbCmpFunc),*]
    };
}

static TRAMPOLINES: [MdbCmpFunc; MAX_CONTEXTS] = trampoline_table![
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
    26, 27, 28, 29, 30, 31,
];

/// Identifies which registered comparator a database uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Wraps a caller-chosen id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Largest environment id [`Self::for_database`] keeps distinct. The id
    /// takes the top 31 bits, above the order bit and the 32-bit `dbi`.
    pub const MAX_ENV_ID: u64 = (1 << 31) - 1;

    /// The key-order id of database `dbi` in environment `env_id`.
    ///
    /// `env_id` must not exceed [`Self::MAX_ENV_ID`]; checked in debug builds.
    pub const fn for_database(env_id: u64, dbi: Dbi) -> Self {
        debug_assert!(env_id <= Self::MAX_ENV_ID, "environment id exceeds 31 bits");
        Self((env_id << 33) | dbi.0 as u64)
    }

    /// The duplicate-order id of database `dbi` in environment `env_id`.
    ///
    /// `env_id` must not exceed [`Self::MAX_ENV_ID`]; checked in debug builds.
    pub const fn for_duplicates(env_id: u64, dbi: Dbi) -> Self {
        debug_assert!(env_id <= Self::MAX_ENV_ID, "environment id exceeds 31 bits");
        Self((env_id << 33) | (1 << 32) | dbi.0 as u64)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// How a database's comparisons reach managed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Native byte order; no managed callback.
    Baseline,
    /// The single process-wide comparator.
    Single,
    /// The comparator registered under the given context.
    Context(ContextId),
}

#[derive(Clone)]
struct Entry {
    comparator: Arc<dyn Comparator>,
    policy: FaultPolicy,
}

impl Entry {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        match panic::catch_unwind(AssertUnwindSafe(|| self.comparator.compare(a, b))) {
            Ok(ordering) => ordering,
            Err(payload) => {
                let fault = CallbackFault::from_panic(FaultKind::ComparatorPanic, payload.as_ref());
                fault::raise(fault, self.policy);
                baseline_compare(a, b)
            }
        }
    }
}

/// Which of a database's two comparators an installation replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Order {
    Keys,
    Duplicates,
}

/// One database comparator that points at a trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InstallSite {
    env_id: u64,
    dbi: Dbi,
    order: Order,
}

struct Slot {
    id: ContextId,
    generation: u64,
    /// `None` once released. The trampoline then faults until the slot is
    /// freed, which needs every installation of it to be replaced.
    entry: Option<Entry>,
    users: HashSet<InstallSite>,
    /// Handed out through [`ComparatorRegistry::native_fn`], so installs
    /// are not tracked.
    exported: bool,
}

impl Slot {
    fn reclaimable(&self) -> bool {
        self.entry.is_none() && self.users.is_empty() && !self.exported
    }
}

struct Inner {
    config: BridgeConfig,
    single: Option<Entry>,
    slots: Vec<Option<Slot>>,
    by_id: HashMap<ContextId, usize>,
    installs: HashMap<InstallSite, usize>,
    generation: u64,
}

impl Inner {
    fn live(&self, id: ContextId) -> Option<(usize, &Entry)> {
        let slot = *self.by_id.get(&id)?;
        let entry = self.slots[slot].as_ref()?.entry.as_ref()?;
        Some((slot, entry))
    }

    fn resolve(&self, mode: DispatchMode) -> BridgeResult<(MdbCmpFunc, Option<usize>)> {
        match mode {
            DispatchMode::Baseline => Ok((lmbridge_cmp_baseline, None)),
            DispatchMode::Single if self.single.is_some() => Ok((lmbridge_cmp_single, None)),
            DispatchMode::Single => Err(BridgeError::NoSingleComparator),
            DispatchMode::Context(id) => self
                .live(id)
                .map(|(slot, _)| (TRAMPOLINES[slot], Some(slot)))
                .ok_or(BridgeError::UnregisteredContext(id)),
        }
    }

    /// Points `site` at `slot`, returning the slot it pointed at before.
    /// Slots are not freed here; see [`Inner::sweep`].
    fn record_install(&mut self, site: InstallSite, slot: Option<usize>) -> Option<usize> {
        let previous = match slot {
            Some(slot) => self.installs.insert(site, slot),
            None => self.installs.remove(&site),
        };
        if let Some(prev) = previous.filter(|&prev| Some(prev) != slot) {
            if let Some(s) = self.slots[prev].as_mut() {
                s.users.remove(&site);
            }
        }
        if let Some(s) = slot.and_then(|slot| self.slots[slot].as_mut()) {
            s.users.insert(site);
        }
        previous
    }

    /// Frees `slot` if it is released and nothing points at it.
    fn sweep(&mut self, slot: usize) {
        if self.slots[slot].as_ref().is_some_and(Slot::reclaimable) {
            if let Some(s) = self.slots[slot].take() {
                tracing::debug!(context = %s.id, slot, "freed comparator slot");
            }
        }
    }

    fn retire(&mut self, id: ContextId, slot: usize) {
        self.by_id.remove(&id);
        if let Some(s) = self.slots[slot].as_mut() {
            s.entry = None;
            tracing::debug!(
                context = %id,
                slot,
                databases = s.users.len(),
                exported = s.exported,
                "released context comparator"
            );
        }
        self.sweep(slot);
    }
}

/// Registry of managed comparators, keyed by dispatch context.
///
/// The native entry points always consult [`ComparatorRegistry::global`].
/// Registration takes a write lock; comparisons hold a read lock only long
/// enough to clone the comparator out.
///
/// A released context keeps its trampoline slot as long as any database
/// installed through [`install_comparator`] still uses it, and comparisons
/// there fault as [`FaultKind::UnregisteredContext`]. The slot is rebound
/// only if the same id is registered again. It is freed once each of those
/// databases gets another comparator installed or its environment is
/// forgotten ([`ComparatorRegistry::forget_environment`]). Slots handed out
/// by [`ComparatorRegistry::native_fn`] are freed only by
/// [`ComparatorRegistry::reclaim`].
pub struct ComparatorRegistry {
    inner: RwLock<Inner>,
}

static GLOBAL: LazyLock<ComparatorRegistry> = LazyLock::new(ComparatorRegistry::new);

impl ComparatorRegistry {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                config: BridgeConfig::default(),
                single: None,
                slots: (0..MAX_CONTEXTS).map(|_| None).collect(),
                by_id: HashMap::new(),
                installs: HashMap::new(),
                generation: 0,
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Replaces the configuration. Comparators registered afterwards use the
    /// new fault policy; existing registrations keep theirs.
    pub fn configure(&self, config: BridgeConfig) {
        tracing::debug!(?config, "configured comparator registry");
        self.inner.write().config = config;
    }

    /// The current configuration.
    pub fn config(&self) -> BridgeConfig {
        self.inner.read().config.clone()
    }

    /// Registers the single-dispatch comparator.
    pub fn register_single(&self, comparator: impl Comparator + 'static) -> BridgeResult<()> {
        self.register_single_with(Arc::new(comparator))
    }

    /// Registers a shared comparator as the single-dispatch comparator.
    pub fn register_single_with(&self, comparator: Arc<dyn Comparator>) -> BridgeResult<()> {
        let mut inner = self.inner.write();
        if inner.single.is_some() {
            return Err(BridgeError::SingleAlreadyRegistered);
        }
        let policy = inner.config.fault_policy;
        inner.single = Some(Entry { comparator, policy });
        tracing::debug!("registered single-dispatch comparator");
        Ok(())
    }

    /// Removes the single-dispatch comparator. Returns whether one was set.
    pub fn clear_single(&self) -> bool {
        let cleared = self.inner.write().single.take().is_some();
        if cleared {
            tracing::debug!("cleared single-dispatch comparator");
        }
        cleared
    }

    /// True if a single-dispatch comparator is registered.
    pub fn has_single(&self) -> bool {
        self.inner.read().single.is_some()
    }

    /// Registers `comparator` under `id` and claims a trampoline slot.
    ///
    /// The comparator stays registered until the returned guard is dropped.
    pub fn register_context(
        &self,
        id: ContextId,
        comparator: impl Comparator + 'static,
    ) -> BridgeResult<ContextRegistration<'_>> {
        self.register_context_with(id, Arc::new(comparator))
    }

    /// Registers a shared comparator under `id`.
    pub fn register_context_with(
        &self,
        id: ContextId,
        comparator: Arc<dyn Comparator>,
    ) -> BridgeResult<ContextRegistration<'_>> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&id) {
            return Err(BridgeError::ContextAlreadyRegistered(id));
        }
        let released = inner
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.entry.is_none() && s.id == id));
        let slot = released
            .or_else(|| inner.slots.iter().position(Option::is_none))
            .ok_or(BridgeError::ContextSlotsExhausted(MAX_CONTEXTS))?;

        inner.generation += 1;
        let generation = inner.generation;
        let entry = Entry {
            comparator,
            policy: inner.config.fault_policy,
        };
        match &mut inner.slots[slot] {
            Some(existing) => {
                existing.generation = generation;
                existing.entry = Some(entry);
            }
            vacant @ None => {
                *vacant = Some(Slot {
                    id,
                    generation,
                    entry: Some(entry),
                    users: HashSet::new(),
                    exported: false,
                });
            }
        }
        inner.by_id.insert(id, slot);

        tracing::debug!(
            context = %id,
            slot,
            rebound = released.is_some(),
            "registered context comparator"
        );
        Ok(ContextRegistration {
            registry: self,
            id,
            slot,
            generation,
            armed: true,
        })
    }

    /// Removes the comparator registered under `id`.
    pub fn deregister_context(&self, id: ContextId) -> BridgeResult<()> {
        let mut inner = self.inner.write();
        let (slot, _) = inner.live(id).ok_or(BridgeError::UnregisteredContext(id))?;
        inner.retire(id, slot);
        Ok(())
    }

    fn release(&self, id: ContextId, slot: usize, generation: u64) {
        let mut inner = self.inner.write();
        let current = inner.slots[slot]
            .as_ref()
            .is_some_and(|s| s.generation == generation && s.entry.is_some());
        if current {
            inner.retire(id, slot);
        }
    }

    /// Frees the released slot last bound to `id` after the caller has
    /// replaced every comparator it installed from [`Self::native_fn`].
    ///
    /// Returns `false` if no released slot belongs to `id`. Fails with
    /// [`BridgeError::ContextStillInstalled`] while databases installed
    /// through [`install_comparator`] still use it.
    pub fn reclaim(&self, id: ContextId) -> BridgeResult<bool> {
        let mut inner = self.inner.write();
        let Some(slot) = inner
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.entry.is_none() && s.id == id))
        else {
            return Ok(false);
        };
        if let Some(s) = inner.slots[slot].as_mut() {
            if !s.users.is_empty() {
                return Err(BridgeError::ContextStillInstalled {
                    id,
                    databases: s.users.len(),
                });
            }
            s.exported = false;
        }
        inner.sweep(slot);
        Ok(true)
    }

    /// Drops the installation records of environment `env_id`, freeing
    /// released slots nothing else uses. Call once the environment is closed.
    pub fn forget_environment(&self, env_id: u64) -> usize {
        let mut inner = self.inner.write();
        let sites: Vec<InstallSite> = inner
            .installs
            .keys()
            .filter(|site| site.env_id == env_id)
            .copied()
            .collect();
        for &site in &sites {
            if let Some(slot) = inner.record_install(site, None) {
                inner.sweep(slot);
            }
        }
        sites.len()
    }

    /// True if a comparator is registered under `id`.
    pub fn is_registered(&self, id: ContextId) -> bool {
        self.inner.read().live(id).is_some()
    }

    /// Number of registered context comparators.
    pub fn context_count(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Number of trampoline slots not bound, released or pinned.
    pub fn free_slots(&self) -> usize {
        self.inner.read().slots.iter().filter(|s| s.is_none()).count()
    }

    /// The comparator registered under `id`.
    pub fn lookup(&self, id: ContextId) -> BridgeResult<Arc<dyn Comparator>> {
        self.inner
            .read()
            .live(id)
            .map(|(_, entry)| Arc::clone(&entry.comparator))
            .ok_or(BridgeError::UnregisteredContext(id))
    }

    /// Resolves `mode` to the native function the engine should call.
    ///
    /// Fails if the mode names a comparator that is not registered, so the
    /// error surfaces before any native call. A context slot handed out here
    /// stays reserved after release until [`Self::reclaim`].
    pub fn native_fn(&self, mode: DispatchMode) -> BridgeResult<MdbCmpFunc> {
        let mut inner = self.inner.write();
        let (func, slot) = inner.resolve(mode)?;
        if let Some(s) = slot.and_then(|slot| inner.slots[slot].as_mut()) {
            s.exported = true;
        }
        Ok(func)
    }

    /// Installs the native function for `mode` with `set`, keeping track of
    /// which slot the database now uses.
    fn install_with(
        &self,
        site: InstallSite,
        mode: DispatchMode,
        set: impl FnOnce(MdbCmpFunc) -> BridgeResult<()>,
    ) -> BridgeResult<()> {
        let (func, slot, previous) = {
            let mut inner = self.inner.write();
            let (func, slot) = inner.resolve(mode)?;
            let previous = inner.record_install(site, slot);
            (func, slot, previous)
        };

        let result = set(func);
        let mut inner = self.inner.write();
        match &result {
            Ok(()) => {
                if let Some(prev) = previous.filter(|&prev| Some(prev) != slot) {
                    inner.sweep(prev);
                }
            }
            Err(_) => {
                inner.record_install(site, previous);
                if let Some(slot) = slot.filter(|&slot| Some(slot) != previous) {
                    inner.sweep(slot);
                }
            }
        }
        result
    }

    /// Installs the key comparator for `mode` on a database
    /// (`mdb_set_compare`).
    pub fn install<E: Engine + ?Sized>(
        &self,
        engine: &E,
        txn: TxnHandle,
        dbi: Dbi,
        mode: DispatchMode,
    ) -> BridgeResult<()> {
        let site = InstallSite {
            env_id: engine.env_id(),
            dbi,
            order: Order::Keys,
        };
        self.install_with(site, mode, |func| {
            check("mdb_set_compare", engine.set_compare(txn, dbi, Some(func)))
        })?;
        tracing::debug!(?mode, dbi = dbi.0, "installed key comparator");
        Ok(())
    }

    /// Installs the duplicate-data comparator for `mode` on a
    /// `MDB_DUPSORT` database (`mdb_set_dupsort`).
    pub fn install_duplicates<E: Engine + ?Sized>(
        &self,
        engine: &E,
        txn: TxnHandle,
        dbi: Dbi,
        mode: DispatchMode,
    ) -> BridgeResult<()> {
        let site = InstallSite {
            env_id: engine.env_id(),
            dbi,
            order: Order::Duplicates,
        };
        self.install_with(site, mode, |func| {
            check("mdb_set_dupsort", engine.set_dupsort(txn, dbi, Some(func)))
        })?;
        tracing::debug!(?mode, dbi = dbi.0, "installed duplicate comparator");
        Ok(())
    }

    /// Compares `a` and `b` with the comparator registered under `id`.
    ///
    /// An unregistered id is a callback fault handled by the configured
    /// fault policy; under [`FaultPolicy::Sentinel`] the baseline order is
    /// returned.
    pub fn dispatch(&self, id: ContextId, a: &[u8], b: &[u8]) -> Ordering {
        let entry = {
            let inner = self.inner.read();
            match inner.live(id) {
                Some((_, entry)) => Ok(entry.clone()),
                None => Err(inner.config.fault_policy),
            }
        };
        match entry {
            Ok(entry) => entry.compare(a, b),
            Err(policy) => unregistered(
                policy,
                format!("no comparator registered for context {id}"),
                a,
                b,
            ),
        }
    }

    fn dispatch_single(&self, a: &[u8], b: &[u8]) -> Ordering {
        let entry = {
            let inner = self.inner.read();
            inner.single.clone().ok_or(inner.config.fault_policy)
        };
        match entry {
            Ok(entry) => entry.compare(a, b),
            Err(policy) => {
                let message = "no single-dispatch comparator registered".to_owned();
                unregistered(policy, message, a, b)
            }
        }
    }

    fn dispatch_slot(&self, slot: usize, a: &[u8], b: &[u8]) -> Ordering {
        let entry = {
            let inner = self.inner.read();
            let policy = inner.config.fault_policy;
            match inner.slots[slot].as_ref() {
                Some(Slot { entry: Some(entry), .. }) => Ok(entry.clone()),
                Some(Slot { id, .. }) => Err((
                    policy,
                    format!("context {id} was released while slot {slot} is still installed"),
                )),
                None => Err((
                    policy,
                    format!("comparator slot {slot} is not bound to a context"),
                )),
            }
        };
        match entry {
            Ok(entry) => entry.compare(a, b),
            Err((policy, message)) => unregistered(policy, message, a, b),
        }
    }
}

fn unregistered(policy: FaultPolicy, message: String, a: &[u8], b: &[u8]) -> Ordering {
    fault::raise(CallbackFault::new(FaultKind::UnregisteredContext, message), policy);
    baseline_compare(a, b)
}

/// Keeps a context comparator registered. Dropping it deregisters.
#[must_use = "dropping the registration deregisters the comparator"]
pub struct ContextRegistration<'r> {
    registry: &'r ComparatorRegistry,
    id: ContextId,
    slot: usize,
    generation: u64,
    armed: bool,
}

impl ContextRegistration<'_> {
    /// The registered context.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The trampoline slot claimed by this registration.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The dispatch mode selecting this comparator.
    pub fn mode(&self) -> DispatchMode {
        DispatchMode::Context(self.id)
    }

    /// Keeps the comparator registered for the rest of the process, or until
    /// [`ComparatorRegistry::deregister_context`] is called.
    pub fn into_id(mut self) -> ContextId {
        self.armed = false;
        self.id
    }
}

impl Drop for ContextRegistration<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.release(self.id, self.slot, self.generation);
        }
    }
}

impl std::fmt::Debug for ContextRegistration<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistration")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

/// Installs the key comparator for `mode` on a database (`mdb_set_compare`)
/// through the global registry.
pub fn install_comparator<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    mode: DispatchMode,
) -> BridgeResult<()> {
    ComparatorRegistry::global().install(engine, txn, dbi, mode)
}

/// Installs the duplicate-data comparator for `mode` on a `MDB_DUPSORT`
/// database (`mdb_set_dupsort`).
pub fn install_dup_comparator<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    mode: DispatchMode,
) -> BridgeResult<()> {
    ComparatorRegistry::global().install_duplicates(engine, txn, dbi, mode)
}

/// Registers `comparator` under the database's own context id and installs
/// it as the database's key order.
pub fn register_database_comparator<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    comparator: impl Comparator + 'static,
) -> BridgeResult<ContextRegistration<'static>> {
    let id = ContextId::for_database(engine.env_id(), dbi);
    let registration = ComparatorRegistry::global().register_context(id, comparator)?;
    install_comparator(engine, txn, dbi, registration.mode())?;
    Ok(registration)
}

/// Registers `comparator` under the database's duplicate-order context id
/// and installs it as the database's data order.
pub fn register_dup_comparator<E: Engine + ?Sized>(
    engine: &E,
    txn: TxnHandle,
    dbi: Dbi,
    comparator: impl Comparator + 'static,
) -> BridgeResult<ContextRegistration<'static>> {
    let id = ContextId::for_duplicates(engine.env_id(), dbi);
    let registration = ComparatorRegistry::global().register_context(id, comparator)?;
    install_dup_comparator(engine, txn, dbi, registration.mode())?;
    Ok(registration)
}
