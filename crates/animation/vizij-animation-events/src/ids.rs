//! Identifiers and simple allocators for core entities.

use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `name`.
///
/// Deterministic across runs, platforms and toolchains, which is what lets a
/// hashed id be stored in authoring data and still match after reload.
pub fn stable_hash(name: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in name.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Stable key of a dispatchable event.
///
/// Derived once from the event name and stored next to it; the id survives
/// reordering of authored tables. `EventId::UNSET` (0) marks legacy entries
/// that only carry a name.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl EventId {
    pub const UNSET: EventId = EventId(0);

    /// Hash a name into an id. Never returns `UNSET`.
    pub fn from_name(name: &str) -> Self {
        match stable_hash(name) {
            0 => EventId(1),
            h => EventId(h),
        }
    }

    #[inline]
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Opaque token of the transition the engine is currently blending through.
/// Only compared for equality between frames.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct TransitionId(pub i32);

/// Animation layer index, in engine evaluation order.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u32);

/// Engine-side identity of a state node (e.g. a full-path hash).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    pub fn from_name(path: &str) -> Self {
        StateId(stable_hash(path))
    }
}

/// Handle of one behaviour instance attached to a state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct InstId(pub u32);

/// Monotonic allocator for InstId.
/// Dense indices improve cache locality; IDs are opaque externally.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_inst: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_inst(&mut self) -> InstId {
        let id = InstId(self.next_inst);
        self.next_inst = self.next_inst.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
