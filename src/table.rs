use std::sync::Arc;

use crossbeam_utils::CachePadded;
use tracing::{debug, warn};

use crate::error::{Result, StackError};
use crate::handle::HazardHandle;
use crate::local;
use crate::sync::{fence, AtomicUsize, Ordering};

/// Number of slots in the default table, and so the number of threads that
/// may be popping from stacks sharing it at the same time.
pub const DEFAULT_CAPACITY: usize = 50;

// Sentinel for both fields of a slot: no owner, nothing protected.
const EMPTY: usize = 0;

#[derive(Debug)]
struct HazardSlot {
    owner: AtomicUsize,
    protected: AtomicUsize,
}

impl HazardSlot {
    fn new() -> Self {
        HazardSlot {
            owner: AtomicUsize::new(EMPTY),
            protected: AtomicUsize::new(EMPTY),
        }
    }
}

/// A fixed set of hazard slots shared by every thread that pops from the
/// stacks using this table.
///
/// Each slot is either free or owned by exactly one [`HazardHandle`]. The
/// owner publishes the address it is about to dereference, and nodes are
/// only freed once no slot publishes their address.
#[derive(Debug)]
pub struct HazardSlotTable {
    slots: Box<[CachePadded<HazardSlot>]>,
}

impl HazardSlotTable {
    /// Creates a table with [`DEFAULT_CAPACITY`] slots.
    pub fn new() -> Self {
        HazardSlotTable::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a table with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "a hazard slot table needs at least one slot");
        let slots = (0..capacity)
            .map(|_| CachePadded::new(HazardSlot::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        HazardSlotTable { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claims a free slot for the calling thread.
    ///
    /// Fails with [`StackError::ResourceExhausted`] when every slot is owned.
    /// That is a sizing problem and is not worth retrying.
    pub fn acquire(self: &Arc<Self>) -> Result<HazardHandle> {
        let token = local::current_thread_token();
        for (index, slot) in self.slots.iter().enumerate() {
            if slot
                .owner
                .compare_exchange(EMPTY, token, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                debug!(slot = index, owner = token, "claimed hazard slot");
                return Ok(HazardHandle::new(Arc::clone(self), index));
            }
        }
        warn!(
            capacity = self.capacity(),
            owner = token,
            "hazard slot table exhausted"
        );
        Err(StackError::ResourceExhausted {
            capacity: self.capacity(),
        })
    }

    /// Returns true if any slot currently publishes `address`.
    ///
    /// The fence pairs with the one in [`HazardHandle::protect`]: a reader
    /// either sees the unlink that preceded this scan when it re-validates,
    /// or this scan sees its published address.
    pub fn is_protected(&self, address: usize) -> bool {
        if address == EMPTY {
            return false;
        }
        fence(Ordering::SeqCst);
        self.slots
            .iter()
            .any(|slot| slot.protected.load(Ordering::Acquire) == address)
    }

    /// Number of slots currently owned by a handle.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.owner.load(Ordering::Relaxed) != EMPTY)
            .count()
    }

    pub(crate) fn owner(&self, index: usize) -> usize {
        self.slots[index].owner.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, index: usize, address: usize) {
        self.slots[index].protected.store(address, Ordering::Release);
    }

    pub(crate) fn release(&self, index: usize) {
        let slot = &self.slots[index];
        slot.protected.store(EMPTY, Ordering::Release);
        let owner = slot.owner.swap(EMPTY, Ordering::AcqRel);
        debug!(slot = index, owner, "released hazard slot");
    }
}

impl Default for HazardSlotTable {
    fn default() -> Self {
        HazardSlotTable::new()
    }
}
