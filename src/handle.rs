use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use educe::Educe;

use crate::sync::{fence, Ordering};
use crate::table::HazardSlotTable;

/// Ownership of one slot of a [`HazardSlotTable`].
///
/// Obtained through [`HazardSlotTable::acquire`]. Dropping the handle clears
/// the published address and then gives the slot back to the table. A handle
/// may be moved to another thread but never shared, since a slot has room for
/// a single published address.
#[derive(Educe)]
#[educe(Debug)]
pub struct HazardHandle {
    table: Arc<HazardSlotTable>,
    index: usize,
    #[educe(Debug(ignore))]
    _not_sync: PhantomData<Cell<()>>,
}

impl HazardHandle {
    pub(crate) fn new(table: Arc<HazardSlotTable>, index: usize) -> Self {
        HazardHandle {
            table,
            index,
            _not_sync: PhantomData,
        }
    }

    /// Publishes `ptr` as possibly dereferenced by the owner of this handle.
    ///
    /// The store is followed by a SeqCst fence, so callers must re-validate the
    /// source they read `ptr` from before dereferencing it.
    pub fn protect<P>(&self, ptr: *const P) {
        self.table.publish(self.index, ptr as usize);
        fence(Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.table.publish(self.index, 0);
    }

    pub fn slot_index(&self) -> usize {
        self.index
    }

    /// Thread token that claimed this slot.
    pub fn owner(&self) -> usize {
        self.table.owner(self.index)
    }

    pub fn table(&self) -> &Arc<HazardSlotTable> {
        &self.table
    }

    pub(crate) fn belongs_to(&self, table: &Arc<HazardSlotTable>) -> bool {
        Arc::ptr_eq(&self.table, table)
    }

    // Nobody but this handle can reach the table anymore.
    pub(crate) fn is_orphaned(&self) -> bool {
        Arc::strong_count(&self.table) == 1
    }
}

impl Drop for HazardHandle {
    fn drop(&mut self) {
        self.table.release(self.index);
    }
}
