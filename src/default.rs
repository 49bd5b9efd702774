//! The default hazard slot table.

use std::sync::Arc;

use crate::sync::lazy_static;
use crate::table::HazardSlotTable;

lazy_static! {
    /// The global default hazard slot table.
    static ref TABLE: Arc<HazardSlotTable> = Arc::new(HazardSlotTable::new());
}

/// Returns the process wide table used by [`LockFreeStack::new`].
///
/// [`LockFreeStack::new`]: crate::LockFreeStack::new
pub fn default_table() -> &'static Arc<HazardSlotTable> {
    &TABLE
}
