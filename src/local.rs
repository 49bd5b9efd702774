use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::Result;
use crate::handle::HazardHandle;
use crate::sync::{lazy_static, thread_local, AtomicUsize, Ordering};
use crate::table::HazardSlotTable;

lazy_static! {
    // Starts at 1, 0 marks a free slot.
    static ref NEXT_TOKEN: AtomicUsize = AtomicUsize::new(1);
}

thread_local! {
    static THREAD_TOKEN: usize = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);

    // One handle per table this thread has popped from. Dropped, and so
    // released, when the thread exits.
    static LOCAL_HANDLES: RefCell<Vec<Rc<HazardHandle>>> = RefCell::new(Vec::new());
}

/// Non-zero identity of the calling thread, used as a slot owner.
pub(crate) fn current_thread_token() -> usize {
    THREAD_TOKEN
        .try_with(|token| *token)
        // Thread local storage is already torn down, hand out a fresh token.
        .unwrap_or_else(|_| NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
}

/// Returns the calling thread's handle for `table`, claiming a slot on first
/// use.
///
/// Called from a thread local destructor after the cache is gone, this falls
/// back to a handle that lives only as long as the returned `Rc`.
pub(crate) fn local_handle(table: &Arc<HazardSlotTable>) -> Result<Rc<HazardHandle>> {
    LOCAL_HANDLES
        .try_with(|cell| -> Result<Rc<HazardHandle>> {
            let mut handles = cell.borrow_mut();
            handles.retain(|handle| !handle.is_orphaned());
            if let Some(handle) = handles.iter().find(|handle| handle.belongs_to(table)) {
                return Ok(Rc::clone(handle));
            }
            let handle = Rc::new(table.acquire()?);
            handles.push(Rc::clone(&handle));
            Ok(handle)
        })
        .unwrap_or_else(|_| table.acquire().map(Rc::new))
}
