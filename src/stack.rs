use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

use crossbeam_utils::{Backoff, CachePadded};
use educe::Educe;

use crate::default::default_table;
use crate::error::{Result, StackError};
use crate::handle::HazardHandle;
use crate::local;
use crate::node::Node;
use crate::retire_list::RetireList;
use crate::sync::{AtomicPtr, Ordering};
use crate::table::HazardSlotTable;

/// Treiber's lock-free stack with hazard pointer reclamation.
///
/// Usable with any number of producers and consumers. Popping threads claim a
/// slot of the stack's [`HazardSlotTable`] on their first pop and keep it
/// until they exit, so the table capacity bounds how many threads can pop.
#[derive(Educe)]
#[educe(Debug)]
pub struct LockFreeStack<T> {
    head: CachePadded<AtomicPtr<Node<T>>>,
    retired: RetireList<T>,
    table: Arc<HazardSlotTable>,
    #[educe(Debug(ignore))]
    _marker: PhantomData<T>,
}

// Values only ever move between threads, they are never shared.
unsafe impl<T: Send> Send for LockFreeStack<T> {}
unsafe impl<T: Send> Sync for LockFreeStack<T> {}

impl<T> LockFreeStack<T> {
    /// Creates an empty stack using the process wide default table.
    pub fn new() -> Self {
        LockFreeStack::with_table(Arc::clone(default_table()))
    }

    /// Creates an empty stack with a table of its own holding `capacity`
    /// hazard slots.
    ///
    /// This bounds how many threads may pop concurrently, not how many
    /// elements the stack holds.
    pub fn with_hazard_capacity(capacity: usize) -> Self {
        LockFreeStack::with_table(Arc::new(HazardSlotTable::with_capacity(capacity)))
    }

    /// Creates an empty stack protected by `table`, which may be shared with
    /// other stacks.
    pub fn with_table(table: Arc<HazardSlotTable>) -> Self {
        LockFreeStack {
            head: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
            retired: RetireList::new(Arc::clone(&table)),
            table,
            _marker: PhantomData,
        }
    }

    /// Pushes a value on top of the stack.
    pub fn push(&self, value: T) {
        let node = Node::alloc(value);
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            unsafe {
                (*node).next = head;
            }
            match self
                .head
                .compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => {
                    head = current;
                    backoff.spin();
                }
            }
        }
    }

    /// Removes the top value using the calling thread's hazard slot.
    ///
    /// The first pop of a thread on this stack's table claims a slot and fails
    /// with [`StackError::ResourceExhausted`] if none is free. An empty stack
    /// yields [`StackError::EmptyStack`].
    pub fn pop(&self) -> Result<T> {
        let handle = local::local_handle(&self.table)?;
        self.pop_with(&handle)
    }

    /// Removes the top value, protecting reads through `handle`.
    ///
    /// # Panics
    /// Panics if `handle` was acquired from another table than this stack's.
    pub fn pop_with(&self, handle: &HazardHandle) -> Result<T> {
        assert!(
            handle.belongs_to(&self.table),
            "hazard handle belongs to a different table"
        );
        let backoff = Backoff::new();
        let node = loop {
            let candidate = self.protect_head(handle);
            if candidate.is_null() {
                handle.clear();
                return Err(StackError::EmptyStack);
            }
            // Protected and still the head, so it has not been freed.
            let next = unsafe { (*candidate).next };
            match self
                .head
                .compare_exchange(candidate, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break candidate,
                Err(_) => backoff.spin(),
            }
        };
        handle.clear();

        // Winning the exchange made `node` ours alone.
        let value = unsafe { Node::take_value(node) };
        unsafe { self.retired.free_or_retire(node) };
        self.retired.reclaim();
        Ok(value)
    }

    // Publishes the head until the published pointer is still the head.
    fn protect_head(&self, handle: &HazardHandle) -> *mut Node<T> {
        let mut candidate = self.head.load(Ordering::Acquire);
        loop {
            handle.protect(candidate as *const Node<T>);
            let current = self.head.load(Ordering::Acquire);
            if current == candidate {
                return candidate;
            }
            candidate = current;
        }
    }

    /// Returns `true` if the stack held no element at the time of the call.
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }

    /// Number of popped nodes waiting for their hazard protection to end.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    /// Frees retired nodes that are no longer protected, returning how many.
    pub fn reclaim(&self) -> usize {
        self.retired.reclaim()
    }

    pub fn table(&self) -> &Arc<HazardSlotTable> {
        &self.table
    }
}

impl<T> Default for LockFreeStack<T> {
    fn default() -> Self {
        LockFreeStack::new()
    }
}

impl<T> Drop for LockFreeStack<T> {
    fn drop(&mut self) {
        let mut current = self.head.load(Ordering::Relaxed);
        while !current.is_null() {
            unsafe {
                let next = (*current).next;
                Node::drop_with_value(current);
                current = next;
            }
        }
        // Retired nodes are freed by the retire list's own drop.
    }
}
