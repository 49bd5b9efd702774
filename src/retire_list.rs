use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

use crossbeam_utils::Backoff;
use educe::Educe;
use tracing::trace;

use crate::node::Node;
use crate::sync::{AtomicPtr, AtomicUsize, Ordering};
use crate::table::HazardSlotTable;

/*
An entry owns the node it wraps: the node is reachable from nowhere else once
retired, and freeing the entry is the only way the node gets freed.
*/
struct RetiredEntry<T> {
    node: *mut Node<T>,
    next: *mut RetiredEntry<T>,
}

/// Nodes unlinked from a stack that some hazard slot may still publish.
///
/// The list is a Treiber stack of entries. `reclaim` detaches the whole list,
/// frees what is no longer protected and pushes the rest back.
#[derive(Educe)]
#[educe(Debug)]
pub(crate) struct RetireList<T> {
    head: AtomicPtr<RetiredEntry<T>>,
    len: AtomicUsize,
    table: Arc<HazardSlotTable>,
    #[educe(Debug(ignore))]
    _marker: PhantomData<Box<Node<T>>>,
}

impl<T> RetireList<T> {
    pub(crate) fn new(table: Arc<HazardSlotTable>) -> Self {
        RetireList {
            head: AtomicPtr::new(ptr::null_mut()),
            len: AtomicUsize::new(0),
            table,
            _marker: PhantomData,
        }
    }

    pub(crate) fn is_protected(&self, node: *mut Node<T>) -> bool {
        self.table.is_protected(node as usize)
    }

    /// Takes ownership of an unlinked node, freeing it right away when no
    /// slot protects it.
    ///
    /// # Safety
    /// `node` must be unlinked and exclusively owned by the caller, with its
    /// value already moved out.
    pub(crate) unsafe fn free_or_retire(&self, node: *mut Node<T>) {
        if self.is_protected(node) {
            self.retire(node);
        } else {
            Node::dealloc(node);
        }
    }

    /// # Safety
    /// Same contract as `free_or_retire`.
    pub(crate) unsafe fn retire(&self, node: *mut Node<T>) {
        let entry = Box::into_raw(Box::new(RetiredEntry {
            node,
            next: ptr::null_mut(),
        }));
        self.len.fetch_add(1, Ordering::Relaxed);
        trace!(node = ?node, "retired protected node");
        self.push_entry(entry);
    }

    fn push_entry(&self, entry: *mut RetiredEntry<T>) {
        let backoff = Backoff::new();
        let mut head = self.head.load(Ordering::Relaxed);
        loop {
            unsafe {
                (*entry).next = head;
            }
            match self
                .head
                .compare_exchange_weak(head, entry, Ordering::Release, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => {
                    head = current;
                    backoff.spin();
                }
            }
        }
    }

    /// Frees every retired node no slot protects and returns how many.
    pub(crate) fn reclaim(&self) -> usize {
        if self.head.load(Ordering::Relaxed).is_null() {
            return 0;
        }
        let mut current = self.head.swap(ptr::null_mut(), Ordering::Acquire);
        let mut freed = 0;
        let mut deferred = 0;
        while !current.is_null() {
            // The swap made every detached entry exclusively ours.
            let next = unsafe { (*current).next };
            let node = unsafe { (*current).node };
            if self.is_protected(node) {
                self.push_entry(current);
                deferred += 1;
            } else {
                unsafe {
                    drop(Box::from_raw(current));
                    Node::dealloc(node);
                }
                freed += 1;
            }
            current = next;
        }
        if freed > 0 {
            self.len.fetch_sub(freed, Ordering::Relaxed);
        }
        if freed + deferred > 0 {
            trace!(freed, deferred, "reclaim pass");
        }
        freed
    }

    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

impl<T> Drop for RetireList<T> {
    fn drop(&mut self) {
        // With `&mut self` no pop is running on the owning stack, so no slot
        // can legitimately protect one of these nodes.
        let mut current = self.head.swap(ptr::null_mut(), Ordering::Acquire);
        while !current.is_null() {
            let entry = unsafe { Box::from_raw(current) };
            unsafe { Node::dealloc(entry.node) };
            current = entry.next;
        }
    }
}
