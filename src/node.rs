use std::mem::ManuallyDrop;
use std::ptr;

/*
A stack node. The value is wrapped in ManuallyDrop because the popping thread
moves it out while other threads may still be reading `next` through a
protected pointer; freeing the node afterwards must not touch the value.
`next` is written only before the node is published and never after.
*/
pub(crate) struct Node<T> {
    value: ManuallyDrop<T>,
    pub(crate) next: *mut Node<T>,
}

impl<T> Node<T> {
    // Heap allocates a detached node and hands out ownership as a raw pointer.
    pub(crate) fn alloc(value: T) -> *mut Node<T> {
        Box::into_raw(Box::new(Node {
            value: ManuallyDrop::new(value),
            next: ptr::null_mut(),
        }))
    }

    /// Moves the value out of the node.
    ///
    /// # Safety
    /// `node` must be live and exclusively unlinked by the caller, and the
    /// value must not have been taken before.
    pub(crate) unsafe fn take_value(node: *mut Node<T>) -> T {
        ManuallyDrop::into_inner(ptr::read(&(*node).value))
    }

    /// Frees the node memory without dropping the value.
    ///
    /// # Safety
    /// `node` must come from `alloc`, be unreachable by every other thread and
    /// not be freed twice.
    pub(crate) unsafe fn dealloc(node: *mut Node<T>) {
        drop(Box::from_raw(node));
    }

    /// Drops the value and frees the node.
    ///
    /// # Safety
    /// Same as `dealloc`, and the value must still be present.
    pub(crate) unsafe fn drop_with_value(node: *mut Node<T>) {
        let mut boxed = Box::from_raw(node);
        ManuallyDrop::drop(&mut boxed.value);
    }
}
