#[cfg(loom)]
pub(crate) use {
    loom::lazy_static,
    loom::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering},
    loom::thread_local,
};

#[cfg(not(loom))]
pub(crate) use {
    lazy_static::lazy_static,
    std::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering},
    std::thread_local,
};
