use thiserror::Error;

/// Failures visible to callers of the stack.
///
/// Allocation failure has no variant: node allocation goes through the global
/// allocator, which aborts the process when it cannot satisfy a request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// The stack held no element at the instant of the pop.
    #[error("the stack is empty")]
    EmptyStack,
    /// Every hazard slot of the table is owned by another handle.
    #[error("no free hazard slot, all {capacity} slots are in use")]
    ResourceExhausted { capacity: usize },
}

pub type Result<T> = std::result::Result<T, StackError>;
