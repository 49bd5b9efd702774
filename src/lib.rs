//! A lock-free LIFO stack whose nodes are reclaimed with hazard pointers.
//!
//! Popping threads publish the node they are about to read in a slot of a
//! [`HazardSlotTable`]. A popped node is freed only once no slot publishes its
//! address; until then it waits in the stack's retire list, which is swept on
//! every pop.
//!
//! ```
//! use hazard_stack::{LockFreeStack, StackError};
//!
//! let stack = LockFreeStack::new();
//! stack.push(2011);
//! stack.push(2014);
//! assert_eq!(stack.pop(), Ok(2014));
//! assert_eq!(stack.pop(), Ok(2011));
//! assert_eq!(stack.pop(), Err(StackError::EmptyStack));
//! ```

mod sync;

pub mod default;
pub use self::default::default_table;
pub mod error;
pub use self::error::{Result, StackError};
pub mod handle;
pub use self::handle::HazardHandle;
pub mod table;
pub use self::table::{HazardSlotTable, DEFAULT_CAPACITY};
pub mod stack;
pub use self::stack::LockFreeStack;

mod local;
mod node;
mod retire_list;
