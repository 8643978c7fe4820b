//! Region allocation over a chain of pages.
//!
//! An [`Arena`] hands out memory by bumping a cursor inside its current page
//! and grows by appending pages acquired from a [`HostMemory`]. Allocations
//! are never freed one by one; the whole arena is either [reset](Arena::reset)
//! for reuse, keeping its pages, or [freed](Arena::free), returning them.
//!
//! ```
//! use pagearena::Arena;
//!
//! let mut arena = Arena::new();
//! let name = arena.copy_str("John").unwrap();
//! let age = arena.alloc(30u32).unwrap();
//! assert_eq!("John", name);
//! assert_eq!(30, *age);
//!
//! // Handles borrow the arena, so they cannot be used past this point.
//! arena.reset();
//! let zeroed = arena.alloc_slice::<u64>(4).unwrap();
//! assert!(zeroed.iter().all(|&word| word == 0));
//! ```

#[macro_use]
mod logging;

mod arena;
mod bump;
mod config;
mod error;
mod host;
mod page;
mod store;
mod zeroable;

#[cfg(test)]
mod testing;

pub use arena::Arena;
pub use config::ArenaConfig;
pub use error::{AllocError, HostError};
pub use host::{native_page_size, HostMemory, RawBlock, SystemHost};
#[cfg(unix)]
pub use host::MmapHost;
pub use page::ALIGN;
pub use store::{ArenaStats, PageInfo};
pub use zeroable::Zeroable;
