//! Runtime side of the Knowledge Canvas project store: the identifier
//! allocator, the selection bus, and the project repository that ties them to
//! a [`KvStore`](kc_core::store::KvStore).

pub mod allocator;
pub mod bus;
pub mod factory;
pub mod memory;
pub mod repository;

pub use allocator::{AllocatorConfig, IdAllocator, RandomIdSource};
pub use factory::BasicSourceFactory;
pub use kc_core::{Error, Result};
pub use memory::MemoryStore;
pub use repository::ProjectRepository;
