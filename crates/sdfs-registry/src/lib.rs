//! External registry and sharded KV clients: the two collaborators the
//! placement routine treats as narrow interfaces rather than reimplements
//! (design §1 Non-goals — "the discovery registry's full schema").

mod kv;
#[cfg(feature = "mock")]
mod mock;
mod registry;
mod store;

pub use kv::{HSetFlags, Kv, ReplicationInfo};
#[cfg(feature = "mock")]
pub use mock::MemRegistry;
pub use registry::Registry;
pub use store::RegistryStore;
