//! Volume shard/replica placement (disk discovery, `mkvol`/`rmvol`) and the
//! snapshot replica-sync waiter.

mod discovery;
mod id;
mod mkvol;
mod rmvol;
mod snapshot;

pub use discovery::{disk_online, list_disks_for_host, list_redis_hosts, HostDisks};
pub use mkvol::mkvol;
pub use rmvol::rmvol;
pub use snapshot::{snapshot, wait_synced};
