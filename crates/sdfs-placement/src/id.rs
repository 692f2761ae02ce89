//! Volume id allocation (`md_newid`'s counterpart) and wall-clock stamps.
//!
//! The source draws ids from a cluster-wide sequence service; this crate
//! has no such service to ground against; so ids here are a
//! timestamp-high/random-low `u64`, unique enough for placement-record
//! keys without a coordinator round-trip.

use rand::Rng;

pub fn new_volid() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_nanos() as u64;
    let salt: u32 = rand::thread_rng().gen();
    nanos ^ (u64::from(salt) << 16)
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}
