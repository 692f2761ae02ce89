//! Replica I/O engine (C6): `write`/`read` with worker-affinity dispatch
//! and fast-path selection, following `__replica_write__`/`__replica_read__`
//! step for step.

mod analysis;
mod engine;

pub use engine::ReplicaEngine;
