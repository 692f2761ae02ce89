//! Path hashing (C1), the `io_uring` disk gateway (C3), and the file
//! handle acquirer (C5).

pub mod cascade;
pub mod fd;
pub mod gateway;

pub use fd::{getfd, OpenFlags};
pub use gateway::Gateway;
