//! Core data model, configuration, and error types shared across the sdfs
//! workspace.

pub mod chk_id;
pub mod config;
pub mod error;
pub mod file_id;
pub mod io_descriptor;
pub mod vol_id;

pub use chk_id::{ChkId, ChunkType};
pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::SdfsError;
pub use file_id::FileId;
pub use io_descriptor::IoDescriptor;
pub use vol_id::{RedisAddr, VolId, VolumeName};

/// Result type used throughout the sdfs workspace.
pub type Result<T> = std::result::Result<T, SdfsError>;
