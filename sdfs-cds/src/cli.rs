use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// etcd endpoint(s) to connect the registry client to.
    #[arg(long, default_value = "127.0.0.1:2379")]
    pub etcd: Vec<String>,

    /// Root directory chunks are hashed and opened under.
    #[arg(long, default_value = "/data/sdfs")]
    pub workdir: PathBuf,

    /// Number of scheduler worker threads.
    #[arg(long, default_value_t = 4)]
    pub maxcore: usize,

    /// Number of shards a volume's keyspace is split across.
    #[arg(long, default_value_t = 1)]
    pub redis_sharding: u32,

    /// Number of replicas maintained per shard.
    #[arg(long, default_value_t = 1)]
    pub redis_replica: u32,

    /// Places every shard/replica of a volume on a single host.
    #[arg(long)]
    pub solomode: bool,

    /// Disables the `O_DIRECT` fast path for sector-aligned writes.
    #[arg(long)]
    pub no_io_sync: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Starts the chunk-data-server daemon and blocks until interrupted.
    Serve,
    /// Creates a volume's placement record and redis-shard assignment.
    Mkvol {
        name: String,
    },
    /// Removes a volume's placement record.
    Rmvol {
        name: String,
    },
    /// Prints the scheduler's worker count and active configuration.
    Status,
}
