mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use sdfs::{Cluster, ClusterConfig, CoreConfigBuilder};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> sdfs::Result<()> {
    let core = CoreConfigBuilder::new()
        .maxcore(cli.maxcore)
        .redis_sharding(cli.redis_sharding)
        .redis_replica(cli.redis_replica)
        .solomode(cli.solomode)
        .io_sync(!cli.no_io_sync)
        .workdir(cli.workdir.clone())
        .build();

    let cluster = Cluster::start(ClusterConfig::new(core, cli.etcd.clone())).await?;

    match cli.command {
        Commands::Serve => serve(cluster).await,
        Commands::Mkvol { name } => {
            let (fileid, addrs) = cluster.mkvol(&name).await?;
            println!("volid={} ctime={} shards={:?}", fileid.volid, fileid.ctime, addrs);
            Ok(())
        }
        Commands::Rmvol { name } => {
            cluster.rmvol(&name).await?;
            println!("removed {name}");
            Ok(())
        }
        Commands::Status => {
            println!(
                "workers={} maxcore={} redis_sharding={} redis_replica={} solomode={}",
                cluster.scheduler().worker_count(),
                cluster.config().maxcore,
                cluster.config().redis_sharding,
                cluster.config().redis_replica,
                cluster.config().solomode,
            );
            Ok(())
        }
    }
}

/// Runs until `SIGINT`/`SIGTERM`, then lets every worker drain in-flight
/// requests before returning. `ctrlc` registers the handler on its own
/// thread since the daemon's scheduler workers are themselves blocking OS
/// threads, not tokio's own runtime threads.
async fn serve(cluster: Cluster) -> sdfs::Result<()> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    let mut tx = Some(tx);
    ctrlc::set_handler(move || {
        if let Some(tx) = tx.take() {
            let _ = tx.send(());
        }
    })
    .expect("failed to install signal handler");

    log::info!("sdfs-cds listening on {} workers", cluster.scheduler().worker_count());
    let _ = rx.await;
    log::info!("shutting down");
    cluster.shutdown();
    Ok(())
}
