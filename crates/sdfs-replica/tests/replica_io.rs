use std::sync::Arc;

use sdfs_buf::SegBuffer;
use sdfs_dtyp::{ChkId, ChunkType, CoreConfig, IoDescriptor};
use sdfs_replica::ReplicaEngine;
use sdfs_scheduler::Scheduler;

fn config(workdir: &std::path::Path, io_sync: bool) -> Arc<CoreConfig> {
    Arc::new(CoreConfig {
        io_sync,
        queue_depth: 32,
        workdir: workdir.to_path_buf(),
        ..CoreConfig::default()
    })
}

#[tokio::test]
async fn buffered_write_then_read_roundtrips() {
    let tmp = tempfile::tempdir().unwrap();
    let scheduler = Arc::new(Scheduler::start(2, None));
    scheduler.register_ops(sdfs_scheduler::OpClass::Replica, 32);
    let cfg = config(tmp.path(), false);
    let engine = Arc::new(ReplicaEngine::new(Arc::clone(&scheduler), cfg));

    let chk = ChkId::new(1, 1, 0, ChunkType::Data, 0);
    let io = IoDescriptor::new(chk, 0, 0, 13);
    let mut payload = SegBuffer::with_len(13);
    {
        let mut projected = payload.project_mut();
        let mut offset = 0usize;
        for slice in projected.iter_mut() {
            for b in slice.base.iter_mut() {
                *b = b"hello replica"[offset];
                offset += 1;
            }
        }
    }

    let written = engine.write(io, payload).await.unwrap();
    assert_eq!(written, 13);

    let read_back = engine.read(io).await.unwrap();
    assert_eq!(read_back.len(), 13);
    let projected = read_back.project();
    let bytes: Vec<u8> = projected.iter().flat_map(|s| s.base.iter().copied()).collect();
    assert_eq!(bytes, b"hello replica");
}

#[tokio::test]
async fn read_after_zero_write_returns_zeroed_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let scheduler = Arc::new(Scheduler::start(1, None));
    scheduler.register_ops(sdfs_scheduler::OpClass::Replica, 32);
    let cfg = config(tmp.path(), false);
    let engine = ReplicaEngine::new(scheduler, cfg);

    let chk = ChkId::new(2, 1, 0, ChunkType::Data, 0);
    let io = IoDescriptor::new(chk, 0, 0, 512);
    engine.write(io, SegBuffer::with_len(512)).await.unwrap();

    let buf = engine.read(io).await.unwrap();
    assert_eq!(buf.len(), 512);
    let projected = buf.project();
    assert!(projected.iter().all(|s| s.base.iter().all(|&b| b == 0)));
}
