//! Tests for open/close and the context state machine
//!
//! These tests verify:
//! - Argument validation before any I/O
//! - Access mode derivation and the READ_SIZE stat
//! - Cooperative close and misuse errors
//! - Re-opening a context resets all state
//! - Write-through for write-mode contexts

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use asyncrw::store::{MemoryStore, StdFileStore};
use asyncrw::{
    AsyncFile, AsyncFileConfig, AsyncRwError, OpenOptions, Scheduler, SchedulerConfig, Status,
    Timeout, BLOCK_HEADER_SIZE,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert("big", vec![0x11u8; 1000]);
    store.insert("small", b"hello, world".to_vec());
    store.insert_dir("dir");
    store
}

fn read_config(path: &str) -> AsyncFileConfig {
    AsyncFileConfig::builder(path)
        .payload_size(64)
        .block_count(4)
        .build()
}

fn write_config(path: &str, options: OpenOptions) -> AsyncFileConfig {
    AsyncFileConfig::builder(path)
        .options(options)
        .payload_size(64)
        .block_count(2)
        .build()
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_new_context_is_undefined() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::new(&scheduler, setup_store());

    assert_eq!(file.status(), Status::Undefined);
    assert!(matches!(
        file.read(&mut [0u8; 4], Timeout::NoWait),
        Err(AsyncRwError::InvalidOperation(_))
    ));
    assert!(matches!(file.close(), Err(AsyncRwError::InvalidOperation(_))));
}

#[test]
fn test_open_rejects_bad_geometry_before_io() {
    let store = setup_store();
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, store.clone());

    let configs = vec![
        AsyncFileConfig::builder("big").block_count(0).build(),
        AsyncFileConfig::builder("big").block_size(BLOCK_HEADER_SIZE).build(),
        AsyncFileConfig::builder("big").block_size(BLOCK_HEADER_SIZE + 65).build(),
        AsyncFileConfig::builder("").build(),
    ];

    for config in configs {
        let err = file.open(config).unwrap_err();
        assert!(matches!(err, AsyncRwError::InvalidArgument(_)));
        assert!(err.code() < 0);
    }

    assert_eq!(file.status(), Status::Undefined);
    assert_eq!(store.read_calls(), 0);
    assert_eq!(scheduler.queued(), 0);
}

#[test]
fn test_open_without_mode_not_supported() {
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, setup_store());

    let config = write_config("big", OpenOptions::APPEND | OpenOptions::CREATE);
    assert!(matches!(file.open(config), Err(AsyncRwError::NotSupported(_))));
    assert_eq!(file.status(), Status::Undefined);
}

#[test]
fn test_open_missing_file() {
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, setup_store());

    let err = file.open(read_config("nope")).unwrap_err();
    match err {
        AsyncRwError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(file.status(), Status::Undefined);
    assert_eq!(scheduler.queued(), 0);
}

// =============================================================================
// READ_SIZE Tests
// =============================================================================

#[test]
fn test_read_size_records_file_size() {
    let scheduler = Scheduler::manual();
    let config = AsyncFileConfig::builder("small")
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .payload_size(64)
        .build();

    let file = AsyncFile::opened(&scheduler, setup_store(), config).unwrap();
    assert_eq!(file.file_size().unwrap(), Some(12));
    assert_eq!(file.stats().file_size, Some(12));

    file.close().unwrap();
    assert_eq!(file.file_size().unwrap(), Some(12));
}

#[test]
fn test_file_size_absent_without_option() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, setup_store(), read_config("small")).unwrap();
    assert_eq!(file.file_size().unwrap(), None);
}

#[test]
fn test_file_size_on_undefined_rejected() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::new(&scheduler, setup_store());
    assert!(matches!(file.file_size(), Err(AsyncRwError::InvalidOperation(_))));
}

#[test]
fn test_read_size_missing_file_forwarded() {
    let store = setup_store();
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, store);

    let config = AsyncFileConfig::builder("missing")
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .payload_size(64)
        .build();

    match file.open(config).unwrap_err() {
        AsyncRwError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(file.status(), Status::Undefined);
}

#[test]
fn test_read_size_rejects_directory() {
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, setup_store());

    let config = AsyncFileConfig::builder("dir")
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .payload_size(64)
        .build();

    let err = file.open(config).unwrap_err();
    assert!(matches!(err, AsyncRwError::NotAFile(_)));
    assert_eq!(file.status(), Status::Undefined);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_close_twice_rejected() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, setup_store(), read_config("big")).unwrap();

    file.close().unwrap();
    assert_eq!(file.status(), Status::Closed);

    assert!(matches!(file.close(), Err(AsyncRwError::InvalidOperation(_))));
    assert!(matches!(
        file.read(&mut [0u8; 8], Timeout::NoWait),
        Err(AsyncRwError::InvalidOperation(_))
    ));
}

#[test]
fn test_close_aborts_queued_prefetch() {
    let store = setup_store();
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, store.clone(), read_config("big")).unwrap();
    assert_eq!(scheduler.queued(), 1);

    file.close().unwrap();
    scheduler.run_until_idle().unwrap();

    assert_eq!(store.read_calls(), 0);
    assert_eq!(file.stats().queued_blocks, 0);
}

#[test]
fn test_close_does_not_reclaim_queued_blocks() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, setup_store(), read_config("big")).unwrap();
    scheduler.run_until_idle().unwrap();

    file.close().unwrap();

    let stats = file.stats();
    assert_eq!(stats.status, Status::Closed);
    assert_eq!(stats.queued_blocks, 4);
    assert_eq!(stats.free_blocks, 0);
}

#[test]
fn test_close_wakes_blocked_reader() {
    // Manual scheduler that never runs: the reader can only wait
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, setup_store(), read_config("big")).unwrap();

    let start = Instant::now();
    let result = thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut buf = [0u8; 64];
            file.read(&mut buf, Timeout::millis(3_000))
        });

        thread::sleep(Duration::from_millis(50));
        file.close().unwrap();
        reader.join().unwrap()
    });

    assert!(matches!(result, Err(AsyncRwError::InvalidOperation(_))));
    assert!(start.elapsed() < Duration::from_millis(1_500));
    assert_eq!(file.status(), Status::Closed);
}

#[test]
fn test_close_after_eof() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, setup_store(), read_config("small")).unwrap();
    scheduler.run_until_idle().unwrap();

    let mut buf = [0u8; 64];
    assert_eq!(file.read(&mut buf, Timeout::Forever).unwrap(), 12);
    assert!(file.is_eof());

    file.close().unwrap();
    assert_eq!(file.status(), Status::Closed);
}

// =============================================================================
// Re-open Tests
// =============================================================================

#[test]
fn test_reopen_resets_state() {
    let store = setup_store();
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, store);

    file.open(read_config("big")).unwrap();
    scheduler.run_until_idle().unwrap();
    let mut buf = [0u8; 10];
    assert_eq!(file.read(&mut buf, Timeout::Forever).unwrap(), 10);
    file.close().unwrap();

    file.open(read_config("small")).unwrap();

    let stats = file.stats();
    assert_eq!(stats.status, Status::Active);
    assert_eq!(stats.queued_blocks, 0);
    assert_eq!(stats.free_blocks, 4);
    assert_eq!(stats.file_final_size, 0);
    assert_eq!(stats.head_offset, None);

    // Drain stale activations of the previous open along with the new one
    scheduler.run_until_idle().unwrap();

    let mut buf = [0u8; 64];
    assert_eq!(file.read(&mut buf, Timeout::Forever).unwrap(), 12);
    assert_eq!(&buf[..12], b"hello, world");
    assert_eq!(file.file_final_size(), 12);
}

#[test]
fn test_reopen_shared_pool_returns_old_blocks() {
    use asyncrw::BlockPool;

    let scheduler = Scheduler::manual();
    let pool = Arc::new(BlockPool::new(64 + BLOCK_HEADER_SIZE, 4).unwrap());
    let mut file = AsyncFile::new(&scheduler, setup_store());

    file.open_with_pool(read_config("big"), Arc::clone(&pool)).unwrap();
    scheduler.run_until_idle().unwrap();
    assert_eq!(pool.available(), 0);

    file.open_with_pool(read_config("small"), Arc::clone(&pool)).unwrap();
    assert_eq!(pool.available(), 4);
}

// =============================================================================
// Write Tests
// =============================================================================

#[test]
fn test_write_truncate_then_write_through() {
    let store = setup_store();
    let scheduler = Scheduler::manual();

    let config = write_config("small", OpenOptions::WRITE | OpenOptions::TRUNCATE);
    let file = AsyncFile::opened(&scheduler, store.clone(), config).unwrap();
    assert_eq!(store.contents("small").unwrap(), b"");

    assert_eq!(file.write(b"abc").unwrap(), 3);
    assert_eq!(file.write(b"def").unwrap(), 3);
    file.close().unwrap();

    assert_eq!(store.contents("small").unwrap(), b"abcdef");
    assert_eq!(scheduler.queued(), 0);
}

#[test]
fn test_write_append_and_create() {
    let store = setup_store();
    let scheduler = Scheduler::manual();

    let config = write_config("small", OpenOptions::WRITE | OpenOptions::APPEND);
    let file = AsyncFile::opened(&scheduler, store.clone(), config).unwrap();
    file.write(b"!").unwrap();
    assert_eq!(store.contents("small").unwrap(), b"hello, world!");

    let config = write_config("new", OpenOptions::WRITE | OpenOptions::CREATE);
    let file = AsyncFile::opened(&scheduler, store.clone(), config).unwrap();
    file.write(b"fresh").unwrap();
    assert_eq!(store.contents("new").unwrap(), b"fresh");
}

#[test]
fn test_write_without_create_on_missing_file() {
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, setup_store());

    let err = file.open(write_config("missing", OpenOptions::WRITE)).unwrap_err();
    assert!(matches!(err, AsyncRwError::Io(_)));
}

#[test]
fn test_write_on_read_mode_rejected() {
    let scheduler = Scheduler::manual();
    let file = AsyncFile::opened(&scheduler, setup_store(), read_config("big")).unwrap();
    assert!(matches!(file.write(b"x"), Err(AsyncRwError::InvalidOperation(_))));
}

#[test]
fn test_read_wins_over_write() {
    let store = setup_store();
    let scheduler = Scheduler::manual();

    let config = AsyncFileConfig::builder("small")
        .options(OpenOptions::READ | OpenOptions::WRITE | OpenOptions::TRUNCATE)
        .payload_size(64)
        .build();
    let file = AsyncFile::opened(&scheduler, store.clone(), config).unwrap();

    assert_eq!(store.contents("small").unwrap(), b"hello, world");
    assert_eq!(scheduler.queued(), 1);
    assert!(matches!(file.write(b"x"), Err(AsyncRwError::InvalidOperation(_))));
}

// =============================================================================
// Filesystem Store Tests
// =============================================================================

#[test]
fn test_std_store_round_trip_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
    std::fs::write(temp_dir.path().join("data.bin"), &content).unwrap();

    let scheduler = Scheduler::spawn(SchedulerConfig::default()).unwrap();
    let store = Arc::new(StdFileStore::rooted(temp_dir.path()));

    let config = AsyncFileConfig::builder(PathBuf::from("data.bin"))
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .block_size(512)
        .block_count(4)
        .build();
    let file = AsyncFile::opened(&scheduler, store, config).unwrap();
    assert_eq!(file.file_size().unwrap(), Some(10_000));

    let mut out = Vec::new();
    let mut buf = vec![0u8; 999];
    loop {
        let n = file.read(&mut buf, Timeout::millis(5_000)).unwrap();
        out.extend_from_slice(&buf[..n]);
        if file.is_eof() {
            break;
        }
    }

    assert_eq!(out, content);
    assert_eq!(file.file_final_size(), 10_000);
    file.close().unwrap();
    scheduler.shutdown();
}

#[test]
fn test_std_store_write_create_truncate() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.txt");
    std::fs::write(&path, b"stale content").unwrap();

    let scheduler = Scheduler::manual();
    let store = Arc::new(StdFileStore::new());

    let config = AsyncFileConfig::builder(&path)
        .options(OpenOptions::WRITE | OpenOptions::CREATE | OpenOptions::TRUNCATE)
        .build();
    let file = AsyncFile::opened(&scheduler, store, config).unwrap();
    file.write(b"new").unwrap();
    file.close().unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), b"new");
}

#[cfg(unix)]
#[test]
fn test_std_store_device_rejected_with_read_size() {
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, Arc::new(StdFileStore::new()));

    let config = AsyncFileConfig::builder("/dev/null")
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .build();
    assert!(matches!(file.open(config), Err(AsyncRwError::NotAFile(_))));
    assert_eq!(file.status(), Status::Undefined);
    assert_eq!(scheduler.queued(), 0);
}

#[test]
fn test_std_store_directory_rejected_with_read_size() {
    let temp_dir = TempDir::new().unwrap();
    let scheduler = Scheduler::manual();
    let mut file = AsyncFile::new(&scheduler, Arc::new(StdFileStore::new()));

    let config = AsyncFileConfig::builder(temp_dir.path())
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .build();
    assert!(matches!(file.open(config), Err(AsyncRwError::NotAFile(_))));
}
