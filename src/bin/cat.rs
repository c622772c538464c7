//! asyncrw cat
//!
//! Streams a file to stdout through the read-ahead engine.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use asyncrw::store::StdFileStore;
use asyncrw::{AsyncFile, AsyncFileConfig, AsyncRwError, OpenOptions, Scheduler, SchedulerConfig, Timeout};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// asyncrw cat
#[derive(Parser, Debug)]
#[command(name = "asyncrw-cat")]
#[command(about = "Read a file through the read-ahead engine")]
#[command(version)]
struct Args {
    /// File to read
    path: PathBuf,

    /// Pool block size in bytes (header included)
    #[arg(short, long, default_value = "4096")]
    block_size: usize,

    /// Number of pool blocks (look-ahead depth)
    #[arg(short = 'n', long, default_value = "8")]
    block_count: usize,

    /// Bytes requested per read call
    #[arg(short, long, default_value = "1500")]
    chunk: usize,

    /// Per-call timeout in milliseconds (0 = wait forever)
    #[arg(short, long, default_value = "0")]
    timeout_ms: u64,

    /// Print size and CRC32 to stderr instead of writing the content
    #[arg(long)]
    checksum: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,asyncrw=debug"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("asyncrw-cat v{}", asyncrw::VERSION);

    if let Err(e) = run(&args) {
        tracing::error!("Failed to read {}: {}", args.path.display(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> asyncrw::Result<()> {
    let scheduler = Scheduler::spawn(SchedulerConfig::default())?;

    let config = AsyncFileConfig::builder(&args.path)
        .options(OpenOptions::READ | OpenOptions::READ_SIZE)
        .block_size(args.block_size)
        .block_count(args.block_count)
        .build();

    let file = AsyncFile::opened(&scheduler, Arc::new(StdFileStore::new()), config)?;

    let timeout = if args.timeout_ms == 0 {
        Timeout::Forever
    } else {
        Timeout::millis(args.timeout_ms)
    };

    let mut chunk = vec![0u8; args.chunk.max(1)];
    let mut hasher = crc32fast::Hasher::new();
    let mut total: u64 = 0;
    let mut retries: u64 = 0;
    let started = Instant::now();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    loop {
        let n = match file.read(&mut chunk, timeout) {
            Ok(0) => break,
            Ok(n) => n,
            Err(AsyncRwError::TryAgain { copied }) => {
                retries += 1;
                copied
            }
            Err(e) => return Err(e),
        };

        if args.checksum {
            hasher.update(&chunk[..n]);
        } else {
            out.write_all(&chunk[..n])?;
        }
        total += n as u64;

        if file.is_eof() {
            break;
        }
    }
    out.flush()?;

    let elapsed = started.elapsed();
    tracing::info!(
        "Read {} bytes in {:?} ({} timeouts, expected size {:?})",
        total,
        elapsed,
        retries,
        file.file_size()?
    );

    if args.checksum {
        eprintln!("{} bytes, crc32 {:08x}", total, hasher.finalize());
    }

    file.close()?;
    scheduler.shutdown();
    Ok(())
}
