//! Benchmarks for asyncrw read throughput

use std::sync::Arc;

use asyncrw::store::MemoryStore;
use asyncrw::{AsyncFile, AsyncFileConfig, Scheduler, SchedulerConfig, Timeout};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const FILE_SIZE: usize = 1024 * 1024;

fn read_whole(scheduler: &Scheduler, store: &Arc<MemoryStore>, chunk: usize) -> usize {
    let config = AsyncFileConfig::builder("bench.bin")
        .block_size(4096)
        .block_count(8)
        .build();
    let file = AsyncFile::opened(scheduler, store.clone(), config).unwrap();

    let mut buf = vec![0u8; chunk];
    let mut total = 0;
    loop {
        let n = file.read(&mut buf, Timeout::Forever).unwrap();
        total += n;
        if n < chunk {
            break;
        }
    }
    total
}

fn read_benchmarks(c: &mut Criterion) {
    let scheduler = Scheduler::spawn(SchedulerConfig::default()).unwrap();
    let store = Arc::new(MemoryStore::new());
    store.insert("bench.bin", vec![0xA5u8; FILE_SIZE]);

    let mut group = c.benchmark_group("sequential_read");
    group.throughput(Throughput::Bytes(FILE_SIZE as u64));

    for chunk in [512usize, 4080, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| read_whole(&scheduler, &store, chunk));
        });
    }

    group.finish();
    scheduler.shutdown();
}

criterion_group!(benches, read_benchmarks);
criterion_main!(benches);
