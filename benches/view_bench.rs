use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use mmap_view::{AccessMode, FlushPolicy, MappedFileView, OpenMode};
use std::fs;
use std::path::PathBuf;

// Simple helper to build a unique temp path per bench
fn tmp_path(name: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("mmap_view_bench_{}_{}", name, std::process::id()));
    p
}

fn seeded_file(name: &str, sz: usize, byte: u8) -> PathBuf {
    let path = tmp_path(name);
    let _ = fs::remove_file(&path);
    fs::write(&path, vec![byte; sz]).expect("seed");
    path
}

fn bench_for_new_file(b: &mut Criterion) {
    let mut group = b.benchmark_group("for_new_file");
    for &size in &[4_usize * 1024, 64 * 1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |ben, &sz| {
            ben.iter_batched(
                || {
                    let path = tmp_path(&format!("for_new_file_{}", sz));
                    let _ = fs::remove_file(&path);
                    (path, sz)
                },
                |(path, sz)| {
                    let view = MappedFileView::for_new_file(&path, sz as u64).expect("create");
                    drop(view);
                    let _ = fs::remove_file(&path);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_write(b: &mut Criterion) {
    let mut group = b.benchmark_group("write");
    for &size in &[4_usize * 1024, 64 * 1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));

        // Variant A: writes inside the mapping, no flush
        group.bench_with_input(BenchmarkId::new("in_place", size), &size, |ben, &sz| {
            let path = tmp_path(&format!("write_in_place_{}", sz));
            let _ = fs::remove_file(&path);
            let mut view = MappedFileView::for_new_file(&path, sz as u64).expect("create");

            let payload = vec![0xAB_u8; sz];
            ben.iter(|| {
                view.write(&payload, 0, false, false).expect("write");
                criterion::black_box(&payload);
            });

            drop(view);
            let _ = fs::remove_file(&path);
        });

        // Variant B: write plus explicit flush
        group.bench_with_input(BenchmarkId::new("write_plus_flush", size), &size, |ben, &sz| {
            let path = tmp_path(&format!("write_flush_{}", sz));
            let _ = fs::remove_file(&path);
            let mut view = MappedFileView::for_new_file(&path, sz as u64).expect("create");

            let payload = vec![0xAC_u8; sz];
            ben.iter(|| {
                view.write(&payload, 0, false, false).expect("write");
                view.flush().expect("flush");
            });

            drop(view);
            let _ = fs::remove_file(&path);
        });

        // Variant C: byte-threshold flushing configured on the builder
        group.bench_with_input(BenchmarkId::new("write_threshold", size), &size, |ben, &sz| {
            let path = tmp_path(&format!("write_threshold_{}", sz));
            let _ = fs::remove_file(&path);
            let mut view = MappedFileView::builder(&path)
                .flush_policy(FlushPolicy::EveryBytes(sz))
                .create(sz as u64)
                .expect("create with threshold");

            let payload = vec![0xAD_u8; sz];
            ben.iter(|| {
                view.write(&payload, 0, false, false).expect("write");
                criterion::black_box(&payload);
            });

            drop(view);
            let _ = fs::remove_file(&path);
        });
    }
    group.finish();
}

fn bench_write_growth(b: &mut Criterion) {
    let mut group = b.benchmark_group("write_growth");
    let step = 64 * 1024;
    let steps = 16;
    group.throughput(Throughput::Bytes((step * steps) as u64));
    group.bench_function("append_16x64KB", |ben| {
        let payload = vec![0x5A_u8; step];
        ben.iter_batched(
            || {
                let path = tmp_path("write_growth");
                let _ = fs::remove_file(&path);
                let view = MappedFileView::for_new_file(&path, step as u64).expect("create");
                (path, view)
            },
            |(path, mut view)| {
                for i in 0..steps {
                    view.write(&payload, (i * step) as u64, true, true).expect("append");
                }
                drop(view);
                let _ = fs::remove_file(&path);
            },
            BatchSize::PerIteration,
        )
    });
    group.finish();
}

fn bench_read(b: &mut Criterion) {
    let mut group = b.benchmark_group("read");
    for &size in &[4_usize * 1024, 64 * 1024, 1024 * 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |ben, &sz| {
            let path = seeded_file(&format!("read_{}", sz), sz, 1);
            let mut view =
                MappedFileView::from_existing_file(&path, AccessMode::ReadOnly, OpenMode::OpenExisting, 0, 0)
                    .expect("open");

            let mut buf = vec![0u8; sz];
            ben.iter(|| {
                view.seek(0).expect("seek");
                view.read_into(&mut buf, true).expect("read_into");
                criterion::black_box(&buf);
            });

            drop(view);
            let _ = fs::remove_file(&path);
        });
    }
    group.finish();
}

fn bench_read_window_growth(b: &mut Criterion) {
    let mut group = b.benchmark_group("read_window_growth");
    let sz = 4 * 1024 * 1024;
    group.throughput(Throughput::Bytes(sz as u64));
    group.bench_function("read_4MB_from_4KB_window", |ben| {
        let path = seeded_file("read_window_growth", sz, 2);
        ben.iter_batched(
            || {
                MappedFileView::from_existing_file(&path, AccessMode::ReadOnly, OpenMode::OpenExisting, 4096, 0)
                    .expect("open")
            },
            |mut view| {
                let mut total = 0usize;
                loop {
                    let block = view.read(64 * 1024, true).expect("read");
                    if block.is_empty() {
                        break;
                    }
                    total += block.len();
                }
                criterion::black_box(total);
            },
            BatchSize::PerIteration,
        );
        let _ = fs::remove_file(&path);
    });
    group.finish();
}

#[cfg(feature = "iterator")]
fn bench_iterator_chunks(b: &mut Criterion) {
    let mut group = b.benchmark_group("iterator_chunks");
    let sz = 4 * 1024 * 1024;
    group.throughput(Throughput::Bytes(sz as u64));
    group.bench_function("iterate_4MB_by_64KB", |ben| {
        let path = seeded_file("iter_chunks", sz, 3);
        let mut view = MappedFileView::from_existing_file(&path, AccessMode::ReadOnly, OpenMode::OpenExisting, 0, 0)
            .expect("open");
        ben.iter(|| {
            view.seek(0).expect("rewind");
            let mut total = 0usize;
            for chunk_res in view.chunks(64 * 1024) {
                let chunk: Vec<u8> = chunk_res.expect("chunk");
                total += chunk.len();
                criterion::black_box(&chunk);
            }
            criterion::black_box(total);
        });
        drop(view);
        let _ = fs::remove_file(&path);
    });
    group.finish();
}
#[cfg(not(feature = "iterator"))]
fn bench_iterator_chunks(_: &mut Criterion) {}

fn criterion_config() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .warm_up_time(std::time::Duration::from_millis(300))
        .measurement_time(std::time::Duration::from_secs(3))
}

criterion_group! {
    name = view_benches;
    config = criterion_config();
    targets =
        bench_for_new_file,
        bench_write,
        bench_write_growth,
        bench_read,
        bench_read_window_growth,
        bench_iterator_chunks
}

criterion_main!(view_benches);
