//! Benchmarks for format detection
//!
//! Run: cargo bench
//! Run specific: cargo bench -- dispatch
//! Compare: cargo bench -- --save-baseline v1 && cargo bench -- --baseline v1

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::Path;
use tempfile::tempdir;

use romscope::factory::supported_file_extensions;
use romscope::{MemFile, RomDataAttrs, RomDataFactory};

fn make_nes() -> Vec<u8> {
    let mut rom = vec![0u8; 16 + 2 * 16384 + 8192];
    rom[0..4].copy_from_slice(b"NES\x1A");
    rom[4] = 2;
    rom[5] = 1;
    rom
}

fn make_gbs() -> Vec<u8> {
    let mut data = vec![0u8; 0x200];
    data[0..4].copy_from_slice(b"GBS\x01");
    data[4] = 3;
    data[5] = 1;
    data[0x06..0x08].copy_from_slice(&0x3F00u16.to_le_bytes());
    data[0x08..0x0A].copy_from_slice(&0x3F00u16.to_le_bytes());
    data[0x0A..0x0C].copy_from_slice(&0x3F10u16.to_le_bytes());
    data[0x10..0x16].copy_from_slice(b"Tetris");
    data
}

// ============================================================================
// Dispatch
// ============================================================================

fn benchmark_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let cases: [(&str, Vec<u8>, &str); 3] = [
        ("magic_gbs", make_gbs(), "tetris.gbs"),
        ("header_nes", make_nes(), "game.nes"),
        // Walks every table and reads a footer.
        ("unsupported", vec![0x5Au8; 64 * 1024], "noise.vb"),
    ];

    for (label, data, name) in cases {
        let file = MemFile::new(data).with_name(name).into_shared();
        group.bench_with_input(BenchmarkId::from_parameter(label), &file, |b, file| {
            b.iter(|| black_box(RomDataFactory::create(file, RomDataAttrs::NONE).map(|rd| rd.class_name())))
        });
    }

    group.finish();
}

fn benchmark_fields(c: &mut Criterion) {
    let file = MemFile::new(make_nes()).with_name("game.nes").into_shared();
    c.bench_function("nes_detect_and_fields", |b| {
        b.iter(|| {
            let rd = RomDataFactory::create(&file, RomDataAttrs::NONE);
            black_box(rd.map(|rd| rd.fields().count()))
        })
    });
}

fn benchmark_extension_index(c: &mut Criterion) {
    c.bench_function("supported_file_extensions", |b| {
        b.iter(|| black_box(supported_file_extensions().len()))
    });
}

// ============================================================================
// Directory scan (I/O-bound)
// ============================================================================

fn create_bench_tree(dir: &Path, count: usize) {
    for i in 0..count {
        let subdir = dir.join(format!("dir_{}", i % 10));
        std::fs::create_dir_all(&subdir).unwrap();
        let (ext, data) = match i % 3 {
            0 => ("nes", make_nes()),
            1 => ("gbs", make_gbs()),
            _ => ("bin", format!("bench-content-{}", i).into_bytes()),
        };
        std::fs::write(subdir.join(format!("file_{}.{}", i, ext)), data).unwrap();
    }
}

fn benchmark_scan_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_throughput");
    group.sample_size(10); // Fewer samples for I/O-bound benchmarks

    for &file_count in &[100, 500] {
        let dir = tempdir().unwrap();
        create_bench_tree(dir.path(), file_count);

        group.throughput(Throughput::Elements(file_count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(file_count), &file_count, |b, _| {
            b.iter(|| {
                let mut found = 0u64;
                for entry in walkdir::WalkDir::new(dir.path())
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                {
                    if let Ok(Some(_)) = RomDataFactory::create_from_path(entry.path(), RomDataAttrs::NONE) {
                        found += 1;
                    }
                }
                black_box(found)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_dispatch,
    benchmark_fields,
    benchmark_extension_index,
    benchmark_scan_throughput,
);

criterion_main!(benches);
