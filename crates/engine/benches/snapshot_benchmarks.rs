//! Benchmarks for traversal, snapshotting and exclusion matching
//!
//! These measure the hot paths of `fsguard verify`:
//! - Directory snapshots (walk + full-content hashing)
//! - Exclusion pattern matching (called once per visited entry)
//! - Content hashing

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

/// Create a tree with N files spread over a few directories, plus a `.git`
/// directory that benchmarks may exclude
fn create_test_tree(num_files: usize) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    let root = temp.path();

    for dir in ["src", "docs", "assets/img", ".git/objects"] {
        std::fs::create_dir_all(root.join(dir)).expect("Failed to create directory");
    }

    for i in 0..num_files {
        let path = match i % 4 {
            0 => format!("src/module_{i}.rs"),
            1 => format!("docs/page_{i}.md"),
            2 => format!("assets/img/icon_{i}.png"),
            3 => format!(".git/objects/obj_{i}"),
            _ => unreachable!(),
        };

        let content = format!("Content for file {i}\n").repeat(16);
        std::fs::write(root.join(&path), content)
            .unwrap_or_else(|_| panic!("Failed to write file: {path}"));
    }

    temp
}

/// Benchmark directory snapshots with and without exclusions
fn bench_snapshot_directory(c: &mut Criterion) {
    use fsguard_engine::snapshot_directory;

    let mut group = c.benchmark_group("snapshot_directory");

    for size in &[10, 100, 500] {
        let temp = create_test_tree(*size);

        group.bench_with_input(BenchmarkId::new("all", size), temp.path(), |b, root| {
            b.iter(|| {
                let snapshot = snapshot_directory(black_box(root), &[] as &[&str])
                    .expect("Failed to snapshot");
                black_box(snapshot.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("exclude_git", size), temp.path(), |b, root| {
            b.iter(|| {
                let snapshot =
                    snapshot_directory(black_box(root), &[".git/"]).expect("Failed to snapshot");
                black_box(snapshot.len())
            });
        });
    }

    group.finish();
}

/// Benchmark exclusion matching (very hot path)
fn bench_pattern_matching(c: &mut Criterion) {
    use fsguard_config::PatternMatcher;

    let matcher = PatternMatcher::new([
        ".git/",
        "node_modules/",
        "target/",
        "*.log",
        "*.tmp",
        "docs/*.md",
        "**/cache/**",
    ]);

    let paths = [
        "src/main.rs",
        "vendor/dep/.git/HEAD",
        "web/node_modules/react/index.js",
        "logs/today.log",
        "docs/guide.md",
        "site/docs/guide.md",
        "a/b/c/d/e/f/g.rs",
    ];

    c.bench_function("pattern_is_excluded", |b| {
        b.iter(|| {
            let excluded = paths
                .iter()
                .filter(|p| matcher.is_excluded(black_box(p)))
                .count();
            black_box(excluded)
        });
    });
}

/// Benchmark content hashing
fn bench_hash_content(c: &mut Criterion) {
    use fsguard_engine::hash::hash_content;

    let mut group = c.benchmark_group("hash_content");

    for size in &[1024usize, 64 * 1024, 1024 * 1024] {
        let data = vec![0xA5u8; *size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(hash_content(black_box(data))));
        });
    }

    group.finish();
}

// Allow missing docs for criterion-generated code
#[allow(missing_docs)]
#[allow(clippy::wildcard_imports)]
mod bench_groups {
    use super::*;

    criterion_group!(
        benches,
        bench_snapshot_directory,
        bench_pattern_matching,
        bench_hash_content,
    );
}

criterion_main!(bench_groups::benches);
