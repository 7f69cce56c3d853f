//! Performance benchmarks for path resolution.
//!
//! Every request resolves at least one client path, so these measure:
//! - Resolution of typical, deep and hostile paths
//! - Joining an upload name onto a directory
//! - Session token lookup

use std::path::Path;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use daemon::files::resolver::{resolve, resolve_join, Operation};
use daemon::SessionStore;

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    let root = Path::new("/srv/data");

    let cases = [
        ("root", ""),
        ("shallow", "docs/report.pdf"),
        ("deep", "a/b/c/d/e/f/g/h/i/j/k/l/m/n/o/p/file.txt"),
        ("dot_segments", "./a/./b/../c/./d/../../e/file.txt"),
        ("traversal", "a/b/../../../../etc/passwd"),
        ("absolute", "/etc/passwd"),
    ];

    for (name, logical) in cases {
        group.bench_function(name, |b| {
            b.iter(|| resolve(black_box(root), black_box(logical), Operation::List))
        });
    }

    group.finish();
}

fn bench_resolve_join(c: &mut Criterion) {
    let root = Path::new("/srv/data");

    c.bench_function("resolve_join_upload", |b| {
        b.iter(|| {
            resolve_join(
                black_box(root),
                black_box("projects/2024/q3"),
                black_box("summary.xlsx"),
                Operation::Upload,
            )
        })
    });
}

fn bench_session_authorize(c: &mut Criterion) {
    let store = SessionStore::new(Duration::from_secs(3600));
    let token = store.create("admin");

    c.bench_function("session_authorize", |b| {
        b.iter(|| store.authorize(black_box(Some(token.as_str()))))
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_resolve_join,
    bench_session_authorize,
);

criterion_main!(benches);
