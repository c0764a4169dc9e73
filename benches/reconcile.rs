//! Benchmarks for the reconciler's text-to-JSON extraction.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::Map;

use verdict::services::reconcile;

fn prose_with_embedded_object(repeats: usize) -> String {
    let mut text = String::new();
    for i in 0..repeats {
        text.push_str(&format!(
            "Paragraph {i} discussing the diff with some braces in prose {{like this}} and code.\n"
        ));
    }
    text.push_str(
        r#"{"summary": "final verdict", "overall_status": "NEEDS_CHANGES", "metrics": {"files_reviewed": 12, "issues_found": 4}}"#,
    );
    text
}

fn brace_soup(repeats: usize) -> String {
    let mut text = String::new();
    for _ in 0..repeats {
        text.push_str("{ not json { \"half\": } open ");
    }
    text
}

fn bench_reconcile(c: &mut Criterion) {
    let empty_state = Map::new();

    let small = prose_with_embedded_object(5);
    c.bench_function("reconcile_embedded_small", |b| {
        b.iter(|| reconcile(black_box(&small), black_box(&empty_state)));
    });

    let large = prose_with_embedded_object(500);
    c.bench_function("reconcile_embedded_large", |b| {
        b.iter(|| reconcile(black_box(&large), black_box(&empty_state)));
    });

    let soup = brace_soup(200);
    c.bench_function("reconcile_unbalanced_soup", |b| {
        b.iter(|| reconcile(black_box(&soup), black_box(&empty_state)));
    });

    let fenced = format!(
        "```json\n{}\n```",
        r#"{"summary": "fenced", "overall_status": "APPROVED"}"#
    );
    c.bench_function("reconcile_fenced", |b| {
        b.iter(|| reconcile(black_box(&fenced), black_box(&empty_state)));
    });
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
