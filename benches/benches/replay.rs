// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Benchmarks for recording and replaying `understory_drawing` buffers.

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Size};

use understory_drawing::{Command, CommandBuffer};
use understory_drawing_canvas::to_script;
use understory_drawing_svg::{SvgDocument, render_svg};

/// A grid of labelled, outlined cells, roughly what a line plot's axes and
/// legend record.
fn record_grid(buffer: &mut CommandBuffer, cells: u32) {
    buffer.set_font("12px sans-serif");
    buffer.set_text_align("center");
    for i in 0..cells {
        let x = f64::from(i % 32) * 20.0;
        let y = f64::from(i / 32) * 20.0;
        buffer.with_saved(|b| {
            b.translate(x, y);
            b.clip_rect(0.0, 0.0, 20.0, 20.0);
            b.begin_path();
            b.round_rect(1.0, 1.0, 18.0, 18.0, 3.0);
            b.set_fill_style("#eef");
            b.fill();
            b.set_stroke_style("#336");
            b.set_line_width(0.5);
            b.stroke();
            b.fill_text(i.to_string(), 10.0, 14.0, None);
        });
    }
}

fn grid(cells: u32) -> CommandBuffer {
    let mut buffer = CommandBuffer::new();
    record_grid(&mut buffer, cells);
    buffer
}

fn bench_drawing(c: &mut Criterion) {
    let sizes = [64_u32, 1024];

    let mut group = c.benchmark_group("drawing/record");
    for &cells in &sizes {
        group.bench_function(BenchmarkId::new("grid", cells), |b| {
            b.iter_batched(
                CommandBuffer::new,
                |mut buffer| {
                    record_grid(&mut buffer, cells);
                    black_box(buffer.len())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();

    let mut group = c.benchmark_group("drawing/replay");
    let document = SvgDocument::new(Size::new(640.0, 640.0), Rect::new(0.0, 0.0, 640.0, 640.0));
    for &cells in &sizes {
        let buffer = grid(cells);
        group.bench_function(BenchmarkId::new("canvas_script", cells), |b| {
            b.iter(|| black_box(to_script(black_box(buffer.commands())).len()));
        });
        group.bench_function(BenchmarkId::new("svg", cells), |b| {
            b.iter(|| black_box(render_svg(black_box(buffer.commands()), &document).len()));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("drawing/json");
    let buffer = grid(256);
    let json = serde_json::to_string(buffer.commands()).unwrap();
    group.bench_function("serialize", |b| {
        b.iter(|| black_box(serde_json::to_string(black_box(buffer.commands())).unwrap()));
    });
    group.bench_function("deserialize", |b| {
        b.iter(|| black_box(serde_json::from_str::<Vec<Command>>(black_box(&json)).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_drawing);
criterion_main!(benches);
