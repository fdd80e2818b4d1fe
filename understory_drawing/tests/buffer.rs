// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `understory_drawing` crate.
//!
//! These exercise handle allocation across threads, persisting a buffer as
//! JSON, and recording layers through a shared `LayerCache`.

use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use understory_drawing::{
    Command, CommandBuffer, HandleAllocator, LayerCache, LayerId, LayerSource, LayerStorage,
    PixelBuffer, visit_commands,
};

/// Writer handed to the fmt subscriber; collects everything it logs.
#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a debug-level subscriber installed and return what it logged.
fn capture_logs(f: impl FnOnce()) -> String {
    let sink = LogSink::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = sink.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn concurrent_gradients_get_distinct_handles() {
    let allocator = Arc::new(HandleAllocator::new());
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let buffer = CommandBuffer::with_allocator(allocator);
                (0..1000)
                    .map(|i| {
                        buffer
                            .create_linear_gradient(10.0, 10.0, 0.0, 0.0, f64::from(i), 0.0)
                            .id()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = BTreeSet::new();
    for worker in workers {
        for id in worker.join().unwrap() {
            assert!(seen.insert(id), "duplicate handle {id:?}");
        }
    }
    assert_eq!(seen.len(), 2000);
    assert_eq!(seen.first().map(|id| id.0), Some(1));
    assert_eq!(seen.last().map(|id| id.0), Some(2000));
}

#[test]
fn buffer_survives_json_round_trip() {
    let mut buffer = CommandBuffer::new();
    buffer.with_saved(|b| {
        b.set_font("bold 12px Arial");
        b.fill_text("hello", 1.0, 2.0, None);
        b.arc(5.0, 5.0, 2.0, 0.0, 1.0, true);
        b.draw_image(&PixelBuffer::filled(1, 2, 0x80ff_0000).unwrap(), 0.0, 0.0, 1.0, 2.0);
        let mut gradient = b.create_linear_gradient(1.0, 1.0, 0.0, 0.0, 1.0, 1.0);
        gradient.add_color_stop(1.0, "teal");
        b.set_fill_style(&gradient);
    });
    buffer.statistics("frame");

    let json = serde_json::to_string(buffer.commands()).unwrap();
    let commands: Vec<Command> = serde_json::from_str(&json).unwrap();
    let restored = CommandBuffer::from_commands(commands);
    assert_eq!(restored.commands(), buffer.commands());
    assert_eq!(restored.save_depth(), 0);
}

#[test]
fn json_round_trip_keeps_floats_exact() {
    let mut buffer = CommandBuffer::new();
    buffer.mark_latency();
    for i in 0..500 {
        let step = f64::from(i);
        buffer.rotate(0.1137 * step);
        buffer.arc(step / 3.0, 0.1, 7.0, PI * step / 7.0, 2.0 * PI / 3.0, i % 2 == 0);
        buffer.set_line_width(0.1 + step * 0.2);
    }

    let json = serde_json::to_string(buffer.commands()).unwrap();
    let commands: Vec<Command> = serde_json::from_str(&json).unwrap();
    assert_eq!(commands.len(), buffer.len());
    for (restored, original) in commands.iter().zip(buffer.iter()) {
        assert_eq!(restored, original);
    }
}

#[test]
fn non_finite_arguments_do_not_survive_json() {
    let mut buffer = CommandBuffer::new();
    buffer.move_to(f64::NAN, 1.0);
    buffer.line_to(f64::INFINITY, 1.0);

    let json = serde_json::to_string(buffer.commands()).unwrap();
    assert_eq!(
        json,
        r#"[{"kind":"move-to","x":null,"y":1.0},{"kind":"line-to","x":null,"y":1.0}]"#
    );
    assert!(serde_json::from_str::<Vec<Command>>(&json).is_err());
}

#[test]
fn image_with_wrong_pixel_count_is_rejected() {
    let json = r#"[
        {"kind":"save"},
        {"kind":"image","width":4294967295,"height":4294967295,
         "pixels":{"width":4294967295,"height":4294967295,"data":[1]},
         "image":1,"x":0.0,"y":0.0,"dst_width":1.0,"dst_height":1.0}
    ]"#;
    let err = serde_json::from_str::<Vec<Command>>(json).unwrap_err();
    assert!(err.to_string().contains("4294967295x4294967295"), "{err}");
}

#[test]
fn shared_layer_cache_records_and_expands() {
    let cache = Arc::new(Mutex::new(LayerCache::new()));
    let mut buffer = CommandBuffer::new().with_layer_storage(cache.clone());

    let id = buffer.create_layer().unwrap();
    buffer.with_layer(&id, |b| {
        b.begin_path();
        b.rect(0.0, 0.0, 2.0, 2.0);
    });
    buffer.draw_layer(&id);
    buffer.draw_layer(&id);

    let kinds: Vec<_> = buffer.iter().map(Command::kind).collect();
    assert_eq!(
        kinds,
        [
            "begin-layer",
            "begin-path",
            "rect",
            "end-layer",
            "draw-layer",
            "draw-layer"
        ]
    );

    let cache = cache.lock().unwrap();
    assert_eq!(cache.len(), 1);
    let mut expanded = Vec::new();
    let source: &dyn LayerSource = &*cache;
    visit_commands(buffer.commands(), Some(source), &mut |command| {
        expanded.push(command.kind());
    });
    assert_eq!(expanded.iter().filter(|kind| **kind == "rect").count(), 3);
}

#[test]
fn unmatched_end_layer_is_logged() {
    let mut cache = LayerCache::new();
    let mut buffer = CommandBuffer::new();
    let id = LayerId::from("orphan");

    let logs = capture_logs(|| cache.end_layer(&mut buffer, &id));
    assert!(logs.contains("WARN"), "{logs}");
    assert!(logs.contains("end_layer without matching begin_layer"), "{logs}");
    assert!(logs.contains("layer=orphan"), "{logs}");
    assert_eq!(buffer.commands(), &[Command::EndLayer { id }]);
    assert!(cache.is_empty());
}

#[test]
fn skipped_layer_draws_are_logged() {
    let mut cache = LayerCache::new();
    let mut buffer = CommandBuffer::new();
    let id = LayerId::from("loop");
    cache.begin_layer(&mut buffer, &id);
    buffer.fill();
    cache.draw_layer(&mut buffer, &id);
    cache.end_layer(&mut buffer, &id);

    let commands = [
        Command::DrawLayer { id: id.clone() },
        Command::DrawLayer {
            id: LayerId::from("missing"),
        },
    ];
    let source: &dyn LayerSource = &cache;
    let mut seen = Vec::new();
    let logs = capture_logs(|| {
        visit_commands(&commands, Some(source), &mut |command| {
            seen.push(command.kind());
        });
    });
    assert_eq!(seen, ["fill"]);
    assert!(logs.contains("skipping recursive layer draw"), "{logs}");
    assert!(logs.contains("skipping draw of unknown layer"), "{logs}");
    assert!(logs.contains("layer=missing"), "{logs}");
}
