//! Criterion benchmarks for the snapshot hot path.
//!
//! Run with: `cargo bench -p terminal_view`

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use settings::Config;
use terminal::{EchoConnector, TermColor, TextStyle};
use terminal_view::{build_snapshot, resolve_style, DefaultColors, TerminalPane};
use theme::Palette;

/// Pane showing the ANSI test page, fully processed.
fn loaded_pane(columns: u16, rows: u16) -> TerminalPane {
    let pane = TerminalPane::new(Config {
        columns,
        rows,
        ..Config::default()
    });
    if let Err(e) = pane.start(Box::new(EchoConnector::color_test())) {
        panic!("failed to start session: {e:#}");
    }
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let done = pane
            .render()
            .map(|s| (0..s.rows()).any(|r| s.row_text(r).starts_with("Type here.")))
            .unwrap_or(false);
        if done {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    pane
}

fn bench_build_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_snapshot");
    let palette = Palette::xterm();

    for (columns, rows) in [(80u16, 24u16), (200, 60)] {
        let pane = loaded_pane(columns, rows);
        let session = pane.session();
        group.throughput(Throughput::Elements(u64::from(columns) * u64::from(rows)));

        for origin in [0i32, -40] {
            let id = BenchmarkId::new(format!("{columns}x{rows}"), origin);
            group.bench_with_input(id, &origin, |b, &origin| {
                b.iter(|| {
                    build_snapshot(
                        session.buffer(),
                        session.style_state().as_ref(),
                        usize::from(columns),
                        usize::from(rows),
                        black_box(origin),
                        &palette,
                    )
                })
            });
        }
    }
    group.finish();
}

fn bench_resolve_style(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_style");
    let palette = Palette::xterm();
    let defaults = DefaultColors {
        foreground: palette.resolve(15),
        background: palette.resolve(0),
    };

    let styles = [
        ("default", TextStyle::default()),
        (
            "indexed",
            TextStyle {
                foreground: Some(TermColor::Indexed(196)),
                background: Some(TermColor::Indexed(236)),
                ..TextStyle::default()
            },
        ),
    ];
    for (name, style) in styles {
        group.bench_with_input(BenchmarkId::new("resolve_style", name), &style, |b, style| {
            b.iter(|| resolve_style(black_box(style), &defaults, &palette))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_snapshot, bench_resolve_style);
criterion_main!(benches);
