//! termbridge - headless harness for the terminal presentation layer
//!
//! Runs a session against the echo connector's ANSI test page, replays a
//! scripted soft-keyboard episode and prints the resulting frames.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use terminal::EchoConnector;
use terminal_view::{EditorAction, KeyCode, KeyEvent, Modifiers, RenderSnapshot, TerminalPane};
use tracing::{debug, error, info};

/// Application startup time for performance monitoring
static STARTUP_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// Output is considered settled after this long without a change.
const SETTLE_TIME: Duration = Duration::from_millis(150);
/// Upper bound on waiting for output to settle.
const SETTLE_DEADLINE: Duration = Duration::from_secs(5);
/// Line height used for the scripted drag gesture.
const LINE_HEIGHT_PX: f32 = 20.0;

/// One scripted input event.
#[derive(Debug)]
enum Step {
    Compose(&'static str),
    Commit(&'static str),
    Finish,
    Delete(usize, usize),
    Action(EditorAction),
    Key(KeyCode, Modifiers, Option<char>),
}

/// Pinyin input of "你好", a correction, then a command line.
const SCRIPT: &[Step] = &[
    Step::Compose("n"),
    Step::Compose("ni"),
    Step::Compose("你"),
    Step::Commit("你"),
    Step::Finish,
    Step::Compose("hao"),
    Step::Delete(1, 0),
    Step::Compose("ha"),
    Step::Compose("好"),
    Step::Finish,
    Step::Commit(" ls\n"),
    Step::Commit("echo"),
    Step::Delete(2, 0),
    Step::Key(KeyCode::MOVE_HOME, Modifiers::empty(), None),
    Step::Key(KeyCode::MOVE_END, Modifiers::empty(), None),
    Step::Key(KeyCode::C, Modifiers::CTRL, Some('c')),
    Step::Action(EditorAction::Done),
];

/// Check if debug mode is enabled via environment variable.
fn is_debug_mode() -> bool {
    std::env::var("TERMBRIDGE_DEBUG").is_ok()
}

/// Initialize the logging system.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if is_debug_mode() {
        "termbridge=trace,terminal=trace,terminal_view=trace,info"
    } else {
        "termbridge=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_line_number(true))
        .with(filter)
        .init();

    if is_debug_mode() {
        info!(
            "termbridge v{} starting up (DEBUG MODE ENABLED)",
            env!("CARGO_PKG_VERSION")
        );
        info!("Set RUST_LOG for custom log levels, e.g. RUST_LOG=terminal_view=debug");
    } else {
        info!("termbridge v{} starting up", env!("CARGO_PKG_VERSION"));
    }
}

/// Pump change notifications until the session goes quiet.
fn wait_for_quiet(pane: &TerminalPane, wake_rx: &Receiver<()>) {
    let deadline = Instant::now() + SETTLE_DEADLINE;
    loop {
        pane.pump();
        if Instant::now() >= deadline {
            debug!("Output still changing at deadline");
            return;
        }
        match wake_rx.recv_timeout(SETTLE_TIME) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                pane.pump();
                return;
            }
        }
    }
}

fn drive(pane: &TerminalPane, step: &Step) {
    let handled = match *step {
        Step::Compose(text) => pane.on_composing_text_changed(text),
        Step::Commit(text) => pane.on_commit_text(text),
        Step::Finish => pane.on_finish_composing(),
        Step::Delete(before, after) => pane.on_delete_surrounding(before, after),
        Step::Action(action) => pane.on_editor_action(action),
        Step::Key(code, modifiers, unicode) => {
            pane.on_key_event(&KeyEvent::down(code, modifiers), unicode)
                | pane.on_key_event(&KeyEvent::up(code, modifiers), unicode)
        }
    };
    if !handled {
        debug!(?step, "Step not handled");
    }
}

fn print_frame(title: &str, snapshot: &RenderSnapshot) {
    println!(
        "--- {} ({}x{}, origin {}) ---",
        title,
        snapshot.columns(),
        snapshot.rows(),
        snapshot.scroll_origin()
    );
    for row in 0..snapshot.rows() {
        println!("{:>3} | {}", row, snapshot.row_text(row));
    }
    match snapshot.cursor() {
        Some(cursor) => println!("cursor: row {} col {} {:?}", cursor.row, cursor.column, cursor.shape),
        None => println!("cursor: hidden"),
    }
}

fn run() -> Result<()> {
    if let Some(path) = settings::ensure_config_file() {
        debug!("Using config file {:?}", path);
    }
    let config = settings::load_config();

    let (config_tx, config_rx) = mpsc::channel();
    let _watcher = settings::watch_config(move |config| {
        let _ = config_tx.send(config);
    });

    let mut pane = TerminalPane::new(config);
    let (wake_tx, wake_rx) = mpsc::channel();
    pane.set_waker(move || {
        let _ = wake_tx.send(());
    });

    pane.start(Box::new(EchoConnector::color_test()))
        .context("Failed to start session")?;
    wait_for_quiet(&pane, &wake_rx);
    print_frame("live", pane.render()?.as_ref());

    let history = pane.with_state(|state| state.scroll.history_line_count());
    pane.on_drag(history as f32 * LINE_HEIGHT_PX, LINE_HEIGHT_PX);
    print_frame("top of scrollback", pane.render()?.as_ref());
    pane.scroll_to_bottom();

    for step in SCRIPT {
        while let Ok(config) = config_rx.try_recv() {
            pane.apply_config(config);
        }
        drive(&pane, step);
    }
    wait_for_quiet(&pane, &wake_rx);
    print_frame("after scripted input", pane.render()?.as_ref());

    pane.stop();
    Ok(())
}

fn main() {
    let _ = *STARTUP_TIME;

    init_logging();

    if let Err(e) = run() {
        error!("termbridge failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Finished in {:?}", STARTUP_TIME.elapsed());
}
