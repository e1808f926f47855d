//! Dedicated VT processing thread.
//!
//! Escape sequence parsing runs on its own OS thread so heavy output (e.g.
//! `yes`, large compiles) never stalls the presentation thread.
//!
//! After each batch the thread publishes a [`BufferChange`] captured under the
//! same lock that applied the batch. Notifications are throttled; a throttled
//! change is delivered once the frame interval has passed, so the last batch
//! is never left unannounced.

use crate::alacritty::SharedTerm;
use crate::types::BufferChange;
use alacritty_terminal::event::EventListener;
use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::term::TermMode;
use alacritty_terminal::vte::ansi::Processor;
use anyhow::{Context, Result};
use settings::constants::timing::{IDLE_RECV_TIMEOUT, MIN_FRAME_INTERVAL};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Initial capacity for the batch buffer (64KB covers most burst scenarios).
const BATCH_BUFFER_CAPACITY: usize = 65536;

/// Manages a dedicated OS thread for VT escape sequence processing.
///
/// On drop, signals the thread to shut down (it exits within ~100ms).
/// The thread is not joined: it may be waiting on the terminal lock held by
/// the caller during drop.
pub struct TerminalProcessor {
    shutdown: Arc<AtomicBool>,
    exited_flag: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl TerminalProcessor {
    /// Start the VT processing thread.
    ///
    /// `notify` runs on the VT thread after each published change; it must not
    /// block on presentation state.
    pub fn start<L, F>(
        output_rx: Receiver<Vec<u8>>,
        term: SharedTerm<L>,
        exited: Arc<AtomicBool>,
        notify: F,
    ) -> Result<Self>
    where
        L: EventListener + Send + 'static,
        F: Fn(&BufferChange) + Send + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let generation = Arc::new(AtomicU64::new(0));

        let worker = VtWorker {
            output_rx,
            term,
            exited: exited.clone(),
            shutdown: shutdown.clone(),
            generation: generation.clone(),
            notify,
        };

        thread::Builder::new()
            .name("termbridge-vt-processor".into())
            .spawn(move || worker.run())
            .context("Failed to spawn VT processing thread")?;

        Ok(Self {
            shutdown,
            exited_flag: exited,
            generation,
        })
    }

    /// Number of batches applied so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Check if the connector stream has ended.
    pub fn has_exited(&self) -> bool {
        self.exited_flag.load(Ordering::Acquire)
    }
}

impl Drop for TerminalProcessor {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

struct VtWorker<L: EventListener, F> {
    output_rx: Receiver<Vec<u8>>,
    term: SharedTerm<L>,
    exited: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    notify: F,
}

impl<L, F> VtWorker<L, F>
where
    L: EventListener,
    F: Fn(&BufferChange),
{
    /// Blocks on the output channel, batches all available data, parses it
    /// under a brief term lock, then publishes the change (throttled).
    fn run(self) {
        let mut processor: Processor = Processor::new();
        // Start in the past so the first batch of data always notifies
        let mut last_signal = Instant::now() - MIN_FRAME_INTERVAL;
        let mut batch_buffer = Vec::with_capacity(BATCH_BUFFER_CAPACITY);
        let mut pending: Option<BufferChange> = None;

        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let timeout = if pending.is_some() {
                MIN_FRAME_INTERVAL.saturating_sub(last_signal.elapsed())
            } else {
                IDLE_RECV_TIMEOUT
            };

            match self.output_rx.recv_timeout(timeout) {
                Ok(data) => {
                    // Batch: drain all pending data into a single buffer
                    batch_buffer.clear();
                    batch_buffer.extend_from_slice(&data);
                    while let Ok(more) = self.output_rx.try_recv() {
                        batch_buffer.extend_from_slice(&more);
                    }
                    pending = Some(self.apply(&mut processor, &batch_buffer));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Reader thread dropped the sender: stream ended
                    self.exited.store(true, Ordering::Release);
                }
            }

            if let Some(change) = pending {
                if last_signal.elapsed() >= MIN_FRAME_INTERVAL {
                    (self.notify)(&change);
                    last_signal = Instant::now();
                    pending = None;
                }
            }

            if self.exited.load(Ordering::Acquire) {
                // The reader sends its last chunk before raising the flag
                batch_buffer.clear();
                while let Ok(more) = self.output_rx.try_recv() {
                    batch_buffer.extend_from_slice(&more);
                }
                if !batch_buffer.is_empty() {
                    pending = Some(self.apply(&mut processor, &batch_buffer));
                }
                if let Some(change) = pending.take() {
                    (self.notify)(&change);
                }
                tracing::debug!("VT processor stopping, stream ended");
                break;
            }
        }
    }

    fn apply(&self, processor: &mut Processor, bytes: &[u8]) -> BufferChange {
        let mut term = self.term.lock();
        processor.advance(&mut *term, bytes);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        BufferChange {
            generation,
            history_line_count: term.grid().history_size(),
            alternate_screen: term.mode().contains(TermMode::ALT_SCREEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TermSize;
    use alacritty_terminal::event::Event;
    use alacritty_terminal::index::{Column, Line};
    use alacritty_terminal::term::{Config, Term};
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Clone)]
    struct TestListener;
    impl EventListener for TestListener {
        fn send_event(&self, _event: Event) {}
    }

    fn test_term(history: usize) -> SharedTerm<TestListener> {
        let config = Config {
            scrolling_history: history,
            ..Default::default()
        };
        Arc::new(Mutex::new(Term::new(config, &TermSize::new(20, 3), TestListener)))
    }

    fn wait_for(rx: &mpsc::Receiver<BufferChange>, pred: impl Fn(&BufferChange) -> bool) -> BufferChange {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(change) if pred(&change) => return change,
                Ok(_) => continue,
                Err(_) => panic!("timed out waiting for buffer change"),
            }
        }
    }

    #[test]
    fn vt_processor_processes_data_and_notifies() {
        let (output_tx, output_rx) = mpsc::sync_channel(64);
        let (change_tx, change_rx) = mpsc::channel();
        let term = test_term(0);
        let exited = Arc::new(AtomicBool::new(false));

        let vt = TerminalProcessor::start(output_rx, term.clone(), exited, move |change| {
            let _ = change_tx.send(*change);
        })
        .unwrap();

        output_tx.send(b"hello world".to_vec()).unwrap();
        let change = wait_for(&change_rx, |_| true);
        assert!(change.generation >= 1);
        assert!(!change.alternate_screen);

        let term_guard = term.lock();
        assert_eq!(term_guard.grid()[Line(0)][Column(0)].c, 'h');
        drop(term_guard);
        drop(vt);
    }

    #[test]
    fn last_batch_is_always_announced() {
        let (output_tx, output_rx) = mpsc::sync_channel(64);
        let (change_tx, change_rx) = mpsc::channel();
        let term = test_term(100);
        let exited = Arc::new(AtomicBool::new(false));

        let vt = TerminalProcessor::start(output_rx, term, exited, move |change| {
            let _ = change_tx.send(*change);
        })
        .unwrap();

        for i in 0..10 {
            output_tx.send(format!("line {i}\r\n").into_bytes()).unwrap();
        }
        // 11 lines on a 3 line screen: 8 in history once everything is applied
        let change = wait_for(&change_rx, |c| c.history_line_count == 8);
        assert_eq!(change.generation, vt.generation());
    }

    #[test]
    fn output_queued_before_stream_end_is_applied() {
        let (output_tx, output_rx) = mpsc::sync_channel(64);
        let (change_tx, change_rx) = mpsc::channel();
        let term = test_term(0);
        let exited = Arc::new(AtomicBool::new(false));

        let _vt = TerminalProcessor::start(output_rx, term.clone(), exited.clone(), move |change| {
            let _ = change_tx.send(*change);
        })
        .unwrap();

        // Park the worker inside `apply` so the last chunk lands behind the exit flag
        let held = term.lock();
        output_tx.send(b"A".to_vec()).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        output_tx.send(b"B".to_vec()).unwrap();
        exited.store(true, Ordering::SeqCst);
        drop(output_tx);
        drop(held);

        // The notify closure is dropped with the worker once it has stopped
        loop {
            match change_rx.recv_timeout(Duration::from_secs(2)) {
                Ok(_) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => panic!("VT thread did not stop"),
            }
        }
        let term_guard = term.lock();
        assert_eq!(term_guard.grid()[Line(0)][Column(0)].c, 'A');
        assert_eq!(term_guard.grid()[Line(0)][Column(1)].c, 'B');
    }

    #[test]
    fn alternate_screen_switch_is_reported() {
        let (output_tx, output_rx) = mpsc::sync_channel(64);
        let (change_tx, change_rx) = mpsc::channel();
        let exited = Arc::new(AtomicBool::new(false));

        let _vt = TerminalProcessor::start(output_rx, test_term(0), exited, move |change| {
            let _ = change_tx.send(*change);
        })
        .unwrap();

        output_tx.send(b"\x1b[?1049h".to_vec()).unwrap();
        wait_for(&change_rx, |c| c.alternate_screen);
    }

    #[test]
    fn vt_processor_stops_when_stream_ends() {
        let (output_tx, output_rx) = mpsc::sync_channel::<Vec<u8>>(64);
        let exited = Arc::new(AtomicBool::new(false));

        let vt = TerminalProcessor::start(output_rx, test_term(0), exited, |_| {}).unwrap();
        drop(output_tx);

        let deadline = Instant::now() + Duration::from_secs(2);
        while !vt.has_exited() {
            assert!(Instant::now() < deadline, "exit flag never set");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn vt_processor_stops_on_shutdown() {
        let (_output_tx, output_rx) = mpsc::sync_channel::<Vec<u8>>(64);
        let exited = Arc::new(AtomicBool::new(false));

        let vt = TerminalProcessor::start(output_rx, test_term(0), exited, |_| {}).unwrap();
        drop(vt);
    }
}
