//! Terminal session: connector + engine + VT thread + change listeners.

use crate::alacritty::{AlacrittyBuffer, SharedTerm};
use crate::buffer::DefaultStyle;
use crate::connector::TtyConnector;
use crate::types::{BufferChange, TermSize};
use crate::vt_processor::TerminalProcessor;
use alacritty_terminal::event::{Event, EventListener, WindowSize};
use alacritty_terminal::term::{Config as TermConfig, Term, TermMode};
use alacritty_terminal::vte::ansi::Rgb;
use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

type SharedConnector = Arc<Mutex<Option<Box<dyn TtyConnector>>>>;
type ChangeCallback = Arc<dyn Fn(&BufferChange) + Send + Sync>;

/// Handle returned by [`TerminalSession::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    entries: RwLock<SmallVec<[(ListenerId, ChangeCallback); 2]>>,
}

impl ListenerRegistry {
    fn add(&self, callback: ChangeCallback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, callback));
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn notify(&self, change: &BufferChange) {
        // Call outside the lock so a listener may add or remove listeners
        let callbacks: SmallVec<[ChangeCallback; 2]> = self
            .entries
            .read()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback(change);
        }
    }
}

/// Receives engine events and answers terminal queries through the connector.
#[derive(Clone)]
pub struct EventProxy {
    connector: SharedConnector,
    size: Arc<Mutex<TermSize>>,
}

impl EventProxy {
    fn write_back(&self, data: &[u8]) {
        let mut guard = self.connector.lock();
        if let Some(connector) = guard.as_mut() {
            if let Err(e) = connector.write(data) {
                tracing::warn!(error = %e, "Connector write-back failed");
            }
        }
    }
}

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        match event {
            Event::PtyWrite(text) => self.write_back(text.as_bytes()),
            Event::ColorRequest(_index, formatter) => {
                // Report a dark background for OSC 10/11/12 queries
                let response = formatter(Rgb { r: 0, g: 0, b: 0 });
                self.write_back(response.as_bytes());
            }
            Event::TextAreaSizeRequest(formatter) => {
                let size = *self.size.lock();
                let response = formatter(WindowSize {
                    num_lines: size.rows,
                    num_cols: size.cols,
                    cell_width: 8,
                    cell_height: 16,
                });
                self.write_back(response.as_bytes());
            }
            _ => {}
        }
    }
}

/// One terminal session.
///
/// Created idle; [`start`](Self::start) attaches a connector and spins up the
/// reader and VT threads. All methods take `&self` and are safe to call from
/// the presentation thread.
pub struct TerminalSession {
    id: Uuid,
    term: SharedTerm<EventProxy>,
    buffer: AlacrittyBuffer<EventProxy>,
    style: Arc<DefaultStyle>,
    connector: SharedConnector,
    size: Arc<Mutex<TermSize>>,
    listeners: Arc<ListenerRegistry>,
    processor: Mutex<Option<TerminalProcessor>>,
    exited: Arc<AtomicBool>,
}

impl TerminalSession {
    pub fn new(config: &settings::Config) -> Self {
        let (cols, rows) = config.grid_size();
        let size = Arc::new(Mutex::new(TermSize::new(cols, rows)));
        let connector: SharedConnector = Arc::new(Mutex::new(None));

        let proxy = EventProxy {
            connector: connector.clone(),
            size: size.clone(),
        };
        let term_config = TermConfig {
            scrolling_history: config.effective_scrollback_lines(),
            ..Default::default()
        };
        let term = Term::new(term_config, &TermSize::new(cols, rows), proxy);
        let term = Arc::new(Mutex::new(term));

        Self {
            id: Uuid::new_v4(),
            buffer: AlacrittyBuffer::new(term.clone()),
            term,
            style: Arc::new(DefaultStyle::from_config(config)),
            connector,
            size,
            listeners: Arc::new(ListenerRegistry::default()),
            processor: Mutex::new(None),
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Attach a connector and start processing its output.
    ///
    /// A second call while running is ignored.
    pub fn start(&self, mut connector: Box<dyn TtyConnector>) -> Result<()> {
        let mut processor_slot = self.processor.lock();
        if processor_slot.is_some() {
            tracing::warn!(session = %self.id, "Session already started, ignoring");
            return Ok(());
        }

        let reader = connector
            .take_reader()
            .context("Failed to get connector reader")?;
        connector
            .resize(*self.size.lock())
            .context("Failed to size connector")?;
        let name = connector.name().to_string();

        self.exited.store(false, Ordering::Release);
        let (output_tx, output_rx): (Sender<Vec<u8>>, Receiver<Vec<u8>>) = mpsc::channel();
        spawn_reader(reader, output_tx, self.exited.clone())?;

        *self.connector.lock() = Some(connector);

        let listeners = self.listeners.clone();
        let processor = TerminalProcessor::start(
            output_rx,
            self.term.clone(),
            self.exited.clone(),
            move |change| listeners.notify(change),
        )?;
        *processor_slot = Some(processor);

        tracing::info!(session = %self.id, connector = %name, "Session started");
        Ok(())
    }

    /// Close the connector and stop the VT thread.
    pub fn stop(&self) {
        if let Some(mut connector) = self.connector.lock().take() {
            connector.close();
        }
        if self.processor.lock().take().is_some() {
            tracing::info!(session = %self.id, "Session stopped");
        }
        self.exited.store(true, Ordering::Release);
    }

    pub fn send_bytes(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let mut guard = self.connector.lock();
        match guard.as_mut() {
            Some(connector) => connector.write(data).context("Failed to write to connector"),
            None => {
                tracing::debug!(len = data.len(), "Dropping input, no connector attached");
                Ok(())
            }
        }
    }

    pub fn send_text(&self, text: &str) -> Result<()> {
        self.send_bytes(text.as_bytes())
    }

    /// Resize the grid and the connector. Sizes below the minimum are raised.
    pub fn resize(&self, size: TermSize) -> Result<()> {
        let size = size.clamped();
        {
            let mut current = self.size.lock();
            if *current == size {
                return Ok(());
            }
            *current = size;
        }
        self.term.lock().resize(size);
        if let Some(connector) = self.connector.lock().as_mut() {
            connector
                .resize(size)
                .context("Failed to resize connector")?;
        }
        tracing::debug!(cols = size.cols, rows = size.rows, "Session resized");
        Ok(())
    }

    pub fn size(&self) -> TermSize {
        *self.size.lock()
    }

    /// Register a change listener. It runs on the VT thread.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&BufferChange) + Send + Sync + 'static,
    {
        self.listeners.add(Arc::new(listener))
    }

    /// Returns `false` if the id was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn buffer(&self) -> &AlacrittyBuffer<EventProxy> {
        &self.buffer
    }

    pub fn style_state(&self) -> &Arc<DefaultStyle> {
        &self.style
    }

    /// Whether the program switched cursor keys to application mode (DECCKM).
    pub fn application_cursor(&self) -> bool {
        self.term.lock().mode().contains(TermMode::APP_CURSOR)
    }

    /// Number of output batches applied so far.
    pub fn generation(&self) -> u64 {
        self.processor
            .lock()
            .as_ref()
            .map_or(0, TerminalProcessor::generation)
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_reader(
    mut reader: Box<dyn Read + Send>,
    output_tx: Sender<Vec<u8>>,
    exited: Arc<AtomicBool>,
) -> Result<()> {
    thread::Builder::new()
        .name("termbridge-connector-reader".into())
        .spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        exited.store(true, Ordering::SeqCst);
                        break;
                    }
                    Ok(n) => {
                        if output_tx.send(buf[..n].to_vec()).is_err() {
                            break; // VT thread gone
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!("Connector read failed: {}", e);
                        exited.store(true, Ordering::SeqCst);
                        break;
                    }
                }
            }
        })
        .context("Failed to spawn connector reader thread")?;
    Ok(())
}
