//! Headless terminal pane.
//!
//! Glue between a [`TerminalSession`] and whatever draws and feeds input:
//! - Buffer change notifications are re-dispatched onto the presentation
//!   thread through a [`PresentationContext`]
//! - `render` projects the live buffer through the current scroll offset
//! - Key and input-method events are encoded and written to the session

use std::sync::Arc;

use anyhow::Result;
use settings::Config;
use terminal::{BufferChange, ListenerId, TermSize, TerminalSession, TtyConnector};
use theme::{palette_for, Palette};

use crate::ime::{EditorAction, ImeReconciler, ImeResponse, Outgoing};
use crate::keys::{KeyEvent, TermwizKeyEncoder};
use crate::presentation::PresentationContext;
use crate::scroll::ScrollState;
use crate::snapshot::{build_snapshot, RenderError, RenderSnapshot};

/// Presentation-thread state of a pane.
pub struct ViewState {
    pub scroll: ScrollState,
    pub ime: ImeReconciler,
    snapshot: Option<Arc<RenderSnapshot>>,
    last_change: Option<BufferChange>,
    dirty: bool,
}

impl ViewState {
    fn new(config: &Config) -> Self {
        Self {
            scroll: ScrollState::new().with_reverse(config.scroll_reverse),
            ime: ImeReconciler::new(config.composition),
            snapshot: None,
            last_change: None,
            dirty: true,
        }
    }

    fn on_buffer_changed(&mut self, change: &BufferChange) {
        self.scroll.on_buffer_mode_changed(change.alternate_screen);
        self.scroll.on_history_length_changed(change.history_line_count);
        self.last_change = Some(*change);
        self.dirty = true;
    }

    /// Newest change notification applied so far.
    pub fn last_change(&self) -> Option<&BufferChange> {
        self.last_change.as_ref()
    }
}

pub struct TerminalPane {
    session: Arc<TerminalSession>,
    context: PresentationContext<ViewState>,
    palette: Palette,
    config: Config,
    listener: ListenerId,
}

impl TerminalPane {
    /// Create an idle pane owned by the calling thread.
    pub fn new(config: Config) -> Self {
        let session = Arc::new(TerminalSession::new(&config));
        let context = PresentationContext::new(ViewState::new(&config));

        let handle = context.handle();
        let listener = session.add_listener(move |change: &BufferChange| {
            let change = *change;
            handle.run(move |state: &mut ViewState| state.on_buffer_changed(&change));
        });

        Self {
            palette: palette_for(&config),
            session,
            context,
            config,
            listener,
        }
    }

    pub fn session(&self) -> &Arc<TerminalSession> {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn start(&self, connector: Box<dyn TtyConnector>) -> Result<()> {
        self.session.start(connector)
    }

    pub fn stop(&self) {
        self.session.stop();
        self.context.with(|state| state.ime.reset());
    }

    pub fn has_exited(&self) -> bool {
        self.session.has_exited()
    }

    /// Called from a worker thread whenever new work is queued for the pane.
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.context.set_waker(waker);
    }

    /// Apply queued change notifications. Returns how many ran.
    pub fn pump(&self) -> usize {
        self.context.run_pending()
    }

    pub fn needs_render(&self) -> bool {
        self.context.has_pending() || self.context.with(|state| state.dirty)
    }

    /// Borrow the presentation state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut ViewState) -> R) -> R {
        self.context.with(f)
    }

    /// Build a fresh snapshot of the visible grid.
    ///
    /// If the build fails the previous snapshot is returned so the screen
    /// keeps its last good frame.
    pub fn render(&self) -> Result<Arc<RenderSnapshot>, RenderError> {
        self.pump();
        let size = self.session.size();
        let origin = self.context.with(|state| state.scroll.scroll_origin());

        let built = build_snapshot(
            self.session.buffer(),
            self.session.style_state().as_ref(),
            usize::from(size.cols),
            usize::from(size.rows),
            origin,
            &self.palette,
        );

        self.context.with(|state| match built {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                state.snapshot = Some(snapshot.clone());
                state.dirty = false;
                Ok(snapshot)
            }
            Err(e) => match &state.snapshot {
                Some(previous) => {
                    tracing::warn!("Snapshot build failed, keeping previous frame: {}", e);
                    Ok(previous.clone())
                }
                None => Err(e),
            },
        })
    }

    pub fn scroll_origin(&self) -> i32 {
        self.context.with(|state| state.scroll.scroll_origin())
    }

    /// Vertical drag in pixels. Returns `true` if the view moved.
    pub fn on_drag(&self, delta_px: f32, line_height_px: f32) -> bool {
        self.mutate_scroll(|scroll| scroll.on_drag(delta_px, line_height_px))
    }

    /// Positive `lines` scrolls toward older history.
    pub fn scroll_lines(&self, lines: i32) -> bool {
        self.mutate_scroll(|scroll| scroll.scroll_lines(lines))
    }

    pub fn scroll_to_bottom(&self) {
        self.mutate_scroll(|scroll| {
            let moved = !scroll.is_at_bottom();
            scroll.scroll_to_bottom();
            moved
        });
    }

    fn mutate_scroll(&self, f: impl FnOnce(&mut ScrollState) -> bool) -> bool {
        self.context.with(|state| {
            let moved = f(&mut state.scroll);
            state.dirty |= moved;
            moved
        })
    }

    /// Hardware or soft-keyboard key event. Returns whether it was handled.
    pub fn on_key_event(&self, event: &KeyEvent, unicode_char: Option<char>) -> bool {
        let keys = self.key_encoder();
        let response = self
            .context
            .with(|state| state.ime.on_raw_key_event(event, unicode_char, &keys));
        self.dispatch(response)
    }

    pub fn on_composing_text_changed(&self, text: &str) -> bool {
        let response = self
            .context
            .with(|state| state.ime.on_composing_text_changed(text));
        self.dispatch(response)
    }

    pub fn on_commit_text(&self, text: &str) -> bool {
        let response = self.context.with(|state| state.ime.on_commit_text(text));
        self.dispatch(response)
    }

    pub fn on_finish_composing(&self) -> bool {
        let response = self.context.with(|state| state.ime.on_finish_composing());
        self.dispatch(response)
    }

    pub fn on_delete_surrounding(&self, before: usize, after: usize) -> bool {
        let keys = self.key_encoder();
        let response = self
            .context
            .with(|state| state.ime.on_delete_surrounding(before, after, &keys));
        self.dispatch(response)
    }

    pub fn on_editor_action(&self, action: EditorAction) -> bool {
        let response = self.context.with(|state| state.ime.on_editor_action(action));
        self.dispatch(response)
    }

    /// Write text as-is (paste).
    pub fn send_text(&self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Resize to fit a pixel area. The grid never shrinks below 5×2.
    pub fn resize_pixels(
        &self,
        width_px: f32,
        height_px: f32,
        cell_width_px: f32,
        cell_height_px: f32,
    ) -> TermSize {
        let current = self.session.size();
        if !(cell_width_px > 0.0 && cell_height_px > 0.0) {
            tracing::debug!(cell_width_px, cell_height_px, "Ignoring resize with bad cell size");
            return current;
        }
        let size =
            TermSize::new(cells_in(width_px, cell_width_px), cells_in(height_px, cell_height_px))
                .clamped();
        if size != current {
            if let Err(e) = self.session.resize(size) {
                tracing::warn!("Resize failed: {:#}", e);
            }
            self.context.with(|state| state.dirty = true);
        }
        size
    }

    /// Apply a reloaded configuration. Grid size is left alone.
    pub fn apply_config(&mut self, config: Config) {
        self.palette = palette_for(&config);
        let style = self.session.style_state();
        style.set_foreground(Some(terminal::TermColor::Indexed(config.default_foreground)));
        style.set_background(Some(terminal::TermColor::Indexed(config.default_background)));
        self.context.with(|state| {
            state.ime.set_mode(config.composition);
            state.scroll.set_reverse(config.scroll_reverse);
            state.dirty = true;
        });
        tracing::info!(theme = %config.theme, "Configuration applied");
        self.config = config;
    }

    fn key_encoder(&self) -> TermwizKeyEncoder {
        TermwizKeyEncoder::new(self.session.application_cursor())
    }

    fn dispatch(&self, response: ImeResponse) -> bool {
        if response.sends.is_empty() {
            return response.handled;
        }
        self.scroll_to_bottom();
        for outgoing in &response.sends {
            match outgoing {
                Outgoing::Text(text) => {
                    tracing::trace!(text = util::preview(text, 16), "Sending text");
                    self.write(text.as_bytes());
                }
                Outgoing::Bytes(bytes) => self.write(bytes),
            }
        }
        response.handled
    }

    fn write(&self, data: &[u8]) {
        if let Err(e) = self.session.send_bytes(data) {
            tracing::warn!(
                error = %e,
                input_len = data.len(),
                "Input write failed, connector likely closed"
            );
        }
    }
}

impl Drop for TerminalPane {
    fn drop(&mut self) {
        self.session.remove_listener(self.listener);
        self.session.stop();
    }
}

fn cells_in(extent_px: f32, cell_px: f32) -> u16 {
    let cells = (extent_px / cell_px).floor();
    if cells.is_finite() && cells > 0.0 {
        cells.min(f32::from(u16::MAX)) as u16
    } else {
        0
    }
}
