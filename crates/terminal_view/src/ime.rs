//! Soft-keyboard composition reconciler.
//!
//! Input methods deliver text as composing updates followed by a commit or a
//! finish, interleaved with delete-surrounding requests and raw key events.
//! The reconciler turns that stream into terminal sends so the remote side
//! sees plain typing: every committed character exactly once, no pre-edit
//! candidates, single-CR line endings.

use std::ops::Range;

use settings::CompositionMode;
use smallvec::SmallVec;

use crate::keys::{
    encode_key, KeyBytes, KeyEncoding, KeyEvent, LogicalKey, LogicalKeyEncoder, Modifiers,
};

/// Something to write to the terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Bytes(KeyBytes),
}

/// Result of one input-method event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImeResponse {
    /// The event was consumed and must not reach default handling.
    pub handled: bool,
    pub sends: Vec<Outgoing>,
}

impl ImeResponse {
    fn handled() -> Self {
        Self {
            handled: true,
            sends: Vec::new(),
        }
    }

    fn unhandled() -> Self {
        Self::default()
    }

    fn send(outgoing: Outgoing) -> Self {
        Self {
            handled: true,
            sends: vec![outgoing],
        }
    }
}

/// Editor action reported by the input method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorAction {
    Done,
    Go,
    Send,
    Other(i32),
}

impl EditorAction {
    /// Map a platform `IME_ACTION_*` code.
    pub fn from_code(code: i32) -> Self {
        match code {
            2 => EditorAction::Go,
            4 => EditorAction::Send,
            6 => EditorAction::Done,
            other => EditorAction::Other(other),
        }
    }

    fn is_enter(self) -> bool {
        matches!(self, EditorAction::Done | EditorAction::Go | EditorAction::Send)
    }
}

/// `\r\n` and `\n` become `\r`.
pub fn normalize_newlines(text: &str) -> String {
    if !text.contains('\n') {
        return text.to_owned();
    }
    text.replace("\r\n", "\r").replace('\n', "\r")
}

/// Text the input method has written but the terminal has not yet received.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Accumulator {
    text: String,
    /// Byte range of the composing span inside `text`.
    composing: Option<Range<usize>>,
}

impl Accumulator {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_composing_text(&self) -> bool {
        self.composing.as_ref().is_some_and(|span| !span.is_empty())
    }

    /// Replace the composing span (or append at the cursor) and mark the
    /// new text as composing.
    fn set_composing(&mut self, text: &str) {
        let start = self.replace_composing(text);
        self.composing = Some(start..start + text.len());
    }

    /// Replace the composing span (or append) with final text.
    fn commit(&mut self, text: &str) {
        self.replace_composing(text);
        self.composing = None;
    }

    fn finish(&mut self) {
        self.composing = None;
    }

    fn replace_composing(&mut self, text: &str) -> usize {
        match self.composing.take() {
            Some(span) => {
                self.text.replace_range(span.clone(), text);
                span.start
            }
            None => {
                let start = self.text.len();
                self.text.push_str(text);
                start
            }
        }
    }

    /// Delete up to `count` characters before the cursor, which sits at the
    /// end of the text. Returns how many were deleted.
    fn delete_before(&mut self, count: usize) -> usize {
        let mut deleted = 0;
        while deleted < count && self.text.pop().is_some() {
            deleted += 1;
        }
        if let Some(span) = &mut self.composing {
            let len = self.text.len();
            span.end = span.end.min(len);
            span.start = span.start.min(span.end);
        }
        deleted
    }

    fn take(&mut self) -> String {
        self.composing = None;
        std::mem::take(&mut self.text)
    }
}

/// Per-episode composition state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComposingSession {
    /// Only remember whether a composition is active. Text reaches the
    /// terminal on commit alone.
    FlagTracking { active: bool },
    /// Keep the input method's text locally; flush it on commit or finish.
    Buffered(Accumulator),
}

impl ComposingSession {
    pub fn new(mode: CompositionMode) -> Self {
        match mode {
            CompositionMode::Flag => ComposingSession::FlagTracking { active: false },
            CompositionMode::Buffered => ComposingSession::Buffered(Accumulator::default()),
        }
    }

    pub fn mode(&self) -> CompositionMode {
        match self {
            ComposingSession::FlagTracking { .. } => CompositionMode::Flag,
            ComposingSession::Buffered(_) => CompositionMode::Buffered,
        }
    }

    pub fn is_composing(&self) -> bool {
        match self {
            ComposingSession::FlagTracking { active } => *active,
            ComposingSession::Buffered(acc) => acc.has_composing_text(),
        }
    }
}

/// Reconciles input-method events into terminal sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImeReconciler {
    session: ComposingSession,
}

impl Default for ImeReconciler {
    fn default() -> Self {
        Self::new(CompositionMode::default())
    }
}

impl ImeReconciler {
    pub fn new(mode: CompositionMode) -> Self {
        Self {
            session: ComposingSession::new(mode),
        }
    }

    pub fn session(&self) -> &ComposingSession {
        &self.session
    }

    pub fn is_composing(&self) -> bool {
        self.session.is_composing()
    }

    /// Switch strategy. Pending composition is discarded.
    pub fn set_mode(&mut self, mode: CompositionMode) {
        if self.session.mode() != mode {
            tracing::debug!(?mode, "Composition strategy changed");
            self.session = ComposingSession::new(mode);
        }
    }

    /// Drop all composition state (input connection torn down).
    pub fn reset(&mut self) {
        self.session = ComposingSession::new(self.session.mode());
    }

    /// Pre-edit text changed. Never forwarded.
    pub fn on_composing_text_changed(&mut self, text: &str) -> ImeResponse {
        match &mut self.session {
            ComposingSession::FlagTracking { active } => *active = !text.is_empty(),
            ComposingSession::Buffered(acc) => acc.set_composing(text),
        }
        tracing::debug!(
            len = text.chars().count(),
            composing = self.is_composing(),
            "Composing text changed"
        );
        ImeResponse::handled()
    }

    pub fn on_commit_text(&mut self, text: &str) -> ImeResponse {
        tracing::debug!(len = text.chars().count(), "Commit text");
        let committed = match &mut self.session {
            ComposingSession::FlagTracking { active } => {
                *active = false;
                text.to_owned()
            }
            ComposingSession::Buffered(acc) => {
                acc.commit(text);
                acc.take()
            }
        };
        Self::text_response(&committed)
    }

    pub fn on_finish_composing(&mut self) -> ImeResponse {
        tracing::debug!("Finish composing");
        match &mut self.session {
            ComposingSession::FlagTracking { active } => {
                *active = false;
                ImeResponse::handled()
            }
            ComposingSession::Buffered(acc) => {
                acc.finish();
                let text = acc.take();
                Self::text_response(&text)
            }
        }
    }

    /// Delete `before` characters before and `after` characters after the
    /// cursor.
    pub fn on_delete_surrounding(
        &mut self,
        before: usize,
        after: usize,
        keys: &dyn LogicalKeyEncoder,
    ) -> ImeResponse {
        tracing::debug!(before, after, composing = self.is_composing(), "Delete surrounding");
        let (backspaces, deletes) = match &mut self.session {
            ComposingSession::FlagTracking { active: true } => return ImeResponse::handled(),
            ComposingSession::FlagTracking { active: false } => (before, after),
            ComposingSession::Buffered(acc) => {
                let absorbed = acc.delete_before(before);
                if acc.has_composing_text() {
                    return ImeResponse::handled();
                }
                acc.finish();
                (before - absorbed, after)
            }
        };

        let mut sends = Vec::with_capacity(backspaces + deletes);
        Self::push_keys(&mut sends, LogicalKey::Backspace, backspaces, keys);
        Self::push_keys(&mut sends, LogicalKey::Delete, deletes, keys);
        ImeResponse {
            handled: true,
            sends,
        }
    }

    pub fn on_editor_action(&mut self, action: EditorAction) -> ImeResponse {
        tracing::debug!(?action, "Editor action");
        if action.is_enter() {
            ImeResponse::send(Outgoing::Text("\r".to_owned()))
        } else {
            ImeResponse::unhandled()
        }
    }

    /// A key event delivered through the input method or a hardware keyboard.
    ///
    /// Terminal keys are encoded; otherwise a printable `unicode_char` on
    /// key-down is sent as committed text. Buffered text that has not been
    /// sent yet goes out ahead of the key.
    pub fn on_raw_key_event(
        &mut self,
        event: &KeyEvent,
        unicode_char: Option<char>,
        keys: &dyn LogicalKeyEncoder,
    ) -> ImeResponse {
        let mut response = Self::key_response(event, unicode_char, keys);
        if response.sends.is_empty() {
            return response;
        }
        if let ComposingSession::Buffered(acc) = &mut self.session {
            if !acc.is_empty() {
                let pending = acc.take();
                tracing::debug!(len = pending.chars().count(), "Flushing buffered text before key");
                response
                    .sends
                    .insert(0, Outgoing::Text(normalize_newlines(&pending)));
            }
        }
        response
    }

    fn key_response(
        event: &KeyEvent,
        unicode_char: Option<char>,
        keys: &dyn LogicalKeyEncoder,
    ) -> ImeResponse {
        match encode_key(event, keys) {
            KeyEncoding::Bytes(bytes) => ImeResponse::send(Outgoing::Bytes(bytes)),
            KeyEncoding::Consumed => ImeResponse::handled(),
            KeyEncoding::Unhandled => match unicode_char.filter(|c| !c.is_control()) {
                Some(c) => {
                    tracing::debug!(code = event.code.0, "Raw key sent as text");
                    let mut buf = [0u8; 4];
                    Self::text_response(c.encode_utf8(&mut buf))
                }
                None => ImeResponse::unhandled(),
            },
        }
    }

    fn text_response(text: &str) -> ImeResponse {
        if text.is_empty() {
            ImeResponse::handled()
        } else {
            ImeResponse::send(Outgoing::Text(normalize_newlines(text)))
        }
    }

    fn push_keys(
        sends: &mut Vec<Outgoing>,
        key: LogicalKey,
        count: usize,
        keys: &dyn LogicalKeyEncoder,
    ) {
        if count == 0 {
            return;
        }
        let Some(bytes) = keys.encode(key, Modifiers::empty()) else {
            tracing::debug!(?key, "No encoding for deletion key");
            return;
        };
        sends.extend((0..count).map(|_| Outgoing::Bytes(SmallVec::from_slice(&bytes))));
    }
}
