//! Physical key → terminal byte encoding.
//!
//! Key codes follow the Android `KeyEvent` numbering used by soft and hardware
//! keyboards on the platform. Fixed single-byte keys are encoded here;
//! navigation and function keys are handed to the engine's modifier-aware
//! encoder as [`LogicalKey`]s.

use bitflags::bitflags;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use termwiz::input::{
    KeyCode as TermwizKey, KeyCodeEncodeModes, KeyboardEncoding, Modifiers as TermwizMods,
};

/// Bytes produced by one key press.
pub type KeyBytes = SmallVec<[u8; 16]>;

/// Platform key code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const BACK: KeyCode = KeyCode(4);
    pub const DPAD_UP: KeyCode = KeyCode(19);
    pub const DPAD_DOWN: KeyCode = KeyCode(20);
    pub const DPAD_LEFT: KeyCode = KeyCode(21);
    pub const DPAD_RIGHT: KeyCode = KeyCode(22);
    pub const A: KeyCode = KeyCode(29);
    pub const C: KeyCode = KeyCode(31);
    pub const D: KeyCode = KeyCode(32);
    pub const Z: KeyCode = KeyCode(54);
    pub const TAB: KeyCode = KeyCode(61);
    pub const SPACE: KeyCode = KeyCode(62);
    pub const ENTER: KeyCode = KeyCode(66);
    pub const DEL: KeyCode = KeyCode(67);
    pub const PAGE_UP: KeyCode = KeyCode(92);
    pub const PAGE_DOWN: KeyCode = KeyCode(93);
    pub const ESCAPE: KeyCode = KeyCode(111);
    pub const FORWARD_DEL: KeyCode = KeyCode(112);
    pub const MOVE_HOME: KeyCode = KeyCode(122);
    pub const MOVE_END: KeyCode = KeyCode(123);
    pub const INSERT: KeyCode = KeyCode(124);
    pub const F1: KeyCode = KeyCode(131);
    pub const F12: KeyCode = KeyCode(142);
    pub const NUMPAD_ENTER: KeyCode = KeyCode(160);

    /// Letter key for `c` (case-insensitive), if `c` is A-Z.
    pub fn letter(c: char) -> Option<KeyCode> {
        let upper = c.to_ascii_uppercase();
        upper
            .is_ascii_uppercase()
            .then(|| KeyCode(Self::A.0 + (upper as u16 - 'A' as u16)))
    }

    /// 0 for A through 25 for Z.
    pub fn letter_index(self) -> Option<u8> {
        (Self::A.0..=Self::Z.0)
            .contains(&self.0)
            .then(|| (self.0 - Self::A.0) as u8)
    }

    /// Function key for `n` in 1..=12.
    pub fn function(n: u8) -> Option<KeyCode> {
        (1..=12)
            .contains(&n)
            .then(|| KeyCode(Self::F1.0 + u16::from(n) - 1))
    }

    fn is_enter(self) -> bool {
        self == Self::ENTER || self == Self::NUMPAD_ENTER
    }
}

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT = 1 << 1;
        const CTRL = 1 << 2;
        const META = 1 << 3;
    }
}

/// One physical key transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
    pub is_down: bool,
}

impl KeyEvent {
    pub fn down(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code,
            modifiers,
            is_down: true,
        }
    }

    pub fn up(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            code,
            modifiers,
            is_down: false,
        }
    }
}

/// Keys whose byte sequence depends on modifiers and terminal modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogicalKey {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Backspace,
    Function(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyBinding {
    Bytes(&'static [u8]),
    Logical(LogicalKey),
}

static KEY_BINDINGS: Lazy<FxHashMap<KeyCode, KeyBinding>> = Lazy::new(|| {
    let mut table = FxHashMap::default();
    table.insert(KeyCode::ESCAPE, KeyBinding::Bytes(b"\x1b"));
    table.insert(KeyCode::BACK, KeyBinding::Bytes(b"\x1b"));
    table.insert(KeyCode::TAB, KeyBinding::Bytes(b"\t"));
    table.insert(KeyCode::DPAD_UP, KeyBinding::Logical(LogicalKey::Up));
    table.insert(KeyCode::DPAD_DOWN, KeyBinding::Logical(LogicalKey::Down));
    table.insert(KeyCode::DPAD_LEFT, KeyBinding::Logical(LogicalKey::Left));
    table.insert(KeyCode::DPAD_RIGHT, KeyBinding::Logical(LogicalKey::Right));
    table.insert(KeyCode::MOVE_HOME, KeyBinding::Logical(LogicalKey::Home));
    table.insert(KeyCode::MOVE_END, KeyBinding::Logical(LogicalKey::End));
    table.insert(KeyCode::PAGE_UP, KeyBinding::Logical(LogicalKey::PageUp));
    table.insert(KeyCode::PAGE_DOWN, KeyBinding::Logical(LogicalKey::PageDown));
    table.insert(KeyCode::INSERT, KeyBinding::Logical(LogicalKey::Insert));
    table.insert(KeyCode::FORWARD_DEL, KeyBinding::Logical(LogicalKey::Delete));
    table.insert(KeyCode::DEL, KeyBinding::Logical(LogicalKey::Backspace));
    for n in 1..=12u8 {
        if let Some(code) = KeyCode::function(n) {
            table.insert(code, KeyBinding::Logical(LogicalKey::Function(n)));
        }
    }
    table
});

/// Table entry for a key code, if any.
pub fn binding_for(code: KeyCode) -> Option<KeyBinding> {
    KEY_BINDINGS.get(&code).copied()
}

/// Encodes logical keys. Implemented by the terminal engine side.
pub trait LogicalKeyEncoder {
    fn encode(&self, key: LogicalKey, modifiers: Modifiers) -> Option<KeyBytes>;
}

/// xterm-style encoding through termwiz.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TermwizKeyEncoder {
    /// DECCKM: cursor keys send SS3 instead of CSI.
    pub application_cursor: bool,
}

impl TermwizKeyEncoder {
    pub fn new(application_cursor: bool) -> Self {
        Self { application_cursor }
    }
}

impl LogicalKeyEncoder for TermwizKeyEncoder {
    fn encode(&self, key: LogicalKey, modifiers: Modifiers) -> Option<KeyBytes> {
        let modes = KeyCodeEncodeModes {
            encoding: KeyboardEncoding::Xterm,
            application_cursor_keys: self.application_cursor,
            newline_mode: false,
            modify_other_keys: None,
        };
        match termwiz_key(key).encode(termwiz_mods(modifiers), modes, true) {
            Ok(seq) if !seq.is_empty() => Some(SmallVec::from_slice(seq.as_bytes())),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(?key, "Key encoder failed: {}", e);
                None
            }
        }
    }
}

fn termwiz_key(key: LogicalKey) -> TermwizKey {
    match key {
        LogicalKey::Up => TermwizKey::UpArrow,
        LogicalKey::Down => TermwizKey::DownArrow,
        LogicalKey::Left => TermwizKey::LeftArrow,
        LogicalKey::Right => TermwizKey::RightArrow,
        LogicalKey::Home => TermwizKey::Home,
        LogicalKey::End => TermwizKey::End,
        LogicalKey::PageUp => TermwizKey::PageUp,
        LogicalKey::PageDown => TermwizKey::PageDown,
        LogicalKey::Insert => TermwizKey::Insert,
        LogicalKey::Delete => TermwizKey::Delete,
        LogicalKey::Backspace => TermwizKey::Backspace,
        LogicalKey::Function(n) => TermwizKey::Function(n),
    }
}

fn termwiz_mods(modifiers: Modifiers) -> TermwizMods {
    let mut tm = TermwizMods::NONE;
    if modifiers.contains(Modifiers::SHIFT) {
        tm |= TermwizMods::SHIFT;
    }
    if modifiers.contains(Modifiers::ALT) {
        tm |= TermwizMods::ALT;
    }
    if modifiers.contains(Modifiers::CTRL) {
        tm |= TermwizMods::CTRL;
    }
    if modifiers.contains(Modifiers::META) {
        tm |= TermwizMods::SUPER;
    }
    tm
}

/// Outcome of encoding one key event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyEncoding {
    /// Send these bytes.
    Bytes(KeyBytes),
    /// Nothing to send, but the event must not reach default handling.
    Consumed,
    /// Not a terminal key; let the platform handle it.
    Unhandled,
}

/// Encode a physical key event.
pub fn encode_key(event: &KeyEvent, logical: &dyn LogicalKeyEncoder) -> KeyEncoding {
    if !event.is_down {
        return KeyEncoding::Consumed;
    }

    if event.code.is_enter() {
        return KeyEncoding::Bytes(SmallVec::from_slice(b"\r"));
    }

    if event.modifiers.contains(Modifiers::CTRL) {
        if let Some(index) = event.code.letter_index() {
            return KeyEncoding::Bytes(SmallVec::from_slice(&[index + 1]));
        }
    }

    match binding_for(event.code) {
        Some(KeyBinding::Bytes(bytes)) => KeyEncoding::Bytes(SmallVec::from_slice(bytes)),
        Some(KeyBinding::Logical(key)) => match logical.encode(key, event.modifiers) {
            Some(bytes) => KeyEncoding::Bytes(bytes),
            None => KeyEncoding::Unhandled,
        },
        None => KeyEncoding::Unhandled,
    }
}
