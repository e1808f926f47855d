//! Centralized configuration constants for termbridge.
//!
//! Compile-time limits and defaults, organized by component.

/// Terminal grid configuration.
pub mod terminal {
    /// Default grid width in columns.
    pub const DEFAULT_COLUMNS: u16 = 80;
    /// Default grid height in rows.
    pub const DEFAULT_ROWS: u16 = 24;
    /// Smallest grid a view may request; layout results below this are clamped.
    pub const MIN_COLUMNS: u16 = 5;
    /// Smallest grid height a view may request.
    pub const MIN_ROWS: u16 = 2;
    /// Palette index used for the default foreground.
    pub const DEFAULT_FOREGROUND_INDEX: u8 = 15;
    /// Palette index used for the default background.
    pub const DEFAULT_BACKGROUND_INDEX: u8 = 0;
}

/// Scrollback buffer configuration.
pub mod scrollback {
    /// Default scrollback buffer size in lines.
    pub const DEFAULT_LINES: usize = 10_000;
    /// Maximum allowed scrollback buffer size in lines.
    pub const MAX_LINES: usize = 100_000;
}

/// Timing configuration.
pub mod timing {
    use std::time::Duration;

    /// Minimum interval between change notifications from the VT thread.
    pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(4);
    /// Blocking receive timeout while the connector is idle.
    pub const IDLE_RECV_TIMEOUT: Duration = Duration::from_millis(100);
    /// Longest the snapshot builder waits for the buffer lock.
    pub const LOCK_TIMEOUT: Duration = Duration::from_millis(250);
    /// Debounce window for config file change events.
    pub const CONFIG_DEBOUNCE: Duration = Duration::from_millis(100);
}

/// Settings file validation limits.
pub mod settings {
    /// Maximum settings file size in bytes (64 KB).
    pub const MAX_FILE_SIZE: u64 = 64 * 1024;

    /// Maximum length for string fields (theme name, palette entries).
    pub const MAX_STRING_LENGTH: usize = 256;
}
