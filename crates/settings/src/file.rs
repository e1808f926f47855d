//! TOML config file support with live reload.
//!
//! Config location: `~/.config/termbridge/config.toml`

use crate::constants;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Which soft-keyboard composition strategy the input bridge uses.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CompositionMode {
    /// Accumulate composing and committed spans in an editable buffer and
    /// flush it on commit/finish. Robust for multi-step candidate input.
    #[default]
    Buffered,
    /// Only track whether a composition is active; forward commits verbatim.
    Flag,
}

/// User-facing config parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Built-in palette name ("xterm" or "windows").
    pub theme: String,
    /// Optional `#rrggbb` overrides for the 16 base ANSI colors, in index order.
    pub palette: Vec<String>,
    /// Maximum number of scrollback lines.
    pub scrollback_lines: usize,
    /// Initial grid width.
    pub columns: u16,
    /// Initial grid height.
    pub rows: u16,
    /// Palette index of the default foreground.
    pub default_foreground: u8,
    /// Palette index of the default background.
    pub default_background: u8,
    /// Soft-keyboard composition strategy.
    pub composition: CompositionMode,
    /// Reverse drag-to-scroll direction.
    pub scroll_reverse: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "xterm".to_string(),
            palette: Vec::new(),
            scrollback_lines: constants::scrollback::DEFAULT_LINES,
            columns: constants::terminal::DEFAULT_COLUMNS,
            rows: constants::terminal::DEFAULT_ROWS,
            default_foreground: constants::terminal::DEFAULT_FOREGROUND_INDEX,
            default_background: constants::terminal::DEFAULT_BACKGROUND_INDEX,
            composition: CompositionMode::default(),
            scroll_reverse: false,
        }
    }
}

impl Config {
    /// Scrollback size capped to [`constants::scrollback::MAX_LINES`].
    pub fn effective_scrollback_lines(&self) -> usize {
        self.scrollback_lines.min(constants::scrollback::MAX_LINES)
    }

    /// Initial grid size, never smaller than the minimum grid.
    pub fn grid_size(&self) -> (u16, u16) {
        (
            self.columns.max(constants::terminal::MIN_COLUMNS),
            self.rows.max(constants::terminal::MIN_ROWS),
        )
    }
}

/// Default config file content with comments (generated on first launch).
const DEFAULT_CONFIG: &str = r##"# termbridge configuration
# Changes are applied live, just save this file.

# Built-in palette: "xterm" or "windows"
theme = "xterm"

# Override the 16 base ANSI colors (index 0..15), as #rrggbb
# palette = ["#000000", "#cd0000", "#00cd00", "#cdcd00"]

# Maximum scrollback buffer size (lines)
scrollback-lines = 10000

# Initial grid size
columns = 80
rows = 24

# Palette indices used when the terminal has no explicit default colors
default-foreground = 15
default-background = 0

# Soft-keyboard composition strategy: "buffered" or "flag"
composition = "buffered"

# Reverse drag-to-scroll direction
# scroll-reverse = false
"##;

/// Return the config file path.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("termbridge").join("config.toml"))
}

/// Ensure the config file exists, creating a default if missing.
/// Returns the path to the config file.
pub fn ensure_config_file() -> Option<PathBuf> {
    let path = config_path()?;
    if !path.exists() {
        let parent = path.parent()?;
        std::fs::create_dir_all(parent).ok()?;
        std::fs::write(&path, DEFAULT_CONFIG).ok()?;
        tracing::info!("Created default config at {:?}", path);
    }
    Some(path)
}

/// Load and parse the config file. Returns default on any error.
pub fn load_config() -> Config {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Config::default(),
    }
}

/// Load and parse a config file at `path`. Returns default on any error.
pub fn load_config_from(path: &Path) -> Config {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to read config: {}", e);
            }
            return Config::default();
        }
    };

    // Size guard
    if content.len() > constants::settings::MAX_FILE_SIZE as usize {
        tracing::warn!(
            "Config file too large ({} bytes), using defaults",
            content.len()
        );
        return Config::default();
    }

    match toml::from_str::<Config>(&content) {
        Ok(cfg) => sanitize(cfg),
        Err(e) => {
            tracing::warn!("Failed to parse config.toml: {}", e);
            Config::default()
        }
    }
}

/// Drop string values that exceed the length limit.
fn sanitize(mut cfg: Config) -> Config {
    let limit = constants::settings::MAX_STRING_LENGTH;
    if cfg.theme.len() > limit {
        tracing::warn!("Theme name too long, using default");
        cfg.theme = Config::default().theme;
    }
    let before = cfg.palette.len();
    cfg.palette.retain(|entry| entry.len() <= limit);
    if cfg.palette.len() != before {
        tracing::warn!("Ignoring {} oversized palette entries", before - cfg.palette.len());
    }
    cfg
}

/// Start watching the config file for changes.
///
/// `on_change` runs on the watcher thread with the freshly parsed config
/// whenever the file content changes meaningfully; callers that touch
/// presentation state must re-dispatch onto their own context.
/// Returns a guard that stops watching on drop.
pub fn watch_config<F>(
    on_change: F,
) -> Option<notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>>
where
    F: Fn(Config) + Send + 'static,
{
    let path = config_path()?;
    watch_config_at(path, on_change)
}

/// Watch a specific config file path. See [`watch_config`].
pub fn watch_config_at<F>(
    path: PathBuf,
    on_change: F,
) -> Option<notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>>
where
    F: Fn(Config) + Send + 'static,
{
    use notify::Watcher;
    use notify_debouncer_mini::new_debouncer;

    let watch_dir = path.parent()?.to_path_buf();
    let current = parking_lot::Mutex::new(load_config_from(&path));
    let path_clone = path.clone();

    let mut debouncer = new_debouncer(
        constants::timing::CONFIG_DEBOUNCE,
        move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, _>| {
            let Ok(events) = res else {
                return;
            };
            if !events.iter().any(|event| event.path == path_clone) {
                return;
            }
            let new_config = load_config_from(&path_clone);
            let mut prev = current.lock();
            if new_config != *prev {
                tracing::info!("Config file changed, reloading...");
                *prev = new_config.clone();
                on_change(new_config);
            }
        },
    )
    .ok()?;

    debouncer
        .watcher()
        .watch(&watch_dir, notify::RecursiveMode::NonRecursive)
        .ok()?;

    tracing::info!("Watching config file: {:?}", path);
    Some(debouncer)
}
