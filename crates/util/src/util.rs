//! Shared utilities for termbridge.

/// Panic in debug builds, log an error with a backtrace in release.
///
/// For invariants whose violation should fail tests loudly but must never
/// take a live terminal session down.
#[macro_export]
macro_rules! debug_panic {
    ( $($fmt_arg:tt)* ) => {
        if cfg!(debug_assertions) {
            panic!( $($fmt_arg)* );
        } else {
            let backtrace = std::backtrace::Backtrace::capture();
            tracing::error!("{}\n{:?}", format_args!($($fmt_arg)*), backtrace);
        }
    };
}

/// Borrow at most `max_chars` characters of `text`, cut on a char boundary.
///
/// Used to keep user-typed text out of log lines beyond a short preview.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preview_keeps_short_text() {
        assert_eq!(preview("ls -la", 32), "ls -la");
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        assert_eq!(preview("你好世界", 2), "你好");
        assert_eq!(preview("", 4), "");
        assert_eq!(preview("abc", 0), "");
    }

    #[test]
    #[should_panic(expected = "broken invariant 7")]
    fn debug_panic_panics_in_debug_builds() {
        if cfg!(debug_assertions) {
            debug_panic!("broken invariant {}", 7);
        } else {
            panic!("broken invariant 7");
        }
    }
}
