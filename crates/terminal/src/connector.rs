//! Transport connectors.
//!
//! A connector carries bytes between the session and the remote process. The
//! read half is handed to a dedicated reader thread; writes and resizes come
//! from the session.

use crate::types::TermSize;
use anyhow::{bail, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::{self, Read};
use std::sync::Arc;

/// Byte transport to a remote process (local pty, SSH channel, mock).
pub trait TtyConnector: Send {
    /// Short human-readable name for logs.
    fn name(&self) -> &str;

    /// Hand out the read half. A reader returning `Ok(0)` signals end of stream.
    /// Can only be taken once.
    fn take_reader(&mut self) -> Result<Box<dyn Read + Send>>;

    fn write(&mut self, data: &[u8]) -> Result<()>;

    fn resize(&mut self, size: TermSize) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Disconnect. Pending output is still delivered before end of stream.
    fn close(&mut self);
}

#[derive(Default)]
struct EchoState {
    pending: VecDeque<u8>,
    closed: bool,
}

#[derive(Default)]
struct EchoQueue {
    state: Mutex<EchoState>,
    ready: Condvar,
}

impl EchoQueue {
    fn push(&self, data: &[u8]) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.pending.extend(data);
        self.ready.notify_one();
    }

    fn close(&self) -> bool {
        let mut state = self.state.lock();
        let was_open = !state.closed;
        state.closed = true;
        self.ready.notify_all();
        was_open
    }
}

/// Loopback connector: everything written comes back as output.
///
/// Stands in for a remote shell when exercising the view without a network
/// or a pty.
pub struct EchoConnector {
    queue: Arc<EchoQueue>,
    reader_taken: bool,
}

impl Default for EchoConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoConnector {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(EchoQueue::default()),
            reader_taken: false,
        }
    }

    /// Echo connector whose stream starts with `output`.
    pub fn with_initial_output(output: &str) -> Self {
        let connector = Self::new();
        connector.queue.push(output.as_bytes());
        connector
    }

    /// Echo connector pre-seeded with an ANSI rendering test page.
    pub fn color_test() -> Self {
        Self::with_initial_output(&color_test_page())
    }
}

impl TtyConnector for EchoConnector {
    fn name(&self) -> &str {
        "mock-echo"
    }

    fn take_reader(&mut self) -> Result<Box<dyn Read + Send>> {
        if self.reader_taken {
            bail!("echo connector reader already taken");
        }
        self.reader_taken = true;
        Ok(Box::new(EchoReader {
            queue: self.queue.clone(),
        }))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.queue.push(data);
        Ok(())
    }

    fn resize(&mut self, _size: TermSize) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.queue.state.lock().closed
    }

    fn close(&mut self) {
        if self.queue.close() {
            tracing::debug!("Echo connector closed");
        }
    }
}

impl Drop for EchoConnector {
    fn drop(&mut self) {
        self.queue.close();
    }
}

struct EchoReader {
    queue: Arc<EchoQueue>,
}

impl Read for EchoReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.queue.state.lock();
        while state.pending.is_empty() && !state.closed {
            self.queue.ready.wait(&mut state);
        }
        let n = buf.len().min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

/// ANSI test page: attributes, 16/256/true colors, CJK and box drawing, then
/// enough numbered lines to fill scrollback.
pub fn color_test_page() -> String {
    let mut out = String::with_capacity(8 * 1024);
    out.push_str("\x1b[2J\x1b[H");
    out.push_str("termbridge ANSI render test\r\n\r\n");

    out.push_str("\x1b[1mBold\x1b[0m  ");
    out.push_str("\x1b[3mItalic\x1b[0m  ");
    out.push_str("\x1b[4mUnderline\x1b[0m  ");
    out.push_str("\x1b[7mInverse\x1b[0m\r\n\r\n");

    out.push_str("16 colors (bg):\r\n");
    for i in 0..16 {
        let _ = write!(out, "\x1b[48;5;{i}m  \x1b[0m");
    }
    out.push_str("\r\n\r\n");

    out.push_str("256 colors (bg, 16-231):\r\n");
    for (n, i) in (16..=231).enumerate() {
        let _ = write!(out, "\x1b[48;5;{i}m \x1b[0m");
        if (n + 1) % 64 == 0 {
            out.push_str("\r\n");
        }
    }
    out.push_str("\r\n\r\n");

    out.push_str("True color:\r\n");
    out.push_str("\x1b[48;2;255;0;0m  \x1b[0m ");
    out.push_str("\x1b[48;2;0;255;0m  \x1b[0m ");
    out.push_str("\x1b[48;2;0;0;255m  \x1b[0m ");
    out.push_str("\x1b[38;2;255;165;0mOrange\x1b[0m\r\n\r\n");

    out.push_str("CJK double-width:\r\n");
    out.push_str("你好世界 Hello\r\n");
    out.push_str("中文混合English测试\r\n");
    out.push_str("├──目录1\r\n");
    out.push_str("│  ├──文件.txt\r\n");
    out.push_str("│  └──子目录\r\n");
    out.push_str("└──目录2\r\n\r\n");

    out.push_str("Scrollback (swipe/drag):\r\n");
    for i in 1..=80 {
        let _ = write!(out, "Line {i}\r\n");
    }
    out.push_str("\r\nType here. Arrow keys / Esc / Tab / Ctrl+<key> should work.\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn read_available(reader: &mut dyn Read) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let n = reader.read(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn echo_returns_written_bytes() {
        let mut connector = EchoConnector::new();
        let mut reader = connector.take_reader().unwrap();
        connector.write(b"ls\r").unwrap();
        assert_eq!(read_available(&mut *reader), b"ls\r".to_vec());
    }

    #[test]
    fn initial_output_comes_first() {
        let mut connector = EchoConnector::with_initial_output("hi ");
        let mut reader = connector.take_reader().unwrap();
        connector.write(b"there").unwrap();
        assert_eq!(read_available(&mut *reader), b"hi there".to_vec());
    }

    #[test]
    fn reader_can_only_be_taken_once() {
        let mut connector = EchoConnector::new();
        assert!(connector.take_reader().is_ok());
        assert!(connector.take_reader().is_err());
    }

    #[test]
    fn close_drains_pending_then_signals_eof() {
        let mut connector = EchoConnector::with_initial_output("tail");
        let mut reader = connector.take_reader().unwrap();
        connector.close();
        assert!(!connector.is_connected());
        assert_eq!(read_available(&mut *reader), b"tail".to_vec());
        assert_eq!(read_available(&mut *reader), Vec::<u8>::new());
    }

    #[test]
    fn writes_after_close_are_dropped() {
        let mut connector = EchoConnector::new();
        let mut reader = connector.take_reader().unwrap();
        connector.close();
        connector.write(b"late").unwrap();
        assert_eq!(read_available(&mut *reader), Vec::<u8>::new());
    }

    #[test]
    fn blocked_reader_wakes_on_write() {
        let mut connector = EchoConnector::new();
        let mut reader = connector.take_reader().unwrap();
        let handle = std::thread::spawn(move || read_available(&mut *reader));
        std::thread::sleep(Duration::from_millis(20));
        connector.write(b"x").unwrap();
        assert_eq!(handle.join().unwrap(), b"x".to_vec());
    }

    #[test]
    fn dropping_connector_unblocks_reader() {
        let mut connector = EchoConnector::new();
        let mut reader = connector.take_reader().unwrap();
        let handle = std::thread::spawn(move || read_available(&mut *reader));
        drop(connector);
        assert!(handle.join().unwrap().is_empty());
    }

    #[test]
    fn color_test_page_covers_scrollback_and_cjk() {
        let page = color_test_page();
        assert!(page.starts_with("\x1b[2J\x1b[H"));
        assert!(page.contains("\x1b[48;5;231m"));
        assert!(page.contains("你好世界"));
        assert!(page.contains("Line 1\r\n"));
        assert!(page.contains("Line 80\r\n"));
        assert!(!page.contains("Line 81"));
    }
}
