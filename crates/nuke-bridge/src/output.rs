//! Output log and user notifications.
//!
//! Both are injected into [`crate::RemoteExecService`] at construction; there
//! is no process-wide output channel.

use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, error, warn};

/// Append-only text log visible to the user.
pub trait OutputSink: Send + Sync {
    /// Append one response to the log.
    fn append_line(&self, text: &str);

    /// Remove previous log contents, where the medium supports it.
    fn clear(&self);
}

/// Surface for warnings and errors shown to the user.
pub trait Notifier: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// In-memory log that keeps every appended line.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current log contents.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("output lock poisoned").clone()
    }
}

impl OutputSink for MemorySink {
    fn append_line(&self, text: &str) {
        self.lines
            .lock()
            .expect("output lock poisoned")
            .push(text.to_string());
    }

    fn clear(&self) {
        self.lines.lock().expect("output lock poisoned").clear();
    }
}

/// Log backed by any writer, typically stdout.
///
/// Streams cannot be rewound, so `clear` does nothing.
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner().expect("output lock poisoned")
    }
}

impl<W: Write + Send> OutputSink for WriterSink<W> {
    fn append_line(&self, text: &str) {
        let mut writer = self.writer.lock().expect("output lock poisoned");
        let result = writeln!(writer, "{}", text).and_then(|_| writer.flush());
        if let Err(e) = result {
            error!("Failed to write output: {}", e);
        }
    }

    fn clear(&self) {
        debug!("Ignoring clear request on stream output");
    }
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warn(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

/// A notification captured by [`MemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Warning(String),
    Error(String),
}

/// Notifier that records every message.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Notification> {
        self.messages.lock().expect("notifier lock poisoned").clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Warning(msg) => Some(msg),
                Notification::Error(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(msg) => Some(msg),
                Notification::Warning(_) => None,
            })
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .expect("notifier lock poisoned")
            .push(Notification::Warning(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .lock()
            .expect("notifier lock poisoned")
            .push(Notification::Error(message.to_string()));
    }
}
