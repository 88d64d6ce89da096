use super::format::format_visit;
use super::traits::{EventPayload, LogEvent, LogSink};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Prints every event as soon as it is emitted
///
/// Visit and redirect events are rendered with the configured format string;
/// errors and warnings print as `ERROR: message` / `WARNING: message`.
pub struct PrintSink {
    format: String,
    out: Mutex<Box<dyn Write + Send>>,
}

impl PrintSink {
    /// Prints to the given writer
    pub fn new(format: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            format: format.into(),
            out: Mutex::new(out),
        }
    }

    /// Prints to stdout
    pub fn stdout(format: impl Into<String>) -> Self {
        Self::new(format, Box::new(std::io::stdout()))
    }

    /// Renders an event as a single output line
    pub fn render(&self, event: &LogEvent) -> String {
        match &event.payload {
            EventPayload::Visit(record) => format_visit(&self.format, record),
            EventPayload::Issue { message, .. } => {
                format!("{}: {}", event.kind.as_str().to_uppercase(), message)
            }
        }
    }
}

impl LogSink for PrintSink {
    fn emit(&self, event: LogEvent) {
        let line = self.render(&event);
        let mut out = lock(&self.out);
        if let Err(e) = writeln!(out, "{}", line) {
            warn!("Failed to print log event: {}", e);
        }
    }
}

/// Keeps every event in memory for later retrieval
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events emitted so far
    pub fn events(&self) -> Vec<LogEvent> {
        lock(&self.events).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }

    /// Serializes the buffered log as a pretty-printed JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*lock(&self.events))
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        lock(&self.events).push(event);
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
