//! The log sink: output target, threshold and active formatter.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use super::format::{LogFormatter, OutputFormat};
use super::{Level, LogEvent, RunStart};
use crate::report::RunSummary;

/// In-memory output target shared between the sink and its reader.
///
/// # Example
///
/// ```rust
/// use unitkit::{SharedBuffer, UnitLog};
///
/// let buffer = SharedBuffer::new();
/// let log = UnitLog::new();
/// log.set_target(buffer.clone());
/// assert!(buffer.contents().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Returns the contents and empties the buffer.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Empties the buffer.
    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Where rendered output goes.
#[derive(Clone, Default)]
pub enum Target {
    /// Standard output (the default console target).
    #[default]
    Stdout,
    /// Standard error.
    Stderr,
    /// An in-memory buffer.
    Buffer(SharedBuffer),
    /// Any other writer.
    Writer(Arc<Mutex<Box<dyn Write + Send>>>),
}

impl Target {
    /// Wraps an arbitrary writer.
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self::Writer(Arc::new(Mutex::new(Box::new(writer))))
    }

    fn write_all(&self, text: &str) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().lock().write_all(text.as_bytes()),
            Self::Stderr => io::stderr().lock().write_all(text.as_bytes()),
            Self::Buffer(buffer) => buffer.clone().write_all(text.as_bytes()),
            Self::Writer(writer) => writer.lock().write_all(text.as_bytes()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self {
            Self::Stdout => io::stdout().flush(),
            Self::Stderr => io::stderr().flush(),
            Self::Buffer(_) => Ok(()),
            Self::Writer(writer) => writer.lock().flush(),
        }
    }
}

impl From<SharedBuffer> for Target {
    fn from(buffer: SharedBuffer) -> Self {
        Self::Buffer(buffer)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("Stdout"),
            Self::Stderr => f.write_str("Stderr"),
            Self::Buffer(_) => f.write_str("Buffer"),
            Self::Writer(_) => f.write_str("Writer"),
        }
    }
}

type SharedFormatter = Arc<Mutex<Box<dyn LogFormatter>>>;

fn shared(formatter: Box<dyn LogFormatter>) -> SharedFormatter {
    Arc::new(Mutex::new(formatter))
}

struct SinkInner {
    target: Target,
    threshold: Level,
    formatter: SharedFormatter,
    /// `None` when a custom formatter is installed.
    format: Option<OutputFormat>,
    next_seq: u64,
    /// Whether a write failure was already reported.
    has_warned_io_failure: bool,
}

impl SinkInner {
    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Err(err) = self.target.write_all(text) {
            if !self.has_warned_io_failure {
                self.has_warned_io_failure = true;
                tracing::warn!(error = %err, sink = ?self.target, "log sink write failed");
            }
        }
    }
}

/// Shared handle to the log sink.
///
/// Clones share the same target, threshold and formatter, so a test body can
/// redirect the output of the run it belongs to.
#[derive(Clone)]
pub struct UnitLog {
    inner: Arc<Mutex<SinkInner>>,
}

impl Default for UnitLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnitLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("UnitLog")
            .field("target", &inner.target)
            .field("threshold", &inner.threshold)
            .field("format", &inner.format)
            .finish()
    }
}

impl UnitLog {
    /// Creates a sink writing CLF output at [`Level::Errors`] to stdout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SinkInner {
                target: Target::Stdout,
                threshold: Level::default(),
                formatter: shared(OutputFormat::default().formatter()),
                format: Some(OutputFormat::default()),
                next_seq: 0,
                has_warned_io_failure: false,
            })),
        }
    }

    /// Redirects subsequent output.
    pub fn set_target(&self, target: impl Into<Target>) {
        let mut inner = self.inner.lock();
        inner.target = target.into();
        inner.has_warned_io_failure = false;
    }

    /// Current target.
    #[must_use]
    pub fn target(&self) -> Target {
        self.inner.lock().target.clone()
    }

    /// Sets the threshold below which events are dropped.
    pub fn set_threshold(&self, level: Level) {
        self.inner.lock().threshold = level;
    }

    /// Current threshold.
    #[must_use]
    pub fn threshold(&self) -> Level {
        self.inner.lock().threshold
    }

    /// Switches to one of the built-in formatters.
    pub fn set_formatter(&self, format: OutputFormat) {
        self.install(shared(format.formatter()), Some(format));
    }

    /// Installs a custom formatter.
    pub fn set_custom_formatter(&self, formatter: Box<dyn LogFormatter>) {
        self.install(shared(formatter), None);
    }

    fn install(&self, formatter: SharedFormatter, format: Option<OutputFormat>) {
        let mut inner = self.inner.lock();
        inner.formatter = formatter;
        inner.format = format;
    }

    /// Built-in format in use, `None` for a custom formatter.
    #[must_use]
    pub fn format(&self) -> Option<OutputFormat> {
        self.inner.lock().format
    }

    /// Saves target, threshold and formatter; the returned guard restores
    /// them when dropped. A custom formatter comes back as the same instance.
    #[must_use = "the previous configuration is restored when the guard is dropped"]
    pub fn scoped(&self) -> SinkGuard {
        let inner = self.inner.lock();
        SinkGuard {
            log: self.clone(),
            target: inner.target.clone(),
            threshold: inner.threshold,
            formatter: Arc::clone(&inner.formatter),
            format: inner.format,
        }
    }

    /// Renders an event unless it falls below the threshold.
    ///
    /// Unit start, finish and skip events always reach formatters that
    /// need them to keep their document well-formed.
    pub fn emit(&self, mut event: LogEvent) {
        let mut inner = self.inner.lock();
        event.seq = inner.next_seq;
        inner.next_seq += 1;

        let mut output = String::new();
        {
            let mut formatter = inner.formatter.lock();
            let keep = event.level() >= inner.threshold
                || (event.is_structural() && formatter.is_structural());
            if !keep {
                return;
            }
            formatter.render_event(&event, &mut output);
        }
        inner.write(&output);
    }

    /// Renders the run header.
    pub fn run_start(&self, start: &RunStart) {
        let mut inner = self.inner.lock();
        let mut output = String::new();
        inner.formatter.lock().render_run_start(start, &mut output);
        inner.write(&output);
    }

    /// Renders the run summary and flushes the target.
    pub fn run_end(&self, summary: &RunSummary) {
        let mut inner = self.inner.lock();
        let mut output = String::new();
        inner.formatter.lock().render_run_end(summary, &mut output);
        inner.write(&output);
        drop(inner);
        self.flush();
    }

    /// Flushes the target.
    pub fn flush(&self) {
        let target = self.target();
        if let Err(err) = target.flush() {
            tracing::warn!(error = %err, "log sink flush failed");
        }
    }
}

/// Restores the sink configuration captured by [`UnitLog::scoped`].
#[must_use = "the previous configuration is restored when the guard is dropped"]
pub struct SinkGuard {
    log: UnitLog,
    target: Target,
    threshold: Level,
    formatter: SharedFormatter,
    format: Option<OutputFormat>,
}

impl fmt::Debug for SinkGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkGuard")
            .field("target", &self.target)
            .field("threshold", &self.threshold)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        self.log.flush();
        self.log.set_target(self.target.clone());
        self.log.set_threshold(self.threshold);
        self.log.install(Arc::clone(&self.formatter), self.format);
    }
}
