//! Host integration for Soundstage.
//!
//! Owns the tokio runtime, installs logging, and exposes [`AppState`] plus a
//! JSON command bridge to UI shells.

mod commands;
mod state;

pub use commands::*;
pub use state::*;

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Lines kept in the in-memory log buffer.
pub const LOG_BUFFER_LINES: usize = 500;

// ============================================================================
// In-memory log buffer layer for tracing
// ============================================================================

/// A tracing layer that captures log events into a shared in-memory ring buffer
/// so a UI can show backend logs without stdout access.
pub struct BufferLayer {
    buffer: LogBuffer,
}

impl BufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: tracing::Subscriber> Layer<S> for BufferLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        // Format: [HH:MM:SS] LEVEL message key=value...
        let now = chrono_lite_now();
        let level = event.metadata().level();
        let line = format!("[{}] {:>5} {}{}", now, level, visitor.message, visitor.fields);

        if let Ok(mut buf) = self.buffer.lock() {
            buf.push_back(line);
            while buf.len() > LOG_BUFFER_LINES {
                buf.pop_front();
            }
        }
    }
}

/// Collects the `message` field and appends the rest as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }
}

/// Returns current time as HH:MM:SS without pulling in the chrono crate.
fn chrono_lite_now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let h = (secs % 86400) / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Installs the global subscriber: an `EnvFilter`ed fmt layer plus the buffer layer.
pub fn init_logging() -> LogBuffer {
    let log_buffer: LogBuffer = Arc::new(std::sync::Mutex::new(VecDeque::new()));

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()),
    );

    let buffer_layer = BufferLayer::new(Arc::clone(&log_buffer));

    if let Err(e) = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(buffer_layer)
        .try_init()
    {
        eprintln!("tracing subscriber already installed: {}", e);
    }

    log_buffer
}

/// Sets up logging and state from a config file.
pub fn start(config_path: &Path) -> anyhow::Result<AppState> {
    let log_buffer = init_logging();
    tracing::info!("Starting soundstage with config {:?}", config_path);
    AppState::new(config_path, log_buffer)
}
