//! Tracing layer that forwards formatted log lines to a sink.

use std::fmt::Write;

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::LogSink;

const MAX_LINE_CHARS: usize = 32_000;

/// Builds "message key=value ..." from an event's fields.
#[derive(Default)]
struct LineVisitor {
    buf: String,
}

impl LineVisitor {
    fn separate(&mut self) {
        if !self.buf.is_empty() {
            self.buf.push(' ');
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.separate();
        if field.name() == "message" {
            self.buf.push_str(value);
        } else {
            write!(self.buf, "{}={:?}", field.name(), value).ok();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.separate();
        if field.name() == "message" {
            write!(self.buf, "{:?}", value).ok();
        } else {
            write!(self.buf, "{}={:?}", field.name(), value).ok();
        }
    }
}

/// Formats one event as "[LEVEL] target: message key=value ...".
fn format_event(event: &tracing::Event<'_>) -> String {
    let metadata = event.metadata();
    let mut visitor = LineVisitor::default();
    event.record(&mut visitor);

    let line = if visitor.buf.is_empty() {
        format!("[{}] {}", metadata.level(), metadata.target())
    } else {
        format!("[{}] {}: {}", metadata.level(), metadata.target(), visitor.buf)
    };

    match line.char_indices().nth(MAX_LINE_CHARS) {
        Some((cut, _)) => format!("{}… ({} chars)", &line[..cut], line.chars().count()),
        None => line,
    }
}

/// Layer that sends each formatted event to the sink, when one is set.
pub(crate) fn log_sink_layer(sink: Option<LogSink>) -> LogSinkLayer {
    LogSinkLayer { sink }
}

#[derive(Clone)]
pub(crate) struct LogSinkLayer {
    sink: Option<LogSink>,
}

impl<S> Layer<S> for LogSinkLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if let Some(sink) = &self.sink {
            sink(format_event(event));
        }
    }
}
