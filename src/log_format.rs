//! Log line layout: `TIMESTAMP LEVEL target: span{fields}:span: message fields`
//!
//! The target comes before the span context so crawl lines for the same module
//! line up even when they run inside different task spans.

use chrono::Utc;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::{FmtContext, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

pub struct TargetFirstFormat {
    timestamps: bool,
}

impl TargetFirstFormat {
    pub fn new() -> Self {
        Self { timestamps: true }
    }

    /// For environments that stamp lines themselves (journald, k8s)
    pub fn without_timestamps() -> Self {
        Self { timestamps: false }
    }
}

impl Default for TargetFirstFormat {
    fn default() -> Self {
        Self::new()
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

impl<S, N> FormatEvent<S, N> for TargetFirstFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let ansi = writer.has_ansi_escapes();

        if self.timestamps {
            write!(writer, "{} ", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))?;
        }

        let level = metadata.level();
        if ansi {
            write!(writer, "{}{:>5}\x1b[0m ", level_color(level), level)?;
        } else {
            write!(writer, "{:>5} ", level)?;
        }

        write!(writer, "{}: ", metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            let mut any = false;
            for span in scope.from_root() {
                if any {
                    write!(writer, ":")?;
                }
                write!(writer, "{}", span.name())?;
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>()
                    && !fields.is_empty()
                {
                    write!(writer, "{{{}}}", fields)?;
                }
                any = true;
            }
            if any {
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{info, info_span};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(format: TargetFirstFormat, log: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .event_format(format)
            .finish();
        tracing::subscriber::with_default(subscriber, log);
        out.text()
    }

    #[test]
    fn test_line_without_timestamp() {
        let line = capture(TargetFirstFormat::without_timestamps(), || {
            let span = info_span!("task", id = 3);
            let _entered = span.enter();
            info!(target: "xc2db::worker", offset = 100, "Page ingested");
        });
        assert_eq!(line, " INFO xc2db::worker: task{id=3}: Page ingested offset=100\n");
    }

    #[test]
    fn test_line_with_timestamp() {
        let line = capture(TargetFirstFormat::new(), || {
            info!(target: "xc2db::worker", "Starting scrape run");
        });
        let (stamp, rest) = line.split_once(' ').unwrap();
        assert!(stamp.ends_with('Z'), "{line}");
        assert_eq!(stamp.len(), "2026-01-01T00:00:00.000Z".len());
        assert_eq!(rest, " INFO xc2db::worker: Starting scrape run\n");
    }
}
