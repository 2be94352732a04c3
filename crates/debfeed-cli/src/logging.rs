use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use debfeed_utils::fs::ensure_dir_exists;
use nu_ansi_term::Color::{Blue, Magenta, Red, Yellow};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        writer::MakeWriterExt,
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{cli::Args, utils::Colored};

/// Target of the final error report. It is written to the log file only, since the console
/// already shows the rendered diagnostic.
pub const REPORT_TARGET: &str = "debfeed_cli::report";

#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

pub struct CustomFormatter;

impl<S, N> FormatEvent<S, N> for CustomFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        match *event.metadata().level() {
            Level::TRACE => write!(writer, "{} ", Colored(Magenta, "[TRACE]")),
            Level::DEBUG => write!(writer, "{} ", Colored(Blue, "[DEBUG]")),
            Level::INFO => write!(writer, ""),
            Level::WARN => write!(writer, "{} ", Colored(Yellow, "[WARN]")),
            Level::ERROR => write!(writer, "{} ", Colored(Red, "[ERROR]")),
        }?;

        if let Some(message) = visitor.message {
            writeln!(writer, "{message}")
        } else {
            writeln!(writer)
        }
    }
}

/// An opened log file.
pub struct LogFile {
    pub path: PathBuf,
    file: File,
}

fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir_exists(parent).map_err(io::Error::other)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Opens `primary` for appending, falling back to `fallback`.
///
/// On failure returns one message per location tried.
pub fn open_log_file(primary: &Path, fallback: &Path) -> Result<LogFile, Vec<String>> {
    let mut failures = Vec::new();

    for path in [primary, fallback] {
        match open_append(path) {
            Ok(file) => {
                return Ok(LogFile {
                    path: path.to_path_buf(),
                    file,
                })
            }
            Err(err) => failures.push(format!("{}: {}", path.display(), err)),
        }
    }

    Err(failures)
}

fn console_level(args: &Args) -> Level {
    if args.quiet {
        Level::ERROR
    } else if args.verbose >= 2 {
        Level::TRACE
    } else if args.verbose == 1 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Installs the global subscriber: a console layer honouring `-v`/`-q`/`--json`, plus a
/// plain-text file layer at debug level when `log_file` is given.
pub fn setup_logging(args: &Args, log_file: Option<LogFile>) {
    let level = console_level(args);
    let console_filter = EnvFilter::new(format!("debfeed={level},{REPORT_TARGET}=off"));

    // info goes to stdout, everything else to stderr
    let writer = io::stdout
        .with_filter(|meta| meta.level() == &Level::INFO)
        .or_else(io::stderr);

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .without_time();

    let console = if args.json {
        console
            .json()
            .flatten_event(true)
            .with_filter(console_filter)
            .boxed()
    } else {
        console
            .event_format(CustomFormatter)
            .with_filter(console_filter)
            .boxed()
    };

    let file = log_file.map(|log_file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(log_file.file))
            .with_filter(EnvFilter::new("debfeed=debug"))
    });

    if let Err(err) = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
    {
        eprintln!("Failed to set tracing subscriber: {err}");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_open_log_file_primary() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("log/debfeed.log");

        let log_file = open_log_file(&primary, &dir.path().join("fallback.log")).unwrap();

        assert_eq!(log_file.path, primary);
        assert!(primary.exists());
    }

    #[test]
    fn test_open_log_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let fallback = dir.path().join("state/debfeed/debfeed.log");

        let log_file = open_log_file(&blocker.join("debfeed.log"), &fallback).unwrap();

        assert_eq!(log_file.path, fallback);
    }

    #[test]
    fn test_open_log_file_both_fail() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let failures =
            open_log_file(&blocker.join("a.log"), &blocker.join("b.log")).err().unwrap();
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_console_level() {
        let level = |argv: &[&str]| console_level(&Args::try_parse_from(argv).unwrap());

        assert_eq!(level(&["debfeed", "detect"]), Level::INFO);
        assert_eq!(level(&["debfeed", "-v", "detect"]), Level::DEBUG);
        assert_eq!(level(&["debfeed", "-vvv", "detect"]), Level::TRACE);
        assert_eq!(level(&["debfeed", "-q", "detect"]), Level::ERROR);
    }
}
