/*
Logging for slidescope

All output goes through the `log` macros. `init()` installs a logger that
writes coloured lines to stderr (env_logger) and also keeps the most recent
lines from this crate in a `LogRing`. The ring feeds two reports under
`<data_dir>/slidescope/logs/`:

  debug.log   written on request (`--export-logs`)
  panic.log   written by the panic hook, with a backtrace

Levels: RUST_LOG wins when set. Otherwise only this crate logs, at DEBUG
in debug builds and ERROR in release builds.
*/

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use env_logger::fmt::{Color, Formatter};
use log::{Level, LevelFilter, Log, Metadata, Record};

#[allow(unused_imports)]
use log::{debug, info, warn, error};

pub const MAX_LOG_LINES: usize = 1000;

const CRATE_TARGET: &str = "slidescope";

fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Bounded buffer of the latest log lines, shared with the panic hook
#[derive(Debug, Clone, Default)]
pub struct LogRing {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        let Ok(mut lines) = self.lines.lock() else {
            return;
        };
        while lines.len() >= MAX_LOG_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Copy of the buffered lines, oldest first
    pub fn snapshot(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn ring_line(record: &Record) -> String {
    match record.line() {
        Some(line) => format!("{} {}:{} {}", record.level(), record.target(), line, record.args()),
        None => format!("{} {} {}", record.level(), record.target(), record.args()),
    }
}

/// stderr through env_logger, plus the ring for this crate's DEBUG and above
struct TeeLogger {
    console: env_logger::Logger,
    ring: LogRing,
}

impl TeeLogger {
    fn ring_wants(metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug && metadata.target().starts_with(CRATE_TARGET)
    }
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        Self::ring_wants(metadata) || self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console.matches(record) {
            self.console.log(record);
        }
        if Self::ring_wants(record.metadata()) {
            self.ring.push(ring_line(record));
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Cyan,
        Level::Trace => Color::White,
    }
}

fn format_line(buf: &mut Formatter, record: &Record) -> io::Result<()> {
    let mut level_style = buf.style();
    level_style.set_color(level_color(record.level())).set_bold(record.level() <= Level::Info);
    let mut dim = buf.style();
    dim.set_dimmed(true);

    let location = match (record.module_path(), record.line()) {
        (Some(module), Some(line)) => format!("{module}:{line}"),
        (Some(module), None) => module.to_string(),
        _ => record.target().to_string(),
    };

    writeln!(
        buf,
        "{} {:<5} {} {}",
        dim.value(now()),
        level_style.value(record.level()),
        dim.value(location),
        record.args()
    )
}

/// Install the global logger and return the ring it writes to
pub fn init() -> LogRing {
    let mut builder = env_logger::Builder::new();
    match std::env::var("RUST_LOG") {
        Ok(spec) => {
            builder.parse_filters(&spec);
        }
        Err(_) => {
            let level = if cfg!(debug_assertions) { LevelFilter::Debug } else { LevelFilter::Error };
            builder.filter_level(LevelFilter::Off).filter_module(CRATE_TARGET, level);
        }
    }
    builder.format(format_line);

    let ring = LogRing::new();
    let logger = TeeLogger { console: builder.build(), ring: ring.clone() };

    match log::set_boxed_logger(Box::new(logger)) {
        // Each logger filters for itself
        Ok(()) => log::set_max_level(LevelFilter::Trace),
        Err(e) => eprintln!("Logger was already installed: {}", e),
    }
    ring
}

pub fn log_directory(app_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
        .join("logs")
}

fn write_report(path: &Path, title: &str, preamble: &[String], ring: &LogRing) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let mut file = File::create(path)?;
    let stamp = now();

    writeln!(file, "{stamp} {title}")?;
    for line in preamble {
        writeln!(file, "{stamp} {line}")?;
    }

    let lines = ring.snapshot();
    writeln!(file)?;
    writeln!(file, "{stamp} last {} of at most {} log lines:", lines.len(), MAX_LOG_LINES)?;
    for line in &lines {
        writeln!(file, "{line}")?;
    }
    file.flush()
}

/// Write the buffered lines to `<log dir>/debug.log` and return its path
pub fn export_debug_logs(app_name: &str, ring: &LogRing) -> io::Result<PathBuf> {
    let path = log_directory(app_name).join("debug.log");
    write_report(&path, &format!("{app_name} debug log export"), &[], ring)?;
    info!("Debug logs exported to {}", path.display());
    Ok(path)
}

/// On panic, print the message and backtrace and save them with the ring
/// contents to `<log dir>/panic.log`
pub fn install_panic_hook(app_name: &str, ring: LogRing) {
    let path = log_directory(app_name).join("panic.log");

    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let header = format!("panic at {location}: {info}");

        let mut details = vec![header.clone(), "backtrace:".to_string()];
        details.extend(
            format!("{:?}", backtrace::Backtrace::new())
                .lines()
                .map(|line| format!("  {}", line.trim())),
        );

        eprintln!();
        for line in &details {
            eprintln!("{line}");
        }
        match write_report(&path, "crash report", &details, &ring) {
            Ok(()) => eprintln!("\nCrash report written to {}", path.display()),
            Err(e) => eprintln!("\nCould not write crash report {}: {}", path.display(), e),
        }
    }));
}
