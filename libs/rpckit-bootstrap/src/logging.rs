//! Logging bootstrap.
//!
//! Console output goes to a non-blocking stderr writer; optional JSON files
//! are routed per subsystem (crate target prefix) with size-based rotation.
//! `RUST_LOG`, when set, caps every sink.

use crate::config::{LoggingConfig, Section};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_MAX_SIZE_MB: u64 = 100;

// The worker thread flushes only while its guard is alive.
static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_level(s).map_or(LevelFilter::OFF, LevelFilter::from_level)
}

/// `target` is `prefix` itself or a path below it (`prefix::...`).
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

// ---------------- rotating file sinks ----------------

type SharedRotate = Arc<Mutex<FileRotate<AppendTimestamp>>>;

#[derive(Clone)]
struct FileSink(SharedRotate);

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

/// Writer that silently drops records with no destination file.
struct RoutedWriter(Option<FileSink>);

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.0 {
            Some(sink) => sink.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.0 {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }
}

/// Picks the file for a record by target prefix, falling back to the
/// `"default"` file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<FileSink>,
    by_prefix: Vec<(String, FileSink)>,
}

impl FileRouter {
    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }

    fn sink_for(&self, target: &str) -> Option<FileSink> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_prefix(target, prefix))
            .map(|(_, sink)| sink.clone())
            .or_else(|| self.default.clone())
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriter(self.sink_for(meta.target()))
    }
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn open_sink(section: &Section, base_dir: &Path) -> io::Result<Option<FileSink>> {
    if section.file.trim().is_empty() {
        return Ok(None);
    }
    let path = resolve_log_path(&section.file, base_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let limit = match section.max_backups {
        Some(n) => FileLimit::MaxFiles(n),
        None => FileLimit::Age(chrono::Duration::days(
            i64::from(section.max_age_days.unwrap_or(1)),
        )),
    };
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) as usize * 1024 * 1024;

    let rotate = FileRotate::new(
        &path,
        AppendTimestamp::default(limit),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        None,
    );
    Ok(Some(FileSink(Arc::new(Mutex::new(rotate)))))
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut router = FileRouter::default();
    for (name, section) in cfg {
        match open_sink(section, base_dir) {
            Ok(Some(sink)) if name == "default" => router.default = Some(sink),
            Ok(Some(sink)) => router.by_prefix.push((name.clone(), sink)),
            Ok(None) => {}
            // The subscriber is not installed yet.
            Err(e) => eprintln!("Failed to open log file for '{name}' ({}): {e}", section.file),
        }
    }
    // Longest prefix first so "rpckit::codegen" beats "rpckit".
    router
        .by_prefix
        .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
    router
}

// ---------------- level targets ----------------

fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default = cfg
        .get("default")
        .map_or(LevelFilter::INFO, |s| level_filter(&s.console_level));
    cfg.iter()
        .filter(|(name, _)| name.as_str() != "default")
        .fold(Targets::new().with_default(default), |targets, (name, s)| {
            targets.with_target(name.clone(), level_filter(&s.console_level))
        })
}

fn file_targets(cfg: &LoggingConfig) -> Targets {
    let default = match cfg.get("default") {
        Some(s) if !s.file.trim().is_empty() => level_filter(&s.file_level),
        _ => LevelFilter::OFF,
    };
    cfg.iter()
        .filter(|(name, s)| name.as_str() != "default" && !s.file.trim().is_empty())
        .fold(Targets::new().with_default(default), |targets, (name, s)| {
            targets.with_target(name.clone(), level_filter(&s.file_level))
        })
}

// ---------------- public entry points ----------------

/// Install the global subscriber described by `cfg`.
///
/// Relative log files resolve against `base_dir`. Safe to call more than
/// once; later calls keep the first subscriber.
pub fn init_logging(cfg: &LoggingConfig, base_dir: &Path) {
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    if cfg.is_empty() {
        init_minimal();
        return;
    }

    let router = build_file_router(cfg, base_dir);
    let env = EnvFilter::try_from_default_env().ok();

    let (stderr, guard) = tracing_appender::non_blocking(io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console = fmt::layer()
        .with_writer(stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg));

    let file = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_targets(cfg))
    });

    let _ = tracing_subscriber::registry()
        .with(env)
        .with(console)
        .with(file)
        .try_init();
}

/// Console-only INFO logging honoring `RUST_LOG`.
pub fn init_minimal() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(env)
        .with(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339()),
        )
        .try_init();
}
