//! Logging init: daemon log file under XDG state dir, falling back to stderr.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,targetd=debug,targetd_core=debug,targetd_cli=debug";

/// Where log lines end up after [`init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    File(PathBuf),
    Stderr,
}

/// Writer for one log line: a clone of the log file handle, or stderr if cloning failed.
enum LineWriter {
    File(fs::File),
    Stderr,
}

impl io::Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LineWriter::File(f) => f.write(buf),
            LineWriter::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LineWriter::File(f) => f.flush(),
            LineWriter::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct SharedLogFile(fs::File);

impl<'a> MakeWriter<'a> for SharedLogFile {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LineWriter::File)
            .unwrap_or(LineWriter::Stderr)
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Path of the daemon log: `~/.local/state/targetd/targetd.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("targetd")?;
    Ok(xdg_dirs.get_state_home().join("targetd").join("targetd.log"))
}

/// Initialize structured logging to the daemon log file.
/// Returns Err when the state dir is unwritable so the caller can choose stderr.
pub fn init_file_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(SharedLogFile(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {}", e))?;

    Ok(path)
}

/// Initialize logging to stderr only.
pub fn init_stderr_logging() {
    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .try_init();
}

/// Log to file when possible, otherwise to stderr. `foreground` always uses stderr.
pub fn init(foreground: bool) -> LogSink {
    if !foreground {
        match init_file_logging() {
            Ok(path) => {
                tracing::info!("targetd logging initialized at {}", path.display());
                return LogSink::File(path);
            }
            Err(e) => {
                init_stderr_logging();
                tracing::warn!("log file unavailable ({:#}); logging to stderr", e);
                return LogSink::Stderr;
            }
        }
    }
    init_stderr_logging();
    LogSink::Stderr
}
