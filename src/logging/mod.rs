// Tracing setup for the hook binary
//
// Stdout belongs to the hook protocol, so logs go to stderr and, when verbose,
// to an append-only log file shared by every hook process of a project.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::Config;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "PLANMAN_LOG";

/// `<cwd>/.claude/planman.log`, or `planman.log` in the temp dir without a cwd.
pub fn log_path(cwd: Option<&Path>) -> PathBuf {
    match cwd {
        Some(dir) => dir.join(".claude").join("planman.log"),
        None => std::env::temp_dir().join("planman.log"),
    }
}

/// Install the global subscriber. A subscriber that is already set wins.
pub fn init(config: &Config, cwd: Option<&Path>) {
    let default_directive = if config.verbose { "planman=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .boxed();

    let file_layer = config.verbose.then(|| {
        let path = log_path(cwd);
        tracing_subscriber::fmt::layer()
            .with_writer(move || LockedAppend::open(&path))
            .with_ansi(false)
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

/// Appends under an advisory exclusive lock and never reports failure.
///
/// A log line that cannot be written is dropped.
pub struct LockedAppend {
    file: Option<File>,
}

impl LockedAppend {
    pub fn open(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = OpenOptions::new().create(true).append(true).open(path).ok();
        Self { file }
    }
}

impl Write for LockedAppend {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = self.file.as_mut() {
            let locked = file.lock_exclusive().is_ok();
            let _ = file.write_all(buf);
            if locked {
                let _ = file.unlock();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_path() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            log_path(Some(tmp.path())),
            tmp.path().join(".claude").join("planman.log")
        );
        assert!(log_path(None).ends_with("planman.log"));
    }

    #[test]
    fn test_locked_append_creates_and_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".claude").join("planman.log");
        LockedAppend::open(&path).write_all(b"one\n").unwrap();
        LockedAppend::open(&path).write_all(b"two\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_unwritable_path_is_swallowed() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // A regular file where the directory should be.
        let mut writer = LockedAppend::open(&blocker.join("planman.log"));
        assert_eq!(writer.write(b"lost").unwrap(), 4);
        writer.flush().unwrap();
    }
}
