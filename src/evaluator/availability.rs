// Memoized "is this program on PATH" check

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Whether a command can be launched, looked up once and remembered.
#[derive(Debug)]
pub struct CommandAvailability {
    program: String,
    cached: Mutex<Option<bool>>,
}

impl CommandAvailability {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_available(&self) -> bool {
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cached.get_or_insert_with(|| resolve(&self.program).is_some())
    }

    /// Forget the memoized answer; the next check looks again.
    pub fn reset(&self) {
        let mut cached = match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cached = None;
    }
}

/// Locate `program` the way a shell would.
fn resolve(program: &str) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        candidates(program)
            .into_iter()
            .map(|name| dir.join(name))
            .find(|candidate| is_executable(candidate))
    })
}

#[cfg(windows)]
fn candidates(program: &str) -> Vec<String> {
    let mut names = vec![program.to_string()];
    for ext in ["exe", "cmd", "bat"] {
        names.push(format!("{program}.{ext}"));
    }
    names
}

#[cfg(not(windows))]
fn candidates(program: &str) -> Vec<String> {
    vec![program.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let check = CommandAvailability::new("planman-no-such-binary-xyz");
        assert!(!check.is_available());
        assert!(!check.is_available());
    }

    #[test]
    fn test_empty_program() {
        assert!(!CommandAvailability::new("").is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_finds_shell_and_resets() {
        let check = CommandAvailability::new("sh");
        assert!(check.is_available());
        check.reset();
        assert!(check.is_available());
    }

    #[cfg(unix)]
    #[test]
    fn test_explicit_path() {
        assert!(CommandAvailability::new("/bin/sh").is_available());
        assert!(!CommandAvailability::new("/definitely/not/here").is_available());
    }
}
