// Path helpers shared by the state store and the markers

use std::path::{Component, Path, PathBuf};

use crate::config::constants::STATE_FILE_PREFIX;

/// Keep only characters that are safe in a file name.
///
/// An id with nothing usable left becomes `default`.
pub fn sanitize_session_id(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        "default".to_string()
    } else {
        safe
    }
}

/// `<dir>/planman-<kind><id>.json`
pub(crate) fn state_file(dir: &Path, kind: &str, session_id: &str) -> PathBuf {
    dir.join(format!(
        "{STATE_FILE_PREFIX}{kind}{}.json",
        sanitize_session_id(session_id)
    ))
}

/// Normalize a plan file path so the same file always compares equal.
///
/// Expands a leading `~`, resolves symlinks when the file exists, and makes
/// the result absolute otherwise.
pub fn normalize_path(path: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if let Ok(resolved) = std::fs::canonicalize(&expanded) {
        return resolved;
    }
    if expanded.is_absolute() {
        return expanded;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(expanded),
        Err(_) => expanded,
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_session_id() {
        assert_eq!(sanitize_session_id("abc-123_x"), "abc-123_x");
        assert_eq!(sanitize_session_id("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_session_id("///"), "default");
        assert_eq!(sanitize_session_id(""), "default");
    }

    #[test]
    fn test_state_file_name() {
        let path = state_file(Path::new("/tmp"), "plan-", "s/1");
        assert_eq!(path, PathBuf::from("/tmp/planman-plan-s1.json"));
    }

    #[test]
    fn test_normalize_resolves_existing_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plan.md");
        std::fs::write(&file, "# Plan").unwrap();
        let dotted = tmp.path().join(".").join("plan.md");
        assert_eq!(normalize_path(&dotted), normalize_path(&file));
        assert!(normalize_path(&file).is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_follows_symlinks() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plan.md");
        std::fs::write(&file, "# Plan").unwrap();
        let link = tmp.path().join("link.md");
        std::os::unix::fs::symlink(&file, &link).unwrap();
        assert_eq!(normalize_path(&link), normalize_path(&file));
    }

    #[test]
    fn test_normalize_expands_home() {
        if let Some(home) = dirs::home_dir() {
            let path = normalize_path(Path::new("~/definitely-missing-planman/plan.md"));
            assert!(path.starts_with(&home), "got {}", path.display());
        }
    }
}
