// Project instructions (CLAUDE.md / README.md) for the evaluation prompt
//
// Walks upward from the session's working directory, nearest directory first,
// so the instructions closest to the code survive the size cap. Within one
// directory CLAUDE.md comes before README.md.

use std::path::{Path, PathBuf};
use tracing::debug;

/// Filenames we look for, in the order they are loaded within a single directory.
const CONTEXT_FILENAMES: &[&str] = &["CLAUDE.md", "README.md"];

const SEPARATOR: &str = "\n\n---\n\n";

/// Collect project context visible from `cwd`, at most `max_bytes` long.
///
/// Each file becomes a `### <path>` section. Returns `None` when nothing
/// non-empty was found.
pub fn collect_project_context(cwd: &Path, max_bytes: usize) -> Option<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut used = 0usize;

    for path in candidate_files(cwd) {
        let Some(content) = read_non_empty(&path) else {
            continue;
        };
        let section = format!("### {}\n\n{}", path.display(), content.trim());
        let overhead = if sections.is_empty() { 0 } else { SEPARATOR.len() };
        let remaining = max_bytes.saturating_sub(used + overhead);
        if remaining == 0 {
            break;
        }

        let section = truncate_to_boundary(&section, remaining);
        used += overhead + section.len();
        debug!("Loaded project context from {}", path.display());
        sections.push(section);
    }

    if sections.is_empty() {
        debug!("No project context found from {}", cwd.display());
        return None;
    }
    Some(sections.join(SEPARATOR))
}

fn candidate_files(cwd: &Path) -> Vec<PathBuf> {
    cwd.ancestors()
        .flat_map(|dir| CONTEXT_FILENAMES.iter().map(move |name| dir.join(name)))
        .collect()
}

/// Read a file and return its contents if non-empty, otherwise `None`.
fn read_non_empty(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) if !content.trim().is_empty() => Some(content),
        Ok(_) => None,
        Err(e) => {
            debug!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

fn truncate_to_boundary(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn loads_claude_md_from_cwd() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "CLAUDE.md", "# Project Instructions\nDo the thing.");

        let text = collect_project_context(tmp.path(), 8_000).unwrap();
        assert!(text.contains("Do the thing."));
        assert!(text.contains("### "));
    }

    #[test]
    fn nearest_directory_comes_first() {
        let outer = TempDir::new().unwrap();
        let inner = outer.path().join("subdir");
        fs::create_dir_all(&inner).unwrap();
        write(outer.path(), "CLAUDE.md", "outer instructions");
        write(&inner, "README.md", "inner readme");

        let text = collect_project_context(&inner, 8_000).unwrap();
        let inner_pos = text.find("inner readme").unwrap();
        let outer_pos = text.find("outer instructions").unwrap();
        assert!(inner_pos < outer_pos);
        assert!(text.contains("---"));
    }

    #[test]
    fn claude_md_before_readme_in_same_directory() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "README.md", "readme text");
        write(tmp.path(), "CLAUDE.md", "claude text");

        let text = collect_project_context(tmp.path(), 8_000).unwrap();
        assert!(text.find("claude text").unwrap() < text.find("readme text").unwrap());
    }

    #[test]
    fn respects_byte_limit() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "CLAUDE.md", &"é".repeat(5_000));

        let text = collect_project_context(tmp.path(), 1_000).unwrap();
        assert!(text.len() <= 1_000);
    }

    #[test]
    fn skips_empty_files() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "CLAUDE.md", "   \n   ");

        if let Some(text) = collect_project_context(tmp.path(), 8_000) {
            assert!(!text.contains(&tmp.path().join("CLAUDE.md").display().to_string()));
        }
    }
}
