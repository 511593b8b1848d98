// Plan identity: content hashes and fingerprints that survive revisions

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Characters of the plan body that feed the fingerprint prefix hash.
const FINGERPRINT_PREFIX_CHARS: usize = 500;

/// Maximum title length taken from a non-heading opening line.
const MAX_TITLE_CHARS: usize = 120;

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Short, whitespace-insensitive content hash used for change detection.
///
/// ```
/// use planman::planning::content_hash;
/// assert_eq!(content_hash("a  b\n"), content_hash("a b"));
/// ```
pub fn content_hash(text: &str) -> String {
    let mut hash = sha256_hex(&normalize_whitespace(text));
    hash.truncate(16);
    hash
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Identity of an inline plan: its title plus a hash of its opening content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub title: String,
    pub prefix_hash: String,
}

impl Fingerprint {
    /// Compute the fingerprint of `text`.
    ///
    /// The title is the first non-blank line, kept whole when it is a markdown
    /// heading and cut to 120 characters otherwise. Edits past the first 500
    /// characters that leave the title alone keep the fingerprint stable.
    pub fn of(text: &str) -> Self {
        let title = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| {
                if line.starts_with('#') {
                    line.to_string()
                } else {
                    line.chars().take(MAX_TITLE_CHARS).collect()
                }
            })
            .unwrap_or_default();

        let prefix: String = text.chars().take(FINGERPRINT_PREFIX_CHARS).collect();
        let mut prefix_hash = sha256_hex(&normalize_whitespace(&prefix));
        prefix_hash.truncate(8);

        Self { title, prefix_hash }
    }

    /// Parse the `title|hash` form stored in session state.
    pub fn parse(stored: &str) -> Option<Self> {
        let (title, prefix_hash) = stored.rsplit_once('|')?;
        Some(Self {
            title: title.to_string(),
            prefix_hash: prefix_hash.to_string(),
        })
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.title, self.prefix_hash)
    }
}

/// The handle deciding whether two plan texts are the same plan, revised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanIdentity {
    /// Plan text lives in a tracked file; the normalized path is the identity
    File(PathBuf),
    /// Inline plan with no stable handle
    Fingerprint(Fingerprint),
}

/// What a new evaluation does to the round counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundTransition {
    /// New plan (or new planning context): start again at round 1
    Reset,
    /// Same plan, revised: next round
    Increment,
}

/// Decide the round transition from the previously recorded identity.
pub fn round_transition(
    previous: Option<&PlanIdentity>,
    next: &PlanIdentity,
    stale: bool,
) -> RoundTransition {
    match previous {
        Some(prev) if prev == next && !stale => RoundTransition::Increment,
        _ => RoundTransition::Reset,
    }
}
