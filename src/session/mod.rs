// Per-session state shared by short-lived hook processes through files

mod marker;
mod paths;
mod state;
mod store;

pub use marker::{MarkerStore, OwnershipMarker, RecentEvaluationMarker};
pub use paths::{normalize_path, sanitize_session_id};
pub use state::{unix_now, SessionState};
pub use store::{FileSessionStore, SessionStore, StoreError};

pub(crate) use store::write_atomic;
