// Project context attached to evaluation prompts
//
// Collects project-level instructions (CLAUDE.md, README.md) so the evaluator
// can judge a plan against the conventions of the repository it targets.

pub mod claude_md;
pub use claude_md::collect_project_context;
