// Planman - plan quality gate for coding-agent hooks
// Library exports

pub mod config;
pub mod context;
pub mod evaluator;
pub mod hooks;
pub mod logging;
pub mod planning;
pub mod session;
