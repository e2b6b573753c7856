//! CLI command handlers, one per file.

mod checksum;
mod completions;
mod plan;
mod upload;

pub use checksum::run_checksum;
pub use completions::{run_completions, run_man};
pub use plan::run_plan;
pub use upload::run_upload;
