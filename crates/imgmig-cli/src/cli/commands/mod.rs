//! CLI command handlers. Each command is in its own file.

mod download;
mod run;
mod shared;
mod status;
mod upload;

pub use download::run_download;
pub use run::run_migration;
pub use status::run_status;
pub use upload::run_upload;
