// storage/mod.rs
// Report and change-history persistence

mod migrations;
mod models;
mod pool;
mod store;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use models::{NewChangeEvent, NewReport, ParseReportSourceError, Report, ReportSource};
pub use pool::{init_db_pool_with_path, init_memory_pool};
pub use store::{ReportStore, SqliteStore};
