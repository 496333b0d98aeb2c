// Drover Infrastructure - SQLite Adapter
// Implements: JobStore (durable store with the atomic claim primitive)

mod connection;
mod job_store;
mod migration;

pub use connection::create_pool;
pub use job_store::SqliteJobStore;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by a helper in job_store.rs
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
