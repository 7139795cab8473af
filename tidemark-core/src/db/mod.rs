//! SQLite persistence: schema migrations and the repository layer

pub mod repo;
pub mod schema;

pub use repo::Database;
