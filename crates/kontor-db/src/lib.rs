//! PostgreSQL database layer for Kontor

pub mod pool;
pub mod query;
pub mod repositories;
pub mod schema;

pub use pool::{create_pool, DatabaseConfig};
pub use repositories::*;
pub use schema::apply_schema;
