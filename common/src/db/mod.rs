pub mod executor;
pub mod postgres;
pub mod store;

pub use executor::{ExecutionResult, QueryExecutor};
pub use postgres::PgStore;
pub use store::{CatalogColumn, RelationalStore, Row};
