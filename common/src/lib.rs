pub mod agent;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod llm;
pub mod locale;
pub mod pipeline;
pub mod schema;
pub mod tracing;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Nl2SqlError, Result};
pub use pipeline::{Answer, Pipeline};
