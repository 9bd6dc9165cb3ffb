pub mod cache;
pub mod descriptor;

pub use cache::SchemaCache;
pub use descriptor::{ColumnInfo, SchemaDescriptor, TableInfo};
