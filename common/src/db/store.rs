use crate::error::Result;
use async_trait::async_trait;

/// one result tuple, each cell in its text form (`None` for sql null)
pub type Row = Vec<Option<String>>;

/// one line of `information_schema.columns`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
}

impl CatalogColumn {
    pub fn new(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            column_name: column_name.into(),
            data_type: data_type.into(),
        }
    }
}

/// the relational store as seen by the pipeline.
///
/// every call is its own unit of work: implementations open a connection,
/// do the round trip and release the connection before returning.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// columns of every table under `namespace`, in catalog order
    async fn fetch_columns(&self, namespace: &str) -> Result<Vec<CatalogColumn>>;

    /// run a single read-only statement and return all of its rows
    async fn run_query(&self, sql: &str) -> Result<Vec<Row>>;
}
