use crate::agent::validator::ExecutableQuery;
use crate::db::store::{RelationalStore, Row};
use crate::error::{Nl2SqlError, Result};
use std::sync::Arc;
use std::time::Duration;

/// outcome of running a validated statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Rows(Vec<Row>),
    Failure {
        message: String,
        original_query: String,
    },
}

impl ExecutionResult {
    pub fn into_rows(self) -> Result<Vec<Row>> {
        match self {
            ExecutionResult::Rows(rows) => Ok(rows),
            ExecutionResult::Failure {
                message,
                original_query,
            } => Err(Nl2SqlError::ExecutionFailure {
                message,
                query: original_query,
            }),
        }
    }
}

pub struct QueryExecutor {
    store: Arc<dyn RelationalStore>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn RelationalStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// runs the statement; database errors and timeouts come back as
    /// `ExecutionResult::Failure` instead of an `Err`
    #[tracing::instrument(skip(self, query), fields(sql = %query.as_str()))]
    pub async fn execute(&self, query: &ExecutableQuery) -> ExecutionResult {
        let outcome = tokio::time::timeout(self.timeout, self.store.run_query(query.as_str())).await;

        let message = match outcome {
            Ok(Ok(rows)) => {
                tracing::info!(row_count = rows.len(), "query executed");
                return ExecutionResult::Rows(rows);
            }
            Ok(Err(Nl2SqlError::Database(message))) => message,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("query timed out after {} ms", self.timeout.as_millis()),
        };

        tracing::error!(error = %message, "query execution failed");

        ExecutionResult::Failure {
            message,
            original_query: query.as_str().to_string(),
        }
    }
}
