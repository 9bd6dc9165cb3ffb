use crate::db::store::RelationalStore;
use crate::error::{Nl2SqlError, Result};
use crate::schema::descriptor::SchemaDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// lazily populated schema metadata shared by every request.
///
/// failures are not cached: the next caller queries the catalog again.
pub struct SchemaCache {
    store: Arc<dyn RelationalStore>,
    namespace: String,
    timeout: Duration,
    cached: RwLock<Option<Arc<SchemaDescriptor>>>,
}

impl SchemaCache {
    pub fn new(store: Arc<dyn RelationalStore>, namespace: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            timeout,
            cached: RwLock::new(None),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn is_warm(&self) -> bool {
        self.cached.read().await.is_some()
    }

    #[tracing::instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get_schema(&self) -> Result<Arc<SchemaDescriptor>> {
        if let Some(schema) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(schema));
        }

        // writers queue here; whoever gets the lock first does the fetch
        let mut slot = self.cached.write().await;
        if let Some(schema) = slot.as_ref() {
            return Ok(Arc::clone(schema));
        }

        tracing::info!("loading schema metadata from catalog");

        let columns = match tokio::time::timeout(
            self.timeout,
            self.store.fetch_columns(&self.namespace),
        )
        .await
        {
            Ok(Ok(columns)) => columns,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "schema metadata query failed");
                return Err(Nl2SqlError::SchemaUnavailable(e.to_string()));
            }
            Err(_) => {
                tracing::error!("schema metadata query timed out");
                return Err(Nl2SqlError::SchemaUnavailable(format!(
                    "catalog query timed out after {} ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let schema = SchemaDescriptor::from_catalog(&self.namespace, columns);
        if schema.is_empty() {
            return Err(Nl2SqlError::SchemaUnavailable(format!(
                "namespace '{}' has no tables",
                self.namespace
            )));
        }

        tracing::info!(table_count = schema.tables().len(), "schema metadata cached");

        let schema = Arc::new(schema);
        *slot = Some(Arc::clone(&schema));
        Ok(schema)
    }

    /// drop the cached descriptor so the next request reloads it
    pub async fn invalidate(&self) {
        if self.cached.write().await.take().is_some() {
            tracing::info!(namespace = %self.namespace, "schema cache invalidated");
        }
    }
}
