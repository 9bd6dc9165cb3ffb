use crate::config::DatabaseConfig;
use crate::db::store::{CatalogColumn, RelationalStore, Row};
use crate::error::Result;
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

const CATALOG_QUERY: &str = "SELECT table_name::text, column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = $1 \
     ORDER BY table_name, ordinal_position";

/// postgres store that opens a fresh connection per operation
pub struct PgStore {
    config: tokio_postgres::Config,
    namespace: String,
}

impl PgStore {
    pub fn new(db: &DatabaseConfig, namespace: impl Into<String>) -> Self {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&db.host)
            .port(db.port)
            .dbname(&db.dbname)
            .user(&db.user)
            .password(&db.password)
            .connect_timeout(db.timeout)
            .application_name("nl2sql");

        Self {
            config,
            namespace: namespace.into(),
        }
    }

    /// session setup sent right after connecting
    fn session_setup(&self) -> String {
        format!(
            "SET search_path TO \"{}\"; SET default_transaction_read_only = on;",
            self.namespace
        )
    }

    /// the returned client owns the connection; dropping it closes the socket
    async fn connect(&self) -> Result<Client> {
        let (client, connection) = self.config.connect(NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection closed with error");
            }
        });

        client.batch_execute(&self.session_setup()).await?;
        Ok(client)
    }
}

#[async_trait]
impl RelationalStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn fetch_columns(&self, namespace: &str) -> Result<Vec<CatalogColumn>> {
        let client = self.connect().await?;
        let rows = client.query(CATALOG_QUERY, &[&namespace]).await?;

        rows.iter()
            .map(|row| -> Result<CatalogColumn> {
                Ok(CatalogColumn {
                    table_name: row.try_get(0)?,
                    column_name: row.try_get(1)?,
                    data_type: row.try_get(2)?,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    async fn run_query(&self, sql: &str) -> Result<Vec<Row>> {
        let client = self.connect().await?;

        // simple protocol returns every value in text form, which is all the
        // renderer needs
        let messages = client.simple_query(sql).await?;

        let rows = messages
            .into_iter()
            .filter_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(
                    (0..row.len())
                        .map(|idx| row.get(idx).map(str::to_string))
                        .collect::<Row>(),
                ),
                _ => None,
            })
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_setup_pins_namespace() {
        let store = PgStore::new(&DatabaseConfig::default(), "ortocenter");
        let setup = store.session_setup();
        assert!(setup.starts_with("SET search_path TO \"ortocenter\";"));
        assert!(setup.contains("default_transaction_read_only = on"));
    }

    #[test]
    fn test_catalog_query_filters_namespace() {
        assert!(CATALOG_QUERY.contains("table_schema = $1"));
        assert!(CATALOG_QUERY.contains("ORDER BY table_name, ordinal_position"));
    }
}
