//! in-memory stand-ins for the database and the language model

use crate::db::store::{CatalogColumn, RelationalStore, Row};
use crate::error::{Nl2SqlError, Result};
use crate::llm::model::{LanguageModel, Message};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) fn catalog() -> Vec<CatalogColumn> {
    vec![
        CatalogColumn::new("agenda", "id", "integer"),
        CatalogColumn::new("agenda", "paciente_id", "integer"),
        CatalogColumn::new("agenda", "data_agendamento", "timestamp without time zone"),
        CatalogColumn::new("pacientes", "id", "integer"),
        CatalogColumn::new("pacientes", "nome", "text"),
        CatalogColumn::new("pacientes", "data_nascimento", "date"),
    ]
}

pub(crate) struct FakeStore {
    columns: Vec<CatalogColumn>,
    catalog_failures: AtomicUsize,
    catalog_delay: Option<Duration>,
    query_delay: Option<Duration>,
    result: std::result::Result<Vec<Row>, String>,
    catalog_calls: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self::with_catalog(catalog())
    }

    pub(crate) fn with_catalog(columns: Vec<CatalogColumn>) -> Self {
        Self {
            columns,
            catalog_failures: AtomicUsize::new(0),
            catalog_delay: None,
            query_delay: None,
            result: Ok(Vec::new()),
            catalog_calls: AtomicUsize::new(0),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.result = Ok(rows);
        self
    }

    pub(crate) fn failing_query(mut self, message: &str) -> Self {
        self.result = Err(message.to_string());
        self
    }

    /// fail the next `times` catalog fetches
    pub(crate) fn failing_catalog(self, times: usize) -> Self {
        self.catalog_failures.store(times, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_catalog_delay(mut self, delay: Duration) -> Self {
        self.catalog_delay = Some(delay);
        self
    }

    pub(crate) fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub(crate) fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelationalStore for FakeStore {
    async fn fetch_columns(&self, namespace: &str) -> Result<Vec<CatalogColumn>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.catalog_delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.catalog_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.catalog_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Nl2SqlError::Database("connection refused".to_string()));
        }

        assert_eq!(namespace, "ortocenter");
        Ok(self.columns.clone())
    }

    async fn run_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }

        self.result.clone().map_err(Nl2SqlError::Database)
    }
}

/// replays canned completions in order and records every request
pub(crate) struct ScriptedModel {
    responses: Mutex<VecDeque<std::result::Result<String, String>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub(crate) fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(message.to_string())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        self.requests.lock().unwrap().push(messages);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(Nl2SqlError::LanguageModel(message)),
            None => Err(Nl2SqlError::LanguageModel(
                "scripted model has no responses left".to_string(),
            )),
        }
    }
}
