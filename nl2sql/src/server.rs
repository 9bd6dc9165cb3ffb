use anyhow::Result;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use common::{Nl2SqlError, Pipeline};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const LOCALE_WARNING: &str =
    "A pergunta não parece estar em português; a resposta pode ser imprecisa.";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// - `GET /query?pergunta=...` answers one question
/// - `GET /` liveness acknowledgment
pub fn create_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/query", get(query))
        .route("/", get(home))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

pub async fn serve(config: &ServerConfig, pipeline: Arc<Pipeline>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "listening");

    axum::serve(listener, create_router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown requested");
}

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub pergunta: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub resposta: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aviso: Option<String>,
}

async fn query(
    State(pipeline): State<Arc<Pipeline>>,
    Query(params): Query<QueryParams>,
) -> std::result::Result<Json<QueryResponse>, ApiError> {
    let answer = pipeline.answer(&params.pergunta).await?;

    tracing::debug!(sql = %answer.sql, "answered question");

    Ok(Json(QueryResponse {
        resposta: answer.text,
        aviso: answer.locale_flagged.then(|| LOCALE_WARNING.to_string()),
    }))
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "API funcionando" }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    erro: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_sql: Option<String>,
}

/// pipeline error on its way to an http response
#[derive(Debug)]
pub struct ApiError(Nl2SqlError);

impl From<Nl2SqlError> for ApiError {
    fn from(e: Nl2SqlError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Nl2SqlError::ValidationRejected { .. }
            | Nl2SqlError::UnsupportedLocale { .. }
            | Nl2SqlError::EmptyQuestion => StatusCode::BAD_REQUEST,
            Nl2SqlError::SchemaUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Nl2SqlError::LanguageModel(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self.0 {
            Nl2SqlError::ExecutionFailure { message, query } => ErrorBody {
                erro: message,
                query_sql: Some(query),
            },
            other => {
                let query_sql = match &other {
                    Nl2SqlError::ValidationRejected { query, .. } => Some(query.clone()),
                    _ => None,
                };
                ErrorBody {
                    erro: other.to_string(),
                    query_sql,
                }
            }
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), erro = %body.erro, "request failed");
        } else {
            tracing::info!(status = status.as_u16(), erro = %body.erro, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}
