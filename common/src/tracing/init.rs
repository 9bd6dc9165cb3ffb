use crate::error::{Nl2SqlError, Result};
use opentelemetry::{trace::TracerProvider as _, KeyValue};
use opentelemetry_sdk::Resource;
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// flushes pending spans when the process shuts down
pub struct OtelGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("error shutting down tracer provider: {}", e);
            }
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| {
            let v = v.to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}

fn default_filter() -> EnvFilter {
    // the http stack is chatty at debug
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn,tokio_postgres=warn".into())
}

pub fn init_tracing(service_name: &str) -> Result<OtelGuard> {
    let enabled = env_flag("NL2SQL_ENABLE_TRACING");

    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .ok()
        .filter(|s| !s.is_empty());

    let endpoint_url = match endpoint {
        Some(url) if enabled => url,
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(default_filter())
                .try_init()
                .map_err(|e| Nl2SqlError::Tracing(e.to_string()))?;

            tracing::info!("basic logging initialized (service={})", service_name);

            return Ok(OtelGuard {
                tracer_provider: None,
            });
        }
    };

    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint_url)
        .build()
        .map_err(|e| Nl2SqlError::Tracing(format!("exporter build failed: {}", e)))?;

    let resource = Resource::builder_empty()
        .with_attribute(KeyValue::new("service.name", service_name.to_string()))
        .build();

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let telemetry =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));

    tracing_subscriber::registry()
        .with(telemetry)
        .with(tracing_subscriber::fmt::layer())
        .with(default_filter())
        .try_init()
        .map_err(|e| Nl2SqlError::Tracing(e.to_string()))?;

    tracing::info!(
        "opentelemetry tracing initialized for {} (endpoint: {})",
        service_name,
        endpoint_url
    );

    Ok(OtelGuard {
        tracer_provider: Some(provider),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flag_parsing() {
        env::set_var("NL2SQL_TEST_FLAG_ON", "Yes");
        env::set_var("NL2SQL_TEST_FLAG_OFF", "0");
        assert!(env_flag("NL2SQL_TEST_FLAG_ON"));
        assert!(!env_flag("NL2SQL_TEST_FLAG_OFF"));
        assert!(!env_flag("NL2SQL_TEST_FLAG_MISSING"));
    }

    #[test]
    fn test_second_init_reports_error() {
        let _guard = init_tracing("test");
        // global subscriber is already set at this point
        let again = init_tracing("test");
        assert!(matches!(again, Err(Nl2SqlError::Tracing(_))));
    }
}
