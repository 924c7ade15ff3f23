use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{self as sdk, Resource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "info,tower_http=warn,sqlx=warn";

#[derive(Clone, Debug)]
pub struct ObsConfig {
    pub service_name: String,
    pub env_filter: Option<String>,
    pub otlp_endpoint: Option<String>,
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            service_name: "empleados-server".into(),
            env_filter: None,
            otlp_endpoint: None,
        }
    }
}

impl ObsConfig {
    /// `RUST_LOG` and `OTLP_ENDPOINT` fill fields left unset.
    pub fn with_env(mut self) -> Self {
        self.env_filter = self.env_filter.or_else(|| std::env::var("RUST_LOG").ok());
        self.otlp_endpoint = self
            .otlp_endpoint
            .or_else(|| std::env::var("OTLP_ENDPOINT").ok())
            .filter(|endpoint| !endpoint.trim().is_empty());
        self
    }

    fn filter(&self) -> &str {
        self.env_filter
            .as_deref()
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
            .unwrap_or(DEFAULT_FILTER)
    }
}

type OtlpTracer = <sdk::trace::SdkTracerProvider as TracerProvider>::Tracer;

/// Installs the global subscriber once; repeated calls return `Ok`.
pub fn init_tracing(config: ObsConfig) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }
    let config = config.with_env();
    let tracer = config
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| otlp_tracer(endpoint, &config.service_name))
        .transpose()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(config.filter())?)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()?;

    INIT.set(())
        .map_err(|_| anyhow!("tracing already initialized"))?;
    Ok(())
}

// Spans leave in batches over OTLP/HTTP protobuf.
fn otlp_tracer(endpoint: &str, service_name: &str) -> Result<OtlpTracer> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(endpoint)
        .build()?;
    let resource = Resource::builder()
        .with_service_name(service_name.to_owned())
        .build();
    let provider = sdk::trace::SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();
    Ok(provider.tracer(service_name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filter_falls_back_to_default() {
        let config = ObsConfig {
            env_filter: Some("  ".into()),
            ..ObsConfig::default()
        };
        assert_eq!(config.filter(), DEFAULT_FILTER);
    }

    #[test]
    fn explicit_filter_wins() {
        let config = ObsConfig {
            env_filter: Some("debug".into()),
            ..ObsConfig::default()
        };
        assert_eq!(config.with_env().filter(), "debug");
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
