use crate::config::{Config, Env};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::env;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,reservations_services=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Runs `f` under a temporary fmt subscriber, for work that happens before
/// the configuration needed by [`init_tracing`] exists.
pub fn with_bootstrap<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::with_default(subscriber, f)
}

/// Installs the global subscriber.
///
/// Local and test environments print human readable lines. Production emits
/// Stackdriver JSON, linked to Cloud Trace when `GOOGLE_CLOUD_PROJECT` is set.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    if !matches!(config.environment(), Env::Prod) {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
        return Ok(());
    }

    // Set the global propagator to trace-context (W3C)
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = tracing_opentelemetry::layer();

    match env::var("GOOGLE_CLOUD_PROJECT") {
        Ok(project_id) => {
            let stackdriver_layer = tracing_stackdriver::layer()
                .with_cloud_trace(CloudTraceConfiguration { project_id });
            tracing_subscriber::registry()
                .with(env_filter())
                .with(otel_layer)
                .with(stackdriver_layer)
                .try_init()?;
        }
        Err(_) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(otel_layer)
                .with(tracing_stackdriver::layer())
                .try_init()?;
            tracing::info!("GOOGLE_CLOUD_PROJECT not set, logging without Cloud Trace links");
        }
    }

    Ok(())
}
