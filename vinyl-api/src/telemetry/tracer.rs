//! OpenTelemetry Tracer Initialization
//!
//! Sets up an OTLP/HTTP exporter for distributed tracing compatible with:
//! - Jaeger
//! - Grafana Tempo
//! - Any OTLP-compatible backend

use std::str::FromStr;

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::env_or;
use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "vinyl_api=debug,tower_http=info,info";

/// Output format of the log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// OTLP/HTTP endpoint for traces (e.g., "http://localhost:4318/v1/traces")
    pub otlp_endpoint: Option<String>,
    /// Service name for traces
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// Trace sampling ratio (0.0 to 1.0)
    pub trace_sample_rate: f64,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            service_name: "vinyl-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            trace_sample_rate: 1.0,
            log_format: LogFormat::Json,
        }
    }
}

impl TelemetryConfig {
    pub fn from_env(service_name: &str) -> Self {
        Self::from_lookup(&|key: &str| std::env::var(key).ok(), service_name)
    }

    pub(crate) fn from_lookup<F>(lookup: &F, service_name: &str) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            otlp_endpoint: lookup("VINYL_OTLP_ENDPOINT").filter(|s| !s.trim().is_empty()),
            service_name: service_name.to_string(),
            service_version: defaults.service_version,
            environment: lookup("VINYL_ENVIRONMENT").unwrap_or(defaults.environment),
            trace_sample_rate: env_or(lookup, "VINYL_TRACE_SAMPLE_RATE", defaults.trace_sample_rate),
            log_format: env_or(lookup, "VINYL_LOG_FORMAT", defaults.log_format),
        }
    }

    fn sampler(&self) -> Sampler {
        if self.trace_sample_rate >= 1.0 {
            Sampler::AlwaysOn
        } else if self.trace_sample_rate <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.trace_sample_rate)
        }
    }
}

/// Keeps the tracer provider alive; call [`TelemetryGuard::shutdown`] before exit.
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl TelemetryGuard {
    /// Flush pending spans and stop the exporter.
    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            tracing::warn!(error = %e, "Tracer shutdown failed");
        } else {
            tracing::info!("Tracer shutdown complete");
        }
    }
}

/// Initialize the OpenTelemetry tracer and tracing subscriber.
///
/// Call once at startup before any tracing occurs. Installs:
/// - OTLP exporter for distributed traces (if an endpoint is configured)
/// - TraceContext propagation (W3C traceparent header)
/// - tracing-subscriber with env filter, log sink and OpenTelemetry layer
pub fn init_telemetry(config: &TelemetryConfig) -> ApiResult<TelemetryGuard> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new("service.version", config.service_version.clone()),
            KeyValue::new("deployment.environment", config.environment.clone()),
        ])
        .build();

    let mut builder = SdkTracerProvider::builder()
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    if let Some(endpoint) = &config.otlp_endpoint {
        let exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint.clone())
            .build()
            .map_err(|e| {
                ApiError::internal_error(format!("Failed to create OTLP exporter: {}", e))
            })?;
        builder = builder.with_batch_exporter(exporter);
    }

    let provider = builder.build();
    let tracer = provider.tracer(config.service_name.clone());
    global::set_tracer_provider(provider.clone());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { provider })
}
