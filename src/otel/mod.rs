//! OpenTelemetry integration for notion-sync
//!
//! This module sets up structured logging and, when enabled, OTLP export of
//! traces and metrics for the Notion requests and sync outcomes.

use crate::config::{LoggingConfig, OtelConfig};
use crate::error::OtelError;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, MeterProvider as _},
    trace::TracerProvider as TracerProviderTrait,
    KeyValue,
};
use opentelemetry_sdk::{metrics::SdkMeterProvider, trace::TracerProvider, Resource};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// OpenTelemetry provider for notion-sync
///
/// Manages tracing and metrics providers with OTLP export capability.
pub struct OtelProvider {
    tracer_provider: Option<TracerProvider>,
    meter_provider: SdkMeterProvider,
    config: OtelConfig,
}

impl OtelProvider {
    /// Create a new OtelProvider with the given configuration
    pub fn new(config: &OtelConfig) -> Result<Self, OtelError> {
        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            config.service_name.clone(),
        )]);

        let (tracer_provider, meter_provider) = if config.enabled {
            let endpoint = config.endpoint.as_ref().ok_or_else(|| {
                OtelError::Config("OTLP endpoint is required when enabled".into())
            })?;

            let tracer_provider = Self::init_tracer_provider(endpoint, &resource)?;
            let meter_provider = Self::init_meter_provider(endpoint, &resource)?;

            (Some(tracer_provider), meter_provider)
        } else {
            // Use no-op meter provider when disabled
            let meter_provider = SdkMeterProvider::builder().with_resource(resource).build();
            (None, meter_provider)
        };

        // Set global tracer provider
        if let Some(ref tp) = tracer_provider {
            global::set_tracer_provider(tp.clone());
        }

        Ok(Self {
            tracer_provider,
            meter_provider,
            config: config.clone(),
        })
    }

    /// Initialize tracer provider with OTLP exporter
    fn init_tracer_provider(
        endpoint: &str,
        resource: &Resource,
    ) -> Result<TracerProvider, OtelError> {
        use opentelemetry_otlp::WithExportConfig;
        use opentelemetry_sdk::runtime;
        use opentelemetry_sdk::trace::{Config, Sampler};

        let exporter = opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint)
            .build_span_exporter()
            .map_err(|e| OtelError::TracerInit(e.to_string()))?;

        let trace_config = Config::default()
            .with_sampler(Sampler::AlwaysOn)
            .with_resource(resource.clone());

        Ok(TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_config(trace_config)
            .build())
    }

    fn init_meter_provider(
        endpoint: &str,
        resource: &Resource,
    ) -> Result<SdkMeterProvider, OtelError> {
        use opentelemetry_otlp::{MetricsExporterBuilder, WithExportConfig};
        use opentelemetry_sdk::metrics::reader::{
            DefaultAggregationSelector, DefaultTemporalitySelector,
        };
        use opentelemetry_sdk::{metrics::PeriodicReader, runtime};

        let exporter = MetricsExporterBuilder::from(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .build_metrics_exporter(
            Box::new(DefaultTemporalitySelector::new()),
            Box::new(DefaultAggregationSelector::new()),
        )
        .map_err(|e| OtelError::MeterInit(e.to_string()))?;

        let reader = PeriodicReader::builder(exporter, runtime::Tokio).build();

        Ok(SdkMeterProvider::builder()
            .with_resource(resource.clone())
            .with_reader(reader)
            .build())
    }

    /// Get a tracer from the provider
    pub fn tracer(&self, name: &'static str) -> opentelemetry_sdk::trace::Tracer {
        match self.tracer_provider {
            Some(ref tp) => tp.tracer(name),
            // Return a no-op tracer when disabled
            None => TracerProvider::builder().build().tracer(name),
        }
    }

    /// Get the meter for creating metrics
    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(self.config.service_name.clone())
    }

    /// Check if OpenTelemetry is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Flush and shut down the providers
    pub fn shutdown(&self) -> Result<(), OtelError> {
        if let Err(e) = self.meter_provider.shutdown() {
            return Err(OtelError::Shutdown(format!(
                "Meter shutdown failed: {:?}",
                e
            )));
        }

        // Force flush any remaining spans
        if let Some(ref tp) = self.tracer_provider {
            for result in tp.force_flush() {
                if let Err(e) = result {
                    return Err(OtelError::Shutdown(format!("Tracer flush failed: {:?}", e)));
                }
            }
        }

        Ok(())
    }
}

impl Drop for OtelProvider {
    fn drop(&mut self) {
        // Best-effort shutdown on drop
        let _ = self.shutdown();
    }
}

/// Sync metrics
///
/// Shared by the Notion client (per-attempt counters) and the dispatcher
/// (per-entity outcomes).
pub struct Metrics {
    /// HTTP attempts against the Notion API
    pub attempts_total: Counter<u64>,

    /// Attempts that were followed by a retry
    pub retries_total: Counter<u64>,

    /// Duration of one logical request, retries included
    pub request_duration: Histogram<f64>,

    /// Synchronizer outcomes
    pub sync_outcomes_total: Counter<u64>,
}

impl Metrics {
    /// Create new metrics with the given meter
    pub fn new(meter: &Meter) -> Self {
        let attempts_total = meter
            .u64_counter("notion_sync_attempts_total")
            .with_description("Total number of HTTP attempts against the Notion API")
            .init();

        let retries_total = meter
            .u64_counter("notion_sync_retries_total")
            .with_description("Total number of retried Notion requests")
            .init();

        let request_duration = meter
            .f64_histogram("notion_sync_request_duration_seconds")
            .with_description("Notion request duration in seconds, retries included")
            .init();

        let sync_outcomes_total = meter
            .u64_counter("notion_sync_outcomes_total")
            .with_description("Synchronizer outcomes by entity kind")
            .init();

        Self {
            attempts_total,
            retries_total,
            request_duration,
            sync_outcomes_total,
        }
    }

    /// Record one HTTP attempt; `status` is `None` for transport failures
    pub fn record_attempt(&self, method: &str, status: Option<u16>) {
        self.attempts_total.add(
            1,
            &[
                KeyValue::new("method", method.to_string()),
                KeyValue::new("status_class", status_class(status)),
            ],
        );
    }

    /// Record a retry
    pub fn record_retry(&self, method: &str) {
        self.retries_total
            .add(1, &[KeyValue::new("method", method.to_string())]);
    }

    /// Record request duration
    pub fn record_request_duration(&self, method: &str, duration_secs: f64) {
        self.request_duration.record(
            duration_secs,
            &[KeyValue::new("method", method.to_string())],
        );
    }

    /// Record the outcome of one synchronizer run
    pub fn record_outcome(&self, entity: &str, outcome: &str) {
        self.sync_outcomes_total.add(
            1,
            &[
                KeyValue::new("entity", entity.to_string()),
                KeyValue::new("outcome", outcome.to_string()),
            ],
        );
    }
}

fn status_class(status: Option<u16>) -> &'static str {
    match status {
        None => "transport",
        Some(200..=299) => "2xx",
        Some(400..=499) => "4xx",
        Some(500..=599) => "5xx",
        Some(_) => "other",
    }
}

fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize the tracing subscriber
///
/// `logging.format` selects JSON (default) or human-readable output. The
/// OpenTelemetry layer is only installed when the provider is enabled.
pub fn init_tracing(otel: &OtelProvider, logging: &LoggingConfig) -> Result<(), OtelError> {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(parse_level(&logging.level));

    let fmt_layer = if logging.format.eq_ignore_ascii_case("pretty") {
        tracing_subscriber::fmt::layer().with_target(false).boxed()
    } else {
        tracing_subscriber::fmt::layer().json().boxed()
    };

    let otel_layer = otel
        .is_enabled()
        .then(|| tracing_opentelemetry::layer().with_tracer(otel.tracer("notion-sync")));

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| OtelError::TracerInit(e.to_string()))
}
