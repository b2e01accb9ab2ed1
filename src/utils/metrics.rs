use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use once_cell::sync::Lazy;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::global;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Registry, TextEncoder};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::error::{DisperserError, DisperserResult};

pub static DISPERSER_METRICS: Lazy<DisperserMetrics> = Lazy::new(DisperserMetrics::register);

pub struct DisperserMetrics {
    /// Per-RPC latency in milliseconds, labeled by operation.
    pub rpc_latency: Histogram<f64>,
    /// Requests served successfully, labeled by operation.
    pub successful_requests: Counter<u64>,
    /// Requests that failed, labeled by operation.
    pub failed_requests: Counter<u64>,
    /// Raw blob bytes accepted for dispersal.
    pub ingested_bytes: Counter<u64>,
    /// Blobs packed into batches.
    pub blobs_batched: Counter<u64>,
    /// Per-blob encoding failures.
    pub encoding_failures: Counter<u64>,
    /// Batches confirmed on chain.
    pub batches_confirmed: Counter<u64>,
    /// Batches dropped after a chain or storage-cluster failure.
    pub batches_failed: Counter<u64>,
    /// Blobs promoted to finalized.
    pub blobs_finalized: Counter<u64>,
    /// Latest finalized block observed on chain.
    pub latest_finalized_block: Gauge<u64>,
    /// Wall time of one batcher iteration in milliseconds.
    pub batch_latency: Histogram<f64>,
}

impl DisperserMetrics {
    fn register() -> Self {
        let meter = global::meter("disperser");

        Self {
            rpc_latency: histogram(&meter, "rpc_latency", "Latency of disperser RPC handlers", "ms"),
            successful_requests: counter(&meter, "successful_requests", "Count of successful requests"),
            failed_requests: counter(&meter, "failed_requests", "Count of failed requests"),
            ingested_bytes: counter(&meter, "ingested_bytes", "Raw blob bytes accepted for dispersal"),
            blobs_batched: counter(&meter, "blobs_batched", "Blobs packed into batches"),
            encoding_failures: counter(&meter, "encoding_failures", "Per-blob encoding failures"),
            batches_confirmed: counter(&meter, "batches_confirmed", "Batches confirmed on chain"),
            batches_failed: counter(&meter, "batches_failed", "Batches dropped before confirmation"),
            blobs_finalized: counter(&meter, "blobs_finalized", "Blobs promoted to finalized"),
            latest_finalized_block: meter
                .u64_gauge("latest_finalized_block")
                .with_description("Latest finalized block observed on chain")
                .build(),
            batch_latency: histogram(&meter, "batch_latency", "Wall time of one batcher iteration", "ms"),
        }
    }
}

fn counter(meter: &Meter, name: &'static str, description: &'static str) -> Counter<u64> {
    meter.u64_counter(name).with_description(description).build()
}

fn histogram(meter: &Meter, name: &'static str, description: &'static str, unit: &'static str) -> Histogram<f64> {
    meter.f64_histogram(name).with_description(description).with_unit(unit).build()
}

/// Installs the Prometheus-backed meter provider and returns the registry the
/// exposition endpoint reads from. Call once at startup, before the first
/// metric is recorded.
pub fn init_metrics() -> DisperserResult<Registry> {
    let registry = Registry::new();
    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()
        .map_err(|e| DisperserError::Internal(format!("failed to build metrics exporter: {e}")))?;
    let provider = SdkMeterProvider::builder().with_reader(exporter).build();
    global::set_meter_provider(provider);
    Ok(registry)
}

/// Serves `/metrics` (Prometheus text format) and `/health` on the given
/// port until the token is cancelled.
pub fn serve_metrics(registry: Registry, port: u16, cancellation_token: CancellationToken) -> JoinHandle<()> {
    let app = Router::new()
        .route(
            "/metrics",
            get(move || {
                let registry = registry.clone();
                async move {
                    TextEncoder::new()
                        .encode_to_string(&registry.gather())
                        .unwrap_or_else(|e| format!("# encoding error: {e}\n"))
                }
            }),
        )
        .route("/health", get(|| async { "UP" }));

    tokio::spawn(async move {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(%addr, error = %e, "failed to bind metrics listener");
                return;
            }
        };
        info!(%addr, "metrics server listening");

        let shutdown = cancellation_token.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            error!(error = %e, "metrics server exited with error");
        }
        info!("metrics server shut down");
    })
}
