//! Prometheus metrics.
//!
//! Metrics are recorded through the `metrics` facade everywhere. Without an
//! installed recorder the calls are no-ops.

use crate::config::MetricsSettings;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;
use std::time::Duration;

/// Handle to the installed Prometheus recorder.
#[derive(Debug)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders all metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the Prometheus recorder when metrics are enabled.
///
/// With `expose` set an HTTP listener serves `/metrics` on the configured
/// port; otherwise metrics are only kept in-process.
///
/// # Errors
///
/// Returns an error if the recorder or listener cannot be installed.
pub fn install_prometheus(settings: &MetricsSettings, expose: bool) -> Result<Option<MetricsHandle>> {
    if !settings.enabled {
        return Ok(None);
    }

    let builder = PrometheusBuilder::new();
    let prometheus = if expose {
        let listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), settings.port);
        tracing::info!(%listen_addr, "Exposing Prometheus metrics");
        install_listener(builder.with_http_listener(listen_addr))?
    } else {
        builder
            .install_recorder()
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_recorder_install".to_string(),
                cause: e.to_string(),
            })?
    };

    Ok(Some(MetricsHandle { prometheus }))
}

/// Records one store query.
pub fn record_query(backend: &'static str, kind: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };
    metrics::counter!(
        "graph_retriever_queries_total",
        "backend" => backend,
        "kind" => kind,
        "status" => status
    )
    .increment(1);
}

/// Records one completed or failed retrieval call.
#[allow(clippy::cast_precision_loss)]
pub fn record_retrieval(records: usize, elapsed: Duration, success: bool) {
    let status = if success { "success" } else { "error" };
    metrics::counter!("graph_retriever_retrievals_total", "status" => status).increment(1);
    metrics::histogram!("graph_retriever_retrieval_duration_ms", "status" => status)
        .record(elapsed.as_secs_f64() * 1000.0);
    if success {
        metrics::histogram!("graph_retriever_records_per_retrieval").record(records as f64);
    }
}

/// The exporter needs a Tokio runtime; outside one, a single-threaded
/// runtime is parked on a background thread to host it.
fn install_listener(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return install_with_runtime(builder, &handle);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_runtime_init".to_string(),
            cause: e.to_string(),
        })?;
    let handle = runtime.handle().clone();
    let prometheus = install_with_runtime(builder, &handle)?;
    thread::Builder::new()
        .name("metrics-exporter-prometheus-http".to_string())
        .spawn(move || runtime.block_on(std::future::pending::<()>()))
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_runtime_thread".to_string(),
            cause: e.to_string(),
        })?;
    Ok(prometheus)
}

fn install_with_runtime(
    builder: PrometheusBuilder,
    runtime_handle: &tokio::runtime::Handle,
) -> Result<PrometheusHandle> {
    let (recorder, exporter) = {
        let _guard = runtime_handle.enter();
        builder.build().map_err(|e| Error::OperationFailed {
            operation: "metrics_exporter_build".to_string(),
            cause: e.to_string(),
        })?
    };
    let handle = recorder.handle();
    set_global_recorder(recorder)?;
    runtime_handle.spawn(exporter);
    Ok(handle)
}

fn set_global_recorder(recorder: PrometheusRecorder) -> Result<()> {
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })
}
