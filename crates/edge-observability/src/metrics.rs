//! Per-request proxy metrics.

use std::time::{Duration, Instant};

use edge_core::RequestId;
use serde::Serialize;

use crate::logging::micros;

/// Metrics for a single request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Workload name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload: Option<String>,
    /// Route path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// HTTP method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Edge cache outcome (HIT, MISS).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_status: Option<String>,
    /// Upstream fetch, if one was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamMetrics>,
    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Response body size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,
    /// Background tasks scheduled.
    pub background_tasks: usize,
    /// Time until the response was ready (microseconds).
    pub total_duration_us: u64,
}

/// Metrics for the upstream fetch.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamMetrics {
    /// Fetch duration (microseconds).
    pub duration_us: u64,
    /// Whether the fetch succeeded.
    pub success: bool,
    /// Error message if failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Collector for request metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    workload: Option<String>,
    route: Option<String>,
    method: Option<String>,
    start: Instant,
    cache_status: Option<String>,
    upstream: Option<UpstreamMetrics>,
    background_tasks: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            workload: None,
            route: None,
            method: None,
            start: Instant::now(),
            cache_status: None,
            upstream: None,
            background_tasks: 0,
        }
    }

    /// Set workload name.
    pub fn set_workload(&mut self, workload: impl Into<String>) {
        self.workload = Some(workload.into());
    }

    /// Set route path.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Set HTTP method.
    pub fn set_method(&mut self, method: impl Into<String>) {
        self.method = Some(method.into());
    }

    /// Record the cache outcome.
    pub fn record_cache_status(&mut self, status: impl std::fmt::Display) {
        self.cache_status = Some(status.to_string());
    }

    /// Record the upstream fetch.
    pub fn record_upstream(&mut self, duration: Duration, success: bool, error: Option<String>) {
        self.upstream = Some(UpstreamMetrics {
            duration_us: micros(duration),
            success,
            error,
        });
    }

    /// Record scheduled background tasks.
    pub fn record_background_tasks(&mut self, count: usize) {
        self.background_tasks = count;
    }

    /// Finalize and return the metrics.
    pub fn finalize(
        self,
        status_code: Option<u16>,
        response_bytes: Option<usize>,
    ) -> RequestMetrics {
        RequestMetrics {
            request_id: self.request_id.to_string(),
            workload: self.workload,
            route: self.route,
            method: self.method,
            cache_status: self.cache_status,
            upstream: self.upstream,
            status_code,
            response_bytes,
            background_tasks: self.background_tasks,
            total_duration_us: micros(self.start.elapsed()),
        }
    }
}

impl RequestMetrics {
    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as a one-line human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut parts = vec![format!("request={}", self.request_id)];

        if let Some(method) = &self.method {
            parts.push(format!("method={}", method));
        }

        if let Some(status) = self.status_code {
            parts.push(format!("status={}", status));
        }

        if let Some(cache) = &self.cache_status {
            parts.push(format!("cache={}", cache));
        }

        if let Some(upstream) = &self.upstream {
            let outcome = if upstream.success { "ok" } else { "FAILED" };
            parts.push(format!(
                "upstream={} ({:.2}ms)",
                outcome,
                upstream.duration_us as f64 / 1000.0
            ));
        }

        if let Some(bytes) = self.response_bytes {
            parts.push(format!("bytes={}", bytes));
        }

        parts.push(format!(
            "total={:.2}ms",
            self.total_duration_us as f64 / 1000.0
        ));

        parts.join(" ")
    }
}
