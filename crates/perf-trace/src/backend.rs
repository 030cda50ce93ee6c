//! Telemetry backend abstraction.
//!
//! The middleware never talks to a concrete performance-monitoring product;
//! it drives one [`HttpMetric`] per intercepted request through a
//! [`TelemetryBackend`] handle. Storage, batching and transmission of the
//! recorded samples are entirely the backend's concern.

use http::Method;
use tracing::debug;
use url::Url;

/// Limits a telemetry backend imposes on per-metric attributes.
///
/// These are owned by the backend, not by the middleware; the defaults match
/// the limits of common mobile performance-monitoring products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLimits {
    /// Maximum number of custom attributes on a single metric.
    pub max_custom_attributes: usize,
    /// Maximum attribute key length, in characters.
    pub max_attribute_key_length: usize,
    /// Maximum attribute value length, in characters.
    pub max_attribute_value_length: usize,
}

impl Default for AttributeLimits {
    fn default() -> Self {
        AttributeLimits {
            max_custom_attributes: 5,
            max_attribute_key_length: 40,
            max_attribute_value_length: 100,
        }
    }
}

/// One in-flight measurement of a single HTTP exchange.
///
/// Created by [`TelemetryBackend::new_metric`], mutated field-by-field and
/// submitted exactly once via [`HttpMetric::stop`]. Handles are request-local
/// and never retained after submission.
pub trait HttpMetric: Send {
    /// Marks the beginning of the measured exchange.
    fn start(&mut self);

    /// Request body size in bytes, `-1` when absent or unknown.
    fn set_request_payload_size(&mut self, bytes: i64);

    /// Numeric HTTP status code of the response.
    fn set_response_http_code(&mut self, code: u16);

    /// Declared response content type. Absence is recorded as the literal
    /// string `"null"`.
    fn set_response_content_type(&mut self, content_type: &str);

    /// Response body size in bytes, `-1` when unknown.
    fn set_response_payload_size(&mut self, bytes: i64);

    /// Attaches a free-form key/value attribute.
    fn put_attribute(&mut self, key: &str, value: &str);

    /// Finalizes and submits the metric. Called exactly once.
    fn stop(&mut self);
}

/// Handle to the external telemetry backend.
pub trait TelemetryBackend: Send + Sync {
    /// Creates a metric scoped to the given URL and method.
    fn new_metric(&self, url: &Url, method: &Method) -> Box<dyn HttpMetric>;

    /// The attribute limits this backend enforces. Middleware configuration
    /// is validated against these at build time.
    fn attribute_limits(&self) -> AttributeLimits {
        AttributeLimits::default()
    }
}

/// Scoped wrapper around one metric handle.
///
/// Starts the metric on creation and guarantees it is stopped exactly once:
/// through [`finish`](MetricGuard::finish) on the success path, or on drop
/// when the transport fails mid-request. A transport error therefore still
/// submits the partially-built metric instead of leaking the handle.
pub(crate) struct MetricGuard {
    metric: Box<dyn HttpMetric>,
    finished: bool,
}

impl MetricGuard {
    pub(crate) fn start(backend: &dyn TelemetryBackend, url: &Url, method: &Method) -> Self {
        let mut metric = backend.new_metric(url, method);
        metric.start();
        MetricGuard {
            metric,
            finished: false,
        }
    }

    pub(crate) fn metric_mut(&mut self) -> &mut dyn HttpMetric {
        self.metric.as_mut()
    }

    pub(crate) fn finish(mut self) {
        self.metric.stop();
        self.finished = true;
    }
}

impl Drop for MetricGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.metric.stop();
        }
    }
}

/// Reference backend that emits every completed metric as a structured
/// `tracing` event instead of shipping it anywhere.
///
/// Useful as a development sink and in environments without a real
/// performance-monitoring product wired up.
#[derive(Debug, Default, Clone)]
pub struct TracingBackend;

impl TelemetryBackend for TracingBackend {
    fn new_metric(&self, url: &Url, method: &Method) -> Box<dyn HttpMetric> {
        Box::new(TracingMetric {
            url: url.clone(),
            method: method.clone(),
            request_payload_size: None,
            response_http_code: None,
            response_content_type: None,
            response_payload_size: None,
            attributes: Vec::new(),
        })
    }
}

struct TracingMetric {
    url: Url,
    method: Method,
    request_payload_size: Option<i64>,
    response_http_code: Option<u16>,
    response_content_type: Option<String>,
    response_payload_size: Option<i64>,
    attributes: Vec<(String, String)>,
}

impl HttpMetric for TracingMetric {
    fn start(&mut self) {}

    fn set_request_payload_size(&mut self, bytes: i64) {
        self.request_payload_size = Some(bytes);
    }

    fn set_response_http_code(&mut self, code: u16) {
        self.response_http_code = Some(code);
    }

    fn set_response_content_type(&mut self, content_type: &str) {
        self.response_content_type = Some(content_type.to_string());
    }

    fn set_response_payload_size(&mut self, bytes: i64) {
        self.response_payload_size = Some(bytes);
    }

    fn put_attribute(&mut self, key: &str, value: &str) {
        self.attributes.push((key.to_string(), value.to_string()));
    }

    fn stop(&mut self) {
        debug!(
            url = %self.url,
            method = %self.method,
            request_payload_size = ?self.request_payload_size,
            response_http_code = ?self.response_http_code,
            response_content_type = ?self.response_content_type,
            response_payload_size = ?self.response_payload_size,
            attributes = ?self.attributes,
            "http metric recorded"
        );
    }
}
