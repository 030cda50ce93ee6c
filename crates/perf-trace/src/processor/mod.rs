//! Per-request processors.
//!
//! Each intercepted request is handled end-to-end by exactly one processor:
//! [`graphql::GraphqlProcessor`] for exchanges produced by a GraphQL client
//! layer, [`rest::RestProcessor`] for everything else. Both share the
//! base-metric application below and differ only in attribute handling and
//! metric URL computation.

pub(crate) mod graphql;
pub(crate) mod rest;

use std::sync::Arc;

use http::{HeaderMap, Method, header};
use reqwest::{Request, Response};
use url::Url;

use crate::attribute::TraceAttribute;
use crate::backend::{HttpMetric, TelemetryBackend};

/// How an absent response content type is stringified. The underlying mobile
/// platform renders a missing value this way and backend dashboards key on
/// it, so it is preserved verbatim.
pub(crate) const ABSENT_CONTENT_TYPE: &str = "null";

/// Size sentinel for absent or unknown payloads.
pub(crate) const UNKNOWN_PAYLOAD_SIZE: i64 = -1;

/// Which of the four base metrics get recorded. Each toggle is independent.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MetricToggles {
    pub set_request_payload_size: bool,
    pub set_response_content_type: bool,
    pub set_response_http_code: bool,
    pub set_response_payload_size: bool,
}

/// Configuration shared by both processors, immutable for the lifetime of
/// the middleware.
pub(crate) struct ProcessorConfig {
    pub attributes: Vec<TraceAttribute>,
    pub backend: Arc<dyn TelemetryBackend>,
    pub toggles: MetricToggles,
}

/// Request facts captured before the request is consumed by the transport.
pub(crate) struct RequestSnapshot {
    pub url: Url,
    pub method: Method,
    pub body_size: Option<i64>,
}

impl RequestSnapshot {
    pub(crate) fn of(request: &Request) -> Self {
        RequestSnapshot {
            url: request.url().clone(),
            method: request.method().clone(),
            // streaming bodies have no known length up front
            body_size: request
                .body()
                .and_then(|body| body.as_bytes())
                .map(|bytes| bytes.len() as i64),
        }
    }
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Applies the generic HTTP-exchange measurements to a metric, gated by the
/// configured toggles. Missing data falls back to sentinel values; this never
/// fails.
pub(crate) fn apply_base_metrics(
    metric: &mut dyn HttpMetric,
    request: &RequestSnapshot,
    response: &Response,
    toggles: &MetricToggles,
) {
    if toggles.set_request_payload_size {
        metric.set_request_payload_size(request.body_size.unwrap_or(UNKNOWN_PAYLOAD_SIZE));
    }
    if toggles.set_response_http_code {
        metric.set_response_http_code(response.status().as_u16());
    }
    if toggles.set_response_content_type {
        let content_type = header_str(response.headers(), header::CONTENT_TYPE.as_str());
        metric.set_response_content_type(content_type.unwrap_or(ABSENT_CONTENT_TYPE));
    }
    if toggles.set_response_payload_size {
        let size = response
            .content_length()
            .map(|length| length as i64)
            .unwrap_or(UNKNOWN_PAYLOAD_SIZE);
        metric.set_response_payload_size(size);
    }
}
