//! Performance-monitoring middleware for [`reqwest`] with GraphQL operation
//! awareness.
//!
//! For every outgoing request the middleware starts a metric on an external
//! telemetry backend, lets the transport execute the request, then records a
//! configurable set of base metrics (request payload size, response code,
//! response content type, response payload size) and custom attributes on the
//! metric before submitting it. Requests and responses pass through
//! unmodified.
//!
//! Exchanges produced by a GraphQL client layer are recognized by the
//! operation-id header that layer attaches and get special treatment: the
//! operation name becomes the trace's primary label and can optionally be
//! folded into the metric URL, so that operations sharing one GraphQL
//! endpoint stay distinguishable on backend dashboards.
//!
//! ```no_run
//! use std::sync::Arc;
//! use reqwest_middleware::ClientBuilder;
//! use reqwest_perf_trace::{PerfTraceMiddleware, PerfTraceOptions, TraceAttribute, TracingBackend};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let middleware = PerfTraceMiddleware::new(
//!     Arc::new(TracingBackend),
//!     PerfTraceOptions {
//!         attributes: vec![
//!             TraceAttribute::operation_name(),
//!             TraceAttribute::custom("build", "release"),
//!         ],
//!         ..Default::default()
//!     },
//! )?;
//!
//! let client = ClientBuilder::new(reqwest::Client::new())
//!     .with(middleware)
//!     .build();
//! # Ok(())
//! # }
//! ```

mod attribute;
mod backend;
mod error;
mod processor;

pub use attribute::TraceAttribute;
pub use backend::{AttributeLimits, HttpMetric, TelemetryBackend, TracingBackend};
pub use error::ConfigError;

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::debug;

use processor::graphql::GraphqlProcessor;
use processor::rest::RestProcessor;
use processor::{MetricToggles, ProcessorConfig, header_str};

/// Header carrying the GraphQL operation name, attached by the GraphQL
/// client layer upstream of this middleware.
pub const OPERATION_NAME_HEADER: &str = "X-APOLLO-OPERATION-NAME";

/// Header marking a request as generated by a GraphQL client layer. A
/// GraphQL client that omits it is treated as generic traffic.
pub const OPERATION_ID_HEADER: &str = "X-APOLLO-OPERATION-ID";

/// Default key under which [`TraceAttribute::OperationName`] is recorded.
pub const OPERATION_NAME_ATTRIBUTE_KEY: &str = "Operation Name";

/// Middleware configuration. Immutable once the middleware is built.
#[derive(Debug, Clone)]
pub struct PerfTraceOptions {
    /// Attributes attached to every metric, applied in order. The list is
    /// validated against the backend's [`AttributeLimits`] at build time.
    pub attributes: Vec<TraceAttribute>,
    /// Record the content length of the request body, not including headers.
    pub set_request_payload_size: bool,
    /// Record the response MIME type. GraphQL responses are usually
    /// `application/json`, but server-side errors may differ.
    pub set_response_content_type: bool,
    /// Record the response HTTP code. Most HTTP-based GraphQL servers always
    /// answer 200, but this still catches transport-level server errors.
    pub set_response_http_code: bool,
    /// Record the content length of the response body, not including headers.
    pub set_response_payload_size: bool,
    /// Append the resolved operation name to the URL the metric is keyed on,
    /// so operations sharing one GraphQL endpoint get separate dashboard
    /// entries. The real request URL is never modified.
    pub append_operation_name_to_url: bool,
}

impl Default for PerfTraceOptions {
    fn default() -> Self {
        PerfTraceOptions {
            attributes: vec![TraceAttribute::operation_name()],
            set_request_payload_size: true,
            set_response_content_type: true,
            set_response_http_code: true,
            set_response_payload_size: true,
            append_operation_name_to_url: false,
        }
    }
}

/// The interceptor. Classifies each outgoing request as GraphQL-style or
/// generic and records one metric per request on the configured backend.
///
/// Invocations are self-contained: configuration is shared read-only and
/// each request gets its own metric handle, so the middleware is safe under
/// unboundedly many concurrent in-flight requests.
pub struct PerfTraceMiddleware {
    graphql: GraphqlProcessor,
    rest: RestProcessor,
}

impl std::fmt::Debug for PerfTraceMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerfTraceMiddleware").finish_non_exhaustive()
    }
}

impl PerfTraceMiddleware {
    /// Builds the middleware, validating `options` against the backend's
    /// attribute limits. On any violation no instance is produced.
    pub fn new(
        backend: Arc<dyn TelemetryBackend>,
        options: PerfTraceOptions,
    ) -> Result<Self, ConfigError> {
        let limits = backend.attribute_limits();
        validate_attributes(&options.attributes, &limits)?;

        debug!(
            attributes = options.attributes.len(),
            append_operation_name_to_url = options.append_operation_name_to_url,
            "initializing performance trace middleware"
        );

        let append_operation_name_to_url = options.append_operation_name_to_url;
        let config = Arc::new(ProcessorConfig {
            attributes: options.attributes,
            backend,
            toggles: MetricToggles {
                set_request_payload_size: options.set_request_payload_size,
                set_response_content_type: options.set_response_content_type,
                set_response_http_code: options.set_response_http_code,
                set_response_payload_size: options.set_response_payload_size,
            },
        });

        Ok(PerfTraceMiddleware {
            graphql: GraphqlProcessor::new(config.clone(), append_operation_name_to_url),
            rest: RestProcessor::new(config),
        })
    }
}

#[async_trait]
impl Middleware for PerfTraceMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        if has_operation_id(&req) {
            self.graphql.process(req, extensions, next).await
        } else {
            self.rest.process(req, extensions, next).await
        }
    }
}

fn has_operation_id(request: &Request) -> bool {
    header_str(request.headers(), OPERATION_ID_HEADER)
        .map(|id| !id.trim().is_empty())
        .unwrap_or(false)
}

fn validate_attributes(
    attributes: &[TraceAttribute],
    limits: &AttributeLimits,
) -> Result<(), ConfigError> {
    if attributes.len() > limits.max_custom_attributes {
        return Err(ConfigError::TooManyAttributes {
            limit: limits.max_custom_attributes,
            keys: attributes
                .iter()
                .map(TraceAttribute::key)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    for attribute in attributes {
        if attribute.key().chars().count() > limits.max_attribute_key_length {
            return Err(ConfigError::AttributeKeyTooLong {
                key: attribute.key().to_string(),
                limit: limits.max_attribute_key_length,
            });
        }

        if let TraceAttribute::Custom { key, value } = attribute {
            if value.chars().count() > limits.max_attribute_value_length {
                return Err(ConfigError::AttributeValueTooLong {
                    key: key.clone(),
                    limit: limits.max_attribute_value_length,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> Arc<dyn TelemetryBackend> {
        Arc::new(TracingBackend)
    }

    fn request(headers: &[(&str, &str)]) -> Request {
        let mut builder = reqwest::Client::new().post("https://api.example.com/graphql");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.build().unwrap()
    }

    #[test]
    fn default_options_build() {
        assert!(PerfTraceMiddleware::new(backend(), PerfTraceOptions::default()).is_ok());
    }

    #[test]
    fn attribute_list_at_the_limit_builds() {
        let options = PerfTraceOptions {
            attributes: (0..5)
                .map(|i| TraceAttribute::custom(format!("key-{i}"), "value"))
                .collect(),
            ..Default::default()
        };

        assert!(PerfTraceMiddleware::new(backend(), options).is_ok());
    }

    #[test]
    fn too_many_attributes_fail_naming_every_key() {
        let options = PerfTraceOptions {
            attributes: (0..6)
                .map(|i| TraceAttribute::custom(format!("key-{i}"), "value"))
                .collect(),
            ..Default::default()
        };

        let error = PerfTraceMiddleware::new(backend(), options).unwrap_err();

        assert_eq!(
            error,
            ConfigError::TooManyAttributes {
                limit: 5,
                keys: "key-0, key-1, key-2, key-3, key-4, key-5".to_string(),
            }
        );
    }

    #[test]
    fn over_long_key_fails() {
        let key = "k".repeat(41);
        let options = PerfTraceOptions {
            attributes: vec![TraceAttribute::custom(key.clone(), "value")],
            ..Default::default()
        };

        let error = PerfTraceMiddleware::new(backend(), options).unwrap_err();

        assert_eq!(error, ConfigError::AttributeKeyTooLong { key, limit: 40 });
    }

    #[test]
    fn over_long_operation_name_key_fails_too() {
        let key = "k".repeat(41);
        let options = PerfTraceOptions {
            attributes: vec![TraceAttribute::operation_name_as(key.clone())],
            ..Default::default()
        };

        let error = PerfTraceMiddleware::new(backend(), options).unwrap_err();

        assert_eq!(error, ConfigError::AttributeKeyTooLong { key, limit: 40 });
    }

    #[test]
    fn over_long_value_fails() {
        let options = PerfTraceOptions {
            attributes: vec![TraceAttribute::custom("env", "v".repeat(101))],
            ..Default::default()
        };

        let error = PerfTraceMiddleware::new(backend(), options).unwrap_err();

        assert_eq!(
            error,
            ConfigError::AttributeValueTooLong {
                key: "env".to_string(),
                limit: 100,
            }
        );
    }

    #[test]
    fn key_length_is_counted_in_characters() {
        // 40 multi-byte characters are within the limit even though the
        // byte length is not
        let key = "ü".repeat(40);
        let options = PerfTraceOptions {
            attributes: vec![TraceAttribute::custom(key, "value")],
            ..Default::default()
        };

        assert!(PerfTraceMiddleware::new(backend(), options).is_ok());
    }

    #[test]
    fn operation_id_header_marks_graphql_traffic() {
        assert!(has_operation_id(&request(&[(
            OPERATION_ID_HEADER,
            "8f2e6d"
        )])));
    }

    #[test]
    fn absent_operation_id_is_generic_traffic() {
        assert!(!has_operation_id(&request(&[])));
    }

    #[test]
    fn blank_operation_id_is_generic_traffic() {
        assert!(!has_operation_id(&request(&[(OPERATION_ID_HEADER, "   ")])));
    }
}
