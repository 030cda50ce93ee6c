use std::sync::Arc;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::Next;
use tracing::{trace, warn};
use url::Url;

use crate::OPERATION_NAME_HEADER;
use crate::attribute::TraceAttribute;
use crate::backend::MetricGuard;
use crate::processor::{ProcessorConfig, RequestSnapshot, apply_base_metrics, header_str};

/// Processor for exchanges produced by a GraphQL client layer.
///
/// GraphQL traffic typically shares one fixed endpoint URL across all
/// operations, which would fold every operation into a single entry on the
/// backend's dashboards. The operation name is therefore read from the
/// request header set by the client layer and used as the trace's primary
/// label, optionally folded into the metric URL as an extra path segment.
pub(crate) struct GraphqlProcessor {
    config: Arc<ProcessorConfig>,
    append_operation_name_to_url: bool,
}

impl GraphqlProcessor {
    pub(crate) fn new(config: Arc<ProcessorConfig>, append_operation_name_to_url: bool) -> Self {
        GraphqlProcessor {
            config,
            append_operation_name_to_url,
        }
    }

    pub(crate) async fn process(
        &self,
        request: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let operation_name = header_str(request.headers(), OPERATION_NAME_HEADER)
            .unwrap_or_default()
            .to_string();
        let snapshot = RequestSnapshot::of(&request);
        let metric_url = self.metric_url(&snapshot.url, &operation_name);
        trace!(operation_name = %operation_name, url = %metric_url, "tracing graphql exchange");

        let mut guard =
            MetricGuard::start(self.config.backend.as_ref(), &metric_url, &snapshot.method);
        // a transport error propagates unchanged; the guard submits the
        // partial metric on the way out
        let response = next.run(request, extensions).await?;

        apply_base_metrics(
            guard.metric_mut(),
            &snapshot,
            &response,
            &self.config.toggles,
        );
        for attribute in &self.config.attributes {
            match attribute {
                TraceAttribute::OperationName { key } => {
                    guard.metric_mut().put_attribute(key, &operation_name);
                }
                TraceAttribute::Custom { key, value } => {
                    guard.metric_mut().put_attribute(key, value);
                }
            }
        }
        guard.finish();

        Ok(response)
    }

    /// URL used to key the metric. The real request URL is never touched.
    fn metric_url(&self, url: &Url, operation_name: &str) -> Url {
        if !self.append_operation_name_to_url || operation_name.is_empty() {
            return url.clone();
        }

        let mut keyed = url.clone();
        let appended = keyed.path_segments_mut().map(|mut segments| {
            segments.pop_if_empty().push(operation_name);
        });
        if appended.is_err() {
            warn!(url = %url, "cannot append operation name to a cannot-be-a-base url");
            return url.clone();
        }
        keyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TracingBackend;
    use crate::processor::MetricToggles;

    fn processor(append: bool) -> GraphqlProcessor {
        GraphqlProcessor::new(
            Arc::new(ProcessorConfig {
                attributes: Vec::new(),
                backend: Arc::new(TracingBackend),
                toggles: MetricToggles {
                    set_request_payload_size: true,
                    set_response_content_type: true,
                    set_response_http_code: true,
                    set_response_payload_size: true,
                },
            }),
            append,
        )
    }

    #[test]
    fn appends_operation_name_as_path_segment() {
        let url = Url::parse("https://api.example.com/graphql").unwrap();

        let keyed = processor(true).metric_url(&url, "GetUser");

        assert_eq!(keyed.as_str(), "https://api.example.com/graphql/GetUser");
    }

    #[test]
    fn trailing_slash_does_not_produce_empty_segment() {
        let url = Url::parse("https://api.example.com/graphql/").unwrap();

        let keyed = processor(true).metric_url(&url, "GetUser");

        assert_eq!(keyed.as_str(), "https://api.example.com/graphql/GetUser");
    }

    #[test]
    fn url_is_unchanged_when_rewrite_is_off() {
        let url = Url::parse("https://api.example.com/graphql").unwrap();

        let keyed = processor(false).metric_url(&url, "GetUser");

        assert_eq!(keyed, url);
    }

    #[test]
    fn empty_operation_name_leaves_url_unchanged() {
        let url = Url::parse("https://api.example.com/graphql").unwrap();

        let keyed = processor(true).metric_url(&url, "");

        assert_eq!(keyed, url);
    }
}
