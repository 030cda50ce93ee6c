use std::sync::Arc;

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::Next;
use tracing::trace;

use crate::attribute::TraceAttribute;
use crate::backend::MetricGuard;
use crate::processor::{ProcessorConfig, RequestSnapshot, apply_base_metrics};

/// Processor for plain REST-style exchanges.
///
/// The metric is keyed on the unmodified request URL and method. Only
/// `Custom` attributes are applied; operation-name attributes carry no
/// meaningful value outside the GraphQL context and are skipped.
pub(crate) struct RestProcessor {
    config: Arc<ProcessorConfig>,
}

impl RestProcessor {
    pub(crate) fn new(config: Arc<ProcessorConfig>) -> Self {
        RestProcessor { config }
    }

    pub(crate) async fn process(
        &self,
        request: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let snapshot = RequestSnapshot::of(&request);
        trace!(url = %snapshot.url, method = %snapshot.method, "tracing http exchange");

        let mut guard =
            MetricGuard::start(self.config.backend.as_ref(), &snapshot.url, &snapshot.method);
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
                TraceAttribute::Custom { key, value } => {
                    guard.metric_mut().put_attribute(key, value);
                }
                TraceAttribute::OperationName { .. } => {}
            }
        }
        guard.finish();

        Ok(response)
    }
}
