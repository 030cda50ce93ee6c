//! Sends one instrumented GraphQL request and logs the recorded metric
//! through the reference tracing backend.
//!
//! Run with: `cargo run --example graphql_client -- <graphql-endpoint-url>`

use std::sync::Arc;

use reqwest_middleware::ClientBuilder;
use reqwest_perf_trace::{
    OPERATION_ID_HEADER, OPERATION_NAME_HEADER, PerfTraceMiddleware, PerfTraceOptions,
    TraceAttribute, TracingBackend,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://countries.trevorblades.com/".to_string());

    let middleware = PerfTraceMiddleware::new(
        Arc::new(TracingBackend),
        PerfTraceOptions {
            attributes: vec![
                TraceAttribute::operation_name(),
                TraceAttribute::custom("example", "graphql_client"),
            ],
            append_operation_name_to_url: true,
            ..Default::default()
        },
    )?;

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(middleware)
        .build();

    let response = client
        .post(&endpoint)
        .header(OPERATION_ID_HEADER, "c7a9")
        .header(OPERATION_NAME_HEADER, "Countries")
        .header("content-type", "application/json")
        .body(r#"{"query":"query Countries { countries { code name } }","operationName":"Countries"}"#)
        .send()
        .await?;

    println!("status: {}", response.status());
    Ok(())
}
