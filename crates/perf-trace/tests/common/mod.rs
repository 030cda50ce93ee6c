use std::sync::{Arc, Mutex};

use http::Method;
use reqwest_perf_trace::{HttpMetric, TelemetryBackend};
use url::Url;

/// One submitted metric, as the fake backend saw it.
#[derive(Debug, Clone, Default)]
pub struct RecordedMetric {
    pub url: String,
    pub method: String,
    pub started: bool,
    pub request_payload_size: Option<i64>,
    pub response_http_code: Option<u16>,
    pub response_content_type: Option<String>,
    pub response_payload_size: Option<i64>,
    pub attributes: Vec<(String, String)>,
}

/// Fake telemetry backend collecting every submitted metric in memory.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    submitted: Arc<Mutex<Vec<RecordedMetric>>>,
}

impl RecordingBackend {
    pub fn submitted(&self) -> Vec<RecordedMetric> {
        self.submitted.lock().unwrap().clone()
    }

    /// The single submitted metric; panics if there is not exactly one.
    pub fn single(&self) -> RecordedMetric {
        let submitted = self.submitted();
        assert_eq!(submitted.len(), 1, "expected exactly one submitted metric");
        submitted.into_iter().next().unwrap()
    }
}

impl TelemetryBackend for RecordingBackend {
    fn new_metric(&self, url: &Url, method: &Method) -> Box<dyn HttpMetric> {
        Box::new(PendingMetric {
            record: RecordedMetric {
                url: url.to_string(),
                method: method.to_string(),
                ..Default::default()
            },
            sink: self.submitted.clone(),
        })
    }
}

struct PendingMetric {
    record: RecordedMetric,
    sink: Arc<Mutex<Vec<RecordedMetric>>>,
}

impl HttpMetric for PendingMetric {
    fn start(&mut self) {
        self.record.started = true;
    }

    fn set_request_payload_size(&mut self, bytes: i64) {
        self.record.request_payload_size = Some(bytes);
    }

    fn set_response_http_code(&mut self, code: u16) {
        self.record.response_http_code = Some(code);
    }

    fn set_response_content_type(&mut self, content_type: &str) {
        self.record.response_content_type = Some(content_type.to_string());
    }

    fn set_response_payload_size(&mut self, bytes: i64) {
        self.record.response_payload_size = Some(bytes);
    }

    fn put_attribute(&mut self, key: &str, value: &str) {
        self.record
            .attributes
            .push((key.to_string(), value.to_string()));
    }

    fn stop(&mut self) {
        self.sink.lock().unwrap().push(self.record.clone());
    }
}
