//! Client for the drawing render/extraction backend.
//!
//! The backend rasterizes PDF pages and reads annotations out of a page
//! region. Both calls upload the document as a multipart form. Requests are
//! never retried: failures go straight back to the caller.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::aggregate::{ExtractionResult, ProfileValue};
use crate::transform::{Document, Rect};

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Backend client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server error ({status}): {detail}")]
    Processing { status: u16, detail: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ClientError {
    /// Message for the user: the server's detail when it sent one.
    pub fn detail(&self) -> String {
        match self {
            ClientError::Processing { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// The two operations the takeoff core needs from the outside world.
pub trait DrawingBackend {
    /// Rasterize a page at `zoom` and return the encoded image.
    fn render_page(
        &self,
        document: &[u8],
        page_index: usize,
        zoom: f64,
    ) -> impl Future<Output = Result<Vec<u8>, ClientError>> + Send;

    /// Read annotations inside a Document-space region of a page.
    fn extract_region(
        &self,
        document: &[u8],
        region: &Rect<Document>,
        page_index: usize,
    ) -> impl Future<Output = Result<ExtractionResult, ClientError>> + Send;
}

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// File name sent with the uploaded document.
    pub file_name: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            file_name: "drawing.pdf".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

/// Extraction response as sent by the backend.
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    elevations: Vec<String>,
    #[serde(default)]
    studs_count: u64,
    #[serde(default)]
    studs_total: u64,
    #[serde(default)]
    profiles: BTreeMap<String, Vec<ProfileValue>>,
}

impl From<ExtractResponse> for ExtractionResult {
    fn from(response: ExtractResponse) -> Self {
        Self {
            elevations: response.elevations,
            studs_label_count: response.studs_count,
            studs_total: response.studs_total,
            profiles: response.profiles,
        }
    }
}

/// HTTP implementation of [`DrawingBackend`].
pub struct TakeoffClient {
    config: BackendConfig,
    client: Client,
}

impl TakeoffClient {
    pub fn new(config: BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn with_defaults() -> Result<Self, ClientError> {
        Self::new(BackendConfig::default())
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn document_part(&self, document: &[u8]) -> Result<Part, ClientError> {
        Part::bytes(document.to_vec())
            .file_name(self.config.file_name.clone())
            .mime_str("application/pdf")
            .map_err(ClientError::from)
    }

    async fn post(&self, path: &str, form: Form) -> Result<Response, ClientError> {
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Processing {
                status: status.as_u16(),
                detail: parse_error_detail(&body),
            });
        }
        Ok(response)
    }
}

impl DrawingBackend for TakeoffClient {
    async fn render_page(
        &self,
        document: &[u8],
        page_index: usize,
        zoom: f64,
    ) -> Result<Vec<u8>, ClientError> {
        tracing::debug!("Render request: page {}, zoom {}", page_index, zoom);
        let form = Form::new()
            .part("pdf", self.document_part(document)?)
            .text("page_num", page_index.to_string())
            .text("zoom", zoom.to_string());

        let response = self.post("/api/render-page", form).await?;
        let bytes = response.bytes().await?;
        tracing::debug!("Received {} bytes of page image", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn extract_region(
        &self,
        document: &[u8],
        region: &Rect<Document>,
        page_index: usize,
    ) -> Result<ExtractionResult, ClientError> {
        tracing::debug!("Extraction request: page {}, region {}", page_index, region);
        let form = Form::new()
            .part("pdf", self.document_part(document)?)
            .text("x", region.x.to_string())
            .text("y", region.y.to_string())
            .text("width", region.width.to_string())
            .text("height", region.height.to_string())
            .text("page_num", page_index.to_string());

        let response = self.post("/api/extract-text", form).await?;
        let body = response.text().await?;
        parse_extract_response(&body)
    }
}

fn parse_extract_response(body: &str) -> Result<ExtractionResult, ClientError> {
    serde_json::from_str::<ExtractResponse>(body)
        .map(ExtractionResult::from)
        .map_err(|e| ClientError::Parse(e.to_string()))
}

/// Pull the `detail` field out of an error body, falling back to the raw text.
fn parse_error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_default() {
        let config = BackendConfig::default();
        assert_eq!(config.base_url, "http://localhost:5001");
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_url_join() {
        let client =
            TakeoffClient::new(BackendConfig::default().with_base_url("http://host:9000/")).unwrap();
        assert_eq!(client.url("/api/render-page"), "http://host:9000/api/render-page");
    }

    #[test]
    fn test_parse_extract_response() {
        let body = r#"{
            "success": true,
            "elevations": ["12'-6\""],
            "studs": [18, 12],
            "profiles": {"W12X19": [18, 12]},
            "studs_total": 30,
            "studs_count": 2,
            "raw_text": ""
        }"#;
        let result = parse_extract_response(body).unwrap();
        assert_eq!(result.studs_total, 30);
        assert_eq!(result.studs_label_count, 2);
        assert_eq!(result.elevations, vec!["12'-6\"".to_string()]);
        assert_eq!(
            result.profiles["W12X19"],
            vec![ProfileValue::Number(18.0), ProfileValue::Number(12.0)]
        );
    }

    #[test]
    fn test_parse_extract_response_missing_fields() {
        let result = parse_extract_response(r#"{"success": true}"#).unwrap();
        assert_eq!(result, ExtractionResult::default());
        assert!(matches!(
            parse_extract_response("<html>"),
            Err(ClientError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_error_detail() {
        assert_eq!(
            parse_error_detail(r#"{"detail": "Page number out of range"}"#),
            "Page number out of range"
        );
        assert_eq!(parse_error_detail("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(parse_error_detail(r#"{"detail": [1]}"#), "[1]");
    }

    #[test]
    fn test_client_error_detail() {
        let err = ClientError::Processing {
            status: 400,
            detail: "Page number out of range".to_string(),
        };
        assert_eq!(err.detail(), "Page number out of range");
        assert_eq!(err.to_string(), "Server error (400): Page number out of range");
    }
}
