//! Client for the Mistral OCR API.
//!
//! This is the only code that knows the provider's wire format. Documents are
//! sent inline as `data:` URLs, so there is no upload step and nothing to
//! clean up afterwards.

use std::time::Duration;

use reqwest::StatusCode;

use crate::{credentials::ApiKey, data_url::data_url, prelude::*};

use super::{OcrError, OcrResult, OcrService};

/// Where the API lives by default.
pub const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";

/// The model we use by default.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Longest error body we will quote back to the user.
const MAX_ERROR_BODY: usize = 500;

/// Request body for `POST /ocr`.
#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    model: &'a str,
    document: DocumentChunk,
    include_image_base64: bool,
}

/// The document part of an [`OcrRequest`].
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DocumentChunk {
    DocumentUrl { document_url: String },
    ImageUrl { image_url: String },
}

impl DocumentChunk {
    fn new(data: &[u8], mime_type: &str) -> Self {
        let url = data_url(mime_type, data);
        if mime_type.starts_with("image/") {
            DocumentChunk::ImageUrl { image_url: url }
        } else {
            DocumentChunk::DocumentUrl { document_url: url }
        }
    }
}

/// A Mistral OCR client.
#[derive(Debug)]
pub struct MistralOcrClient {
    client: reqwest::Client,
    api_base: String,
    api_key: ApiKey,
    model: String,
}

impl MistralOcrClient {
    /// Create a new client. Without a `timeout`, requests wait as long as the
    /// transport allows.
    pub fn new(
        api_base: &str,
        api_key: ApiKey,
        model: String,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("cannot create HTTP client")?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            api_key,
            model,
        })
    }
}

#[async_trait]
impl OcrService for MistralOcrClient {
    #[instrument(level = "debug", skip_all, fields(mime_type = mime_type, bytes = data.len()))]
    async fn submit(&self, data: &[u8], mime_type: &str) -> Result<OcrResult, OcrError> {
        let url = format!("{}/ocr", self.api_base);
        let request = OcrRequest {
            model: &self.model,
            document: DocumentChunk::new(data, mime_type),
            include_image_base64: true,
        };
        debug!(%url, model = %self.model, "Sending OCR request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(failure_from_response(status, &body));
        }

        let result = serde_json::from_str::<OcrResult>(&body).map_err(|err| {
            OcrError::Processing {
                status: Some(status.as_u16()),
                message: format!("unexpected response from OCR service: {err}"),
            }
        })?;
        debug!(pages = result.pages.len(), "OCR request succeeded");
        Ok(result)
    }
}

/// Describe a transport error, including its underlying causes.
fn transport_error(err: reqwest::Error) -> OcrError {
    OcrError::Transport {
        message: format!("{:#}", anyhow::Error::new(err)),
    }
}

/// Turn an unsuccessful HTTP response into an [`OcrError`].
fn failure_from_response(status: StatusCode, body: &str) -> OcrError {
    let message = error_message(body).unwrap_or_else(|| {
        let mut text = body.trim().to_owned();
        if text.is_empty() {
            text = status.to_string();
        } else if text.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
            text.push_str("...");
        }
        text
    });
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => OcrError::Auth {
            status: status.as_u16(),
            message,
        },
        _ => OcrError::Processing {
            status: Some(status.as_u16()),
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// Pull a human-readable message out of a JSON error body, if there is one.
fn error_message(body: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(body).ok()?;
    ["message", "detail", "error"]
        .iter()
        .find_map(|field| match value.get(*field)? {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            other => Some(other.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pdfs_are_sent_as_document_urls() {
        let request = OcrRequest {
            model: DEFAULT_MODEL,
            document: DocumentChunk::new(b"%PDF", "application/pdf"),
            include_image_base64: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "mistral-ocr-latest",
                "document": {
                    "type": "document_url",
                    "document_url": "data:application/pdf;base64,JVBERg==",
                },
                "include_image_base64": true,
            })
        );
    }

    #[test]
    fn images_are_sent_as_image_urls() {
        let chunk = serde_json::to_value(DocumentChunk::new(b"x", "image/png")).unwrap();
        assert_eq!(chunk["type"], "image_url");
        assert_eq!(chunk["image_url"], "data:image/png;base64,eA==");
    }

    #[test]
    fn rejected_keys_are_auth_errors() {
        let err = failure_from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"message": "Unauthorized", "request_id": "abc"}"#,
        );
        assert!(matches!(
            err,
            OcrError::Auth { status: 401, ref message } if message == "Unauthorized"
        ));
    }

    #[test]
    fn other_failures_are_processing_errors() {
        let err = failure_from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"msg": "bad document"}]}"#,
        );
        match err {
            OcrError::Processing { status, message } => {
                assert_eq!(status, Some(422));
                assert!(message.contains("bad document"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = failure_from_response(StatusCode::BAD_GATEWAY, "");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let err = failure_from_response(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(err.to_string().ends_with("..."));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let client = MistralOcrClient::new(
            "http://127.0.0.1:1/v1/",
            ApiKey::new("sk-test").unwrap(),
            DEFAULT_MODEL.to_owned(),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        let err = client.submit(b"%PDF", "application/pdf").await.unwrap_err();
        assert!(matches!(err, OcrError::Transport { .. }), "{err:?}");
    }
}
