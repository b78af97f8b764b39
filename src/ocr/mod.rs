//! OCR results, and the interface to the service that produces them.

use serde_json::Map;

use crate::prelude::*;

pub mod mistral;

/// Everything the OCR service told us about one document.
///
/// Fields we don't interpret are kept in `extra`, so that JSON output is
/// lossless.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OcrResult {
    /// Pages, in document order.
    #[serde(default)]
    pub pages: Vec<OcrPage>,

    /// Other fields, such as `model` and `usage_info`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of OCR output.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OcrPage {
    /// Zero-based page number.
    #[serde(default)]
    pub index: usize,

    /// Page text, in Markdown.
    #[serde(default)]
    pub markdown: String,

    /// Images cut out of the page. The Markdown refers to them by `id`.
    #[serde(default)]
    pub images: Vec<OcrImage>,

    /// Other fields, such as `dimensions`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An image extracted from a page.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct OcrImage {
    /// The name used in the page's Markdown, like `img-0.jpeg`.
    pub id: String,

    /// Image data, usually as a `data:` URL. The outer `Option` records
    /// whether the field was present at all, so an explicit `null` survives
    /// a round trip.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_base64: Option<Option<String>>,

    /// Other fields, such as bounding box coordinates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OcrImage {
    /// The image data, if the service sent any.
    pub fn payload(&self) -> Option<&str> {
        self.image_base64.as_ref()?.as_deref()
    }
}

/// Wrap a field that is present in `Some`, even if its value is `null`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl OcrResult {
    /// Iterate over page texts in page order.
    pub fn page_texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|page| page.markdown.as_str())
    }
}

/// Ways a call to the OCR service can fail. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    /// The service rejected our API key.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// We never got an HTTP response.
    #[error("could not reach the OCR service: {message}")]
    Transport { message: String },

    /// The service answered, but could not OCR the document.
    #[error("the OCR service could not process the document: {message}")]
    Processing { status: Option<u16>, message: String },
}

/// A remote OCR service.
#[async_trait]
pub trait OcrService: Send + Sync {
    /// Upload a document and wait for its OCR result.
    async fn submit(&self, data: &[u8], mime_type: &str) -> Result<OcrResult, OcrError>;
}
