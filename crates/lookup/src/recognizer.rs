//! Client for the plate-recognition HTTP API.
//!
//! Uploads a still image as multipart form data and decodes the list of
//! candidate plates. Callers normally only need
//! [`PlateResponse::best_match`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

/// Largest upload the recognition API accepts (3 MiB).
pub const MAX_UPLOAD_BYTES: usize = 3 * 1024 * 1024;

/// Multipart field name carrying the image.
const UPLOAD_FIELD: &str = "upload";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Pixel bounding box, as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateRegion {
    pub code: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedVehicle {
    #[serde(rename = "type")]
    pub kind: String,
    pub score: f64,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

/// One candidate plate read from the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateResult {
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    /// Plate text, usually lower case without spaces.
    pub plate: String,
    pub region: PlateRegion,
    pub vehicle: DetectedVehicle,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateResponse {
    pub results: Vec<PlateResult>,
    pub timestamp: String,
    pub version: i64,
    #[serde(default)]
    pub camera_id: Option<String>,
}

impl PlateResponse {
    /// Candidate with the highest score, if any plate was read.
    pub fn best_match(&self) -> Option<&PlateResult> {
        self.results
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Anything that can read number plates out of an image.
#[async_trait]
pub trait PlateRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<PlateResponse, LookupError>;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// HTTP client for the plate-reader endpoint.
pub struct PlateRecognizerClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl PlateRecognizerClient {
    /// * `api_url` - Full endpoint URL, e.g.
    ///   `https://api.platerecognizer.com/v1/plate-reader/`.
    /// * `token` - API token sent as `Authorization: Token <token>`.
    pub fn new(api_url: String, token: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, token)
    }

    /// Create a client reusing an existing [`reqwest::Client`], e.g. one
    /// built with a request timeout.
    pub fn with_client(client: reqwest::Client, api_url: String, token: String) -> Self {
        Self {
            client,
            api_url,
            token,
        }
    }

    // ---- private helpers ----

    /// Only 200 and 201 count as success for this API.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, LookupError> {
        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LookupError::Api { status, body });
        }
        Ok(response)
    }
}

#[async_trait]
impl PlateRecognizer for PlateRecognizerClient {
    async fn recognize(&self, image: &[u8]) -> Result<PlateResponse, LookupError> {
        if image.len() > MAX_UPLOAD_BYTES {
            return Err(LookupError::PayloadTooLarge {
                size: image.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }

        let part = Part::bytes(image.to_vec())
            .file_name("image.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        tracing::debug!(bytes = image.len(), "Uploading image for plate recognition");

        let response = self
            .client
            .post(&self.api_url)
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
            .multipart(form)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.bytes().await?;
        let parsed: PlateResponse = serde_json::from_slice(&body)?;

        tracing::info!(candidates = parsed.results.len(), "Plate recognition complete");
        Ok(parsed)
    }
}
