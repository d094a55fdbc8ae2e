use spotted_core::error::CoreError;

/// Errors from the recognition and lookup adapters.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote service returned an unexpected status code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Image is {size} bytes, the recognition API accepts at most {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("No plate found in image")]
    NoPlateFound,

    #[error(transparent)]
    Core(#[from] CoreError),
}
