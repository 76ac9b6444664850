// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {status} - Body: {body}")]
    Http { status: reqwest::StatusCode, body: String }, // e.g., 500, 503

    #[error("SEC rejected the request (403 Forbidden) - check User-Agent and rate limits")]
    RateLimited,

    #[error("No company facts published at {0}")]
    NotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

/// Failures of the details pipeline. Anything else is an empty result, not an error.
#[derive(Error, Debug)]
pub enum DetailsError {
    #[error("CIK not found for ticker '{0}' in predefined map.")]
    IdentifierNotFound(String),

    #[error("Failed to fetch SEC data for {ticker} (CIK: {cik}): {source}")]
    FetchFailed {
        ticker: String,
        cik: String,
        #[source]
        source: EdgarError,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum MetricError {
    #[error("Invalid metric key '{metric}'. Available: {available:?}")]
    NotConfigured { metric: String, available: Vec<String> },

    #[error("No data points found for metric '{metric}' for ticker '{ticker}'.")]
    NoData { metric: String, ticker: String },
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Drawing failed: {0}")]
    Drawing(String),

    #[error("PNG encoding failed: {0}")]
    Encoding(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Language model is not configured (set GEMINI_API_KEY)")]
    NotConfigured,

    #[error("Language model request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Language model returned HTTP {status}: {body}")]
    Http { status: reqwest::StatusCode, body: String },

    #[error("Unexpected language model response: {0}")]
    Response(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error(transparent)]
    Details(#[from] DetailsError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("Chart rendering failed: {0}")]
    Chart(#[from] ChartError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Bot processing failed: {0}")]
    Bot(#[from] BotError),
}
