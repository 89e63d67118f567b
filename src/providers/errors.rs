use thiserror::Error;

/// Errors that can occur within a `MarketDataProvider` implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure or HTTP client error.
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with an error status or error payload.
    #[error("API error: {0}")]
    Api(String),

    /// The payload did not have the expected shape.
    #[error("Malformed provider payload: {0}")]
    Parse(String),

    /// The symbol has no mapping on this provider.
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    /// The fetch did not finish within the configured bound.
    #[error("Fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// A required credential was not configured.
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
}
