use thiserror::Error;

/// Errors that can occur while requesting a correction
///
/// None of these reach the presentation layer; the correction handler
/// folds every variant into a displayable message.
#[derive(Error, Debug)]
pub enum CorrectionError {
    #[error("No text to correct")]
    EmptyInput,

    #[error("{0} API key is missing")]
    MissingApiKey(&'static str),

    #[error("HTTP error: {0}")]
    HttpError(reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

// Request URLs can carry credentials in the query string
impl From<reqwest::Error> for CorrectionError {
    fn from(e: reqwest::Error) -> Self {
        CorrectionError::HttpError(e.without_url())
    }
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
