use crate::ai::backends::{Extraction, Provider};
use crate::error::{ConfigError, CorrectionError};
use log::{debug, error, info, warn};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Shown when the submitted text is empty after trimming
pub const EMPTY_INPUT_MESSAGE: &str = "Please enter some text to correct";

/// Shown when the provider answered without a usable correction
pub const NO_CORRECTION_MESSAGE: &str = "Could not get a correction.";

/// Shown for any transport or parse failure
pub const RETRY_MESSAGE: &str = "Error. Please try again.";

/// The pair of values handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionResult {
    /// The submitted text, trimmed
    pub original_text: String,
    /// The correction, a validation hint, or an error placeholder
    pub corrected_text: String,
}

impl CorrectionResult {
    /// Create a result from the text pair
    ///
    /// # Arguments
    /// * `original_text` - The trimmed submission, or `""` for rejected input
    /// * `corrected_text` - The correction or the message to show instead
    pub fn new(original_text: impl Into<String>, corrected_text: impl Into<String>) -> Self {
        Self {
            original_text: original_text.into(),
            corrected_text: corrected_text.into(),
        }
    }

    /// The idle state rendered before anything is submitted
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Correction request handler
///
/// Validates the input, forwards it to the configured provider and folds
/// every outcome into a `CorrectionResult`. Holds no per-request state, so a
/// single instance is shared across concurrent requests.
pub struct CorrectionHandler {
    client: Client,
    provider: Arc<dyn Provider>,
}

impl CorrectionHandler {
    /// Create a handler with its own HTTP client
    ///
    /// # Arguments
    /// * `provider` - Strategy for the configured LLM provider
    /// * `timeout` - Upper bound on each outbound request
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::HttpClient` if the HTTP client cannot be built.
    pub fn new(provider: Arc<dyn Provider>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self::with_client(client, provider))
    }

    /// Create a handler around an existing HTTP client
    pub fn with_client(client: Client, provider: Arc<dyn Provider>) -> Self {
        Self { client, provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Correct one piece of user text
    ///
    /// # Arguments
    /// * `text` - Raw form input; surrounding whitespace is trimmed
    ///
    /// # Returns
    ///
    /// Always a `CorrectionResult`. Validation problems, missing credentials,
    /// transport failures and provider errors all come back as displayable text.
    pub async fn handle(&self, text: &str) -> CorrectionResult {
        let text = text.trim();

        match self.correct(text).await {
            Ok(corrected) => CorrectionResult::new(text, corrected),
            Err(CorrectionError::EmptyInput) => {
                warn!("Rejected empty correction request");
                CorrectionResult::new("", EMPTY_INPUT_MESSAGE)
            }
            Err(CorrectionError::MissingApiKey(provider)) => {
                warn!("{} API key is missing, skipping request", provider);
                CorrectionResult::new(
                    text,
                    format!("Server error: {} API key is missing.", provider),
                )
            }
            Err(e) => {
                error!("{} correction request failed: {}", self.provider.name(), e);
                CorrectionResult::new(text, RETRY_MESSAGE)
            }
        }
    }

    /// Run the request and extraction for already-trimmed text
    async fn correct(&self, text: &str) -> Result<String, CorrectionError> {
        if text.is_empty() {
            return Err(CorrectionError::EmptyInput);
        }

        let provider = self.provider.name();
        if !self.provider.has_api_key() {
            return Err(CorrectionError::MissingApiKey(provider));
        }

        debug!(
            "Sending {} character correction request to {}",
            text.chars().count(),
            provider
        );

        let response = self
            .provider
            .build_request(&self.client, text)
            .send()
            .await?;

        // Error bodies are still interpreted: some providers report quota
        // and auth failures in the JSON they return with a 4xx
        let status = response.status();
        if !status.is_success() {
            debug!("{} returned HTTP status {}", provider, status);
        }

        let body = response.text().await?;
        let json: Value = serde_json::from_str(&body).map_err(|e| {
            CorrectionError::InvalidResponse(format!("Failed to parse {} response: {}", provider, e))
        })?;

        match self.provider.extract(json) {
            Extraction::Success { text } => {
                info!("Received correction from {}", provider);
                Ok(text)
            }
            Extraction::Errored { message } => {
                warn!("{} reported an error: {}", provider, message);
                Ok(format!("API Error: {}", message))
            }
            Extraction::Malformed => {
                warn!("{} response contained no correction", provider);
                Ok(NO_CORRECTION_MESSAGE.to_string())
            }
        }
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::ai::backends::MockProvider;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// Strings made only of whitespace characters
    #[derive(Debug, Clone)]
    struct Blank(String);

    impl Arbitrary for Blank {
        fn arbitrary(g: &mut Gen) -> Self {
            let whitespace = [' ', '\t', '\n', '\r', '\u{a0}', '\u{2003}'];
            let len = usize::arbitrary(g) % 16;
            Blank((0..len).map(|_| *g.choose(&whitespace).unwrap()).collect())
        }
    }

    #[quickcheck]
    fn prop_blank_input_is_rejected_locally(input: Blank) -> bool {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let handler = CorrectionHandler::with_client(Client::new(), Arc::new(MockProvider::new()));

        let result = runtime.block_on(handler.handle(&input.0));
        result == CorrectionResult::new("", EMPTY_INPUT_MESSAGE)
    }

    // Without a credential the original text is echoed back trimmed
    #[quickcheck]
    fn prop_missing_key_keeps_trimmed_original(input: String) -> bool {
        if input.trim().is_empty() {
            return true;
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let mut provider = MockProvider::new();
        provider.expect_name().return_const("OpenAI");
        provider.expect_has_api_key().return_const(false);
        let handler = CorrectionHandler::with_client(Client::new(), Arc::new(provider));

        let result = runtime.block_on(handler.handle(&input));
        result.original_text == input.trim()
            && result.corrected_text == "Server error: OpenAI API key is missing."
    }
}
