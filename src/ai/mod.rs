/// Correction handler and LLM provider implementations
pub mod backends;
pub mod corrector;

pub use backends::{
    Extraction, GeminiProvider, OpenAIProvider, Provider, ProviderConfig, ProviderKind,
};
pub use corrector::{CorrectionHandler, CorrectionResult};
