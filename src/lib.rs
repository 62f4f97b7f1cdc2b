/// Error types for correction requests and configuration
pub mod error;

/// Correction handler and LLM provider implementations
pub mod ai;

/// Configuration management
pub mod config;

/// HTML rendering for the correction form
pub mod views;

/// HTTP routes and server loop
pub mod server;

// Re-export commonly used types
pub use ai::{CorrectionHandler, CorrectionResult, ProviderConfig, ProviderKind};
pub use error::{ConfigError, CorrectionError};
