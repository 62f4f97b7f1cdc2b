/// Configuration management
mod settings;

pub use settings::{Config, ProviderSettings, ServerConfig};
