use crate::ai::{ProviderConfig, ProviderKind};
use crate::error::ConfigError;
use log::{info, warn};
use serde::Deserialize;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

/// Application configuration
///
/// Every field has a default, so an empty TOML file (or no file at all) is
/// a valid configuration. Credentials are never read from the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderSettings,
}

/// Where the web form listens
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Provider selection and tuning
///
/// Unset optional fields fall back to the selected provider's defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            endpoint: None,
            model: None,
            max_tokens: None,
            temperature: None,
            timeout_seconds: 60,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, and a
    /// parse or validation error if its contents are invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the optional configuration file
    ///
    /// A missing or unreadable file falls back to defaults with a warning;
    /// a file that exists but is invalid is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                match Self::from_file(path) {
                    Err(ConfigError::ReadError(e)) => {
                        warn!("Configuration file not readable ({}), using defaults", e);
                        Ok(Self::default())
                    }
                    other => other,
                }
            }
            None => {
                info!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Apply `PORT` and `CORRECTION_PROVIDER` overrides
    ///
    /// # Arguments
    /// * `lookup` - Variable lookup, normally `std::env::var(..).ok()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an unparsable port, an
    /// unknown provider name, or a resulting configuration that fails `validate`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{}'", port))
            })?;
        }

        if let Some(kind) = lookup("CORRECTION_PROVIDER") {
            self.provider.kind = kind.parse().map_err(ConfigError::ValidationError)?;
        }

        self.validate()
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }

        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host must not be empty".to_string(),
            ));
        }

        if self.provider.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "provider.timeout_seconds must be greater than zero".to_string(),
            ));
        }

        if let Some(temperature) = self.provider.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::ValidationError(format!(
                    "provider.temperature must be between 0 and 2, got {}",
                    temperature
                )));
            }
        }

        if self.provider.max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "provider.max_tokens must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the provider configuration, reading the credential via `lookup`
    ///
    /// Only the active provider's credential variable is consulted.
    pub fn provider_config<F>(&self, lookup: F) -> ProviderConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = &self.provider;
        let mut config = ProviderConfig::new(settings.kind);

        if let Some(endpoint) = &settings.endpoint {
            config = config.with_endpoint(endpoint.clone());
        }
        if let Some(model) = &settings.model {
            config = config.with_model(model.clone());
        }
        if let Some(max_tokens) = settings.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(temperature) = settings.temperature {
            config.temperature = temperature;
        }
        if let Some(api_key) = lookup(settings.kind.api_key_env()) {
            config = config.with_api_key(api_key);
        }

        config
    }

    /// Timeout applied to each outbound provider request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_seconds)
    }

    /// Resolve the listen address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        (self.server.host.as_str(), self.server.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "server.host '{}' did not resolve to an address",
                    self.server.host
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.provider.kind, ProviderKind::OpenAI);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_empty_document() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_full_document() {
        let config = Config::parse(
            r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [provider]
            kind = "gemini"
            model = "gemini-2.0-flash"
            max_tokens = 256
            temperature = 0.2
            timeout_seconds = 15
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.provider.max_tokens, Some(256));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_parse_rejects_unknown_provider() {
        let result = Config::parse("[provider]\nkind = \"claude\"");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_validation_errors() {
        for document in [
            "[server]\nport = 0",
            "[provider]\ntimeout_seconds = 0",
            "[provider]\ntemperature = 3.5",
            "[provider]\nmax_tokens = 0",
            "[server]\nhost = \"  \"",
        ] {
            assert!(
                matches!(Config::parse(document), Err(ConfigError::ValidationError(_))),
                "expected validation error for {:?}",
                document
            );
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4000").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/proofread.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();

        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("PORT", "5050"), ("CORRECTION_PROVIDER", "gemini")]))
            .unwrap();

        assert_eq!(config.server.port, 5050);
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let result = config.apply_env(env(&[("PORT", "0")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_env_rejects_unknown_provider() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("CORRECTION_PROVIDER", "bard")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_provider_config_reads_matching_key() {
        let lookup = env(&[("OPENAI_KEY", "sk-live"), ("GEMINI_API_KEY", "g-live")]);

        let openai = Config::default().provider_config(&lookup);
        assert_eq!(openai.kind, ProviderKind::OpenAI);
        assert_eq!(openai.api_key.as_deref(), Some("sk-live"));

        let mut config = Config::default();
        config.provider.kind = ProviderKind::Gemini;
        let gemini = config.provider_config(&lookup);
        assert_eq!(gemini.api_key.as_deref(), Some("g-live"));
    }

    #[test]
    fn test_provider_config_only_needs_active_key() {
        let lookup = env(&[("GEMINI_API_KEY", "g-live")]);
        let openai = Config::default().provider_config(lookup);
        assert!(openai.api_key.is_none());
    }

    #[test]
    fn test_provider_config_applies_overrides() {
        let config = Config::parse(
            r#"
            [provider]
            endpoint = "http://localhost:8000/v1"
            model = "gpt-4o-mini"
            max_tokens = 50
            temperature = 0.0
            "#,
        )
        .unwrap();

        let provider = config.provider_config(|_| None);
        assert_eq!(provider.endpoint, "http://localhost:8000/v1");
        assert_eq!(provider.model, "gpt-4o-mini");
        assert_eq!(provider.max_tokens, 50);
        assert_eq!(provider.temperature, 0.0);
    }

    #[test]
    fn test_bind_addr() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 3100;

        let addr = config.bind_addr().unwrap();
        assert_eq!(addr, "127.0.0.1:3100".parse::<SocketAddr>().unwrap());
    }
}
