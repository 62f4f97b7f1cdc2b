use anyhow::Context;
use clap::Parser;
use log::{debug, error, info, warn};
use proofread::ai::{CorrectionHandler, ProviderKind};
use proofread::config::Config;
use proofread::server;
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments for the correction server
#[derive(Parser)]
#[command(
    name = "proofread",
    about = "Web form that corrects text with an LLM provider",
    long_about = "Serves a single-page form. Submitted text is sent to the configured LLM provider \
                  (OpenAI chat completions or Gemini generate-content) and the correction is \
                  rendered back next to the original."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Provider override
    #[arg(long, value_enum, help = "LLM provider to use (overrides config and environment)")]
    provider: Option<ProviderKind>,

    /// Port override
    #[arg(short, long, help = "Port to listen on (overrides config and PORT)")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in Config::load
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }

            if let Some(extension) = config_path.extension() {
                if extension != "toml" {
                    warn!(
                        "Configuration file does not have .toml extension: {}",
                        config_path.display()
                    );
                }
            }
        }

        if self.port == Some(0) {
            return Err("Port must be non-zero".to_string());
        }

        Ok(())
    }

    /// Apply command-line overrides, which take precedence over file and environment
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider.kind = provider;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment configuration")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let provider_config = config.provider_config(|key| std::env::var(key).ok());
    debug!("Provider configuration: {:?}", provider_config);
    if provider_config.api_key.is_none() {
        warn!(
            "{} is not set; every correction will report a missing API key",
            provider_config.kind.api_key_env()
        );
    }

    let handler = CorrectionHandler::new(provider_config.into_provider(), config.request_timeout())?;
    let addr = config.bind_addr()?;

    server::serve(Arc::new(handler), addr)
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load .env before logging so RUST_LOG can live there too
    let dotenv = dotenvy::dotenv();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {}", e),
    }

    info!("Starting proofread");

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
