use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::client_key::{CredentialHash, DEFAULT_SHARED_KEY, KeyStrategy, SharedKey};
use crate::error::GateError;
use crate::provider::ProviderConfig;
use crate::rate_limit::GateConfig;

// How the client key for rate limiting is derived
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategyKind {
    /// One key for every caller (global throttle)
    Shared,
    /// SHA-256 of the caller's bearer credential
    Credential,
}

// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "blog-gateway")]
#[command(about = "Rate-limited blog post generation gateway")]
pub struct Args {
    // Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "GATEWAY_HOST")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, default_value_t = 8080, env = "GATEWAY_PORT")]
    pub port: u16,

    // Rate limit max requests per window for the generation endpoint
    #[arg(long, default_value_t = 5, env = "GATEWAY_RATE_LIMIT")]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60, env = "GATEWAY_RATE_WINDOW")]
    pub rate_window: u64,

    // Max distinct client keys tracked at once
    #[arg(long, default_value_t = 500, env = "GATEWAY_MAX_TRACKED_KEYS")]
    pub max_tracked_keys: usize,

    #[arg(
        long,
        value_enum,
        default_value_t = KeyStrategyKind::Credential,
        env = "GATEWAY_KEY_STRATEGY"
    )]
    pub key_strategy: KeyStrategyKind,

    // Key used by the shared strategy and as the credential fallback
    #[arg(long, default_value = DEFAULT_SHARED_KEY, env = "GATEWAY_SHARED_KEY")]
    pub shared_key: String,

    // Chat completions base url
    #[arg(long, default_value = "https://api.openai.com/v1", env = "GATEWAY_PROVIDER_URL")]
    pub provider_url: String,

    #[arg(long, default_value = "gpt-3.5-turbo", env = "GATEWAY_MODEL")]
    pub model: String,

    #[arg(long, default_value_t = 1000, env = "GATEWAY_MAX_TOKENS")]
    pub max_tokens: u32,

    // Provider request timeout in seconds
    #[arg(long, default_value_t = 60, env = "GATEWAY_PROVIDER_TIMEOUT")]
    pub provider_timeout: u64,

    // Server-side key, used when the caller sends none
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Expired counter cleanup interval in seconds
    #[arg(long, default_value_t = 60, env = "GATEWAY_CLEANUP_INTERVAL")]
    pub cleanup_interval: u64,

    #[arg(long, default_value = "info", env = "GATEWAY_LOG_LEVEL")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "GATEWAY_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn gate_config(&self) -> Result<GateConfig, GateError> {
        GateConfig::new(
            Duration::from_secs(self.rate_window),
            self.max_tracked_keys,
            self.rate_limit,
        )
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.provider_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.provider_timeout),
            api_key: self.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    pub fn build_key_strategy(&self) -> Box<dyn KeyStrategy> {
        let shared = SharedKey(self.shared_key.clone());
        match self.key_strategy {
            KeyStrategyKind::Shared => Box::new(shared),
            KeyStrategyKind::Credential => Box::new(CredentialHash { fallback: shared }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployed_limits() {
        let args = Args::parse_from(["blog-gateway"]);
        let gate = args.gate_config().unwrap();
        assert_eq!(gate.max_per_interval, 5);
        assert_eq!(gate.interval, Duration::from_secs(60));
        assert_eq!(gate.max_tracked_keys, 500);
        assert_eq!(args.key_strategy, KeyStrategyKind::Credential);
        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(args.provider_config().model, "gpt-3.5-turbo");
    }

    #[test]
    fn zero_window_is_a_configuration_error() {
        let args = Args::parse_from(["blog-gateway", "--rate-window", "0"]);
        assert!(matches!(args.gate_config(), Err(GateError::Configuration(_))));
    }

    #[test]
    fn shared_strategy_uses_configured_key() {
        let args = Args::parse_from([
            "blog-gateway",
            "--key-strategy",
            "shared",
            "--shared-key",
            "everyone",
        ]);
        let strategy = args.build_key_strategy();
        assert_eq!(strategy.client_key(&Default::default()), "everyone");
    }

    #[test]
    fn log_format_is_validated() {
        let args = Args::parse_from(["blog-gateway", "--log-format", "json"]);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(Args::try_parse_from(["blog-gateway", "--log-format", "jsn"]).is_err());
    }
}
