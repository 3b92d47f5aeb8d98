//! Layered application configuration.
//!
//! Priority, lowest to highest: struct defaults, YAML file (`--config` or
//! `./config.yaml`), `APP_`-prefixed environment (`APP_SERVER__PORT=8000`),
//! the well-known `GOOGLE_*` variables, then CLI flags.

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Default config file picked up from the working directory.
const CWD_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub oauth: OAuthConfig,
    pub session: SessionConfig,
    pub chat: ChatConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole request, including model inference.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            request_timeout_secs: 120,
        }
    }
}

/// Cross-origin policy. Local development origins only.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:5174".to_string(),
            ],
        }
    }
}

/// Identity provider settings.
///
/// Credentials are optional here on purpose: a server without them still
/// starts, and only the login endpoints fail.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// Where the browser lands after a successful login.
    pub frontend_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub provider_timeout_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            frontend_url: "http://localhost:5174/".to_string(),
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            provider_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of a session, matching the cookie max-age.
    pub ttl_secs: u64,
    /// Interval of the background eviction sweep. `0` disables it.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 300,
        }
    }
}

/// Text generation service and sampling configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    /// Expected model id; a mismatch with the service is logged, not fatal.
    pub model: String,
    pub api_key: Option<String>,
    pub system_prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub max_new_tokens: u32,
    /// Prompt token budget; the service truncates from the left beyond it.
    pub truncate: u32,
    /// Number of most recent turns replayed into the prompt.
    pub history_window: usize,
    /// Bound on every call to the service, `/info` included.
    pub generation_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            model: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
            api_key: None,
            system_prompt: "You are a helpful AI assistant. Keep responses brief and helpful."
                .to_string(),
            temperature: 0.8,
            top_p: 0.9,
            repetition_penalty: 1.2,
            max_new_tokens: 100,
            truncate: 512,
            history_window: 6,
            generation_timeout_secs: 60,
            connect_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Emit JSON log lines instead of the compact format.
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder();

        // 1. Config file: explicit path must exist, the cwd fallback may not.
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(CWD_CONFIG_FILE).exists() {
            builder = builder.add_source(File::with_name(CWD_CONFIG_FILE).required(false));
        }

        // 2. APP_ prefixed environment, e.g. APP_SESSION__TTL_SECS=600
        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        );

        // 3. Well-known OAuth variables
        for (var, key) in [
            ("GOOGLE_CLIENT_ID", "oauth.client_id"),
            ("GOOGLE_CLIENT_SECRET", "oauth.client_secret"),
            ("GOOGLE_REDIRECT_URI", "oauth.redirect_uri"),
        ] {
            if let Some(val) = non_empty_env(var) {
                builder = builder.set_override(key, val)?;
            }
        }

        // 4. CLI flags (clap already folded in PORT / HOST)
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }

        let cfg = builder.build()?;
        cfg.try_deserialize()
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}
