use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug, Default)]
#[command(name = "demobank", about = "DemoBank - demonstration online-banking backend")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "demobank.toml")]
    pub config: String,

    /// Port to listen on (overrides config file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Data directory for the JSON store (overrides config file)
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub otp: OtpConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    #[default]
    Json,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub engine: StorageEngine,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// When true, every endpoint except login, signup, OTP, /health and
    /// /metrics requires a session token or an API key.
    #[serde(default)]
    pub enabled: bool,

    /// Static API keys for scripted access. Each key has a name (for audit) and a role.
    #[serde(default)]
    pub api_keys: Vec<ApiKeyEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiKeyEntry {
    pub name: String,
    pub key: String,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OtpConfig {
    #[serde(default = "default_otp_ttl")]
    pub ttl_minutes: i64,

    #[serde(default = "default_otp_attempts")]
    pub max_attempts: u8,

    /// Return the code in the login response. Demo deployments only.
    #[serde(default)]
    pub expose_code: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_minutes: i64,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_otp_ttl() -> i64 {
    15
}

fn default_otp_attempts() -> u8 {
    3
}

fn default_session_ttl() -> i64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: StorageEngine::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_otp_ttl(),
            max_attempts: default_otp_attempts(),
            expose_code: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_session_ttl(),
        }
    }
}

impl Config {
    pub fn load(cli: &CliArgs) -> Self {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::from_toml(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Config::default()
            }),
            Err(_) => Config::default(),
        };

        // CLI overrides
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref dir) = cli.data_dir {
            config.storage.data_dir = dir.clone();
        }

        config
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
