//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).
//! Every variable has a default, so an empty environment yields a runnable server.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: ServerConfig,
    pub relay: RelayConfig,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            _ => Err(()),
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What to do when a connection's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Evict the slow connection; it then leaves like any other disconnect
    #[default]
    Disconnect,
    /// Drop the frame that did not fit, for that connection only
    DropNewest,
}

impl FromStr for OverflowPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disconnect" => Ok(Self::Disconnect),
            "drop_newest" | "drop-newest" => Ok(Self::DropNewest),
            _ => Err(()),
        }
    }
}

/// Relay tuning
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Capacity of each connection's outbound queue, in frames
    pub outbound_buffer: usize,
    /// Upper bound on a single socket write
    pub send_timeout_ms: u64,
    /// Close a connection that sent nothing for this long (0 disables)
    pub idle_timeout_secs: u64,
    pub overflow_policy: OverflowPolicy,
}

impl RelayConfig {
    /// Smallest usable queue: `player_id` and `world_state` are queued back to back
    pub const MIN_OUTBOUND_BUFFER: usize = 2;

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: default_outbound_buffer(),
            send_timeout_ms: default_send_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "balloon-relay".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_idle_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to a value that cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let outbound_buffer: usize = vars.parse_or("RELAY_OUTBOUND_BUFFER", default_outbound_buffer)?;
        if outbound_buffer < RelayConfig::MIN_OUTBOUND_BUFFER {
            return Err(ConfigError::InvalidValue(
                "RELAY_OUTBOUND_BUFFER",
                outbound_buffer.to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: vars.get("APP_NAME").unwrap_or_else(default_app_name),
                env: vars.parse_or("APP_ENV", Environment::default)?,
            },
            gateway: ServerConfig {
                host: vars.get("GATEWAY_HOST").unwrap_or_else(default_host),
                port: vars.parse_or("GATEWAY_PORT", default_port)?,
            },
            relay: RelayConfig {
                outbound_buffer,
                send_timeout_ms: vars.parse_or("RELAY_SEND_TIMEOUT_MS", default_send_timeout_ms)?,
                idle_timeout_secs: vars
                    .parse_or("RELAY_IDLE_TIMEOUT_SECS", default_idle_timeout_secs)?,
                overflow_policy: vars.parse_or("RELAY_OVERFLOW_POLICY", OverflowPolicy::default)?,
            },
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    }

    fn parse_or<T: FromStr>(
        &self,
        name: &'static str,
        default: impl FnOnce() -> T,
    ) -> Result<T, ConfigError> {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(name, raw)),
            None => Ok(default()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
