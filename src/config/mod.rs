use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Infura project key, used to build the mainnet endpoint URL.
pub const INFURA_KEY_ENV: &str = "INFURA_API_KEY";
/// Hex-encoded secp256k1 key of the minting wallet.
pub const PRIVATE_KEY_ENV: &str = "WALLET_PRIVATE_KEY";
/// Overrides the Infura endpoint, e.g. for a local fork.
pub const RPC_URL_ENV: &str = "DRINKBOT_RPC_URL";
pub const VARIANT_ENV: &str = "DRINKBOT_VARIANT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required env var: {0}")]
    MissingEnv(String),
    #[error("unknown poller variant: {0} (expected \"members\" or \"guarded\")")]
    UnknownVariant(String),
    #[error("invalid wallet private key: {0}")]
    InvalidKey(String),
    #[error("invalid RPC URL: {0}")]
    InvalidUrl(String),
    #[error("failed to read contract interface {path}: {source}")]
    InterfaceIo {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed contract interface: {0}")]
    InterfaceParse(#[from] serde_json::Error),
    #[error("contract interface is missing function {0}")]
    MissingFunction(String),
    #[error("contract function {0} must be payable")]
    NotPayable(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollerConfig {
    /// Which flavour of the polling loop to run.
    #[serde(default)]
    pub variant: Variant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

/// The two flavours of the polling loop.
///
/// `Members` polls every 10s, treats the bar as closed as soon as it leaves
/// members-only mode, and gives up polling on the first failed tick.
/// `Guarded` polls every 30s, only watches the open flag, and logs failed
/// ticks before trying again on the next interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Members,
    #[default]
    Guarded,
}

impl Variant {
    pub fn poll_interval(self) -> Duration {
        match self {
            Self::Members => Duration::from_secs(10),
            Self::Guarded => Duration::from_secs(30),
        }
    }

    /// Whether a false `onlyFins` flag also closes the bar.
    pub fn requires_members_only(self) -> bool {
        matches!(self, Self::Members)
    }

    /// Whether a failed tick is logged and retried rather than ending the poll.
    pub fn retries_failed_ticks(self) -> bool {
        matches!(self, Self::Guarded)
    }

    pub fn log_timestamps(self) -> bool {
        matches!(self, Self::Guarded)
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "members" | "a" => Ok(Self::Members),
            "guarded" | "b" => Ok(Self::Guarded),
            other => Err(ConfigError::UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Members => write!(f, "members"),
            Self::Guarded => write!(f, "guarded"),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Default config with environment overrides (no file needed).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(variant) = var(VARIANT_ENV).filter(|v| !v.trim().is_empty()) {
            self.poller.variant = variant.parse()?;
        }
        Ok(())
    }
}

/// Secrets needed to reach the chain and sign transactions. Never read from
/// the config file.
#[derive(Clone)]
pub struct Credentials {
    pub rpc_url: String,
    pub private_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("rpc_url", &"<redacted>")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Both the Infura key and the wallet key are required, even when the
    /// endpoint is overridden.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            var(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
        };

        let infura_key = required(INFURA_KEY_ENV)?;
        let private_key = required(PRIVATE_KEY_ENV)?;

        let rpc_url = var(RPC_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| infura_mainnet_url(&infura_key));

        Ok(Self {
            rpc_url,
            private_key: private_key.trim().to_string(),
        })
    }
}

pub fn infura_mainnet_url(api_key: &str) -> String {
    format!("https://mainnet.infura.io/v3/{}", api_key.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_variant_settings() {
        assert_eq!(Variant::Members.poll_interval(), Duration::from_secs(10));
        assert_eq!(Variant::Guarded.poll_interval(), Duration::from_secs(30));
        assert!(Variant::Members.requires_members_only());
        assert!(!Variant::Guarded.requires_members_only());
        assert!(Variant::Guarded.retries_failed_ticks());
        assert!(!Variant::Members.retries_failed_ticks());
        assert_eq!(Variant::default(), Variant::Guarded);
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("members".parse::<Variant>().unwrap(), Variant::Members);
        assert_eq!(" Guarded ".parse::<Variant>().unwrap(), Variant::Guarded);
        assert!(matches!(
            "happy-hour".parse::<Variant>(),
            Err(ConfigError::UnknownVariant(_))
        ));
    }

    #[test]
    fn test_toml_config() {
        let config: Config = toml::from_str(
            r#"
            [poller]
            variant = "members"

            [logging]
            json = true
            "#,
        )
        .unwrap();
        assert_eq!(config.poller.variant, Variant::Members);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_variant() {
        let mut config = Config::default();
        config
            .apply_env(lookup(&[(VARIANT_ENV, "members")]))
            .unwrap();
        assert_eq!(config.poller.variant, Variant::Members);

        assert!(config.apply_env(lookup(&[(VARIANT_ENV, "c")])).is_err());
    }

    #[test]
    fn test_credentials_require_both_secrets() {
        let err = Credentials::from_lookup(lookup(&[(PRIVATE_KEY_ENV, "0xabc")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref v) if v == INFURA_KEY_ENV));

        let err = Credentials::from_lookup(lookup(&[(INFURA_KEY_ENV, "key"), (PRIVATE_KEY_ENV, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ref v) if v == PRIVATE_KEY_ENV));
    }

    #[test]
    fn test_credentials_endpoint() {
        let creds =
            Credentials::from_lookup(lookup(&[(INFURA_KEY_ENV, "key"), (PRIVATE_KEY_ENV, "0xabc")]))
                .unwrap();
        assert_eq!(creds.rpc_url, "https://mainnet.infura.io/v3/key");

        let creds = Credentials::from_lookup(lookup(&[
            (INFURA_KEY_ENV, "key"),
            (PRIVATE_KEY_ENV, "0xabc"),
            (RPC_URL_ENV, "http://127.0.0.1:8545"),
        ]))
        .unwrap();
        assert_eq!(creds.rpc_url, "http://127.0.0.1:8545");
        assert!(!format!("{creds:?}").contains("0xabc"));
    }
}
