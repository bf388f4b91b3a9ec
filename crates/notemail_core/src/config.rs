//! Service configuration.
//!
//! # Responsibility
//! - Build one immutable `Config` at startup from environment-style input.
//! - Reject missing or malformed required settings before anything starts.
//!
//! # Invariants
//! - Blank values count as missing.
//! - `log_dir` is absolute.

use crate::logging::{default_log_level, parse_level};
use log::LevelFilter;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_EMAIL_ADDRESS: &str = "EMAIL_ADDRESS";
pub const ENV_EMAIL_PASSWORD: &str = "EMAIL_PASSWORD";
pub const ENV_RECIPIENT_EMAIL: &str = "RECIPIENT_EMAIL";
pub const ENV_WATCH_ROOT: &str = "OBSIDIAN_VAULT_PATH";
pub const ENV_DB_PATH: &str = "DB_PATH";
pub const ENV_SMTP_SERVER: &str = "SMTP_SERVER";
pub const ENV_SMTP_PORT: &str = "SMTP_PORT";
pub const ENV_HTTP_ADDR: &str = "HTTP_ADDR";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LOG_DIR";

const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8002";
const DEFAULT_LEDGER_RELATIVE: &str = "data/notemail.db";
const DEFAULT_LOG_RELATIVE: &str = "logs";
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    Missing(&'static str),
    /// A setting is present but unusable.
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    /// The installation directory used for defaults cannot be resolved.
    InstallDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(key) => write!(f, "required setting `{key}` is not set"),
            Self::Invalid { key, value, reason } => {
                write!(f, "invalid value `{value}` for `{key}`: {reason}")
            }
            Self::InstallDir(err) => {
                write!(f, "cannot resolve installation directory: {err}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InstallDir(err) => Some(err),
            Self::Missing(_) | Self::Invalid { .. } => None,
        }
    }
}

/// Sender mailbox and its credential. The password never appears in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SenderCredentials {
    pub address: String,
    password: String,
}

impl SenderCredentials {
    pub fn new(address: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for SenderCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// SMTP submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_SERVER.to_string(),
            port: DEFAULT_SMTP_PORT,
            timeout: SMTP_TIMEOUT,
        }
    }
}

/// Immutable service configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub watch_root: PathBuf,
    /// Fixed recipient for every note delivery.
    pub recipient: String,
    pub sender: SenderCredentials,
    pub ledger_path: PathBuf,
    pub smtp: SmtpSettings,
    pub http_addr: SocketAddr,
    pub log_level: LevelFilter,
    pub log_dir: PathBuf,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let address = require(ENV_EMAIL_ADDRESS)?;
        let password = require(ENV_EMAIL_PASSWORD)?;
        let recipient = require(ENV_RECIPIENT_EMAIL)?;
        let watch_root = PathBuf::from(require(ENV_WATCH_ROOT)?);

        let ledger_path = match get(ENV_DB_PATH) {
            Some(value) => PathBuf::from(value),
            None => default_ledger_path()?,
        };

        let mut smtp = SmtpSettings::default();
        if let Some(host) = get(ENV_SMTP_SERVER) {
            smtp.host = host;
        }
        if let Some(port) = get(ENV_SMTP_PORT) {
            smtp.port = port.parse::<u16>().map_err(|err| ConfigError::Invalid {
                key: ENV_SMTP_PORT,
                value: port.clone(),
                reason: format!("{err}"),
            })?;
        }

        let http_addr_text = get(ENV_HTTP_ADDR).unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let http_addr = http_addr_text
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                key: ENV_HTTP_ADDR,
                value: http_addr_text.clone(),
                reason: format!("{err}"),
            })?;

        let log_level = match get(ENV_LOG_LEVEL) {
            Some(value) => parse_level(&value).map_err(|err| ConfigError::Invalid {
                key: ENV_LOG_LEVEL,
                value: value.clone(),
                reason: err.to_string(),
            })?,
            None => default_log_level(),
        };

        let log_dir = match get(ENV_LOG_DIR) {
            Some(value) => {
                let dir = PathBuf::from(&value);
                if !dir.is_absolute() {
                    return Err(ConfigError::Invalid {
                        key: ENV_LOG_DIR,
                        value,
                        reason: "must be an absolute path".to_string(),
                    });
                }
                dir
            }
            None => install_dir()?.join(DEFAULT_LOG_RELATIVE),
        };

        Ok(Self {
            watch_root,
            recipient,
            sender: SenderCredentials::new(address, password),
            ledger_path,
            smtp,
            http_addr,
            log_level,
            log_dir,
        })
    }
}

/// `<install dir>/data/notemail.db`.
pub fn default_ledger_path() -> Result<PathBuf, ConfigError> {
    Ok(install_dir()?.join(DEFAULT_LEDGER_RELATIVE))
}

/// Directory holding the running executable.
pub fn install_dir() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::InstallDir)?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}
