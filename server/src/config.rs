use serde::{Deserialize, Serialize};
use std::{path::PathBuf, str::FromStr};
use thiserror::Error;
use tracing::Level;

/// Configuration for the server, usually read from a YAML file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_facilitator_secret")]
    pub facilitator_secret: String,
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_mailbox_size")]
    pub mailbox_size: usize,
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            facilitator_secret: default_facilitator_secret(),
            public_dir: default_public_dir(),
            log_level: default_log_level(),
            mailbox_size: default_mailbox_size(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("facilitator_secret must not be empty")]
    EmptySecret,
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
}

pub struct ValidatedConfig {
    pub port: u16,
    pub facilitator_secret: String,
    pub public_dir: PathBuf,
    pub log_level: Level,

    pub mailbox_size: usize,
    pub outbound_buffer: usize,
}

fn default_port() -> u16 {
    3000
}

fn default_facilitator_secret() -> String {
    "admin123".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mailbox_size() -> usize {
    1024
}

fn default_outbound_buffer() -> usize {
    256
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.facilitator_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        if self.mailbox_size == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "mailbox_size",
                value: self.mailbox_size,
            });
        }
        if self.outbound_buffer == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "outbound_buffer",
                value: self.outbound_buffer,
            });
        }

        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        Ok(ValidatedConfig {
            port: self.port,
            facilitator_secret: self.facilitator_secret,
            public_dir: PathBuf::from(self.public_dir),
            log_level,
            mailbox_size: self.mailbox_size,
            outbound_buffer: self.outbound_buffer,
        })
    }
}
