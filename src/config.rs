// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 CryptoSMS Contributors

//! # Runtime Configuration
//!
//! Environment variable names and default values used throughout the
//! application. Configuration is loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the embedded database file | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `TWILIO_ACCOUNT_SID` | Twilio account SID | unset → log-only delivery |
//! | `TWILIO_AUTH_TOKEN` | Twilio auth token | unset → log-only delivery |
//! | `TWILIO_PHONE_NUMBER` | Outbound sender identity | required with Twilio |

use std::net::SocketAddr;
use std::path::PathBuf;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Name of the embedded database file inside the data directory.
pub const DB_FILE_NAME: &str = "cryptosms.redb";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid bind address {addr}: {reason}")]
    InvalidBindAddr { addr: String, reason: String },
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_format: String,
}

impl Config {
    /// Load configuration from the environment, applying defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let addr = format!("{host}:{port}");
        let bind_addr: SocketAddr = addr.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidBindAddr {
                addr,
                reason: e.to_string(),
            }
        })?;

        let data_dir =
            PathBuf::from(std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| "/data".to_string()));
        let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

        Ok(Self {
            bind_addr,
            data_dir,
            log_format,
        })
    }

    /// Full path of the embedded database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}
