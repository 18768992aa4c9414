// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide configuration, resolved once at startup

pub mod draw;

pub use draw::{DeviceClass, DrawBoxConfig};

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

use crate::vision::VisionModelConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 7861;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind host '{0}'")]
    InvalidHost(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// HTTP serving settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Expose the endpoint publicly (permissive CORS)
    pub share: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            share: false,
        }
    }
}

/// Everything the binary needs, immutable after construction
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub device_class: DeviceClass,
    pub vision: VisionModelConfig,
    pub label_font: Option<PathBuf>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;
        if self.vision.intra_threads == 0 {
            return Err(ConfigError::ZeroValue("intra_threads"));
        }
        Ok(())
    }

    pub fn draw_config(&self) -> DrawBoxConfig {
        self.device_class.draw_config()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            device_class: DeviceClass::default(),
            vision: VisionModelConfig::default(),
            label_font: None,
        }
    }
}
