//! Environment-backed configuration.

use crate::di::{Container, Injectable};
use dashmap::DashMap;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration service
///
/// Snapshots the process environment on construction; values set afterwards
/// are visible to every holder of the service.
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::from_vars(env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let service = Self::default();
        for (key, value) in vars {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse `key` as `T`; missing or unparsable values yield `None`.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key)?.parse().ok()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

impl Injectable for ConfigService {
    fn inject(_: &Container) -> crate::Result<Self> {
        Ok(Self::new())
    }
}

/// Where [`Application::listen`](crate::lifecycle::Application::listen) binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 3000;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Read `HOST` and `PORT`, falling back to `0.0.0.0:3000`.
    pub fn from_env() -> Self {
        Self::from_config(&ConfigService::new())
    }

    pub fn from_config(config: &ConfigService) -> Self {
        let port = config.get("PORT").map(|raw| {
            raw.parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT {:?}, using {}", raw, Self::DEFAULT_PORT);
                Self::DEFAULT_PORT
            })
        });
        Self {
            host: config.get_or("HOST", Self::DEFAULT_HOST),
            port: port.unwrap_or(Self::DEFAULT_PORT),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.addr().parse().ok()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HOST, Self::DEFAULT_PORT)
    }
}
