//! Extension pour intégrer la configuration du backend dans frameconfig
//!
//! Ce module fournit le trait `FrameArtConfigExt`, qui ajoute à
//! `frameconfig::Config` les accesseurs de la section `backend`.

use crate::client::{ClientBuilder, FrameArtClient, DEFAULT_BASE_URL};
use anyhow::{anyhow, Result};
use frameconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

/// Backend settings stored in frameconfig
///
/// # Example
///
/// ```rust,ignore
/// use frameconfig::get_config;
/// use frameart::FrameArtConfigExt;
///
/// let config = get_config();
/// println!("Backend: {}", config.get_backend_base_url());
/// ```
pub trait FrameArtConfigExt {
    /// Base URL of the backend, `http://localhost:8000` when unset
    fn get_backend_base_url(&self) -> String;

    fn set_backend_base_url(&self, url: &str) -> Result<()>;

    /// Request timeout; `None` when unset or `0`
    fn get_backend_timeout(&self) -> Result<Option<Duration>>;

    fn set_backend_timeout(&self, timeout: Option<Duration>) -> Result<()>;

    /// Custom User-Agent, `None` to keep the client default
    fn get_backend_user_agent(&self) -> Option<String>;
}

impl FrameArtConfigExt for Config {
    fn get_backend_base_url(&self) -> String {
        self.get_string(&["backend", "base_url"])
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    fn set_backend_base_url(&self, url: &str) -> Result<()> {
        self.set_value(&["backend", "base_url"], Value::String(url.to_string()))
    }

    fn get_backend_timeout(&self) -> Result<Option<Duration>> {
        match self.get_value(&["backend", "timeout_secs"]) {
            Ok(Value::Number(n)) => match n.as_u64() {
                Some(0) => Ok(None),
                Some(secs) => Ok(Some(Duration::from_secs(secs))),
                None => Err(anyhow!("backend.timeout_secs must be a positive integer")),
            },
            Ok(Value::Null) | Err(_) => Ok(None),
            Ok(other) => Err(anyhow!(
                "backend.timeout_secs must be a number, got {:?}",
                other
            )),
        }
    }

    fn set_backend_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let secs = timeout.map(|t| t.as_secs()).unwrap_or(0);
        self.set_value(&["backend", "timeout_secs"], Value::Number(Number::from(secs)))
    }

    fn get_backend_user_agent(&self) -> Option<String> {
        self.get_string(&["backend", "user_agent"])
    }
}

impl ClientBuilder {
    /// Builder preset from the `backend` section of a configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let mut builder = ClientBuilder::new().base_url(config.get_backend_base_url());
        if let Some(timeout) = config.get_backend_timeout()? {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = config.get_backend_user_agent() {
            builder = builder.user_agent(user_agent);
        }
        Ok(builder)
    }
}

impl FrameArtClient {
    /// Build a client from the `backend` section of a configuration
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        ClientBuilder::from_config(config)?.build()
    }
}
