//! Layered settings
//!
//! Sources, lowest priority first: the embedded `config/default.toml`, optional
//! `seekbridge.toml` and `config/local.toml` files, then `SEEKBRIDGE_*` environment
//! variables (`SEEKBRIDGE_CLIENT__MODEL=deepseek-reasoner`).

use crate::capability::CapabilityDescriptor;
use crate::client::{ClientConfig, CreateArgs};
use crate::error::Result;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

/// Embedded default settings
pub const DEFAULT_SETTINGS: &str = include_str!("../config/default.toml");

/// Environment variable read when no API key is configured
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Client section
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Model id
    pub model: String,
    /// API key; empty means [`API_KEY_ENV`]
    #[serde(default)]
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Send speaker names
    #[serde(default)]
    pub add_name_prefixes: bool,
    /// Typed create arguments
    #[serde(default)]
    pub create_args: CreateArgs,
    /// Further create arguments
    #[serde(default)]
    pub extra_args: Map<String, Value>,
}

/// Top-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Client section
    pub client: ClientSettings,
    /// Capability override
    #[serde(default)]
    pub capabilities: Option<CapabilityDescriptor>,
}

impl Settings {
    fn defaults() -> ConfigBuilder<config::builder::DefaultState> {
        Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml))
    }

    /// Load from defaults, optional files, and the environment
    ///
    /// # Errors
    /// Returns [`crate::Error::Settings`] when a source cannot be read or deserialized.
    pub fn load() -> Result<Self> {
        let config = Self::defaults()
            .add_source(File::with_name("seekbridge").required(false))
            .add_source(File::with_name("config/local").required(false))
            // prefix_separator keeps SEEKBRIDGE_CLIENT__MODEL (single `_` after the prefix)
            .add_source(
                Environment::with_prefix("SEEKBRIDGE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = config.try_deserialize()?;
        debug!(model = %settings.client.model, "settings loaded");
        Ok(settings)
    }

    /// Defaults overlaid with a TOML document
    ///
    /// # Errors
    /// Returns [`crate::Error::Settings`] for malformed TOML or missing fields.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config = Self::defaults()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Build a client configuration, reading [`API_KEY_ENV`] if no key is set
    #[must_use]
    pub fn into_client_config(self) -> ClientConfig {
        let client = self.client;
        let api_key = if client.api_key.is_empty() {
            std::env::var(API_KEY_ENV).unwrap_or_default()
        } else {
            client.api_key
        };

        ClientConfig {
            model: client.model,
            api_key,
            base_url: client.base_url,
            timeout: Duration::from_secs(client.timeout_secs),
            add_name_prefixes: client.add_name_prefixes,
            capabilities: self.capabilities,
            create_args: client.create_args,
            extra_args: client.extra_args,
        }
    }
}
