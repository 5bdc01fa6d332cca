//! Configuration types for zonesync
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::record::Record;

/// Main zonesync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Reconciliation session settings
    pub session: SessionConfig,

    /// Records that should be published in the zone
    #[serde(default)]
    pub records: Vec<Record>,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

/// Settings for one reconciliation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Domain whose zone is reconciled
    pub domain: String,

    /// Log intended mutations instead of performing them
    #[serde(default)]
    pub dry_run: bool,

    /// Destroy observed records that no desired record matches
    #[serde(default)]
    pub exclusive: bool,
}

impl SessionConfig {
    /// Create a session configuration with both flags off
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            dry_run: false,
            exclusive: false,
        }
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable exclusive mode
    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Validate the session configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if domain.len() > 253 {
            return Err(crate::Error::config(format!(
                "Domain name too long: {} chars (max 253)",
                domain.len()
            )));
        }
        if domain.split('.').any(str::is_empty) {
            return Err(crate::Error::config(format!(
                "Domain name has an empty label: '{}'",
                domain
            )));
        }
        Ok(())
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Gandi XML-RPC provider
    Gandi {
        /// Gandi API key
        api_key: String,
        /// Override of the XML-RPC endpoint (defaults to the production API)
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Gandi { api_key, endpoint } => {
                if api_key.is_empty() {
                    return Err(crate::Error::config("Gandi API key cannot be empty"));
                }
                if let Some(url) = endpoint
                    && !url.starts_with("https://")
                    && !url.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Gandi endpoint must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Gandi { .. } => "gandi",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Load desired records from a JSON file
///
/// The file holds an array of `{"name", "type", "ttl", "value"}` objects.
/// Every entry is validated as it is read.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<Record>, crate::Error> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let records: Vec<Record> = serde_json::from_str(&raw)?;
    tracing::debug!("Loaded {} record(s) from {}", records.len(), path.display());
    Ok(records)
}
