// # Zone Provider Trait
//
// Defines the interface to a DNS provider that publishes records through
// versioned zones.
//
// ## Versioned Zones
//
// A zone holds a list of versions. The last one is live. Changes are staged
// by creating a new version (a copy of the live one), adding and deleting
// records in it, and then committing it, which makes it live.
//
// ## Implementations
//
// - Gandi XML-RPC: `zonesync-provider-gandi` crate
//
// ## Usage
//
// ```rust,ignore
// use zonesync_core::ZoneProvider;
//
// let info = provider.get_zone_info("example.com").await?;
// let versions = provider.list_zone_versions(info.zone_id).await?;
// let draft = provider.create_zone_version(info.zone_id).await?;
// provider.add_zone_record(info.zone_id, draft, &record.to_zone_record()).await?;
// provider.commit_zone_version(info.zone_id, draft).await?;
// ```

use async_trait::async_trait;
use std::fmt;

use crate::record::{RecordKey, ZoneRecord};

/// Opaque identifier of a provider zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(pub i64);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of one version of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(pub i64);

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zone information for a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    /// The zone serving the domain
    pub zone_id: ZoneId,
}

/// One entry of a zone's version list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneVersion {
    /// Version identifier
    pub id: VersionId,
}

/// Trait for versioned-zone DNS provider implementations
///
/// Each method is a single round-trip to the provider. Implementations must
/// not retry, cache, or decide whether a change is needed; those concerns
/// belong to the [`Reconciler`](crate::session::Reconciler).
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Look up the zone serving `domain`
    async fn get_zone_info(&self, domain: &str) -> Result<ZoneInfo, crate::Error>;

    /// List the versions of a zone, oldest first
    ///
    /// The last entry is the latest (live) version.
    async fn list_zone_versions(&self, zone: ZoneId) -> Result<Vec<ZoneVersion>, crate::Error>;

    /// List the records of one version of a zone
    async fn list_zone_records(
        &self,
        zone: ZoneId,
        version: VersionId,
    ) -> Result<Vec<ZoneRecord>, crate::Error>;

    /// Create a new draft version, copied from the live one
    async fn create_zone_version(&self, zone: ZoneId) -> Result<VersionId, crate::Error>;

    /// Make `version` the live version of the zone
    async fn commit_zone_version(&self, zone: ZoneId, version: VersionId)
    -> Result<(), crate::Error>;

    /// Add a record to a draft version
    async fn add_zone_record(
        &self,
        zone: ZoneId,
        version: VersionId,
        record: &ZoneRecord,
    ) -> Result<(), crate::Error>;

    /// Delete records matching `key` from a draft version
    ///
    /// Matching is by name and type only; ttl and value are not needed.
    async fn delete_zone_record(
        &self,
        zone: ZoneId,
        version: VersionId,
        key: RecordKey<'_>,
    ) -> Result<(), crate::Error>;

    /// Version string of the remote API, for diagnostics
    async fn api_version(&self) -> Result<String, crate::Error> {
        Ok("unknown".to_string())
    }

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing zone providers from configuration
pub trait ZoneProviderFactory: Send + Sync {
    /// Create a ZoneProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn ZoneProvider>, crate::Error>;
}
