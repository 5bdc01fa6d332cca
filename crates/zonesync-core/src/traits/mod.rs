//! Core traits for zonesync
//!
//! This module defines the abstract interfaces that provider implementations
//! must follow.
//!
//! - [`ZoneProvider`]: Versioned-zone API of a DNS provider
//! - [`ZoneProviderFactory`]: Builds providers from configuration

pub mod zone_provider;

pub use zone_provider::{VersionId, ZoneId, ZoneInfo, ZoneProvider, ZoneProviderFactory, ZoneVersion};
