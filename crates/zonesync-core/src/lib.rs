// # zonesync-core
//
// Core library for reconciling a declared DNS record set against the live
// record set of a versioned zone.
//
// ## Architecture Overview
//
// - **Record**: Immutable `(name, type, ttl, value)` value with an identity key
// - **ZoneProvider**: Trait for the provider's versioned-zone API
// - **plan**: Pure diff between desired and observed records
// - **Reconciler**: One-shot session that fetches, diffs, mutates a draft
//   zone version and commits it
// - **ProviderRegistry**: Plugin-based registry for zone providers
//
// ## Session Lifecycle
//
// 1. `Reconciler::open()` resolves the zone and pins the latest version
// 2. `add_desired()` collects the records the caller wants published
// 3. `flush()` fetches the observed set, plans, applies and commits
//
// A session that is dropped without `flush()` never commits; any draft
// version it created is abandoned.

pub mod config;
pub mod error;
pub mod record;
pub mod registry;
pub mod session;
pub mod traits;

// Re-export core types for convenience
pub use config::{ProviderConfig, SessionConfig, SyncConfig};
pub use error::{Error, Result};
pub use record::{Record, RecordKey, ZoneRecord};
pub use registry::ProviderRegistry;
pub use session::{FlushReport, Plan, Reconciler, Step};
pub use traits::{VersionId, ZoneId, ZoneInfo, ZoneProvider, ZoneProviderFactory, ZoneVersion};
