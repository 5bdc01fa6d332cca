//! Test doubles and common utilities for session contract tests
//!
//! The mock provider keeps an in-memory versioned zone: drafts are copies of
//! the live version, mutations only touch drafts, and a commit makes a draft
//! live. Every call is journaled so tests can assert on exact call sequences.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use zonesync_core::error::{Error, Result};
use zonesync_core::record::{Record, RecordKey, ZoneRecord};
use zonesync_core::traits::{VersionId, ZoneId, ZoneInfo, ZoneProvider, ZoneVersion};
use zonesync_core::{Reconciler, SessionConfig};

pub const ZONE: ZoneId = ZoneId(42);
pub const DOMAIN: &str = "example.com";

/// A provider call, as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ApiVersion,
    GetZoneInfo(String),
    ListVersions,
    ListRecords(VersionId),
    CreateVersion,
    Commit(VersionId),
    Add(VersionId, ZoneRecord),
    Delete(VersionId, String, String),
}

impl Call {
    /// Whether the call changes provider state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateVersion | Call::Commit(_) | Call::Add(..) | Call::Delete(..)
        )
    }
}

/// Provider call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    GetZoneInfo,
    ListRecords,
    CreateVersion,
    Add,
    Delete,
    Commit,
}

struct ZoneState {
    /// Committed versions, oldest first; the last one is live
    committed: Vec<(VersionId, Vec<ZoneRecord>)>,
    /// Uncommitted drafts
    drafts: Vec<(VersionId, Vec<ZoneRecord>)>,
    next_version: i64,
    calls: Vec<Call>,
    fail_on: Option<FailPoint>,
}

/// In-memory versioned zone that journals every call
///
/// Clones share state, so a test can hand one clone to a session and keep
/// another for assertions.
#[derive(Clone)]
pub struct MockZoneProvider {
    state: Arc<Mutex<ZoneState>>,
}

impl MockZoneProvider {
    /// Zone whose live version (id 1) holds `records`
    pub fn new(records: &[Record]) -> Self {
        Self::with_raw_records(records.iter().map(Record::to_zone_record).collect())
    }

    /// Zone whose live version holds unvalidated wire records
    pub fn with_raw_records(records: Vec<ZoneRecord>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ZoneState {
                committed: vec![(VersionId(1), records)],
                drafts: Vec::new(),
                next_version: 2,
                calls: Vec::new(),
                fail_on: None,
            })),
        }
    }

    /// Zone with no versions at all
    pub fn without_versions() -> Self {
        let provider = Self::new(&[]);
        provider.lock().committed.clear();
        provider
    }

    /// Make every call of the given kind fail
    pub fn fail_on(&self, point: FailPoint) {
        self.lock().fail_on = Some(point);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn commit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Commit(_)))
            .count()
    }

    pub fn live_version(&self) -> VersionId {
        self.lock()
            .committed
            .last()
            .map(|(id, _)| *id)
            .expect("zone has a live version")
    }

    /// Records of the live version
    pub fn live_records(&self) -> Vec<Record> {
        self.lock()
            .committed
            .last()
            .map(|(_, records)| {
                records
                    .iter()
                    .cloned()
                    .map(|r| Record::try_from(r).expect("live records are valid"))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, ZoneState> {
        self.state.lock().unwrap()
    }

    fn record_call(&self, call: Call, point: Option<FailPoint>) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(call.clone());
        if point.is_some() && state.fail_on == point {
            return Err(Error::provider("mock", format!("injected failure on {:?}", call)));
        }
        Ok(())
    }

    fn with_draft<T>(
        &self,
        version: VersionId,
        f: impl FnOnce(&mut Vec<ZoneRecord>) -> T,
    ) -> Result<T> {
        let mut state = self.lock();
        let draft = state
            .drafts
            .iter_mut()
            .find(|(id, _)| *id == version)
            .ok_or_else(|| Error::provider("mock", format!("version {} is not a draft", version)))?;
        Ok(f(&mut draft.1))
    }
}

#[async_trait::async_trait]
impl ZoneProvider for MockZoneProvider {
    async fn get_zone_info(&self, domain: &str) -> Result<ZoneInfo> {
        self.record_call(Call::GetZoneInfo(domain.to_string()), Some(FailPoint::GetZoneInfo))?;
        Ok(ZoneInfo { zone_id: ZONE })
    }

    async fn list_zone_versions(&self, _zone: ZoneId) -> Result<Vec<ZoneVersion>> {
        self.record_call(Call::ListVersions, None)?;
        Ok(self
            .lock()
            .committed
            .iter()
            .map(|(id, _)| ZoneVersion { id: *id })
            .collect())
    }

    async fn list_zone_records(&self, _zone: ZoneId, version: VersionId) -> Result<Vec<ZoneRecord>> {
        self.record_call(Call::ListRecords(version), Some(FailPoint::ListRecords))?;
        let state = self.lock();
        state
            .committed
            .iter()
            .chain(state.drafts.iter())
            .find(|(id, _)| *id == version)
            .map(|(_, records)| records.clone())
            .ok_or_else(|| Error::not_found(format!("version {}", version)))
    }

    async fn create_zone_version(&self, _zone: ZoneId) -> Result<VersionId> {
        self.record_call(Call::CreateVersion, Some(FailPoint::CreateVersion))?;
        let mut state = self.lock();
        let id = VersionId(state.next_version);
        state.next_version += 1;
        let live = state
            .committed
            .last()
            .map(|(_, records)| records.clone())
            .unwrap_or_default();
        state.drafts.push((id, live));
        Ok(id)
    }

    async fn commit_zone_version(&self, _zone: ZoneId, version: VersionId) -> Result<()> {
        self.record_call(Call::Commit(version), Some(FailPoint::Commit))?;
        let mut state = self.lock();
        let idx = state
            .drafts
            .iter()
            .position(|(id, _)| *id == version)
            .ok_or_else(|| Error::provider("mock", format!("version {} is not a draft", version)))?;
        let draft = state.drafts.remove(idx);
        state.committed.push(draft);
        Ok(())
    }

    async fn add_zone_record(
        &self,
        _zone: ZoneId,
        version: VersionId,
        record: &ZoneRecord,
    ) -> Result<()> {
        self.record_call(Call::Add(version, record.clone()), Some(FailPoint::Add))?;
        self.with_draft(version, |records| records.push(record.clone()))
    }

    async fn delete_zone_record(
        &self,
        _zone: ZoneId,
        version: VersionId,
        key: RecordKey<'_>,
    ) -> Result<()> {
        self.record_call(
            Call::Delete(version, key.name.to_string(), key.record_type.to_string()),
            Some(FailPoint::Delete),
        )?;
        // Like the real API: every record with this name and type goes.
        self.with_draft(version, |records| {
            records.retain(|r| !(r.name == key.name && r.record_type == key.record_type))
        })
    }

    async fn api_version(&self) -> Result<String> {
        self.record_call(Call::ApiVersion, None)?;
        Ok("mock-1.0".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Shorthand record constructor
pub fn rec(name: &str, rtype: &str, ttl: i64, value: &str) -> Record {
    Record::new(name, rtype, ttl, value).expect("test record is valid")
}

/// Open a session against `provider` for [`DOMAIN`]
pub async fn open(provider: &MockZoneProvider, config: SessionConfig) -> Reconciler {
    Reconciler::open(Box::new(provider.clone()), config)
        .await
        .expect("session opens")
}

/// Default session configuration for [`DOMAIN`]
pub fn session_config() -> SessionConfig {
    SessionConfig::new(DOMAIN)
}

/// Run one full session that declares `desired` and flushes
pub async fn sync(
    provider: &MockZoneProvider,
    config: SessionConfig,
    desired: &[Record],
) -> Result<zonesync_core::FlushReport> {
    let session = Reconciler::open(Box::new(provider.clone()), config).await?;
    session
        .with_session(|s| {
            s.extend_desired(desired.iter().cloned());
            Ok(())
        })
        .await
}
