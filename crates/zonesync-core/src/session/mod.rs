//! Zone reconciliation session
//!
//! A [`Reconciler`] is bound to one domain for one invocation. It collects
//! the desired records, fetches the observed records once, plans the diff
//! and applies it to a draft zone version that is committed at the end.
//!
//! ## Phases
//!
//! ```text
//! open ──▶ add_desired* ──▶ flush ──▶ committed (draft existed)
//!                              │
//!                              └────▶ idle (nothing to change)
//! ```
//!
//! ## Commit Model
//!
//! All mutations target a draft version, created lazily by the first live
//! create or destroy. `flush()` commits the draft if and only if one exists.
//! If any provider call fails, the error propagates and the draft is never
//! committed: the live zone is untouched.
//!
//! `flush()` takes the session by value, so a session cannot be flushed
//! twice. Use a fresh session per invocation.

pub mod plan;

pub use plan::{DestroyReason, Plan, Step, match_observed, plan};

use tracing::{Instrument, Span, debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::traits::{VersionId, ZoneId, ZoneProvider};

/// Observed-record cache
#[derive(Debug, Default)]
enum ObservedCache {
    #[default]
    Unloaded,
    Loaded(Vec<Record>),
}

impl ObservedCache {
    fn invalidate(&mut self) {
        *self = ObservedCache::Unloaded;
    }

    fn records(&self) -> &[Record] {
        match self {
            ObservedCache::Loaded(records) => records,
            ObservedCache::Unloaded => &[],
        }
    }
}

/// Draft zone version state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Draft {
    #[default]
    NoDraft,
    Open(VersionId),
}

/// Outcome of a flush
///
/// In dry-run mode `created` and `destroyed` list the intended mutations and
/// `committed` is always `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records added to the draft, in order
    pub created: Vec<Record>,
    /// Records deleted from the draft, in order
    pub destroyed: Vec<Record>,
    /// Desired records that were already published as-is
    pub in_sync: usize,
    /// Draft version promoted to live, if any
    pub committed: Option<VersionId>,
    /// Whether mutations were only logged
    pub dry_run: bool,
}

impl FlushReport {
    /// Number of create and destroy operations (performed or intended)
    pub fn mutation_count(&self) -> usize {
        self.created.len() + self.destroyed.len()
    }

    /// Whether the zone already matched the desired records
    pub fn is_noop(&self) -> bool {
        self.mutation_count() == 0
    }
}

/// One-shot reconciliation session for a single domain
///
/// # Example
///
/// ```rust,ignore
/// let session = Reconciler::open(provider, SessionConfig::new("example.com")).await?;
/// let report = session
///     .with_session(|s| {
///         s.add_desired(Record::new("www", "A", 300, "192.0.2.1")?);
///         Ok(())
///     })
///     .await?;
/// ```
pub struct Reconciler {
    provider: Box<dyn ZoneProvider>,
    config: SessionConfig,
    zone_id: ZoneId,
    latest_version: VersionId,
    desired: Vec<Record>,
    observed: ObservedCache,
    draft: Draft,
    span: Span,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider.provider_name())
            .field("config", &self.config)
            .field("zone_id", &self.zone_id)
            .field("latest_version", &self.latest_version)
            .field("desired", &self.desired.len())
            .field("draft", &self.draft)
            .finish()
    }
}

impl Reconciler {
    /// Open a session for `config.domain`
    ///
    /// Resolves the zone and pins its latest version. All log output of the
    /// session is emitted inside a `zone` span carrying the domain name,
    /// nested under whatever span is current when `open` is called.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the session configuration is invalid
    /// - Any provider error from the zone lookup; an empty version list is
    ///   reported as [`Error::Provider`]
    pub async fn open(provider: Box<dyn ZoneProvider>, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let span = tracing::info_span!("zone", domain = %config.domain);
        let session_span = span.clone();

        async move {
            let api_version = provider.api_version().await?;
            debug!(
                "{} API established: version {}",
                provider.provider_name(),
                api_version
            );

            let info = provider.get_zone_info(&config.domain).await?;
            debug!("Zone ID: {}", info.zone_id);

            let versions = provider.list_zone_versions(info.zone_id).await?;
            let latest_version = versions.last().map(|v| v.id).ok_or_else(|| {
                Error::provider(
                    provider.provider_name(),
                    format!("zone {} has no versions", info.zone_id),
                )
            })?;
            debug!("Latest zone version: {}", latest_version);

            Ok(Self {
                provider,
                config,
                zone_id: info.zone_id,
                latest_version,
                desired: Vec::new(),
                observed: ObservedCache::Unloaded,
                draft: Draft::NoDraft,
                span: session_span,
            })
        }
        .instrument(span)
        .await
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn zone_id(&self) -> ZoneId {
        self.zone_id
    }

    /// Live version pinned when the session was opened
    pub fn latest_version(&self) -> VersionId {
        self.latest_version
    }

    /// Draft version created by this session, if any mutation happened yet
    pub fn draft_version(&self) -> Option<VersionId> {
        match self.draft {
            Draft::Open(version) => Some(version),
            Draft::NoDraft => None,
        }
    }

    /// Declare a record that should be published
    ///
    /// No provider call is made until [`flush`](Self::flush).
    pub fn add_desired(&mut self, record: Record) {
        self.desired.push(record);
    }

    /// Declare several records at once
    pub fn extend_desired(&mut self, records: impl IntoIterator<Item = Record>) {
        self.desired.extend(records);
    }

    pub fn desired(&self) -> &[Record] {
        &self.desired
    }

    /// Records published in the pinned latest version
    ///
    /// Fetched from the provider on first access and cached afterwards.
    pub async fn observed(&mut self) -> Result<&[Record]> {
        let span = self.span.clone();
        self.load_observed().instrument(span).await?;
        Ok(self.observed.records())
    }

    /// Drop the observed-record cache so the next access re-fetches it
    pub fn refresh_observed(&mut self) {
        self.observed.invalidate();
    }

    /// Add `record` to the draft version
    ///
    /// In dry-run mode only logs the intent.
    pub async fn create(&mut self, record: &Record) -> Result<()> {
        let span = self.span.clone();
        self.apply_create(record).instrument(span).await
    }

    /// Delete `record` (matched by name and type) from the draft version
    ///
    /// In dry-run mode only logs the intent.
    pub async fn destroy(&mut self, record: &Record) -> Result<()> {
        let span = self.span.clone();
        self.apply_destroy(record).instrument(span).await
    }

    /// Reconcile the zone and commit the draft if anything changed
    ///
    /// # Errors
    ///
    /// The first failing provider call aborts the flush. Mutations already
    /// sent stay in the uncommitted draft, which is abandoned.
    pub async fn flush(mut self) -> Result<FlushReport> {
        let span = self.span.clone();
        async move {
            debug!("Flushing delta...");

            self.load_observed().await?;
            let observed = self.observed.records().to_vec();
            debug!("--- Instances ---");
            for record in &observed {
                debug!("{}", record);
            }
            debug!("--- Resources ---");
            for record in &self.desired {
                debug!("{}", record);
            }

            let plan = plan::plan(&self.desired, &observed, self.config.exclusive);
            let mut report = FlushReport {
                in_sync: plan.in_sync(),
                dry_run: self.config.dry_run,
                ..FlushReport::default()
            };

            for step in plan {
                match step {
                    Step::Destroy { record, reason } => {
                        match reason {
                            DestroyReason::Duplicate => warn!("Duplicate record {}", record),
                            DestroyReason::Modified => debug!("Modifying record {}", record),
                            DestroyReason::Unmanaged => debug!("Unmanaged record {}", record),
                        }
                        self.apply_destroy(&record).await?;
                        report.destroyed.push(record);
                    }
                    Step::Create { record } => {
                        self.apply_create(&record).await?;
                        report.created.push(record);
                    }
                }
            }

            match self.draft {
                Draft::Open(version) => {
                    info!("Committing zone version {}", version);
                    self.provider
                        .commit_zone_version(self.zone_id, version)
                        .await?;
                    report.committed = Some(version);
                }
                Draft::NoDraft if self.config.dry_run && !report.is_noop() => {
                    info!(
                        "Would commit a new zone version with {} change(s) (dry run)",
                        report.mutation_count()
                    );
                }
                Draft::NoDraft => {
                    debug!("Zone in sync ({} record(s)), nothing to commit", report.in_sync);
                }
            }

            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Run `collect` against this session, then flush it
    ///
    /// If `collect` returns an error the session is dropped unflushed: no
    /// mutation is sent and nothing is committed.
    pub async fn with_session<F>(mut self, collect: F) -> Result<FlushReport>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        collect(&mut self)?;
        self.flush().await
    }

    async fn load_observed(&mut self) -> Result<()> {
        if matches!(self.observed, ObservedCache::Unloaded) {
            let records = self.fetch_observed().await?;
            self.observed = ObservedCache::Loaded(records);
        }
        Ok(())
    }

    async fn fetch_observed(&self) -> Result<Vec<Record>> {
        debug!("Initializing instances from version {}", self.latest_version);
        let raw = self
            .provider
            .list_zone_records(self.zone_id, self.latest_version)
            .await?;

        let records = raw
            .into_iter()
            .map(|zone_record| {
                Record::try_from(zone_record).map_err(|e| {
                    Error::provider(
                        self.provider.provider_name(),
                        format!("malformed record in zone listing: {}", e),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Discovered {} instance(s)", records.len());
        Ok(records)
    }

    async fn next_version(&mut self) -> Result<VersionId> {
        match self.draft {
            Draft::Open(version) => Ok(version),
            Draft::NoDraft => {
                let version = self.provider.create_zone_version(self.zone_id).await?;
                info!("Zone version incremented: {}", version);
                self.draft = Draft::Open(version);
                Ok(version)
            }
        }
    }

    async fn apply_create(&mut self, record: &Record) -> Result<()> {
        if self.config.dry_run {
            info!("Would create record {} (dry run)", record);
            return Ok(());
        }

        let version = self.next_version().await?;
        self.provider
            .add_zone_record(self.zone_id, version, &record.to_zone_record())
            .await?;
        info!("Created record {}", record);
        Ok(())
    }

    async fn apply_destroy(&mut self, record: &Record) -> Result<()> {
        if self.config.dry_run {
            info!("Would destroy record {} (dry run)", record);
            return Ok(());
        }

        let version = self.next_version().await?;
        info!("Destroying record {}", record);
        self.provider
            .delete_zone_record(self.zone_id, version, record.identity_key())
            .await
    }
}
