//! Diff planning
//!
//! Turns a desired record list and an observed record list into the ordered
//! list of create/destroy steps that makes the zone match. Planning is pure:
//! it performs no I/O, so dry runs and live runs share the exact same plan.
//!
//! ## Ordering
//!
//! 1. Destroy duplicates found in the observed set (observed order)
//! 2. For each desired record, in insertion order: do nothing if already in
//!    sync, or create it, destroying its record set first when that set holds
//!    stale members (once per set)
//! 3. In exclusive mode, destroy observed records no desired record claims
//!    (observed order)

use std::collections::HashSet;

use crate::record::{Record, RecordKey};

/// Why an observed record is scheduled for destruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// Full duplicate of an earlier observed record
    Duplicate,
    /// Same identity as a desired record but a different ttl or value
    Modified,
    /// No desired record shares its identity (exclusive mode only)
    Unmanaged,
}

/// One mutation of the draft zone version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Delete an observed record (by name and type)
    Destroy {
        record: Record,
        reason: DestroyReason,
    },
    /// Add a desired record
    Create { record: Record },
}

impl Step {
    pub fn record(&self) -> &Record {
        match self {
            Step::Destroy { record, .. } | Step::Create { record } => record,
        }
    }
}

/// Ordered mutations needed to reconcile a zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
    in_sync: usize,
}

impl Plan {
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Number of desired records that already matched the zone exactly
    pub fn in_sync(&self) -> usize {
        self.in_sync
    }

    /// Records the plan creates, in order
    pub fn creates(&self) -> impl Iterator<Item = &Record> {
        self.steps.iter().filter_map(|step| match step {
            Step::Create { record } => Some(record),
            Step::Destroy { .. } => None,
        })
    }

    /// Records the plan destroys, in order
    pub fn destroys(&self) -> impl Iterator<Item = &Record> {
        self.steps.iter().filter_map(|step| match step {
            Step::Destroy { record, .. } => Some(record),
            Step::Create { .. } => None,
        })
    }
}

impl IntoIterator for Plan {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// Find the observed record sharing `desired`'s identity key
///
/// First match wins.
pub fn match_observed<'a>(desired: &Record, observed: &'a [Record]) -> Option<&'a Record> {
    observed.iter().find(|o| o.same_identity(desired))
}

/// Compute the steps that make `observed` match `desired`
///
/// Records sharing an identity key form one record set. A desired record
/// fully equal to any observed member of its set is in sync. A set is only
/// rewritten when it holds an observed member nobody desires *and* lacks a
/// desired member: the provider deletes by key, so the rewrite destroys the
/// set once and re-creates every desired member, in-sync ones included.
/// Otherwise missing members are simply added and extra members are kept.
pub fn plan(desired: &[Record], observed: &[Record], exclusive: bool) -> Plan {
    let mut steps = Vec::new();

    // Full duplicates are destroyed and take no further part in matching.
    let mut seen: HashSet<&Record> = HashSet::with_capacity(observed.len());
    let mut instances: Vec<&Record> = Vec::with_capacity(observed.len());
    for record in observed {
        if seen.insert(record) {
            instances.push(record);
        } else {
            steps.push(Step::Destroy {
                record: record.clone(),
                reason: DestroyReason::Duplicate,
            });
        }
    }

    let wanted: HashSet<&Record> = desired.iter().collect();
    let unmanaged: Vec<&Record> = instances
        .iter()
        .copied()
        .filter(|instance| !desired.iter().any(|d| d.same_identity(instance)))
        .collect();

    let needs_rewrite = |key: RecordKey<'_>| {
        let stale = instances
            .iter()
            .any(|o| o.identity_key() == key && !wanted.contains(o));
        let missing = desired
            .iter()
            .any(|d| d.identity_key() == key && !seen.contains(d));
        stale && missing
    };

    let mut rewritten: HashSet<RecordKey<'_>> = HashSet::new();
    let mut created: HashSet<&Record> = HashSet::new();
    let mut in_sync = 0;

    for record in desired {
        let key = record.identity_key();
        let Some(stale) = instances
            .iter()
            .find(|o| o.identity_key() == key && !wanted.contains(*o))
            .filter(|_| rewritten.contains(&key) || needs_rewrite(key))
        else {
            if seen.contains(record) {
                in_sync += 1;
            } else if created.insert(record) {
                steps.push(Step::Create {
                    record: record.clone(),
                });
            }
            continue;
        };

        if rewritten.insert(key) {
            steps.push(Step::Destroy {
                record: (*stale).clone(),
                reason: DestroyReason::Modified,
            });
        }
        if created.insert(record) {
            steps.push(Step::Create {
                record: record.clone(),
            });
        }
    }

    if exclusive {
        steps.extend(unmanaged.into_iter().map(|record| Step::Destroy {
            record: record.clone(),
            reason: DestroyReason::Unmanaged,
        }));
    }

    Plan { steps, in_sync }
}
