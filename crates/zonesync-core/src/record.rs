// # DNS Record
//
// An immutable `(name, type, ttl, value)` tuple, used both for records the
// caller wants published and for records observed in the zone.
//
// Two notions of sameness coexist:
//
// - **Identity key** `(name, type)`: used to pair a desired record with the
//   observed record it would replace.
// - **Full equality** over all four fields: used to decide whether a paired
//   record is already in sync, and to spot duplicates in the zone.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Identity of a record for matching purposes
///
/// Two records with the same key but a different ttl or value describe the
/// same logical entry in two different states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey<'a> {
    /// Record name, relative to the zone (e.g. "www" or "@")
    pub name: &'a str,
    /// Record type (e.g. "A", "CNAME")
    pub record_type: &'a str,
}

impl fmt::Display for RecordKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.record_type)
    }
}

/// Raw record as exchanged with a zone provider
///
/// Nothing about a `ZoneRecord` is validated; convert it into a [`Record`]
/// before using it for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: i64,
    pub value: String,
}

/// A validated DNS record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ZoneRecord")]
pub struct Record {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: u32,
    value: String,
}

impl Record {
    /// Create a new record
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `ttl` is negative or larger than
    /// `u32::MAX`, or if `record_type` is empty. Type and value are otherwise
    /// opaque.
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: i64,
        value: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let record_type = record_type.into();

        let ttl = u32::try_from(ttl).map_err(|_| {
            Error::validation(format!(
                "ttl must be a non-negative 32-bit integer, got {} for {} {}",
                ttl, name, record_type
            ))
        })?;

        if record_type.is_empty() {
            return Err(Error::validation(format!("record {} has an empty type", name)));
        }

        Ok(Self {
            name,
            record_type,
            ttl,
            value: value.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The `(name, type)` pair used to match desired and observed records
    pub fn identity_key(&self) -> RecordKey<'_> {
        RecordKey {
            name: &self.name,
            record_type: &self.record_type,
        }
    }

    /// Whether `other` shares this record's identity key
    pub fn same_identity(&self, other: &Record) -> bool {
        self.identity_key() == other.identity_key()
    }

    /// The wire shape sent to providers when adding this record
    pub fn to_zone_record(&self) -> ZoneRecord {
        ZoneRecord {
            name: self.name.clone(),
            record_type: self.record_type.clone(),
            ttl: i64::from(self.ttl),
            value: self.value.clone(),
        }
    }
}

impl TryFrom<ZoneRecord> for Record {
    type Error = Error;

    fn try_from(raw: ZoneRecord) -> Result<Self> {
        Record::new(raw.name, raw.record_type, raw.ttl, raw.value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.name, self.ttl, self.record_type, self.value
        )
    }
}
