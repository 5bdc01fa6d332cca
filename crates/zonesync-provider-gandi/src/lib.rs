// # Gandi Zone Provider
//
// Implements `ZoneProvider` against the Gandi XML-RPC API
// (https://rpc.gandi.net/xmlrpc/).
//
// Gandi zones are versioned: a domain points at a zone, the zone has a list
// of versions, and exactly one of them is live. Changes are made by creating
// a new version (a copy of the live one), editing it, and setting it live.
//
// ## Method Mapping
//
// | Operation             | XML-RPC method                |
// |-----------------------|-------------------------------|
// | api_version           | `version.info`                |
// | get_zone_info         | `domain.info`                 |
// | list_zone_versions    | `domain.zone.version.list`    |
// | list_zone_records     | `domain.zone.record.list`     |
// | create_zone_version   | `domain.zone.version.new`     |
// | commit_zone_version   | `domain.zone.version.set`     |
// | add_zone_record       | `domain.zone.record.add`      |
// | delete_zone_record    | `domain.zone.record.delete`   |
//
// Every method takes the API key as its first parameter.
//
// ## Error Handling
//
// One HTTP request per operation, no retries. Non-2xx statuses map to
// `Authentication` (401/403), `RateLimited` (429) or `Provider` errors;
// transport failures map to `Http`; XML-RPC faults map to `Provider`.
//
// ## Security
//
// The API key is sent in the request body only. It never appears in logs,
// error messages or `Debug` output.

pub mod xmlrpc;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use zonesync_core::config::ProviderConfig;
use zonesync_core::record::{RecordKey, ZoneRecord};
use zonesync_core::traits::{
    VersionId, ZoneId, ZoneInfo, ZoneProvider, ZoneProviderFactory, ZoneVersion,
};
use zonesync_core::{Error, Result};

use crate::xmlrpc::Value;

/// Production XML-RPC endpoint
pub const GANDI_XMLRPC_ENDPOINT: &str = "https://rpc.gandi.net/xmlrpc/";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) const PROVIDER: &str = "gandi";

/// Gandi XML-RPC zone provider
///
/// Stateless apart from the HTTP client: the session owns zone, version and
/// draft bookkeeping.
pub struct GandiProvider {
    /// Gandi API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// XML-RPC endpoint URL
    endpoint: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for GandiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GandiProvider")
            .field("api_key", &"<REDACTED>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GandiProvider {
    /// Create a new Gandi provider
    ///
    /// `endpoint` overrides [`GANDI_XMLRPC_ENDPOINT`], e.g. for the OT&E
    /// sandbox or tests.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `api_key` is empty
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn new(api_key: impl Into<String>, endpoint: Option<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("Gandi API key cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            endpoint: endpoint.unwrap_or_else(|| GANDI_XMLRPC_ENDPOINT.to_string()),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Invoke `method` with the API key prepended to `params`
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(Value::from(self.api_key.as_str()));
        all.extend(params);

        tracing::trace!("XML-RPC call: {}", method);
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(xmlrpc::encode_call(method, &all))
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(method, status, &error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", method, e)))?;
        xmlrpc::decode_response(&body)
    }
}

/// Map a non-2xx HTTP status to an error
fn status_error(method: &str, status: StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API key or insufficient permissions. Status: {}",
            method, status
        )),
        429 => Error::rate_limited(format!(
            "{}: rate limit exceeded. Please retry later. Status: {}",
            method, status
        )),
        500..=599 => Error::provider(
            PROVIDER,
            format!("Gandi server error (transient) on {}: {} - {}", method, status, body),
        ),
        _ => Error::provider(
            PROVIDER,
            format!("{} failed: {} - {}", method, status, body),
        ),
    }
}

fn malformed(method: &str, detail: &str) -> Error {
    Error::provider(
        PROVIDER,
        format!("Unexpected {} response: {}", method, detail),
    )
}

fn int_member(method: &str, value: &Value, key: &str) -> Result<i64> {
    value
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| malformed(method, &format!("missing integer '{}'", key)))
}

fn str_member(method: &str, value: &Value, key: &str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| malformed(method, &format!("missing string '{}'", key)))
}

fn array<'a>(method: &str, value: &'a Value) -> Result<&'a [Value]> {
    value
        .as_array()
        .ok_or_else(|| malformed(method, "result is not an array"))
}

#[async_trait]
impl ZoneProvider for GandiProvider {
    async fn get_zone_info(&self, domain: &str) -> Result<ZoneInfo> {
        const METHOD: &str = "domain.info";
        tracing::debug!("Looking up zone for domain: {}", domain);

        let info = self.call(METHOD, vec![Value::from(domain)]).await?;
        let zone_id = match info.get("zone_id") {
            None | Some(Value::Nil) => {
                return Err(Error::not_found(format!("Domain {} has no zone", domain)));
            }
            Some(value) => value
                .as_i64()
                .ok_or_else(|| malformed(METHOD, "zone_id is not an integer"))?,
        };

        Ok(ZoneInfo {
            zone_id: ZoneId(zone_id),
        })
    }

    async fn list_zone_versions(&self, zone: ZoneId) -> Result<Vec<ZoneVersion>> {
        const METHOD: &str = "domain.zone.version.list";
        let result = self.call(METHOD, vec![Value::Int(zone.0)]).await?;

        array(METHOD, &result)?
            .iter()
            .map(|version| -> Result<ZoneVersion> {
                Ok(ZoneVersion {
                    id: VersionId(int_member(METHOD, version, "id")?),
                })
            })
            .collect()
    }

    async fn list_zone_records(&self, zone: ZoneId, version: VersionId) -> Result<Vec<ZoneRecord>> {
        const METHOD: &str = "domain.zone.record.list";
        let result = self
            .call(METHOD, vec![Value::Int(zone.0), Value::Int(version.0)])
            .await?;

        let records = array(METHOD, &result)?
            .iter()
            .map(|record| -> Result<ZoneRecord> {
                Ok(ZoneRecord {
                    name: str_member(METHOD, record, "name")?,
                    record_type: str_member(METHOD, record, "type")?,
                    ttl: int_member(METHOD, record, "ttl")?,
                    value: str_member(METHOD, record, "value")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Zone {} version {}: {} record(s)", zone, version, records.len());
        Ok(records)
    }

    async fn create_zone_version(&self, zone: ZoneId) -> Result<VersionId> {
        const METHOD: &str = "domain.zone.version.new";
        let result = self.call(METHOD, vec![Value::Int(zone.0)]).await?;
        result
            .as_i64()
            .map(VersionId)
            .ok_or_else(|| malformed(METHOD, "version id is not an integer"))
    }

    async fn commit_zone_version(&self, zone: ZoneId, version: VersionId) -> Result<()> {
        const METHOD: &str = "domain.zone.version.set";
        let result = self
            .call(METHOD, vec![Value::Int(zone.0), Value::Int(version.0)])
            .await?;
        match result.as_bool() {
            Some(false) => Err(Error::provider(
                PROVIDER,
                format!("Gandi refused to activate zone {} version {}", zone, version),
            )),
            _ => Ok(()),
        }
    }

    async fn add_zone_record(
        &self,
        zone: ZoneId,
        version: VersionId,
        record: &ZoneRecord,
    ) -> Result<()> {
        let params = Value::structure([
            ("name", Value::from(record.name.as_str())),
            ("type", Value::from(record.record_type.as_str())),
            ("ttl", Value::Int(record.ttl)),
            ("value", Value::from(record.value.as_str())),
        ]);
        self.call(
            "domain.zone.record.add",
            vec![Value::Int(zone.0), Value::Int(version.0), params],
        )
        .await?;
        Ok(())
    }

    async fn delete_zone_record(
        &self,
        zone: ZoneId,
        version: VersionId,
        key: RecordKey<'_>,
    ) -> Result<()> {
        let params = Value::structure([
            ("name", Value::from(key.name)),
            ("type", Value::from(key.record_type)),
        ]);
        let deleted = self
            .call(
                "domain.zone.record.delete",
                vec![Value::Int(zone.0), Value::Int(version.0), params],
            )
            .await?;
        tracing::debug!("Deleted {:?} record(s) matching {}", deleted.as_i64(), key);
        Ok(())
    }

    async fn api_version(&self) -> Result<String> {
        const METHOD: &str = "version.info";
        let info = self.call(METHOD, Vec::new()).await?;
        str_member(METHOD, &info, "api_version")
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Gandi providers
pub struct GandiFactory;

impl ZoneProviderFactory for GandiFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn ZoneProvider>> {
        match config {
            ProviderConfig::Gandi { api_key, endpoint } => Ok(Box::new(GandiProvider::new(
                api_key.clone(),
                endpoint.clone(),
            )?)),
            _ => Err(Error::config("Invalid config for Gandi provider")),
        }
    }
}

/// Register the Gandi provider with a registry
///
/// # Example
///
/// ```rust
/// use zonesync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// zonesync_provider_gandi::register(&registry);
/// assert!(registry.has_provider("gandi"));
/// ```
pub fn register(registry: &zonesync_core::ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(GandiFactory));
}
