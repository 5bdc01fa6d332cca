// # zonesync - DNS zone reconciler
//
// Thin command-line front end: all reconciliation logic lives in
// zonesync-core, all provider I/O in the provider crates.
//
// One invocation reconciles one domain:
// 1. Read configuration from environment variables
// 2. Load the desired records from a JSON file
// 3. Register providers and build the configured one
// 4. Open a session, declare the records, flush
//
// ## Configuration
//
// ### Provider
// - `ZONESYNC_PROVIDER_TYPE`: Provider type (gandi)
// - `ZONESYNC_API_KEY`: Provider API key
// - `ZONESYNC_API_ENDPOINT`: Override of the provider endpoint (optional)
//
// ### Session
// - `ZONESYNC_DOMAIN`: Domain whose zone is reconciled
// - `ZONESYNC_RECORDS_FILE`: JSON array of `{"name", "type", "ttl", "value"}`
// - `ZONESYNC_DRY_RUN`: Log mutations instead of performing them (true/false)
// - `ZONESYNC_EXCLUSIVE`: Destroy records not present in the records file
//
// ### Logging
// - `ZONESYNC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export ZONESYNC_API_KEY=your_key
// export ZONESYNC_DOMAIN=example.com
// export ZONESYNC_RECORDS_FILE=/etc/zonesync/example.com.json
// export ZONESYNC_DRY_RUN=true
//
// zonesync
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use zonesync_core::{
    FlushReport, ProviderConfig, ProviderRegistry, Reconciler, SessionConfig, SyncConfig,
};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonesyncExitCode {
    /// Zone reconciled (or already in sync)
    Success = 0,
    /// Configuration error or invalid records file
    ConfigError = 1,
    /// Provider or runtime failure
    RuntimeError = 2,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    provider_type: String,
    api_key: String,
    api_endpoint: Option<String>,
    domain: String,
    records_file: String,
    dry_run: bool,
    exclusive: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} is required. Set it via: export {}=...", key, key))
        };

        Ok(Self {
            provider_type: lookup("ZONESYNC_PROVIDER_TYPE").unwrap_or_else(|| "gandi".to_string()),
            api_key: required("ZONESYNC_API_KEY")?,
            api_endpoint: lookup("ZONESYNC_API_ENDPOINT").filter(|v| !v.is_empty()),
            domain: required("ZONESYNC_DOMAIN")?,
            records_file: required("ZONESYNC_RECORDS_FILE")?,
            dry_run: parse_flag("ZONESYNC_DRY_RUN", lookup("ZONESYNC_DRY_RUN"))?,
            exclusive: parse_flag("ZONESYNC_EXCLUSIVE", lookup("ZONESYNC_EXCLUSIVE"))?,
            log_level: lookup("ZONESYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.provider_type.as_str() {
            "gandi" => {}
            _ => anyhow::bail!(
                "ZONESYNC_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: gandi",
                self.provider_type
            ),
        }

        self.session_config().validate()?;

        if let Some(url) = &self.api_endpoint
            && url.starts_with("http://")
        {
            eprintln!(
                "WARNING: ZONESYNC_API_ENDPOINT uses HTTP (not HTTPS). \
                The API key is sent in clear text."
            );
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "ZONESYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.domain.clone())
            .with_dry_run(self.dry_run)
            .with_exclusive(self.exclusive)
    }

    fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::Gandi {
            api_key: self.api_key.clone(),
            endpoint: self.api_endpoint.clone(),
        }
    }
}

fn parse_flag(key: &str, value: Option<String>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        other => anyhow::bail!("{} must be true or false. Got: {}", key, other),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let records = match zonesync_core::config::load_records(&config.records_file) {
        Ok(records) => records,
        Err(e) => {
            error!("Failed to load {}: {}", config.records_file, e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    let sync = SyncConfig {
        provider: config.provider_config(),
        session: config.session_config(),
        records,
    };
    if let Err(e) = sync.validate() {
        error!("{}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    info!(
        "Reconciling {} with {} record(s){}",
        sync.session.domain,
        sync.records.len(),
        if sync.session.dry_run { " [dry run]" } else { "" }
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(sync).await {
            Ok(report) => {
                log_report(&report);
                ZonesyncExitCode::Success
            }
            Err(e) => {
                error!("Reconciliation failed: {}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Reconcile the configured zone once
async fn run(sync: SyncConfig) -> zonesync_core::Result<FlushReport> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "gandi")]
    {
        tracing::debug!("Registering Gandi provider");
        zonesync_provider_gandi::register(&registry);
    }

    let provider = registry.create_provider(&sync.provider)?;
    let records = sync.records;

    Reconciler::open(provider, sync.session)
        .await?
        .with_session(|session| {
            session.extend_desired(records);
            Ok(())
        })
        .await
}

fn exit_code_for(err: &zonesync_core::Error) -> ZonesyncExitCode {
    match err {
        zonesync_core::Error::Config(_) => ZonesyncExitCode::ConfigError,
        _ => ZonesyncExitCode::RuntimeError,
    }
}

fn log_report(report: &FlushReport) {
    info!(
        "{} created, {} destroyed, {} in sync",
        report.created.len(),
        report.destroyed.len(),
        report.in_sync
    );
    match report.committed {
        Some(version) => info!("Zone version {} is now live", version),
        None if report.dry_run && !report.is_noop() => info!("Dry run: zone left unchanged"),
        None => info!("Zone already in sync"),
    }
}
