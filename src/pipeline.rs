//! The measurement pipeline: validate, resolve, discover, aggregate.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::aggregate::{aggregate, AggregateError, AggregateOptions};
use crate::archives::{ArchiveProfile, ArchiveRegistry, RegistryError};
use crate::config::{Config, ConfigError, Settings};
use crate::discovery::{discover, DiscoveryError};
use crate::http_client::{FetchError, Fetcher};
use crate::memento::{MementoError, MementoResolver};
use crate::report::CompositionReport;
use crate::timestamp::Timestamp;

/// Coarse failure category, stable across error message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedArchive,
    NotFound,
    DiscoveryFailed,
    FetchFailed,
    Config,
}

#[derive(Debug, Error)]
pub enum WastebackError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    UnsupportedArchive(RegistryError),

    #[error("{0}")]
    NoMementos(MementoError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WastebackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::UnsupportedArchive(_) => ErrorKind::UnsupportedArchive,
            Self::NoMementos(_) => ErrorKind::NotFound,
            Self::Discovery(_) => ErrorKind::DiscoveryFailed,
            Self::Fetch(_) => ErrorKind::FetchFailed,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<RegistryError> for WastebackError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotSupported(_) => Self::UnsupportedArchive(e),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<MementoError> for WastebackError {
    fn from(e: MementoError) -> Self {
        match e {
            MementoError::InvalidRange { .. } => Self::InvalidInput(e.to_string()),
            MementoError::NotFound { .. } => Self::NoMementos(e),
        }
    }
}

impl From<ConfigError> for WastebackError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<AggregateError> for WastebackError {
    fn from(e: AggregateError) -> Self {
        Self::Config(e.to_string())
    }
}

/// What to measure.
#[derive(Debug, Clone, Default)]
pub struct MeasureRequest {
    /// Page URL; `https://` is assumed when no scheme is given.
    pub url: String,
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    /// Archive id; the configured default when absent.
    pub archive: Option<String>,
}

impl MeasureRequest {
    pub fn new(url: impl Into<String>, year: i32) -> Self {
        Self {
            url: url.into(),
            year,
            ..Default::default()
        }
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.day = Some(day);
        self
    }

    pub fn archive(mut self, archive: impl Into<String>) -> Self {
        self.archive = Some(archive.into());
        self
    }
}

/// How to measure it.
#[derive(Debug, Clone, Default)]
pub struct MeasureOptions {
    /// Attach per-resource results to the report.
    pub include_resources: bool,
    /// First year probed; the archive's earliest year when absent.
    pub start_year: Option<i32>,
    /// Last year probed; the current year when absent.
    pub end_year: Option<i32>,
    pub scan_scripts: bool,
    /// Overrides the configured concurrency.
    pub concurrency: Option<usize>,
}

/// Prefix `https://` when the input has no scheme, and check it parses.
pub fn normalise_input_url(input: &str) -> Result<String, WastebackError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(WastebackError::InvalidInput("A URL is required".to_string()));
    }
    let url = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    match Url::parse(&url) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => Ok(url),
        _ => Err(WastebackError::InvalidInput(format!("Invalid URL: {}", input))),
    }
}

fn current_year() -> i32 {
    Utc::now().year()
}

/// Library entry point holding the registry, the transport and settings.
pub struct Wasteback {
    registry: ArchiveRegistry,
    fetcher: Arc<dyn Fetcher>,
    settings: Settings,
}

impl Wasteback {
    pub fn new(registry: ArchiveRegistry, fetcher: Arc<dyn Fetcher>, settings: Settings) -> Self {
        Self {
            registry,
            fetcher,
            settings,
        }
    }

    /// Build from a loaded config using the reqwest transport.
    pub fn from_config(config: &Config) -> Result<Self, WastebackError> {
        let settings = config.settings();
        let registry = config.registry()?;
        let client = settings.http_client()?;
        Ok(Self::new(registry, Arc::new(client), settings))
    }

    pub fn registry(&self) -> &ArchiveRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look up an archive, falling back to the configured default.
    pub fn archive(&self, id: Option<&str>) -> Result<&ArchiveProfile, WastebackError> {
        let id = id.unwrap_or(&self.settings.default_archive);
        Ok(self.registry.get(id)?)
    }

    fn year_range(
        profile: &ArchiveProfile,
        options: &MeasureOptions,
    ) -> Result<(i32, i32), WastebackError> {
        let start = options.start_year.unwrap_or(profile.earliest_year);
        let end = options.end_year.unwrap_or_else(current_year);
        if start < profile.earliest_year {
            return Err(WastebackError::InvalidInput(format!(
                "Start year must be {} or later for {}",
                profile.earliest_year, profile.id
            )));
        }
        Ok((start, end))
    }

    fn requested_timestamp(
        profile: &ArchiveProfile,
        request: &MeasureRequest,
    ) -> Result<Timestamp, WastebackError> {
        if request.year < profile.earliest_year {
            return Err(WastebackError::InvalidInput(format!(
                "Year must be {} or later for {}",
                profile.earliest_year, profile.id
            )));
        }
        if let Some(m) = request.month.filter(|m| !(1..=12).contains(m)) {
            return Err(WastebackError::InvalidInput(format!(
                "Month must be between 1 and 12, got {}",
                m
            )));
        }
        if let Some(d) = request.day.filter(|d| !(1..=31).contains(d)) {
            return Err(WastebackError::InvalidInput(format!(
                "Day must be between 1 and 31, got {}",
                d
            )));
        }

        let month = request.month.map(|m| m.to_string()).unwrap_or_default();
        let day = request.day.map(|d| d.to_string()).unwrap_or_default();
        Timestamp::from_date_parts(request.year, &month, &day)
            .map_err(|e| WastebackError::InvalidInput(e.to_string()))
    }

    /// Every capture of `url` in the archive across a year range.
    pub async fn mementos(
        &self,
        url: &str,
        archive: Option<&str>,
        start_year: Option<i32>,
        end_year: Option<i32>,
    ) -> Result<Vec<Timestamp>, WastebackError> {
        let url = normalise_input_url(url)?;
        let profile = self.archive(archive)?;
        let options = MeasureOptions {
            start_year,
            end_year,
            ..Default::default()
        };
        let (start, end) = Self::year_range(profile, &options)?;
        let resolver = MementoResolver::new(self.fetcher.as_ref(), self.settings.concurrency);
        Ok(resolver.resolve(profile, &url, start, end).await?)
    }

    /// Measure the composition of the capture nearest the requested date.
    pub async fn measure(
        &self,
        request: &MeasureRequest,
        options: &MeasureOptions,
    ) -> Result<CompositionReport, WastebackError> {
        let url = normalise_input_url(&request.url)?;
        let profile = self.archive(request.archive.as_deref())?;
        let requested = Self::requested_timestamp(profile, request)?;
        let (start, end) = Self::year_range(profile, options)?;
        let concurrency = options
            .concurrency
            .unwrap_or(self.settings.concurrency)
            .max(1);
        let fetcher = self.fetcher.as_ref();

        info!("Resolving mementos for {} in {} ({}-{})", url, profile.id, start, end);
        let resolver = MementoResolver::new(fetcher, concurrency);
        let memento = resolver
            .closest(profile, &url, &requested, start, end)
            .await?;
        info!("Using memento {} (requested {})", memento, requested);

        let discovery = discover(fetcher, profile, &url, &memento).await?;

        let aggregate_options = AggregateOptions {
            concurrency,
            scan_scripts: options.scan_scripts,
        };
        let aggregation = aggregate(fetcher, profile, &memento, &discovery, &aggregate_options).await?;

        Ok(CompositionReport {
            url,
            requested_memento: requested,
            memento,
            memento_url: discovery.frame_url,
            archive: profile.name.clone(),
            archive_org: profile.organisation.clone(),
            archive_url: profile.website.clone(),
            sizes: aggregation.sizes,
            completeness: aggregation.completeness,
            malformed_references: aggregation.malformed,
            resources: options.include_resources.then_some(aggregation.resources),
        })
    }
}
