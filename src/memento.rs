//! Memento resolution: which captures exist, and which one is nearest.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archives::{ArchiveProfile, ResolutionMode};
use crate::cdx::{self, CdxQuery};
use crate::http_client::{fetch_with_retry, FetchOptions, Fetcher};
use crate::timestamp::Timestamp;

/// Errors from memento resolution.
#[derive(Debug, Error)]
pub enum MementoError {
    #[error("No mementos found for {url} in {archive} between {start_year} and {end_year}")]
    NotFound {
        url: String,
        archive: String,
        start_year: i32,
        end_year: i32,
    },

    #[error("Invalid year range: {start_year} to {end_year}")]
    InvalidRange { start_year: i32, end_year: i32 },
}

/// Format a probe instant as an `Accept-Datetime` value.
fn http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Pick the timestamp numerically closest to `target`.
///
/// Equidistant candidates resolve to the one encountered first.
pub fn pick_closest(mementos: &[Timestamp], target: &Timestamp) -> Option<Timestamp> {
    let target = target.as_u64();
    mementos
        .iter()
        .fold(None, |best: Option<(&Timestamp, u64)>, ts| {
            let distance = ts.as_u64().abs_diff(target);
            match best {
                Some((_, d)) if d <= distance => best,
                _ => Some((ts, distance)),
            }
        })
        .map(|(ts, _)| ts.clone())
}

/// Collects the captures an archive holds for a URL.
pub struct MementoResolver<'a> {
    fetcher: &'a dyn Fetcher,
    concurrency: usize,
}

impl<'a> MementoResolver<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    /// All captures of `url` between `start_year` and `end_year` inclusive,
    /// deduplicated and sorted ascending.
    ///
    /// Individual probe failures only shrink the result.
    pub async fn resolve(
        &self,
        profile: &ArchiveProfile,
        url: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<Timestamp>, MementoError> {
        if start_year > end_year {
            return Err(MementoError::InvalidRange {
                start_year,
                end_year,
            });
        }

        let found = match &profile.resolution {
            ResolutionMode::Timegate => self.probe_timegate(profile, url, start_year, end_year).await,
            ResolutionMode::CdxIndex { cdx_url } => {
                self.query_index(cdx_url, url, start_year, end_year).await
            }
        };

        let set: BTreeSet<Timestamp> = found.into_iter().collect();
        info!(
            "Found {} memento(s) for {} in {} ({}-{})",
            set.len(),
            url,
            profile.id,
            start_year,
            end_year
        );
        Ok(set.into_iter().collect())
    }

    /// Resolve the capture nearest `target`. A capture at exactly `target`
    /// is used as-is.
    pub async fn closest(
        &self,
        profile: &ArchiveProfile,
        url: &str,
        target: &Timestamp,
        start_year: i32,
        end_year: i32,
    ) -> Result<Timestamp, MementoError> {
        let mementos = self.resolve(profile, url, start_year, end_year).await?;

        if mementos.binary_search(target).is_ok() {
            return Ok(target.clone());
        }

        pick_closest(&mementos, target).ok_or_else(|| MementoError::NotFound {
            url: url.to_string(),
            archive: profile.id.clone(),
            start_year,
            end_year,
        })
    }

    async fn probe_timegate(
        &self,
        profile: &ArchiveProfile,
        url: &str,
        start_year: i32,
        end_year: i32,
    ) -> Vec<Timestamp> {
        let timegate = profile.timegate_url(url);
        let timegate = timegate.as_str();

        stream::iter(start_year..=end_year)
            .map(|year| async move {
                let probe = Timestamp::probe_for_year(year)?;
                let options = FetchOptions::accept_datetime(http_date(&probe));
                match fetch_with_retry(self.fetcher, timegate, &options).await {
                    Ok(response) => {
                        let ts = response
                            .memento_datetime()
                            .unwrap_or_else(|| Timestamp::from_datetime(probe));
                        debug!("Timegate probe {} for {} -> {}", year, url, ts);
                        Some(ts)
                    }
                    Err(e) => {
                        debug!("Timegate probe {} for {} failed: {}", year, url, e);
                        None
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .filter_map(|ts| async move { ts })
            .collect()
            .await
    }

    async fn query_index(
        &self,
        cdx_url: &str,
        url: &str,
        start_year: i32,
        end_year: i32,
    ) -> Vec<Timestamp> {
        let query = CdxQuery::captures_between(cdx_url, url, start_year, end_year).build();
        let response = match fetch_with_retry(self.fetcher, &query, &FetchOptions::default()).await {
            Ok(r) => r,
            Err(e) => {
                warn!("CDX query for {} failed: {}", url, e);
                return Vec::new();
            }
        };

        cdx::parse_timestamps(&response.text()).unwrap_or_else(|e| {
            warn!("CDX response for {} unusable: {}", url, e);
            Vec::new()
        })
    }
}
