//! Measuring discovered resources and folding them into a size table.

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::archives::ArchiveProfile;
use crate::classify::{classify, Category};
use crate::clean::CleaningRecipe;
use crate::discovery::{script_url_literals, DiscoveryResult, ReferenceCollector, ResourceReference};
use crate::http_client::{fetch_with_retry, FetchOptions, Fetcher};
use crate::report::{Completeness, ResourceResult, SizeTable};
use crate::timestamp::Timestamp;

/// Default number of resources fetched at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Invalid cleaning rule for archive '{archive}': {source}")]
    Cleaning {
        archive: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub concurrency: usize,
    /// Also measure absolute URLs quoted inside fetched scripts.
    pub scan_scripts: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            scan_scripts: false,
        }
    }
}

/// Result of measuring every reference of one memento.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub sizes: SizeTable,
    /// One entry per measured reference, in discovery order.
    pub resources: Vec<ResourceResult>,
    pub completeness: Completeness,
    /// Malformed references from discovery and the script scan.
    pub malformed: usize,
}

struct Measured {
    result: ResourceResult,
    /// Cleaned script text, kept only when scanning scripts.
    script: Option<String>,
}

async fn measure(
    fetcher: &dyn Fetcher,
    recipe: &CleaningRecipe,
    url: &str,
    keep_script: bool,
) -> Measured {
    let response = match fetch_with_retry(fetcher, url, &FetchOptions::default()).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Failed to fetch resource {}: {}", url, e);
            return Measured {
                result: ResourceResult::failed(url),
                script: None,
            };
        }
    };

    let category = classify(url, response.content_type().unwrap_or(""));
    let (size, script) = if category.is_code() {
        let text = response.text();
        let cleaned = recipe.apply(&text);
        let size = cleaned.len() as u64;
        let script = (keep_script && category == Category::Script).then(|| cleaned.into_owned());
        (size, script)
    } else {
        (response.len() as u64, None)
    };

    debug!("Measured {} as {} ({} bytes)", url, category, size);
    Measured {
        result: ResourceResult {
            url: url.to_string(),
            category,
            size,
            fetch_succeeded: true,
        },
        script,
    }
}

/// Fetch, classify and size one resource.
///
/// Scripts and stylesheets are measured after cleaning. A resource that
/// cannot be fetched becomes a zero-byte `other` result.
pub async fn measure_resource(
    fetcher: &dyn Fetcher,
    recipe: &CleaningRecipe,
    url: &str,
) -> ResourceResult {
    measure(fetcher, recipe, url, false).await.result
}

async fn measure_all(
    fetcher: &dyn Fetcher,
    recipe: &CleaningRecipe,
    references: &[ResourceReference],
    concurrency: usize,
    keep_scripts: bool,
) -> Vec<Measured> {
    let mut measured: Vec<(usize, Measured)> = stream::iter(references.iter().enumerate())
        .map(|(i, reference)| async move {
            (i, measure(fetcher, recipe, &reference.url, keep_scripts).await)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    measured.sort_by_key(|(i, _)| *i);
    measured.into_iter().map(|(_, m)| m).collect()
}

/// Archive URL for a live-web URL found in a replayed script. URLs already
/// on the archive's host are used as they are.
fn archived_literal(profile: &ArchiveProfile, memento: &Timestamp, frame: &Url, literal: &str) -> String {
    let same_host = Url::parse(literal)
        .ok()
        .is_some_and(|u| u.host_str() == frame.host_str());
    if same_host {
        literal.to_string()
    } else {
        profile.raw_url(memento, literal)
    }
}

/// Measure every discovered reference and fold the results.
///
/// The table is seeded with the page's HTML. Completeness counts successful
/// fetches against all measured references.
pub async fn aggregate(
    fetcher: &dyn Fetcher,
    profile: &ArchiveProfile,
    memento: &Timestamp,
    discovery: &DiscoveryResult,
    options: &AggregateOptions,
) -> Result<Aggregation, AggregateError> {
    let recipe = CleaningRecipe::compile(&profile.cleaning_rules).map_err(|source| {
        AggregateError::Cleaning {
            archive: profile.id.clone(),
            source,
        }
    })?;

    let mut measured = measure_all(
        fetcher,
        &recipe,
        &discovery.references,
        options.concurrency,
        options.scan_scripts,
    )
    .await;
    let mut malformed = discovery.malformed;

    if options.scan_scripts {
        if let Ok(frame) = Url::parse(&discovery.frame_url) {
            let mut collector = ReferenceCollector::new(profile, frame.clone())
                .exclude_known(discovery.references.iter().map(|r| r.url.clone()));
            for script in measured.iter().filter_map(|m| m.script.as_deref()) {
                for literal in script_url_literals(script) {
                    collector.push(&archived_literal(profile, memento, &frame, literal));
                }
            }
            let (extra, extra_malformed) = collector.into_parts();
            info!("Script scan found {} additional resource(s)", extra.len());
            malformed += extra_malformed;
            measured.extend(measure_all(fetcher, &recipe, &extra, options.concurrency, false).await);
        }
    }

    let mut sizes = SizeTable::seeded(discovery.html_bytes);
    let resources: Vec<ResourceResult> = measured.into_iter().map(|m| m.result).collect();
    for r in &resources {
        sizes.add(r.category, r.size);
    }

    let succeeded = resources.iter().filter(|r| r.fetch_succeeded).count();
    let completeness = Completeness::from_counts(succeeded, resources.len());
    info!(
        "Measured {}/{} resources, {} bytes total",
        succeeded,
        resources.len(),
        sizes.total().bytes
    );

    Ok(Aggregation {
        sizes,
        resources,
        completeness,
        malformed,
    })
}
