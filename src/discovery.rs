//! Resource discovery for one resolved memento.
//!
//! The raw capture gives the page's own byte size; the frame rendering is
//! parsed and walked for resource references. References are resolved
//! against the frame URL, filtered against the archive's injected paths,
//! normalised and deduplicated in first-seen order.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::archives::ArchiveProfile;
use crate::http_client::{fetch_with_retry, FetchError, FetchOptions, Fetcher};
use crate::timestamp::Timestamp;

/// Query parameters that only bust caches and never change the resource.
const CACHE_BUSTING_PARAMS: &[&str] = &["v", "ver", "cb"];

/// Values that never name a fetchable resource.
const SKIPPED_PREFIXES: &[&str] = &["data:", "javascript:", "mailto:", "tel:", "about:", "#"];

/// (selector, attribute, is_srcset)
const REFERENCE_ATTRIBUTES: &[(&str, &str, bool)] = &[
    ("link[href]", "href", false),
    ("script[src]", "src", false),
    ("img[src]", "src", false),
    ("img[srcset]", "srcset", true),
    ("source[src]", "src", false),
    ("source[srcset]", "srcset", true),
    ("video[src]", "src", false),
    ("video[poster]", "poster", false),
    ("audio[src]", "src", false),
    ("iframe[src]", "src", false),
    ("object[data]", "data", false),
    ("embed[src]", "src", false),
];

static SELECTORS: LazyLock<Vec<(Selector, &'static str, bool)>> = LazyLock::new(|| {
    REFERENCE_ATTRIBUTES
        .iter()
        .map(|(css, attr, srcset)| {
            let selector = Selector::parse(css).expect("static reference selector");
            (selector, *attr, *srcset)
        })
        .collect()
});

/// Quoted absolute URLs inside script text.
static SCRIPT_URL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"`](https?://[^'"`\s]+?)['"`]"#).expect("static script literal pattern")
});

/// Errors that abort discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to fetch {rendering} rendering {url}: {source}")]
    Fetch {
        rendering: &'static str,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Frame rendering URL is not valid: {0}")]
    InvalidFrameUrl(String),
}

/// One discovered resource reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReference {
    /// Attribute value as written in the document.
    pub raw_url: String,
    /// Absolute, normalised URL. Unique within one discovery.
    pub url: String,
}

/// Outcome of discovering one memento's resources.
#[derive(Debug, Clone)]
pub struct DiscoveryResult {
    /// Byte length of the raw capture.
    pub html_bytes: u64,
    /// URL of the frame rendering; also the base for relative references.
    pub frame_url: String,
    pub references: Vec<ResourceReference>,
    /// References dropped because they could not be resolved to an http(s) URL.
    pub malformed: usize,
}

/// Strip the fragment and cache-busting parameters. The remaining query is
/// kept byte-for-byte.
pub fn normalise_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    if let Some(query) = url.query() {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| {
                let key = pair.split('=').next().unwrap_or("");
                !pair.is_empty() && !CACHE_BUSTING_PARAMS.contains(&key)
            })
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            let joined = kept.join("&");
            url.set_query(Some(joined.as_str()));
        }
    }

    url.to_string()
}

/// URL tokens of a `srcset` value, descriptors dropped.
///
/// Candidates are split on every comma; the URL is the first
/// whitespace-separated token of each.
fn srcset_urls(value: &str) -> Vec<&str> {
    value
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .collect()
}

/// Absolute URL literals quoted inside script text.
pub fn script_url_literals(text: &str) -> Vec<&str> {
    SCRIPT_URL_LITERAL
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Accumulates references: resolve, filter, normalise, dedup.
pub struct ReferenceCollector<'a> {
    profile: &'a ArchiveProfile,
    base: Url,
    seen: HashSet<String>,
    references: Vec<ResourceReference>,
    malformed: usize,
}

impl<'a> ReferenceCollector<'a> {
    pub fn new(profile: &'a ArchiveProfile, base: Url) -> Self {
        Self {
            profile,
            base,
            seen: HashSet::new(),
            references: Vec::new(),
            malformed: 0,
        }
    }

    /// Treat `urls` as already collected so they are not yielded again.
    pub fn exclude_known<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seen.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Offer one raw attribute value.
    pub fn push(&mut self, raw: &str) {
        let raw = raw.trim();
        if raw.is_empty()
            || SKIPPED_PREFIXES.iter().any(|p| {
                raw.get(..p.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(p))
            })
        {
            return;
        }

        let expanded = match raw.strip_prefix("//") {
            Some(rest) => format!("https://{}", rest),
            None => raw.to_string(),
        };
        if self.profile.is_excluded(&expanded) {
            debug!("Skipping archive-injected reference {}", expanded);
            return;
        }

        let resolved = match self.base.join(&expanded) {
            Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => u,
            Ok(u) => {
                warn!("Dropping reference with unsupported scheme: {}", u);
                self.malformed += 1;
                return;
            }
            Err(e) => {
                warn!("Dropping malformed reference {:?}: {}", raw, e);
                self.malformed += 1;
                return;
            }
        };

        let url = normalise_url(&resolved);
        if self.seen.insert(url.clone()) {
            self.references.push(ResourceReference {
                raw_url: raw.to_string(),
                url,
            });
        }
    }

    pub fn into_parts(self) -> (Vec<ResourceReference>, usize) {
        (self.references, self.malformed)
    }
}

/// Walk a parsed frame document and collect its resource references.
///
/// Returns the references plus the number of malformed values dropped.
pub fn extract_references(
    html: &str,
    base_url: &str,
    profile: &ArchiveProfile,
) -> Result<(Vec<ResourceReference>, usize), DiscoveryError> {
    let base = Url::parse(base_url).map_err(|_| DiscoveryError::InvalidFrameUrl(base_url.to_string()))?;
    let document = Html::parse_document(html);
    let mut collector = ReferenceCollector::new(profile, base);

    for (selector, attr, is_srcset) in SELECTORS.iter() {
        for element in document.select(selector) {
            let Some(value) = element.value().attr(attr) else {
                continue;
            };
            if *is_srcset {
                for candidate in srcset_urls(value) {
                    collector.push(candidate);
                }
            } else {
                collector.push(value);
            }
        }
    }

    Ok(collector.into_parts())
}

/// Fetch both renderings of a memento and extract its references.
pub async fn discover(
    fetcher: &dyn Fetcher,
    profile: &ArchiveProfile,
    url: &str,
    timestamp: &Timestamp,
) -> Result<DiscoveryResult, DiscoveryError> {
    let raw_url = profile.raw_url(timestamp, url);
    let frame_url = profile.frame_url(timestamp, url);
    let options = FetchOptions::default();

    let raw = fetch_with_retry(fetcher, &raw_url, &options)
        .await
        .map_err(|source| DiscoveryError::Fetch {
            rendering: "raw",
            url: raw_url.clone(),
            source,
        })?;

    let frame = fetch_with_retry(fetcher, &frame_url, &options)
        .await
        .map_err(|source| DiscoveryError::Fetch {
            rendering: "frame",
            url: frame_url.clone(),
            source,
        })?;

    let (references, malformed) = extract_references(&frame.text(), &frame_url, profile)?;
    info!(
        "Discovered {} resource(s) in {} ({} malformed)",
        references.len(),
        frame_url,
        malformed
    );

    Ok(DiscoveryResult {
        html_bytes: raw.len() as u64,
        frame_url,
        references,
        malformed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archives::ArchiveRegistry;
    use crate::http_client::{FetchedResponse, RetryPolicy};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    const FRAME: &str = "https://web.archive.org/web/20200101000000if_/https://example.com/";

    fn ia() -> ArchiveProfile {
        ArchiveRegistry::with_defaults().get("ia").unwrap().clone()
    }

    fn urls(html: &str) -> Vec<String> {
        let (refs, _) = extract_references(html, FRAME, &ia()).unwrap();
        refs.into_iter().map(|r| r.url).collect()
    }

    #[test]
    fn synthetic_frame_document() {
        let html = r#"<html><head>
            <link rel="stylesheet" href="/style.css">
            <script src="https://web.archive.org/_static/js/bundle-playback.js"></script>
            </head><body><img src="//cdn.example/a.png"></body></html>"#;
        assert_eq!(
            urls(html),
            vec!["https://web.archive.org/style.css", "https://cdn.example/a.png"]
        );
    }

    #[test]
    fn src_and_srcset_dedup() {
        let html = r#"<img src="/a.png" srcset="/a.png 1x, /a@2x.png 2x">
                      <img src="/a.png#frag">"#;
        assert_eq!(
            urls(html),
            vec!["https://web.archive.org/a.png", "https://web.archive.org/a@2x.png"]
        );
    }

    #[test]
    fn cache_busters_removed() {
        let html = r#"<script src="/app.js?v=3"></script>
                      <script src="/app.js?ver=4&cb=9"></script>
                      <link href="/s.css?theme=dark&v=1">"#;
        assert_eq!(
            urls(html),
            vec!["https://web.archive.org/s.css?theme=dark", "https://web.archive.org/app.js"]
        );
    }

    #[test]
    fn non_resources_skipped() {
        let html = r##"<img src=""><img src="data:image/png;base64,AAAA">
                      <iframe src="javascript:void(0)"></iframe>
                      <iframe src="about:blank"></iframe><link href="#top">"##;
        let (refs, malformed) = extract_references(html, FRAME, &ia()).unwrap();
        assert!(refs.is_empty());
        assert_eq!(malformed, 0);
    }

    #[test]
    fn malformed_counted_and_dropped() {
        let html = r#"<img src="http://[broken/x.png"><img src="ftp://files.test/a.png"><img src="/ok.png">"#;
        let (refs, malformed) = extract_references(html, FRAME, &ia()).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(malformed, 2);
    }

    #[test]
    fn all_attribute_kinds_walked() {
        let html = r#"
            <video src="/v.mp4" poster="/poster.jpg"><source src="/v.webm"></video>
            <audio src="/a.mp3"></audio>
            <picture><source srcset="/p.avif 1x"></picture>
            <object data="/movie.swf"></object><embed src="/plugin.dcr">
            <iframe src="https://other.test/frame.html"></iframe>"#;
        let got = urls(html);
        assert_eq!(got.len(), 8);
        assert!(got.contains(&"https://web.archive.org/poster.jpg".to_string()));
        assert!(got.contains(&"https://other.test/frame.html".to_string()));
    }

    #[test]
    fn srcset_parsing() {
        assert_eq!(srcset_urls("a.png 1x, b.png 2x"), vec!["a.png", "b.png"]);
        assert_eq!(srcset_urls("a.png,b.png"), vec!["a.png", "b.png"]);
        assert_eq!(srcset_urls("a.png, b.png"), vec!["a.png", "b.png"]);
        assert_eq!(srcset_urls("a.png 100w,b.png 200w"), vec!["a.png", "b.png"]);
        assert_eq!(srcset_urls("a.png 1x,, ,b.png"), vec!["a.png", "b.png"]);
        assert!(srcset_urls("  ").is_empty());
    }

    #[test]
    fn srcset_without_spaces_yields_each_candidate() {
        assert_eq!(
            urls(r#"<img srcset="/a.png,/b.png">"#),
            vec!["https://web.archive.org/a.png", "https://web.archive.org/b.png"]
        );
    }

    #[test]
    fn scheme_relative_references_hit_exclusions() {
        let ukgwa = ArchiveRegistry::with_defaults().get("ukgwa").unwrap().clone();
        let frame = "https://webarchive.nationalarchives.gov.uk/ukgwa/20200101000000if_/https://example.gov.uk/";
        let html = r#"<link href="//fonts.googleapis.com/css?family=Roboto">
                      <link href="https://fonts.googleapis.com/css?family=Lato">
                      <script src="//www.googletagmanager.com/gtm.js"></script>
                      <img src="//cdn.example/a.png">"#;
        let (refs, malformed) = extract_references(html, frame, &ukgwa).unwrap();
        let got: Vec<&str> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(got, vec!["https://cdn.example/a.png"]);
        assert_eq!(malformed, 0);
    }

    #[test]
    fn normalisation_keeps_other_params() {
        let u = Url::parse("https://x.test/p?a=1&v=2&b=%20#frag").unwrap();
        assert_eq!(normalise_url(&u), "https://x.test/p?a=1&b=%20");
        let u = Url::parse("https://x.test/p?cb=1").unwrap();
        assert_eq!(normalise_url(&u), "https://x.test/p");
    }

    #[test]
    fn script_literals() {
        let js = r#"var a = "https://cdn.test/lib.js"; load('http://x.test/img.png'); var s = "not a url";"#;
        assert_eq!(
            script_url_literals(js),
            vec!["https://cdn.test/lib.js", "http://x.test/img.png"]
        );
    }

    #[test]
    fn collector_skips_known() {
        let profile = ia();
        let mut collector = ReferenceCollector::new(&profile, Url::parse(FRAME).unwrap())
            .exclude_known(["https://cdn.test/a.js".to_string()]);
        collector.push("https://cdn.test/a.js");
        collector.push("https://cdn.test/b.js?v=2");
        let (refs, _) = collector.into_parts();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://cdn.test/b.js");
    }

    struct MapFetcher(HashMap<String, FetchedResponse>);

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn get(&self, url: &str, _options: &FetchOptions) -> Result<FetchedResponse, FetchError> {
            Ok(self
                .0
                .get(url)
                .cloned()
                .unwrap_or_else(|| FetchedResponse::new(url, 404, "")))
        }

        fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            }
        }
    }

    #[tokio::test]
    async fn discover_measures_raw_and_walks_frame() {
        let profile = ia();
        let ts = Timestamp::parse("20200101000000").unwrap();
        let raw = "https://web.archive.org/web/20200101000000id_/https://example.com/";
        let mut pages = HashMap::new();
        pages.insert(raw.to_string(), FetchedResponse::new(raw, 200, "0123456789"));
        pages.insert(
            FRAME.to_string(),
            FetchedResponse::new(FRAME, 200, r#"<img src="/a.png">"#),
        );
        let fetcher = MapFetcher(pages);

        let result = discover(&fetcher, &profile, "https://example.com/", &ts)
            .await
            .unwrap();
        assert_eq!(result.html_bytes, 10);
        assert_eq!(result.frame_url, FRAME);
        assert_eq!(result.references.len(), 1);
        assert_eq!(result.references[0].raw_url, "/a.png");
    }

    #[tokio::test]
    async fn missing_rendering_is_fatal() {
        let profile = ia();
        let ts = Timestamp::parse("20200101000000").unwrap();
        let fetcher = MapFetcher(HashMap::new());
        let err = discover(&fetcher, &profile, "https://example.com/", &ts)
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::Fetch { rendering: "raw", .. }));
    }
}
