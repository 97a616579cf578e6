//! End-to-end pipeline tests against an in-memory archive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use wasteback::{
    ArchiveProfile, ArchiveRegistry, Category, ErrorKind, FetchError, FetchOptions,
    FetchedResponse, Fetcher, MeasureOptions, MeasureRequest, ResolutionMode, RetryPolicy,
    Settings, Wasteback,
};

const PAGE: &str = "https://example.com/";
const TIMEGATE: &str = "https://web.archive.org/web/https://example.com/";
const RAW: &str = "https://web.archive.org/web/20200115080000id_/https://example.com/";
const FRAME: &str = "https://web.archive.org/web/20200115080000if_/https://example.com/";

const RAW_HTML: &str = "<html><head><title>Example</title></head><body>Hello</body></html>";

const FRAME_HTML: &str = r#"<html><head>
<script src="/_static/js/bundle-playback.js"></script>
<link rel="stylesheet" href="/web/20200115080000cs_/https://example.com/style.css?v=12">
<script src="/web/20200115080000js_/https://example.com/app.js"></script>
</head><body>
<img src="//cdn.example/a.png" srcset="//cdn.example/a.png 1x">
<img src="http://[::bad/x.png">
</body></html>"#;

/// In-memory archive. Unknown URLs answer 404.
#[derive(Default)]
struct FakeArchive {
    pages: HashMap<String, FetchedResponse>,
    requests: Mutex<Vec<String>>,
}

impl FakeArchive {
    fn page(mut self, url: &str, content_type: &str, body: &str) -> Self {
        let resp = FetchedResponse::new(url, 200, body).with_header("Content-Type", content_type);
        self.pages.insert(url.to_string(), resp);
        self
    }

    fn response(mut self, url: &str, resp: FetchedResponse) -> Self {
        self.pages.insert(url.to_string(), resp);
        self
    }

    fn requested(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for FakeArchive {
    async fn get(&self, url: &str, _options: &FetchOptions) -> Result<FetchedResponse, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        Ok(self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FetchedResponse::new(url, 404, "")))
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        }
    }
}

fn timegate_hit() -> FetchedResponse {
    FetchedResponse::new(TIMEGATE, 200, RAW_HTML)
        .with_header("Memento-Datetime", "Wed, 15 Jan 2020 08:00:00 GMT")
}

fn archive() -> FakeArchive {
    FakeArchive::default()
        .response(TIMEGATE, timegate_hit())
        .page(RAW, "text/html", RAW_HTML)
        .page(FRAME, "text/html", FRAME_HTML)
        .page(
            "https://web.archive.org/web/20200115080000cs_/https://example.com/style.css",
            "text/css",
            "body{}\n/* FILE ARCHIVED ON 8:00:00 Jan 15, 2020 AND RETRIEVED FROM THE INTERNET ARCHIVE */",
        )
        .page(
            "https://web.archive.org/web/20200115080000js_/https://example.com/app.js",
            "application/javascript",
            "run();",
        )
}

fn wasteback(fetcher: Arc<FakeArchive>) -> Wasteback {
    Wasteback::new(ArchiveRegistry::with_defaults(), fetcher, Settings::default())
}

fn only_2020() -> MeasureOptions {
    MeasureOptions {
        start_year: Some(2020),
        end_year: Some(2020),
        ..Default::default()
    }
}

#[tokio::test]
async fn measures_composition_of_nearest_memento() {
    let fetcher = Arc::new(archive());
    let wb = wasteback(fetcher.clone());
    let options = MeasureOptions {
        include_resources: true,
        ..only_2020()
    };

    let report = wb
        .measure(&MeasureRequest::new(PAGE, 2020).month(2), &options)
        .await
        .unwrap();

    assert_eq!(report.requested_memento.as_str(), "20200201000000");
    assert_eq!(report.memento.as_str(), "20200115080000");
    assert_eq!(report.memento_url, FRAME);
    assert_eq!(report.archive, "Wayback Machine");
    assert_eq!(report.archive_org, "Internet Archive");

    let sizes = &report.sizes;
    assert_eq!(sizes.get(Category::Html).bytes, RAW_HTML.len() as u64);
    assert_eq!(sizes.get(Category::Stylesheet).bytes, 7);
    assert_eq!(sizes.get(Category::Script).bytes, 6);
    assert_eq!(sizes.get(Category::Other).count, 1);
    assert_eq!(sizes.get(Category::Other).bytes, 0);
    assert_eq!(sizes.total().count, 4);
    assert_eq!(sizes.total().bytes, RAW_HTML.len() as u64 + 13);

    let sum: u64 = Category::ALL.iter().map(|c| sizes.get(*c).bytes).sum();
    assert_eq!(sizes.total().bytes, sum);

    assert_eq!(report.completeness.to_string(), "67%");
    assert_eq!(report.malformed_references, 1);

    let resources = report.resources.as_ref().unwrap();
    assert_eq!(resources.len(), 3);
    assert!(resources
        .iter()
        .any(|r| r.url == "https://cdn.example/a.png" && !r.fetch_succeeded));

    // The toolbar script is never fetched; the failing image is retried.
    assert_eq!(
        fetcher.requested("https://web.archive.org/_static/js/bundle-playback.js"),
        0
    );
    assert_eq!(fetcher.requested("https://cdn.example/a.png"), 2);
}

#[tokio::test]
async fn report_serializes_to_expected_shape() {
    let wb = wasteback(Arc::new(archive()));
    let report = wb
        .measure(&MeasureRequest::new("example.com/", 2020), &only_2020())
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["url"], PAGE);
    assert_eq!(json["memento"], "20200115080000");
    assert_eq!(json["mementoUrl"], FRAME);
    assert_eq!(json["archiveUrl"], "https://web.archive.org");
    assert_eq!(json["completeness"], "67%");
    assert_eq!(json["sizes"]["total"]["count"], 4);
    assert!(json.get("resources").is_none());
}

#[tokio::test]
async fn no_mementos_is_not_found() {
    let wb = wasteback(Arc::new(FakeArchive::default()));
    let err = wb
        .measure(&MeasureRequest::new(PAGE, 2020), &only_2020())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("No mementos found"));
}

#[tokio::test]
async fn missing_rendering_fails_discovery() {
    let fetcher = FakeArchive::default().response(TIMEGATE, timegate_hit());
    let wb = wasteback(Arc::new(fetcher));
    let err = wb
        .measure(&MeasureRequest::new(PAGE, 2020), &only_2020())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DiscoveryFailed);
}

#[tokio::test]
async fn input_validation_happens_before_any_request() {
    let fetcher = Arc::new(FakeArchive::default());
    let wb = wasteback(fetcher.clone());

    let cases = [
        (MeasureRequest::new("", 2020), ErrorKind::InvalidInput),
        (MeasureRequest::new(PAGE, 1990), ErrorKind::InvalidInput),
        (MeasureRequest::new(PAGE, 2020).day(32), ErrorKind::InvalidInput),
        (
            MeasureRequest::new(PAGE, 2020).archive("nope"),
            ErrorKind::UnsupportedArchive,
        ),
    ];
    for (request, kind) in cases {
        let err = wb.measure(&request, &only_2020()).await.unwrap_err();
        assert_eq!(err.kind(), kind, "{:?}", request);
    }
    assert!(fetcher.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn lists_mementos_across_years() {
    let wb = wasteback(Arc::new(archive()));
    let mementos = wb
        .mementos(PAGE, Some("IA"), Some(2019), Some(2021))
        .await
        .unwrap();
    // Every year's probe hits the same canned capture.
    let got: Vec<&str> = mementos.iter().map(|t| t.as_str()).collect();
    assert_eq!(got, vec!["20200115080000"]);
}

#[tokio::test]
async fn injected_index_archive() {
    let mirror = ArchiveProfile {
        id: "mirror".to_string(),
        name: "Mirror".to_string(),
        organisation: "Test".to_string(),
        website: "https://mirror.test".to_string(),
        timegate: "https://mirror.test/web/".to_string(),
        raw_endpoint: "https://mirror.test/web/{datetime}id_/{url}".to_string(),
        frame_endpoint: "https://mirror.test/web/{datetime}if_/{url}".to_string(),
        excluded_paths: Vec::new(),
        cleaning_rules: Vec::new(),
        resolution: ResolutionMode::CdxIndex {
            cdx_url: "https://mirror.test/cdx".to_string(),
        },
        earliest_year: 2000,
    };
    let registry = ArchiveRegistry::with_profiles(vec![mirror]).unwrap();

    let cdx = "https://mirror.test/cdx?url=https%3A%2F%2Fexample.com%2F&output=json\
               &fl=timestamp&filter=statuscode:200&from=2000&to=2010";
    let fetcher = FakeArchive::default()
        .page(
            cdx,
            "application/json",
            r#"[["timestamp"],["20040101000000"],["20080101000000"]]"#,
        )
        .page(
            "https://mirror.test/web/20080101000000id_/https://example.com/",
            "text/html",
            "<p>hi</p>",
        )
        .page(
            "https://mirror.test/web/20080101000000if_/https://example.com/",
            "text/html",
            "<p>hi</p>",
        );

    let wb = Wasteback::new(
        registry,
        Arc::new(fetcher),
        Settings {
            default_archive: "mirror".to_string(),
            ..Settings::default()
        },
    );
    let options = MeasureOptions {
        start_year: Some(2000),
        end_year: Some(2010),
        ..Default::default()
    };
    let report = wb
        .measure(&MeasureRequest::new(PAGE, 2007), &options)
        .await
        .unwrap();

    assert_eq!(report.memento.as_str(), "20080101000000");
    assert_eq!(report.sizes.total().bytes, 9);
    assert_eq!(report.completeness.to_string(), "100%");
}
