//! Resource classification by MIME type and file extension.
//!
//! Both tables are ordered data evaluated by [`classify`]: MIME patterns are
//! tried first and the first match wins, then the URL's file extension is
//! looked up, then the resource falls into [`Category::Other`].

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Semantic resource category used to bucket sizes in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Html,
    Stylesheet,
    Script,
    Image,
    Video,
    Audio,
    Font,
    Flash,
    Plugin,
    Data,
    Document,
    Other,
}

impl Category {
    /// Every category in report order.
    pub const ALL: [Category; 12] = [
        Category::Html,
        Category::Stylesheet,
        Category::Script,
        Category::Image,
        Category::Video,
        Category::Audio,
        Category::Font,
        Category::Flash,
        Category::Plugin,
        Category::Data,
        Category::Document,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Stylesheet => "stylesheet",
            Self::Script => "script",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Font => "font",
            Self::Flash => "flash",
            Self::Plugin => "plugin",
            Self::Data => "data",
            Self::Document => "document",
            Self::Other => "other",
        }
    }

    /// Scripts and stylesheets are measured after archive banners are removed.
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Script | Self::Stylesheet)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Ordered MIME patterns. Specific `application/*` types precede the
/// generic data patterns so fonts, flash and plugins are not swallowed.
static MIME_RULES: LazyLock<Vec<(Regex, Category)>> = LazyLock::new(|| {
    [
        (r"^text/html\b", Category::Html),
        (r"^text/css\b", Category::Stylesheet),
        (r"^(application|text)/(javascript|ecmascript)\b", Category::Script),
        (r"^image/", Category::Image),
        (r"^video/", Category::Video),
        (r"^audio/", Category::Audio),
        (r"^font/", Category::Font),
        (r"^application/(font-woff2?|vnd\.ms-fontobject)\b", Category::Font),
        (r"^application/x-shockwave-flash\b", Category::Flash),
        (r"^application/x-director\b", Category::Plugin),
        (r"^application/x-silverlight-app\b", Category::Plugin),
        (r"^(application/java-archive|application/x-java-applet)\b", Category::Plugin),
        (r"^application/vnd\.unity\b", Category::Plugin),
        (r"^application/json\b", Category::Data),
        (r"^application/wasm\b", Category::Data),
        (r"^application/pdf\b", Category::Document),
        (r"^application/(zip|x-7z-compressed|x-tar|gzip)\b", Category::Data),
        (r"^application/xml\b", Category::Data),
        (r"^text/xml\b", Category::Data),
        (r"^text/map\b", Category::Data),
    ]
    .into_iter()
    .map(|(pattern, category)| {
        let regex = Regex::new(&format!("(?i){}", pattern)).expect("static MIME pattern");
        (regex, category)
    })
    .collect()
});

/// Extension groups. Where an extension appears in two groups the later
/// group wins (`ts` is treated as an MPEG transport stream, not TypeScript).
const EXTENSION_GROUPS: &[(Category, &[&str])] = &[
    (Category::Stylesheet, &["css", "scss", "sass", "less"]),
    (
        Category::Script,
        &["js", "mjs", "cjs", "ts", "jsx", "tsx", "coffee", "vue"],
    ),
    (
        Category::Image,
        &[
            "png", "jpg", "jpeg", "gif", "webp", "avif", "bmp", "ico", "cur", "tiff", "tif", "svg",
            "apng", "heic", "heif", "jp2", "j2k", "dds", "ppm", "pgm", "pbm", "hdr",
        ],
    ),
    (
        Category::Video,
        &[
            "mp4", "webm", "ogv", "m4v", "mkv", "mov", "avi", "flv", "m2v", "ts", "rmvb", "rm",
            "f4v", "f4p", "f4a", "f4b", "3gp", "3g2",
        ],
    ),
    (
        Category::Audio,
        &[
            "mp3", "wav", "ogg", "oga", "aac", "m4a", "flac", "opus", "mid", "midi", "ra", "ram",
            "aif", "aiff", "au", "m4b",
        ],
    ),
    (
        Category::Font,
        &["woff", "woff2", "ttf", "otf", "eot", "pfa", "pfb"],
    ),
    (Category::Flash, &["swf"]),
    (
        Category::Plugin,
        &["jar", "class", "xap", "unity3d", "dcr", "dir", "cab", "ocx"],
    ),
    (
        Category::Data,
        &[
            "json", "xml", "zip", "tar", "7z", "wasm", "map", "csv", "tsv", "yaml", "yml",
            "sqlite", "db", "db3",
        ],
    ),
    (
        Category::Document,
        &["txt", "pdf", "rtf", "log", "ini", "conf"],
    ),
];

static EXTENSIONS: LazyLock<HashMap<&'static str, Category>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for (category, exts) in EXTENSION_GROUPS {
        for ext in *exts {
            map.insert(*ext, *category);
        }
    }
    map
});

/// Classify a MIME type alone. `None` when no pattern matches.
pub fn classify_mime(mime: &str) -> Option<Category> {
    let mime = mime.trim();
    if mime.is_empty() {
        return None;
    }
    MIME_RULES
        .iter()
        .find(|(regex, _)| regex.is_match(mime))
        .map(|(_, category)| *category)
}

/// Lower-cased text after the last dot of a URL, ignoring query and fragment.
fn url_extension(url: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let path = path.split('#').next().unwrap_or(path);
    path.rsplit('.')
        .next()
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Classify a URL by its file extension alone.
pub fn classify_extension(url: &str) -> Option<Category> {
    EXTENSIONS.get(url_extension(url).as_str()).copied()
}

/// Classify a resource: MIME pattern, then file extension, then `Other`.
pub fn classify(url: &str, mime: &str) -> Category {
    classify_mime(mime)
        .or_else(|| classify_extension(url))
        .unwrap_or(Category::Other)
}
