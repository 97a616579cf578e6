//! Built-in archive profiles.

use super::{ArchiveProfile, CleaningRule, Delimiters, ResolutionMode, DEFAULT_EARLIEST_YEAR};

/// Recipe shared by pywb/OpenWayback archives that stamp replayed code with
/// a `FILE ARCHIVED ON` trailer.
fn wayback_cleaning() -> Vec<CleaningRule> {
    vec![
        CleaningRule::remove_comments(),
        CleaningRule::remove_between(vec![
            Delimiters::new(r"/\* FILE ARCHIVED ON", r"\*/"),
            Delimiters::new(r"<!-- FILE ARCHIVED ON", r"-->"),
        ]),
    ]
}

struct Entry {
    id: &'static str,
    name: &'static str,
    organisation: &'static str,
    website: &'static str,
    /// Replay prefix shared by the timegate and both endpoints, unless overridden.
    replay: &'static str,
    timegate: Option<&'static str>,
    frame_flag: &'static str,
    excluded: &'static [&'static str],
    cleaning: fn() -> Vec<CleaningRule>,
}

impl Entry {
    fn into_profile(self) -> ArchiveProfile {
        ArchiveProfile {
            id: self.id.to_string(),
            name: self.name.to_string(),
            organisation: self.organisation.to_string(),
            website: self.website.to_string(),
            timegate: self.timegate.unwrap_or(self.replay).to_string(),
            raw_endpoint: format!("{}{{datetime}}id_/{{url}}", self.replay),
            frame_endpoint: format!("{}{{datetime}}{}/{{url}}", self.replay, self.frame_flag),
            excluded_paths: self.excluded.iter().map(|s| s.to_string()).collect(),
            cleaning_rules: (self.cleaning)(),
            resolution: ResolutionMode::Timegate,
            earliest_year: DEFAULT_EARLIEST_YEAR,
        }
    }
}

/// Every archive supported out of the box.
pub fn builtin_profiles() -> Vec<ArchiveProfile> {
    let entries = [
        Entry {
            id: "arq",
            name: "Arquivo.pt",
            organisation: "FCCN/FCT",
            website: "https://arquivo.pt",
            replay: "https://arquivo.pt/noFrame/replay/",
            timegate: Some("https://arquivo.pt/wayback/"),
            frame_flag: "if_",
            excluded: &["/static/"],
            cleaning: Vec::new,
        },
        Entry {
            id: "awa",
            name: "Australia Web Archive (Trove)",
            organisation: "National Library of Australia",
            website: "https://webarchive.nla.gov.au",
            replay: "https://webarchive.nla.gov.au/awa/",
            timegate: Some("https://webarchive.org.au/wayback/"),
            frame_flag: "if_",
            excluded: &[
                "/bamboo-service/",
                "/calendar/",
                "/cdx/",
                "/css/",
                "/images/",
                "/js/",
                "/webjars/",
                "https://web.archive.org.au/static/",
                "https://assets.nla.gov.au",
                "https://login.nla.gov.au",
                "https://region1.google-analytics.com",
                "https://www.googletagmanager.com",
            ],
            cleaning: Vec::new,
        },
        Entry {
            id: "cz",
            name: "Webarchiv",
            organisation: "National Library of the Czech Republic",
            website: "https://webarchiv.cz/",
            replay: "https://wayback.webarchiv.cz/wayback/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/_static/", "https://web-static.archive.org"],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "gcwa",
            name: "Government of Canada Web Archive",
            organisation: "Library and Archives Canada",
            website: "https://webarchiveweb.bac-lac.canada.ca",
            replay: "https://webarchiveweb.wayback.bac-lac.canada.ca/web/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/static/", "https://analytics.archive-it.org"],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "ia",
            name: "Wayback Machine",
            organisation: "Internet Archive",
            website: "https://web.archive.org",
            replay: "https://web.archive.org/web/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/_static/", "https://web-static.archive.org"],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "iwa",
            name: "Icelandic Web Archive (Vefsafn.is)",
            organisation: "National and University Library of Iceland",
            website: "https://vefsafn.is",
            replay: "https://vefsafn.is/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/static/", "https://t.landsbokasafn.is"],
            cleaning: Vec::new,
        },
        Entry {
            id: "loc",
            name: "Library of Congress Web Archive",
            organisation: "Library of Congress",
            website: "https://loc.gov/web-archives",
            replay: "https://webarchive.loc.gov/all/",
            timegate: Some("https://webarchive.loc.gov/all/*/"),
            frame_flag: "if_",
            excluded: &["/static/"],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "nliwa",
            name: "National Library of Ireland Web Archive",
            organisation: "National Library of Ireland",
            website: "https://nli.ie/collections/our-collections/web-archive",
            replay: "https://wayback.archive-it.org/org-1444/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/static/", "https://analytics.archive-it.org"],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "nzwa",
            name: "New Zealand Web Archive",
            organisation: "National Library of New Zealand",
            website: "https://webarchive.natlib.govt.nz",
            replay: "https://ndhadeliver.natlib.govt.nz/webarchive/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/static/"],
            cleaning: Vec::new,
        },
        Entry {
            id: "pwa",
            name: "PRONI Web Archive",
            organisation: "The Public Record Office of Northern Ireland",
            website: "https://webarchive.proni.gov.uk",
            replay: "https://wayback.archive-it.org/11112/",
            timegate: None,
            frame_flag: "if_",
            excluded: &["/static/", "https://partner.archive-it.org"],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "slo",
            name: "Spletni Arhiv",
            organisation: "National and University Library of Slovenia",
            website: "https://arhiv.nuk.uni-lj.si",
            replay: "https://arhiv.nuk.uni-lj.si/wayback/",
            timegate: None,
            frame_flag: "if_",
            excluded: &[
                "/_static/",
                "/extern_js/",
                "/images/",
                "/intl/",
                "/textinputassistant/",
                "https://ssl.gstatic.com/",
            ],
            cleaning: wayback_cleaning,
        },
        Entry {
            id: "ukgwa",
            name: "UK Government Web Archive (UKGWA)",
            organisation: "The National Archives",
            website: "https://webarchive.nationalarchives.gov.uk/ukgwa",
            replay: "https://webarchive.nationalarchives.gov.uk/ukgwa/",
            timegate: None,
            frame_flag: "if_",
            excluded: &[
                "/static/",
                "https://cdn.jsdelivr.net",
                "https://fonts.googleapis.com",
                "https://fonts.gstatic.com",
                "https://s3-eu-west-1.amazonaws.com",
                "https://www.googletagmanager.com",
            ],
            cleaning: Vec::new,
        },
        // pywb without `if_` support; `mp_` serves the bare capture.
        Entry {
            id: "ukwa",
            name: "UK Web Archive",
            organisation: "British Library",
            website: "https://www.webarchive.org.uk",
            replay: "https://webarchive.org.uk/wayback/en/archive/",
            timegate: None,
            frame_flag: "mp_",
            excluded: &[],
            cleaning: Vec::new,
        },
    ];

    entries.into_iter().map(Entry::into_profile).collect()
}
