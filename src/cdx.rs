//! CDX index queries.
//!
//! Archives that expose a pywb/Wayback CDX server can list every capture of
//! a URL in one range query instead of one timegate negotiation per year.

use std::collections::HashMap;
use std::fmt;

use crate::timestamp::Timestamp;

/// Builder for CDX API query URLs.
pub struct CdxQuery {
    base_url: String,
    url: String,
    fields: Vec<String>,
    filters: Vec<String>,
    from: Option<String>,
    to: Option<String>,
}

impl CdxQuery {
    /// Query `base_url` for captures of `url`.
    pub fn new(base_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            url: url.into(),
            fields: Vec::new(),
            filters: Vec::new(),
            from: None,
            to: None,
        }
    }

    /// Query for the capture timestamps of successful responses between two
    /// years, inclusive.
    pub fn captures_between(base_url: &str, url: &str, from_year: i32, to_year: i32) -> Self {
        Self::new(base_url, url)
            .fields(&["timestamp"])
            .filter("statuscode:200")
            .from(from_year.to_string())
            .to(to_year.to_string())
    }

    /// Set the fields to return (`fl=` parameter).
    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Append a filter (`filter=` parameter). Can be called multiple times.
    pub fn filter(mut self, f: impl Into<String>) -> Self {
        self.filters.push(f.into());
        self
    }

    pub fn from(mut self, date: impl Into<String>) -> Self {
        self.from = Some(date.into());
        self
    }

    pub fn to(mut self, date: impl Into<String>) -> Self {
        self.to = Some(date.into());
        self
    }

    /// Build the final query URL.
    pub fn build(&self) -> String {
        let mut url = format!(
            "{}?url={}&output=json",
            self.base_url,
            urlencoding::encode(&self.url)
        );

        if !self.fields.is_empty() {
            url.push_str(&format!("&fl={}", self.fields.join(",")));
        }
        for f in &self.filters {
            url.push_str(&format!("&filter={}", f));
        }
        if let Some(ref from) = self.from {
            url.push_str(&format!("&from={}", from));
        }
        if let Some(ref to) = self.to {
            url.push_str(&format!("&to={}", to));
        }

        url
    }
}

/// Errors from CDX response parsing.
#[derive(Debug)]
pub enum CdxParseError {
    /// Response body was empty or whitespace-only.
    Empty,
    /// JSON deserialization failed.
    Json(String),
}

impl fmt::Display for CdxParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty CDX response"),
            Self::Json(msg) => write!(f, "Failed to parse CDX JSON: {}", msg),
        }
    }
}

impl std::error::Error for CdxParseError {}

/// A single row from a CDX JSON response with named field access.
#[derive(Debug, Clone)]
pub struct CdxRow {
    fields: HashMap<String, String>,
}

impl CdxRow {
    /// Get a field value by name. `"-"` is the CDX null marker.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|s| s.as_str())
            .filter(|s| *s != "-")
    }
}

/// Parse a CDX JSON response body into named-field rows.
///
/// With `output=json` the body is an array of string arrays whose first row
/// holds the field names.
pub fn parse_cdx_response(body: &str) -> Result<Vec<CdxRow>, CdxParseError> {
    if body.trim().is_empty() {
        return Err(CdxParseError::Empty);
    }

    let rows: Vec<Vec<String>> =
        serde_json::from_str(body).map_err(|e| CdxParseError::Json(e.to_string()))?;

    let headers = match rows.first() {
        Some(h) if !h.is_empty() => h.clone(),
        _ => return Ok(Vec::new()),
    };

    Ok(rows
        .into_iter()
        .skip(1)
        .map(|row| CdxRow {
            fields: headers.iter().cloned().zip(row).collect(),
        })
        .collect())
}

/// Capture timestamps from parsed rows. Entries that are not exactly 14
/// digits are skipped.
pub fn row_timestamps(rows: &[CdxRow]) -> Vec<Timestamp> {
    rows.iter()
        .filter_map(|row| row.get("timestamp"))
        .filter_map(|ts| Timestamp::parse(ts).ok())
        .collect()
}

/// Parse a CDX body straight to timestamps. An empty body means no captures.
pub fn parse_timestamps(body: &str) -> Result<Vec<Timestamp>, CdxParseError> {
    match parse_cdx_response(body) {
        Ok(rows) => Ok(row_timestamps(&rows)),
        Err(CdxParseError::Empty) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder_range() {
        let url = CdxQuery::captures_between(
            "https://web.archive.org/cdx/search/cdx",
            "https://example.com/",
            2010,
            2012,
        )
        .build();
        assert_eq!(
            url,
            "https://web.archive.org/cdx/search/cdx?url=https%3A%2F%2Fexample.com%2F\
             &output=json&fl=timestamp&filter=statuscode:200&from=2010&to=2012"
        );
    }

    #[test]
    fn query_builder_minimal() {
        let url = CdxQuery::new("https://cdx.test/cdx", "example.com").build();
        assert_eq!(url, "https://cdx.test/cdx?url=example.com&output=json");
    }

    #[test]
    fn parse_response_rows() {
        let body = r#"[["timestamp","statuscode"],["20200101000000","200"],["20200601000000","-"]]"#;
        let rows = parse_cdx_response(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("statuscode"), Some("200"));
        assert_eq!(rows[1].get("statuscode"), None);
        assert_eq!(rows[1].get("missing"), None);
    }

    #[test]
    fn parse_response_empty_body() {
        assert!(matches!(parse_cdx_response("  "), Err(CdxParseError::Empty)));
        assert!(parse_timestamps("").unwrap().is_empty());
    }

    #[test]
    fn parse_response_header_only() {
        assert!(parse_cdx_response(r#"[["timestamp"]]"#).unwrap().is_empty());
        assert!(parse_cdx_response("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_response_invalid_json() {
        assert!(matches!(parse_cdx_response("not json"), Err(CdxParseError::Json(_))));
        assert!(parse_timestamps("<html>").is_err());
    }

    #[test]
    fn timestamps_filtered_to_fourteen_digits() {
        let body = r#"[["timestamp"],["20200101000000"],["2020"],["2020010100000x"],["20210101000000"]]"#;
        let ts: Vec<String> = parse_timestamps(body)
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(ts, vec!["20200101000000", "20210101000000"]);
    }
}
