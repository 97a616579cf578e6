//! Composition report data model.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::classify::Category;
use crate::timestamp::Timestamp;

/// Bytes and resource count for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SizeEntry {
    pub bytes: u64,
    pub count: u64,
}

impl SizeEntry {
    fn add(&mut self, bytes: u64) {
        self.bytes += bytes;
        self.count += 1;
    }
}

/// Per-category sizes plus a running total.
///
/// Every addition updates both its category and the total, so the total
/// always equals the sum of the categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeTable {
    categories: [SizeEntry; Category::ALL.len()],
    total: SizeEntry,
}

fn index(category: Category) -> usize {
    Category::ALL
        .iter()
        .position(|c| *c == category)
        .unwrap_or(Category::ALL.len() - 1)
}

impl SizeTable {
    /// A table holding only the page's own HTML document.
    pub fn seeded(html_bytes: u64) -> Self {
        let mut table = Self::default();
        table.add(Category::Html, html_bytes);
        table
    }

    /// Count one resource of `bytes` under `category`.
    pub fn add(&mut self, category: Category, bytes: u64) {
        self.categories[index(category)].add(bytes);
        self.total.add(bytes);
    }

    pub fn get(&self, category: Category) -> SizeEntry {
        self.categories[index(category)]
    }

    pub fn total(&self) -> SizeEntry {
        self.total
    }

    /// Categories with at least one resource, in report order.
    pub fn non_empty(&self) -> impl Iterator<Item = (Category, SizeEntry)> + '_ {
        Category::ALL
            .iter()
            .map(|c| (*c, self.get(*c)))
            .filter(|(_, e)| e.count > 0)
    }
}

impl Serialize for SizeTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len() + 1))?;
        for category in Category::ALL {
            map.serialize_entry(category.as_str(), &self.get(category))?;
        }
        map.serialize_entry("total", &self.total)?;
        map.end()
    }
}

/// Share of discovered references that were measured, 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Completeness(u8);

impl Completeness {
    /// `round(succeeded / discovered * 100)`; 100 when nothing was discovered.
    pub fn from_counts(succeeded: usize, discovered: usize) -> Self {
        if discovered == 0 {
            return Self(100);
        }
        let ratio = succeeded.min(discovered) as f64 / discovered as f64;
        Self((ratio * 100.0).round() as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Serialize for Completeness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Measurement of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResult {
    pub url: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub size: u64,
    pub fetch_succeeded: bool,
}

impl ResourceResult {
    /// A resource that could not be fetched: zero bytes, `other`.
    pub fn failed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            category: Category::Other,
            size: 0,
            fetch_succeeded: false,
        }
    }
}

/// Terminal output of one measurement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionReport {
    /// The page URL as measured.
    pub url: String,
    pub requested_memento: Timestamp,
    /// The capture actually measured.
    pub memento: Timestamp,
    pub memento_url: String,
    /// Archive display name.
    pub archive: String,
    pub archive_org: String,
    pub archive_url: String,
    pub sizes: SizeTable,
    pub completeness: Completeness,
    pub malformed_references: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<ResourceResult>>,
}
