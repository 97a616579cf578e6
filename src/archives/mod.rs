//! Web archive profiles and the registry that looks them up.
//!
//! A profile is plain data: endpoint templates, the timegate, the paths an
//! archive injects into replayed pages, and the rules that strip archive
//! banners from replayed code. Pipeline stages borrow profiles from the
//! registry; nothing here performs I/O.

mod builtin;

pub use builtin::builtin_profiles;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timestamp::Timestamp;

/// Identifier of the archive used when none is given.
pub const DEFAULT_ARCHIVE_ID: &str = "ia";

/// Earliest year any archive holds captures for.
pub const DEFAULT_EARLIEST_YEAR: i32 = 1995;

const DATETIME_PLACEHOLDER: &str = "{datetime}";
const URL_PLACEHOLDER: &str = "{url}";

/// Errors from registry construction and lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid or unsupported archive: {0}")]
    NotSupported(String),

    #[error("Duplicate archive id: {0}")]
    Duplicate(String),

    #[error("Archive '{id}' is missing its {field}")]
    Incomplete { id: String, field: &'static str },
}

/// How an archive exposes its list of captures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Memento timegate: one `Accept-Datetime` negotiation per year.
    #[default]
    Timegate,
    /// CDX index: one range query returning every capture timestamp.
    CdxIndex { cdx_url: String },
}

/// Start and end patterns delimiting an archive-injected banner.
///
/// Both are regular expression fragments; the banner is everything from a
/// `start` match up to the nearest following `end` match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub start: String,
    pub end: String,
}

impl Delimiters {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// One step of an archive's text-cleaning recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningRule {
    /// Strip every `/* ... */` block comment.
    #[serde(default)]
    pub remove_comments: bool,
    /// Strip every banner delimited by these patterns.
    #[serde(default)]
    pub remove_between: Vec<Delimiters>,
}

impl CleaningRule {
    pub fn remove_comments() -> Self {
        Self {
            remove_comments: true,
            remove_between: Vec::new(),
        }
    }

    pub fn remove_between(delimiters: Vec<Delimiters>) -> Self {
        Self {
            remove_comments: false,
            remove_between: delimiters,
        }
    }
}

/// Static description of one web archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProfile {
    /// Short lower-case identifier (`ia`, `ukwa`, ...).
    pub id: String,
    /// Human-readable archive name.
    pub name: String,
    /// Organisation operating the archive.
    pub organisation: String,
    /// Public website of the archive.
    pub website: String,
    /// Timegate prefix; the target URL is appended.
    pub timegate: String,
    /// Template for the unmodified capture (`id_` replay).
    pub raw_endpoint: String,
    /// Template for the toolbar-free replay used for DOM traversal.
    pub frame_endpoint: String,
    /// Substrings identifying archive-injected resources.
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Ordered cleaning recipe for scripts and stylesheets.
    #[serde(default)]
    pub cleaning_rules: Vec<CleaningRule>,
    #[serde(default)]
    pub resolution: ResolutionMode,
    #[serde(default = "default_earliest_year")]
    pub earliest_year: i32,
}

fn default_earliest_year() -> i32 {
    DEFAULT_EARLIEST_YEAR
}

fn render(template: &str, timestamp: &Timestamp, url: &str) -> String {
    template
        .replace(DATETIME_PLACEHOLDER, timestamp.as_str())
        .replace(URL_PLACEHOLDER, url)
}

impl ArchiveProfile {
    /// URL of the unmodified captured bytes.
    pub fn raw_url(&self, timestamp: &Timestamp, url: &str) -> String {
        render(&self.raw_endpoint, timestamp, url)
    }

    /// URL of the replay-safe rendering (also the user-facing memento URL).
    pub fn frame_url(&self, timestamp: &Timestamp, url: &str) -> String {
        render(&self.frame_endpoint, timestamp, url)
    }

    pub fn timegate_url(&self, url: &str) -> String {
        format!("{}{}", self.timegate, url)
    }

    /// Whether a raw attribute value points at an archive-injected path.
    pub fn is_excluded(&self, value: &str) -> bool {
        self.excluded_paths.iter().any(|p| value.contains(p.as_str()))
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let checks: [(&str, &'static str); 4] = [
            (&self.id, "id"),
            (&self.timegate, "timegate"),
            (&self.raw_endpoint, "raw endpoint"),
            (&self.frame_endpoint, "frame endpoint"),
        ];
        for (value, field) in checks {
            if value.trim().is_empty() {
                return Err(RegistryError::Incomplete {
                    id: self.id.clone(),
                    field,
                });
            }
        }
        Ok(())
    }
}

/// Read-only lookup of archive profiles by id.
#[derive(Debug, Clone)]
pub struct ArchiveRegistry {
    profiles: BTreeMap<String, ArchiveProfile>,
}

impl Default for ArchiveRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ArchiveRegistry {
    /// Build a registry from a list of profiles. Ids must be unique.
    pub fn with_profiles(profiles: Vec<ArchiveProfile>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for mut profile in profiles {
            profile.validate()?;
            profile.id = profile.id.to_lowercase();
            if map.contains_key(&profile.id) {
                return Err(RegistryError::Duplicate(profile.id));
            }
            map.insert(profile.id.clone(), profile);
        }
        Ok(Self { profiles: map })
    }

    /// Registry holding every built-in archive.
    pub fn with_defaults() -> Self {
        let profiles = builtin_profiles()
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { profiles }
    }

    /// Add or replace profiles. A profile whose id already exists replaces it.
    pub fn merge(&mut self, profiles: Vec<ArchiveProfile>) -> Result<(), RegistryError> {
        for mut profile in profiles {
            profile.validate()?;
            profile.id = profile.id.to_lowercase();
            if self.profiles.contains_key(&profile.id) {
                tracing::debug!("Archive profile '{}' overridden by configuration", profile.id);
            }
            self.profiles.insert(profile.id.clone(), profile);
        }
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn get(&self, id: &str) -> Result<&ArchiveProfile, RegistryError> {
        self.profiles
            .get(&id.trim().to_lowercase())
            .ok_or_else(|| RegistryError::NotSupported(id.to_string()))
    }

    /// All `(id, name)` pairs, sorted by id.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.profiles
            .values()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
