//! Wasteback - historical web page composition from public web archives.
//!
//! Resolves the archived snapshot of a page nearest a requested date,
//! discovers every sub-resource the snapshot referenced, measures each one,
//! and folds the results into a per-category size report.

pub mod aggregate;
pub mod archives;
pub mod cdx;
pub mod classify;
pub mod clean;
pub mod config;
pub mod discovery;
pub mod emissions;
pub mod http_client;
pub mod memento;
pub mod pipeline;
pub mod report;
pub mod timestamp;

pub use archives::{ArchiveProfile, ArchiveRegistry, CleaningRule, RegistryError, ResolutionMode};
pub use classify::{classify, Category};
pub use config::{Config, Settings};
pub use emissions::{EmissionsModel, PerByteModel};
pub use http_client::{FetchError, FetchOptions, FetchedResponse, Fetcher, HttpClient, RetryPolicy};
pub use pipeline::{ErrorKind, MeasureOptions, MeasureRequest, Wasteback, WastebackError};
pub use report::{Completeness, CompositionReport, ResourceResult, SizeEntry, SizeTable};
pub use timestamp::Timestamp;
