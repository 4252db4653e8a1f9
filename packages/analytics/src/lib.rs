#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation over normalized records.
//!
//! Everything here is pure and deterministic: the same records in the same
//! order always produce the same [`SummaryResult`].

pub mod air_quality;
pub mod summary;

pub use air_quality::{classify_air_quality, pm25_danger_ratio};
pub use envwatch_analytics_models as models;
pub use envwatch_analytics_models::{GroupBy, SummaryResult};
pub use summary::summarize;
