#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Place lookup pipeline.
//!
//! Chains resolve -> fetch -> normalize -> summarize for one place and one
//! source, and classifies the result into a [`LookupOutcome`]. Nothing
//! propagates as a fault: every failure mode is an outcome variant.
//!
//! Outcomes are memoized for a configurable time-to-live. Transient
//! failures (`Unreachable`) and configuration problems (`Misconfigured`)
//! are never cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use envwatch_analytics::summarize;
use envwatch_analytics_models::{GroupBy, SummaryResult};
use envwatch_place::config::ResolverConfig;
use envwatch_place::directory::{HttpPlaceDirectory, PlaceDirectory};
use envwatch_place::normalize::match_key;
use envwatch_place::{LocationResolver, PlaceError};
use envwatch_place_models::Place;
use envwatch_source::http::{HttpTransport, Transport};
use envwatch_source::normalize::normalize;
use envwatch_source::progress::ProgressCallback;
use envwatch_source::registry::{DEFAULT_SOURCE_ID, all_sources, find_source};
use envwatch_source::{
    Credentials, FetchOptions, FetchOutcome, FetchTarget, FetcherSettings, SourceError,
    SourceFetcher,
};
use envwatch_source_models::{DateRange, Record, SourceDescriptor};
use serde::Serialize;
use thiserror::Error;

/// Default lookback window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Default number of groups in the top-N ranking.
pub const DEFAULT_TOP_N: usize = 5;

/// Default cache time-to-live.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Errors building a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The place resolver could not be built.
    #[error(transparent)]
    Place(#[from] PlaceError),

    /// The source fetcher could not be built.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    /// Free-text place name.
    pub place: String,
    /// Source definition ID.
    pub source_id: String,
    /// Lookback window in days, ending today.
    pub days: u32,
    /// Keep only the first `limit` records, in provider order.
    pub limit: Option<usize>,
    /// Grouping for the summary.
    pub group_by: GroupBy,
    /// Number of groups in the top-N ranking.
    pub top_n: usize,
}

impl LookupRequest {
    /// A request for `place` with default options.
    #[must_use]
    pub fn new(place: impl Into<String>) -> Self {
        Self {
            place: place.into(),
            source_id: DEFAULT_SOURCE_ID.to_string(),
            days: DEFAULT_LOOKBACK_DAYS,
            limit: None,
            group_by: GroupBy::default(),
            top_n: DEFAULT_TOP_N,
        }
    }

    /// Sets the source.
    #[must_use]
    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey {
            place_key: match_key(&self.place),
            source_id: self.source_id.clone(),
            days: self.days,
            limit: self.limit,
            group_by: self.group_by,
            top_n: self.top_n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    place_key: String,
    source_id: String,
    days: u32,
    limit: Option<usize>,
    group_by: GroupBy,
    top_n: usize,
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// The resolved place.
    pub place: Place,
    /// Which partition and path produced the data.
    pub descriptor: SourceDescriptor,
    /// Normalized records in provider order.
    pub records: Vec<Record>,
    /// Aggregate view of `records`.
    pub summary: SummaryResult,
}

/// Result of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Unknown source or missing credential. Decided before any request.
    Misconfigured {
        /// What is wrong.
        message: String,
    },
    /// The place text did not resolve.
    NotFound {
        /// The place text as given.
        query: String,
    },
    /// Every fetch attempt failed with a transport, status or shape error.
    Unreachable {
        /// The resolved place.
        place: Place,
        /// Number of attempts made.
        attempts: usize,
    },
    /// The source answered, but with no entries or with none that
    /// survived normalization.
    NoData {
        /// The resolved place.
        place: Place,
        /// Which partition and path answered.
        descriptor: SourceDescriptor,
    },
    /// Records were found and summarized.
    Ready(Report),
}

impl LookupOutcome {
    const fn is_cacheable(&self) -> bool {
        !matches!(self, Self::Misconfigured { .. } | Self::Unreachable { .. })
    }
}

/// Result of a connectivity self-test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfTestReport {
    /// Source that was checked.
    pub source_id: String,
    /// Number of attempts made.
    pub attempts: usize,
    /// Records normalized from the payload; `0` if nothing came back.
    pub records: usize,
    /// Which partition and path answered, if any.
    pub descriptor: Option<SourceDescriptor>,
}

impl SelfTestReport {
    /// Whether the source returned usable data.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.records > 0
    }
}

struct CacheEntry {
    stored_at: Instant,
    outcome: LookupOutcome,
}

/// Resolve -> fetch -> normalize -> summarize, with a time-boxed cache.
pub struct Pipeline<D = HttpPlaceDirectory, T = HttpTransport> {
    resolver: LocationResolver<D>,
    fetcher: SourceFetcher<T>,
    ttl: Duration,
    cache: HashMap<CacheKey, CacheEntry>,
}

impl Pipeline<HttpPlaceDirectory, HttpTransport> {
    /// Builds a pipeline from the embedded configuration, reading
    /// credentials from the environment. Fetch attempts are reported to
    /// `progress`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if an HTTP client cannot be built.
    pub fn from_env(progress: Arc<dyn ProgressCallback>) -> Result<Self, PipelineError> {
        let resolver = LocationResolver::from_config(ResolverConfig::embedded())?;
        let credentials = Credentials::from_env(&all_sources());
        let fetcher = SourceFetcher::http(FetcherSettings::embedded(), credentials)?
            .with_progress(progress);
        Ok(Self::new(resolver, fetcher))
    }
}

impl<D: PlaceDirectory, T: Transport> Pipeline<D, T> {
    /// Assembles a pipeline from its stages.
    #[must_use]
    pub fn new(resolver: LocationResolver<D>, fetcher: SourceFetcher<T>) -> Self {
        Self {
            resolver,
            fetcher,
            ttl: DEFAULT_CACHE_TTL,
            cache: HashMap::new(),
        }
    }

    /// Sets the cache time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The place resolver.
    #[must_use]
    pub const fn resolver(&self) -> &LocationResolver<D> {
        &self.resolver
    }

    /// The source fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &SourceFetcher<T> {
        &self.fetcher
    }

    /// Drops every cached outcome.
    pub fn invalidate(&mut self) {
        log::debug!("Dropping {} cached lookup(s)", self.cache.len());
        self.cache.clear();
    }

    /// Looks up `request`, serving a cached outcome when one is fresh.
    pub async fn lookup(&mut self, request: &LookupRequest) -> LookupOutcome {
        let key = request.cache_key();
        if let Some(entry) = self.cache.get(&key) {
            if entry.stored_at.elapsed() < self.ttl {
                log::info!(
                    "Serving cached {} lookup for '{}'",
                    request.source_id,
                    request.place.trim()
                );
                return entry.outcome.clone();
            }
            self.cache.remove(&key);
        }

        let outcome = self.run(request).await;
        if outcome.is_cacheable() {
            let ttl = self.ttl;
            self.cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
            self.cache.insert(
                key,
                CacheEntry {
                    stored_at: Instant::now(),
                    outcome: outcome.clone(),
                },
            );
        }
        outcome
    }

    async fn run(&self, request: &LookupRequest) -> LookupOutcome {
        let source = match find_source(&request.source_id) {
            Ok(source) => source,
            Err(e) => return LookupOutcome::Misconfigured { message: e.to_string() },
        };
        if let Err(e) = self.fetcher.check_configuration(&source) {
            log::warn!("{e}");
            return LookupOutcome::Misconfigured { message: e.to_string() };
        }

        let place = match self.resolver.resolve(&request.place).await {
            Ok(place) => place,
            Err(e) => {
                log::info!("{e}");
                return LookupOutcome::NotFound {
                    query: request.place.trim().to_string(),
                };
            }
        };
        log::info!(
            "Resolved '{}' to {} ({})",
            place.query_text,
            place.canonical_name,
            place.resolved_id
        );

        let place = if source.requires_coordinates {
            self.resolver.ensure_coordinates(place).await
        } else {
            place
        };

        let options = FetchOptions {
            date_range: Some(DateRange::lookback_from_today(request.days)),
            limit: request.limit.and_then(|l| u64::try_from(l).ok()),
        };
        let fetched = self
            .fetcher
            .fetch(&source, &FetchTarget::for_place(&place), &options)
            .await;

        let (payload, descriptor) = match fetched {
            Ok(FetchOutcome::Found {
                payload,
                descriptor,
            }) => (payload, descriptor),
            Ok(FetchOutcome::Empty {
                answered: Some(descriptor),
                ..
            }) => {
                log::info!("{} has no records for {}", source.id, place.canonical_name);
                return LookupOutcome::NoData { place, descriptor };
            }
            Ok(FetchOutcome::Empty {
                attempts,
                answered: None,
            }) => {
                return LookupOutcome::Unreachable { place, attempts };
            }
            Err(e) => return LookupOutcome::Misconfigured { message: e.to_string() },
        };

        let mut records = normalize(&payload, &source);
        if let Some(limit) = request.limit {
            records.truncate(limit);
        }
        if records.is_empty() {
            log::warn!(
                "{} answered for {} but no record could be normalized",
                source.id,
                place.canonical_name
            );
            return LookupOutcome::NoData { place, descriptor };
        }

        let summary = summarize(&records, request.group_by, request.top_n);
        log::info!(
            "{}: {} record(s), total {:.2} {}",
            place.canonical_name,
            summary.total_count,
            summary.total_magnitude,
            source.kind.unit()
        );

        LookupOutcome::Ready(Report {
            place,
            descriptor,
            records,
            summary,
        })
    }

    /// Fetches the most recent records of `source_id` without a place
    /// filter, to check that the provider is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] for an unknown source or a configuration
    /// problem. Network failures are reported through the returned
    /// [`SelfTestReport`].
    pub async fn self_test(
        &self,
        source_id: &str,
        limit: u64,
    ) -> Result<SelfTestReport, SourceError> {
        let source = find_source(source_id)?;
        let report = match self.fetcher.fetch_recent_global(&source, limit).await? {
            FetchOutcome::Found {
                payload,
                descriptor,
            } => SelfTestReport {
                source_id: source.id.clone(),
                attempts: descriptor.attempts,
                records: normalize(&payload, &source).len(),
                descriptor: Some(descriptor),
            },
            FetchOutcome::Empty { attempts, answered } => SelfTestReport {
                source_id: source.id.clone(),
                attempts,
                records: 0,
                descriptor: answered,
            },
        };
        log::info!(
            "Self-test {}: {} record(s) after {} attempt(s)",
            report.source_id,
            report.records,
            report.attempts
        );
        Ok(report)
    }
}
