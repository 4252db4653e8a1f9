//! Partition × network-path traversal.
//!
//! A fetch is planned up front, without touching the network: one
//! [`Attempt`] per `(partition, path)` pair, partition-major. Attempts are
//! then sent strictly one after another, each bounded by the configured
//! timeout, until one returns a payload with at least one candidate entry.
//! Failures are logged and never retried.
//!
//! A well-formed payload with zero entries does not stop the traversal,
//! but it is remembered: if nothing better turns up, the fetch ends as an
//! answered [`FetchOutcome::Empty`] rather than an unreachable one.

use std::sync::Arc;

use envwatch_source_models::{SourceDescriptor, SourceQuery};

use crate::credentials::Credentials;
use crate::http::{AttemptRequest, HttpTransport, Transport};
use crate::normalize::decode;
use crate::progress::{ProgressCallback, null_progress};
use crate::settings::{FetcherSettings, NetworkPath};
use crate::source_def::SourceDefinition;
use crate::template::{self, TemplateContext};
use crate::{FetchOptions, FetchTarget, SourceError};

/// One planned `(partition, path)` request.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// What the attempt asks for.
    pub query: SourceQuery,
    /// Network path identifier.
    pub path_id: String,
    /// The request to send.
    pub request: AttemptRequest,
}

/// Result of a traversal.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The first attempt that produced a non-empty payload.
    Found {
        /// Raw payload as returned by the provider.
        payload: serde_json::Value,
        /// Which partition and path produced it.
        descriptor: SourceDescriptor,
    },
    /// Every attempt failed or came back empty.
    Empty {
        /// Number of attempts made.
        attempts: usize,
        /// The first attempt that answered with a well-formed payload
        /// holding zero entries; `None` when every attempt errored.
        answered: Option<SourceDescriptor>,
    },
}

impl FetchOutcome {
    /// Whether the provider was never reached.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Empty { answered: None, .. })
    }
}

/// Fetches raw payloads for a [`SourceDefinition`].
pub struct SourceFetcher<T = HttpTransport> {
    transport: T,
    settings: FetcherSettings,
    credentials: Credentials,
    progress: Arc<dyn ProgressCallback>,
}

impl SourceFetcher<HttpTransport> {
    /// Creates a fetcher backed by `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn http(settings: FetcherSettings, credentials: Credentials) -> Result<Self, SourceError> {
        Ok(Self::new(HttpTransport::new()?, settings, credentials))
    }
}

impl<T: Transport> SourceFetcher<T> {
    /// Creates a fetcher over an arbitrary transport.
    #[must_use]
    pub fn new(transport: T, settings: FetcherSettings, credentials: Credentials) -> Self {
        Self {
            transport,
            settings,
            credentials,
            progress: null_progress(),
        }
    }

    /// Reports attempt progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The settings this fetcher was built with.
    #[must_use]
    pub const fn settings(&self) -> &FetcherSettings {
        &self.settings
    }

    /// Verifies everything a fetch needs that does not require the network.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] if a required credential is
    /// missing or no usable network path is configured.
    pub fn check_configuration(&self, source: &SourceDefinition) -> Result<(), SourceError> {
        if let Some(credential) = &source.credential
            && self.credentials.get(&credential.env).is_none()
        {
            return Err(SourceError::Configuration {
                message: format!(
                    "{} requires a credential: set {}",
                    source.id, credential.env
                ),
            });
        }

        if self.paths_for(source).is_empty() {
            return Err(SourceError::Configuration {
                message: format!("no usable network path configured for {}", source.id),
            });
        }

        Ok(())
    }

    fn paths_for(&self, source: &SourceDefinition) -> Vec<&NetworkPath> {
        let relays = source.allows_relays();
        self.settings
            .paths
            .iter()
            .filter(|path| relays || path.is_direct())
            .collect()
    }

    /// Plans every attempt of a fetch, partition-major.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Configuration`] from
    /// [`check_configuration`](Self::check_configuration) and
    /// [`SourceError::Template`] when the URL or a parameter cannot be
    /// built.
    pub fn plan(
        &self,
        source: &SourceDefinition,
        target: &FetchTarget,
        options: &FetchOptions,
    ) -> Result<Vec<Attempt>, SourceError> {
        self.check_configuration(source)?;
        let paths = self.paths_for(source);
        let global = target.place_id.is_none();
        let mut attempts = Vec::new();

        for partition in source.partition_hints() {
            let ctx = TemplateContext {
                place_id: target.place_id.as_deref(),
                coordinates: target.coordinates,
                partition,
                date_range: options.date_range,
                limit: options.limit,
                global,
            };
            let target_url = self.build_url(source, &ctx)?;
            let headers = self.build_headers(source);
            let query = SourceQuery {
                place_id: target.place_id.clone(),
                source_name: source.id.clone(),
                partition_hint: partition.map(String::from),
                date_range: options.date_range,
            };

            for path in &paths {
                attempts.push(Attempt {
                    query: query.clone(),
                    path_id: path.id().to_string(),
                    request: AttemptRequest {
                        url: path.route_url(target_url.as_str()),
                        headers: headers.clone(),
                        proxy: path.proxy().map(String::from),
                        timeout: self.settings.timeout(),
                        label: format!(
                            "{}[{}] via {}",
                            source.id,
                            partition.unwrap_or("-"),
                            path.id()
                        ),
                    },
                });
            }
        }

        Ok(attempts)
    }

    fn build_url(
        &self,
        source: &SourceDefinition,
        ctx: &TemplateContext<'_>,
    ) -> Result<reqwest::Url, SourceError> {
        let base = template::render(&source.url, ctx)?.ok_or_else(|| SourceError::Template {
            message: format!("{}: endpoint URL cannot depend on optional values", source.id),
        })?;

        let mut params = std::collections::BTreeMap::new();
        for (name, value) in &source.query {
            if let Some(rendered) = template::render(value, ctx)? {
                params.insert(name.clone(), rendered);
            }
        }
        if ctx.global {
            for (name, value) in &source.global_query {
                if let Some(rendered) = template::render(value, ctx)? {
                    params.insert(name.clone(), rendered);
                }
            }
        }

        if let Some(credential) = &source.credential
            && let Some(param) = &credential.query_param
            && let Some(secret) = self.credentials.get(&credential.env)
        {
            params.insert(param.clone(), secret.to_string());
        }

        let url = if params.is_empty() {
            reqwest::Url::parse(&base)
        } else {
            reqwest::Url::parse_with_params(&base, &params)
        };
        url.map_err(|e| SourceError::Template {
            message: format!("{}: invalid endpoint URL '{base}': {e}", source.id),
        })
    }

    fn build_headers(&self, source: &SourceDefinition) -> Vec<(String, String)> {
        let mut headers = vec![("User-Agent".to_string(), self.settings.user_agent.clone())];
        headers.extend(source.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(credential) = &source.credential
            && let Some(header) = &credential.header
            && let Some(secret) = self.credentials.get(&credential.env)
        {
            headers.push((header.clone(), secret.to_string()));
        }

        headers
    }

    /// Fetches the first non-empty payload for `target`.
    ///
    /// # Errors
    ///
    /// Returns configuration and template errors before any request is
    /// sent. Network failures never surface as errors: they end in
    /// [`FetchOutcome::Empty`] once every attempt is exhausted.
    pub async fn fetch(
        &self,
        source: &SourceDefinition,
        target: &FetchTarget,
        options: &FetchOptions,
    ) -> Result<FetchOutcome, SourceError> {
        let attempts = self.plan(source, target, options)?;
        let total = attempts.len();

        log::info!(
            "{}: fetching {} ({total} attempt(s) planned)",
            source.id,
            target.place_id.as_deref().unwrap_or("recent global data")
        );
        self.progress.set_total(total as u64);
        let mut answered = None;

        for (index, attempt) in attempts.into_iter().enumerate() {
            let label = &attempt.request.label;
            self.progress.set_message(label.clone());
            log::debug!("Attempt {}/{total}: {label}", index + 1);

            let result = self.transport.get_json(&attempt.request).await;
            self.progress.inc(1);

            let payload = match result {
                Ok(payload) => payload,
                Err(e) => {
                    log::warn!("{label}: {e}");
                    continue;
                }
            };
            let candidates = decode(&payload, &source.shape).map(|decoded| decoded.len());
            let descriptor = SourceDescriptor {
                source_id: source.id.clone(),
                kind: source.kind,
                partition: attempt.query.partition_hint,
                path_id: attempt.path_id,
                attempts: index + 1,
            };

            match candidates {
                Some(0) => {
                    log::debug!("{label}: answered with no entries");
                    answered.get_or_insert(descriptor);
                }
                Some(candidates) => {
                    log::info!("{label}: {candidates} candidate entries");
                    self.progress.finish_and_clear();
                    return Ok(FetchOutcome::Found {
                        payload,
                        descriptor,
                    });
                }
                None => log::warn!("{label}: payload does not have the declared shape"),
            }
        }

        self.progress.finish_and_clear();
        if answered.is_some() {
            log::info!("{}: no entries in any of {total} attempt(s)", source.id);
        } else {
            log::warn!("{}: all {total} attempt(s) failed", source.id);
        }
        Ok(FetchOutcome::Empty {
            attempts: total,
            answered,
        })
    }

    /// Fetches the most recent records of `source` without a place filter.
    /// Used as a connectivity check.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch).
    pub async fn fetch_recent_global(
        &self,
        source: &SourceDefinition,
        limit: u64,
    ) -> Result<FetchOutcome, SourceError> {
        let options = FetchOptions {
            date_range: None,
            limit: Some(limit),
        };
        self.fetch(source, &FetchTarget::global(), &options).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use envwatch_place_models::GeoPoint;
    use envwatch_source_models::DateRange;
    use serde_json::json;

    use super::*;
    use crate::registry::find_source;
    use crate::source_def::parse_source_toml;

    /// Replays scripted responses and records every request.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<serde_json::Value, u16>>>,
        calls: AtomicUsize,
        seen: Mutex<Vec<AttemptRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<serde_json::Value, u16>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self::new(Vec::new())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn labels(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.label.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get_json(
            &self,
            request: &AttemptRequest,
        ) -> Result<serde_json::Value, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(body)) => Ok(body),
                other => Err(SourceError::Status {
                    status: other.and_then(Result::err).unwrap_or(503),
                    label: request.label.clone(),
                }),
            }
        }
    }

    fn three_paths() -> FetcherSettings {
        toml::de::from_str(
            r#"
            timeout_secs = 5
            user_agent = "test-agent"

            [[paths]]
            type = "direct"
            id = "direct"

            [[paths]]
            type = "url_prefix"
            id = "relay-a"
            prefix = "https://relay-a.example/?"
            encode = true

            [[paths]]
            type = "url_prefix"
            id = "relay-b"
            prefix = "https://relay-b.example/?quest="
            "#,
        )
        .unwrap()
    }

    fn march() -> FetchOptions {
        FetchOptions {
            date_range: Some(DateRange {
                start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            }),
            limit: None,
        }
    }

    fn altamira() -> FetchTarget {
        FetchTarget {
            place_id: Some("1500602".to_string()),
            coordinates: GeoPoint::new(-3.2033, -52.2064),
        }
    }

    fn deter_feature() -> serde_json::Value {
        json!({"features": [{"properties": {"view_date": "2024-03-02", "areamunkm": 0.1}}]})
    }

    #[tokio::test]
    async fn exhausts_every_partition_and_path() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default(),
        );

        let outcome = fetcher.fetch(&source, &altamira(), &march()).await.unwrap();

        assert!(matches!(
            outcome,
            FetchOutcome::Empty {
                attempts: 6,
                answered: None
            }
        ));
        assert_eq!(fetcher.transport.calls(), 6);
        assert_eq!(
            fetcher.transport.labels(),
            vec![
                "terrabrasilis_deter[deter-amz] via direct",
                "terrabrasilis_deter[deter-amz] via relay-a",
                "terrabrasilis_deter[deter-amz] via relay-b",
                "terrabrasilis_deter[deter-cerrado] via direct",
                "terrabrasilis_deter[deter-cerrado] via relay-a",
                "terrabrasilis_deter[deter-cerrado] via relay-b",
            ]
        );
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let transport =
            ScriptedTransport::new(vec![Err(500), Err(403), Err(502), Ok(deter_feature())]);
        let fetcher = SourceFetcher::new(transport, three_paths(), Credentials::default());

        let outcome = fetcher.fetch(&source, &altamira(), &march()).await.unwrap();

        let FetchOutcome::Found { descriptor, .. } = outcome else {
            panic!("expected a payload");
        };
        assert_eq!(descriptor.partition.as_deref(), Some("deter-cerrado"));
        assert_eq!(descriptor.path_id, "direct");
        assert_eq!(descriptor.attempts, 4);
        assert_eq!(fetcher.transport.calls(), 4);
    }

    #[tokio::test]
    async fn empty_payload_counts_as_failure() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let transport = ScriptedTransport::new(vec![
            Ok(json!({"features": []})),
            Ok(json!({"unexpected": true})),
            Ok(deter_feature()),
        ]);
        let fetcher = SourceFetcher::new(transport, three_paths(), Credentials::default());

        let outcome = fetcher.fetch(&source, &altamira(), &march()).await.unwrap();

        let FetchOutcome::Found { descriptor, .. } = outcome else {
            panic!("expected a payload");
        };
        assert_eq!(descriptor.path_id, "relay-b");
        assert_eq!(fetcher.transport.calls(), 3);
    }

    #[tokio::test]
    async fn answered_but_empty_is_not_unreachable() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let transport = ScriptedTransport::new(vec![
            Err(502),
            Ok(json!({"unexpected": true})),
            Ok(json!({"features": []})),
            Ok(json!({"features": []})),
        ]);
        let fetcher = SourceFetcher::new(transport, three_paths(), Credentials::default());

        let outcome = fetcher.fetch(&source, &altamira(), &march()).await.unwrap();

        assert!(!outcome.is_unreachable());
        let FetchOutcome::Empty {
            attempts,
            answered: Some(descriptor),
        } = outcome
        else {
            panic!("expected an answered empty outcome");
        };
        assert_eq!(attempts, 6);
        assert_eq!(descriptor.partition.as_deref(), Some("deter-amz"));
        assert_eq!(descriptor.path_id, "relay-b");
        assert_eq!(descriptor.attempts, 3);
        assert_eq!(fetcher.transport.calls(), 6);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let source = find_source("gfw_integrated_alerts").unwrap();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default(),
        );

        let result = fetcher.fetch(&source, &altamira(), &march()).await;

        assert!(matches!(result, Err(SourceError::Configuration { .. })));
        assert_eq!(fetcher.transport.calls(), 0);
    }

    #[test]
    fn credentialed_sources_only_go_direct() {
        let source = find_source("gfw_integrated_alerts").unwrap();
        let env = source.credential.as_ref().unwrap().env.clone();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default().with(&env, "secret-key"),
        );

        let attempts = fetcher.plan(&source, &altamira(), &march()).unwrap();

        assert!(!attempts.is_empty());
        assert!(attempts.iter().all(|a| a.path_id == "direct"));
        assert!(attempts.iter().all(|a| !a.request.label.contains("secret-key")));
    }

    #[test]
    fn query_credential_lands_in_url_not_label() {
        let source = find_source("openweather_air").unwrap();
        let env = source.credential.as_ref().unwrap().env.clone();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default().with(&env, "k3y"),
        );

        let attempts = fetcher.plan(&source, &altamira(), &FetchOptions::default()).unwrap();

        assert_eq!(attempts.len(), 1);
        let request = &attempts[0].request;
        assert!(request.url.contains("appid=k3y"));
        assert!(request.url.contains("lat=-3.2033"));
        assert!(!request.label.contains("k3y"));
    }

    #[test]
    fn coordinates_are_required_for_place_scoped_air_quality() {
        let source = find_source("openweather_air").unwrap();
        let env = source.credential.as_ref().unwrap().env.clone();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default().with(&env, "k3y"),
        );
        let target = FetchTarget {
            place_id: Some("1500602".to_string()),
            coordinates: None,
        };

        let result = fetcher.plan(&source, &target, &FetchOptions::default());

        assert!(matches!(result, Err(SourceError::Template { .. })));
    }

    #[test]
    fn global_plan_drops_place_filter() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default(),
        );
        let options = FetchOptions {
            date_range: None,
            limit: Some(5),
        };

        let attempts = fetcher.plan(&source, &FetchTarget::global(), &options).unwrap();

        let direct = &attempts[0].request.url;
        assert!(direct.starts_with("https://terrabrasilis.dpi.inpe.br/geoserver/deter-amz/"));
        assert!(!direct.contains("CQL_FILTER"));
        assert!(direct.contains("count=5"));
        assert!(direct.contains("sortBy="));
        assert!(attempts[0].query.place_id.is_none());
    }

    #[test]
    fn global_plan_uses_fixed_coordinates_and_keeps_credential() {
        let source = find_source("openweather_air").unwrap();
        let env = source.credential.as_ref().unwrap().env.clone();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default().with(&env, "k3y"),
        );

        let attempts = fetcher
            .plan(&source, &FetchTarget::global(), &FetchOptions::default())
            .unwrap();

        assert_eq!(attempts.len(), 1);
        let url = &attempts[0].request.url;
        assert!(url.contains("lat=-3.4653&lon=-62.2159"), "{url}");
        assert!(url.contains("appid=k3y"));
    }

    #[test]
    fn global_query_replaces_same_named_parameter() {
        let source = parse_source_toml(
            r#"
            id = "demo"
            name = "Demo"
            kind = "fire_hotspot"
            url = "https://example.org/data"

            [query]
            order = "name"
            place = "{place_id}"

            [global_query]
            order = "date_desc"

            [shape]
            type = "flat_list"
            "#,
        )
        .unwrap();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default(),
        );

        let global = fetcher
            .plan(&source, &FetchTarget::global(), &FetchOptions::default())
            .unwrap();
        let scoped = fetcher
            .plan(&source, &altamira(), &FetchOptions::default())
            .unwrap();

        assert_eq!(global[0].request.url, "https://example.org/data?order=date_desc");
        assert_eq!(
            scoped[0].request.url,
            "https://example.org/data?order=name&place=1500602"
        );
    }

    #[test]
    fn relay_paths_wrap_the_target_url() {
        let source = find_source("terrabrasilis_deter").unwrap();
        let fetcher = SourceFetcher::new(
            ScriptedTransport::failing(),
            three_paths(),
            Credentials::default(),
        );

        let attempts = fetcher.plan(&source, &altamira(), &march()).unwrap();

        assert!(attempts[1].request.url.starts_with("https://relay-a.example/?https%3A%2F%2F"));
        assert!(
            attempts[2]
                .request
                .url
                .starts_with("https://relay-b.example/?quest=https://terrabrasilis")
        );
        assert!(attempts.iter().all(|a| a.request.headers[0].1 == "test-agent"));
    }

    #[test]
    fn no_usable_path_is_a_configuration_error() {
        let source = parse_source_toml(
            r#"
            id = "demo"
            name = "Demo"
            kind = "fire_hotspot"
            url = "https://example.org/data"
            direct_only = true

            [shape]
            type = "flat_list"
            "#,
        )
        .unwrap();
        let mut settings = three_paths();
        settings.paths.retain(|p| !p.is_direct());
        let fetcher = SourceFetcher::new(ScriptedTransport::failing(), settings, Credentials::default());

        assert!(matches!(
            fetcher.check_configuration(&source),
            Err(SourceError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn recent_global_fetch_sends_limit() {
        let source = find_source("inpe_queimadas").unwrap();
        let transport = ScriptedTransport::new(vec![Ok(json!([
            {"data_hora_gmt": "2024-08-10 17:20:00", "latitude": -7.1, "longitude": -64.5}
        ]))]);
        let fetcher = SourceFetcher::new(transport, three_paths(), Credentials::default());

        let outcome = fetcher.fetch_recent_global(&source, 3).await.unwrap();

        assert!(matches!(outcome, FetchOutcome::Found { .. }));
        assert_eq!(fetcher.transport.calls(), 1);
    }
}
