//! Request dispatch: preflight, validation, cache, upstream.

use std::time::Instant;

use edge_sdk::edge_cache::{
    header_names, CacheKey, CacheStatus, CacheStore, EdgeCache, EdgeCachePolicy,
};
use edge_sdk::edge_core::{ProxyConfig, RequestContext};
use edge_sdk::edge_data::{encode_payload, HttpTransport, XenoCantoClient};
use edge_sdk::edge_executor::BackgroundTasks;
use edge_sdk::edge_observability::{MetricsCollector, StructuredLogger};
use edge_sdk::edge_security::{AllowedOrigins, CorsError, CorsHeaders};
use http::StatusCode;

use crate::response::{ProxyResponse, JSON_CONTENT_TYPE, MISSING_SPECIES, UPSTREAM_FAILED};

/// Workload name used in logs and metrics.
pub const WORKLOAD_NAME: &str = "xeno-canto-proxy";

/// Query parameter naming the species.
pub const SPECIES_PARAM: &str = "species";

/// Per-instance request handler.
///
/// Holds only read-only configuration and handles to the shared cache store
/// and upstream, so one instance can serve any number of requests.
pub struct ProxyHandler<S, T> {
    origins: AllowedOrigins,
    policy: EdgeCachePolicy,
    cache: EdgeCache<S>,
    client: XenoCantoClient<T>,
}

impl<S, T> ProxyHandler<S, T>
where
    S: CacheStore + 'static,
    T: HttpTransport,
{
    /// Build a handler from configuration.
    pub fn new(config: &ProxyConfig, store: S, transport: T) -> Result<Self, CorsError> {
        Ok(Self::from_parts(
            AllowedOrigins::from_config(&config.cors)?,
            EdgeCachePolicy::from_config(&config.cache),
            EdgeCache::new(store),
            XenoCantoClient::new(&config.upstream, transport),
        ))
    }

    /// Build a handler from its components.
    pub fn from_parts(
        origins: AllowedOrigins,
        policy: EdgeCachePolicy,
        cache: EdgeCache<S>,
        client: XenoCantoClient<T>,
    ) -> Self {
        Self {
            origins,
            policy,
            cache,
            client,
        }
    }

    /// Handle one request.
    ///
    /// Cache writes are pushed onto `tasks` rather than awaited; the caller
    /// runs them after the response has been sent.
    pub async fn handle(&self, ctx: &RequestContext, tasks: &mut BackgroundTasks) -> ProxyResponse {
        let logger = StructuredLogger::new(ctx.request_id.clone())
            .with_workload(WORKLOAD_NAME)
            .with_route(&ctx.path);

        let mut metrics = MetricsCollector::new(ctx.request_id.clone());
        metrics.set_workload(WORKLOAD_NAME);
        metrics.set_route(&ctx.path);
        metrics.set_method(ctx.method.as_str());

        logger
            .debug_builder("Request started")
            .field("method", ctx.method.as_str())
            .field("origin", ctx.origin().unwrap_or("-"))
            .emit();

        let allow_origin = self.origins.resolve(ctx.origin());

        let response = if ctx.method.is_preflight() {
            ProxyResponse::preflight(allow_origin)
        } else {
            self.handle_lookup(ctx, allow_origin, tasks, &logger, &mut metrics)
                .await
        };

        let response =
            response.with_header(header_names::X_REQUEST_ID, ctx.request_id.to_string());

        metrics.record_background_tasks(tasks.len());
        let done = metrics.finalize(Some(response.status.as_u16()), Some(response.body.len()));
        logger.log_metrics(&done);

        response
    }

    async fn handle_lookup(
        &self,
        ctx: &RequestContext,
        allow_origin: &str,
        tasks: &mut BackgroundTasks,
        logger: &StructuredLogger,
        metrics: &mut MetricsCollector,
    ) -> ProxyResponse {
        let Some(species) = ctx.query_param(SPECIES_PARAM) else {
            logger.info("Rejected request without species parameter");
            return ProxyResponse::json_error(
                StatusCode::BAD_REQUEST,
                MISSING_SPECIES,
                allow_origin,
            );
        };

        let key = CacheKey::for_species(species);

        if let Some(entry) = self.cache.lookup(&key).await {
            metrics.record_cache_status(CacheStatus::Hit);
            logger
                .info_builder("Cache hit")
                .field("key", key.as_str())
                .field_i64("age_secs", i64::try_from(entry.age()).unwrap_or(i64::MAX))
                .emit();
            return ProxyResponse::from_cache(
                entry,
                allow_origin,
                &self.policy.browser_cache_control(),
            );
        }

        metrics.record_cache_status(CacheStatus::Miss);

        let started = Instant::now();
        let result = self.client.fetch_species(species).await;
        let elapsed = started.elapsed();

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                metrics.record_upstream(elapsed, false, Some(e.to_string()));
                logger
                    .error_builder("Upstream fetch failed")
                    .field("species", species)
                    .field("error", e.to_string())
                    .duration_ms("upstream_ms", elapsed)
                    .emit();
                return ProxyResponse::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UPSTREAM_FAILED,
                    allow_origin,
                );
            }
        };

        let body = match encode_payload(&value) {
            Ok(body) => body,
            Err(e) => {
                metrics.record_upstream(elapsed, false, Some(e.to_string()));
                logger
                    .error_builder("Failed to re-encode upstream payload")
                    .field("error", e.to_string())
                    .emit();
                return ProxyResponse::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UPSTREAM_FAILED,
                    allow_origin,
                );
            }
        };

        metrics.record_upstream(elapsed, true, None);
        logger
            .debug_builder("Upstream fetch complete")
            .field("key", key.as_str())
            .field_i64("bytes", i64::try_from(body.len()).unwrap_or(i64::MAX))
            .duration_ms("upstream_ms", elapsed)
            .emit();

        // The edge copy gets its own header set: the long-lived directive and
        // no CORS origin, which is added per request on every hit.
        let stored_headers = vec![
            (
                header_names::CONTENT_TYPE.to_string(),
                JSON_CONTENT_TYPE.to_string(),
            ),
            (
                header_names::CACHE_CONTROL.to_string(),
                self.policy.edge_cache_control(),
            ),
        ];
        tasks.spawn(
            self.cache
                .store(key, body.clone(), stored_headers, self.policy.edge_ttl()),
        );

        ProxyResponse::json(StatusCode::OK, body)
            .with_cors(CorsHeaders::new(allow_origin))
            .with_header(
                header_names::CACHE_CONTROL,
                self.policy.browser_cache_control(),
            )
            .with_header(header_names::X_CACHE, CacheStatus::Miss.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use async_trait::async_trait;
    use edge_sdk::edge_cache::InMemoryStore;
    use edge_sdk::edge_core::Method;
    use edge_sdk::edge_data::{FetchError, HttpResponse};

    use super::*;

    const RECORDINGS: &str =
        r#"{ "numRecordings": "1", "recordings": [ { "id": "12345", "en": "Common Blackbird" } ] }"#;

    /// Upstream stand-in that answers every request the same way.
    #[derive(Clone, Default)]
    struct FakeUpstream {
        body: Rc<RefCell<Option<String>>>,
        status: Rc<Cell<u16>>,
        calls: Rc<RefCell<Vec<String>>>,
    }

    impl FakeUpstream {
        fn new(body: &str) -> Self {
            let upstream = Self::unreachable();
            *upstream.body.borrow_mut() = Some(body.to_string());
            upstream
        }

        fn unreachable() -> Self {
            let upstream = Self::default();
            upstream.status.set(200);
            upstream
        }

        fn calls(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl HttpTransport for FakeUpstream {
        async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.calls.borrow_mut().push(url.to_string());
            match self.body.borrow().as_ref() {
                Some(body) => Ok(HttpResponse::new(self.status.get(), body.as_bytes())),
                None => Err(FetchError::Connection("connection refused".to_string())),
            }
        }
    }

    struct Harness {
        store: Rc<InMemoryStore>,
        upstream: FakeUpstream,
        handler: ProxyHandler<InMemoryStore, FakeUpstream>,
    }

    fn harness_with(config: &ProxyConfig, upstream: FakeUpstream) -> Harness {
        let store = Rc::new(InMemoryStore::new());
        let handler = ProxyHandler::from_parts(
            AllowedOrigins::from_config(&config.cors).unwrap(),
            EdgeCachePolicy::from_config(&config.cache),
            EdgeCache::from_shared(Rc::clone(&store)),
            XenoCantoClient::new(&config.upstream, upstream.clone()),
        );

        Harness {
            store,
            upstream,
            handler,
        }
    }

    fn harness(upstream: FakeUpstream) -> Harness {
        harness_with(&ProxyConfig::new("test-key"), upstream)
    }

    fn get(query: &str, origin: Option<&str>) -> RequestContext {
        let ctx = RequestContext::new(Method::Get, query);
        match origin {
            Some(origin) => ctx.with_header("Origin", origin),
            None => ctx,
        }
    }

    impl Harness {
        /// Handle a request and run its background work, like the host does.
        async fn send(&self, ctx: RequestContext) -> ProxyResponse {
            let mut tasks = BackgroundTasks::new();
            let resp = self.handler.handle(&ctx, &mut tasks).await;
            tasks.run_to_completion().await;
            resp
        }
    }

    #[tokio::test]
    async fn test_preflight() {
        let h = harness(FakeUpstream::new(RECORDINGS));
        let ctx = RequestContext::new(Method::Options, "/")
            .with_header("Origin", "http://localhost:8000");

        let resp = h.send(ctx).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert!(resp.body.is_empty());
        assert_eq!(
            resp.header("Access-Control-Allow-Origin"),
            Some("http://localhost:8000")
        );
        assert_eq!(
            resp.header("Access-Control-Allow-Methods"),
            Some("GET, OPTIONS")
        );
        assert_eq!(
            resp.header("Access-Control-Allow-Headers"),
            Some("Content-Type")
        );
        assert_eq!(h.upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_preflight_ignores_species() {
        let h = harness(FakeUpstream::new(RECORDINGS));
        let ctx = RequestContext::new(Method::Options, "/?species=Turdus+merula");

        let resp = h.send(ctx).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert!(resp.body.is_empty());
        assert_eq!(h.upstream.calls(), 0);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_species() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let resp = h.send(get("/", Some("null"))).await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.body_text(), r#"{"error":"Missing species parameter"}"#);
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("null"));
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        assert_eq!(h.upstream.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let first = h.send(get("/?species=Turdus+merula", Some("http://localhost"))).await;
        let second = h.send(get("/?species=Turdus+merula", Some("http://localhost"))).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(first.header("X-Cache"), Some("MISS"));
        assert_eq!(second.header("X-Cache"), Some("HIT"));
        assert_eq!(first.body, second.body);
        assert_eq!(h.upstream.calls(), 1);
    }

    #[tokio::test]
    async fn test_miss_response_headers_and_body() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let resp = h
            .send(get("/?species=Turdus+merula", Some("https://bryancraven.github.io")))
            .await;

        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        assert_eq!(
            resp.header("Access-Control-Allow-Origin"),
            Some("https://bryancraven.github.io")
        );
        assert_eq!(resp.header("Cache-Control"), Some("public, max-age=86400"));
        assert!(resp.header("X-Request-ID").is_some());

        // Re-encoded: whitespace dropped, key order kept.
        assert_eq!(
            resp.body_text(),
            r#"{"numRecordings":"1","recordings":[{"id":"12345","en":"Common Blackbird"}]}"#
        );
    }

    #[tokio::test]
    async fn test_payload_reencoded_like_javascript() {
        let h = harness(FakeUpstream::new(
            r#"{"numRecordings":"1","numSpecies":"1","page":1,"numPages":1.0,"recordings":[{"id":"1","gen":"Turdus","sp":"merula","en":"Common Blackbird"}]}"#,
        ));

        let first = h.send(get("/?species=Turdus+merula", None)).await;
        let second = h.send(get("/?species=Turdus+merula", None)).await;

        let expected = r#"{"numRecordings":"1","numSpecies":"1","page":1,"numPages":1,"recordings":[{"id":"1","gen":"Turdus","sp":"merula","en":"Common Blackbird"}]}"#;
        assert_eq!(first.body_text(), expected);
        assert_eq!(second.header("X-Cache"), Some("HIT"));
        assert_eq!(second.body_text(), expected);
    }

    #[tokio::test]
    async fn test_upstream_url_carries_species_and_key() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        h.send(get("/?species=Turdus%20merula", None)).await;

        let calls = h.upstream.calls.borrow();
        assert_eq!(
            calls[0],
            "https://xeno-canto.org/api/3/recordings?query=sp:%22Turdus%20merula%22+q:A&key=test-key"
        );
    }

    #[tokio::test]
    async fn test_stored_entry_has_edge_headers_only() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let resp = h.send(get("/?species=Parus+major", Some("http://localhost"))).await;

        let entry = h.store.entry(&CacheKey::for_species("Parus major")).unwrap();
        assert_eq!(entry.body, resp.body);
        assert_eq!(
            entry.header("Cache-Control"),
            Some("public, max-age=604800")
        );
        assert_eq!(entry.header("Content-Type"), Some("application/json"));
        assert_eq!(entry.header("Access-Control-Allow-Origin"), None);
        assert_eq!(entry.header("X-Cache"), None);
        assert_eq!(entry.ttl_secs, 604_800);
    }

    #[tokio::test]
    async fn test_store_deferred_until_tasks_run() {
        let h = harness(FakeUpstream::new(RECORDINGS));
        let mut tasks = BackgroundTasks::new();

        let resp = h
            .handler
            .handle(&get("/?species=Parus+major", None), &mut tasks)
            .await;

        assert_eq!(resp.header("X-Cache"), Some("MISS"));
        assert_eq!(tasks.len(), 1);
        assert!(h.store.is_empty());

        tasks.run_to_completion().await;
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_fetch() {
        let h = harness(FakeUpstream::new(RECORDINGS));
        let mut tasks_a = BackgroundTasks::new();
        let mut tasks_b = BackgroundTasks::new();

        let a = h.handler.handle(&get("/?species=Parus+major", None), &mut tasks_a).await;
        let b = h.handler.handle(&get("/?species=Parus+major", None), &mut tasks_b).await;
        tasks_a.run_to_completion().await;
        tasks_b.run_to_completion().await;

        assert_eq!(a.header("X-Cache"), Some("MISS"));
        assert_eq!(b.header("X-Cache"), Some("MISS"));
        assert_eq!(h.upstream.calls(), 2);
        assert_eq!(h.store.writes(), 2);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_species_do_not_share_entries() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let a = h.send(get("/?species=A", None)).await;
        let b = h.send(get("/?species=B", None)).await;
        let lower = h.send(get("/?species=a", None)).await;

        assert_eq!(a.header("X-Cache"), Some("MISS"));
        assert_eq!(b.header("X-Cache"), Some("MISS"));
        assert_eq!(lower.header("X-Cache"), Some("MISS"));
        assert_eq!(h.upstream.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_species_is_a_valid_key() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let first = h.send(get("/?species=", None)).await;
        let second = h.send(get("/?species=", None)).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.header("X-Cache"), Some("MISS"));
        assert_eq!(second.header("X-Cache"), Some("HIT"));
    }

    #[tokio::test]
    async fn test_hit_reflects_current_origin() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let first = h.send(get("/?species=Sitta+europaea", Some("http://localhost:3000"))).await;
        let second = h.send(get("/?species=Sitta+europaea", Some("http://127.0.0.1:5500"))).await;

        assert_eq!(
            first.header("Access-Control-Allow-Origin"),
            Some("http://localhost:3000")
        );
        assert_eq!(
            second.header("Access-Control-Allow-Origin"),
            Some("http://127.0.0.1:5500")
        );
        assert_eq!(second.header("X-Cache"), Some("HIT"));
        assert_eq!(first.body, second.body);
        assert_eq!(
            second.header("Cache-Control"),
            Some("public, max-age=86400")
        );
    }

    #[tokio::test]
    async fn test_disallowed_origin_gets_default() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let resp = h
            .send(get("/?species=Parus+major", Some("https://bryancraven.github.io.evil.com")))
            .await;
        let absent = h.send(get("/?species=Parus+major", None)).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(
            resp.header("Access-Control-Allow-Origin"),
            Some("https://bryancraven.github.io")
        );
        assert_eq!(
            absent.header("Access-Control-Allow-Origin"),
            Some("https://bryancraven.github.io")
        );
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let h = harness(FakeUpstream::unreachable());

        let resp = h.send(get("/?species=Parus+major", Some("http://localhost:8080"))).await;

        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body_text(), r#"{"error":"Failed to fetch from xeno-canto"}"#);
        assert_eq!(
            resp.header("Access-Control-Allow-Origin"),
            Some("http://localhost:8080")
        );
        assert_eq!(resp.header("X-Cache"), None);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_upstream_body_is_failure() {
        let h = harness(FakeUpstream::new("<html>502 Bad Gateway</html>"));

        let resp = h.send(get("/?species=Parus+major", None)).await;

        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body_text(), r#"{"error":"Failed to fetch from xeno-canto"}"#);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_upstream_error_status_with_json_is_served() {
        let upstream = FakeUpstream::new(r#"{"error":"quota exceeded"}"#);
        upstream.status.set(429);
        let h = harness(upstream);

        let resp = h.send(get("/?species=Parus+major", None)).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body_text(), r#"{"error":"quota exceeded"}"#);
    }

    #[tokio::test]
    async fn test_upstream_error_status_rejected_when_configured() {
        let upstream = FakeUpstream::new(r#"{"error":"quota exceeded"}"#);
        upstream.status.set(429);
        let mut config = ProxyConfig::new("test-key");
        config.upstream.reject_error_status = true;
        let h = harness_with(&config, upstream);

        let mut tasks = BackgroundTasks::new();
        let resp = h.handler.handle(&get("/?species=Parus+major", None), &mut tasks).await;

        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(tasks.is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_affect_response() {
        let h = harness(FakeUpstream::new(RECORDINGS));
        h.store.set_fail_writes(true);

        let first = h.send(get("/?species=Parus+major", Some("null"))).await;
        let second = h.send(get("/?species=Parus+major", Some("null"))).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.header("X-Cache"), Some("MISS"));
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(second.header("X-Cache"), Some("MISS"));
        assert_eq!(first.body, second.body);
        assert_eq!(h.upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_read_failure_falls_through_to_upstream() {
        let h = harness(FakeUpstream::new(RECORDINGS));
        h.send(get("/?species=Parus+major", None)).await;
        h.store.set_fail_reads(true);

        let resp = h.send(get("/?species=Parus+major", None)).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.header("X-Cache"), Some("MISS"));
        assert_eq!(h.upstream.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_get_methods_use_data_path() {
        let h = harness(FakeUpstream::new(RECORDINGS));

        let resp = h
            .send(RequestContext::new(Method::Post, "/?species=Parus+major"))
            .await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.header("X-Cache"), Some("MISS"));
    }

    #[tokio::test]
    async fn test_custom_origins() {
        let mut config = ProxyConfig::new("k");
        config.cors.allowed_origins = vec!["https://birds.example".to_string()];
        let handler = ProxyHandler::new(
            &config,
            InMemoryStore::new(),
            FakeUpstream::new(RECORDINGS),
        )
        .unwrap();
        let mut tasks = BackgroundTasks::new();

        let resp = handler
            .handle(&get("/", Some("http://localhost")), &mut tasks)
            .await;
        assert_eq!(
            resp.header("Access-Control-Allow-Origin"),
            Some("https://birds.example")
        );

        let resp = handler.handle(&get("/", Some("null")), &mut tasks).await;
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("null"));
    }

    #[test]
    fn test_empty_origin_list_rejected() {
        let mut config = ProxyConfig::new("k");
        config.cors.allowed_origins.clear();

        let result =
            ProxyHandler::new(&config, InMemoryStore::new(), FakeUpstream::new(RECORDINGS));
        assert!(matches!(result, Err(CorsError::Empty)));
    }
}
