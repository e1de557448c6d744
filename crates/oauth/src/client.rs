//! Discovers and caches public keys published by one or more trusted authorization servers.

use crate::cache::JwksCache;
use crate::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use mcpguard_error::AppError;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct JwksClientConfig {
    /// Authorization server base URLs, tried in order on a cache miss.
    pub authorization_servers: Vec<String>,
    pub cache_ttl: Duration,
}

struct Inner {
    http: reqwest::Client,
    authorization_servers: Vec<String>,
    cache: JwksCache,
    /// AS base URL -> discovered `jwks_uri`. Populated lazily, cleared by `refresh_keys`.
    uri_map: RwLock<HashMap<String, String>>,
}

/// Resolves a `kid` to a verification key, fetching and caching AS metadata and JWKS documents
/// on demand.
///
/// Cloning is cheap; all state lives behind the shared `Arc<Inner>`, so every request handler
/// can hold its own clone without coordinating lifetimes.
#[derive(Clone)]
pub struct JwksClient {
    inner: Arc<Inner>,
}

#[derive(Debug, Deserialize)]
struct AuthorizationServerMetadata {
    #[serde(default)]
    issuer: String,
    jwks_uri: String,
}

impl JwksClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: JwksClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                authorization_servers: config.authorization_servers,
                cache: JwksCache::new(config.cache_ttl),
                uri_map: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Resolve `kid` to a verification key.
    ///
    /// Tries the cache first, then walks the configured authorization servers in order,
    /// discovering and fetching each one's JWKS until `kid` turns up. A failure against one AS
    /// does not stop the walk; if every AS is exhausted without finding the key, the last error
    /// encountered is returned (or a `not_found` error if every AS responded successfully but
    /// none of them published `kid`).
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, AppError> {
        if let Some(key) = self.inner.cache.get(kid) {
            return Ok(key);
        }

        let mut last_err: Option<AppError> = None;
        for base in &self.inner.authorization_servers {
            if let Err(err) = self.populate_from_authorization_server(base).await {
                last_err = Some(err);
                continue;
            }
            if let Some(key) = self.inner.cache.get(kid) {
                return Ok(key);
            }
        }

        Err(last_err.unwrap_or_else(|| {
            AppError::not_found("jwks_get_key", "key_not_found").with_context("kid", kid)
        }))
    }

    /// Clear the key cache and the discovered-URI map, then repopulate from every configured
    /// authorization server. A single AS failing to refresh does not abort the others; the last
    /// error observed (if any) is returned after every AS has been attempted.
    pub async fn refresh_keys(&self) -> Result<(), AppError> {
        self.inner.cache.clear();
        self.inner.uri_map.write().clear();

        let mut last_err: Option<AppError> = None;
        for base in &self.inner.authorization_servers {
            if let Err(err) = self.populate_from_authorization_server(base).await {
                last_err = Some(err);
            }
        }

        match last_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn populate_from_authorization_server(&self, base: &str) -> Result<(), AppError> {
        let jwks_uri = self.resolve_jwks_uri(base).await?;
        let jwks = fetch_jwks(&self.inner.http, &jwks_uri).await?;

        for jwk in jwks.keys {
            match jwk.decode() {
                Ok(Some((kid, key))) => self.inner.cache.set(kid, key),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(authorization_server = %base, error = %err, "skipping unparsable JWK");
                }
            }
        }
        Ok(())
    }

    /// Seed the cache directly, bypassing discovery. Only used by other crates' tests that need
    /// a validator wired to a known key without standing up a fake authorization server.
    #[doc(hidden)]
    pub fn test_set_key(&self, kid: &str, key: DecodingKey) {
        self.inner.cache.set(kid, key);
    }

    async fn resolve_jwks_uri(&self, base: &str) -> Result<String, AppError> {
        if let Some(uri) = self.inner.uri_map.read().get(base).cloned() {
            return Ok(uri);
        }

        let metadata = discover_metadata(&self.inner.http, base).await?;
        self.inner
            .uri_map
            .write()
            .insert(base.to_string(), metadata.jwks_uri.clone());
        Ok(metadata.jwks_uri)
    }
}

async fn discover_metadata(
    http: &reqwest::Client,
    base: &str,
) -> Result<AuthorizationServerMetadata, AppError> {
    let url = format!(
        "{}/.well-known/oauth-authorization-server",
        base.trim_end_matches('/')
    );

    let resp = http.get(&url).send().await.map_err(|err| {
        AppError::internal("invalid_metadata", "failed to fetch authorization server metadata")
            .with_context("url", &url)
            .with_source(err)
    })?;

    let resp = resp.error_for_status().map_err(|err| {
        AppError::internal("invalid_metadata", "authorization server metadata returned non-2xx")
            .with_context("url", &url)
            .with_source(err)
    })?;

    let metadata: AuthorizationServerMetadata = resp.json().await.map_err(|err| {
        AppError::internal("invalid_metadata", "authorization server metadata body was not valid JSON")
            .with_context("url", &url)
            .with_source(err)
    })?;

    if metadata.jwks_uri.trim().is_empty() {
        return Err(
            AppError::internal("invalid_metadata", "authorization server metadata missing jwks_uri")
                .with_context("url", &url),
        );
    }

    Ok(metadata)
}

async fn fetch_jwks(http: &reqwest::Client, jwks_uri: &str) -> Result<JwkSet, AppError> {
    let resp = http.get(jwks_uri).send().await.map_err(|err| {
        AppError::internal("jwks_fetch", "failed to fetch JWKS document")
            .with_context("jwks_uri", jwks_uri)
            .with_source(err)
    })?;

    let resp = resp.error_for_status().map_err(|err| {
        AppError::internal("jwks_fetch", "JWKS endpoint returned non-2xx")
            .with_context("jwks_uri", jwks_uri)
            .with_source(err)
    })?;

    resp.json().await.map_err(|err| {
        AppError::internal("jwks_fetch", "JWKS body was not valid JSON")
            .with_context("jwks_uri", jwks_uri)
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpguard_error::ErrorKind;

    /// RFC 7517 appendix A.1 RSA key material, reused verbatim from `jwk.rs`'s own fixtures.
    const RSA_N: &str = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";
    const RSA_E: &str = "AQAB";

    fn rsa_jwks_body(kid: &str) -> serde_json::Value {
        serde_json::json!({
            "keys": [{"kty": "RSA", "kid": kid, "use": "sig", "alg": "RS256", "n": RSA_N, "e": RSA_E}]
        })
    }

    /// A minimal authorization server standing in for a real one: serves RFC 8414-shaped
    /// metadata pointing at its own `/jwks`, and counts how many times `/jwks` is hit so tests
    /// can assert on cache-vs-refetch behavior. Dropping it tears down the listening task.
    struct MockAuthorizationServer {
        base_url: String,
        jwks_hits: Arc<std::sync::atomic::AtomicUsize>,
        jwks_body: Arc<parking_lot::RwLock<serde_json::Value>>,
        _shutdown: tokio::sync::oneshot::Sender<()>,
    }

    impl MockAuthorizationServer {
        async fn start(initial_jwks: serde_json::Value) -> Self {
            use axum::Json;
            use axum::extract::State;
            use axum::routing::get;
            use std::sync::atomic::{AtomicUsize, Ordering};

            #[derive(Clone)]
            struct ServerState {
                hits: Arc<AtomicUsize>,
                body: Arc<parking_lot::RwLock<serde_json::Value>>,
                jwks_uri: Arc<std::sync::OnceLock<String>>,
            }

            async fn metadata(State(state): State<ServerState>) -> Json<serde_json::Value> {
                let jwks_uri = state.jwks_uri.get().expect("jwks_uri set before serving").clone();
                Json(serde_json::json!({ "issuer": "https://as.example.com", "jwks_uri": jwks_uri }))
            }

            async fn jwks(State(state): State<ServerState>) -> Json<serde_json::Value> {
                state.hits.fetch_add(1, Ordering::SeqCst);
                Json(state.body.read().clone())
            }

            let hits = Arc::new(AtomicUsize::new(0));
            let body = Arc::new(parking_lot::RwLock::new(initial_jwks));
            let jwks_uri = Arc::new(std::sync::OnceLock::new());
            let state = ServerState { hits: hits.clone(), body: body.clone(), jwks_uri: jwks_uri.clone() };

            let app = axum::Router::new()
                .route("/.well-known/oauth-authorization-server", get(metadata))
                .route("/jwks", get(jwks))
                .with_state(state);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
            let addr = listener.local_addr().expect("local_addr");
            let base_url = format!("http://{addr}");
            jwks_uri.set(format!("{base_url}/jwks")).expect("set jwks_uri once");

            let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
            tokio::spawn(server);

            Self { base_url, jwks_hits: hits, jwks_body: body, _shutdown: shutdown_tx }
        }

        fn set_jwks(&self, body: serde_json::Value) {
            *self.jwks_body.write() = body;
        }

        fn jwks_hit_count(&self) -> usize {
            self.jwks_hits.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn get_key_discovers_and_fetches_jwks_over_http() {
        let server = MockAuthorizationServer::start(rsa_jwks_body("kid-a")).await;
        let client = client_with(vec![&server.base_url]);

        let key = client.get_key("kid-a").await;
        assert!(key.is_ok());
        assert_eq!(server.jwks_hit_count(), 1);

        // Second lookup of the same kid is served from cache; no extra HTTP call.
        assert!(client.get_key("kid-a").await.is_ok());
        assert_eq!(server.jwks_hit_count(), 1);
    }

    /// Binds an ephemeral port and immediately drops the listener, so the returned address is
    /// guaranteed to refuse connections deterministically (unlike racing a server's shutdown).
    async fn unreachable_base_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local_addr");
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn get_key_fails_over_to_the_next_authorization_server() {
        let dead_base_url = unreachable_base_url().await;
        let live_server = MockAuthorizationServer::start(rsa_jwks_body("kid-b")).await;
        let client = client_with(vec![&dead_base_url, &live_server.base_url]);

        let key = client.get_key("kid-b").await;
        assert!(key.is_ok(), "should fail over past the unreachable first AS: {key:?}");
        assert_eq!(live_server.jwks_hit_count(), 1);
    }

    #[tokio::test]
    async fn refresh_keys_refetches_jwks_after_rotation() {
        let server = MockAuthorizationServer::start(rsa_jwks_body("kid-old")).await;
        let client = client_with(vec![&server.base_url]);

        assert!(client.get_key("kid-old").await.is_ok());
        assert_eq!(server.jwks_hit_count(), 1);

        // Authorization server rotates: publishes only the new kid now.
        server.set_jwks(rsa_jwks_body("kid-new"));

        // The old kid is still cached until a refresh happens.
        assert!(client.get_key("kid-old").await.is_ok());
        assert_eq!(server.jwks_hit_count(), 1, "cache hit should not trigger a refetch");

        client.refresh_keys().await.unwrap();
        assert_eq!(server.jwks_hit_count(), 2, "refresh_keys should refetch JWKS over HTTP");

        assert!(client.get_key("kid-new").await.is_ok());
        let old_err = client.get_key("kid-old").await.unwrap_err();
        assert_eq!(old_err.kind, ErrorKind::NotFound, "rotated-out kid should no longer resolve");
    }

    fn client_with(servers: Vec<&str>) -> JwksClient {
        JwksClient::new(
            reqwest::Client::new(),
            JwksClientConfig {
                authorization_servers: servers.into_iter().map(str::to_string).collect(),
                cache_ttl: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn get_key_with_no_authorization_servers_returns_not_found() {
        let client = client_with(vec![]);
        let err = client.get_key("missing").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn get_key_short_circuits_on_cache_hit() {
        let client = client_with(vec![]);
        client
            .inner
            .cache
            .set("k1", DecodingKey::from_secret(b"doesnt-matter-for-this-test"));
        assert!(client.get_key("k1").await.is_ok());
    }

    #[tokio::test]
    async fn refresh_keys_clears_cache_before_repopulating() {
        let client = client_with(vec![]);
        client
            .inner
            .cache
            .set("k1", DecodingKey::from_secret(b"doesnt-matter"));
        assert_eq!(client.inner.cache.size(), 1);
        // No authorization servers configured, so refresh is a no-op besides clearing.
        client.refresh_keys().await.unwrap();
        assert_eq!(client.inner.cache.size(), 0);
    }
}
