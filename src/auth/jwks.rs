// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Refresh policy
//!
//! - Keys are cached for `cache_ttl` and refetched lazily once stale
//! - A stale cache is kept if a refetch fails
//! - An unknown `kid` triggers a refetch (Auth0 key rotation)
//! - Lazy and `kid`-triggered refetches run one at a time and at most once
//!   per `MIN_REFETCH_INTERVAL`, counted from the last attempt whether it
//!   succeeded or not
//! - [`JwksManager::run_refresh`] refetches on a fixed period in the
//!   background until cancelled
//!
//! Only RSA keys are turned into decoding keys.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum spacing between request-driven fetch attempts.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Start of the last fetch attempt. Held for the whole fetch, so fetches
    /// never overlap.
    last_attempt: Arc<Mutex<Option<Instant>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a manager for `jwks_url`, e.g.
    /// `https://tenant.eu.auth0.com/.well-known/jwks.json`.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            last_attempt: Arc::new(Mutex::new(None)),
            client,
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Cached key set, refetched when older than the TTL.
    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        let failure = match self.throttled_refresh().await {
            Some(Ok(jwks)) => return Ok(jwks),
            Some(Err(e)) => Some(e),
            None => None,
        };

        let cache = self.cache.read().await;
        match (&*cache, failure) {
            (Some(entry), Some(e)) => {
                warn!(
                    error = e.detail().unwrap_or_default(),
                    age_secs = entry.fetched_at.elapsed().as_secs(),
                    "JWKS refresh failed, using stale keys"
                );
                Ok(entry.jwks.clone())
            }
            // Another caller fetched (or failed to) moments ago.
            (Some(entry), None) => Ok(entry.jwks.clone()),
            (None, Some(e)) => Err(e),
            (None, None) => Err(AuthError::JwksFetchError(
                "JWKS fetch attempted too recently".to_string(),
            )),
        }
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))
    }

    /// Decoding key for `kid`.
    ///
    /// A `kid` missing from the cached set causes one refetch unless a fetch
    /// was attempted less than `MIN_REFETCH_INTERVAL` ago.
    pub async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = jwks.find(kid) {
            return rsa_decoding_key(jwk);
        }

        debug!(kid, "Unknown key id, refetching JWKS");
        let jwks = match self.throttled_refresh().await {
            Some(result) => result?,
            None => return Err(AuthError::NoMatchingKey),
        };
        jwks.find(kid)
            .ok_or(AuthError::NoMatchingKey)
            .and_then(rsa_decoding_key)
    }

    /// Fetch the key set now and replace the cache.
    pub async fn refresh(&self) -> Result<JwkSet, AuthError> {
        let mut last_attempt = self.last_attempt.lock().await;
        self.fetch_and_store(&mut last_attempt).await
    }

    /// Like [`Self::refresh`], but `None` when an attempt started less than
    /// `MIN_REFETCH_INTERVAL` ago. Callers queued behind a running fetch see
    /// its attempt and skip.
    async fn throttled_refresh(&self) -> Option<Result<JwkSet, AuthError>> {
        let mut last_attempt = self.last_attempt.lock().await;
        if last_attempt.is_some_and(|at| at.elapsed() < MIN_REFETCH_INTERVAL) {
            return None;
        }
        Some(self.fetch_and_store(&mut last_attempt).await)
    }

    async fn fetch_and_store(
        &self,
        last_attempt: &mut Option<Instant>,
    ) -> Result<JwkSet, AuthError> {
        *last_attempt = Some(Instant::now());
        let jwks = self.fetch_jwks().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        debug!(keys = jwks.keys.len(), "JWKS cache refreshed");
        Ok(jwks)
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .is_some_and(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
    }

    /// Refresh the cache every `interval` until `shutdown` is cancelled.
    ///
    /// ```rust,ignore
    /// tokio::spawn(jwks.clone().run_refresh(interval, shutdown.clone()));
    /// ```
    pub async fn run_refresh(self: Arc<Self>, interval: Duration, shutdown: CancellationToken) {
        info!(interval_secs = interval.as_secs(), "JWKS refresher starting");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => {
                    info!("JWKS refresher shutting down");
                    return;
                }
            }

            if let Err(e) = self.refresh().await {
                warn!(
                    error_code = e.error_code(),
                    error = e.detail().unwrap_or_default(),
                    "Periodic JWKS refresh failed"
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn preload(&self, jwks: JwkSet) {
        self.preload_at(jwks, Instant::now()).await;
    }

    /// Fill the cache as if a fetch had succeeded at `fetched_at`.
    #[cfg(test)]
    pub(crate) async fn preload_at(&self, jwks: JwkSet, fetched_at: Instant) {
        *self.last_attempt.lock().await = Some(fetched_at);
        *self.cache.write().await = Some(CacheEntry { jwks, fetched_at });
    }
}

fn rsa_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| AuthError::UnusableKey(format!("invalid RSA components: {e}"))),
        _ => Err(AuthError::UnusableKey("key is not RSA".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const FIXTURE_JWKS: &str = include_str!("../../tests/fixtures/jwks.json");

    // Nothing listens on the discard port, so every fetch fails fast.
    const UNREACHABLE: &str = "http://127.0.0.1:9/.well-known/jwks.json";

    fn fixture() -> JwkSet {
        serde_json::from_str(FIXTURE_JWKS).unwrap()
    }

    #[test]
    fn custom_cache_ttl() {
        let manager = JwksManager::new("https://tenant.auth0.com/.well-known/jwks.json")
            .unwrap()
            .with_cache_ttl(Duration::from_secs(60));
        assert_eq!(manager.cache_ttl, Duration::from_secs(60));
        assert_eq!(
            manager.jwks_url(),
            "https://tenant.auth0.com/.well-known/jwks.json"
        );
    }

    #[tokio::test]
    async fn cache_initially_empty() {
        let manager = JwksManager::new(UNREACHABLE).unwrap();
        assert!(!manager.is_cached().await);
    }

    #[tokio::test]
    async fn resolves_preloaded_key_by_kid() {
        let manager = JwksManager::new(UNREACHABLE).unwrap();
        manager.preload(fixture()).await;

        assert!(manager.is_cached().await);
        assert!(manager.decoding_key("test-key-1").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_kid_right_after_fetch_is_not_refetched() {
        let manager = JwksManager::new(UNREACHABLE).unwrap();
        manager.preload(fixture()).await;

        let err = manager.decoding_key("rotated-key").await.err().unwrap();
        assert_eq!(err, AuthError::NoMatchingKey);
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_is_reported() {
        let manager = JwksManager::new(UNREACHABLE).unwrap();
        let err = manager.decoding_key("test-key-1").await.err().unwrap();
        assert!(matches!(err, AuthError::JwksFetchError(_)));
    }

    #[tokio::test]
    async fn stale_cache_survives_failed_refetch() {
        let manager = JwksManager::new(UNREACHABLE)
            .unwrap()
            .with_cache_ttl(Duration::ZERO);
        manager.preload(fixture()).await;

        assert!(manager.decoding_key("test-key-1").await.is_ok());
    }

    #[test]
    fn non_rsa_keys_are_unusable() {
        let jwks: JwkSet = serde_json::from_str(
            r#"{"keys":[{"kty":"oct","kid":"hmac","k":"c2VjcmV0"}]}"#,
        )
        .unwrap();
        let err = rsa_decoding_key(&jwks.keys[0]).err().unwrap();
        assert!(matches!(err, AuthError::UnusableKey(_)));
    }

    /// Endpoint that always answers 500 and counts its hits.
    async fn failing_endpoint() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/.well-known/jwks.json",
            axum::routing::get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/.well-known/jwks.json"), hits)
    }

    fn ago(secs: u64) -> Instant {
        Instant::now().checked_sub(Duration::from_secs(secs)).unwrap()
    }

    #[tokio::test]
    async fn outage_without_cache_is_fetched_once() {
        let (url, hits) = failing_endpoint().await;
        let manager = JwksManager::new(url).unwrap();

        for _ in 0..20 {
            let err = manager.decoding_key("test-key-1").await.err().unwrap();
            assert!(matches!(err, AuthError::JwksFetchError(_)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn outage_with_stale_cache_is_fetched_once() {
        let (url, hits) = failing_endpoint().await;
        let manager = JwksManager::new(url).unwrap();
        manager.preload_at(fixture(), ago(600)).await;

        for _ in 0..20 {
            assert!(manager.decoding_key("test-key-1").await.is_ok());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn random_kids_during_outage_are_fetched_once() {
        let (url, hits) = failing_endpoint().await;
        let manager = JwksManager::new(url).unwrap();
        manager.preload_at(fixture(), ago(60)).await;

        for i in 0..20 {
            assert!(manager.decoding_key(&format!("random-{i}")).await.is_err());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(manager.decoding_key("test-key-1").await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_refetches_do_not_overlap() {
        let (url, hits) = failing_endpoint().await;
        let manager = Arc::new(JwksManager::new(url).unwrap());
        manager.preload_at(fixture(), ago(600)).await;

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.decoding_key("test-key-1").await.is_ok() })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresher_stops_on_cancel() {
        let manager = Arc::new(JwksManager::new(UNREACHABLE).unwrap());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            manager
                .clone()
                .run_refresh(Duration::from_secs(3600), shutdown.clone()),
        );

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
