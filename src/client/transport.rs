//! Request Transport
//!
//! Single place where requests against the remote store are executed. Every
//! request gets a per-attempt timeout and is retried with exponential
//! backoff on any failure (network error, timeout, non-2xx status). Retry
//! lives here and only here; resource clients never retry on their own, so
//! no request can back off twice.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::notify::{MessageLevel, Notifier};

pub struct Transport {
    http: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    backoff_base: Duration,
    notifier: Arc<dyn Notifier>,
}

impl Transport {
    pub fn new(config: &RemoteConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            notifier,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Delay applied before retry number `attempt + 1`: base, 2x base,
    /// 4x base, ...
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send::<(), R>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn put_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send::<(), R>(Method::PUT, path, None).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.send::<(), R>(Method::DELETE, path, None).await
    }

    /// One attempt, no retry, no user notification. Used for the
    /// connectivity probe, where the caller wants an immediate answer.
    pub async fn get_once<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.attempt::<(), R>(&Method::GET, path, None).await
    }

    async fn send<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R> {
        let mut last_error = Error::Internal("no request attempts were made".to_string());

        for attempt in 0..self.max_attempts {
            match self.attempt(&method, path, body).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(
                        "request failed ({method} {path}, attempt {}/{}): {e}",
                        attempt + 1,
                        self.max_attempts
                    );
                    if attempt + 1 < self.max_attempts {
                        let delay = self.backoff_delay(attempt);
                        tracing::debug!("retrying {method} {path} in {delay:?}");
                        tokio::time::sleep(delay).await;
                    }
                    last_error = e;
                }
            }
        }

        // Only the final failure reaches the user; the per-attempt warnings
        // above stay in the log.
        self.notifier.notify(
            MessageLevel::Error,
            &format!("Request failed: {last_error}. Check your network connection."),
        );
        Err(last_error)
    }

    async fn attempt<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| classify(&e, path))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::from_status(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown"),
                path,
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| Error::Internal(format!("invalid response body from {path}: {e}")))
    }
}

fn classify(err: &reqwest::Error, path: &str) -> Error {
    if err.is_timeout() {
        Error::Timeout(path.to_string())
    } else {
        Error::Network(format!("{path}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn config(base_url: String, max_attempts: u32) -> RemoteConfig {
        RemoteConfig {
            base_url,
            timeout_secs: 5,
            max_attempts,
            backoff_base_ms: 10,
        }
    }

    /// Server whose endpoint fails with 500 for the first `failures`
    /// requests and returns `{"ok": true}` afterwards.
    async fn flaky_server(failures: u32) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/api/ping",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    } else {
                        Json(serde_json::json!({ "ok": true })).into_response()
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    #[test]
    fn test_backoff_schedule_doubles() {
        let notifier = Arc::new(MemoryNotifier::new());
        let transport = Transport::new(
            &RemoteConfig {
                backoff_base_ms: 1000,
                ..RemoteConfig::default()
            },
            notifier,
        )
        .unwrap();

        assert_eq!(transport.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(transport.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(transport.backoff_delay(2), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures_with_two_backoffs() {
        let (base, hits) = flaky_server(2).await;
        let notifier = Arc::new(MemoryNotifier::new());
        let transport = Transport::new(&config(base, 3), notifier.clone()).unwrap();

        let started = Instant::now();
        let value: serde_json::Value = transport.get("/api/ping").await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(value["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        // Two backoff delays: base then 2x base.
        assert!(elapsed >= Duration::from_millis(30), "elapsed {elapsed:?}");
        // Intermediate failures never reach the user.
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_attempts_notify_once() {
        let (base, hits) = flaky_server(10).await;
        let notifier = Arc::new(MemoryNotifier::new());
        let transport = Transport::new(&config(base, 3), notifier.clone()).unwrap();

        let result: Result<serde_json::Value> = transport.get("/api/ping").await;
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        let errors = notifier.messages_at(MessageLevel::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Request failed:"), "{}", errors[0]);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let notifier = Arc::new(MemoryNotifier::new());
        // Nothing listens on this port.
        let transport = Transport::new(
            &config("http://127.0.0.1:9".to_string(), 1),
            notifier.clone(),
        )
        .unwrap();

        let result: Result<serde_json::Value> = transport.get("/api/ping").await;
        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(notifier.messages_at(MessageLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_probe_does_not_retry_or_notify() {
        let (base, hits) = flaky_server(10).await;
        let notifier = Arc::new(MemoryNotifier::new());
        let transport = Transport::new(&config(base, 3), notifier.clone()).unwrap();

        let result: Result<serde_json::Value> = transport.get_once("/api/ping").await;
        assert!(result.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(notifier.messages().is_empty());
    }
}
