//! Network access for precaching and fallback delivery
//!
//! Two implementations of [`Network`]:
//! - [`HttpNetwork`]: real HTTP via `ureq`, run on the blocking pool.
//! - [`StaticNetwork`]: serves a fixed route table and records every request.

use crate::config::schema::{is_absolute_url, NetworkConfig};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Method, Request, Response};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Abstract network interface
///
/// Non-2xx statuses are responses, not errors. An `Err` means no response was
/// obtained at all (DNS, connection, TLS, protocol failure).
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a request and return the response unmodified
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response>;
}

/// HTTP network backed by a `ureq` agent
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    agent: ureq::Agent,
    origin: String,
    user_agent: String,
}

impl HttpNetwork {
    /// Create a network client for the configured origin
    pub fn new(config: &NetworkConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            origin: config.origin.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Resolve a request URL against the origin. Absolute URLs pass through.
    pub fn resolve(&self, url: &str) -> String {
        if is_absolute_url(url) {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.origin, url)
        } else {
            format!("{}/{}", self.origin, url)
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        let agent = self.agent.clone();
        let target = self.resolve(&request.url);
        let user_agent = self.user_agent.clone();
        let request = request.clone();

        debug!("{} {}", request.method, target);

        tokio::task::spawn_blocking(move || perform(&agent, &target, &user_agent, &request))
            .await
            .map_err(|e| PrecacheError::Internal(format!("network task failed: {}", e)))?
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    user_agent: &str,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    if !headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
    {
        builder = builder.header("User-Agent", user_agent);
    }
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn perform(
    agent: &ureq::Agent,
    target: &str,
    user_agent: &str,
    request: &Request,
) -> PrecacheResult<Response> {
    let headers = &request.headers;
    let body = request.body.as_slice();

    let result = match request.method {
        Method::Get => with_headers(agent.get(target), user_agent, headers).call(),
        Method::Head => with_headers(agent.head(target), user_agent, headers).call(),
        Method::Delete => with_headers(agent.delete(target), user_agent, headers).call(),
        Method::Options => with_headers(agent.options(target), user_agent, headers).call(),
        Method::Post => with_headers(agent.post(target), user_agent, headers).send(body),
        Method::Put => with_headers(agent.put(target), user_agent, headers).send(body),
        Method::Patch => with_headers(agent.patch(target), user_agent, headers).send(body),
    };

    let mut res = result.map_err(|e| PrecacheError::network(&request.url, e))?;

    let status = res.status();
    let headers = res
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = res
        .body_mut()
        .read_to_vec()
        .map_err(|e| PrecacheError::network(&request.url, e))?;

    Ok(Response {
        url: target.to_string(),
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
        headers,
        body,
    })
}

/// A network that serves a fixed route table.
///
/// Unknown URLs get a 404 response; URLs marked with [`StaticNetwork::offline`]
/// fail as if the connection was refused.
#[derive(Debug, Default)]
pub struct StaticNetwork {
    routes: HashMap<String, Response>,
    offline: HashSet<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl StaticNetwork {
    /// Create a network with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`
    pub fn route(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        let url = url.into();
        self.routes.insert(url.clone(), Response::ok(url, body));
        self
    }

    /// Serve a prepared response for `url`
    pub fn respond(mut self, url: impl Into<String>, response: Response) -> Self {
        self.routes.insert(url.into(), response);
        self
    }

    /// Fail every request for `url`
    pub fn offline(mut self, url: impl Into<String>) -> Self {
        self.offline.insert(url.into());
        self
    }

    /// Number of requests performed so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in order
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.url.clone());

        if self.offline.contains(&request.url) {
            return Err(PrecacheError::network(&request.url, "connection refused"));
        }

        Ok(self.routes.get(&request.url).cloned().unwrap_or_else(|| Response {
            status_text: "Not Found".to_string(),
            ..Response::new(request.url.clone(), 404)
        }))
    }
}
