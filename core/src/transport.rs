//! The I/O seam between `PostamatClient` and the network.
//!
//! # Design
//! The client never talks to a socket itself: it hands an [`HttpRequest`] to
//! a [`Transport`] and interprets the returned [`HttpResponse`]. Tests swap
//! in a recording transport with canned responses; production code uses
//! [`UreqTransport`].
//!
//! A transport must return non-2xx responses as data. Only a missing response
//! (connect refused, DNS, I/O) is an error.

use std::sync::{Arc, Mutex};

use tracing::debug;
use ureq::Agent;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP exchange.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Release connections held by the transport. Called at most once by the
    /// owning client.
    fn close(&self) {}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }

    fn close(&self) {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }

    fn close(&self) {
        (**self).close()
    }
}

/// Blocking transport backed by a `ureq` agent and its connection pool.
pub struct UreqTransport {
    agent: Mutex<Option<Agent>>,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status interpretation belongs to the client, so 4xx/5xx must come
        // back as responses.
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent: Mutex::new(Some(agent)),
        }
    }

    fn agent(&self) -> Result<Agent, ApiError> {
        let guard = self
            .agent
            .lock()
            .map_err(|_| ApiError::Transport("agent lock poisoned".to_string()))?;
        // Agent is a cheap handle onto a shared pool.
        guard.clone().ok_or(ApiError::Closed)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent()?;

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = agent.get(request.path.as_str());
                for (key, value) in &request.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = agent.post(request.path.as_str());
                for (key, value) in &request.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, headers, body })
    }

    fn close(&self) {
        if let Ok(mut guard) = self.agent.lock() {
            if guard.take().is_some() {
                debug!("ureq agent released");
            }
        }
    }
}
