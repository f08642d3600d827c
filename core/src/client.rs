//! Blocking client for the postamat API.
//!
//! # Design
//! `PostamatClient` owns a base URL, the bearer header value and a
//! [`Transport`]. Every operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`; the [`Parcel`] methods glue the two together through the
//! transport. The split keeps the wire contract testable without a network.
//!
//! Two contracts are served by the same client:
//! - typed: DTOs in, DTOs or status codes out (`insert_order`, ...);
//! - raw text: JSON strings in and out under `/auth/postamat/*`
//!   (`insert_order_json`, ...), normalized unless disabled.
//!
//! Write operations never fail on an HTTP status: they return `0` for 2xx
//! and the numeric status otherwise. The free-cells reads fail with
//! `ApiError::Http` on non-2xx.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::normalize::normalize_json;
use crate::transport::{Transport, UreqTransport};
use crate::types::{FreeCellsResponse, InsertOrderRequest, OrdWereNotPickedRequest, RetrieveExpiredOrderRequest};

/// Endpoint paths, relative to the base URL.
pub mod endpoints {
    pub const INSERT_ORDER: &str = "insertOrder";
    pub const RETRIEVE_EXPIRED_ORDER: &str = "retrieveExpiredOrder";
    pub const GET_FREE_CELLS: &str = "getFreeCells";
    pub const ORD_WERE_NOT_PICKED: &str = "ordWereNotPicked";

    pub const RAW_INSERT: &str = "auth/postamat/insert";
    pub const RAW_RETRIEVE: &str = "auth/postamat/retrieve";
    pub const RAW_AVAILABLE: &str = "auth/postamat/available";
}

/// Every postamat operation, typed and raw-text.
pub trait Parcel {
    /// Put an order into a cell. `0` on 2xx, otherwise the HTTP status.
    fn insert_order(&self, request: &InsertOrderRequest) -> Result<u16, ApiError>;

    /// Take an expired order out of the postamat. `0` on 2xx, otherwise the HTTP status.
    fn retrieve_expired_order(&self, request: &RetrieveExpiredOrderRequest) -> Result<u16, ApiError>;

    /// List free cells. An empty or `null` body yields an empty list.
    fn get_free_cells(&self) -> Result<FreeCellsResponse, ApiError>;

    /// Mark orders as not picked up. `0` on 2xx, otherwise the HTTP status.
    fn ord_were_not_picked(&self, request: &OrdWereNotPickedRequest) -> Result<u16, ApiError>;

    /// Raw-text variant of [`insert_order`](Self::insert_order).
    fn insert_order_json(&self, json: &str) -> Result<u16, ApiError>;

    /// Raw-text variant of [`retrieve_expired_order`](Self::retrieve_expired_order).
    fn retrieve_expired_order_json(&self, json: &str) -> Result<u16, ApiError>;

    /// Raw-text variant of [`get_free_cells`](Self::get_free_cells); returns
    /// the (normalized) body, e.g. `{"cells":["a100","a101"]}`.
    fn get_free_cells_json(&self) -> Result<String, ApiError>;
}

/// Client bound to one postamat API endpoint.
pub struct PostamatClient<T: Transport = UreqTransport> {
    base_url: String,
    authorization: String,
    normalize_payloads: bool,
    transport: Option<T>,
}

impl<T: Transport> std::fmt::Debug for PostamatClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostamatClient")
            .field("base_url", &self.base_url)
            .field("normalize_payloads", &self.normalize_payloads)
            .field("closed", &self.transport.is_none())
            .finish()
    }
}

impl PostamatClient<UreqTransport> {
    /// Client with the default ureq transport.
    pub fn new(base_url: &str, token: &str) -> Self {
        Self::with_transport(base_url, token, UreqTransport::new())
    }
}

impl<T: Transport> PostamatClient<T> {
    /// Client with a caller-supplied transport.
    pub fn with_transport(base_url: &str, token: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: format!("Bearer {token}"),
            normalize_payloads: true,
            transport: Some(transport),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn normalizes_payloads(&self) -> bool {
        self.normalize_payloads
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    /// Release the transport. Safe to call repeatedly; only the first call
    /// reaches the transport. Also runs on drop.
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            transport.close();
            debug!(base_url = %self.base_url, "postamat client closed");
        }
    }

    // -- typed contract: request builders ---------------------------------

    pub fn build_insert_order(&self, request: &InsertOrderRequest) -> Result<HttpRequest, ApiError> {
        self.post_dto(endpoints::INSERT_ORDER, request)
    }

    pub fn build_retrieve_expired_order(&self, request: &RetrieveExpiredOrderRequest) -> Result<HttpRequest, ApiError> {
        self.post_dto(endpoints::RETRIEVE_EXPIRED_ORDER, request)
    }

    pub fn build_get_free_cells(&self) -> HttpRequest {
        self.get(endpoints::GET_FREE_CELLS)
    }

    pub fn build_ord_were_not_picked(&self, request: &OrdWereNotPickedRequest) -> Result<HttpRequest, ApiError> {
        self.post_dto(endpoints::ORD_WERE_NOT_PICKED, request)
    }

    // -- raw-text contract: request builders ------------------------------

    pub fn build_insert_order_json(&self, json: &str) -> HttpRequest {
        self.post_raw(endpoints::RAW_INSERT, json)
    }

    pub fn build_retrieve_expired_order_json(&self, json: &str) -> HttpRequest {
        self.post_raw(endpoints::RAW_RETRIEVE, json)
    }

    pub fn build_get_free_cells_json(&self) -> HttpRequest {
        self.get(endpoints::RAW_AVAILABLE)
    }

    // -- response parsers -------------------------------------------------

    /// Map a write-operation response to its status code: `0` for 2xx.
    pub fn parse_status(&self, response: &HttpResponse) -> u16 {
        if response.is_success() {
            0
        } else {
            response.status
        }
    }

    pub fn parse_free_cells(&self, response: HttpResponse) -> Result<FreeCellsResponse, ApiError> {
        let response = ensure_success(response)?;
        if response.body.trim().is_empty() {
            return Ok(FreeCellsResponse::default());
        }
        let parsed: Option<FreeCellsResponse> =
            serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn parse_free_cells_json(&self, response: HttpResponse) -> Result<String, ApiError> {
        let response = ensure_success(response)?;
        if self.normalize_payloads {
            Ok(normalize_json(&response.body))
        } else {
            Ok(response.body)
        }
    }

    // -- helpers ----------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn get(&self, path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url(path),
            headers: vec![("authorization".to_string(), self.authorization.clone())],
            body: None,
        }
    }

    fn post_json(&self, path: &str, body: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: self.url(path),
            headers: vec![
                ("authorization".to_string(), self.authorization.clone()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        }
    }

    fn post_dto<B: Serialize>(&self, path: &str, body: &B) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.post_json(path, body))
    }

    fn post_raw(&self, path: &str, json: &str) -> HttpRequest {
        let body = if self.normalize_payloads {
            normalize_json(json)
        } else {
            json.to_string()
        };
        self.post_json(path, body)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let transport = self.transport.as_ref().ok_or(ApiError::Closed)?;
        debug!(
            method = request.method.as_str(),
            path = %request.path,
            body_len = request.body.as_ref().map_or(0, String::len),
            "sending postamat request"
        );
        match transport.execute(&request) {
            Ok(response) => {
                debug!(path = %request.path, status = response.status, "postamat responded");
                Ok(response)
            }
            Err(err) => {
                warn!(path = %request.path, error = %err, "postamat request failed");
                Err(err)
            }
        }
    }

    fn send_for_status(&self, request: HttpRequest) -> Result<u16, ApiError> {
        let response = self.send(request)?;
        Ok(self.parse_status(&response))
    }
}

impl<T: Transport> Parcel for PostamatClient<T> {
    fn insert_order(&self, request: &InsertOrderRequest) -> Result<u16, ApiError> {
        self.send_for_status(self.build_insert_order(request)?)
    }

    fn retrieve_expired_order(&self, request: &RetrieveExpiredOrderRequest) -> Result<u16, ApiError> {
        self.send_for_status(self.build_retrieve_expired_order(request)?)
    }

    fn get_free_cells(&self) -> Result<FreeCellsResponse, ApiError> {
        let response = self.send(self.build_get_free_cells())?;
        self.parse_free_cells(response)
    }

    fn ord_were_not_picked(&self, request: &OrdWereNotPickedRequest) -> Result<u16, ApiError> {
        self.send_for_status(self.build_ord_were_not_picked(request)?)
    }

    fn insert_order_json(&self, json: &str) -> Result<u16, ApiError> {
        self.send_for_status(self.build_insert_order_json(json))
    }

    fn retrieve_expired_order_json(&self, json: &str) -> Result<u16, ApiError> {
        self.send_for_status(self.build_retrieve_expired_order_json(json))
    }

    fn get_free_cells_json(&self) -> Result<String, ApiError> {
        let response = self.send(self.build_get_free_cells_json())?;
        self.parse_free_cells_json(response)
    }
}

impl<T: Transport> Drop for PostamatClient<T> {
    fn drop(&mut self) {
        self.close();
    }
}

fn ensure_success(response: HttpResponse) -> Result<HttpResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body,
    })
}

/// Step-by-step construction of a [`PostamatClient`].
#[derive(Clone)]
pub struct ClientBuilder {
    base_url: String,
    token: String,
    normalize_payloads: bool,
}

impl ClientBuilder {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            normalize_payloads: true,
        }
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            base_url: config.base_url,
            token: config.token,
            normalize_payloads: config.normalize_payloads,
        }
    }

    /// Disable to forward raw-text payloads verbatim.
    pub fn normalize_payloads(mut self, enabled: bool) -> Self {
        self.normalize_payloads = enabled;
        self
    }

    pub fn build(self) -> PostamatClient<UreqTransport> {
        self.build_with(UreqTransport::new())
    }

    pub fn build_with<T: Transport>(self, transport: T) -> PostamatClient<T> {
        let mut client = PostamatClient::with_transport(&self.base_url, &self.token, transport);
        client.normalize_payloads = self.normalize_payloads;
        client
    }
}
