//! Blocking client for the postamat (parcel-locker) HTTP API.
//!
//! # Overview
//! [`PostamatClient`] inserts orders into locker cells, retrieves expired
//! orders, lists free cells and marks orders as not picked up. It speaks two
//! contracts:
//! - typed: DTOs from [`types`] serialized as lowerCamelCase JSON;
//! - raw text: JSON strings whose quoted numbers and booleans are retyped by
//!   [`normalize_json`] on the way out and on the way back.
//!
//! # Design
//! - Requests and responses are plain data ([`HttpRequest`],
//!   [`HttpResponse`]); each operation has a `build_*` / `parse_*` pair.
//! - All I/O goes through the [`Transport`] trait. [`UreqTransport`] is the
//!   default; tests substitute their own.
//! - Write operations report HTTP failures as a status code, never as `Err`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod transport;
pub mod types;

pub use client::{ClientBuilder, Parcel, PostamatClient};
pub use config::ClientConfig;
pub use error::{ApiError, ConfigError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use normalize::normalize_json;
pub use transport::{Transport, UreqTransport};
pub use types::{
    FreeCellsResponse, InsertOrderRequest, OpenByCellCodes, OpenByLocker, OpenStrategy, OrdWereNotPickedRequest,
    ParcelSize, RetrieveExpiredOrderRequest,
};
