//! Error types for the postamat client.
//!
//! # Design
//! Write operations report non-2xx outcomes through their return value (the
//! numeric status), so `Http` is only produced by the free-cells reads.
//! `Transport` is kept apart from `Http`: it means no response arrived at all.

use thiserror::Error;

/// Errors returned by `PostamatClient` operations and `parse_*` methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A read operation received a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (connect, DNS, I/O failure).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The client was closed and no longer owns a transport.
    #[error("client is closed")]
    Closed,
}

/// Errors produced while assembling a `ClientConfig`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("base URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
