//! Error type definitions.
//!
//! There is no fatal error class in this crate: every failure mode degrades
//! to an empty or partial result at the public boundary. These types exist so
//! the failure branches stay testable and loggable on the way down.

use thiserror::Error;

/// Errors raised while fetching a document over HTTP.
///
/// Collapsed to `None` (empty document) before reaching callers.
#[derive(Error, Debug)]
pub(crate) enum FetchError {
    /// The supplied URL was empty or not usable as a request target.
    #[error("invalid fetch url: {0:?}")]
    InvalidUrl(String),

    /// The underlying HTTP request failed (DNS, connect, timeout, decode).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    /// The response body exceeded the configured size cap.
    #[error("response body too large: {0} bytes")]
    BodyTooLarge(usize),
}

/// Errors raised while probing a candidate image URL.
///
/// Collapsed to `false` (not a valid image) before reaching callers.
#[derive(Error, Debug)]
pub(crate) enum ProbeError {
    /// The underlying HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    /// The declared content type was missing or not `image/*`.
    #[error("content-type is not an image: {0:?}")]
    NotAnImage(Option<String>),

    /// The leading body bytes matched no known image signature.
    #[error("no known image signature in leading bytes")]
    UnknownSignature,
}
