//! Compile-time configuration constants.

use std::time::Duration;

/// Request timeout applied to document fetches and image probes.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum idle lifetime for pooled connections.
///
/// Bounding the pool lifetime forces periodic reconnects so long-lived
/// processes pick up DNS/IP changes for hosts they talk to repeatedly.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Maximum URL length (2048 characters) accepted by the URL classifier.
/// This matches common browser and server limits (e.g., IE, Apache, Nginx default limits).
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum document body size in bytes. Larger responses are treated as
/// fetch failures rather than parsed.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Number of leading body bytes read when sniffing image signatures.
/// 12 bytes covers every supported format (WebP needs bytes 8-11).
pub const MAGIC_BYTE_LEN: usize = 12;

/// Browser-like User-Agent for outbound requests.
///
/// Servers routinely serve degraded or empty markup to obvious bot agents,
/// so requests mimic a modern Chrome on Windows.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept header matching modern browser content negotiation.
pub const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Accept-Language header (English default).
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
