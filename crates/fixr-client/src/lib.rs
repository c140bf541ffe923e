//! Client side of the FIXR backend: document upload and contact capture.

pub mod document;

#[cfg(feature = "http")]
pub mod http;

pub use document::{DocumentError, read_document};

#[cfg(feature = "http")]
pub use http::{ApiClient, ClientError, DEFAULT_API_URL, LoanBackend};
