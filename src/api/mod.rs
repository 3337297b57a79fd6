//! Backend access: request descriptions, the transport seam and the
//! reqwest-backed HTTP transport.

mod client;
mod request;

pub use client::HttpTransport;
pub use request::{ApiRequest, IdempotencyKey, Method, Transport, IDEMPOTENCY_HEADER};
