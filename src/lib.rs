//! Client-side data layer for the payments dashboard API.
//!
//! [`session::SessionStore`] owns the signed-in identity,
//! [`cache::QueryCache`] owns fetched domain data, and [`ops::Client`]
//! exposes every domain operation on top of both.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod ops;
pub mod query;
pub mod session;

#[cfg(test)]
mod testing;
