//! Authenticated HTTP request layer.
//!
//! This module provides the `ApiClient` that decorates every outbound
//! call with the session's bearer token and recovers transparently from
//! an expired access token via the refresh coordinator.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
