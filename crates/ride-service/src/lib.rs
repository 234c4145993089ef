//! HTTP service for the ride gateway.
//!
//! # Components
//!
//! - `api`: routes, handlers and the error-to-status mapping
//! - `backends`: the concrete cache, token and ride API backends

pub mod api;
pub mod backends;
