//! Shared types for the ride gateway.
//!
//! The modules split along the three vocabularies the gateway speaks: the
//! records it keeps in the cache (`estimate`, `ride`), the upstream ride API
//! wire format (`upstream`), and the inbound HTTP surface (`api`). The service
//! registry lives in `services`.

pub mod api;
pub mod estimate;
pub mod ride;
pub mod services;
pub mod upstream;

pub use api::*;
pub use estimate::*;
pub use ride::*;
pub use services::*;
pub use upstream::*;
