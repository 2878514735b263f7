//! Response envelope and request extractors
//!
//! Every handled request answers HTTP 200 with `{"success": true, ...}` or
//! `{"success": false, "message": ...}`. Only authentication failures use 401.

pub mod envelope;
pub mod error;
pub mod json;

pub use envelope::{ApiOutcome, ApiResult};
pub use error::{ApiFailure, FailureKind};
pub use json::Json;
