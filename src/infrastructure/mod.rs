//! Infrastructure layer - External service implementations

pub mod creation;
pub mod document;
pub mod http;
pub mod identity;
pub mod llm;
pub mod logging;
pub mod media;
pub mod observability;
pub mod quota;
pub mod services;
pub mod storage;
