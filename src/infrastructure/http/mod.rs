//! Outbound HTTP plumbing shared by provider clients

mod client;

pub use client::{classify_error, HttpClient, HttpClientTrait};

#[cfg(test)]
pub use client::mock;
