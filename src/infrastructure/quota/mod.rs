//! Quota store backends

mod identity_metadata;
mod in_memory;
mod postgres;

pub use identity_metadata::IdentityMetadataQuotaStore;
pub use in_memory::InMemoryQuotaStore;
pub use postgres::PostgresQuotaStore;
