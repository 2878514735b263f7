//! History store backends

mod in_memory;
mod postgres;

pub use in_memory::InMemoryCreationRepository;
pub use postgres::PostgresCreationRepository;
