//! API layer - HTTP endpoints and middleware

pub mod ai;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;
pub mod user;

pub use middleware::RequireUser;
pub use router::create_router;
pub use state::AppState;
