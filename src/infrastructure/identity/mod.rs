//! Identity provider adapters

mod clerk;
mod shared_secret;

pub use clerk::{
    ClerkBackendClient, ClerkClaims, ClerkIdentityProvider, ClerkUser, DEFAULT_CLERK_API_URL,
};
pub use shared_secret::{SessionClaims, SharedSecretIdentityProvider};
