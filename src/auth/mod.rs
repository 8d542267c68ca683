//! Authentication module

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtService};
pub use middleware::{extract_token, Authenticator, CallerIdentity, JwtAuthenticator};
