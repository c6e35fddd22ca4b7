//! Bearer token authentication: codec, hashing, protocol and middleware.

pub mod bearer;
pub mod hashing;
pub mod middleware;
pub mod token;
pub mod types;

pub use bearer::BearerAuthenticator;
pub use hashing::{HASH_VERSION, TokenHasher};
pub use token::{ParsedToken, Token, TokenEnv};
pub use types::{AuthFailure, RequestContext};
