//! Identity module
//!
//! OAuth2/OIDC sign-in for the sample app, delegated to the `oauth2` crate
//! and the session layer.
//!
//! ## Structure
//!
//! - `settings`: identity-provider client settings from the external JSON file
//! - `client`: OAuth2 client wrapper (authorize URL, code exchange, refresh)
//! - `claims`: id-token payload decoding
//! - `context`: the session-identity record
//! - `extractors`: the route gate (`AuthenticatedUser`)
//! - `handlers`: sign-in, callback, and sign-out endpoints
//!
//! ## Authentication flow
//!
//! 1. User visits `/auth/sign_in` → redirect to the authority
//! 2. Authority authenticates → redirect to `/auth/redirect`
//! 3. App exchanges code for tokens → identity record stored in the session
//! 4. Gated endpoints read the record; `/auth/sign_out` clears it

pub mod claims;
pub mod client;
pub mod context;
pub mod extractors;
pub mod handlers;
pub mod settings;

// Re-export handlers for convenient routing
pub use handlers::{redirect_handler, sign_in_handler, sign_out_handler, CallbackParams};

pub use context::{IdentityContext, IDENTITY_SESSION_KEY};
pub use extractors::{AuthError, AuthenticatedUser};
