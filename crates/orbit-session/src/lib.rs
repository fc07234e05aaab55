//! Authenticated session handling for the remote sector API.
//!
//! Credentials come from a [`CredentialSupplier`]; a [`SessionGuard`] turns
//! them into a [`Session`] that passed the login probe, and a
//! [`SharedSession`] hands that session to every worker and coordinates
//! re-authentication when it goes stale.

pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod guard;
pub mod session;
pub mod shared;

pub use credentials::{CookieFileSupplier, CredentialSupplier, Credentials, COOKIE_FILE_NAME};
pub use endpoint::ServerEndpoint;
pub use error::{Result, SessionError};
pub use guard::{Authenticator, SessionGuard, StatusCallback};
pub use session::Session;
pub use shared::{SessionSnapshot, SharedSession};
