//! Client-side identity and session management for the console.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod authorizer;

pub use principal::{Identity, IdentityPatch, NewUser};
pub use session::{SessionStore, SessionStatus, SessionSnapshot};
pub use provider::{AuthProvider, HttpAuthProvider, LoginResponse};
pub use authorizer::{Navigator, RequestAuthorizer, SessionReset};
