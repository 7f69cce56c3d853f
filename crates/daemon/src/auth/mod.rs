//! Authentication: credentials, sessions and the session cookie.

pub mod cookie;
pub mod credentials;
pub mod session;

pub use self::cookie::CookieSettings;
pub use credentials::{AuthError, CredentialStore, MIN_PASSWORD_LEN};
pub use session::{AuthState, SessionStore};
