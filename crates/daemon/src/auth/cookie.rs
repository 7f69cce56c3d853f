//! Session cookie construction and lookup.
//!
//! The cookie carries the bare session token. It always travels through a
//! [`SignedCookieJar`], which adds an HMAC keyed from the configured secret,
//! so a forged or edited cookie never reaches the session store.

use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use cookie::time::Duration as CookieDuration;
use sha2::{Digest, Sha512};

/// Attributes and signing key of the session cookie.
#[derive(Clone)]
pub struct CookieSettings {
    name: String,
    /// Lifetime sent as `Max-Age`, in seconds.
    max_age_secs: u64,
    /// Whether to add the `Secure` attribute.
    secure: bool,
    key: Key,
}

impl CookieSettings {
    /// Settings for a cookie signed with a key derived from `secret`.
    pub fn new(name: impl Into<String>, secret: &str, max_age_secs: u64, secure: bool) -> Self {
        Self {
            name: name.into(),
            max_age_secs,
            secure,
            key: signing_key(secret),
        }
    }

    /// Key used by [`SignedCookieJar`] to sign and verify the cookie.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Cookie that stores `token` in the browser.
    pub fn issue(&self, token: String) -> Cookie<'static> {
        let max_age = i64::try_from(self.max_age_secs).unwrap_or(i64::MAX);
        Cookie::build((self.name.clone(), token))
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(CookieDuration::seconds(max_age))
            .secure(self.secure)
            .build()
    }

    /// Cookie passed to [`SignedCookieJar::remove`] to expire the session.
    pub fn removal(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), "")).path("/").build()
    }

    /// The verified session token sent with a request, if any.
    pub fn session_token(&self, jar: &SignedCookieJar) -> Option<String> {
        jar.get(&self.name).map(|cookie| cookie.value().to_owned())
    }
}

/// `Key::from` needs 64 bytes; a SHA-512 digest accepts secrets of any length.
fn signing_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}
