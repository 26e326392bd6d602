//! Signing keys derived from `cookie.secret` and `session.secret`.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Key, SignedCookieJar};

use apphost_core::config::AppConfig;
use apphost_core::error::AppError;
use apphost_core::result::AppResult;

/// Shortest secret accepted for key derivation.
pub const MIN_SECRET_LEN: usize = 32;

/// Keys for signed cookies.
///
/// `cookie` signs cookies set by plugin handlers; `session` signs the
/// session cookie written by the host.
#[derive(Clone)]
pub struct CookieKeys {
    cookie: Key,
    session: Key,
}

impl CookieKeys {
    /// Derives both keys from the configured secrets.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        Ok(Self {
            cookie: derive("cookie.secret", &config.cookie.secret)?,
            session: derive("session.secret", &config.session.secret)?,
        })
    }

    /// Signed cookies of a request, verified with `cookie.secret`.
    pub fn cookies(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.cookie.clone())
    }

    /// Signed cookies of a request, verified with `session.secret`.
    pub fn session(&self, headers: &HeaderMap) -> SignedCookieJar {
        SignedCookieJar::from_headers(headers, self.session.clone())
    }
}

impl std::fmt::Debug for CookieKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieKeys")
            .field("cookie", &"****")
            .field("session", &"****")
            .finish()
    }
}

fn derive(setting: &str, secret: &str) -> AppResult<Key> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(AppError::configuration(format!(
            "{setting} must be at least {MIN_SECRET_LEN} bytes"
        )));
    }
    Ok(Key::derive_from(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apphost_core::config::app::SecretConfig;
    use apphost_core::error::ErrorKind;
    use axum::http::header;
    use axum_extra::extract::cookie::Cookie;

    fn secret(value: &str) -> SecretConfig {
        SecretConfig {
            secret: value.to_string(),
        }
    }

    #[test]
    fn test_short_secret_is_configuration_error() {
        let config = AppConfig {
            session: secret("too-short"),
            ..Default::default()
        };
        let err = CookieKeys::from_config(&config).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("session.secret"));
    }

    #[test]
    fn test_cookie_and_session_keys_differ() {
        let config = AppConfig {
            cookie: secret(&"c".repeat(MIN_SECRET_LEN)),
            session: secret(&"s".repeat(MIN_SECRET_LEN)),
            ..Default::default()
        };
        let keys = CookieKeys::from_config(&config).unwrap();

        let signed = keys
            .cookies(&HeaderMap::new())
            .add(Cookie::new("theme", "dark"));

        let mut headers = HeaderMap::new();
        let raw = signed_header(signed);
        headers.insert(header::COOKIE, raw.parse().unwrap());
        assert_eq!(keys.cookies(&headers).get("theme").unwrap().value(), "dark");
        assert!(keys.session(&headers).get("theme").is_none());
    }

    fn signed_header(jar: SignedCookieJar) -> String {
        use axum::response::IntoResponse;

        let response = jar.into_response();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}
