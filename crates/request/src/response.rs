use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderValue, SET_COOKIE};
use std::sync::{Mutex, PoisonError};
use xqweb_core::{Error, ErrorCode};

/// A cookie to send with the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: Option<DateTime<Utc>>,
}

impl ResponseCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), path: "/".to_string(), expires: None }
    }

    /// Empty cookie dated at the epoch, which makes clients drop it.
    pub fn expired(name: impl Into<String>) -> Self {
        Self { expires: Some(DateTime::<Utc>::UNIX_EPOCH), ..Self::new(name, "") }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }

    /// `Set-Cookie` header value.
    pub fn to_header_string(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(at) = self.expires {
            out.push_str(&format!("; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT")));
        }
        out
    }
}

/// Outgoing state the request functions may touch while a query runs.
/// Shared by reference across the functions of one request.
#[derive(Debug, Default)]
pub struct ResponseContext {
    cookies: Mutex<Vec<ResponseCookie>>,
}

impl ResponseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace (by case-insensitive name) a cookie.
    pub fn set_cookie(&self, cookie: ResponseCookie) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| !c.name.eq_ignore_ascii_case(&cookie.name));
        cookies.push(cookie);
    }

    pub fn remove_cookie(&self, name: &str) {
        tracing::debug!(cookie = name, "expiring cookie in response");
        self.set_cookie(ResponseCookie::expired(name));
    }

    pub fn cookie(&self, name: &str) -> Option<ResponseCookie> {
        let cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.iter().find(|c| c.name.eq_ignore_ascii_case(name)).cloned()
    }

    pub fn cookies(&self) -> Vec<ResponseCookie> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Append one `Set-Cookie` header per recorded cookie.
    pub fn write_headers(&self, headers: &mut HeaderMap) -> Result<(), Error> {
        for cookie in self.cookies() {
            let value = HeaderValue::from_str(&cookie.to_header_string()).map_err(|e| {
                Error::from_code(ErrorCode::FOER0000, format!("cookie '{}' is not a valid header value", cookie.name))
                    .with_source(e)
            })?;
            headers.append(SET_COOKIE, value);
        }
        Ok(())
    }
}
