//! Per-session cookie storage.
//!
//! Cookies captured from `Set-Cookie` headers are replayed on every later
//! request as one `Cookie` header. The jar lives and dies with its
//! [`SessionClient`](super::SessionClient).

use log::debug;
use reqwest::header::{HeaderMap, SET_COOKIE};
use url::Url;

const DOMAIN_ATTRIBUTE: &str = "domain";
const MAX_AGE_ATTRIBUTE: &str = "max-age";
const COOKIE_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    expired: bool,
}

impl Cookie {
    /// Parse one `Set-Cookie` header value.
    ///
    /// `default_domain` applies when the header carries no `Domain` attribute.
    /// Returns `None` for headers without a `name=value` pair or with an empty name.
    pub fn parse(header: &str, default_domain: &str) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut domain = normalize_domain(default_domain);
        let mut expired = false;
        for attribute in parts {
            let (key, attr_value) = match attribute.split_once('=') {
                Some((key, attr_value)) => (key.trim(), attr_value.trim()),
                None => (attribute.trim(), ""),
            };
            if key.eq_ignore_ascii_case(DOMAIN_ATTRIBUTE) && !attr_value.is_empty() {
                domain = normalize_domain(attr_value);
            } else if key.eq_ignore_ascii_case(MAX_AGE_ATTRIBUTE) {
                expired = attr_value.parse::<i64>().is_ok_and(|age| age <= 0);
            }
        }

        Some(Self {
            name: name.to_string(),
            value: value.trim().trim_matches('"').to_string(),
            domain,
            expired,
        })
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cookie, replacing one with the same name and domain.
    ///
    /// An expired cookie removes its stored counterpart instead.
    pub fn store(&mut self, cookie: Cookie) {
        let existing = self
            .cookies
            .iter()
            .position(|c| c.name == cookie.name && c.domain == cookie.domain);

        match (existing, cookie.is_expired()) {
            (Some(index), true) => {
                self.cookies.remove(index);
            }
            (Some(index), false) => self.cookies[index] = cookie,
            (None, true) => {}
            (None, false) => self.cookies.push(cookie),
        }
    }

    /// Capture every `Set-Cookie` header of a response from `url`.
    ///
    /// Returns the number of headers that parsed into a cookie.
    pub fn capture(&mut self, url: &Url, headers: &HeaderMap) -> usize {
        let default_domain = url.host_str().unwrap_or_default();
        let mut captured = 0;

        for header in headers.get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else {
                debug!("Skipping non-ASCII Set-Cookie header");
                continue;
            };
            if let Some(cookie) = Cookie::parse(raw, default_domain) {
                debug!("Captured cookie '{}' for {}", cookie.name, cookie.domain);
                self.store(cookie);
                captured += 1;
            }
        }

        captured
    }

    /// The `Cookie` request header value, or `None` when the jar is empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Some(pairs.join(COOKIE_SEPARATOR))
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}
