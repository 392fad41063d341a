//! Cookie-authenticated client for the StatusHub dashboard.
//!
//! One [`SessionClient`] is one session: it logs in with the dashboard
//! password, keeps whatever cookies the server hands back, and replays them
//! when fetching the overview. Nothing is persisted; dropping the client
//! ends the session.

pub mod cookie_jar;

pub use cookie_jar::{Cookie, CookieJar};

use crate::STATUSHUB_USER_AGENT;
use crate::error::SessionError;

use common::{ErrorLocation, HttpStatusCode, RedactedPassword};
use models::EntryCollection;

use std::panic::Location;
use std::time::Duration;

use log::{debug, info, warn};
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;
use url::form_urlencoded::Serializer as FormSerializer;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_ENDPOINT: &str = "login";
const OVERVIEW_ENDPOINT: &str = "api/overview";
const PASSWORD_FIELD: &str = "password";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
/// The dashboard redirects to the site root once a password is accepted.
const LOGIN_ACCEPTED_LOCATION: &str = "/";
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Host and credentials the handheld uses to reach the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub host_url: String,
    pub password: RedactedPassword,
}

#[derive(Deserialize)]
struct OverviewResponse {
    data: EntryCollection,
}

pub struct SessionClient {
    base_url: Url,
    client: Client,
    cookies: CookieJar,
    authenticated: bool,
}

impl SessionClient {
    /// Create an unauthenticated session against `host_url`.
    ///
    /// A trailing `/` is added when missing so endpoints resolve beneath any
    /// sub-path the dashboard is mounted on.
    pub fn new(host_url: &str) -> Result<Self, SessionError> {
        let normalized = if host_url.ends_with('/') {
            host_url.to_string()
        } else {
            format!("{host_url}/")
        };
        let base_url = Url::parse(&normalized)?;

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT)
            .redirect(Policy::none())
            .user_agent(STATUSHUB_USER_AGENT)
            .build()?;

        Ok(Self {
            base_url,
            client,
            cookies: CookieJar::new(),
            authenticated: false,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Attach the current cookie set to an outgoing request.
    fn prepare_request(&self, request: RequestBuilder) -> RequestBuilder {
        match self.cookies.header_value() {
            Some(cookie_header) => request.header(COOKIE, cookie_header),
            None => request,
        }
    }

    /// Send a request and capture its cookies, whatever the status.
    async fn execute(&mut self, request: RequestBuilder) -> Result<Response, SessionError> {
        let response = self.prepare_request(request).send().await?;
        let captured = self.cookies.capture(response.url(), response.headers());
        if captured > 0 {
            debug!("Session now holds {} cookies", self.cookies.len());
        }
        Ok(response)
    }

    /// Log in with the dashboard password.
    ///
    /// Returns `true` only when the server redirects to the site root. Any
    /// other response (a redirect back to the login page, a 200, a missing
    /// `Location`) means the password was rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the dashboard cannot be reached
    /// within the connect/read bounds.
    pub async fn login(&mut self, password: &RedactedPassword) -> Result<bool, SessionError> {
        let url = self.base_url.join(LOGIN_ENDPOINT)?;
        let body = FormSerializer::new(String::new())
            .append_pair(PASSWORD_FIELD, password.expose())
            .finish();

        debug!(
            "Logging in to {} (password {} chars)",
            url,
            password.len()
        );

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);
        let response = self.execute(request).await?;

        let status = HttpStatusCode::from(response.status().as_u16());
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok());

        let accepted = status.is_redirect() && location == Some(LOGIN_ACCEPTED_LOCATION);
        if accepted {
            self.authenticated = true;
            info!("Dashboard login accepted");
        } else {
            warn!(
                "Dashboard login rejected (HTTP {}, location {:?})",
                status, location
            );
        }

        Ok(accepted)
    }

    /// Fetch the current overview.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Transport`] on connection failure or timeout
    /// - [`SessionError::Fetch`] on a non-2xx response
    /// - [`SessionError::Format`] if the body is not `{"data": [...]}` with
    ///   `serviceName`/`message` on every element
    pub async fn fetch_overview(&mut self) -> Result<EntryCollection, SessionError> {
        let url = self.base_url.join(OVERVIEW_ENDPOINT)?;
        let request = self.client.get(url);
        let response = self.execute(request).await?;

        if !response.status().is_success() {
            let status = HttpStatusCode::from(response.status().as_u16());
            if status.is_client_error() {
                self.authenticated = false;
                warn!("Dashboard rejected the session (HTTP {status})");
            }
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::Fetch {
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                status,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let bytes = response.bytes().await?;
        let overview: OverviewResponse = serde_json::from_slice(&bytes)?;
        info!("Fetched overview with {} entries", overview.data.len());

        Ok(overview.data)
    }
}
