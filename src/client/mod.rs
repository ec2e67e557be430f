//! PhraseApp API client
//!
//! Builds authenticated requests for a handful of project and locale
//! endpoints and sends them through a pluggable `Transport`. Turning on
//! caching swaps that transport for a `CachingTransport` wrapping it.

pub mod error;
pub mod models;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::cache::config::{CacheConfig, ConfigError};
use crate::transport::{CachingTransport, Transport};

pub use error::{ApiError, ValidationErrorMessage};
pub use models::{
    Locale, LocaleDetails, LocaleDownloadParams, LocaleParams, LocalePreview, LocaleStatistics,
    Project, ProjectDetails,
};

/// API host used when none is configured
pub const DEFAULT_HOST: &str = "https://api.phraseapp.com";

/// Header carrying the one-time password for two-factor logins
pub const OTP_HEADER: &str = "X-PhraseApp-OTP";

const USER_AGENT: &str = concat!("phraseapp-rust/", env!("CARGO_PKG_VERSION"));

/// How requests authenticate against the API
///
/// A token takes precedence over a username. Basic auth with a username
/// optionally carries a one-time password for two-factor accounts.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub otp: Option<String>,
    /// API host; `None` uses `DEFAULT_HOST`
    pub host: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("otp", &self.otp.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .finish()
    }
}

impl Credentials {
    /// Credentials authenticating with an access token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Returns a copy pointing at a different API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Either a token or a username must be present
    pub fn validate(&self) -> Result<(), ApiError> {
        let has_token = self.token.as_deref().is_some_and(|t| !t.is_empty());
        let has_username = self.username.as_deref().is_some_and(|u| !u.is_empty());
        if has_token || has_username {
            Ok(())
        } else {
            Err(ApiError::MissingCredentials)
        }
    }

    fn host(&self) -> &str {
        self.host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
    }
}

/// Client for the PhraseApp API
///
/// Each client owns its credentials and transport, so differently
/// configured clients can coexist in one process.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    /// Transport the client was built with, never wrapped
    base: Arc<dyn Transport>,
    /// Transport requests go through, possibly a cache around `base`
    transport: Arc<dyn Transport>,
    credentials: Credentials,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client sending requests straight to the network
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let http = reqwest::Client::new();
        let transport: Arc<dyn Transport> = Arc::new(http.clone());
        Self::build(http, transport, credentials)
    }

    /// Create a client sending requests through a custom transport
    pub fn with_transport(
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        Self::build(reqwest::Client::new(), transport, credentials)
    }

    fn build(
        http: reqwest::Client,
        transport: Arc<dyn Transport>,
        credentials: Credentials,
    ) -> Result<Self, ApiError> {
        credentials.validate()?;
        Url::parse(credentials.host())?;
        Ok(Self {
            http,
            base: Arc::clone(&transport),
            transport,
            credentials,
        })
    }

    /// Cache GET responses on disk and revalidate them with ETags
    ///
    /// Wraps the transport the client was built with. Calling it again
    /// replaces the previous cache instead of stacking a second one.
    pub fn enable_caching(&mut self, config: &CacheConfig) -> Result<(), ConfigError> {
        let caching = CachingTransport::from_config(Arc::clone(&self.base), config)?;
        self.transport = Arc::new(caching);
        Ok(())
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// List all projects the current user has access to
    pub async fn projects_list(&self, page: u32, per_page: u32) -> Result<Vec<Project>, ApiError> {
        let url = self.paginated_url("/v2/projects", page, per_page)?;
        self.get_json(url).await
    }

    /// Get details on a single project
    pub async fn project_show(&self, id: &str) -> Result<ProjectDetails, ApiError> {
        let url = self.endpoint(&format!("/v2/projects/{}", id), &[])?;
        self.get_json(url).await
    }

    /// List all locales for the given project
    pub async fn locales_list(
        &self,
        project_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Locale>, ApiError> {
        let path = format!("/v2/projects/{}/locales", project_id);
        let url = self.paginated_url(&path, page, per_page)?;
        self.get_json(url).await
    }

    /// Get details on a single locale for a given project
    pub async fn locale_show(&self, project_id: &str, id: &str) -> Result<LocaleDetails, ApiError> {
        let url = self.endpoint(&format!("/v2/projects/{}/locales/{}", project_id, id), &[])?;
        self.get_json(url).await
    }

    /// Download a locale in a specific file format
    pub async fn locale_download(
        &self,
        project_id: &str,
        id: &str,
        params: &LocaleDownloadParams,
    ) -> Result<Vec<u8>, ApiError> {
        let path = format!("/v2/projects/{}/locales/{}/download", project_id, id);
        let url = self.endpoint(&path, &params.query_pairs())?;
        let response = self
            .send(self.http.get(url), StatusCode::OK)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Create a new locale
    pub async fn locale_create(
        &self,
        project_id: &str,
        params: &LocaleParams,
    ) -> Result<LocaleDetails, ApiError> {
        let url = self.endpoint(&format!("/v2/projects/{}/locales", project_id), &[])?;
        let response = self
            .send(self.http.post(url).json(params), StatusCode::CREATED)
            .await?;
        decode_json(response).await
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let host = self.credentials.host().trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", host, path))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn paginated_url(&self, path: &str, page: u32, per_page: u32) -> Result<Url, ApiError> {
        self.endpoint(
            path,
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.send(self.http.get(url), StatusCode::OK).await?;
        decode_json(response).await
    }

    fn authenticate(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(reqwest::header::USER_AGENT, USER_AGENT);
        let credentials = &self.credentials;

        match (&credentials.token, &credentials.username) {
            (Some(token), _) if !token.is_empty() => {
                builder.header(reqwest::header::AUTHORIZATION, format!("token {}", token))
            }
            (_, Some(username)) => {
                let builder = builder.basic_auth(username, credentials.password.as_ref());
                match &credentials.otp {
                    Some(otp) => builder.header(OTP_HEADER, otp),
                    None => builder,
                }
            }
            _ => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, expected: StatusCode) -> Result<Response, ApiError> {
        let request = self.authenticate(builder).build()?;
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self.transport.round_trip(request).await?;
        debug!(status = %response.status(), "received response");

        handle_response_status(response, expected).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ValidationErrorMessage>,
}

/// Map a response to an error unless it carries the expected status
async fn handle_response_status(
    response: Response,
    expected: StatusCode,
) -> Result<Response, ApiError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    match status {
        StatusCode::BAD_REQUEST => {
            let body: ErrorBody = decode_json(response).await?;
            Err(ApiError::BadRequest {
                message: body.message,
            })
        }
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        StatusCode::UNPROCESSABLE_ENTITY => {
            let body: ErrorBody = decode_json(response).await?;
            Err(ApiError::Validation {
                message: body.message,
                errors: body.errors,
            })
        }
        StatusCode::TOO_MANY_REQUESTS => Err(rate_limit_error(&response)),
        _ => Err(ApiError::UnexpectedStatus { status, expected }),
    }
}

fn rate_limit_error(response: &Response) -> ApiError {
    match parse_rate_limit(response) {
        Ok((limit, remaining, reset)) => ApiError::RateLimited {
            limit,
            remaining,
            reset,
        },
        Err(err) => err,
    }
}

fn parse_rate_limit(response: &Response) -> Result<(u64, u64, DateTime<Utc>), ApiError> {
    let header = |name: &str| -> Result<i64, ApiError> {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| ApiError::InvalidRateLimitHeader(name.to_string()))
    };

    let limit = header("X-Rate-Limit-Limit")?;
    let remaining = header("X-Rate-Limit-Remaining")?;
    let reset = header("X-Rate-Limit-Reset")?;
    let reset = DateTime::from_timestamp(reset, 0)
        .ok_or_else(|| ApiError::InvalidRateLimitHeader("X-Rate-Limit-Reset".to_string()))?;

    Ok((limit.max(0) as u64, remaining.max(0) as u64, reset))
}
