use isahc::http::{Method, Request, StatusCode};
use url::Url;

use crate::{client::HttpClient, config::BuildConfig, connection::AppleDeveloperConnection};

pub const APPLE_DEVELOPER_CONNECTION_PATH: &str = "apple_developer_portal_data.json";
pub const BUILD_API_TOKEN_HEADER: &str = "BUILD_API_TOKEN";

//
pub trait AppleDeveloperConnectionProvider {
    fn get_apple_developer_connection(
        &self,
        build_url: &str,
        build_api_token: &str,
    ) -> Result<AppleDeveloperConnection, FetchError>;
}

/// Fetches the Apple Developer connection of a build through the Bitrise.io build API.
#[derive(Debug, Clone)]
pub struct BitriseClient<C> {
    http_client: C,
}

impl<C> BitriseClient<C>
where
    C: HttpClient,
{
    pub fn new(http_client: C) -> Self {
        Self { http_client }
    }
}

impl<C> AppleDeveloperConnectionProvider for BitriseClient<C>
where
    C: HttpClient,
{
    fn get_apple_developer_connection(
        &self,
        build_url: &str,
        build_api_token: &str,
    ) -> Result<AppleDeveloperConnection, FetchError> {
        let url = endpoint_url(build_url)?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .header(BUILD_API_TOKEN_HEADER, build_api_token)
            .body(vec![])
            .map_err(FetchError::MakeRequestFailed)?;

        tracing::debug!("GET {url}");
        let response = self
            .http_client
            .send(request)
            .map_err(|err| FetchError::RespondFailed(Box::new(err)))?;

        let status = response.status();
        let body = response.into_body();
        tracing::debug!("GET {url} responded with status code: {status}");

        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        AppleDeveloperConnection::from_json_slice(&body).map_err(|err| FetchError::DecodeFailed {
            body: String::from_utf8_lossy(&body).into_owned(),
            source: err,
        })
    }
}

fn endpoint_url(build_url: &str) -> Result<Url, FetchError> {
    let url = format!(
        "{}/{APPLE_DEVELOPER_CONNECTION_PATH}",
        build_url.trim_end_matches('/')
    );
    Url::parse(&url).map_err(|err| FetchError::InvalidEndpoint {
        url: build_url.to_owned(),
        source: err,
    })
}

/// `Ok(None)` without touching the network when the build has no connection configured.
pub fn ensure_connection(
    provider: &impl AppleDeveloperConnectionProvider,
    config: Option<&BuildConfig>,
) -> Result<Option<AppleDeveloperConnection>, FetchError> {
    let config = match config {
        Some(x) => x,
        None => return Ok(None),
    };

    provider
        .get_apple_developer_connection(&config.build_url, &config.build_api_token)
        .map(Some)
}

//
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("invalid build url ({url}): {source}")]
    InvalidEndpoint { url: String, source: url::ParseError },
    #[error("failed to make request: {0}")]
    MakeRequestFailed(isahc::http::Error),
    #[error("failed to perform request: {0}")]
    RespondFailed(Box<dyn std::error::Error + Send + Sync>),
    #[error("request failed with status code: {status}, body: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },
    #[error("failed to unmarshal response ({body}): {source}")]
    DecodeFailed {
        body: String,
        source: serde_json::Error,
    },
}
