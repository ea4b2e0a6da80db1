//! Apple Developer Portal connection data of a Bitrise build: session cookies, API key and test devices.

pub mod api_token;
pub mod client;
pub mod config;
pub mod connection;
pub mod fetch;
pub mod session;

pub use isahc::http;

pub use api_token::ApiTokenError;
pub use client::{HttpClient, IsahcClient, IsahcClientError};
pub use config::BuildConfig;
pub use connection::{
    AppleDeveloperConnection, Cookie, JwtConnection, SessionConnection, TestDevice,
};
pub use fetch::{ensure_connection, AppleDeveloperConnectionProvider, BitriseClient, FetchError};
pub use session::{
    write_ruby_cookie, SessionRenderError, APPLE_ID_COOKIE_DOMAIN, FASTLANE_SESSION_ENV,
};
