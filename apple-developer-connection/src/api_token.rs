//! [Doc](https://developer.apple.com/documentation/appstoreconnectapi/generating_tokens_for_api_requests)

use core::time::Duration;

use chrono::{serde::ts_seconds, DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{encode, errors::Error as JsonwebtokenError, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::connection::JwtConnection;

pub const AUDIENCE: &str = "appstoreconnect-v1";
// 180 days, only accepted for some GET requests
pub const EXPIRATION_TIME_DURATION_SECONDS_MAX: u64 = 60 * 60 * 24 * 180;
// 20 minutes
pub const EXPIRATION_TIME_DURATION_SECONDS_MAX_FOR_MOST_REQUESTS: u64 = 60 * 20;

//
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Claims {
    pub iss: String,
    #[serde(with = "ts_seconds")]
    pub iat: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub exp: DateTime<Utc>,
    pub aud: String,
}

impl JwtConnection {
    /// Mints an App Store Connect API token from the connection's API key.
    pub fn app_store_connect_token(
        &self,
        issued_at: impl Into<Option<DateTime<Utc>>>,
        expiration_time_dur: impl Into<Option<Duration>>,
    ) -> Result<String, ApiTokenError> {
        if self.key_id.is_empty() || self.issuer_id.is_empty() {
            return Err(ApiTokenError::MissingKeyInfo);
        }

        let key = EncodingKey::from_ec_pem(self.private_key.trim().as_bytes())
            .map_err(ApiTokenError::MakeEncodingKeyFailed)?;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.to_owned());

        let issued_at = issued_at.into().unwrap_or_else(Utc::now);
        let expiration_time_dur = expiration_time_dur
            .into()
            .unwrap_or(Duration::from_secs(
                EXPIRATION_TIME_DURATION_SECONDS_MAX_FOR_MOST_REQUESTS,
            ))
            .min(Duration::from_secs(EXPIRATION_TIME_DURATION_SECONDS_MAX));
        let expiration_time =
            issued_at + ChronoDuration::seconds(expiration_time_dur.as_secs() as i64);

        let claims = Claims {
            iss: self.issuer_id.to_owned(),
            iat: issued_at,
            exp: expiration_time,
            aud: AUDIENCE.to_owned(),
        };

        encode(&header, &claims, &key).map_err(ApiTokenError::EncodeFailed)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ApiTokenError {
    #[error("key_id and issuer_id are required")]
    MissingKeyInfo,
    #[error("failed to read private key: {0}")]
    MakeEncodingKeyFailed(JsonwebtokenError),
    #[error("failed to encode token: {0}")]
    EncodeFailed(JsonwebtokenError),
}
