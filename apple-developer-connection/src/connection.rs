//! [Doc](https://devcenter.bitrise.io/getting-started/configuring-bitrise-steps-that-require-apple-developer-account-data/)

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

//
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AppleDeveloperConnection {
    pub session_connection: Option<SessionConnection>,
    pub jwt_connection: Option<JwtConnection>,
    pub test_devices: Vec<TestDevice>,
}

impl AppleDeveloperConnection {
    /// An empty body decodes to an empty connection.
    pub fn from_json_slice(body: impl AsRef<[u8]>) -> Result<Self, serde_json::Error> {
        let body = body.as_ref();
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let data: Data = serde_json::from_slice(body)?;
        Ok(data.into())
    }
}

/// Bitrise.io session-based Apple Developer connection.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConnection {
    #[serde(deserialize_with = "null_as_default")]
    pub apple_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub password: String,
    #[serde(deserialize_with = "null_as_default")]
    pub connection_expiry_date: String,
    #[serde(deserialize_with = "cookie_jar")]
    pub session_cookies: HashMap<String, Vec<Cookie>>,
}

/// [Doc](https://github.com/bitrise-io/apple-dev-portal-api/blob/master/models/serializablecookie.go)
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Cookie {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_domain: Option<bool>,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub secure: bool,
    #[serde(rename = "httponly", deserialize_with = "null_as_default")]
    pub http_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<String>,
}

impl Cookie {
    pub fn for_domain_or_default(&self) -> bool {
        self.for_domain.unwrap_or(true)
    }
}

/// App Store Connect API key.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct JwtConnection {
    #[serde(deserialize_with = "null_as_default")]
    pub key_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub issuer_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub private_key: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TestDevice {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub user_id: i64,
    #[serde(rename = "device_identifier", deserialize_with = "null_as_default")]
    pub device_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub device_type: String,
}

// `null` reads as the zero value, like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn cookie_jar<'de, D>(deserializer: D) -> Result<HashMap<String, Vec<Cookie>>, D::Error>
where
    D: Deserializer<'de>,
{
    let jar = Option::<HashMap<String, Option<Vec<Cookie>>>>::deserialize(deserializer)?;
    Ok(jar
        .unwrap_or_default()
        .into_iter()
        .map(|(domain, cookies)| (domain, cookies.unwrap_or_default()))
        .collect())
}

//
// The payload is flat, session and jwt keys share the top level object.
//
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Data {
    apple_id: Option<String>,
    password: Option<String>,
    connection_expiry_date: Option<String>,
    session_cookies: Option<HashMap<String, Option<Vec<Cookie>>>>,

    key_id: Option<String>,
    issuer_id: Option<String>,
    private_key: Option<String>,

    test_devices: Option<Vec<TestDevice>>,
}

impl From<Data> for AppleDeveloperConnection {
    fn from(data: Data) -> Self {
        let session_connection = if data.apple_id.is_some()
            || data.password.is_some()
            || data.connection_expiry_date.is_some()
            || data.session_cookies.is_some()
        {
            Some(SessionConnection {
                apple_id: data.apple_id.unwrap_or_default(),
                password: data.password.unwrap_or_default(),
                connection_expiry_date: data.connection_expiry_date.unwrap_or_default(),
                session_cookies: data
                    .session_cookies
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(domain, cookies)| (domain, cookies.unwrap_or_default()))
                    .collect(),
            })
        } else {
            None
        };

        let jwt_connection =
            if data.key_id.is_some() || data.issuer_id.is_some() || data.private_key.is_some() {
                Some(JwtConnection {
                    key_id: data.key_id.unwrap_or_default(),
                    issuer_id: data.issuer_id.unwrap_or_default(),
                    private_key: data.private_key.unwrap_or_default(),
                })
            } else {
                None
            };

        Self {
            session_connection,
            jwt_connection,
            test_devices: data.test_devices.unwrap_or_default(),
        }
    }
}
