use std::env;

pub const BUILD_URL_ENV: &str = "BITRISE_BUILD_URL";
pub const BUILD_API_TOKEN_ENV: &str = "BITRISE_BUILD_API_TOKEN";

//
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub build_url: String,
    pub build_api_token: String,
}

impl BuildConfig {
    pub fn new(build_url: impl AsRef<str>, build_api_token: impl AsRef<str>) -> Self {
        Self {
            build_url: build_url.as_ref().to_owned(),
            build_api_token: build_api_token.as_ref().to_owned(),
        }
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Empty values count as unset. `None` means the connection is not configured for this build.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let build_url = lookup(BUILD_URL_ENV).filter(|x| !x.is_empty());
        let build_api_token = lookup(BUILD_API_TOKEN_ENV).filter(|x| !x.is_empty());

        match (build_url, build_api_token) {
            (Some(build_url), Some(build_api_token)) => Some(Self {
                build_url,
                build_api_token,
            }),
            _ => {
                tracing::warn!("{BUILD_URL_ENV} and/or {BUILD_API_TOKEN_ENV} envs are not set");
                None
            }
        }
    }
}
