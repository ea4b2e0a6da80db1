use core::time::Duration;
use std::io::{self, Read as _};

use isahc::{
    config::Configurable as _,
    http::{Request, Response},
};

//
pub trait HttpClient {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The returned body is fully read.
    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, Self::Error>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    type Error = T::Error;

    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, Self::Error> {
        (**self).send(request)
    }
}

//
#[derive(Debug, Clone)]
pub struct IsahcClient {
    inner: isahc::HttpClient,
}

impl IsahcClient {
    pub fn new() -> Result<Self, isahc::Error> {
        Self::with_timeout(None)
    }

    pub fn with_timeout(timeout: impl Into<Option<Duration>>) -> Result<Self, isahc::Error> {
        let mut builder = isahc::HttpClient::builder();
        if let Some(timeout) = timeout.into() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            inner: builder.build()?,
        })
    }
}

impl HttpClient for IsahcClient {
    type Error = IsahcClientError;

    fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, Self::Error> {
        let response = self
            .inner
            .send(request)
            .map_err(IsahcClientError::RespondFailed)?;

        let (parts, mut body) = response.into_parts();
        let mut buf = vec![];
        body.read_to_end(&mut buf)
            .map_err(IsahcClientError::ReadBodyFailed)?;

        Ok(Response::from_parts(parts, buf))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum IsahcClientError {
    #[error("failed to perform request: {0}")]
    RespondFailed(isahc::Error),
    #[error("failed to read response body: {0}")]
    ReadBodyFailed(io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_timeout() {
        assert!(IsahcClient::new().is_ok());
        assert!(IsahcClient::with_timeout(Duration::from_secs(5)).is_ok());
    }
}
