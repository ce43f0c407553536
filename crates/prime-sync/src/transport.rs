//! Blocking HTTP transport with basic authentication

use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tracing::{trace, warn};

use crate::error::FetchError;

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET request
///
/// Implementations must not retry; any failure ends the run.
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Connection settings for [`BasicAuthTransport`]
#[derive(Debug)]
pub struct HttpSettings {
    pub user: String,
    pub password: Secret<String>,
    /// Verify the server certificate chain
    pub validate_certs: bool,
    /// Per-request timeout
    pub timeout: Duration,
}

/// reqwest-backed transport sending basic credentials with every request
pub struct BasicAuthTransport {
    client: reqwest::blocking::Client,
    user: String,
    password: Secret<String>,
}

impl BasicAuthTransport {
    pub fn new(settings: HttpSettings) -> Result<Self, reqwest::Error> {
        if !settings.validate_certs {
            warn!("TLS certificate validation is disabled");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(!settings.validate_certs)
            .build()?;

        Ok(Self {
            client,
            user: settings.user,
            password: settings.password,
        })
    }
}

impl Transport for BasicAuthTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        trace!(url = %url, "Sending GET request");

        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source: Box::new(e),
        };

        let response = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(self.password.expose_secret()))
            .send()
            .map_err(request_error)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(request_error)?;

        Ok(HttpResponse { status, body })
    }
}
