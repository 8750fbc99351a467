//! Shared HTTP plumbing for Codefresh requests

use crate::error::{CodefreshError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const AGENT_VERSION_HEADER: &str = "Codefresh-Agent-Version";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    host: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl Transport {
    pub(crate) fn new(
        host: &str,
        token: &str,
        insecure: bool,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let host = Url::parse(host).map_err(|err| CodefreshError::InvalidHost {
            host: host.to_string(),
            reason: err.to_string(),
        })?;
        if host.cannot_be_a_base() {
            return Err(CodefreshError::InvalidHost {
                host: host.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(Self {
            host,
            token: (!token.is_empty()).then(|| token.to_string()),
            http,
        })
    }

    pub(crate) fn host(&self) -> &str {
        self.host.as_str().trim_end_matches('/')
    }

    /// Replaces the host path with `path`, as every Codefresh route is absolute
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        self.host
            .join(path)
            .map_err(|err| CodefreshError::InvalidRequest {
                reason: format!("cannot build URL for {path}: {err}"),
            })
    }

    pub(crate) async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        debug!(%method, %url, "Sending request to Codefresh");

        let mut request = self
            .http
            .request(method, url)
            .header(AGENT_VERSION_HEADER, venona_core::VERSION)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token);
        }
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let data = response.bytes().await?;
        if status.as_u16() >= 400 {
            return Err(CodefreshError::Api {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&data).into_owned(),
            });
        }
        Ok(data.to_vec())
    }
}
