//! Legacy domain status probing.
//!
//! # Responsibilities
//! - Issue a single HEAD request against the legacy domain
//! - Report the status code without following redirects
//! - Bound every probe with a timeout

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

const USER_AGENT: &str = concat!("jumplinks-legacy-probe/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build probe client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("probe of {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("probe of {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Answers "what status would this URL return?".
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<u16, ProbeError>;
}

/// HEAD-request probe backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(ProbeError::Client)?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl StatusProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<u16, ProbeError> {
        let response = self.client.head(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                ProbeError::Request {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        Ok(response.status().as_u16())
    }
}
