//! Contact discovery over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use outreach_core::{Contact, ContactSource, Error, Result};
use reqwest::Url;

use crate::client::{HttpEndpoint, is_transient};

/// A failed attempt, tagged with whether another attempt may help.
struct Attempt {
    transient: bool,
    error: Error,
}

impl Attempt {
    fn from_reqwest(context: &str, e: reqwest::Error) -> Self {
        Self {
            transient: is_transient(&e),
            error: Error::discovery_with_source(format!("{context}: {e}"), e),
        }
    }
}

/// Discovers contacts with `GET {base}/contacts?category=..&locality=..`.
///
/// The service answers with a JSON array of `{id, name, phone, address}`.
/// Connection failures, timeouts, 429 and 5xx answers are retried with
/// exponential backoff.
pub struct HttpContactSource {
    endpoint: HttpEndpoint,
    client: reqwest::Client,
    max_retries: usize,
    min_delay: Duration,
}

impl HttpContactSource {
    /// Creates a source with three retries starting at 500ms.
    pub fn new(endpoint: HttpEndpoint) -> Result<Self> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
            max_retries: 3,
            min_delay: Duration::from_millis(500),
        })
    }

    /// Overrides the retry policy.
    pub fn with_retries(mut self, max_retries: usize, min_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.min_delay = min_delay;
        self
    }

    async fn fetch(&self, url: &Url) -> std::result::Result<Vec<Contact>, Attempt> {
        let request = self.endpoint.authorize(self.client.get(url.clone()));
        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Attempt::from_reqwest("contact request failed", e))?;
        response.json::<Vec<Contact>>().await.map_err(|e| Attempt {
            transient: false,
            error: Error::discovery_with_source(format!("malformed contact list: {e}"), e),
        })
    }
}

#[async_trait]
impl ContactSource for HttpContactSource {
    async fn discover(&self, category: &str, locality: &str) -> Result<Vec<Contact>> {
        let base = self.endpoint.url("contacts")?;
        let url = Url::parse_with_params(
            base.as_str(),
            &[("category", category), ("locality", locality)],
        )
        .map_err(|e| Error::discovery(format!("cannot build discovery URL: {e}")))?;

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_times(self.max_retries);

        let contacts = (|| self.fetch(&url))
            .retry(backoff)
            .when(|attempt| attempt.transient)
            .notify(|attempt, delay| {
                tracing::warn!(
                    error = %attempt.error,
                    retry_in_ms = delay.as_millis() as u64,
                    "Contact discovery failed, retrying"
                );
            })
            .await
            .map_err(|attempt| attempt.error)?;

        tracing::info!(category, locality, count = contacts.len(), "Contacts discovered");
        Ok(contacts)
    }

    fn name(&self) -> &str {
        "http"
    }
}
