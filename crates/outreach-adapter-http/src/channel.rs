//! Messaging channel over an HTTP gateway.

use async_trait::async_trait;
use outreach_core::{
    ChannelAddress, ChannelSender, ChannelValidator, Error, Reachability, Result, SendAck,
};
use serde::{Deserialize, Serialize};

use crate::client::HttpEndpoint;

#[derive(Deserialize)]
struct StatusResponse {
    connected: bool,
}

#[derive(Serialize)]
struct ValidateRequest<'a> {
    phone: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponse {
    exists: bool,
    #[serde(default)]
    address: Option<String>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    address: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

/// A messaging gateway reachable over HTTP.
///
/// - `GET {base}/status` answers `{connected}`
/// - `POST {base}/validate {phone}` answers `{exists, address?}`
/// - `POST {base}/send {address, message}` answers `{id}`
///
/// Sends are never retried: a duplicate message is worse than a lost one.
pub struct HttpChannel {
    endpoint: HttpEndpoint,
    client: reqwest::Client,
}

impl HttpChannel {
    /// Creates a channel client for `endpoint`.
    pub fn new(endpoint: HttpEndpoint) -> Result<Self> {
        Ok(Self {
            client: endpoint.client()?,
            endpoint,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint.url(path)?;
        let response = self
            .endpoint
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::channel_with_source(format!("{path} request failed: {e}"), e))?;
        response
            .json::<R>()
            .await
            .map_err(|e| Error::channel_with_source(format!("malformed {path} response: {e}"), e))
    }
}

#[async_trait]
impl ChannelValidator for HttpChannel {
    async fn validate(&self, phone: &str) -> Result<Reachability> {
        let answer: ValidateResponse = self.post("validate", &ValidateRequest { phone }).await?;
        Ok(match (answer.exists, answer.address) {
            (true, Some(address)) => Reachability::reachable(address),
            (true, None) => Reachability {
                is_reachable: true,
                channel_address: None,
            },
            (false, _) => Reachability::unreachable(),
        })
    }
}

#[async_trait]
impl ChannelSender for HttpChannel {
    async fn is_ready(&self) -> bool {
        let url = match self.endpoint.url("status") {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build channel status URL");
                return false;
            }
        };
        let response = self
            .endpoint
            .authorize(self.client.get(url))
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match response {
            Ok(r) => match r.json::<StatusResponse>().await {
                Ok(status) => status.connected,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed channel status");
                    false
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, "Channel status unavailable");
                false
            }
        }
    }

    async fn send(&self, address: &ChannelAddress, message: &str) -> Result<SendAck> {
        let answer: SendResponse = self
            .post(
                "send",
                &SendRequest {
                    address: address.as_str(),
                    message,
                },
            )
            .await?;
        Ok(SendAck {
            message_id: answer.id,
        })
    }
}
