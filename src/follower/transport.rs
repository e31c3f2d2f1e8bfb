//! Delivery of heartbeats to the coordinator
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::api::paths;
use crate::error::{PulseError, Result};
use crate::heartbeat::HeartbeatMessage;
use crate::transport_error;

#[async_trait]
pub trait HeartbeatTransport: Send + Sync {
    /// Deliver one heartbeat and return the coordinator's acknowledgment
    async fn send_heartbeat(&self, heartbeat: &HeartbeatMessage) -> Result<HeartbeatMessage>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// JSON over HTTP, matching the coordinator's `SendHeartBeat` route
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(leader: &Url) -> Result<Self> {
        let endpoint = leader.join(paths::drop_leading_slash(paths::rpc::SEND_HEARTBEAT))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl HeartbeatTransport for HttpTransport {
    async fn send_heartbeat(&self, heartbeat: &HeartbeatMessage) -> Result<HeartbeatMessage> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(heartbeat)
            .send()
            .await
            .map_err(|e| transport_error!("could not reach {}: {}", self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            if status.is_client_error() {
                return Err(PulseError::InvalidRequest(message));
            }
            return Err(transport_error!("coordinator answered {}: {}", status, message));
        }

        let ack: HeartbeatMessage = response.json().await?;
        if &ack != heartbeat {
            return Err(transport_error!(
                "acknowledgment {:?} does not match heartbeat {:?}",
                ack,
                heartbeat
            ));
        }
        Ok(ack)
    }
}
