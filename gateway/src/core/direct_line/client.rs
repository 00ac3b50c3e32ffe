//! Direct Line v3 REST client.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::messages::{Activity, ActivitySet, DirectLineConversation, ResourceResponse};

/// Public Direct Line endpoint.
pub const DIRECT_LINE_BASE_URL: &str = "https://directline.botframework.com/v3/directline";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors returned by the Direct Line API.
#[derive(Debug, Error)]
pub enum DirectLineError {
    #[error("Direct Line request failed: {0}")]
    Request(String),

    #[error("Direct Line API error: {status}")]
    Api { status: u16 },

    #[error("Failed to decode Direct Line response: {0}")]
    Decode(String),
}

pub type DirectLineResult<T> = Result<T, DirectLineError>;

/// Direct Line credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectLineConfig {
    /// Direct Line secret or token, sent as a bearer token
    pub token: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DIRECT_LINE_BASE_URL.to_string()
}

impl DirectLineConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: default_base_url(),
        }
    }
}

/// Client for one bot's Direct Line channel.
#[derive(Clone)]
pub struct DirectLineClient {
    config: DirectLineConfig,
    client: reqwest::Client,
}

impl DirectLineClient {
    pub fn new(config: DirectLineConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Start a new bot conversation.
    pub async fn start_conversation(&self) -> DirectLineResult<DirectLineConversation> {
        let request = self.client.post(self.url("/conversations"));
        self.execute(request).await
    }

    /// Post an activity to a conversation. The activity is sent as-is.
    pub async fn send_activity(
        &self,
        conversation_id: &str,
        activity: &Activity,
    ) -> DirectLineResult<ResourceResponse> {
        let request = self
            .client
            .post(self.url(&format!("/conversations/{conversation_id}/activities")))
            .json(activity);
        self.execute(request).await
    }

    /// Fetch activities newer than `watermark`.
    pub async fn get_activities(
        &self,
        conversation_id: &str,
        watermark: Option<&str>,
    ) -> DirectLineResult<ActivitySet> {
        let mut request = self
            .client
            .get(self.url(&format!("/conversations/{conversation_id}/activities")));
        if let Some(watermark) = watermark {
            request = request.query(&[("watermark", watermark)]);
        }
        self.execute(request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> DirectLineResult<T> {
        let response = request
            .bearer_auth(&self.config.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| DirectLineError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Direct Line request rejected");
            return Err(DirectLineError::Api {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DirectLineError::Decode(e.to_string()))
    }
}

/// Query accepted by the activities endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ActivitiesQuery {
    pub watermark: Option<String>,
}
