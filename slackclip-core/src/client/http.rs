use std::env;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::COOKIE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::client::ThreadClient;
use crate::error::{Result, SlackclipError};
use crate::model::{Message, SessionCookie};

const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const REPLIES_METHOD: &str = "conversations.replies";
const USER_INFO_METHOD: &str = "users.info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL for the Web API. Override to point at a mock server.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    /// Default config, with the base URL taken from `SLACKCLIP_API_BASE` when set.
    pub fn from_env() -> Self {
        let config = Self::default();
        match env::var("SLACKCLIP_API_BASE") {
            Ok(base_url) if !base_url.is_empty() => config.with_base_url(base_url),
            _ => config,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RepliesPayload {
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct UserInfoPayload {
    user: UserRecord,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    profile: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
struct UserProfile {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    real_name: String,
}

impl UserProfile {
    // display_name is frequently blank; real_name is the usual fallback.
    fn preferred_name(self) -> String {
        if self.display_name.is_empty() {
            self.real_name
        } else {
            self.display_name
        }
    }
}

/// [`ThreadClient`] over the Web API, authenticating as the signed-in user
/// with a token query parameter and the session cookie.
#[derive(Debug, Clone)]
pub struct HttpThreadClient {
    config: ApiConfig,
    client: Client,
}

impl HttpThreadClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| SlackclipError::ApiTransport {
                method: "client".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self { config, client })
    }

    pub fn with_client(config: ApiConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.config.base_url)
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        token: &str,
        cookie: &SessionCookie,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.api_url(method);
        let mut query = vec![("token", token)];
        query.extend_from_slice(params);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header(COOKIE, cookie.header_value())
            .send()
            .map_err(|err| SlackclipError::ApiTransport {
                method: method.to_string(),
                message: err.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(method, status = status.as_u16(), "Slack API returned error status");
            return Err(SlackclipError::ApiHttp {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|err| SlackclipError::ApiTransport {
            method: method.to_string(),
            message: err.without_url().to_string(),
        })?;

        let value = serde_json::from_str::<Value>(&body).map_err(|err| {
            SlackclipError::ApiResponse {
                method: method.to_string(),
                detail: format!("invalid JSON ({err}). Got {body}"),
            }
        })?;

        if value.get("ok").and_then(Value::as_bool) != Some(true) {
            let detail = value
                .get("error")
                .and_then(Value::as_str)
                .map_or_else(|| format!("missing \"ok\" flag. Got: {value}"), |code| {
                    format!("error \"{code}\"")
                });
            return Err(SlackclipError::ApiResponse {
                method: method.to_string(),
                detail,
            });
        }

        serde_json::from_value(value).map_err(|err| SlackclipError::ApiResponse {
            method: method.to_string(),
            detail: err.to_string(),
        })
    }
}

impl ThreadClient for HttpThreadClient {
    #[instrument(skip(self, token, cookie))]
    fn fetch_replies(
        &self,
        token: &str,
        cookie: &SessionCookie,
        channel_id: &str,
        timestamp: &str,
    ) -> Result<Vec<Message>> {
        debug!("fetching thread replies");
        let payload: RepliesPayload = self.call(
            REPLIES_METHOD,
            token,
            cookie,
            &[("channel", channel_id), ("ts", timestamp)],
        )?;
        debug!(count = payload.messages.len(), "fetched thread replies");
        Ok(payload.messages)
    }

    #[instrument(skip(self, token, cookie))]
    fn fetch_display_name(
        &self,
        token: &str,
        cookie: &SessionCookie,
        user_id: &str,
    ) -> Result<String> {
        let payload: UserInfoPayload =
            self.call(USER_INFO_METHOD, token, cookie, &[("user", user_id)])?;
        Ok(payload.user.profile.preferred_name())
    }
}
