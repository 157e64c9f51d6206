use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;

use super::Transport;
use crate::error::ConnectorError;

pub const DEFAULT_BASE_URL: &str = "https://api.nowcapital.ca";
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug)]
pub struct Credentials {
    api_key: SecretString,
    base_url: String,
}

impl Credentials {
    pub fn new(api_key: SecretString, base_url: Option<&str>) -> Result<Self, ConnectorError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConnectorError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }

        let base_url = base_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(ConnectorError::Configuration(format!(
                "base URL must start with http:// or https://, got `{base_url}`"
            )));
        }

        Ok(Self { api_key, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

pub struct HttpTransport {
    client: Client,
    credentials: Credentials,
}

impl HttpTransport {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            credentials,
        })
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ConnectorError> {
        let response = request
            .header(API_KEY_HEADER, self.credentials.api_key.expose_secret())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ConnectorError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: Value) -> Result<Value, ConnectorError> {
        debug!(path, "POST");
        self.send(self.client.post(self.credentials.url(path)).json(&body))
            .await
    }

    async fn get_json(&self, path: &str) -> Result<Value, ConnectorError> {
        debug!(path, "GET");
        self.send(self.client.get(self.credentials.url(path))).await
    }
}
