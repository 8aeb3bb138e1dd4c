//! HTTP client for the configuration API

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::api::response::{ApiError, ApiResponse};
use crate::api::ConfigService;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{ApiObject, Checksum};

/// Configuration API client
pub struct ApiClient {
    client: Client,
    config: Config,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tbnctl/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Build request with authentication headers
    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.client.request(method, url);

        for (key, value) in self.config.auth_headers() {
            req = req.header(key, value);
        }

        req = req.header("Content-Type", "application/json");

        req
    }

    /// Send a request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.config.api_url, path);
        debug!("{} {}", method, url);

        let mut req = self.build_request(method, &url);
        if let Some(body) = body {
            trace!("Request body: {}", body);
            req = req.json(&body);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;
        trace!("Response: {}", text);

        let envelope: ApiResponse<Value> = if text.trim().is_empty() {
            ApiResponse {
                result: None,
                error: None,
            }
        } else {
            match serde_json::from_str(&text) {
                Ok(envelope) => envelope,
                Err(_) if !status.is_success() => ApiResponse {
                    result: None,
                    error: Some(ApiError {
                        message: text.trim().to_string(),
                        ..Default::default()
                    }),
                },
                Err(e) => return Err(e.into()),
            }
        };

        if let Some(err) = envelope.error {
            return Err(status_error(status, err.describe()));
        }
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("request failed");
            return Err(status_error(status, reason.to_string()));
        }

        Ok(serde_json::from_value(envelope.result.unwrap_or(Value::Null))?)
    }

    fn object_path<T: ApiObject>(key: &T::Key) -> String {
        format!("{}/{}", T::KIND.path(), urlencoding::encode(key.as_ref()))
    }
}

/// Map a non-success response to the error kind callers branch on
fn status_error(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Error::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl ConfigService for ApiClient {
    async fn create<T: ApiObject>(&self, object: &T) -> Result<T> {
        let body = serde_json::to_value(object)?;
        self.send(Method::POST, T::KIND.path(), Some(body)).await
    }

    async fn get<T: ApiObject>(&self, key: &T::Key) -> Result<T> {
        self.send(Method::GET, &Self::object_path::<T>(key), None)
            .await
    }

    async fn modify<T: ApiObject>(&self, object: &T) -> Result<T> {
        let body = serde_json::to_value(object)?;
        self.send(Method::PUT, &Self::object_path::<T>(object.key()), Some(body))
            .await
    }

    async fn delete<T: ApiObject>(&self, key: &T::Key, checksum: &Checksum) -> Result<()> {
        let path = format!(
            "{}?checksum={}",
            Self::object_path::<T>(key),
            urlencoding::encode(checksum.as_str())
        );
        let _: Value = self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn index<T: ApiObject>(&self, filters: &[T::Filter]) -> Result<Vec<T>> {
        let path = if filters.is_empty() {
            T::KIND.path().to_string()
        } else {
            let encoded = serde_json::to_string(filters)?;
            format!("{}?filters={}", T::KIND.path(), urlencoding::encode(&encoded))
        };

        let found: Option<Vec<T>> = self.send(Method::GET, &path, None).await?;
        Ok(found.unwrap_or_default())
    }
}
