use std::{
    future::Future,
    time::Duration,
};

use reqwest::Client;
use serde_json::Value;

use crate::{
    anki::types::ApiResponse,
    core::BridgeError,
};

/// Protocol version carried by every request. A bridge answering a liveness
/// probe with anything below this is treated as unavailable.
pub const API_VERSION: u32 = 6;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// The one capability the bridge client needs from a transport: send an
/// action with its params, get the response envelope back. HTTP JSON-RPC is
/// the production implementation; alternative transports slot in here.
pub trait BridgeTransport {
    fn invoke(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> impl Future<Output = Result<ApiResponse<Value>, BridgeError>> + Send;
}

/// JSON over HTTP POST to the bridge's base URL.
pub struct HttpTransport {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { http: Client::new(), base_url: base_url.into(), timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn normalize(&self, error: reqwest::Error) -> BridgeError {
        if error.is_timeout() {
            BridgeError::Timeout(self.timeout)
        } else {
            BridgeError::Transport(error.to_string())
        }
    }
}

impl BridgeTransport for HttpTransport {
    async fn invoke(
        &self,
        action: &str,
        params: Option<Value>,
    ) -> Result<ApiResponse<Value>, BridgeError> {
        let mut body = serde_json::Map::new();
        body.insert("action".to_string(), Value::String(action.to_string()));
        body.insert("version".to_string(), Value::Number(API_VERSION.into()));

        if let Some(params) = params {
            body.insert("params".to_string(), params);
        }

        let response = self
            .http
            .post(&self.base_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.normalize(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Transport(format!(
                "HTTP error {} from {}",
                status, self.base_url
            )));
        }

        response.json::<ApiResponse<Value>>().await.map_err(|e| self.normalize(e))
    }
}
