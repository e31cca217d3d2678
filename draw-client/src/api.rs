use std::time::Duration;

use draw_core::normalize_snapshot_str;
use draw_types::{DrawError, DrawRequest, RequestRejection, StateSnapshot};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::push::sse::SseError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("backend unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("event stream rejected: {0}")]
    Stream(#[from] SseError),
}

impl ApiError {
    pub fn into_draw_error(self) -> DrawError {
        match self {
            ApiError::Transport(e) => DrawError::request(RequestRejection::Unreachable, e.to_string()),
            ApiError::Stream(e) => DrawError::request(RequestRejection::Unreachable, e.to_string()),
            ApiError::Status { status, message } => {
                let kind = match StatusCode::from_u16(status) {
                    Ok(StatusCode::UNAUTHORIZED) | Ok(StatusCode::FORBIDDEN) => {
                        RequestRejection::Unauthorized
                    }
                    _ => RequestRejection::Backend { status },
                };
                DrawError::request(kind, message)
            }
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The backend's plain HTTP endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `GET /api/state`. Any 2xx body goes through the normalizer, so a
    /// malformed body yields an empty snapshot rather than an error.
    pub async fn fetch_state(&self) -> Result<StateSnapshot, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/state", self.base))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        debug!("Fetched state ({} bytes)", body.len());
        Ok(normalize_snapshot_str(&body))
    }

    /// `POST /api/auth/login`, returning the bearer token.
    pub async fn login(&self, password: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(format!("{}/api/auth/login", self.base))
            .json(&LoginRequest { password })
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: LoginResponse = response.json().await?;
        Ok(body.token)
    }

    /// `POST /api/draw`. Only the acknowledgement matters; the outcome of the
    /// draw arrives on the push channel.
    pub async fn request_draw(&self, token: &str, request: &DrawRequest) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/api/draw", self.base))
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    };
    warn!("Backend answered {}: {}", status, message);

    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
