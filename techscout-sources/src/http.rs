//! Shared HTTP plumbing for the source providers.

use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use techscout_core::error::SourceError;

pub const USER_AGENT: &str = "TechScout/0.1 (Technology Scouting Tool)";

/// Longest response excerpt kept in an error message.
const ERROR_BODY_LIMIT: usize = 200;

pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::Network {
            provider: "http".to_string(),
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Transport failures are all transient from the adapter's point of view.
pub fn send_error(provider: &str, err: reqwest::Error) -> SourceError {
    let message = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    };
    SourceError::Network {
        provider: provider.to_string(),
        message,
    }
}

/// Map a non-success status to the matching [`SourceError`].
pub fn status_error(
    provider: &str,
    status: StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> SourceError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        SourceError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs: retry_after,
        }
    } else if status.is_server_error() {
        SourceError::Server {
            provider: provider.to_string(),
            status: status.as_u16(),
        }
    } else {
        SourceError::Http {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: body.chars().take(ERROR_BODY_LIMIT).collect(),
        }
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Read the body as text, failing on a non-success status.
pub async fn read_text(provider: &str, response: Response) -> Result<String, SourceError> {
    let status = response.status();
    let retry_after = retry_after_secs(&response);
    let body = response
        .text()
        .await
        .map_err(|e| send_error(provider, e))?;
    if !status.is_success() {
        return Err(status_error(provider, status, retry_after, &body));
    }
    Ok(body)
}

/// Read the body as JSON, failing on a non-success status.
pub async fn read_json(provider: &str, response: Response) -> Result<Value, SourceError> {
    let body = read_text(provider, response).await?;
    serde_json::from_str(&body).map_err(|e| SourceError::Parse {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// Items under `key` in a JSON payload, or a parse error when the key is
/// missing or not a list.
pub fn items<'a>(provider: &str, payload: &'a Value, key: &str) -> Result<&'a [Value], SourceError> {
    match payload.get(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) => Ok(&[]),
        _ => Err(SourceError::Parse {
            provider: provider.to_string(),
            message: format!("expected a '{}' list", key),
        }),
    }
}
