use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::errors::CapabilityError;

const MAX_ERROR_BODY: usize = 500;

pub(super) fn build_client(timeout_secs: u64) -> Result<Client, CapabilityError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|err| CapabilityError::InvalidConfig(format!("failed to build HTTP client: {err}")))
}

/// Send a request and decode a JSON body, mapping failures to [`CapabilityError`].
pub(super) fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout_secs: u64,
) -> Result<T, CapabilityError> {
    let response = request.send().map_err(|err| {
        if err.is_timeout() {
            CapabilityError::Timeout {
                after_secs: timeout_secs,
            }
        } else if err.is_connect() {
            CapabilityError::Unavailable(format!("connection failed: {err}"))
        } else {
            CapabilityError::Unavailable(err.to_string())
        }
    })?;

    let response = check_status(response)?;
    response.json::<T>().map_err(|err| {
        if err.is_timeout() {
            CapabilityError::Timeout {
                after_secs: timeout_secs,
            }
        } else {
            CapabilityError::MalformedResponse(err.to_string())
        }
    })
}

fn check_status(response: Response) -> Result<Response, CapabilityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: String = response
        .text()
        .unwrap_or_default()
        .chars()
        .take(MAX_ERROR_BODY)
        .collect();
    Err(status_error(status, body))
}

pub(super) fn status_error(status: StatusCode, body: String) -> CapabilityError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        CapabilityError::Unavailable(format!("status {}: {body}", status.as_u16()))
    } else {
        CapabilityError::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_and_server_errors_are_transient() {
        assert!(status_error(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(status_error(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert!(!status_error(StatusCode::UNAUTHORIZED, String::new()).is_retryable());
    }
}
