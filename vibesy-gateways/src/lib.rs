//! HTTP implementations of the gateways defined in `vibesy-core`.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use vibesy_core::NetworkError;

pub mod api;
pub mod nominatim;

pub(crate) fn transport_error(err: reqwest::Error) -> NetworkError {
    NetworkError::Transport(err.to_string())
}

pub(crate) async fn into_json<T>(response: Response) -> Result<T, NetworkError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    parse_response(status, &body)
}

pub(crate) async fn ensure_success(response: Response) -> Result<(), NetworkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.map_err(transport_error)?;
    Err(error_from_body(status, &body))
}

fn parse_response<T>(status: StatusCode, body: &str) -> Result<T, NetworkError>
where
    T: DeserializeOwned,
{
    // ensure we've got 2xx status
    if !status.is_success() {
        return Err(error_from_body(status, body));
    }
    serde_json::from_str(body).map_err(|err| NetworkError::InvalidResponse(err.to_string()))
}

/// Prefer the `detail` of a JSON error body, otherwise use the text as is.
fn error_from_body(status: StatusCode, body: &str) -> NetworkError {
    let message = match serde_json::from_str::<vibesy_boundary::Error>(body) {
        Ok(err) => err.detail,
        Err(_) => {
            let text = body.trim();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text.to_string()
            }
        }
    };
    NetworkError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_the_detail_of_error_bodies() {
        let err = error_from_body(StatusCode::BAD_REQUEST, r#"{"detail":"Invalid token"}"#);
        assert_eq!(
            err,
            NetworkError::Status {
                status: 400,
                message: "Invalid token".into()
            }
        );
    }

    #[test]
    fn fall_back_to_the_raw_error_text() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "  upstream timed out\n");
        assert_eq!(
            err,
            NetworkError::Status {
                status: 502,
                message: "upstream timed out".into()
            }
        );
        let err = error_from_body(StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(
            err,
            NetworkError::Status {
                status: 503,
                message: "Service Unavailable".into()
            }
        );
    }

    #[test]
    fn reject_invalid_json() {
        let res = parse_response::<Vec<String>>(StatusCode::OK, "<html>");
        assert!(matches!(res, Err(NetworkError::InvalidResponse(_))));
        let res = parse_response::<Vec<String>>(StatusCode::OK, r#"["a"]"#);
        assert_eq!(res, Ok(vec!["a".to_string()]));
    }
}
