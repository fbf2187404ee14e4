// Shared HTTP response handling
//
// Status-to-error mapping used by all three vendor clients.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;

const PREVIEW_CHARS: usize = 200;

/// First `PREVIEW_CHARS` characters of a response body, for error messages.
pub(crate) fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

/// Seconds advertised in `Retry-After`, defaulting to 1 when absent or
/// given as an HTTP date.
pub(crate) fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(1)
}

/// Pull a human message out of a JSON error body (`{error}`, `{message}`,
/// or `{error: {message}}`), else fall back to the raw preview.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let from_json = parsed.as_ref().and_then(|v| {
        let error = v.get("error");
        error
            .and_then(|e| e.get("message"))
            .or(error)
            .or_else(|| v.get("message"))
            .and_then(|m| match m {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
    });
    from_json.unwrap_or_else(|| preview(body).to_owned())
}

/// Map a non-success status onto the shared error variants.
///
/// Successful responses are handed back untouched.
pub(crate) async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(Error::RateLimited {
            retry_after_secs: retry_after_secs(resp.headers()),
        });
    }

    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Authentication {
            message: format!("HTTP {status}: {message}"),
        });
    }

    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

/// Check the status, then deserialize the body as `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let resp = check_status(resp).await?;
    let body = resp.text().await.map_err(Error::Transport)?;
    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn retry_after_defaults_to_one_second() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after_secs(&headers), 1);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(retry_after_secs(&headers), 7);
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"),
        );
        assert_eq!(retry_after_secs(&headers), 1);
    }

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(error_message(r#"{"error":"bad port"}"#), "bad port");
        assert_eq!(error_message(r#"{"message":"no such vlan"}"#), "no such vlan");
        assert_eq!(
            error_message(r#"{"error":{"code":7,"message":"locked"}}"#),
            "locked"
        );
        assert_eq!(error_message("<html>oops</html>"), "<html>oops</html>");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        assert_eq!(preview(&long).chars().count(), PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
