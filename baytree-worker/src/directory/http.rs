/// Response status checks shared by all directory calls
///
/// 429 becomes [`DirectoryError::RateLimited`] (honouring `Retry-After`,
/// 60 s when absent or unparseable); any other non-success status becomes
/// [`DirectoryError::Status`] carrying the body.

use super::error::DirectoryError;

/// Returns the response unchanged when its status is a success
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, DirectoryError> {
    let status = resp.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(DirectoryError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        });
    }

    if !status.is_success() {
        return Err(DirectoryError::Status {
            status: status.as_u16(),
            body: resp.text().await.unwrap_or_default(),
        });
    }

    Ok(resp)
}

fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    fn mock_response_with_retry_after(value: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(429)
                .header("Retry-After", value)
                .body("")
                .unwrap(),
        )
    }

    #[test]
    fn parse_retry_after_from_header() {
        assert_eq!(parse_retry_after(&mock_response_with_retry_after("120")), 120);
    }

    #[test]
    fn parse_retry_after_fallbacks() {
        assert_eq!(parse_retry_after(&mock_response(429, "")), 60);
        assert_eq!(parse_retry_after(&mock_response_with_retry_after("soon")), 60);
    }

    #[tokio::test]
    async fn check_response_rate_limited() {
        let err = check_response(mock_response_with_retry_after("30")).await.unwrap_err();
        assert!(matches!(err, DirectoryError::RateLimited { retry_after_secs: 30 }));
    }

    #[tokio::test]
    async fn check_response_keeps_error_body() {
        let err = check_response(mock_response(401, "bad credentials")).await.unwrap_err();
        match err {
            DirectoryError::Status { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn check_response_success() {
        let resp = check_response(mock_response(200, "{}")).await.unwrap();
        assert_eq!(resp.text().await.unwrap(), "{}");
    }
}
