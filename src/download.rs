use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Result, TrackliftError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// Initialize HTTP client with default configuration
fn get_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(DEFAULT_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Get default headers for requests
fn get_default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers
}

/// Create custom headers with additional values
fn create_custom_headers(additional_headers: Option<HeaderMap>) -> HeaderMap {
    let mut headers = get_default_headers();

    if let Some(custom) = additional_headers {
        headers.extend(custom);
    }

    headers
}

/// Execute HTTP request with error handling
async fn execute_request(
    client: reqwest::Client,
    url: &str,
    headers: Option<HeaderMap>,
) -> Result<reqwest::Response> {
    let request_headers = create_custom_headers(headers);
    let request = client.get(url).headers(request_headers);

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            TrackliftError::RequestTimeout(url.to_string())
        } else {
            TrackliftError::NetworkError(e)
        }
    })?;

    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TrackliftError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

/// Download and parse JSON response from URL
pub async fn download_json<T: DeserializeOwned>(url: &str) -> Result<T> {
    let client = get_http_client();
    let response = execute_request(client, url, None).await?;
    response.json::<T>().await.map_err(TrackliftError::from)
}

/// Download and parse JSON response with custom headers
pub async fn download_json_with_headers<T: DeserializeOwned>(
    url: &str,
    headers: HeaderMap,
) -> Result<T> {
    let client = get_http_client();
    let response = execute_request(client, url, Some(headers)).await?;
    response.json::<T>().await.map_err(TrackliftError::from)
}

/// Download text content from URL
pub async fn download_text(url: &str) -> Result<String> {
    let client = get_http_client();
    let response = execute_request(client, url, None).await?;
    response.text().await.map_err(TrackliftError::from)
}

/// Download text content from URL with custom headers
pub async fn download_text_with_headers(url: &str, headers: HeaderMap) -> Result<String> {
    let client = get_http_client();
    let response = execute_request(client, url, Some(headers)).await?;
    response.text().await.map_err(TrackliftError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_headers_keep_default_user_agent() {
        let headers = create_custom_headers(None);
        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            DEFAULT_USER_AGENT
        );
    }

    #[test]
    fn test_custom_headers_extend() {
        let mut extra = HeaderMap::new();
        extra.insert("Referer", HeaderValue::from_static("https://example.com/"));
        let headers = create_custom_headers(Some(extra));
        assert!(headers.get(USER_AGENT).is_some());
        assert_eq!(
            headers.get("Referer").unwrap().to_str().unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_custom_headers_override_user_agent() {
        let mut extra = HeaderMap::new();
        extra.insert(USER_AGENT, HeaderValue::from_static("custom-agent"));
        let headers = create_custom_headers(Some(extra));
        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            "custom-agent"
        );
    }
}
