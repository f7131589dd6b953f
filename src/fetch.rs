use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "remote-image-saver/0.1";
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);
pub const GET_TIMEOUT: Duration = Duration::from_secs(30);

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Client(String),
    #[error("{0}")]
    Request(String),
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(insecure: bool) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            reqwest::header::HeaderValue::from_static("image/*,*/*;q=0.8"),
        );

        let mut builder = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(USER_AGENT)
            .default_headers(headers);

        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn head(&self, url: &str) -> Result<HeadResponse, FetchError> {
        let response = self
            .client
            .head(url)
            .timeout(HEAD_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        Ok(HeadResponse {
            status: response.status().as_u16(),
            content_type: content_type(response.headers()),
        })
    }

    pub async fn get(&self, url: &str) -> Result<GetResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(GET_TIMEOUT)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status().as_u16();
        let content_type = content_type(response.headers());
        let body = response.bytes().await.map_err(request_error)?.to_vec();

        Ok(GetResponse {
            status,
            content_type,
            body,
        })
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        FetchError::Request(format!("ConnectError: {}", e))
    } else {
        FetchError::Request(format!("RequestError: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn head_reports_status_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(false).unwrap();
        let head = fetcher.head(&format!("{}/a.png", server.uri())).await.unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(head.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn get_returns_body_for_any_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.jpg"))
            .respond_with(ResponseTemplate::new(404).set_body_bytes(b"nope".to_vec()))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(false).unwrap();
        let got = fetcher.get(&format!("{}/gone.jpg", server.uri())).await.unwrap();
        assert_eq!(got.status, 404);
        assert_eq!(got.body, b"nope");
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        let fetcher = HttpFetcher::new(false).unwrap();
        let err = fetcher.head("http://127.0.0.1:9/a.jpg").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
    }
}
