//! Plain HTTP access for the browser collaborator
//!
//! SEO endpoints (robots.txt, sitemaps) are probed with a raw GET rather than
//! a rendered navigation. The client mirrors the browser's user agent and
//! proxy so both see the same site.

use crate::browser::{BrowserError, BrowserResult, RawResponse};
use crate::config::BrowserConfig;
use reqwest::{redirect::Policy, Client, Proxy};
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The browser configuration (user agent and proxy are reused)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_canon::browser::build_http_client;
/// use site_canon::config::BrowserConfig;
///
/// let client = build_http_client(&BrowserConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &BrowserConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(15))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Fetches a URL and returns its status and body
///
/// Non-2xx statuses are returned as responses, not errors; only transport
/// failures (DNS, connect, TLS, timeout) produce `BrowserError::Request`.
pub async fn fetch_raw(client: &Client, url: &str) -> BrowserResult<RawResponse> {
    let request_error = |source| BrowserError::Request {
        url: url.to_string(),
        source,
    };

    let response = client.get(url).send().await.map_err(request_error)?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(request_error)?;

    Ok(RawResponse { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&BrowserConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let config = BrowserConfig {
            proxy: Some("http://127.0.0.1:8080".to_string()),
            ..BrowserConfig::default()
        };
        assert!(build_http_client(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_raw_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\n"))
            .mount(&server)
            .await;

        let client = build_http_client(&BrowserConfig::default()).unwrap();
        let response = fetch_raw(&client, &format!("{}/robots.txt", server.uri()))
            .await
            .unwrap();

        assert!(response.is_ok());
        assert_eq!(response.body, "User-agent: *\n");
    }

    #[tokio::test]
    async fn test_fetch_raw_not_found_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = build_http_client(&BrowserConfig::default()).unwrap();
        let response = fetch_raw(&client, &format!("{}/sitemap.xml", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(!response.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_raw_connection_refused() {
        let client = build_http_client(&BrowserConfig::default()).unwrap();
        let result = fetch_raw(&client, "http://127.0.0.1:1/robots.txt").await;
        assert!(matches!(result, Err(BrowserError::Request { .. })));
    }
}
