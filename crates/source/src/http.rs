//! Live data source over HTTP(S).

use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::instrument;

use crate::DataSource;
use crate::error::{ErrorKind, Result};

/// Default time allowed for the version check.
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(30);
/// Default time allowed for the full data download. The payload is tens of
/// megabytes, so this is deliberately generous.
pub const DATA_TIMEOUT: Duration = Duration::from_secs(600);

/// Fetches the version token and payload from two configurable URLs.
///
/// # Examples
///
/// ```no_run
/// use browscap_source::{DataSource, HttpSource};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpSource::new(
///     "https://browscap.org/version-number",
///     "https://browscap.org/stream?q=PHP_BrowsCapINI",
/// )?
/// .with_timeouts(Duration::from_secs(10), Duration::from_secs(300));
/// println!("remote version: {}", source.version().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    version_url: Url,
    data_url: Url,
    version_timeout: Duration,
    data_timeout: Duration,
}

impl HttpSource {
    pub fn new(version_url: &str, data_url: &str) -> Result<Self> {
        let version_url = Url::parse(version_url).or_raise(|| ErrorKind::InvalidUrl)?;
        let data_url = Url::parse(data_url).or_raise(|| ErrorKind::InvalidUrl)?;
        if !matches!(version_url.scheme(), "http" | "https") || !matches!(data_url.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidUrl);
        }
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(network)?;
        Ok(Self {
            client,
            version_url,
            data_url,
            version_timeout: VERSION_TIMEOUT,
            data_timeout: DATA_TIMEOUT,
        })
    }

    pub fn with_timeouts(mut self, version: Duration, data: Duration) -> Self {
        self.version_timeout = version;
        self.data_timeout = data;
        self
    }

    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        let body = response.text().await.map_err(network)?;
        if body.trim().is_empty() {
            exn::bail!(ErrorKind::EmptyResponse);
        }
        Ok(body)
    }
}

fn network(err: reqwest::Error) -> ErrorKind {
    if err.is_timeout() {
        ErrorKind::Network(format!("timed out: {err}"))
    } else {
        ErrorKind::Network(err.to_string())
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn name(&self) -> &str {
        self.data_url.host_str().unwrap_or("http")
    }

    #[instrument(skip(self), fields(url = %self.version_url))]
    async fn version(&self) -> Result<String> {
        self.fetch(&self.version_url, self.version_timeout).await
    }

    #[instrument(skip(self), fields(url = %self.data_url, bytes))]
    async fn data(&self) -> Result<String> {
        let body = self.fetch(&self.data_url, self.data_timeout).await?;
        tracing::Span::current().record("bytes", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve each canned response to one connection, in order.
    async fn serve(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await.unwrap();
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_version_and_data() {
        let base = serve(vec![response("200 OK", "6000013\n"), response("200 OK", "[GJK_Browscap_Version]\n")]).await;
        let source = HttpSource::new(&format!("{base}/version"), &format!("{base}/data")).unwrap();
        assert_eq!(source.version().await.unwrap(), "6000013\n");
        assert_eq!(source.data().await.unwrap(), "[GJK_Browscap_Version]\n");
    }

    #[tokio::test]
    async fn test_error_status() {
        let base = serve(vec![response("503 Service Unavailable", "busy")]).await;
        let source = HttpSource::new(&format!("{base}/version"), &format!("{base}/data")).unwrap();
        let error = source.version().await.unwrap_err();
        assert!(matches!(&*error, ErrorKind::Status(503)));
    }

    #[tokio::test]
    async fn test_empty_body() {
        let base = serve(vec![response("200 OK", "")]).await;
        let source = HttpSource::new(&format!("{base}/version"), &format!("{base}/data")).unwrap();
        let error = source.data().await.unwrap_err();
        assert!(matches!(&*error, ErrorKind::EmptyResponse));
    }

    /// Accept connections, then never answer.
    async fn stalled() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_version_timeout() {
        let base = stalled().await;
        let source = HttpSource::new(&format!("{base}/version"), &format!("{base}/data"))
            .unwrap()
            .with_timeouts(Duration::from_millis(200), DATA_TIMEOUT);
        let error = source.version().await.unwrap_err();
        assert!(matches!(&*error, ErrorKind::Network(message) if message.starts_with("timed out")));
    }

    #[tokio::test]
    async fn test_data_timeout() {
        let base = stalled().await;
        let source = HttpSource::new(&format!("{base}/version"), &format!("{base}/data"))
            .unwrap()
            .with_timeouts(VERSION_TIMEOUT, Duration::from_millis(200));
        let error = source.data().await.unwrap_err();
        assert!(matches!(&*error, ErrorKind::Network(message) if message.starts_with("timed out")));
    }

    #[test]
    fn test_invalid_urls() {
        assert!(matches!(&*HttpSource::new("not a url", "https://example.com").unwrap_err(), ErrorKind::InvalidUrl));
        assert!(matches!(
            &*HttpSource::new("ftp://example.com/v", "https://example.com").unwrap_err(),
            ErrorKind::InvalidUrl
        ));
    }
}
