// transport.rs

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

// Non-HTTP failure classes, numbered like curl's error codes
pub const CODE_OTHER: u32 = 1;
pub const CODE_CONNECT: u32 = 7;
pub const CODE_READ_FILE: u32 = 26;
pub const CODE_TIMEOUT: u32 = 28;

/// Failure reported by a transport. `code` is the HTTP status for non-2xx replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub code: u32,
    pub message: String,
}

impl TransportError {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        TransportError {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error #{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let code = if let Some(status) = err.status() {
            u32::from(status.as_u16())
        } else if err.is_timeout() {
            CODE_TIMEOUT
        } else if err.is_connect() {
            CODE_CONNECT
        } else {
            CODE_OTHER
        };
        TransportError::new(code, err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartField {
    Text { name: String, value: String },
    /// Streamed from disk when sent.
    File { name: String, path: PathBuf },
}

/// HTTP capability the client is built with.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;

    fn post_multipart(
        &self,
        url: &Url,
        fields: Vec<MultipartField>,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    // Whole-request limit for GET calls
    timeout: Option<Duration>,
    // Whole-request limit for uploads; `None` lets a streaming body run as long as it flows
    upload_timeout: Option<Duration>,
}

impl ReqwestTransport {
    /// `timeout` bounds connecting and every GET call. Uploads are only bounded by
    /// `upload_timeout` once connected.
    pub fn new(timeout: Duration, upload_timeout: Option<Duration>) -> Result<Self, TransportError> {
        let client = Client::builder().connect_timeout(timeout).build()?;
        Ok(ReqwestTransport {
            client,
            timeout: Some(timeout),
            upload_timeout,
        })
    }

    /// Wraps a preconfigured client; no per-request timeouts are added.
    pub fn from_client(client: Client) -> Self {
        ReqwestTransport {
            client,
            timeout: None,
            upload_timeout: None,
        }
    }

    async fn build_form(fields: Vec<MultipartField>) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for field in fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name, value),
                MultipartField::File { name, path } => {
                    let file = tokio::fs::File::open(&path).await.map_err(|e| {
                        TransportError::new(
                            CODE_READ_FILE,
                            format!("couldn't open {}: {}", path.display(), e),
                        )
                    })?;
                    let length = file
                        .metadata()
                        .await
                        .map_err(|e| TransportError::new(CODE_READ_FILE, e.to_string()))?
                        .len();
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "upload".to_string());

                    let body = Body::wrap_stream(ReaderStream::new(file));
                    form.part(name, Part::stream_with_length(body, length).file_name(file_name))
                }
            };
        }
        Ok(form)
    }

    async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, TransportError> {
        let response = response.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        debug!(host = url.host_str().unwrap_or(""), path = url.path(), "GET");
        let mut request = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        Self::read_body(response).await
    }

    async fn post_multipart(
        &self,
        url: &Url,
        fields: Vec<MultipartField>,
    ) -> Result<Vec<u8>, TransportError> {
        debug!(host = url.host_str().unwrap_or(""), path = url.path(), "POST multipart");
        let form = Self::build_form(fields).await?;
        let mut request = self.client.post(url.clone()).multipart(form);
        if let Some(timeout) = self.upload_timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        Self::read_body(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_display_matches_error_sentinel_shape() {
        let err = TransportError::new(CODE_CONNECT, "Couldn't connect to server");
        assert_eq!(err.to_string(), "Error #7: Couldn't connect to server");
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let fields = vec![MultipartField::File {
            name: "file".to_string(),
            path: PathBuf::from("/definitely/not/here.mp4"),
        }];
        let err = ReqwestTransport::build_form(fields).await.unwrap_err();
        assert_eq!(err.code, CODE_READ_FILE);
    }

    #[tokio::test]
    async fn test_form_builds_for_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"video bytes").unwrap();
        let fields = vec![
            MultipartField::File {
                name: "file".to_string(),
                path: file.path().to_path_buf(),
            },
            MultipartField::Text {
                name: "title".to_string(),
                value: "clip".to_string(),
            },
        ];
        assert!(ReqwestTransport::build_form(fields).await.is_ok());
    }
}
