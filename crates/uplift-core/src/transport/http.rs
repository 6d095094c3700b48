//! HTTP multipart upload transport.
//!
//! Posts one file per request as multipart form data, streaming the body
//! from disk so progress can be reported while bytes are on the wire. The
//! server is expected to answer with a JSON array of assigned names; the
//! first entry identifies the uploaded file.

use std::time::Duration;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::file::SourceFile;
use crate::transport::{ProgressSender, Transport, UploadFuture};

/// Request timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read granularity of the streamed request body.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Multipart form field the server reads files from.
const FORM_FIELD: &str = "files";

/// Uploads files to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Create a transport posting to `endpoint` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Create a transport posting to `endpoint` with a per-request timeout.
    ///
    /// The timeout covers the whole request, body streaming included.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_file(
        client: Client,
        endpoint: String,
        file: SourceFile,
        progress: ProgressSender,
    ) -> Result<String> {
        let handle = tokio::fs::File::open(&file.path).await?;
        let total = file.size;
        let mut reader = ReaderStream::with_capacity(handle, STREAM_CHUNK_SIZE);

        let counted = async_stream::stream! {
            let mut loaded: u64 = 0;
            while let Some(chunk) = reader.next().await {
                if let Ok(bytes) = &chunk {
                    loaded += bytes.len() as u64;
                    progress.send(loaded, total);
                }
                yield chunk;
            }
        };

        let mut part = Part::stream_with_length(Body::wrap_stream(counted), total)
            .file_name(file.name.clone());
        if let Some(mime) = &file.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| Error::Transport(format!("invalid mime type '{mime}': {e}")))?;
        }
        let form = Form::new().part(FORM_FIELD, part);

        let response = client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status.as_u16()));
        }

        let names: Vec<String> = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        names
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("empty name list".to_string()))
    }
}

impl Transport for HttpTransport {
    fn upload(
        &self,
        file: SourceFile,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> UploadFuture {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let file_name = file.name.clone();

        Box::pin(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Upload of '{file_name}' aborted");
                    Err(Error::Cancelled)
                }
                result = Self::send_file(client, endpoint, file, progress) => result,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn progress_pair() -> (ProgressSender, mpsc::UnboundedReceiver<crate::transport::TransportEvent>)
    {
        let (tx, rx) = mpsc::unbounded_channel();
        (ProgressSender::new(0, 1, tx), rx)
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("payload.bin");
        tokio::fs::write(&path, vec![0u8; 1024]).await.expect("write");

        let transport = HttpTransport::new("http://127.0.0.1:9/api/file").expect("transport");
        let file = SourceFile::from_path(&path).await.expect("source");
        let (progress, _rx) = progress_pair();

        let token = transport.cancel_token();
        token.cancel();

        let result = transport.upload(file, progress, token).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_file_fails_with_io() {
        let transport = HttpTransport::new("http://127.0.0.1:9/api/file").expect("transport");
        let file = SourceFile {
            path: "/nonexistent/payload.bin".into(),
            name: "payload.bin".to_string(),
            size: 1024,
            mime_type: None,
        };
        let (progress, _rx) = progress_pair();

        let result = transport.upload(file, progress, CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_transport_is_shareable() {
        let transport = Arc::new(HttpTransport::new("http://localhost/api/file").expect("transport"));
        let shared: Arc<dyn Transport> = transport.clone();

        assert_eq!(transport.endpoint(), "http://localhost/api/file");
        assert!(!shared.cancel_token().is_cancelled());
    }
}
