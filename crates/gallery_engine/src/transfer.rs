use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use gallery_logging::{gallery_debug, gallery_error, gallery_info, gallery_warn};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::backoff::RetryPolicy;
use crate::{FailureKind, TransferError, TransferProgress, TransferReceipt, TransferResult};

/// Upload bodies are streamed in chunks of this size so progress can be reported.
const UPLOAD_CHUNK: usize = 64 * 1024;
/// Upper bound for trusting an advertised Content-Length when preallocating.
const MAX_PREALLOCATION: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Backend that issues presigned URLs, e.g. `https://api.example.com`.
    pub api_base: String,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    /// Deadline for presigned URL requests. Storage PUT and GET have none,
    /// so large payloads are not cut off.
    pub request_timeout: Duration,
}

impl TransferSettings {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: TransferProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(TransferProgress) + Send + Sync,
{
    fn emit(&self, progress: TransferProgress) {
        self(progress)
    }
}

#[derive(Serialize)]
struct UploadUrlRequest<'a> {
    key: &'a str,
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    upload_url: Option<String>,
}

#[derive(Deserialize)]
struct DownloadUrlResponse {
    download_url: Option<String>,
}

/// Moves payloads to and from object storage through backend-issued
/// presigned URLs, so the caller never holds storage credentials.
#[derive(Debug, Clone)]
pub struct PresignedClient {
    settings: TransferSettings,
    http: reqwest::Client,
}

impl PresignedClient {
    pub fn new(settings: TransferSettings) -> Result<Self, TransferError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| TransferError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, http })
    }

    /// Uploads `payload` under `key`, retrying the whole acquire+PUT sequence
    /// per the retry policy. Never fails: exhaustion becomes a failed result.
    pub async fn upload(
        &self,
        key: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> TransferResult {
        match self.try_upload(key, payload, content_type, progress).await {
            Ok(receipt) => TransferResult::succeeded(receipt.key),
            Err(err) => {
                gallery_error!("All retries failed for upload of {}: {}", key, err);
                TransferResult::failed(key, &err)
            }
        }
    }

    /// Same as [`PresignedClient::upload`] but propagates the last failure.
    pub async fn try_upload(
        &self,
        key: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<TransferReceipt, TransferError> {
        let retry = self.settings.retry;
        let mut attempt = 0;
        loop {
            let outcome = match self.acquire_upload_url(key).await {
                Ok(upload_url) => {
                    self.put_with_retry(&upload_url, payload.clone(), content_type, progress.clone())
                        .await
                }
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) => {
                    gallery_info!("Uploaded {} ({} bytes)", key, payload.len());
                    return Ok(TransferReceipt {
                        key: key.to_string(),
                    });
                }
                Err(err) => {
                    gallery_warn!(
                        "Upload attempt {}/{} for {} failed: {}",
                        attempt + 1,
                        retry.attempts(),
                        key,
                        err
                    );
                    if attempt >= retry.max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Fetches `key` through a presigned GET URL. Single attempt.
    pub async fn download(
        &self,
        key: &str,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<Bytes, TransferError> {
        let download_url = self.acquire_download_url(key).await?;
        let response = self
            .http
            .get(&download_url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("failed to download object: {status}"),
            ));
        }

        let total = response.content_length();
        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATION) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            body.extend_from_slice(&chunk);
            if let (Some(sink), Some(total)) = (progress.as_ref(), total) {
                sink.emit(TransferProgress::Download {
                    loaded: body.len() as u64,
                    total,
                });
            }
        }
        gallery_debug!("Downloaded {} ({} bytes)", key, body.len());
        Ok(Bytes::from(body))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_base.trim_end_matches('/'), path)
    }

    async fn acquire_upload_url(&self, key: &str) -> Result<String, TransferError> {
        let body = serde_json::to_vec(&UploadUrlRequest { key }).map_err(|err| {
            TransferError::new(FailureKind::UrlAcquisition { status: None }, err.to_string())
        })?;
        let response = self
            .http
            .post(self.endpoint("upload"))
            .timeout(self.settings.request_timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TransferError::new(
                FailureKind::UrlAcquisition {
                    status: Some(status.as_u16()),
                },
                format!("failed to get upload url: {} - {}", status.as_u16(), text),
            ));
        }

        let raw = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: UploadUrlResponse = serde_json::from_slice(&raw).map_err(|err| {
            TransferError::new(
                FailureKind::UrlAcquisition {
                    status: Some(status.as_u16()),
                },
                format!("malformed upload url response: {err}"),
            )
        })?;
        parsed
            .upload_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                TransferError::new(
                    FailureKind::UrlAcquisition {
                        status: Some(status.as_u16()),
                    },
                    "upload url missing in response",
                )
            })
    }

    async fn acquire_download_url(&self, key: &str) -> Result<String, TransferError> {
        let endpoint = url::Url::parse_with_params(&self.endpoint("objects"), &[("key", key)])
            .map_err(|err| {
                TransferError::new(FailureKind::UrlAcquisition { status: None }, err.to_string())
            })?;
        let response = self
            .http
            .get(endpoint)
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::UrlAcquisition {
                    status: Some(status.as_u16()),
                },
                format!("failed to get download url: {status}"),
            ));
        }

        let raw = response.bytes().await.map_err(map_reqwest_error)?;
        let parsed: DownloadUrlResponse = serde_json::from_slice(&raw).map_err(|err| {
            TransferError::new(
                FailureKind::UrlAcquisition {
                    status: Some(status.as_u16()),
                },
                format!("malformed download url response: {err}"),
            )
        })?;
        parsed
            .download_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                TransferError::new(
                    FailureKind::UrlAcquisition {
                        status: Some(status.as_u16()),
                    },
                    "download url missing in response",
                )
            })
    }

    /// PUT against the presigned URL with its own attempt counter.
    async fn put_with_retry(
        &self,
        upload_url: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<(), TransferError> {
        let retry = self.settings.retry;
        let mut attempt = 0;
        loop {
            match self
                .put_once(upload_url, payload.clone(), content_type, progress.clone())
                .await
            {
                Ok(()) => return Ok(()),
                Err(err) => {
                    gallery_warn!("PUT attempt {} failed: {}", attempt + 1, err);
                    if attempt >= retry.max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn put_once(
        &self,
        upload_url: &str,
        payload: Bytes,
        content_type: &str,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<(), TransferError> {
        let total = payload.len();
        let request = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, total);
        let request = match progress {
            Some(sink) => request.body(progress_body(payload, sink)),
            None => request.body(payload),
        };

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("upload failed with status {status}"),
            ));
        }
        Ok(())
    }
}

/// Streams `payload` in chunks, reporting the percentage handed to the transport.
fn progress_body(payload: Bytes, sink: Arc<dyn ProgressSink>) -> reqwest::Body {
    let total = payload.len();
    let chunks: Vec<Bytes> = (0..total)
        .step_by(UPLOAD_CHUNK)
        .map(|start| payload.slice(start..(start + UPLOAD_CHUNK).min(total)))
        .collect();
    let mut sent = 0usize;
    let stream = futures_util::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        sink.emit(TransferProgress::Upload {
            percent: percent_of(sent as u64, total as u64),
        });
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

pub(crate) fn percent_of(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (loaded as f64 / total as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_body() {
        return TransferError::new(FailureKind::Aborted, err.to_string());
    }
    TransferError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::percent_of;

    #[test]
    fn percent_rounds_to_nearest_integer() {
        assert_eq!(percent_of(0, 3), 0);
        assert_eq!(percent_of(1, 3), 33);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(3, 3), 100);
        assert_eq!(percent_of(0, 0), 100);
    }
}
