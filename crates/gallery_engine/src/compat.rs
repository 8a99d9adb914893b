//! Cloud-SDK shaped wrappers around [`PresignedClient`].
//!
//! Integration code written against `putObject(params, cb)`,
//! `upload(params).on(event, handler).send(cb)` and
//! `getObject(params).on(event, handler).send(cb)` keeps working; every
//! wrapper delegates to the client's async operations and invokes its
//! callback exactly once. Wrappers spawn onto the ambient tokio runtime.

use std::sync::Arc;

use bytes::Bytes;
use gallery_logging::gallery_debug;
use tokio::task::JoinHandle;

use crate::transfer::{PresignedClient, ProgressSink};
use crate::{TransferError, TransferProgress};

pub const UPLOAD_PROGRESS_EVENT: &str = "httpUploadProgress";
pub const DOWNLOAD_PROGRESS_EVENT: &str = "httpDownloadProgress";

/// Uploads report `loaded` as a percentage of `total = 100`; downloads report bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct PutObjectParams {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct GetObjectParams {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetObjectOutput {
    pub body: Bytes,
}

impl PresignedClient {
    /// Callback-style upload.
    pub fn put_object<F>(&self, params: PutObjectParams, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<PutObjectOutput, TransferError>) + Send + 'static,
    {
        UploadRequest::new(self.clone(), params).send(callback)
    }

    /// Builder-style upload; nothing happens until [`UploadRequest::send`].
    pub fn upload_request(&self, params: PutObjectParams) -> UploadRequest {
        UploadRequest::new(self.clone(), params)
    }

    /// Builder-style download; nothing happens until [`GetObjectRequest::send`].
    pub fn get_object(&self, params: GetObjectParams) -> GetObjectRequest {
        GetObjectRequest {
            client: self.clone(),
            params,
            progress: None,
        }
    }

    /// Download that is sent immediately, as when `getObject` receives a callback.
    pub fn get_object_with<F>(&self, params: GetObjectParams, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<GetObjectOutput, TransferError>) + Send + 'static,
    {
        self.get_object(params).send(callback)
    }
}

pub struct UploadRequest {
    client: PresignedClient,
    params: PutObjectParams,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl UploadRequest {
    fn new(client: PresignedClient, params: PutObjectParams) -> Self {
        Self {
            client,
            params,
            progress: None,
        }
    }

    /// Registers `handler` for `httpUploadProgress`; other event names are ignored.
    pub fn on<H>(mut self, event: &str, handler: H) -> Self
    where
        H: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        if event != UPLOAD_PROGRESS_EVENT {
            gallery_debug!("Ignoring handler for unknown upload event {}", event);
            return self;
        }
        let sink: Arc<dyn ProgressSink> = Arc::new(move |progress: TransferProgress| {
            if let TransferProgress::Upload { percent } = progress {
                handler(ProgressEvent {
                    loaded: u64::from(percent),
                    total: 100,
                });
            }
        });
        self.progress = Some(sink);
        self
    }

    pub fn send<F>(self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<PutObjectOutput, TransferError>) + Send + 'static,
    {
        tokio::spawn(async move {
            let PutObjectParams {
                key,
                body,
                content_type,
            } = self.params;
            let result = self
                .client
                .try_upload(&key, body, &content_type, self.progress)
                .await
                .map(|receipt| PutObjectOutput { key: receipt.key });
            callback(result);
        })
    }
}

pub struct GetObjectRequest {
    client: PresignedClient,
    params: GetObjectParams,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl GetObjectRequest {
    /// Registers `handler` for `httpDownloadProgress`; other event names are ignored.
    pub fn on<H>(mut self, event: &str, handler: H) -> Self
    where
        H: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        if event != DOWNLOAD_PROGRESS_EVENT {
            gallery_debug!("Ignoring handler for unknown download event {}", event);
            return self;
        }
        let sink: Arc<dyn ProgressSink> = Arc::new(move |progress: TransferProgress| {
            if let TransferProgress::Download { loaded, total } = progress {
                handler(ProgressEvent { loaded, total });
            }
        });
        self.progress = Some(sink);
        self
    }

    pub fn send<F>(self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<GetObjectOutput, TransferError>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self
                .client
                .download(&self.params.key, self.progress)
                .await
                .map(|body| GetObjectOutput { body });
            callback(result);
        })
    }
}
