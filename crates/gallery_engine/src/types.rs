use std::fmt;

/// Progress reported while a payload moves to or from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferProgress {
    /// Integer percentage of the upload body handed to the transport.
    Upload { percent: u8 },
    /// Bytes received so far out of the advertised content length.
    Download { loaded: u64, total: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The backend refused or garbled the presigned-URL request.
    UrlAcquisition { status: Option<u16> },
    /// Storage answered the PUT/GET with a non-2xx status.
    HttpStatus(u16),
    Timeout,
    /// The body stream broke off before completion.
    Aborted,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::UrlAcquisition { status: Some(code) } => {
                write!(f, "url acquisition failed (status {code})")
            }
            FailureKind::UrlAcquisition { status: None } => write!(f, "url acquisition failed"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Aborted => write!(f, "transfer aborted"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: FailureKind,
    pub message: String,
}

impl TransferError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Successful upload of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub key: String,
}

/// Terminal outcome of an upload request; exactly one is produced per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub success: bool,
    pub key: String,
    pub error: Option<String>,
}

impl TransferResult {
    pub fn succeeded(key: impl Into<String>) -> Self {
        Self {
            success: true,
            key: key.into(),
            error: None,
        }
    }

    pub fn failed(key: impl Into<String>, error: &TransferError) -> Self {
        Self {
            success: false,
            key: key.into(),
            error: Some(error.to_string()),
        }
    }
}
