//! Gallery engine: presigned transfers, bucket listing and page field filling.
mod backoff;
mod compat;
mod config;
mod fill;
mod listing;
mod matcher;
mod page;
mod transfer;
mod types;
mod watch;

pub use backoff::RetryPolicy;
pub use compat::{
    GetObjectOutput, GetObjectParams, GetObjectRequest, ProgressEvent, PutObjectOutput,
    PutObjectParams, UploadRequest, DOWNLOAD_PROGRESS_EVENT, UPLOAD_PROGRESS_EVENT,
};
pub use config::{ConfigError, GalleryConfig, DEFAULT_CONTAINER_ID, DEFAULT_MAX_KEYS};
pub use fill::fill_all_scopes;
pub use listing::{
    is_image_key, parse_listing, BucketLister, ListingError, ListingPage, ListingSettings,
};
pub use matcher::{
    FieldCandidate, FieldLocator, FieldMatcher, MatcherConfig, MatcherError, NEVER_MATCH,
};
pub use page::{MemoryPage, Page, PageError};
pub use transfer::{PresignedClient, ProgressSink, TransferSettings};
pub use types::{FailureKind, TransferError, TransferProgress, TransferReceipt, TransferResult};
pub use watch::{FillSource, ModalWatch, WatchOutcome, WatchSettings};
