use std::collections::HashSet;
use std::time::Duration;

use gallery_logging::{gallery_debug, gallery_info};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSettings {
    /// Bucket endpoint, e.g. `https://bucket.s3.us-west-1.amazonaws.com/`.
    pub base_url: String,
    pub prefix: String,
    pub max_keys: u32,
    pub request_timeout: Duration,
}

impl ListingSettings {
    pub fn new(base_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            prefix: prefix.into(),
            max_keys: 1000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingError {
    #[error("invalid listing url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("listing request failed: {0}")]
    Network(String),
    #[error("S3 list error: {0}")]
    HttpStatus(u16),
    #[error("malformed listing document: {0}")]
    Parse(String),
    #[error("S3 error: {code} - {message}")]
    Storage { code: String, message: String },
    #[error("continuation token `{0}` was returned twice")]
    RepeatedToken(String),
}

/// One page of a `list-type=2` listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Deserialize)]
struct StorageErrorDocument {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// True for keys with an image extension that are not folder markers.
pub fn is_image_key(key: &str) -> bool {
    if key.is_empty() || key.ends_with('/') {
        return false;
    }
    match key.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Parses one listing response body, turning `<Error>` documents into
/// [`ListingError::Storage`].
pub fn parse_listing(xml: &str) -> Result<ListingPage, ListingError> {
    if root_element_name(xml)?.as_deref() == Some("Error") {
        let doc: StorageErrorDocument =
            quick_xml::de::from_str(xml).map_err(|err| ListingError::Parse(err.to_string()))?;
        return Err(ListingError::Storage {
            code: doc.code,
            message: doc.message,
        });
    }

    let mut reader = Reader::from_str(xml);
    // Keys may legally start or end with whitespace; keep text as sent.
    reader.config_mut().trim_text(false);

    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut page = ListingPage::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                path.push(String::from_utf8_lossy(element.local_name().as_ref()).into_owned());
                text.clear();
            }
            Ok(Event::Text(chunk)) => {
                let chunk = chunk
                    .unescape()
                    .map_err(|err| ListingError::Parse(err.to_string()))?;
                text.push_str(&chunk);
            }
            Ok(Event::CData(chunk)) => {
                text.push_str(&String::from_utf8_lossy(&chunk.into_inner()));
            }
            Ok(Event::End(_)) => {
                match path_tail(&path) {
                    ["Contents", "Key"] if !text.is_empty() => {
                        page.keys.push(std::mem::take(&mut text));
                    }
                    [.., "NextContinuationToken"] => {
                        let token = text.trim();
                        if !token.is_empty() {
                            page.next_token = Some(token.to_string());
                        }
                    }
                    _ => {}
                }
                text.clear();
                path.pop();
            }
            Ok(Event::Eof) => return Ok(page),
            Ok(_) => {}
            Err(err) => return Err(ListingError::Parse(err.to_string())),
        }
    }
}

fn path_tail(path: &[String]) -> [&str; 2] {
    match path {
        [.., parent, child] => [parent.as_str(), child.as_str()],
        [child] => ["", child.as_str()],
        [] => ["", ""],
    }
}

fn root_element_name(xml: &str) -> Result<Option<String>, ListingError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                let local = element.local_name();
                return Ok(Some(String::from_utf8_lossy(local.as_ref()).into_owned()));
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => continue,
            Err(err) => return Err(ListingError::Parse(err.to_string())),
        }
    }
}

/// Pages through a bucket listing, following continuation tokens.
#[derive(Debug, Clone)]
pub struct BucketLister {
    settings: ListingSettings,
    http: reqwest::Client,
}

impl BucketLister {
    pub fn new(settings: ListingSettings) -> Result<Self, ListingError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ListingError::Network(err.to_string()))?;
        Ok(Self { settings, http })
    }

    pub fn page_url(&self, continuation_token: Option<&str>) -> Result<Url, ListingError> {
        let mut url = Url::parse(&self.settings.base_url).map_err(|err| ListingError::InvalidUrl {
            url: self.settings.base_url.clone(),
            message: err.to_string(),
        })?;
        url.set_path("/");
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("list-type", "2");
            query.append_pair("prefix", &self.settings.prefix);
            query.append_pair("max-keys", &self.settings.max_keys.to_string());
            if let Some(token) = continuation_token {
                query.append_pair("continuation-token", token);
            }
        }
        Ok(url)
    }

    pub async fn fetch_page(
        &self,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, ListingError> {
        let url = self.page_url(continuation_token)?;
        gallery_debug!("Fetching listing page {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| ListingError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // S3 answers denied listings with an <Error> body; prefer its code.
            let body = response.text().await.unwrap_or_default();
            return match parse_listing(&body) {
                Err(storage @ ListingError::Storage { .. }) => Err(storage),
                _ => Err(ListingError::HttpStatus(status.as_u16())),
            };
        }

        let body = response
            .text()
            .await
            .map_err(|err| ListingError::Network(err.to_string()))?;
        parse_listing(&body)
    }

    /// All image keys under the prefix, in first-seen order without duplicates.
    pub async fn list_image_keys(&self) -> Result<Vec<String>, ListingError> {
        let mut keys = Vec::new();
        let mut seen_keys = HashSet::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.fetch_page(token.as_deref()).await?;
            pages += 1;
            for key in page.keys {
                if is_image_key(&key) && seen_keys.insert(key.clone()) {
                    keys.push(key);
                }
            }
            match page.next_token {
                Some(next) => {
                    if !seen_tokens.insert(next.clone()) {
                        return Err(ListingError::RepeatedToken(next));
                    }
                    token = Some(next);
                }
                None => break,
            }
        }

        gallery_info!(
            "Listed {} image keys under `{}` in {} page(s)",
            keys.len(),
            self.settings.prefix,
            pages
        );
        Ok(keys)
    }
}
