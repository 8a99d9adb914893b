use scraper::{ElementRef, Html};

use crate::listing::ListingSettings;

pub const DEFAULT_CONTAINER_ID: &str = "fabric-gallery";
pub const DEFAULT_MAX_KEYS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no element with id `{0}` on the page")]
    MissingContainer(String),
    #[error("missing required attribute `{0}`")]
    MissingAttribute(&'static str),
    #[error("attribute `{name}` has invalid value `{value}`")]
    InvalidAttribute { name: &'static str, value: String },
}

/// Gallery settings read from the container element's `data-*` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryConfig {
    pub bucket: String,
    pub prefix: String,
    pub base_url: String,
    pub max_keys: u32,
    /// Inline CSS sizing hints (`--fg-gap`, `--fg-size-min`, ...), passed through as-is.
    pub style: Option<String>,
}

impl GalleryConfig {
    pub fn from_document(html: &str, container_id: &str) -> Result<Self, ConfigError> {
        let document = Html::parse_document(html);
        let container = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().id() == Some(container_id))
            .ok_or_else(|| ConfigError::MissingContainer(container_id.to_string()))?;
        Self::from_element(container)
    }

    pub fn from_element(element: ElementRef<'_>) -> Result<Self, ConfigError> {
        Self::from_attributes(|name| element.value().attr(name))
    }

    pub fn from_attributes<'a, F>(attr: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let non_empty = |name: &str| attr(name).map(str::trim).filter(|v| !v.is_empty());

        let bucket = non_empty("data-bucket")
            .ok_or(ConfigError::MissingAttribute("data-bucket"))?
            .to_string();
        let prefix = non_empty("data-prefix").unwrap_or_default().to_string();
        let base_url = non_empty("data-baseurl")
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com/"));
        let max_keys = match non_empty("data-max") {
            None => DEFAULT_MAX_KEYS,
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidAttribute {
                    name: "data-max",
                    value: raw.to_string(),
                })?,
        };
        let style = non_empty("style").map(ToOwned::to_owned);

        Ok(Self {
            bucket,
            prefix,
            base_url,
            max_keys,
            style,
        })
    }

    pub fn listing_settings(&self) -> ListingSettings {
        ListingSettings {
            max_keys: self.max_keys,
            ..ListingSettings::new(self.base_url.clone(), self.prefix.clone())
        }
    }
}
