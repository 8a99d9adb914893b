use std::sync::{Mutex, MutexGuard, PoisonError};

use scraper::Html;
use tokio::sync::watch;

use crate::matcher::FieldLocator;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("page unavailable: {0}")]
    Unavailable(String),
}

/// The storefront page as seen by the fill routine.
#[async_trait::async_trait]
pub trait Page: Send + Sync {
    /// Markup of the whole document as it is right now.
    async fn snapshot(&self) -> Result<String, PageError>;

    /// Writes `value` into the control at `locator` and fires its input and
    /// change notifications. Returns false when the locator no longer points
    /// at a writable control.
    async fn set_value(&self, locator: &FieldLocator, value: &str) -> Result<bool, PageError>;

    /// Subscription that ticks on every subtree mutation. Dropping the
    /// receiver disconnects the observer.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// A page held in memory. Replacing the markup counts as one mutation;
/// written values are recorded per locator.
pub struct MemoryPage {
    state: Mutex<MemoryPageState>,
    mutations: watch::Sender<u64>,
}

struct MemoryPageState {
    html: String,
    values: Vec<(FieldLocator, String)>,
}

impl MemoryPage {
    pub fn new(html: impl Into<String>) -> Self {
        let (mutations, _) = watch::channel(0);
        Self {
            state: Mutex::new(MemoryPageState {
                html: html.into(),
                values: Vec::new(),
            }),
            mutations,
        }
    }

    /// Swaps in new markup and notifies observers.
    pub fn replace(&self, html: impl Into<String>) {
        self.lock().html = html.into();
        self.mutations.send_modify(|generation| *generation += 1);
    }

    /// Every value written so far, oldest first.
    pub fn written_values(&self) -> Vec<(FieldLocator, String)> {
        self.lock().values.clone()
    }

    /// Latest value written into a control with the given `name` attribute.
    pub fn value_of(&self, name: &str) -> Option<String> {
        self.lock()
            .values
            .iter()
            .rev()
            .find(|(locator, _)| locator.name.as_deref() == Some(name))
            .map(|(_, value)| value.clone())
    }

    /// Number of live mutation subscriptions.
    pub fn observer_count(&self) -> usize {
        self.mutations.receiver_count()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryPageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Page for MemoryPage {
    async fn snapshot(&self) -> Result<String, PageError> {
        Ok(self.lock().html.clone())
    }

    async fn set_value(&self, locator: &FieldLocator, value: &str) -> Result<bool, PageError> {
        let mut state = self.lock();
        let writable = {
            let document = Html::parse_document(&state.html);
            locator.resolve_writable(&document).is_some()
        };
        if writable {
            state.values.push((locator.clone(), value.to_string()));
        }
        Ok(writable)
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.mutations.subscribe()
    }
}
