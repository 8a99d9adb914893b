use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gallery_core::{Effect, Msg};
use gallery_engine::{
    fill_all_scopes, FieldMatcher, ModalWatch, Page, WatchOutcome, WatchSettings,
};
use gallery_logging::{gallery_debug, gallery_error, gallery_info, gallery_warn};
use tokio::sync::mpsc;

use super::persistence::RelayStore;

/// Preview the user asked for, kept for the caller to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub url: String,
    pub caption: String,
}

/// Runs effects emitted by `update` and turns their completion into messages.
/// Quick effects answer inline; modal watches run as tasks and report back
/// through `msg_tx`.
pub struct EffectRunner {
    msg_tx: mpsc::UnboundedSender<Msg>,
    page: Option<Arc<dyn Page>>,
    matcher: Arc<FieldMatcher>,
    watch_settings: WatchSettings,
    store: Option<RelayStore>,
    previews: Vec<Preview>,
    filled: Arc<AtomicUsize>,
    persisted: usize,
}

impl EffectRunner {
    pub fn new(matcher: Arc<FieldMatcher>, msg_tx: mpsc::UnboundedSender<Msg>) -> Self {
        Self {
            msg_tx,
            page: None,
            matcher,
            watch_settings: WatchSettings::default(),
            store: None,
            previews: Vec::new(),
            filled: Arc::new(AtomicUsize::new(0)),
            persisted: 0,
        }
    }

    pub fn with_page(mut self, page: Arc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_store(mut self, store: RelayStore) -> Self {
        self.store = Some(store);
        self
    }

    #[cfg(test)]
    pub fn with_watch_settings(mut self, settings: WatchSettings) -> Self {
        self.watch_settings = settings;
        self
    }

    pub fn previews(&self) -> &[Preview] {
        &self.previews
    }

    /// Total number of fields written by fills and modal watches.
    pub fn filled(&self) -> usize {
        self.filled.load(Ordering::Relaxed)
    }

    /// Relay entries written to the store.
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    pub async fn run(&mut self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::FillFields { value } => {
                let page = self.page.clone()?;
                match fill_all_scopes(page.as_ref(), &self.matcher, &value).await {
                    Ok(0) => {
                        gallery_warn!(
                            "No fields filled on select; will also try when a modal appears ({:?})",
                            value
                        );
                    }
                    Ok(count) => {
                        self.filled.fetch_add(count, Ordering::Relaxed);
                    }
                    Err(err) => gallery_error!("Fill failed: {}", err),
                }
                None
            }
            Effect::OpenPreview { url, caption } => {
                gallery_info!("Opening preview {} ({})", caption, url);
                self.previews.push(Preview { url, caption });
                None
            }
            Effect::StartModalWatch { value } => {
                let Some(page) = self.page.clone() else {
                    return Some(Msg::ModalWatchFinished { filled: false });
                };
                let watch = ModalWatch::start(
                    page,
                    self.matcher.clone(),
                    value,
                    self.watch_settings.clone(),
                );
                let total = self.filled.clone();
                let msg_tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    let filled = match watch.wait().await {
                        WatchOutcome::Filled { fields, .. } => {
                            total.fetch_add(fields, Ordering::Relaxed);
                            true
                        }
                        WatchOutcome::FieldNotFound
                        | WatchOutcome::Cancelled
                        | WatchOutcome::Skipped => false,
                    };
                    if msg_tx.send(Msg::ModalWatchFinished { filled }).is_err() {
                        gallery_debug!("Modal watch finished after the app shut down");
                    }
                });
                None
            }
            Effect::PersistEntry { key, value } => {
                match &self.store {
                    Some(store) => {
                        match store.insert(&key, &value) {
                            Ok(()) => self.persisted += 1,
                            Err(err) => {
                                gallery_error!("Failed to persist relay entry {}: {}", key, err)
                            }
                        }
                    }
                    None => gallery_warn!("No relay store configured; dropping entry {}", key),
                }
                None
            }
        }
    }
}
