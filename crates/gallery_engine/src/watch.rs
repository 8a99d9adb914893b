use std::sync::Arc;
use std::time::Duration;

use gallery_logging::{gallery_debug, gallery_info, gallery_trace, gallery_warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::fill::fill_all_scopes;
use crate::matcher::FieldMatcher;
use crate::page::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// Wall-clock window of the mutation observer.
    pub observer_timeout: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(150),
            max_poll_attempts: 40,
            observer_timeout: Duration::from_secs(6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillSource {
    Poll,
    Observer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Filled { source: FillSource, fields: usize },
    /// Both watchers ran out of budget without finding a field.
    FieldNotFound,
    /// The caller cancelled before any field was filled.
    Cancelled,
    /// The desired value was blank, so nothing was watched.
    Skipped,
}

/// Serialises fill attempts of both watchers so only one can win.
struct FillGate {
    page: Arc<dyn Page>,
    matcher: Arc<FieldMatcher>,
    value: String,
    token: CancellationToken,
    lock: Mutex<()>,
}

impl FillGate {
    /// Runs one fill pass unless the watch is already over; a successful
    /// pass cancels the shared token.
    async fn attempt(&self, source: FillSource) -> Option<usize> {
        let _turn = self.lock.lock().await;
        if self.token.is_cancelled() {
            return None;
        }
        match fill_all_scopes(self.page.as_ref(), &self.matcher, &self.value).await {
            Ok(0) => None,
            Ok(fields) => {
                gallery_info!("{:?} filled {} field(s) with {:?}", source, fields, self.value);
                self.token.cancel();
                Some(fields)
            }
            Err(err) => {
                gallery_warn!("{:?} fill attempt failed: {}", source, err);
                None
            }
        }
    }
}

/// Poll and mutation watchers racing to fill a field that may appear later.
/// Dropping the handle stops both.
pub struct ModalWatch {
    token: CancellationToken,
    poll: JoinHandle<Option<usize>>,
    observer: JoinHandle<Option<usize>>,
    skipped: bool,
    _guard: DropGuard,
}

impl ModalWatch {
    pub fn start(
        page: Arc<dyn Page>,
        matcher: Arc<FieldMatcher>,
        value: impl Into<String>,
        settings: WatchSettings,
    ) -> Self {
        let token = CancellationToken::new();
        let mutations = page.subscribe();
        let gate = Arc::new(FillGate {
            page,
            matcher,
            value: value.into(),
            token: token.clone(),
            lock: Mutex::new(()),
        });
        let skipped = gate.value.trim().is_empty();
        if skipped {
            gallery_warn!("Modal fill skipped: no value to fill");
            token.cancel();
        } else {
            gallery_info!("Starting modal fill routine for {:?}", gate.value);
        }

        let poll = tokio::spawn(poll_for_field(gate.clone(), settings.clone()));
        let observer = tokio::spawn(observe_mutations(gate, mutations, settings));

        Self {
            _guard: token.clone().drop_guard(),
            token,
            poll,
            observer,
            skipped,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for both watchers to stop and reports which one, if any, filled.
    pub async fn wait(self) -> WatchOutcome {
        let ModalWatch {
            token,
            poll,
            observer,
            skipped,
            _guard,
        } = self;
        let (poll, observer) = tokio::join!(poll, observer);
        let poll = poll.ok().flatten();
        let observer = observer.ok().flatten();

        match (poll, observer) {
            (Some(fields), _) => WatchOutcome::Filled {
                source: FillSource::Poll,
                fields,
            },
            (None, Some(fields)) => WatchOutcome::Filled {
                source: FillSource::Observer,
                fields,
            },
            (None, None) if skipped => WatchOutcome::Skipped,
            (None, None) if token.is_cancelled() => WatchOutcome::Cancelled,
            (None, None) => {
                gallery_warn!("No matching field appeared before the watch window closed");
                WatchOutcome::FieldNotFound
            }
        }
    }
}

async fn poll_for_field(gate: Arc<FillGate>, settings: WatchSettings) -> Option<usize> {
    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; attempts start one interval in.
    ticker.tick().await;

    for attempt in 1..=settings.max_poll_attempts {
        tokio::select! {
            _ = gate.token.cancelled() => return None,
            _ = ticker.tick() => {}
        }
        if let Some(fields) = gate.attempt(FillSource::Poll).await {
            return Some(fields);
        }
        gallery_trace!("Modal fill tick {} found nothing", attempt);
    }
    gallery_debug!(
        "Modal fill polling gave up after {} attempts",
        settings.max_poll_attempts
    );
    None
}

async fn observe_mutations(
    gate: Arc<FillGate>,
    mut mutations: watch::Receiver<u64>,
    settings: WatchSettings,
) -> Option<usize> {
    let deadline = tokio::time::sleep(settings.observer_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = gate.token.cancelled() => return None,
            _ = &mut deadline => {
                gallery_debug!("Modal mutation observer stopped");
                return None;
            }
            changed = mutations.changed() => {
                if changed.is_err() {
                    gallery_debug!("Page closed; mutation observer stopped");
                    return None;
                }
                if let Some(fields) = gate.attempt(FillSource::Observer).await {
                    return Some(fields);
                }
            }
        }
    }
}
