use std::collections::VecDeque;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use clap::Parser;
use gallery_core::{update, AppState, AppViewModel, Msg};
use gallery_engine::{
    fill_all_scopes, BucketLister, FieldMatcher, GalleryConfig, MatcherConfig, MemoryPage,
    ModalWatch, PresignedClient, ProgressSink, RetryPolicy, TransferProgress, TransferSettings,
    WatchOutcome, WatchSettings,
};
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};
use tokio::sync::mpsc;

use super::cli::{
    Cli, Command, DownloadArgs, FillArgs, GalleryArgs, RelayArgs, TransferArgs, UploadArgs,
};
use super::effects::EffectRunner;
use super::logging;
use super::persistence::RelayStore;
use super::ui;

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, gallery_logging::level_for(cli.verbose));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(execute(cli.command))
}

async fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Gallery(args) => run_gallery(args).await,
        Command::Upload(args) => run_upload(args).await,
        Command::Download(args) => run_download(args).await,
        Command::Fill(args) => run_fill(args).await,
        Command::Relay(args) => run_relay(args).await,
    }
}

/// Drives the pure state machine: each message goes through `update`, and
/// effects may feed follow-up messages back into the queue, either inline or
/// later through `msg_rx`.
pub struct App {
    state: AppState,
    runner: EffectRunner,
    inbox: VecDeque<Msg>,
    msg_rx: mpsc::UnboundedReceiver<Msg>,
}

impl App {
    pub fn new(
        state: AppState,
        runner: EffectRunner,
        msg_rx: mpsc::UnboundedReceiver<Msg>,
    ) -> Self {
        Self {
            state,
            runner,
            inbox: VecDeque::new(),
            msg_rx,
        }
    }

    /// Handles `msg` and everything it triggers that is ready now. Returns
    /// without waiting for background work such as a running modal watch.
    pub async fn dispatch(&mut self, msg: Msg) {
        self.inbox.push_back(msg);
        loop {
            while let Ok(msg) = self.msg_rx.try_recv() {
                self.inbox.push_back(msg);
            }
            let Some(msg) = self.inbox.pop_front() else {
                break;
            };
            gallery_debug!("Dispatching {:?}", msg);
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                if let Some(follow_up) = self.runner.run(effect).await {
                    self.inbox.push_back(follow_up);
                }
            }
        }
    }

    /// Waits until no modal watch is running, dispatching completions as
    /// they arrive.
    pub async fn settle(&mut self) {
        while self.state.is_watch_active() {
            match self.msg_rx.recv().await {
                Some(msg) => self.dispatch(msg).await,
                None => break,
            }
        }
    }

    /// View model if anything changed since the last call.
    pub fn take_view(&mut self) -> Option<AppViewModel> {
        self.state.consume_dirty().then(|| self.state.view())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }
}

async fn run_gallery(args: GalleryArgs) -> anyhow::Result<()> {
    let html = fs::read_to_string(&args.page)
        .with_context(|| format!("failed to read page {:?}", args.page))?;
    let page = Arc::new(MemoryPage::new(html.clone()));
    let matcher = Arc::new(FieldMatcher::new(MatcherConfig::default())?);
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let mut app = App::new(
        AppState::new(),
        EffectRunner::new(matcher, msg_tx).with_page(page.clone()),
        msg_rx,
    );

    let style = match GalleryConfig::from_document(&html, &args.container) {
        Ok(config) => {
            let msg = match list_keys(&config).await {
                Ok(keys) => Msg::KeysListed {
                    base_url: config.base_url.clone(),
                    prefix: config.prefix.clone(),
                    keys,
                },
                Err(message) => Msg::ListingFailed(message),
            };
            app.dispatch(msg).await;
            config.style
        }
        Err(err) => {
            gallery_warn!("Gallery configuration rejected: {}", err);
            app.dispatch(Msg::ConfigRejected(err.to_string())).await;
            None
        }
    };

    if let Some(index) = args.select {
        app.dispatch(Msg::TileSelected { index }).await;
    }
    if args.add_to_cart {
        app.dispatch(Msg::AddToCartClicked).await;
    }
    app.settle().await;

    let view = app.take_view().unwrap_or_else(|| app.state().view());
    let markup = ui::render::render(&args.container, style.as_deref(), &view);
    match &args.output {
        Some(path) => {
            fs::write(path, &markup).with_context(|| format!("failed to write {path:?}"))?;
            gallery_info!("Wrote gallery markup to {:?}", path);
        }
        None => print!("{markup}"),
    }

    for preview in app.runner().previews() {
        gallery_info!("Preview: {} -> {}", preview.caption, preview.url);
    }
    for (locator, value) in page.written_values() {
        gallery_info!(
            "Filled field name={:?} id={:?} with {:?}",
            locator.name,
            locator.id,
            value
        );
    }
    gallery_debug!("{} field write(s) in total", app.runner().filled());
    Ok(())
}

async fn list_keys(config: &GalleryConfig) -> Result<Vec<String>, String> {
    let lister = BucketLister::new(config.listing_settings()).map_err(|err| err.to_string())?;
    lister.list_image_keys().await.map_err(|err| err.to_string())
}

fn transfer_client(args: &TransferArgs) -> anyhow::Result<PresignedClient> {
    let mut settings = TransferSettings::new(args.api.clone());
    settings.retry = RetryPolicy {
        max_retries: args.max_retries,
        base_delay: Duration::from_millis(args.retry_base_ms),
    };
    Ok(PresignedClient::new(settings)?)
}

fn progress_logger() -> Arc<dyn ProgressSink> {
    Arc::new(|progress: TransferProgress| match progress {
        TransferProgress::Upload { percent } => gallery_debug!("Upload progress {}%", percent),
        TransferProgress::Download { loaded, total } => {
            gallery_debug!("Download progress {}/{} bytes", loaded, total)
        }
    })
}

async fn run_upload(args: UploadArgs) -> anyhow::Result<()> {
    let payload =
        fs::read(&args.file).with_context(|| format!("failed to read {:?}", args.file))?;
    let client = transfer_client(&args.transfer)?;
    let result = client
        .upload(
            &args.key,
            Bytes::from(payload),
            &args.content_type,
            Some(progress_logger()),
        )
        .await;

    if !result.success {
        bail!(
            "upload of {} failed: {}",
            result.key,
            result.error.unwrap_or_default()
        );
    }
    println!("Uploaded {}", result.key);
    Ok(())
}

async fn run_download(args: DownloadArgs) -> anyhow::Result<()> {
    let client = transfer_client(&args.transfer)?;
    let body = client
        .download(&args.key, Some(progress_logger()))
        .await
        .with_context(|| format!("download of {} failed", args.key))?;
    fs::write(&args.output, &body)
        .with_context(|| format!("failed to write {:?}", args.output))?;
    println!("Downloaded {} ({} bytes)", args.key, body.len());
    Ok(())
}

async fn run_fill(args: FillArgs) -> anyhow::Result<()> {
    let html = fs::read_to_string(&args.page)
        .with_context(|| format!("failed to read page {:?}", args.page))?;
    let page = Arc::new(MemoryPage::new(html));
    let matcher = Arc::new(FieldMatcher::new(MatcherConfig::default())?);

    let filled = if args.watch {
        let watch = ModalWatch::start(
            page.clone(),
            matcher,
            args.value.clone(),
            WatchSettings::default(),
        );
        match watch.wait().await {
            WatchOutcome::Filled { fields, .. } => fields,
            WatchOutcome::FieldNotFound
            | WatchOutcome::Cancelled
            | WatchOutcome::Skipped => 0,
        }
    } else {
        fill_all_scopes(page.as_ref(), &matcher, &args.value).await?
    };

    for (locator, value) in page.written_values() {
        println!(
            "{} = {}",
            locator
                .name
                .or(locator.id)
                .unwrap_or_else(|| "<unnamed>".to_string()),
            value
        );
    }
    println!("Filled {filled} field(s)");
    Ok(())
}

async fn run_relay(args: RelayArgs) -> anyhow::Result<()> {
    let store = RelayStore::new(args.store.clone());
    let matcher = Arc::new(FieldMatcher::new(MatcherConfig::default())?);
    let (msg_tx, msg_rx) = mpsc::unbounded_channel();
    let mut app = App::new(
        AppState::with_allowed_origins(args.allowed_origins),
        EffectRunner::new(matcher, msg_tx).with_store(store.clone()),
        msg_rx,
    );
    app.dispatch(Msg::FrameMessage {
        origin: args.origin.clone(),
        key: args.key.clone(),
        value: args.value.clone(),
    })
    .await;

    if app.runner().persisted() == 0 {
        bail!("message from origin {} was not accepted", args.origin);
    }
    let stored = store.get(&args.key)?.unwrap_or_default();
    println!("Stored {} = {} in {:?}", args.key, stored, store.path());
    Ok(())
}
