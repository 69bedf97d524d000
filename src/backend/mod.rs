//! Worker thread owning settings, library files and downloads.
//!
//! The UI talks to it only through [`UiRequest`] messages and receives
//! [`BackendEvent`]s back, both wrapped in versioned envelopes.

pub mod control;

use crate::config::{JsonSettingsStore, SettingsStore};
use crate::downloader::{DownloadOutcome, Downloader, DownloaderConfig};
use crate::library::{DirectoryLibrary, LibraryStore};
use crate::protocol::{BackendEvent, Envelope, UiRequest};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(12);

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub library_dir: PathBuf,
    pub settings_path: PathBuf,
    pub downloader: DownloaderConfig,
}

pub struct Backend {
    request_tx: Sender<Envelope<UiRequest>>,
    event_tx: Sender<Envelope<BackendEvent>>,
    event_rx: Receiver<Envelope<BackendEvent>>,
}

impl Backend {
    pub fn spawn(config: BackendConfig) -> anyhow::Result<Self> {
        let library = DirectoryLibrary::new(&config.library_dir);
        library.ensure_root().with_context(|| {
            format!(
                "failed to prepare library directory {}",
                config.library_dir.display()
            )
        })?;
        let settings = JsonSettingsStore::at(&config.settings_path);
        Ok(Self::spawn_with(
            Box::new(settings),
            Box::new(library),
            config.downloader,
        ))
    }

    /// Starts the worker over arbitrary stores.
    pub fn spawn_with(
        settings: Box<dyn SettingsStore>,
        library: Box<dyn LibraryStore>,
        downloader: DownloaderConfig,
    ) -> Self {
        let (request_tx, request_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let (outcome_tx, outcome_rx) = mpsc::channel();

        info!(library = %library.root().display(), "backend starting");
        let worker = Worker {
            downloader: Downloader::new(downloader, library.root(), outcome_tx),
            settings,
            library,
            events: event_tx.clone(),
        };
        thread::spawn(move || worker_loop(worker, request_rx, outcome_rx));

        Self {
            request_tx,
            event_tx,
            event_rx,
        }
    }

    pub fn send(&self, request: UiRequest) {
        debug!(?request, "ui request");
        let _ = self.request_tx.send(Envelope::new(request));
    }

    /// Next valid event, if any. Events failing validation are dropped.
    pub fn try_recv_event(&self) -> Option<BackendEvent> {
        loop {
            let envelope = self.event_rx.try_recv().ok()?;
            match envelope.open() {
                Ok(event) => return Some(event),
                Err(err) => warn!(error = %err, "dropping invalid backend event"),
            }
        }
    }

    /// Sender for producers that feed the UI alongside the worker, such as the
    /// control listener.
    pub fn event_sender(&self) -> Sender<Envelope<BackendEvent>> {
        self.event_tx.clone()
    }

    pub fn shutdown(&self) {
        let _ = self.request_tx.send(Envelope::new(UiRequest::Shutdown));
    }
}

struct Worker {
    settings: Box<dyn SettingsStore>,
    library: Box<dyn LibraryStore>,
    downloader: Downloader,
    events: Sender<Envelope<BackendEvent>>,
}

fn worker_loop(
    mut worker: Worker,
    request_rx: Receiver<Envelope<UiRequest>>,
    outcome_rx: Receiver<DownloadOutcome>,
) {
    loop {
        loop {
            match request_rx.try_recv() {
                Ok(envelope) => match envelope.open() {
                    Ok(UiRequest::Shutdown) => {
                        info!("backend shutting down");
                        return;
                    }
                    Ok(request) => worker.handle(request),
                    Err(err) => warn!(error = %err, "dropping invalid ui request"),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        while let Ok(outcome) = outcome_rx.try_recv() {
            worker.relay(outcome);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

impl Worker {
    fn handle(&mut self, request: UiRequest) {
        match request {
            UiRequest::GetVolume => self.emit(BackendEvent::Volume(self.settings.volume())),
            UiRequest::SetVolume(volume) => {
                if let Err(err) = self.settings.set_volume(volume) {
                    warn!(error = %format!("{err:#}"), "failed to persist volume");
                }
            }
            UiRequest::GetShuffle => self.emit(BackendEvent::Shuffle(self.settings.shuffle())),
            UiRequest::SetShuffle(shuffle) => {
                if let Err(err) = self.settings.set_shuffle(shuffle) {
                    warn!(error = %format!("{err:#}"), "failed to persist shuffle");
                }
            }
            UiRequest::GetPlaylistPath => {
                let path = self.library.root().to_path_buf();
                self.emit(BackendEvent::PlaylistPath(path));
            }
            UiRequest::ScanLibrary => match self.library.list() {
                Ok(names) => {
                    info!(tracks = names.len(), "library scanned");
                    self.emit(BackendEvent::LoadPlaylist(names));
                }
                Err(err) => warn!(error = %format!("{err:#}"), "library scan failed"),
            },
            UiRequest::DownloadAudio(link) => match self.downloader.submit(&link) {
                Ok(job) => self.emit(BackendEvent::DownloadStarted { job, link }),
                Err(err) => warn!(error = %err, "download rejected"),
            },
            UiRequest::DeleteFile(name) => match self.library.remove(&name) {
                Ok(()) => {
                    info!(%name, "file deleted");
                    self.emit(BackendEvent::FileDeleted(name));
                }
                Err(err) => {
                    let reason = format!("{err:#}");
                    warn!(%name, %reason, "delete failed");
                    self.emit(BackendEvent::DeleteFailed { name, reason });
                }
            },
            UiRequest::Shutdown => {}
        }
    }

    fn relay(&self, outcome: DownloadOutcome) {
        let event = match outcome {
            DownloadOutcome::Completed { job, path } => BackendEvent::DownloadComplete { job, path },
            DownloadOutcome::Failed { job, reason } => BackendEvent::DownloadFailed { job, reason },
        };
        self.emit(event);
    }

    fn emit(&self, event: BackendEvent) {
        debug!(?event, "backend event");
        let _ = self.events.send(Envelope::new(event));
    }
}
