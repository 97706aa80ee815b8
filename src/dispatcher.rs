//! Serialized announcement playback
//!
//! Every announcement goes through one queue drained by a single worker task,
//! so two announcements never play at the same time and none are dropped
//! while the dispatcher is running. The speech engine is created on the first
//! request and kept until shutdown.

use crate::{
    error::{DispatchError, SpeechError},
    speech::{LogSpeaker, Speaker},
    types::AnnouncementRequest,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Creates the speech engine; called again on the next request if it fails
pub type SpeakerFactory = Arc<dyn Fn() -> Result<Box<dyn Speaker>, SpeechError> + Send + Sync>;

/// Cheap-to-clone handle for queuing announcements
#[derive(Clone)]
pub struct AnnouncementDispatcher {
    tx: mpsc::UnboundedSender<AnnouncementRequest>,
    shutdown: CancellationToken,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AnnouncementDispatcher {
    /// Spawns the playback worker
    ///
    /// Requests that arrive while the engine cannot be acquired are written
    /// to the log. Must be called from within a tokio runtime.
    pub fn start<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn Speaker>, SpeechError> + Send + Sync + 'static,
    {
        Self::start_with_fallback(factory, Arc::new(LogSpeaker))
    }

    /// Like [`start`](Self::start), with `fallback` playing any request the
    /// engine could not be acquired for
    pub fn start_with_fallback<F>(factory: F, fallback: Arc<dyn Speaker>) -> Self
    where
        F: Fn() -> Result<Box<dyn Speaker>, SpeechError> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_worker(
            rx,
            Arc::new(factory),
            fallback,
            shutdown.clone(),
        ));

        Self {
            tx,
            shutdown,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Queues `text` for playback
    ///
    /// Returns immediately; requests are played in the order they were accepted.
    pub fn announce(&self, text: impl Into<String>) -> Result<(), DispatchError> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::Closed);
        }
        self.tx
            .send(AnnouncementRequest::new(text))
            .map_err(|_| DispatchError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.tx.is_closed()
    }

    /// Stops accepting requests, plays what is already queued, then releases
    /// the speech engine
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Announcement worker panicked");
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<AnnouncementRequest>,
    factory: SpeakerFactory,
    fallback: Arc<dyn Speaker>,
    shutdown: CancellationToken,
) {
    let mut engine: Option<Arc<dyn Speaker>> = None;
    let mut spoken: u64 = 0;

    loop {
        let request = tokio::select! {
            biased;
            request = rx.recv() => request,
            _ = shutdown.cancelled() => {
                rx.close();
                rx.recv().await
            }
        };
        let Some(request) = request else {
            break;
        };

        let speaker = match &engine {
            Some(speaker) => speaker.clone(),
            None => match acquire(&factory).await {
                Some(speaker) => {
                    engine = Some(speaker.clone());
                    speaker
                }
                // Retried on the next request
                None => fallback.clone(),
            },
        };

        let text = request.text;
        match tokio::task::spawn_blocking(move || speaker.speak(&text)).await {
            Ok(Ok(())) => spoken += 1,
            Ok(Err(e)) => tracing::warn!(error = %e, "Announcement playback failed"),
            Err(e) => tracing::error!(error = %e, "Announcement playback panicked"),
        }
    }

    drop(engine);
    tracing::info!(spoken, "Announcement dispatcher stopped");
}

async fn acquire(factory: &SpeakerFactory) -> Option<Arc<dyn Speaker>> {
    let factory = factory.clone();
    match tokio::task::spawn_blocking(move || factory()).await {
        Ok(Ok(speaker)) => {
            tracing::info!("Speech engine ready");
            Some(Arc::from(speaker))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Speech engine unavailable");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Speech engine initialization panicked");
            None
        }
    }
}
