//! Watcher lifecycle around the delivery pipeline.
//!
//! # Responsibility
//! - Connect `ChangeWatcher` events to `DeliveryPipeline::handle` on the
//!   blocking thread pool.
//! - Provide restartable `start`/`stop` for the pause control.
//!
//! # Invariants
//! - At most one subscription and one consumer task exist at a time.
//! - `stop()` returns only after the consumer task has exited; an in-flight
//!   delivery finishes first and queued events are dropped.
//! - Events from one subscription are handled one at a time, in order.
//! - `stop()`/`start()` reuse the same pipeline, so per-path debounce state
//!   survives a pause. Only the ledger outlives the process.

use crate::service::pipeline::DeliveryPipeline;
use crate::watch::watcher::{ChangeWatcher, WatchResult};
use crate::watch::FileChanged;
use log::{debug, error, info};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

struct Consumer {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Runs the pipeline for every change under one watch root.
pub struct NoteService {
    pipeline: Arc<DeliveryPipeline>,
    watcher: ChangeWatcher,
    consumer: Option<Consumer>,
}

impl NoteService {
    pub fn new(pipeline: Arc<DeliveryPipeline>, watch_root: impl AsRef<Path>) -> Self {
        Self {
            pipeline,
            watcher: ChangeWatcher::new(watch_root.as_ref()),
            consumer: None,
        }
    }

    pub fn watch_root(&self) -> &Path {
        self.watcher.root()
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// Subscribes to the watch root and spawns the consumer task.
    ///
    /// No-op when already running. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// - `WatchRootMissing` when the root is absent; nothing is left running.
    pub fn start(&mut self) -> WatchResult<()> {
        if self.is_running() {
            debug!("event=service_start module=service status=ok detail=already_running");
            return Ok(());
        }

        let events = match self.watcher.start() {
            Ok(events) => events,
            Err(err) => {
                error!(
                    "event=service_start module=service status=error root={} error={}",
                    self.watcher.root().display(),
                    err
                );
                return Err(err);
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(consume_events(
            events,
            shutdown_rx,
            Arc::clone(&self.pipeline),
        ));
        self.consumer = Some(Consumer {
            shutdown: shutdown_tx,
            task,
        });

        info!(
            "event=service_start module=service status=ok root={}",
            self.watcher.root().display()
        );
        Ok(())
    }

    /// Releases the subscription and waits for the consumer to exit.
    pub async fn stop(&mut self) {
        self.watcher.stop();

        let Some(consumer) = self.consumer.take() else {
            return;
        };
        let _ = consumer.shutdown.send(());
        if let Err(err) = consumer.task.await {
            error!("event=service_stop module=service status=error error={err}");
            return;
        }
        info!("event=service_stop module=service status=ok");
    }
}

async fn consume_events(
    mut events: mpsc::UnboundedReceiver<FileChanged>,
    mut shutdown: oneshot::Receiver<()>,
    pipeline: Arc<DeliveryPipeline>,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let worker = Arc::clone(&pipeline);
        let path = event.path.clone();
        if let Err(err) = tokio::task::spawn_blocking(move || worker.handle(&event)).await {
            error!(
                "event=pipeline module=service status=error path={} error_code=worker_failed error={}",
                path.display(),
                err
            );
        }
    }
    debug!("event=consumer_exit module=service status=ok");
}
