use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::agent::GuideGenerator;
use crate::core::{ProgressEvent, ProgressSink};

const EVENT_CAPACITY: usize = 256;

/// Shared state behind every route
#[derive(Clone)]
pub struct ServeState {
    generator: Arc<GuideGenerator>,
    events: broadcast::Sender<ProgressEvent>,
    run_lock: Arc<Mutex<()>>,
    project_root: PathBuf,
}

impl ServeState {
    /// `project_root` bounds what `/api/files` will serve
    pub fn new(generator: GuideGenerator, project_root: impl Into<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            generator: Arc::new(generator),
            events,
            run_lock: Arc::new(Mutex::new(())),
            project_root: project_root.into(),
        }
    }

    pub fn generator(&self) -> &Arc<GuideGenerator> {
        &self.generator
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn dataset_root(&self) -> PathBuf {
        self.project_root.join(&self.generator.config().dataset.root)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Progress sink that fans out to every WebSocket subscriber
    pub fn progress(&self) -> Arc<BroadcastProgress> {
        Arc::new(BroadcastProgress {
            events: self.events.clone(),
        })
    }

    /// Claim the single run slot; `None` while another run holds it
    pub fn try_begin_run(&self) -> Option<OwnedMutexGuard<()>> {
        Arc::clone(&self.run_lock).try_lock_owned().ok()
    }

    pub fn run_active(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }
}

/// Broadcasts progress events to connected clients
#[derive(Clone)]
pub struct BroadcastProgress {
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressSink for BroadcastProgress {
    fn emit(&self, event: ProgressEvent) {
        // No subscribers is fine
        if self.events.send(event).is_err() {
            debug!("progress event dropped, no websocket clients");
        }
    }
}
