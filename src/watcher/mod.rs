//! Working tree watcher that turns filesystem activity into debounced
//! refresh notifications.

pub mod filter;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use crate::config::WatcherConfig;
use crate::error::WatchError;

/// Callback invoked once per debounced burst of relevant changes
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Watches a repository root and calls back after relevant changes settle
///
/// The callback runs on the watcher's own thread; callers that need another
/// thread must redispatch from inside it.
pub struct ChangeWatcher {
    root: PathBuf,
    config: WatcherConfig,
    callback: ChangeCallback,
    paused: Arc<AtomicBool>,
    active: Option<ActiveWatch>,
}

struct ActiveWatch {
    watcher: RecommendedWatcher,
    worker: Worker,
}

impl ChangeWatcher {
    /// Create a stopped watcher with the default timings
    pub fn new<P, F>(root: P, callback: F) -> Self
    where
        P: AsRef<Path>,
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_config(root, WatcherConfig::default(), callback)
    }

    pub fn with_config<P, F>(root: P, config: WatcherConfig, callback: F) -> Self
    where
        P: AsRef<Path>,
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
            callback: Arc::new(callback),
            paused: Arc::new(AtomicBool::new(false)),
            active: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Begin watching. Starting an already running watcher is a no-op.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.active.is_some() {
            return Ok(());
        }

        if !self.root.is_dir() {
            return Err(WatchError::MissingRoot(self.root.display().to_string()));
        }

        let mut roots = vec![self.root.clone()];
        if let Ok(canonical) = self.root.canonicalize() {
            if canonical != self.root {
                roots.push(canonical);
            }
        }

        let worker = Worker::spawn(
            roots,
            self.config.latency(),
            self.config.debounce(),
            self.paused.clone(),
            self.callback.clone(),
        )?;

        let tx = worker.sender();
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) || event.paths.is_empty() {
                        return;
                    }
                    let _ = tx.send(WatchMessage::Changed(event.paths));
                }
                Err(e) => warn!(error = %e, "filesystem notification error"),
            },
            notify::Config::default(),
        );

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(e) => {
                worker.shutdown();
                return Err(e.into());
            }
        };

        if let Err(e) = watcher.watch(&self.root, RecursiveMode::Recursive) {
            worker.shutdown();
            return Err(e.into());
        }

        debug!(root = %self.root.display(), "watching working tree");
        self.active = Some(ActiveWatch { watcher, worker });
        Ok(())
    }

    /// Stop watching and release the OS watch
    ///
    /// Cancels any pending callback. Once this returns the callback will not
    /// run again until the next `start`.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.worker.deactivate();
            drop(active.watcher);
            active.worker.shutdown();
            debug!(root = %self.root.display(), "stopped watching working tree");
        }
    }

    /// Keep observing events but never schedule a callback for them
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_watching(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

enum WatchMessage {
    Changed(Vec<PathBuf>),
    Shutdown,
}

/// Background thread that batches, filters and debounces change events
struct Worker {
    tx: Sender<WatchMessage>,
    alive: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

struct WorkerContext {
    roots: Vec<PathBuf>,
    latency: Duration,
    debounce: Duration,
    paused: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
    callback: ChangeCallback,
}

impl Worker {
    fn spawn(
        roots: Vec<PathBuf>,
        latency: Duration,
        debounce: Duration,
        paused: Arc<AtomicBool>,
        callback: ChangeCallback,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));

        let context = WorkerContext {
            roots,
            latency,
            debounce,
            paused,
            alive: alive.clone(),
            callback,
        };

        let handle = thread::Builder::new()
            .name("git-change-watcher".to_string())
            .spawn(move || run_worker(rx, context))?;

        Ok(Self {
            tx,
            alive,
            handle: Some(handle),
        })
    }

    fn sender(&self) -> Sender<WatchMessage> {
        self.tx.clone()
    }

    /// Make any timer that fires from now on a no-op
    fn deactivate(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    fn shutdown(mut self) {
        self.deactivate();
        let _ = self.tx.send(WatchMessage::Shutdown);

        if let Some(handle) = self.handle.take() {
            // stop() called from inside the callback cannot join its own thread;
            // the loop exits on the Shutdown message once the callback returns
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run_worker(rx: Receiver<WatchMessage>, context: WorkerContext) {
    let mut deadline: Option<Instant> = None;

    loop {
        let message = match deadline {
            Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match message {
            Ok(WatchMessage::Changed(paths)) => {
                let Some(batch) = collect_batch(&rx, paths, context.latency) else {
                    return;
                };

                if context.paused.load(Ordering::SeqCst) {
                    debug!(events = batch.len(), "watcher paused, ignoring changes");
                    continue;
                }

                if !batch
                    .iter()
                    .any(|path| filter::is_relevant_to_any(&context.roots, path))
                {
                    continue;
                }

                debug!(events = batch.len(), "relevant changes, rescheduling refresh");
                deadline = Some(Instant::now() + context.debounce);
            }
            Ok(WatchMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {
                deadline = None;
                if context.alive.load(Ordering::SeqCst) {
                    debug!("firing change callback");
                    (context.callback)();
                }
            }
        }
    }
}

/// Merge everything that arrives within `latency` of the first event.
/// Returns `None` when the watcher is shutting down.
fn collect_batch(
    rx: &Receiver<WatchMessage>,
    mut batch: Vec<PathBuf>,
    latency: Duration,
) -> Option<Vec<PathBuf>> {
    let window_end = Instant::now() + latency;

    loop {
        let remaining = window_end.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Some(batch);
        }

        match rx.recv_timeout(remaining) {
            Ok(WatchMessage::Changed(paths)) => batch.extend(paths),
            Ok(WatchMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => return None,
            Err(RecvTimeoutError::Timeout) => return Some(batch),
        }
    }
}
