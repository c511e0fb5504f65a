//! # Watcher Module
//!
//! Feeds settled files from the source directory to the organizer.
//!
//! ## Features
//! - Watches the source directory (non-recursively) for created and renamed files
//! - Relists the directory periodically to catch anything notifications missed
//! - Holds each path until it has not been modified for `settle`
//! - Hands paths out in discovery order
//!
//! ## Example
//! ```rust,ignore
//! let mut monitor = DirectoryMonitor::new(&source, MonitorConfig::default(), events)?;
//! monitor.watch()?;
//!
//! loop {
//!     for path in monitor.poll() {
//!         organizer.process(&path);
//!     }
//! }
//! ```

use crate::core::media::is_ignored;
use crate::error::MonitorError;
use crate::events::{Event, EventSender, MonitorEvent};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Timing of the monitor and the service loop around it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Minimum time since last modification before a file is handed out
    pub settle: Duration,
    /// How often the source directory is relisted
    pub rescan_interval: Duration,
    /// Longest wait for a notification in one `poll`
    pub poll_interval: Duration,
    /// Quiet period after which the service logs a statistics summary
    pub idle_report: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            rescan_interval: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            idle_report: Duration::from_secs(60),
        }
    }
}

/// Queue of candidate paths from one source directory
pub struct DirectoryMonitor {
    source: PathBuf,
    config: MonitorConfig,
    watcher: Option<RecommendedWatcher>,
    notify_tx: Sender<PathBuf>,
    notify_rx: Receiver<PathBuf>,
    pending: VecDeque<PathBuf>,
    queued: HashSet<PathBuf>,
    last_rescan: Option<Instant>,
    events: EventSender,
}

impl DirectoryMonitor {
    /// Create a monitor for `source`. Nothing is watched until [`watch`](Self::watch).
    pub fn new(
        source: impl AsRef<Path>,
        config: MonitorConfig,
        events: EventSender,
    ) -> Result<Self, MonitorError> {
        let source = source.as_ref().to_path_buf();
        if !source.is_dir() {
            return Err(MonitorError::PathNotFound(source));
        }

        let (notify_tx, notify_rx) = unbounded();
        Ok(Self {
            source,
            config,
            watcher: None,
            notify_tx,
            notify_rx,
            pending: VecDeque::new(),
            queued: HashSet::new(),
            last_rescan: None,
            events,
        })
    }

    /// Start receiving change notifications for the source directory
    pub fn watch(&mut self) -> Result<(), MonitorError> {
        let tx = self.notify_tx.clone();
        let events = self.events.clone();

        let mut watcher = notify::recommended_watcher(
            move |result: Result<NotifyEvent, notify::Error>| match result {
                Ok(event) => {
                    Self::forward(&tx, event);
                }
                Err(e) => {
                    warn!(error = %e, "Watcher error");
                    events.send(Event::Monitor(MonitorEvent::Error {
                        message: e.to_string(),
                    }));
                }
            },
        )
        .map_err(|e| MonitorError::InitFailed(e.to_string()))?;

        watcher
            .watch(&self.source, RecursiveMode::NonRecursive)
            .map_err(|e| MonitorError::WatchFailed {
                path: self.source.clone(),
                reason: e.to_string(),
            })?;

        self.watcher = Some(watcher);
        self.events.send(Event::Monitor(MonitorEvent::Started {
            path: self.source.clone(),
        }));
        Ok(())
    }

    /// Stop receiving notifications; queued paths are kept
    pub fn unwatch(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.source) {
                debug!(path = %self.source.display(), error = %e, "Unwatch failed");
            }
            self.events.send(Event::Monitor(MonitorEvent::Stopped {
                path: self.source.clone(),
            }));
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of paths waiting to settle
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Paths a notify event adds to the queue
    fn paths_of_interest(event: NotifyEvent) -> Vec<PathBuf> {
        match event.kind {
            EventKind::Create(_) => event.paths,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                event.paths.into_iter().skip(1).collect()
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Vec::new(),
            EventKind::Modify(_) => event.paths,
            _ => Vec::new(),
        }
    }

    /// Hand a notify event's paths to the polling side; returns how many were delivered
    fn forward(tx: &Sender<PathBuf>, event: NotifyEvent) -> usize {
        let mut delivered = 0;
        for path in Self::paths_of_interest(event) {
            match tx.send(path) {
                Ok(()) => delivered += 1,
                Err(e) => debug!(path = %e.0.display(), "Monitor dropped, discarding notification"),
            }
        }
        delivered
    }

    /// Queue a path if it is a file directly inside the source directory
    pub fn enqueue(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if path.parent() != Some(self.source.as_path()) || is_ignored(&path) || !path.is_file() {
            return false;
        }
        if !self.queued.insert(path.clone()) {
            return false;
        }

        debug!(path = %path.display(), "Queued");
        self.events.send(Event::Monitor(MonitorEvent::Queued { path: path.clone() }));
        self.pending.push_back(path);
        true
    }

    /// Relist the source directory and queue every file found
    pub fn rescan(&mut self) -> usize {
        self.last_rescan = Some(Instant::now());

        let entries = match fs::read_dir(&self.source) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.source.display(), error = %e, "Cannot list source directory");
                return 0;
            }
        };

        let mut paths: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((modified, entry.path()))
            })
            .collect();
        paths.sort();

        let queued = paths
            .into_iter()
            .filter(|(_, path)| self.enqueue(path.clone()))
            .count();

        if queued > 0 {
            self.events.send(Event::Monitor(MonitorEvent::Rescanned { queued }));
        }
        queued
    }

    /// Wait up to `poll_interval` for activity and return the settled paths
    pub fn poll(&mut self) -> Vec<PathBuf> {
        match self.notify_rx.recv_timeout(self.config.poll_interval) {
            Ok(path) => {
                self.enqueue(path);
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {}
        }
        while let Ok(path) = self.notify_rx.try_recv() {
            self.enqueue(path);
        }

        let rescan_due = self
            .last_rescan
            .is_none_or(|at| at.elapsed() >= self.config.rescan_interval);
        if rescan_due {
            self.rescan();
        }

        self.take_settled(SystemTime::now())
    }

    /// Remove and return, in queue order, the paths settled as of `now`
    pub fn take_settled(&mut self, now: SystemTime) -> Vec<PathBuf> {
        let mut ready = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.pending.len());

        while let Some(path) = self.pending.pop_front() {
            let modified = fs::metadata(&path).and_then(|m| m.modified());
            match modified {
                Err(_) => {
                    // Gone (moved away or deleted) before it settled
                    self.queued.remove(&path);
                }
                Ok(modified) => {
                    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
                    if age >= self.config.settle {
                        self.queued.remove(&path);
                        ready.push(path);
                    } else {
                        waiting.push_back(path);
                    }
                }
            }
        }

        self.pending = waiting;
        ready
    }
}

impl Drop for DirectoryMonitor {
    fn drop(&mut self) {
        self.unwatch();
    }
}
