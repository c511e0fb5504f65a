//! # Service Module
//!
//! The long-running loop: sweep the source directory, then monitor it until
//! shutdown is requested.
//!
//! ## Lifecycle
//! 1. Initial sweep over files already waiting in the source directory
//! 2. Watch the source directory and process settled files as they arrive
//! 3. Flush statistics when a trigger fires, and after each quiet period
//! 4. On SIGINT/SIGTERM, stop watching and flush unconditionally
//!
//! A watch that fails to start also ends with an unconditional flush.

use crate::core::pipeline::Organizer;
use crate::core::stats::StatisticsRecord;
use crate::core::watcher::{DirectoryMonitor, MonitorConfig};
use crate::error::{MonitorError, StartupError};
use crate::events::{Event, EventSender, ServiceEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Shared flag telling the service loop to stop
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a SIGINT/SIGTERM handler that trips this handle.
    ///
    /// Only one handler can be installed per process.
    pub fn install() -> Result<Self, StartupError> {
        let handle = Self::new();
        let flag = handle.clone();
        ctrlc::set_handler(move || flag.request())
            .map_err(|e| StartupError::SignalHandler(e.to_string()))?;
        Ok(handle)
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An organizer driven by a directory monitor
pub struct Service {
    organizer: Organizer,
    monitor: DirectoryMonitor,
    config: MonitorConfig,
    shutdown: ShutdownHandle,
    events: EventSender,
}

impl Service {
    pub fn new(
        organizer: Organizer,
        config: MonitorConfig,
        shutdown: ShutdownHandle,
        events: EventSender,
    ) -> Result<Self, MonitorError> {
        let monitor = DirectoryMonitor::new(organizer.source(), config, events.clone())?;
        Ok(Self {
            organizer,
            monitor,
            config,
            shutdown,
            events,
        })
    }

    pub fn organizer(&self) -> &Organizer {
        &self.organizer
    }

    /// Run until shutdown is requested, then return the final statistics
    pub fn run(mut self) -> Result<StatisticsRecord, MonitorError> {
        self.events.send(Event::Service(ServiceEvent::Started {
            source: self.organizer.source().to_path_buf(),
            destination: self.organizer.destination().to_path_buf(),
        }));

        self.organizer.sweep(self.config.settle);
        if let Err(e) = self.monitor.watch() {
            warn!(error = %e, "Monitoring could not start, flushing statistics");
            let record = self.organizer.shutdown();
            self.events
                .send(Event::Service(ServiceEvent::Stopped { record }));
            return Err(e);
        }
        info!(source = %self.organizer.source().display(), "Monitoring source directory");

        let mut last_activity = Instant::now();
        let mut idle_reported = false;

        while !self.shutdown.is_requested() {
            let settled = self.monitor.poll();

            if settled.is_empty() {
                if !idle_reported && last_activity.elapsed() >= self.config.idle_report {
                    self.organizer.report_idle();
                    idle_reported = true;
                }
            } else {
                for path in settled {
                    if self.shutdown.is_requested() {
                        break;
                    }
                    self.organizer.process(&path);
                }
                last_activity = Instant::now();
                idle_reported = false;
            }

            self.organizer.maybe_flush();
        }

        info!("Shutdown requested");
        self.events.send(Event::Service(ServiceEvent::ShutdownRequested));
        self.monitor.unwatch();

        let record = self.organizer.shutdown();
        self.events
            .send(Event::Service(ServiceEvent::Stopped { record }));
        Ok(record)
    }
}
