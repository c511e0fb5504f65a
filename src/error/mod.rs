//! # Error Module
//!
//! Error types for the photo organizer.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Contain per-file failures** - only startup errors stop the service

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Startup failed: {0}")]
    Startup(#[from] StartupError),

    #[error("File operation error: {0}")]
    FileOp(#[from] FileOpError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Statistics error: {0}")]
    Statistics(#[from] StatsError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Errors while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing required setting `{key}` (set it in config.ini or pass it on the command line)")]
    Missing { key: &'static str },

    #[error("Source and destination must differ: {path}")]
    SameDirectories { path: PathBuf },
}

/// Resource-level failures that prevent the pipeline from running at all
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Destination root is not writable: {path}: {source}")]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source directory cannot be used: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File locking is unavailable for {path}: {source}")]
    LockUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Failed to install shutdown signal handler: {0}")]
    SignalHandler(String),
}

/// Errors computing or comparing file contents
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to read {path} for fingerprinting: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors performing a physical move or delete
#[derive(Error, Debug)]
pub enum FileOpError {
    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Refusing to overwrite existing file: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {path}: source {expected} bytes, dest {actual} bytes")]
    CopyVerification {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reading or writing the persisted statistics file
#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Failed to read statistics file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Statistics file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to write statistics file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the directory monitor
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Failed to initialize watcher: {0}")]
    InitFailed(String),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to watch {path}: {reason}")]
    WatchFailed { path: PathBuf, reason: String },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, OrganizerError>;
