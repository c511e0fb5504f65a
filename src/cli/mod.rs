//! # CLI Module
//!
//! Command-line interface for the photo organizer.
//!
//! ## Usage
//! ```bash
//! # Sweep the inbox, then keep watching it until Ctrl-C
//! photo-organizer run --source ~/Inbox --destination ~/Pictures/Library
//!
//! # Process what is waiting now and exit
//! photo-organizer sweep
//!
//! # Keep exact duplicates in the Duplicates folder instead of deleting them
//! photo-organizer sweep --keep-duplicates
//!
//! # Show the running totals
//! photo-organizer stats
//! photo-organizer stats --json
//! ```

use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_organizer::config::{Overrides, Settings};
use photo_organizer::core::pipeline::Organizer;
use photo_organizer::core::service::{Service, ShutdownHandle};
use photo_organizer::core::stats::{PersistedStatistics, StatisticsRecord, StatisticsStore};
use photo_organizer::error::{Result, StartupError};
use photo_organizer::events::{
    Event, EventChannel, EventReceiver, FileEvent, ServiceEvent, SweepSummary,
};
use photo_organizer::logging::{init_logging, init_tracing};
use std::fs;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing::warn;

/// Photo Organizer - file photos and videos into a dated library
#[derive(Parser, Debug)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (INI). Defaults to the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory new files arrive in
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Root of the dated library
    #[arg(long, global = true)]
    destination: Option<PathBuf>,

    /// Keep exact duplicates in the Duplicates folder instead of deleting them
    #[arg(long, global = true)]
    keep_duplicates: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sweep the source directory, then watch it until interrupted
    Run,

    /// Process the files currently in the source directory and exit
    Sweep,

    /// Print the persisted statistics
    Stats {
        /// JSON output for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let overrides = Overrides {
        source: cli.source.clone(),
        destination: cli.destination.clone(),
        keep_duplicates: cli.keep_duplicates,
    };
    let settings = Settings::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Run => run_service(&settings, cli.verbose),
        Commands::Sweep => run_sweep(&settings, cli.verbose),
        Commands::Stats { json } => run_stats(&settings, json, cli.verbose),
    }
}

fn run_service(settings: &Settings, verbose: bool) -> Result<()> {
    settings.validate()?;
    let _guards = init_logging(&prepare_destination(settings)?, verbose)?;
    let shutdown = ShutdownHandle::install()?;

    let (sender, receiver) = EventChannel::new();
    let organizer = Organizer::builder()
        .settings(settings)
        .events(sender.clone())
        .build()?;
    let service = Service::new(organizer, settings.monitor_config(), shutdown, sender)?;

    let term = Term::stderr();
    term.write_line(&format!(
        "{} {}",
        style("Photo Organizer").bold().cyan(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} (Ctrl-C to stop)",
        style("Watching for new files").dim()
    ))
    .ok();

    let event_thread = spawn_progress(receiver, verbose);
    let record = service.run()?;
    event_thread.join().ok();

    print_record(&term, "Stopped", &record);
    Ok(())
}

fn run_sweep(settings: &Settings, verbose: bool) -> Result<()> {
    settings.validate()?;
    let _guards = init_logging(&prepare_destination(settings)?, verbose)?;

    let (sender, receiver) = EventChannel::new();
    let mut organizer = Organizer::builder()
        .settings(settings)
        .events(sender)
        .build()?;

    let event_thread = spawn_progress(receiver, verbose);
    let summary = organizer.sweep(settings.monitor_config().settle);
    let record = organizer.shutdown();
    event_thread.join().ok();

    let term = Term::stderr();
    print_summary(&term, &summary);
    print_record(&term, "Totals", &record);
    Ok(())
}

fn run_stats(settings: &Settings, json: bool, verbose: bool) -> Result<()> {
    init_tracing(verbose)?;
    let path = StatisticsStore::path_in(settings.destination_root()?);
    let persisted = StatisticsStore::read(&path)?;

    if json {
        let persisted = persisted.unwrap_or_default();
        match serde_json::to_string_pretty(&persisted) {
            Ok(output) => println!("{}", output),
            Err(e) => warn!(error = %e, "Failed to render statistics"),
        }
        return Ok(());
    }

    let term = Term::stdout();
    match persisted {
        Some(persisted) => print_persisted(&term, &persisted),
        None => {
            term.write_line(&format!(
                "{} No statistics recorded yet at {}",
                style("i").cyan(),
                path.display()
            ))
            .ok();
        }
    }
    Ok(())
}

/// Log files live in the destination root, so it has to exist first
fn prepare_destination(settings: &Settings) -> Result<PathBuf> {
    let destination = settings.destination_root()?.to_path_buf();
    fs::create_dir_all(&destination).map_err(|source| StartupError::DestinationUnwritable {
        path: destination.clone(),
        source,
    })?;
    Ok(destination)
}

/// Drive a progress bar from sweep events until every sender is gone
fn spawn_progress(receiver: EventReceiver, verbose: bool) -> JoinHandle<()> {
    let pb = ProgressBar::new(0);
    if let Ok(bar_style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(bar_style.progress_chars("█▓░"));
    }

    thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Service(ServiceEvent::SweepStarted { total }) => {
                    pb.set_length(total as u64);
                    pb.set_position(0);
                }
                Event::Service(ServiceEvent::SweepProgress {
                    completed, current, ..
                }) => {
                    pb.set_position(completed as u64);
                    pb.set_message(
                        current
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                            .into_owned(),
                    );
                }
                Event::Service(ServiceEvent::SweepCompleted { .. }) => {
                    pb.finish_and_clear();
                }
                Event::File(FileEvent::Deferred { path, reason }) if verbose => {
                    pb.println(format!(
                        "  {} {} ({})",
                        style("!").yellow(),
                        path.display(),
                        reason
                    ));
                }
                _ => {}
            }
        }
        pb.finish_and_clear();
    })
}

fn print_summary(term: &Term, summary: &SweepSummary) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} Sweep Complete in {:.1}s",
        style("✓").green().bold(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!("  {} filed", style(summary.moved).cyan()))
        .ok();
    term.write_line(&format!(
        "  {} moved to duplicates",
        style(summary.duplicated).cyan()
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicates deleted",
        style(summary.deleted).cyan()
    ))
    .ok();
    if summary.deferred > 0 {
        term.write_line(&format!(
            "  {} left for a later pass",
            style(summary.deferred).yellow()
        ))
        .ok();
    }
}

fn print_record(term: &Term, heading: &str, record: &StatisticsRecord) {
    term.write_line("").ok();
    term.write_line(&format!("{}", style(heading).bold().underlined()))
        .ok();
    let rows = [
        ("Moved", record.files_moved, record.bytes_moved),
        ("Duplicated", record.files_duplicated, record.bytes_duplicated),
        ("Deleted", record.files_deleted, record.bytes_deleted),
    ];
    for (label, files, bytes) in rows {
        term.write_line(&format!(
            "  {:<11} {:>8} files  {:>10}",
            label,
            style(files).cyan(),
            style(format_bytes(bytes)).yellow()
        ))
        .ok();
    }
}

fn print_persisted(term: &Term, persisted: &PersistedStatistics) {
    print_record(term, "Statistics", &persisted.record());
    if let Some(updated) = &persisted.last_updated {
        term.write_line(&format!(
            "  {} {}",
            style("Last updated:").dim(),
            style(updated).dim()
        ))
        .ok();
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024 / 2), "1.5 GB");
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "photo-organizer",
            "sweep",
            "--source",
            "/inbox",
            "--keep-duplicates",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Sweep));
        assert_eq!(cli.source, Some(PathBuf::from("/inbox")));
        assert!(cli.keep_duplicates);
    }

    #[test]
    fn stats_accepts_json_flag() {
        let cli = Cli::try_parse_from(["photo-organizer", "stats", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats { json: true }));
    }
}
