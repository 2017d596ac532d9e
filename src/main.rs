//! Application entry point for the SOS alert service.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] from disk (defaults on first run or on a bad file).
//! 4. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Dispatch the subcommand.  `run` starts [`SosService`] and blocks until
//!    Ctrl-C, then stops it in order.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use sos_alert::{
    alert::{AlertEvent, SessionOutcome, TriggerSource},
    cli::{Cli, Command, ContactsCommand},
    config::{AppConfig, AppPaths, MotionSourceKind},
    recordings::list_recordings,
    response::{Contact, ContactStore, JsonContactStore},
    service::{build_services, run_once, ServiceStatus, SosService},
};

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn describe(event: &AlertEvent) -> String {
    match event {
        AlertEvent::SessionStarted { session, source } => {
            format!("[{session}] started by {source} trigger")
        }
        AlertEvent::StateChanged { session, state } => format!("[{session}] → {state}"),
        AlertEvent::NotificationSent { session, contact } => {
            format!("[{session}] notified {contact}")
        }
        AlertEvent::NotificationFailed {
            session,
            contact,
            error,
        } => format!("[{session}] could not notify {contact}: {error}"),
        AlertEvent::RecordingStarted { session, path } => {
            format!("[{session}] recording to {}", path.display())
        }
        AlertEvent::RecordingFailed { session, error } => {
            format!("[{session}] recording failed: {error}")
        }
        AlertEvent::SessionFinished { session, outcome } => {
            format!("[{session}] finished: {}", describe_outcome(outcome))
        }
    }
}

fn describe_outcome(outcome: &SessionOutcome) -> String {
    match outcome {
        SessionOutcome::Completed { recording } => {
            format!("contacts notified, evidence at {}", recording.display())
        }
        SessionOutcome::CompletedWithoutRecording => "contacts notified, no recording".into(),
        SessionOutcome::NoContacts => "no contacts registered, nothing sent".into(),
        SessionOutcome::Cancelled => "cancelled".into(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_run(config: AppConfig, paths: AppPaths) -> Result<()> {
    let mut service = SosService::start(config, paths).await?;

    let mut events = service.coordinator().subscribe();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", describe(&event));
        }
    });

    let sources: Vec<String> = service
        .active_sources()
        .iter()
        .map(TriggerSource::to_string)
        .collect();
    if sources.is_empty() {
        println!("SOS alert running with no active triggers. Press Ctrl-C to stop.");
    } else {
        println!(
            "SOS alert running (triggers: {}). Press Ctrl-C to stop.",
            sources.join(", ")
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    println!("Stopping…");

    service.stop().await?;
    printer.abort();
    Ok(())
}

fn cmd_status(config: &AppConfig, paths: &AppPaths) -> Result<()> {
    let status = ServiceStatus::load_from(&paths.status_file)?;
    let contacts = JsonContactStore::new(&paths.contacts_file).list_contacts()?;

    let shake = config.motion.enabled && config.motion.source != MotionSourceKind::Disabled;

    println!(
        "service:     {}",
        if status.is_running { "running" } else { "stopped" }
    );
    println!(
        "shake:       {} (> {:.1} g)",
        yes_no(shake),
        config.motion.threshold_g
    );
    println!(
        "voice:       {} (\"{}\", model {})",
        yes_no(config.voice.enabled),
        config.voice.activation_phrase,
        config.voice.model
    );
    println!("contacts:    {}", contacts.len());
    println!(
        "cooldown:    {:.0}s, recording {:.0}s",
        config.alert.cooldown_secs, config.alert.recording_secs
    );
    println!("recordings:  {}", config.recordings_dir(paths).display());
    Ok(())
}

async fn cmd_test(config: &AppConfig, paths: &AppPaths, source: TriggerSource) -> Result<()> {
    let outcome = run_once(config, build_services(config, paths), source, |event| {
        println!("{}", describe(event))
    })
    .await?;
    log::debug!("test alert outcome: {outcome:?}");
    Ok(())
}

fn cmd_contacts(paths: &AppPaths, command: ContactsCommand) -> Result<()> {
    let store = JsonContactStore::new(&paths.contacts_file);
    match command {
        ContactsCommand::List => {
            let contacts = store.list_contacts()?;
            if contacts.is_empty() {
                println!("No contacts registered.");
            }
            for (i, c) in contacts.iter().enumerate() {
                println!("{:>2}. {}  {}", i + 1, c.name, c.phone_number);
            }
        }
        ContactsCommand::Add { name, phone_number } => {
            store.add(Contact::new(name.clone(), phone_number.clone()))?;
            println!("Added {name} ({phone_number}).");
        }
        ContactsCommand::Remove { phone_number } => {
            if store.remove(&phone_number)? {
                println!("Removed {phone_number}.");
            } else {
                println!("No contact with number {phone_number}.");
            }
        }
    }
    Ok(())
}

fn cmd_recordings(config: &AppConfig, paths: &AppPaths) -> Result<()> {
    let dir = config.recordings_dir(paths);
    let entries = list_recordings(&dir)?;
    if entries.is_empty() {
        println!("No recordings in {}.", dir.display());
    }
    for entry in entries {
        println!(
            "{}  {:>8.1} KB  {}",
            entry.modified_local().format("%Y-%m-%d %H:%M:%S"),
            entry.size_bytes as f64 / 1024.0,
            entry.file_name()
        );
    }
    Ok(())
}

fn cmd_message(mut config: AppConfig, settings_file: &Path, text: Option<String>) -> Result<()> {
    match text {
        None => println!("{}", config.alert.message_text()),
        Some(text) => {
            let text = text.trim();
            config.alert.message = if text.is_empty() || text.eq_ignore_ascii_case("default") {
                None
            } else {
                Some(text.to_string())
            };
            config.save_to(settings_file)?;
            println!("Alert message: {}", config.alert.message_text());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Configuration
    let paths = AppPaths::new();
    let settings_file = cli.config.clone().unwrap_or_else(|| paths.settings_file.clone());
    let config = AppConfig::load_from(&settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Dispatch
    match cli.command {
        Command::Run => rt.block_on(cmd_run(config, paths)),
        Command::Status => cmd_status(&config, &paths),
        Command::Test { source } => rt.block_on(cmd_test(&config, &paths, source.into())),
        Command::Contacts { command } => cmd_contacts(&paths, command),
        Command::Recordings => cmd_recordings(&config, &paths),
        Command::Message { text } => cmd_message(config, &settings_file, text),
    }
}
