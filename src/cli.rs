//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::alert::TriggerSource;

/// Personal-safety alert service: shake or say the activation phrase to
/// notify your emergency contacts and record evidence.
#[derive(Debug, Parser)]
#[command(name = "sos-alert", version)]
pub struct Cli {
    /// Path to settings.toml (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start listening for triggers until Ctrl-C
    Run,

    /// Show whether the service is running and what it is configured to do
    Status,

    /// Run one alert sequence now and print its progress
    Test {
        #[arg(short, long, value_enum, default_value_t = SourceArg::Shake)]
        source: SourceArg,
    },

    /// Manage emergency contacts
    Contacts {
        #[command(subcommand)]
        command: ContactsCommand,
    },

    /// List evidence recordings, newest first
    Recordings,

    /// Show the alert message, or set it when TEXT is given
    Message {
        /// New message text; "default" restores the built-in message
        text: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ContactsCommand {
    /// Print every registered contact
    List,

    /// Register a contact
    Add { name: String, phone_number: String },

    /// Remove the contact with this phone number
    Remove { phone_number: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Shake,
    Voice,
}

impl From<SourceArg> for TriggerSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Shake => TriggerSource::Shake,
            SourceArg::Voice => TriggerSource::Voice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_test_source() {
        let cli = Cli::try_parse_from(["sos-alert", "test", "--source", "voice"]).unwrap();
        match cli.command {
            Command::Test { source } => assert_eq!(TriggerSource::from(source), TriggerSource::Voice),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_defaults_to_shake() {
        let cli = Cli::try_parse_from(["sos-alert", "test"]).unwrap();
        assert!(matches!(cli.command, Command::Test { source: SourceArg::Shake }));
    }

    #[test]
    fn parses_contact_add_with_global_config() {
        let cli = Cli::try_parse_from([
            "sos-alert",
            "contacts",
            "add",
            "Ana",
            "+15550001",
            "--config",
            "/tmp/s.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
        match cli.command {
            Command::Contacts {
                command: ContactsCommand::Add { name, phone_number },
            } => {
                assert_eq!(name, "Ana");
                assert_eq!(phone_number, "+15550001");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn message_text_is_optional() {
        let cli = Cli::try_parse_from(["sos-alert", "message"]).unwrap();
        assert!(matches!(cli.command, Command::Message { text: None }));
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(Cli::try_parse_from(["sos-alert", "test", "--source", "tap"]).is_err());
    }
}
