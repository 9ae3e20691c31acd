//! Command-line arguments.
//!
//! The host passes `-port`, `-pluginUUID`, `-registerEvent` and `-info`;
//! they are normalized to double-dash form before parsing.

use std::path::PathBuf;

use clap::Parser;
use sdvolume_protocol::{Registration, normalize_args};

use crate::config::BackendKind;

#[derive(Debug, Parser)]
#[command(name = "sdvolume", version, about = "System volume dial for Stream Deck+")]
pub struct Cli {
    /// Port of the host's WebSocket server
    #[arg(long)]
    pub port: u16,

    /// Identifier to register under
    #[arg(long = "pluginUUID")]
    pub plugin_uuid: String,

    /// Name of the registration event
    #[arg(long = "registerEvent")]
    pub register_event: String,

    /// Host application info (JSON)
    #[arg(long)]
    pub info: Option<String>,

    /// Configuration file
    #[arg(long, env = "SDVOLUME_CONFIG")]
    pub config: Option<PathBuf>,

    /// Audio backend, overriding the configuration file
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,
}

impl Cli {
    /// Parse the process arguments.
    #[must_use]
    pub fn parse_host_args() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }

    #[must_use]
    pub fn registration(&self) -> Registration {
        Registration {
            port: self.port,
            plugin_uuid: self.plugin_uuid.clone(),
            register_event: self.register_event.clone(),
            info: self.info.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_args(args.iter().map(ToString::to_string)))
    }

    #[test]
    fn test_host_launch_arguments() {
        let cli = parse(&[
            "sdvolume",
            "-port",
            "28196",
            "-pluginUUID",
            "UUID-1",
            "-registerEvent",
            "registerPlugin",
            "-info",
            r#"{"application":{"version":"6.5"}}"#,
        ])
        .unwrap();

        let registration = cli.registration();
        assert_eq!(registration.port, 28196);
        assert_eq!(registration.plugin_uuid, "UUID-1");
        assert_eq!(registration.register_event, "registerPlugin");
        assert_eq!(registration.host_info().unwrap().unwrap().application.version, "6.5");
        assert_eq!(cli.backend, None);
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "sdvolume",
            "--port",
            "1",
            "--pluginUUID",
            "u",
            "--registerEvent",
            "r",
            "--backend",
            "memory",
            "--config",
            "/etc/sdvolume.toml",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(BackendKind::Memory));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/sdvolume.toml")));
    }

    #[test]
    fn test_missing_port() {
        assert!(parse(&["sdvolume", "-pluginUUID", "u", "-registerEvent", "r"]).is_err());
    }
}
