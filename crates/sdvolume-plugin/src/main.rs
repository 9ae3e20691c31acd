//! SDVolume - System volume dial for Stream Deck+ encoders.
//!
//! Launched by the Stream Deck host, this plugin connects back over a local
//! WebSocket and binds every dial instance to the default output device's
//! volume and mute state.

use std::sync::Arc;

use anyhow::{Context, Result};
use sdvolume_device::{AlsaMixerBackend, AudioBackend, MemoryBackend, MemoryDevice, VolumeController};
use sdvolume_protocol::PluginClient;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod bridge;
mod cli;
mod config;
mod dispatch;
mod signals;

use bridge::DialBridge;
use cli::Cli;
use config::{BackendKind, Config};

/// Crates whose log level follows the configuration.
const LOG_TARGETS: &[&str] = &["sdvolume", "sdvolume_core", "sdvolume_device", "sdvolume_protocol"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_host_args();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.device.backend = backend;
    }

    // Initialize logging; the host captures stderr
    let mut filter = EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        filter = filter.add_directive(format!("{target}={}", config.plugin.log_level).parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    info!(version = env!("CARGO_PKG_VERSION"), backend = ?config.device.backend, "Starting SDVolume");

    let registration = cli.registration();
    match registration.host_info() {
        Ok(Some(host)) => info!(
            host_version = %host.application.version,
            platform = %host.application.platform,
            devices = host.devices.len(),
            "Host info"
        ),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Ignoring host info"),
    }

    let backend = build_backend(&config);
    let controller = VolumeController::new(backend);

    let mut client = PluginClient::connect(&registration)
        .await
        .context("Failed to connect to the Stream Deck host")?;
    let sender = client.sender();
    if let Err(e) = sender.log_message(format!("SDVolume {} started", env!("CARGO_PKG_VERSION"))) {
        warn!(error = %e, "Failed to send startup log message");
    }

    let bridge = DialBridge::new(controller, Arc::new(sender), config.dial.style());

    let shutdown = signals::shutdown_signal();
    tokio::pin!(shutdown);

    info!("Entering main event loop");
    loop {
        tokio::select! {
            event = client.events().recv() => {
                let Some(event) = event else {
                    info!("Host closed the connection");
                    break;
                };
                // Device calls may block on the mixer
                let bridge = bridge.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || dispatch::dispatch(&bridge, event)).await {
                    error!(error = %e, "Event handler panicked");
                }
            }

            signal = &mut shutdown => {
                info!(signal, "Shutdown signal received");
                break;
            }
        }
    }

    if !bridge.is_empty() {
        info!(count = bridge.len(), "Releasing active dials");
    }
    bridge.clear();
    info!("SDVolume stopped");
    Ok(())
}

fn build_backend(config: &Config) -> Arc<dyn AudioBackend> {
    match config.device.backend {
        BackendKind::Alsa => {
            let backend =
                AlsaMixerBackend::new(config.device.card.clone(), config.device.control.clone());
            info!(card = ?config.device.card, control = %backend.control(), "Using ALSA mixer");
            Arc::new(backend)
        }
        BackendKind::Memory => {
            info!("Using in-memory output device");
            Arc::new(MemoryBackend::with_default_device(MemoryDevice::new(0.5, false)))
        }
    }
}
