//! ALSA mixer backend.
//!
//! Drives a simple mixer control (normally `Master`) on the default sound
//! card through the `amixer` utility. Change notifications come from an
//! `amixer events` process per card, read on a dedicated thread.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::property::{AudioBackend, DeviceId, Listener, ListenerId, Property, PropertyValue};

/// Kernel list of sound cards.
const CARDS_PATH: &str = "/proc/asound/cards";
/// Mixer utility from alsa-utils.
const AMIXER: &str = "amixer";
/// Environment variable ALSA itself uses to pick the default card.
const CARD_ENV: &str = "ALSA_CARD";
/// Mixer control used when none is configured.
pub const DEFAULT_CONTROL: &str = "Master";

type ListenerMap = Arc<Mutex<HashMap<ListenerId, (Property, Listener)>>>;

/// A running `amixer events` process and the listeners it feeds.
struct CardMonitor {
    child: Child,
    listeners: ListenerMap,
}

impl CardMonitor {
    /// Whether the `amixer events` process is still alive.
    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn stop(mut self) {
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "Mixer monitor already exited");
        }
        let _ = self.child.wait();
    }
}

/// [`AudioBackend`] over an ALSA simple mixer control.
pub struct AlsaMixerBackend {
    card: Option<String>,
    control: String,
    events_program: String,
    monitors: Mutex<HashMap<DeviceId, CardMonitor>>,
    next_listener: AtomicU64,
}

impl AlsaMixerBackend {
    /// Create a backend.
    ///
    /// `card` is a card index or id; when `None`, `$ALSA_CARD` is honored,
    /// then the first card is used.
    #[must_use]
    pub fn new(card: Option<String>, control: impl Into<String>) -> Self {
        Self {
            card,
            control: control.into(),
            events_program: AMIXER.to_string(),
            monitors: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Name of the mixer control being driven.
    #[must_use]
    pub fn control(&self) -> &str {
        &self.control
    }

    fn preferred_card(&self) -> Option<String> {
        self.card
            .clone()
            .or_else(|| std::env::var(CARD_ENV).ok())
            .filter(|card| !card.trim().is_empty())
    }

    /// Read and parse the mixer control on a card.
    fn read_control(&self, device: DeviceId) -> DeviceResult<MixerControl> {
        let card = device.0.to_string();
        let stdout = run_amixer(&["-c", &card, "sget", &self.control])?;
        Ok(MixerControl::parse(&stdout))
    }

    /// Start a monitor process feeding `listeners`.
    fn spawn_monitor(&self, device: DeviceId, listeners: ListenerMap) -> DeviceResult<CardMonitor> {
        let mut child = Command::new(&self.events_program)
            .args(["-c", &device.0.to_string(), "events"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DeviceError::system(-1, format!("failed to start {AMIXER} events: {e}")))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            return Err(DeviceError::system(-1, "mixer monitor has no stdout"));
        };

        let thread_listeners = Arc::clone(&listeners);
        let control = self.control.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("alsa-monitor-{}", device.0))
            .spawn(move || run_monitor(device, &control, stdout, &thread_listeners));

        if let Err(e) = spawned {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DeviceError::system(-1, format!("failed to spawn monitor thread: {e}")));
        }

        info!(%device, control = %self.control, "Mixer monitor started");
        Ok(CardMonitor { child, listeners })
    }
}

impl Drop for AlsaMixerBackend {
    fn drop(&mut self) {
        for (_, monitor) in self.monitors.lock().drain() {
            monitor.stop();
        }
    }
}

impl AudioBackend for AlsaMixerBackend {
    fn default_output_device(&self) -> DeviceResult<DeviceId> {
        let contents = std::fs::read_to_string(CARDS_PATH)
            .map_err(|e| DeviceError::system(-1, format!("failed to read {CARDS_PATH}: {e}")))?;
        let cards = parse_cards(&contents);
        let preferred = self.preferred_card();

        select_card(&cards, preferred.as_deref()).map(DeviceId).ok_or_else(|| {
            debug!(preferred = ?preferred, cards = cards.len(), "No matching sound card");
            DeviceError::DeviceUnavailable
        })
    }

    fn has_property(&self, device: DeviceId, property: Property) -> bool {
        match self.read_control(device) {
            Ok(control) => control.has(property),
            Err(e) => {
                debug!(%device, %property, error = %e, "Mixer control not readable");
                false
            }
        }
    }

    fn is_settable(&self, device: DeviceId, property: Property) -> DeviceResult<bool> {
        let control = self.read_control(device)?;
        if !control.has(property) {
            return Err(DeviceError::PropertyUnsupported(property));
        }
        Ok(!control.inactive)
    }

    fn get_property(&self, device: DeviceId, property: Property) -> DeviceResult<PropertyValue> {
        let control = self.read_control(device)?;
        if !control.has(property) {
            return Err(DeviceError::PropertyUnsupported(property));
        }

        match property {
            Property::OutputVolume => control
                .volume_scalar()
                .map(PropertyValue::Scalar)
                .ok_or_else(|| DeviceError::system(-1, "could not parse mixer volume")),
            Property::OutputMute => control
                .switch_on
                .map(|on| PropertyValue::Switch(u32::from(!on)))
                .ok_or_else(|| DeviceError::system(-1, "could not parse mixer switch")),
        }
    }

    fn set_property(
        &self,
        device: DeviceId,
        property: Property,
        value: PropertyValue,
    ) -> DeviceResult<()> {
        let card = device.0.to_string();

        let setting = match (property, value) {
            (Property::OutputVolume, PropertyValue::Scalar(scalar)) => {
                let control = self.read_control(device)?;
                control
                    .raw_for(scalar)
                    .ok_or_else(|| DeviceError::system(-1, "mixer control has no volume limits"))?
                    .to_string()
            }
            (Property::OutputMute, PropertyValue::Switch(raw)) => {
                String::from(if raw == 1 { "mute" } else { "unmute" })
            }
            (property, value) => {
                return Err(DeviceError::system(-1, format!("cannot write {value:?} to {property}")));
            }
        };

        run_amixer(&["-q", "-c", &card, "sset", &self.control, &setting])?;
        debug!(%device, %property, setting = %setting, "Mixer control set");
        Ok(())
    }

    fn add_listener(
        &self,
        device: DeviceId,
        property: Property,
        listener: Listener,
    ) -> DeviceResult<ListenerId> {
        let mut monitors = self.monitors.lock();

        let listeners = match monitors.get_mut(&device).map(CardMonitor::is_running) {
            Some(true) => None,
            Some(false) => monitors.remove(&device).map(|stale| {
                warn!(%device, "Mixer monitor exited, restarting");
                let listeners = Arc::clone(&stale.listeners);
                stale.stop();
                listeners
            }),
            None => Some(Arc::new(Mutex::new(HashMap::new()))),
        };

        if let Some(listeners) = listeners {
            let monitor = self.spawn_monitor(device, listeners)?;
            monitors.insert(device, monitor);
        }

        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::SeqCst));
        if let Some(monitor) = monitors.get(&device) {
            monitor.listeners.lock().insert(id, (property, listener));
        }
        debug!(%device, %property, id = id.get(), "Listener added");
        Ok(id)
    }

    fn remove_listener(
        &self,
        device: DeviceId,
        _property: Property,
        id: ListenerId,
    ) -> DeviceResult<()> {
        let mut monitors = self.monitors.lock();

        let Some(monitor) = monitors.get(&device) else {
            return Err(DeviceError::system(-1, format!("no monitor for {device}")));
        };

        let remaining = {
            let mut listeners = monitor.listeners.lock();
            if listeners.remove(&id).is_none() {
                return Err(DeviceError::system(-1, format!("unknown listener {}", id.get())));
            }
            listeners.len()
        };

        if remaining == 0
            && let Some(monitor) = monitors.remove(&device)
        {
            monitor.stop();
            info!(%device, "Mixer monitor stopped");
        }
        Ok(())
    }
}

/// Read `amixer events` output and dispatch value changes.
fn run_monitor(device: DeviceId, control: &str, stdout: ChildStdout, listeners: &ListenerMap) {
    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!(%device, error = %e, "Mixer monitor read failed");
                break;
            }
        };

        let Some(property) = parse_event_line(&line, control) else {
            continue;
        };

        let matching: Vec<Listener> = listeners
            .lock()
            .values()
            .filter(|(p, _)| *p == property)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(%device, %property, count = matching.len(), "Mixer value changed");
        for listener in matching {
            listener();
        }
    }

    debug!(%device, "Mixer monitor exited");
}

fn run_amixer(args: &[&str]) -> DeviceResult<String> {
    let output = Command::new(AMIXER)
        .args(args)
        .output()
        .map_err(|e| DeviceError::system(-1, format!("failed to run {AMIXER}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(?args, status = ?output.status.code(), "amixer failed");
        return Err(DeviceError::system(
            output.status.code().unwrap_or(-1),
            format!("amixer failed: {}", stderr.trim()),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// A sound card line from `/proc/asound/cards`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SoundCard {
    index: u32,
    id: String,
}

/// Parse lines like ` 0 [PCH            ]: HDA-Intel - HDA Intel PCH`.
fn parse_cards(contents: &str) -> Vec<SoundCard> {
    contents
        .lines()
        .filter_map(|line| {
            let (number, rest) = line.trim_start().split_once(' ')?;
            let index = number.parse::<u32>().ok()?;
            let rest = rest.trim_start().strip_prefix('[')?;
            let (id, _) = rest.split_once(']')?;
            Some(SoundCard { index, id: id.trim().to_string() })
        })
        .collect()
}

/// Pick the default card: the preferred index or id if given, else the first.
fn select_card(cards: &[SoundCard], preferred: Option<&str>) -> Option<u32> {
    match preferred.map(str::trim) {
        Some(wanted) => {
            if let Ok(index) = wanted.parse::<u32>() {
                cards.iter().find(|c| c.index == index)
            } else {
                cards.iter().find(|c| c.id == wanted)
            }
        }
        None => cards.first(),
    }
    .map(|c| c.index)
}

/// Parsed `amixer sget` output for one simple mixer control.
#[derive(Debug, Clone, Default, PartialEq)]
struct MixerControl {
    has_volume: bool,
    has_switch: bool,
    inactive: bool,
    limits: Option<(i64, i64)>,
    volume: Option<i64>,
    switch_on: Option<bool>,
}

impl MixerControl {
    fn parse(output: &str) -> Self {
        let mut control = Self::default();

        for line in output.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("Capabilities:") {
                for capability in rest.split_whitespace() {
                    match capability {
                        "pvolume" | "pvolume-joined" | "volume" | "volume-joined" => {
                            control.has_volume = true;
                        }
                        "pswitch" | "pswitch-joined" | "switch" | "switch-joined" => {
                            control.has_switch = true;
                        }
                        "inactive" => control.inactive = true,
                        _ => {}
                    }
                }
            } else if let Some(rest) = line.strip_prefix("Limits:") {
                let bounds: Vec<i64> =
                    rest.split_whitespace().filter_map(|t| t.parse().ok()).take(2).collect();
                if let [min, max] = bounds[..] {
                    control.limits = Some((min, max));
                }
            } else if let Some((_, rest)) = line.split_once(": Playback") {
                // First channel wins; joined controls report the same on every channel
                for token in rest.split_whitespace() {
                    match token {
                        "[on]" => {
                            control.switch_on.get_or_insert(true);
                        }
                        "[off]" => {
                            control.switch_on.get_or_insert(false);
                        }
                        _ => {
                            if control.volume.is_none()
                                && let Ok(value) = token.parse::<i64>()
                            {
                                control.volume = Some(value);
                            }
                        }
                    }
                }
            }
        }

        control
    }

    fn has(&self, property: Property) -> bool {
        match property {
            Property::OutputVolume => self.has_volume,
            Property::OutputMute => self.has_switch,
        }
    }

    /// Current volume normalized against the control's limits.
    #[allow(clippy::cast_precision_loss)]
    fn volume_scalar(&self) -> Option<f32> {
        let (min, max) = self.limits.filter(|(min, max)| max > min)?;
        let value = self.volume?;
        Some(((value - min) as f32 / (max - min) as f32).clamp(0.0, 1.0))
    }

    /// Raw control value for a normalized scalar.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn raw_for(&self, scalar: f32) -> Option<i64> {
        let (min, max) = self.limits.filter(|(min, max)| max > min)?;
        let span = (max - min) as f32;
        Some(min + (scalar.clamp(0.0, 1.0) * span).round() as i64)
    }
}

/// Map an `amixer events` line to the property it reports.
///
/// Lines look like `event value: numid=2,iface=MIXER,name='Master Playback Volume'`.
fn parse_event_line(line: &str, control: &str) -> Option<Property> {
    let rest = line.trim().strip_prefix("event value:")?;
    let (_, name) = rest.split_once("name='")?;
    let (name, _) = name.split_once('\'')?;
    let element = name.strip_prefix(control)?.trim();

    match element {
        "Playback Volume" => Some(Property::OutputVolume),
        "Playback Switch" => Some(Property::OutputMute),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARDS: &str = " 0 [PCH            ]: HDA-Intel - HDA Intel PCH
                      HDA Intel PCH at 0xf1530000 irq 140
 1 [Wave3          ]: USB-Audio - Wave:3
                      Elgato Systems Wave:3 at usb-0000:00:14.0-2, full speed
";

    const STEREO_MASTER: &str = "Simple mixer control 'Master',0
  Capabilities: pvolume pswitch pswitch-joined
  Playback channels: Front Left - Front Right
  Limits: Playback 0 - 65536
  Mono:
  Front Left: Playback 26214 [40%] [on]
  Front Right: Playback 26214 [40%] [on]
";

    const MONO_MASTER_MUTED: &str = "Simple mixer control 'Master',0
  Capabilities: pvolume pvolume-joined pswitch pswitch-joined
  Playback channels: Mono
  Limits: Playback 0 - 87
  Mono: Playback 60 [69%] [-20.25dB] [off]
";

    const SWITCH_ONLY: &str = "Simple mixer control 'Master',0
  Capabilities: pswitch inactive
  Playback channels: Mono
  Mono: Playback [on]
";

    fn listener_total(backend: &AlsaMixerBackend, device: DeviceId) -> usize {
        backend.monitors.lock().get(&device).map_or(0, |m| m.listeners.lock().len())
    }

    #[test]
    fn test_exited_monitor_is_restarted_with_its_listeners() {
        let device = DeviceId(0);
        let mut backend = AlsaMixerBackend::new(None, DEFAULT_CONTROL);
        // Exits immediately, like an amixer whose card went away
        backend.events_program = "true".to_string();

        let first = backend.add_listener(device, Property::OutputVolume, Arc::new(|| {})).unwrap();
        backend.monitors.lock().get_mut(&device).unwrap().child.wait().unwrap();
        assert!(!backend.monitors.lock().get_mut(&device).unwrap().is_running());

        let second = backend.add_listener(device, Property::OutputMute, Arc::new(|| {})).unwrap();
        assert_ne!(first, second);
        assert_eq!(listener_total(&backend, device), 2);

        backend.remove_listener(device, Property::OutputVolume, first).unwrap();
        backend.remove_listener(device, Property::OutputMute, second).unwrap();
        assert!(backend.monitors.lock().is_empty());
    }

    #[test]
    fn test_parse_cards() {
        let cards = parse_cards(CARDS);
        assert_eq!(
            cards,
            vec![
                SoundCard { index: 0, id: "PCH".to_string() },
                SoundCard { index: 1, id: "Wave3".to_string() },
            ]
        );
    }

    #[test]
    fn test_parse_cards_without_cards() {
        assert!(parse_cards("--- no soundcards ---\n").is_empty());
    }

    #[test]
    fn test_select_card() {
        let cards = parse_cards(CARDS);

        assert_eq!(select_card(&cards, None), Some(0));
        assert_eq!(select_card(&cards, Some("1")), Some(1));
        assert_eq!(select_card(&cards, Some("Wave3")), Some(1));
        assert_eq!(select_card(&cards, Some(" PCH ")), Some(0));
        assert_eq!(select_card(&cards, Some("7")), None);
        assert_eq!(select_card(&cards, Some("Missing")), None);
        assert_eq!(select_card(&[], None), None);
    }

    #[test]
    fn test_parse_stereo_control() {
        let control = MixerControl::parse(STEREO_MASTER);

        assert!(control.has(Property::OutputVolume));
        assert!(control.has(Property::OutputMute));
        assert!(!control.inactive);
        assert_eq!(control.limits, Some((0, 65536)));
        assert_eq!(control.volume, Some(26214));
        assert_eq!(control.switch_on, Some(true));

        let scalar = control.volume_scalar().unwrap();
        assert!((scalar - 0.4).abs() < 0.001);
    }

    #[test]
    fn test_parse_muted_mono_control() {
        let control = MixerControl::parse(MONO_MASTER_MUTED);

        assert_eq!(control.limits, Some((0, 87)));
        assert_eq!(control.volume, Some(60));
        assert_eq!(control.switch_on, Some(false));
        assert_eq!(sdvolume_core::from_system(control.volume_scalar().unwrap()), 69);
    }

    #[test]
    fn test_parse_switch_only_inactive_control() {
        let control = MixerControl::parse(SWITCH_ONLY);

        assert!(!control.has(Property::OutputVolume));
        assert!(control.has(Property::OutputMute));
        assert!(control.inactive);
        assert_eq!(control.volume, None);
        assert_eq!(control.volume_scalar(), None);
        assert_eq!(control.switch_on, Some(true));
    }

    #[test]
    fn test_raw_for_scales_into_limits() {
        let control = MixerControl::parse(MONO_MASTER_MUTED);

        assert_eq!(control.raw_for(0.0), Some(0));
        assert_eq!(control.raw_for(1.0), Some(87));
        assert_eq!(control.raw_for(0.5), Some(44));
        assert_eq!(control.raw_for(3.0), Some(87));
        assert_eq!(MixerControl::parse(SWITCH_ONLY).raw_for(0.5), None);
    }

    #[test]
    fn test_raw_for_offset_limits() {
        let control = MixerControl { limits: Some((-10, 10)), ..MixerControl::default() };
        assert_eq!(control.raw_for(0.0), Some(-10));
        assert_eq!(control.raw_for(0.25), Some(-5));
    }

    #[test]
    fn test_parse_event_lines() {
        assert_eq!(
            parse_event_line("event value: numid=2,iface=MIXER,name='Master Playback Volume'", "Master"),
            Some(Property::OutputVolume)
        );
        assert_eq!(
            parse_event_line("event value: numid=1,iface=MIXER,name='Master Playback Switch'", "Master"),
            Some(Property::OutputMute)
        );
        assert_eq!(
            parse_event_line("event value: numid=9,iface=MIXER,name='PCM Playback Volume'", "Master"),
            None
        );
        assert_eq!(
            parse_event_line("event info: numid=2,iface=MIXER,name='Master Playback Volume'", "Master"),
            None
        );
        assert_eq!(parse_event_line("Ready to listen...", "Master"), None);
    }

    #[test]
    fn test_parse_event_line_custom_control() {
        assert_eq!(
            parse_event_line(
                "event value: numid=4,iface=MIXER,name='Speaker Playback Switch',index=0",
                "Speaker"
            ),
            Some(Property::OutputMute)
        );
    }
}
