//! Launch-time registration with the host.

use serde::Deserialize;

use crate::error::{ProtocolError, ProtocolResult};
use crate::events::RegisterMessage;

/// Connection details passed by the host on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Local port of the host's WebSocket server
    pub port: u16,
    /// Identifier the plugin registers under
    pub plugin_uuid: String,
    /// Name of the registration event
    pub register_event: String,
    /// JSON description of the host application and devices
    pub info: Option<String>,
}

impl Registration {
    /// Check that the host supplied usable values.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRegistration`] for a zero port or an
    /// empty UUID or registration event.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.port == 0 {
            return Err(ProtocolError::InvalidRegistration("port must not be 0".to_string()));
        }
        if self.plugin_uuid.trim().is_empty() {
            return Err(ProtocolError::InvalidRegistration("empty plugin UUID".to_string()));
        }
        if self.register_event.trim().is_empty() {
            return Err(ProtocolError::InvalidRegistration("empty register event".to_string()));
        }
        Ok(())
    }

    /// WebSocket URL of the host.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// The message that registers this plugin.
    #[must_use]
    pub fn register_message(&self) -> RegisterMessage {
        RegisterMessage { event: self.register_event.clone(), uuid: self.plugin_uuid.clone() }
    }

    /// Parse the `-info` argument, if one was given.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRegistration`] if the info is not
    /// valid JSON.
    pub fn host_info(&self) -> ProtocolResult<Option<HostInfo>> {
        self.info
            .as_deref()
            .map(|info| {
                serde_json::from_str(info)
                    .map_err(|e| ProtocolError::InvalidRegistration(format!("bad info: {e}")))
            })
            .transpose()
    }
}

/// Host application details from the `-info` argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostInfo {
    pub application: ApplicationInfo,
    pub plugin: PluginInfo,
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplicationInfo {
    pub version: String,
    pub platform: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PluginInfo {
    pub uuid: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u32,
}

/// Rewrite the host's single-dash long flags (`-port`) to `--port`.
///
/// Values and short flags are left alone.
#[must_use]
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|arg| {
            let is_long = arg.len() > 2
                && arg.starts_with('-')
                && !arg.starts_with("--")
                && arg[1..].starts_with(|c: char| c.is_ascii_alphabetic());
            if is_long { format!("-{arg}") } else { arg }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn registration() -> Registration {
        Registration {
            port: 28196,
            plugin_uuid: "6F1B5E0C".to_string(),
            register_event: "registerPlugin".to_string(),
            info: None,
        }
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_normalize_args() {
        let args = normalize_args(strings(&[
            "sdvolume",
            "-port",
            "28196",
            "-pluginUUID",
            "6F1B5E0C",
            "-registerEvent",
            "registerPlugin",
            "-info",
            r#"{"application":{}}"#,
            "--config",
            "/tmp/x.toml",
            "-h",
        ]));

        assert_eq!(
            args,
            strings(&[
                "sdvolume",
                "--port",
                "28196",
                "--pluginUUID",
                "6F1B5E0C",
                "--registerEvent",
                "registerPlugin",
                "--info",
                r#"{"application":{}}"#,
                "--config",
                "/tmp/x.toml",
                "-h",
            ])
        );
    }

    #[test]
    fn test_normalize_leaves_negative_numbers() {
        assert_eq!(normalize_args(strings(&["-12"])), strings(&["-12"]));
    }

    #[test]
    fn test_url_and_register_message() {
        let registration = registration();
        assert_eq!(registration.url(), "ws://127.0.0.1:28196");
        assert_eq!(
            registration.register_message(),
            RegisterMessage { event: "registerPlugin".to_string(), uuid: "6F1B5E0C".to_string() }
        );
    }

    #[test]
    fn test_validate() {
        assert!(registration().validate().is_ok());

        let zero_port = Registration { port: 0, ..registration() };
        assert_matches!(zero_port.validate(), Err(ProtocolError::InvalidRegistration(_)));

        let no_uuid = Registration { plugin_uuid: " ".to_string(), ..registration() };
        assert_matches!(no_uuid.validate(), Err(ProtocolError::InvalidRegistration(_)));
    }

    #[test]
    fn test_host_info() {
        let registration = Registration {
            info: Some(
                r#"{"application":{"font":".AppleSystemUIFont","language":"en","platform":"mac",
                    "platformVersion":"14.0","version":"6.5.0"},
                    "plugin":{"uuid":"com.sdvolume","version":"1.0"},
                    "devicePixelRatio":2,
                    "devices":[{"id":"DEV","name":"Stream Deck +","size":{"columns":4,"rows":2},"type":7}]}"#
                    .to_string(),
            ),
            ..registration()
        };

        let info = registration.host_info().unwrap().unwrap();
        assert_eq!(info.application.version, "6.5.0");
        assert_eq!(info.application.platform, "mac");
        assert_eq!(info.plugin.version, "1.0");
        assert_eq!(info.devices.len(), 1);
        assert_eq!(info.devices[0].kind, 7);
    }

    #[test]
    fn test_host_info_missing_and_invalid() {
        assert_eq!(registration().host_info().unwrap(), None);

        let bad = Registration { info: Some("{not json".to_string()), ..registration() };
        assert_matches!(bad.host_info(), Err(ProtocolError::InvalidRegistration(_)));
    }
}
