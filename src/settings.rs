use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use sonar_midi_out::PortSelection;
use sonar_ranging::{DistanceUnit, SensorConfig};
use std::time::Duration;
use tracing::{error, info};

use crate::mapping::DistanceMapping;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "SONAR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sensor: SensorSettings,
    pub midi: MidiSettings,
    pub mapping: DistanceMapping,
    pub sampler: SamplerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    pub unit: DistanceUnit,
    pub timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        SensorSettings {
            trigger_pin: 23,
            echo_pin: 24,
            unit: DistanceUnit::Centimeters,
            timeout_ms: 1_000,
            settle_ms: 500,
        }
    }
}

impl SensorSettings {
    pub fn sensor_config(&self) -> SensorConfig {
        SensorConfig::new(self.trigger_pin, self.echo_pin)
            .with_unit(self.unit)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_settle(Duration::from_millis(self.settle_ms))
    }
}

/// What the sampler emits for each mapped reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    NoteOn,
    ControlChange,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MidiSettings {
    pub client_name: String,
    pub port_index: Option<usize>,
    pub port_name: Option<String>,
    pub channel: u8,
    pub velocity: u8,
    pub event: EventKind,
    pub controller: u8,
    pub release_previous: bool,
}

impl Default for MidiSettings {
    fn default() -> Self {
        MidiSettings {
            client_name: "sonar-midi".into(),
            port_index: None,
            port_name: None,
            channel: 0,
            velocity: 100,
            event: EventKind::NoteOn,
            controller: 7,
            release_previous: false,
        }
    }
}

impl MidiSettings {
    /// Port selection from the configured index or name; the index wins when
    /// both are set and `prompt` is used when neither is.
    pub fn selection<'a>(
        &self,
        prompt: &'a mut dyn FnMut(&[String]) -> Option<usize>,
    ) -> PortSelection<'a> {
        match (self.port_index, &self.port_name) {
            (Some(index), _) => PortSelection::Index(index),
            (None, Some(name)) => PortSelection::Name(name.clone()),
            (None, None) => PortSelection::Prompt(prompt),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub interval_ms: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        SamplerSettings { interval_ms: 500 }
    }
}

impl SamplerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Settings {
    /// Reject values the sensor or sender would refuse at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Message(msg));

        if self.sensor.trigger_pin == self.sensor.echo_pin {
            return invalid(format!(
                "sensor.trigger_pin and sensor.echo_pin are both {}",
                self.sensor.trigger_pin
            ));
        }
        if self.sensor.timeout_ms == 0 {
            return invalid("sensor.timeout_ms must be positive".into());
        }
        if self.midi.channel > 15 {
            return invalid(format!("midi.channel must be 0-15, got {}", self.midi.channel));
        }
        if self.midi.velocity > 127 {
            return invalid(format!("midi.velocity must be 0-127, got {}", self.midi.velocity));
        }
        if self.midi.controller > 127 {
            return invalid(format!("midi.controller must be 0-127, got {}", self.midi.controller));
        }
        self.mapping.validate().map_err(ConfigError::Message)
    }
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .add_source(environment())
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
pub fn from_toml_str(toml: &str) -> Result<Settings, ConfigError> {
    Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_config_parses() {
        let settings = from_toml_str(include_str!("../config/default.toml")).unwrap();
        assert_eq!(settings.sensor.trigger_pin, 23);
        assert_eq!(settings.sensor.echo_pin, 24);
        assert_eq!(settings.midi.port_index, Some(3));
        assert_eq!(settings.midi.event, EventKind::NoteOn);
        assert_eq!(settings.mapping, DistanceMapping::default());
        assert_eq!(settings.sampler.interval(), Duration::from_millis(500));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let settings = from_toml_str("[midi]\nport_name = \"gadget\"\nevent = \"control_change\"").unwrap();
        assert_eq!(settings.midi.port_name.as_deref(), Some("gadget"));
        assert_eq!(settings.midi.event, EventKind::ControlChange);
        assert_eq!(settings.midi.velocity, 100);
        assert_eq!(settings.sensor.unit, DistanceUnit::Centimeters);
    }

    #[test]
    fn test_sensor_config_in_meters() {
        let settings = from_toml_str("[sensor]\nunit = \"m\"\ntimeout_ms = 40\nsettle_ms = 0").unwrap();
        let config = settings.sensor.sensor_config();
        assert_eq!(config.unit, DistanceUnit::Meters);
        assert_eq!(config.timeout, Duration::from_millis(40));
        assert_eq!(config.settle, Duration::ZERO);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.midi.channel = 16;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.sensor.echo_pin = settings.sensor.trigger_pin;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.mapping.high = 200;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_port_selection_precedence() {
        let mut prompt = |_: &[String]| -> Option<usize> { Some(0) };
        let mut midi = MidiSettings {
            port_index: Some(2),
            port_name: Some("gadget".into()),
            ..MidiSettings::default()
        };
        assert!(matches!(midi.selection(&mut prompt), PortSelection::Index(2)));

        midi.port_index = None;
        assert!(matches!(midi.selection(&mut prompt), PortSelection::Name(ref n) if n == "gadget"));

        midi.port_name = None;
        assert!(matches!(midi.selection(&mut prompt), PortSelection::Prompt(_)));
    }
}
