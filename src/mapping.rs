use serde::Deserialize;
use sonar_ranging::Distance;

/// Linear map from a usable distance window onto a band of MIDI values.
///
/// Readings outside `[min_cm, max_cm]` have no value; the sensor does not
/// range-check, so this is where the HC-SR04's 2-400 cm window is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DistanceMapping {
    pub min_cm: f64,
    pub max_cm: f64,
    pub low: u8,
    pub high: u8,
}

impl Default for DistanceMapping {
    fn default() -> Self {
        DistanceMapping {
            min_cm: 2.0,
            max_cm: 400.0,
            low: 67,
            high: 127,
        }
    }
}

impl DistanceMapping {
    /// Value for a distance in centimeters, truncated toward `low`.
    pub fn map(&self, distance_cm: f64) -> Option<u8> {
        if !(self.min_cm..=self.max_cm).contains(&distance_cm) {
            return None;
        }
        let normalized = (distance_cm - self.min_cm) / (self.max_cm - self.min_cm);
        let span = (self.high - self.low) as f64;
        Some((normalized * span + self.low as f64) as u8)
    }

    pub fn map_distance(&self, distance: &Distance) -> Option<u8> {
        self.map(distance.as_centimeters())
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_cm >= 0.0 && self.min_cm < self.max_cm) {
            return Err(format!(
                "mapping window must satisfy 0 <= min_cm < max_cm (got {}..{})",
                self.min_cm, self.max_cm
            ));
        }
        if self.low > self.high || self.high > 127 {
            return Err(format!(
                "mapping band must satisfy low <= high <= 127 (got {}..{})",
                self.low, self.high
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_ranging::DistanceUnit;

    #[test]
    fn test_window_edges() {
        let mapping = DistanceMapping::default();
        assert_eq!(mapping.map(2.0), Some(67));
        assert_eq!(mapping.map(400.0), Some(127));
    }

    #[test]
    fn test_outside_window_has_no_value() {
        let mapping = DistanceMapping::default();
        assert_eq!(mapping.map(1.0), None);
        assert_eq!(mapping.map(401.0), None);
        assert_eq!(mapping.map(1.99), None);
        assert_eq!(mapping.map(f64::NAN), None);
    }

    #[test]
    fn test_midpoint_truncates() {
        let mapping = DistanceMapping::default();
        // (201 - 2) / 398 * 60 + 67 = 97.0
        assert_eq!(mapping.map(201.0), Some(97));
        // (100 - 2) / 398 * 60 + 67 = 81.77...
        assert_eq!(mapping.map(100.0), Some(81));
    }

    #[test]
    fn test_meter_readings_use_centimeters() {
        let mapping = DistanceMapping::default();
        let distance = Distance::from_centimeters(400.0, DistanceUnit::Meters);
        assert_eq!(mapping.map_distance(&distance), Some(127));
    }

    #[test]
    fn test_validate() {
        assert!(DistanceMapping::default().validate().is_ok());
        let inverted = DistanceMapping {
            min_cm: 10.0,
            max_cm: 5.0,
            ..DistanceMapping::default()
        };
        assert!(inverted.validate().is_err());
        let band = DistanceMapping {
            low: 100,
            high: 90,
            ..DistanceMapping::default()
        };
        assert!(band.validate().is_err());
    }
}
