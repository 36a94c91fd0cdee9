//! Target profiles: organism setpoints plus per-channel hysteresis bands.

use serde::{Deserialize, Serialize};

/// Half-width of the thermal deadband around the setpoint (°C).
pub const DEFAULT_TEMPERATURE_BAND: f64 = 0.5;
/// Half-width of the pH deadband around the setpoint.
pub const DEFAULT_PH_BAND: f64 = 0.2;
/// Under-aeration margin below the dissolved-oxygen setpoint (percent).
pub const DEFAULT_DO_BAND_LOW: f64 = 5.0;
/// Over-aeration margin above the dissolved-oxygen setpoint (percent).
/// Wider than the lower margin: cultures tolerate excess aeration further
/// than oxygen starvation, so the band is asymmetric on purpose.
pub const DEFAULT_DO_BAND_HIGH: f64 = 10.0;

/// Known organism presets, as `(name, temperature, ph, dissolved oxygen)`.
pub const PRESETS: [(&str, f64, f64, f64); 2] =
    [("e-coli", 37.0, 7.0, 40.0), ("s-cerevisiae", 30.0, 5.0, 30.0)];

/// Setpoints and tolerance bands for one cultivation session.
///
/// Immutable once the polling session starts; every control decision in the
/// session is taken against the same profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub ideal_temperature: f64,
    pub ideal_ph: f64,
    /// `None` disables the aeration channel entirely.
    pub ideal_dissolved_oxygen: Option<f64>,
    #[serde(default = "default_temperature_band")]
    pub temperature_band: f64,
    #[serde(default = "default_ph_band")]
    pub ph_band: f64,
    #[serde(default = "default_do_band_low")]
    pub do_band_low: f64,
    #[serde(default = "default_do_band_high")]
    pub do_band_high: f64,
}

fn default_temperature_band() -> f64 {
    DEFAULT_TEMPERATURE_BAND
}
fn default_ph_band() -> f64 {
    DEFAULT_PH_BAND
}
fn default_do_band_low() -> f64 {
    DEFAULT_DO_BAND_LOW
}
fn default_do_band_high() -> f64 {
    DEFAULT_DO_BAND_HIGH
}

impl TargetProfile {
    /// Profile with default bands around the given setpoints.
    #[must_use]
    pub fn new(ideal_temperature: f64, ideal_ph: f64, ideal_dissolved_oxygen: Option<f64>) -> Self {
        Self {
            ideal_temperature,
            ideal_ph,
            ideal_dissolved_oxygen,
            temperature_band: DEFAULT_TEMPERATURE_BAND,
            ph_band: DEFAULT_PH_BAND,
            do_band_low: DEFAULT_DO_BAND_LOW,
            do_band_high: DEFAULT_DO_BAND_HIGH,
        }
    }

    /// Look up an organism preset by name. Matching is case-insensitive.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        PRESETS
            .iter()
            .find(|(preset, _, _, _)| *preset == name)
            .map(|&(_, t, ph, dissolved)| Self::new(t, ph, Some(dissolved)))
    }

    /// Names of all known presets, for operator-facing error messages.
    #[must_use]
    pub fn preset_names() -> Vec<&'static str> {
        PRESETS.iter().map(|(name, _, _, _)| *name).collect()
    }
}

impl Default for TargetProfile {
    fn default() -> Self {
        Self::new(37.0, 7.0, Some(40.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e_coli_preset_has_documented_setpoints() {
        let profile = TargetProfile::preset("e-coli").expect("preset should exist");
        assert_eq!(profile.ideal_temperature, 37.0);
        assert_eq!(profile.ideal_ph, 7.0);
        assert_eq!(profile.ideal_dissolved_oxygen, Some(40.0));
        assert_eq!(profile.temperature_band, 0.5);
        assert_eq!(profile.ph_band, 0.2);
    }

    #[test]
    fn preset_lookup_is_case_insensitive_and_trims() {
        assert!(TargetProfile::preset(" E-Coli ").is_some());
        assert!(TargetProfile::preset("s-cerevisiae").is_some());
        assert!(TargetProfile::preset("unknown-organism").is_none());
    }

    #[test]
    fn profile_deserializes_with_default_bands() {
        let profile: TargetProfile = serde_json::from_str(
            r#"{"ideal_temperature": 30.0, "ideal_ph": 5.0, "ideal_dissolved_oxygen": null}"#,
        )
        .expect("should deserialize");

        assert_eq!(profile.do_band_low, DEFAULT_DO_BAND_LOW);
        assert_eq!(profile.do_band_high, DEFAULT_DO_BAND_HIGH);
        assert!(profile.ideal_dissolved_oxygen.is_none());
    }
}
