//! Sensor reading documents and feature extraction.
//!
//! The chamber store publishes readings as a loosely-typed JSON object whose
//! field names differ between firmware schema versions (`temperature` vs
//! `temp`, `dissolvedOxygen` vs `do`, and so on). [`extract`] normalizes such
//! a document into a [`SensorReading`] and never fails: absent keys and
//! non-numeric values fall back to `0.0`, and every channel that had to fall
//! back is recorded in [`Extraction::defaulted`] so the caller can surface an
//! advisory instead of mistaking a dead sensor for a genuinely cold, acidic
//! or anoxic culture.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FeatureVector;

/// One normalized environmental reading from the chamber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Culture temperature in degrees Celsius.
    pub temperature: f64,
    /// pH of the growth medium (0 to 14).
    pub ph: f64,
    /// Dissolved oxygen saturation in percent.
    pub dissolved_oxygen: f64,
    /// Optical density of the culture (unitless, >= 0).
    pub optical_density: f64,
    /// Wall-clock timestamp supplied by the sensor gateway, if any.
    pub captured_at: Option<String>,
}

impl SensorReading {
    /// Reading as the fixed-order feature vector the model consumes.
    #[must_use]
    pub fn features(&self) -> FeatureVector {
        FeatureVector([
            self.temperature,
            self.ph,
            self.dissolved_oxygen,
            self.optical_density,
        ])
    }
}

/// Result of normalizing a raw reading document.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub reading: SensorReading,
    /// Canonical names of channels that were absent or non-numeric and were
    /// defaulted to `0.0`.
    pub defaulted: Vec<&'static str>,
}

/// Normalize a raw reading document into a [`SensorReading`].
///
/// For each channel the canonical field name is consulted first, then its
/// short alias. A value is accepted if it is a JSON number or a string that
/// parses as one; everything else counts as defaulted.
#[must_use]
pub fn extract(doc: &Value) -> Extraction {
    let mut defaulted = Vec::new();
    let mut channel = |canonical: &'static str, names: &[&str]| match field(doc, names) {
        Some(v) => v,
        None => {
            defaulted.push(canonical);
            0.0
        }
    };

    let temperature = channel("temperature", &["temperature", "temp"]);
    let ph = channel("ph", &["ph"]);
    let dissolved_oxygen = channel("dissolvedOxygen", &["dissolvedOxygen", "do"]);
    let optical_density = channel("opticalDensity", &["opticalDensity", "od"]);

    let captured_at = doc
        .get("capturedAt")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Extraction {
        reading: SensorReading {
            temperature,
            ph,
            dissolved_oxygen,
            optical_density,
            captured_at,
        },
        defaulted,
    }
}

fn field(doc: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| doc.get(*n)).and_then(coerce)
}

fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
