use serde::{Deserialize, Serialize};

pub mod directive;
pub mod profile;
pub mod reading;

pub use directive::{ActionSet, AerationAction, ControlDirective, PhAction, ThermalAction};
pub use profile::TargetProfile;
pub use reading::{extract, Extraction, SensorReading};

/// Ordered feature vector: temperature, pH, dissolved oxygen, optical density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; 4]);

pub trait Predictor {
    fn predict(&self, features: &FeatureVector) -> f64;
}
