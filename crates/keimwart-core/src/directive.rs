//! Actuator directives and their wire representation.
//!
//! A [`ControlDirective`] is the document patched into the chamber store's
//! `control` path each cycle. Field names and action tokens are part of the
//! store contract consumed by the IoT side and must not drift.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThermalAction {
    Stable,
    HeatOn,
    CoolingOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhAction {
    Stable,
    AddBase,
    AddAcid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AerationAction {
    Stable,
    IncreaseAeration,
    DecreaseAeration,
}

impl ThermalAction {
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::HeatOn => "HEAT_ON",
            Self::CoolingOn => "COOLING_ON",
        }
    }
}

impl PhAction {
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::AddBase => "ADD_BASE",
            Self::AddAcid => "ADD_ACID",
        }
    }
}

impl AerationAction {
    #[must_use]
    pub fn token(&self) -> &'static str {
        match self {
            Self::Stable => "STABLE",
            Self::IncreaseAeration => "INCREASE_AERATION",
            Self::DecreaseAeration => "DECREASE_AERATION",
        }
    }
}

/// The per-channel actions derived from one policy decision, before a score
/// and timestamp are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSet {
    pub thermal: ThermalAction,
    pub ph: PhAction,
    /// `None` when the profile does not model dissolved-oxygen control.
    pub aeration: Option<AerationAction>,
}

/// Directive document written to `<base>/control`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDirective {
    pub thermal: ThermalAction,
    pub ph_pump: PhAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_flow: Option<AerationAction>,
    pub ai_growth_score: f64,
    pub timestamp: String,
}

impl ControlDirective {
    /// Assemble the wire document. The score is clamped to `[0, 1]` (the
    /// model may extrapolate outside the training domain) and rounded to
    /// three decimals; a non-finite score collapses to `0.0`.
    #[must_use]
    pub fn new(actions: ActionSet, score: f64, timestamp: String) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            thermal: actions.thermal,
            ph_pump: actions.ph,
            oxygen_flow: actions.aeration,
            ai_growth_score: round3(score),
            timestamp,
        }
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
