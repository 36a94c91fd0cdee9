#![warn(clippy::unwrap_used, clippy::expect_used)]

//! Hysteresis-based actuator policy.
//!
//! Maps one [`SensorReading`] plus a [`TargetProfile`] to one [`ActionSet`].
//! Each channel is decided independently by a stateless deadband rule: no
//! channel looks at another channel, no decision looks at a previous one.
//! `decide` is therefore a pure function — identical inputs always produce
//! the identical action set, and the deadbands keep actuators from
//! oscillating when a reading sits at the setpoint boundary.

use keimwart_core::{ActionSet, AerationAction, PhAction, SensorReading, TargetProfile, ThermalAction};

/// Thermal channel: heat below the deadband, cool above it.
#[must_use]
pub fn thermal_action(temperature: f64, profile: &TargetProfile) -> ThermalAction {
    if temperature < profile.ideal_temperature - profile.temperature_band {
        ThermalAction::HeatOn
    } else if temperature > profile.ideal_temperature + profile.temperature_band {
        ThermalAction::CoolingOn
    } else {
        ThermalAction::Stable
    }
}

/// pH channel: dose base below the deadband, acid above it.
#[must_use]
pub fn ph_action(ph: f64, profile: &TargetProfile) -> PhAction {
    if ph < profile.ideal_ph - profile.ph_band {
        PhAction::AddBase
    } else if ph > profile.ideal_ph + profile.ph_band {
        PhAction::AddAcid
    } else {
        PhAction::Stable
    }
}

/// Aeration channel, only for profiles that model dissolved oxygen.
///
/// The band is asymmetric (`do_band_low` below, `do_band_high` above):
/// under-aeration starves the culture quickly, while over-aeration is
/// tolerated much further before it is worth cutting the flow.
#[must_use]
pub fn aeration_action(dissolved_oxygen: f64, profile: &TargetProfile) -> Option<AerationAction> {
    let ideal = profile.ideal_dissolved_oxygen?;
    Some(if dissolved_oxygen < ideal - profile.do_band_low {
        AerationAction::IncreaseAeration
    } else if dissolved_oxygen > ideal + profile.do_band_high {
        AerationAction::DecreaseAeration
    } else {
        AerationAction::Stable
    })
}

/// Derive the full action set for one reading.
#[must_use]
pub fn decide(reading: &SensorReading, profile: &TargetProfile) -> ActionSet {
    ActionSet {
        thermal: thermal_action(reading.temperature, profile),
        ph: ph_action(reading.ph, profile),
        aeration: aeration_action(reading.dissolved_oxygen, profile),
    }
}
