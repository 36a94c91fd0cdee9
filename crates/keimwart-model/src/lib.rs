//! Growth-efficiency regression model.
//!
//! The [`GrowthModel`] estimates how favorable the current chamber
//! conditions are for the cultivated organism, as a score in `[0, 1]`. It is
//! fitted once at process start on synthetic samples labeled by an
//! inverse-distance falloff around the organism's optimal temperature and pH,
//! and answers queries with distance-weighted k-nearest-neighbour regression
//! over range-normalized features. After [`GrowthModel::train`] returns, the
//! model is immutable; the control loop holds a shared reference for its
//! whole lifetime.

use keimwart_core::{FeatureVector, Predictor};
use rand::prelude::*;

mod error;

pub use error::{ModelError, Result};

/// Training domain per channel: temperature (°C), pH, dissolved oxygen (%),
/// optical density.
const DOMAIN: [(f64, f64); 4] = [(20.0, 45.0), (4.0, 9.0), (0.0, 100.0), (0.0, 2.0)];

/// Ground-truth falloff radius; the score reaches 0 at this distance from
/// the optimum in `(temperature, 5·pH)` space.
const FALLOFF_RADIUS: f64 = 20.0;

/// Weight of a pH unit relative to a degree Celsius in the ground-truth
/// distance. One pH unit off the optimum costs as much growth as 5 °C.
const PH_WEIGHT: f64 = 5.0;

/// Training setup for a [`GrowthModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Temperature at which the organism grows best (°C).
    pub optimum_temperature: f64,
    /// pH at which the organism grows best.
    pub optimum_ph: f64,
    /// Number of synthetic samples to draw over the training domain.
    pub samples: usize,
    /// Seed for the sample generator; a fixed seed makes training
    /// reproducible.
    pub seed: u64,
    /// Neighbours consulted per prediction.
    pub neighbors: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            optimum_temperature: 37.0,
            optimum_ph: 7.0,
            samples: 2000,
            seed: 42,
            neighbors: 12,
        }
    }
}

impl TrainConfig {
    /// Default training setup centered on a session profile's setpoints.
    #[must_use]
    pub fn for_profile(profile: &keimwart_core::TargetProfile) -> Self {
        Self {
            optimum_temperature: profile.ideal_temperature,
            optimum_ph: profile.ideal_ph,
            ..Self::default()
        }
    }
}

/// Immutable k-NN regressor over synthetic growth samples.
#[derive(Debug, Clone)]
pub struct GrowthModel {
    /// Range-normalized sample coordinates.
    points: Vec<[f64; 4]>,
    /// Ground-truth growth score per sample, each in `[0, 1]`.
    labels: Vec<f64>,
    neighbors: usize,
}

impl GrowthModel {
    /// Fit a model. Fails only on a config that cannot produce a usable
    /// regressor; the caller is expected to treat that as fatal and refuse
    /// to start the control loop.
    pub fn train(config: TrainConfig) -> Result<Self> {
        if config.samples == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if config.neighbors == 0 {
            return Err(ModelError::NoNeighbors);
        }
        if config.neighbors > config.samples {
            return Err(ModelError::TooFewSamples {
                neighbors: config.neighbors,
                samples: config.samples,
            });
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut points = Vec::with_capacity(config.samples);
        let mut labels = Vec::with_capacity(config.samples);

        for _ in 0..config.samples {
            let raw = [
                rng.gen_range(DOMAIN[0].0..DOMAIN[0].1),
                rng.gen_range(DOMAIN[1].0..DOMAIN[1].1),
                rng.gen_range(DOMAIN[2].0..DOMAIN[2].1),
                rng.gen_range(DOMAIN[3].0..DOMAIN[3].1),
            ];
            points.push(normalize(&raw));
            labels.push(ground_truth(raw[0], raw[1], &config));
        }

        Ok(Self {
            points,
            labels,
            neighbors: config.neighbors,
        })
    }

    /// Predict the growth-efficiency score for one feature vector.
    ///
    /// The result is a convex combination of training labels, so it stays in
    /// `[0, 1]` even for queries outside the training domain; such queries
    /// additionally raise a telemetry warning because the model is then
    /// extrapolating.
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        if !in_domain(features) {
            warn_extrapolation(features);
        }
        let query = normalize(&features.0);

        let mut ranked: Vec<(f64, f64)> = self
            .points
            .iter()
            .zip(&self.labels)
            .map(|(p, &label)| (distance2(p, &query), label))
            .collect();
        ranked.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for &(d2, label) in ranked.iter().take(self.neighbors) {
            let d = d2.sqrt();
            if d < 1e-9 {
                // Exact hit on a training sample.
                return label;
            }
            let weight = 1.0 / d;
            numerator += weight * label;
            denominator += weight;
        }
        numerator / denominator
    }

    /// Number of training samples the model holds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Predictor for GrowthModel {
    fn predict(&self, features: &FeatureVector) -> f64 {
        GrowthModel::predict(self, features)
    }
}

/// Synthetic labeling function: 1.0 at the optimum, falling off linearly
/// with distance in `(temperature, 5·pH)` space, floored at 0. Dissolved
/// oxygen and optical density do not enter the label; the regressor has to
/// learn that they are irrelevant.
fn ground_truth(temperature: f64, ph: f64, config: &TrainConfig) -> f64 {
    let dist = ((temperature - config.optimum_temperature).powi(2)
        + ((ph - config.optimum_ph) * PH_WEIGHT).powi(2))
    .sqrt();
    (1.0 - dist / FALLOFF_RADIUS).max(0.0)
}

fn normalize(raw: &[f64; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (i, (lo, hi)) in DOMAIN.iter().enumerate() {
        out[i] = (raw[i] - lo) / (hi - lo);
    }
    out
}

fn in_domain(features: &FeatureVector) -> bool {
    features
        .0
        .iter()
        .zip(DOMAIN.iter())
        .all(|(v, (lo, hi))| v.is_finite() && *v >= *lo && *v <= *hi)
}

fn distance2(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(feature = "telemetry")]
fn warn_extrapolation(features: &FeatureVector) {
    tracing::warn!(?features, "query outside the training domain, extrapolating");
}

#[cfg(not(feature = "telemetry"))]
fn warn_extrapolation(features: &FeatureVector) {
    eprintln!("keimwart-model: query outside the training domain, extrapolating: {features:?}");
}
