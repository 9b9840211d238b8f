use crate::error::ConfigError;

pub const MAX_SCORE: u32 = 5000;

/// Width of the Gaussian decay curve in meters.
///
/// At 250 km a guess ~300 km off earns a bit under half the points. Override
/// via [`Config::sigma_meters`](crate::config::Config).
pub const DEFAULT_SIGMA_METERS: f64 = 250_000.0;

/// Maps a guess distance onto `0..=MAX_SCORE` points with a Gaussian falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreCalculator {
    sigma_meters: f64,
}

impl Default for ScoreCalculator {
    fn default() -> Self {
        Self {
            sigma_meters: DEFAULT_SIGMA_METERS,
        }
    }
}

impl ScoreCalculator {
    pub fn new(sigma_meters: f64) -> Result<Self, ConfigError> {
        if sigma_meters.is_finite() && sigma_meters > 0.0 {
            Ok(Self { sigma_meters })
        } else {
            Err(ConfigError::InvalidSigma(sigma_meters))
        }
    }

    pub fn sigma_meters(&self) -> f64 {
        self.sigma_meters
    }

    pub fn score(&self, distance_meters: f64) -> u32 {
        let ratio = distance_meters / self.sigma_meters;
        let points = (MAX_SCORE as f64 * (-0.5 * ratio * ratio).exp()).round();
        // exp() lands in (0, 1] so this is already in range; the clamp covers NaN
        points.clamp(0.0, MAX_SCORE as f64) as u32
    }
}
