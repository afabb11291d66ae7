//! Scene configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use glam::Vec3;

// ── SceneConfig ────────────────────────────────────────────────────

/// Per-graph simulation settings.
///
/// Checked by [`validate()`](SceneConfig::validate) when a
/// [`Graph`](crate::Graph) is constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    /// Time step in seconds. Default: 0.016.
    pub dt: f32,
    /// Gravity vector. Default: `(0, -9.8, 0)`.
    pub gravity: Vec3,
    /// Lower corner of the scene bounds. Default: `-1e3` on every axis.
    pub lower_bound: Vec3,
    /// Upper corner of the scene bounds. Default: `1e3` on every axis.
    pub upper_bound: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            dt: 0.016,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            lower_bound: Vec3::splat(-1.0e3),
            upper_bound: Vec3::splat(1.0e3),
        }
    }
}

impl SceneConfig {
    /// Check every invariant, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidDt { value: self.dt });
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::InvalidGravity);
        }
        if !self.lower_bound.is_finite()
            || !self.upper_bound.is_finite()
            || self.lower_bound.cmpgt(self.upper_bound).any()
        {
            return Err(ConfigError::InvertedBounds);
        }
        Ok(())
    }

    /// Whether `p` lies inside the scene bounds.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.lower_bound).all() && p.cmple(self.upper_bound).all()
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`SceneConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `dt` is NaN, infinite, zero, or negative.
    InvalidDt {
        /// The invalid value.
        value: f32,
    },
    /// The gravity vector has a non-finite component.
    InvalidGravity,
    /// A bound is non-finite or the lower corner exceeds the upper corner.
    InvertedBounds,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDt { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::InvalidGravity => write!(f, "gravity must be finite"),
            Self::InvertedBounds => {
                write!(f, "scene bounds must be finite with lower <= upper")
            }
        }
    }
}

impl Error for ConfigError {}
