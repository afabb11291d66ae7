//! Particle authoring errors.

use std::error::Error;
use std::fmt;

use nodyn_core::ModuleError;

/// Errors from particle and boundary authoring.
#[derive(Clone, Debug, PartialEq)]
pub enum ParticleError {
    /// Lattice or boundary spacing is non-finite or not positive.
    InvalidSpacing {
        /// The rejected spacing.
        spacing: f32,
    },
    /// A box's lower corner is not below its upper corner on every axis.
    InvertedBox {
        /// Requested lower corner.
        lo: [f32; 3],
        /// Requested upper corner.
        hi: [f32; 3],
    },
    /// A lattice would hold more than
    /// [`MAX_PARTICLES`](crate::system::MAX_PARTICLES) particles.
    TooManyParticles {
        /// Requested particle count, saturated at `u64::MAX`.
        requested: u64,
    },
}

impl fmt::Display for ParticleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSpacing { spacing } => {
                write!(f, "spacing must be finite and positive, got {spacing}")
            }
            Self::InvertedBox { lo, hi } => {
                write!(f, "box lower corner {lo:?} is not below upper corner {hi:?}")
            }
            Self::TooManyParticles { requested } => write!(
                f,
                "lattice of {requested} particles exceeds the limit of {}",
                crate::system::MAX_PARTICLES
            ),
        }
    }
}

impl Error for ParticleError {}

impl From<ParticleError> for ModuleError {
    fn from(e: ParticleError) -> Self {
        ModuleError::ExecutionFailed {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_values() {
        let e = ParticleError::InvalidSpacing { spacing: -1.0 };
        assert_eq!(e.to_string(), "spacing must be finite and positive, got -1");
    }
}
