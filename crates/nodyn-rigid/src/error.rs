//! Rigid-body authoring and synchronization errors.

use std::error::Error;
use std::fmt;

use nodyn_array::ArrayError;
use nodyn_core::{FieldError, ModuleError};

use crate::shape::ShapeType;

/// Errors from the rigid-body registries and their device mirror.
#[derive(Clone, Debug, PartialEq)]
pub enum RigidError {
    /// An actor index is unset (`-1`), out of range, or both joint
    /// endpoints name the same body.
    InvalidActor {
        /// The offending index.
        idx: i32,
    },
    /// The shape description is degenerate.
    UnsupportedShape {
        /// Shape kind being registered.
        shape: ShapeType,
        /// What is wrong with it.
        reason: String,
    },
    /// Density is non-finite or not positive.
    InvalidDensity {
        /// The rejected density.
        density: f32,
    },
    /// Surface sample and normal lists differ in length.
    SampleCountMismatch {
        /// Number of samples.
        samples: usize,
        /// Number of normals.
        normals: usize,
    },
    /// A device array no longer matches the host registry.
    StaleDeviceArray {
        /// Name of the offending array.
        array: String,
        /// Length required by the registry.
        expected: usize,
        /// Length found.
        found: usize,
    },
    /// A field access failed.
    Field(FieldError),
}

impl fmt::Display for RigidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidActor { idx } => write!(f, "invalid actor index {idx}"),
            Self::UnsupportedShape { shape, reason } => {
                write!(f, "unsupported {shape}: {reason}")
            }
            Self::InvalidDensity { density } => {
                write!(f, "density must be finite and positive, got {density}")
            }
            Self::SampleCountMismatch { samples, normals } => {
                write!(f, "{samples} surface samples but {normals} normals")
            }
            Self::StaleDeviceArray {
                array,
                expected,
                found,
            } => write!(
                f,
                "stale device array '{array}': expected length {expected}, found {found}"
            ),
            Self::Field(e) => write!(f, "field: {e}"),
        }
    }
}

impl Error for RigidError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Field(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldError> for RigidError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<ArrayError> for RigidError {
    fn from(e: ArrayError) -> Self {
        match e {
            ArrayError::LengthMismatch {
                array,
                expected,
                found,
            } => Self::StaleDeviceArray {
                array,
                expected,
                found,
            },
            ArrayError::DimensionMismatch { nx, ny, len } => Self::StaleDeviceArray {
                array: format!("{nx}x{ny}"),
                expected: nx * ny,
                found: len,
            },
        }
    }
}

impl From<RigidError> for ModuleError {
    fn from(e: RigidError) -> Self {
        match e {
            RigidError::InvalidActor { idx } => ModuleError::InvalidActor { idx },
            RigidError::StaleDeviceArray {
                array,
                expected,
                found,
            } => ModuleError::StaleDeviceArray {
                array,
                expected,
                found,
            },
            RigidError::Field(e) => ModuleError::Field(e),
            other => ModuleError::ExecutionFailed {
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_actor_maps_to_module_error() {
        let m: ModuleError = RigidError::InvalidActor { idx: -1 }.into();
        assert_eq!(m, ModuleError::InvalidActor { idx: -1 });
    }

    #[test]
    fn length_mismatch_becomes_stale_array() {
        let e: RigidError = nodyn_array::check_len("Mass", 2, 1).unwrap_err().into();
        assert_eq!(e.to_string(), "stale device array 'Mass': expected length 2, found 1");
    }

    #[test]
    fn unsupported_shape_names_shape() {
        let e = RigidError::UnsupportedShape {
            shape: ShapeType::Tet,
            reason: "zero volume".into(),
        };
        assert_eq!(e.to_string(), "unsupported tet: zero volume");
    }
}
