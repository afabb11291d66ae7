//! Array-specific error types.

use std::error::Error;
use std::fmt;

use nodyn_core::ModuleError;

/// Errors from device array operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// An array's length disagrees with the length its family requires.
    LengthMismatch {
        /// Name of the array being checked.
        array: String,
        /// Required length.
        expected: usize,
        /// Actual length.
        found: usize,
    },
    /// Host data does not fill a 2-D array of the requested shape.
    DimensionMismatch {
        /// Requested width.
        nx: usize,
        /// Requested height.
        ny: usize,
        /// Number of host elements supplied.
        len: usize,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch {
                array,
                expected,
                found,
            } => write!(
                f,
                "array '{array}' has length {found}, expected {expected}"
            ),
            Self::DimensionMismatch { nx, ny, len } => {
                write!(f, "{len} elements cannot fill a {nx}x{ny} array")
            }
        }
    }
}

impl Error for ArrayError {}

impl From<ArrayError> for ModuleError {
    fn from(e: ArrayError) -> Self {
        match e {
            ArrayError::LengthMismatch {
                array,
                expected,
                found,
            } => ModuleError::StaleDeviceArray {
                array,
                expected,
                found,
            },
            other => ModuleError::ExecutionFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// Check that an array of length `found` matches `expected`.
pub fn check_len(array: &str, expected: usize, found: usize) -> Result<(), ArrayError> {
    if expected == found {
        Ok(())
    } else {
        Err(ArrayError::LengthMismatch {
            array: array.to_string(),
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_maps_to_stale_device_array() {
        let err = check_len("Velocity", 4, 3).unwrap_err();
        match ModuleError::from(err) {
            ModuleError::StaleDeviceArray {
                array,
                expected,
                found,
            } => {
                assert_eq!(array, "Velocity");
                assert_eq!(expected, 4);
                assert_eq!(found, 3);
            }
            other => panic!("expected StaleDeviceArray, got {other:?}"),
        }
    }

    #[test]
    fn equal_lengths_pass() {
        assert!(check_len("Mass", 7, 7).is_ok());
    }
}
