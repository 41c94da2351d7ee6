//! Escapement-specific error types.
//!
//! The live preview never aborts on bad input: non-strict recomputes let NaN
//! flow through the geometry, and strict recomputes report the error and keep
//! the previous assembly.  These types are how both paths talk about failures.
//!
//! ## Usage
//!
//! ```rust
//! use escapement::error::{validate_params, EscapementResult};
//! use escapement::params::MechanismParams;
//!
//! fn check(params: &MechanismParams) -> EscapementResult<()> {
//!     validate_params(params)?;
//!     Ok(())
//! }
//! ```

use crate::params::{EscapementParams, MechanismParams, PalletParams};
use std::fmt;

/// Top-level error enum for the escapement designer.
#[derive(Debug, Clone, PartialEq)]
pub enum EscapementError {
    /// A mechanism parameter is non-finite or outside its meaningful range.
    InvalidParameter {
        /// Name of the parameter (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the accepted range.
        requirement: &'static str,
    },

    /// A generated shape could not be turned into a collider, usually because
    /// its vertices are collinear or non-finite.
    DegenerateShape {
        /// Which part of the mechanism the shape belongs to.
        what: &'static str,
    },

    /// `assets/escapement.toml` exists but could not be parsed.
    ConfigParse {
        path: String,
        message: String,
    },
}

impl fmt::Display for EscapementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EscapementError::InvalidParameter {
                name,
                value,
                requirement,
            } => write!(
                f,
                "parameter '{}' = {} is invalid (must be {})",
                name, value, requirement
            ),
            EscapementError::DegenerateShape { what } => {
                write!(f, "could not build a collider for {}", what)
            }
            EscapementError::ConfigParse { path, message } => {
                write!(f, "failed to parse {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for EscapementError {}

/// Convenience alias: a `Result` using `EscapementError` as the error type.
pub type EscapementResult<T> = Result<T, EscapementError>;

// ── Validation helpers ────────────────────────────────────────────────────────

fn finite(name: &'static str, value: f32) -> EscapementResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EscapementError::InvalidParameter {
            name,
            value,
            requirement: "a finite number",
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> EscapementResult<()> {
    finite(name, value)?;
    if value < 0.0 {
        Err(EscapementError::InvalidParameter {
            name,
            value,
            requirement: "≥ 0",
        })
    } else {
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> EscapementResult<()> {
    finite(name, value)?;
    if value <= 0.0 {
        Err(EscapementError::InvalidParameter {
            name,
            value,
            requirement: "> 0",
        })
    } else {
        Ok(())
    }
}

/// Check the escape wheel parameters.
///
/// A tooth count of zero is rejected; negative counts are accepted because the
/// generator uses the magnitude.
pub fn validate_wheel(params: &EscapementParams) -> EscapementResult<()> {
    if params.tooth_count == 0 {
        return Err(EscapementError::InvalidParameter {
            name: "tooth_count",
            value: 0.0,
            requirement: "non-zero",
        });
    }
    finite("lock_face_angle_deg", params.lock_face_angle_deg)?;
    finite("impulse_face_angle_deg", params.impulse_face_angle_deg)?;
    positive("center_diameter_mm", params.center_diameter_mm)?;
    non_negative("lock_face_length_mm", params.lock_face_length_mm)?;
    non_negative("impulse_face_length_mm", params.impulse_face_length_mm)
}

/// Check one pallet's parameters.
pub fn validate_pallet(params: &PalletParams) -> EscapementResult<()> {
    finite("pallet_angle_deg", params.angle_deg)?;
    non_negative("pallet_distance_mm", params.distance_mm)?;
    positive("pallet_diameter_mm", params.diameter_mm)
}

/// Check every parameter of a mechanism.  Returns the first failure.
pub fn validate_params(params: &MechanismParams) -> EscapementResult<()> {
    validate_wheel(&params.wheel)?;
    validate_pallet(&params.entry_pallet)?;
    validate_pallet(&params.exit_pallet)?;
    finite("pivot_separation_mm", params.frame.pivot_separation_mm)?;
    finite("banking_deg", params.frame.banking_deg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mechanism_is_valid() {
        assert_eq!(validate_params(&MechanismParams::default()), Ok(()));
    }

    #[test]
    fn nan_diameter_is_rejected() {
        let mut params = MechanismParams::default();
        params.wheel.center_diameter_mm = f32::NAN;
        let err = validate_params(&params).unwrap_err();
        match err {
            EscapementError::InvalidParameter { name, .. } => {
                assert_eq!(name, "center_diameter_mm")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn negative_tooth_count_is_accepted() {
        let mut params = MechanismParams::default();
        params.wheel.tooth_count = -12;
        assert!(validate_params(&params).is_ok());
    }

    #[test]
    fn zero_pallet_diameter_is_rejected() {
        let mut params = MechanismParams::default();
        params.exit_pallet.diameter_mm = 0.0;
        assert!(validate_params(&params).is_err());
    }

    #[test]
    fn display_mentions_parameter_name() {
        let err = EscapementError::InvalidParameter {
            name: "banking_deg",
            value: f32::INFINITY,
            requirement: "a finite number",
        };
        let text = err.to_string();
        assert!(text.contains("banking_deg"), "got: {text}");
    }
}
