//! Mechanism parameter records and the parameter source they are read from.
//!
//! Every recompute starts from a [`MechanismParams`] value.  The value types
//! are plain `Copy` records; nothing in the geometry generator holds on to
//! them between calls.
//!
//! [`ParameterForm`] is the in-app input form.  It implements
//! [`ParameterSource`], so the recompute path only ever sees
//! `current_values()` and change notifications and never touches UI widgets.

use crate::constants::*;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Escape wheel tooth geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapementParams {
    /// Number of teeth.  Only the magnitude is used.
    pub tooth_count: i32,
    /// Angle of the locking face, degrees from the radial.
    pub lock_face_angle_deg: f32,
    /// Angle of the impulse face, degrees from the radial.
    pub impulse_face_angle_deg: f32,
    /// Diameter of the central hub.
    pub center_diameter_mm: f32,
    pub lock_face_length_mm: f32,
    pub impulse_face_length_mm: f32,
}

impl Default for EscapementParams {
    fn default() -> Self {
        Self {
            tooth_count: TOOTH_COUNT,
            lock_face_angle_deg: LOCK_FACE_ANGLE_DEG,
            impulse_face_angle_deg: IMPULSE_FACE_ANGLE_DEG,
            center_diameter_mm: CENTER_DIAMETER_MM,
            lock_face_length_mm: LOCK_FACE_LENGTH_MM,
            impulse_face_length_mm: IMPULSE_FACE_LENGTH_MM,
        }
    }
}

/// One pallet, in polar coordinates about the fork pivot.
///
/// An angle of 0 points from the pivot straight at the escape wheel arbor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalletParams {
    pub angle_deg: f32,
    pub distance_mm: f32,
    pub diameter_mm: f32,
}

impl Default for PalletParams {
    fn default() -> Self {
        Self {
            angle_deg: PALLET_ANGLE_DEG,
            distance_mm: PALLET_DISTANCE_MM,
            diameter_mm: PALLET_DIAMETER_MM,
        }
    }
}

/// Placement of the fork relative to the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameParams {
    pub pivot_separation_mm: f32,
    pub banking_deg: f32,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            pivot_separation_mm: PIVOT_SEPARATION_MM,
            banking_deg: BANKING_DEG,
        }
    }
}

/// Which direction the impulse face angle is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpulseReference {
    /// Measured from the radial through the tooth's start point, even though
    /// the impulse face starts at the lock point.  This is how every
    /// historical version of the tool drew teeth.
    #[default]
    Legacy,
    /// Measured from the radial through the lock point.
    LockRadial,
}

/// Everything a recompute needs to know about the mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanismParams {
    pub wheel: EscapementParams,
    /// Pallet that receives the tooth first.  Its angle is signed in the
    /// mechanism frame, so the default sits on the negative side.
    pub entry_pallet: PalletParams,
    pub exit_pallet: PalletParams,
    pub frame: FrameParams,
    pub impulse_reference: ImpulseReference,
    /// Hold both pallets on one rigid fork body instead of two independent
    /// pallets sharing a pivot.
    pub rigid_fork: bool,
}

impl Default for MechanismParams {
    fn default() -> Self {
        Self {
            wheel: EscapementParams::default(),
            entry_pallet: PalletParams {
                angle_deg: -PALLET_ANGLE_DEG,
                ..Default::default()
            },
            exit_pallet: PalletParams::default(),
            frame: FrameParams::default(),
            impulse_reference: ImpulseReference::Legacy,
            rigid_fork: true,
        }
    }
}

// ── Parameter source ──────────────────────────────────────────────────────────

/// Callback invoked with the new values after any effective parameter change.
pub type ChangeCallback = Box<dyn FnMut(&MechanismParams) + Send + Sync>;

/// Anything the recompute path can read mechanism parameters from.
///
/// Inside the app, recomputes are triggered by Bevy change detection on
/// [`ParameterForm`]; `on_change` listeners run alongside it for side effects
/// such as logging.
pub trait ParameterSource {
    /// Snapshot of the current values.
    fn current_values(&self) -> MechanismParams;

    /// Register a callback fired after every change that alters the values.
    fn on_change(&mut self, callback: ChangeCallback);
}

/// Numeric fields exposed by the input form.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParamField {
    ToothCount,
    LockFaceAngle,
    ImpulseFaceAngle,
    CenterDiameter,
    LockFaceLength,
    ImpulseFaceLength,
    PivotSeparation,
    Banking,
    EntryPalletAngle,
    EntryPalletDistance,
    EntryPalletDiameter,
    ExitPalletAngle,
    ExitPalletDistance,
    ExitPalletDiameter,
}

impl ParamField {
    /// Every field, in display order.
    pub const ALL: [ParamField; 14] = [
        Self::ToothCount,
        Self::CenterDiameter,
        Self::LockFaceAngle,
        Self::ImpulseFaceAngle,
        Self::LockFaceLength,
        Self::ImpulseFaceLength,
        Self::PivotSeparation,
        Self::Banking,
        Self::EntryPalletAngle,
        Self::EntryPalletDistance,
        Self::EntryPalletDiameter,
        Self::ExitPalletAngle,
        Self::ExitPalletDistance,
        Self::ExitPalletDiameter,
    ];

    /// Human-readable label displayed next to the value.
    pub fn label(self) -> &'static str {
        match self {
            Self::ToothCount => "Teeth",
            Self::LockFaceAngle => "Lock angle (deg)",
            Self::ImpulseFaceAngle => "Impulse angle (deg)",
            Self::CenterDiameter => "Centre diameter (mm)",
            Self::LockFaceLength => "Lock length (mm)",
            Self::ImpulseFaceLength => "Impulse length (mm)",
            Self::PivotSeparation => "Pivot separation (mm)",
            Self::Banking => "Banking (deg)",
            Self::EntryPalletAngle => "Pallet 1 angle (deg)",
            Self::EntryPalletDistance => "Pallet 1 distance (mm)",
            Self::EntryPalletDiameter => "Pallet 1 diameter (mm)",
            Self::ExitPalletAngle => "Pallet 2 angle (deg)",
            Self::ExitPalletDistance => "Pallet 2 distance (mm)",
            Self::ExitPalletDiameter => "Pallet 2 diameter (mm)",
        }
    }

    /// Increment applied by one press of a stepper button.
    pub fn step(self) -> f32 {
        match self {
            Self::ToothCount => 1.0,
            Self::LockFaceAngle
            | Self::ImpulseFaceAngle
            | Self::EntryPalletAngle
            | Self::ExitPalletAngle => 1.0,
            Self::Banking => 0.5,
            Self::CenterDiameter | Self::PivotSeparation => 0.5,
            Self::LockFaceLength
            | Self::ImpulseFaceLength
            | Self::EntryPalletDistance
            | Self::ExitPalletDistance
            | Self::EntryPalletDiameter
            | Self::ExitPalletDiameter => 0.1,
        }
    }

    /// Read this field from a parameter record.
    ///
    /// The entry pallet angle is shown mirrored, so both pallets read as
    /// positive angles on a symmetric fork.
    pub fn get(self, p: &MechanismParams) -> f32 {
        match self {
            Self::ToothCount => p.wheel.tooth_count as f32,
            Self::LockFaceAngle => p.wheel.lock_face_angle_deg,
            Self::ImpulseFaceAngle => p.wheel.impulse_face_angle_deg,
            Self::CenterDiameter => p.wheel.center_diameter_mm,
            Self::LockFaceLength => p.wheel.lock_face_length_mm,
            Self::ImpulseFaceLength => p.wheel.impulse_face_length_mm,
            Self::PivotSeparation => p.frame.pivot_separation_mm,
            Self::Banking => p.frame.banking_deg,
            Self::EntryPalletAngle => -p.entry_pallet.angle_deg,
            Self::EntryPalletDistance => p.entry_pallet.distance_mm,
            Self::EntryPalletDiameter => p.entry_pallet.diameter_mm,
            Self::ExitPalletAngle => p.exit_pallet.angle_deg,
            Self::ExitPalletDistance => p.exit_pallet.distance_mm,
            Self::ExitPalletDiameter => p.exit_pallet.diameter_mm,
        }
    }

    /// Write this field into a parameter record.
    pub fn set(self, p: &mut MechanismParams, value: f32) {
        match self {
            Self::ToothCount => p.wheel.tooth_count = value.round() as i32,
            Self::LockFaceAngle => p.wheel.lock_face_angle_deg = value,
            Self::ImpulseFaceAngle => p.wheel.impulse_face_angle_deg = value,
            Self::CenterDiameter => p.wheel.center_diameter_mm = value,
            Self::LockFaceLength => p.wheel.lock_face_length_mm = value,
            Self::ImpulseFaceLength => p.wheel.impulse_face_length_mm = value,
            Self::PivotSeparation => p.frame.pivot_separation_mm = value,
            Self::Banking => p.frame.banking_deg = value,
            Self::EntryPalletAngle => p.entry_pallet.angle_deg = -value,
            Self::EntryPalletDistance => p.entry_pallet.distance_mm = value,
            Self::EntryPalletDiameter => p.entry_pallet.diameter_mm = value,
            Self::ExitPalletAngle => p.exit_pallet.angle_deg = value,
            Self::ExitPalletDistance => p.exit_pallet.distance_mm = value,
            Self::ExitPalletDiameter => p.exit_pallet.diameter_mm = value,
        }
    }
}

/// Boolean fields exposed by the input form.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ParamToggle {
    CorrectedImpulseAngle,
    RigidFork,
}

impl ParamToggle {
    pub const ALL: [ParamToggle; 2] = [Self::CorrectedImpulseAngle, Self::RigidFork];

    pub fn label(self) -> &'static str {
        match self {
            Self::CorrectedImpulseAngle => "Impulse angle from lock radial",
            Self::RigidFork => "Rigid fork link",
        }
    }

    pub fn get(self, p: &MechanismParams) -> bool {
        match self {
            Self::CorrectedImpulseAngle => p.impulse_reference == ImpulseReference::LockRadial,
            Self::RigidFork => p.rigid_fork,
        }
    }

    pub fn set(self, p: &mut MechanismParams, on: bool) {
        match self {
            Self::CorrectedImpulseAngle => {
                p.impulse_reference = if on {
                    ImpulseReference::LockRadial
                } else {
                    ImpulseReference::Legacy
                };
            }
            Self::RigidFork => p.rigid_fork = on,
        }
    }
}

/// The in-app input form: current field values plus change listeners.
///
/// Stored as a Bevy [`Resource`].  The panel mutates it only when a control
/// is actually pressed, so Bevy change detection on this resource doubles as
/// the "a field changed" signal.
#[derive(Resource, Default)]
pub struct ParameterForm {
    values: MechanismParams,
    listeners: Vec<ChangeCallback>,
}

impl ParameterForm {
    pub fn new(values: MechanismParams) -> Self {
        Self {
            values,
            listeners: Vec::new(),
        }
    }

    /// Number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Current value of a numeric field, as displayed.
    pub fn field(&self, field: ParamField) -> f32 {
        field.get(&self.values)
    }

    /// Current value of a boolean field.
    pub fn flag(&self, toggle: ParamToggle) -> bool {
        toggle.get(&self.values)
    }

    /// Set a numeric field.  Returns `true` if the values changed.
    pub fn set_field(&mut self, field: ParamField, value: f32) -> bool {
        let mut next = self.values;
        field.set(&mut next, value);
        self.replace_values(next)
    }

    /// Move a numeric field by `steps` increments of [`ParamField::step`].
    pub fn step_field(&mut self, field: ParamField, steps: f32) -> bool {
        let value = self.field(field) + field.step() * steps;
        self.set_field(field, value)
    }

    /// Flip a boolean field.  Always changes the values.
    pub fn toggle(&mut self, toggle: ParamToggle) -> bool {
        let mut next = self.values;
        toggle.set(&mut next, !toggle.get(&self.values));
        self.replace_values(next)
    }

    /// Replace every value at once.  Returns `true` if anything changed.
    pub fn replace_values(&mut self, values: MechanismParams) -> bool {
        // NaN never compares equal, so a NaN field always counts as a change.
        if values == self.values {
            return false;
        }
        self.values = values;
        let snapshot = self.values;
        for listener in self.listeners.iter_mut() {
            listener(&snapshot);
        }
        true
    }
}

impl ParameterSource for ParameterForm {
    fn current_values(&self) -> MechanismParams {
        self.values
    }

    fn on_change(&mut self, callback: ChangeCallback) {
        self.listeners.push(callback);
    }
}
