//! Centralised geometry, physics and presentation constants.
//!
//! Every tunable value lives here so it can be found and changed in one
//! place.  These are the **authoritative defaults** used by
//! [`EscapementConfig::default()`](crate::config::EscapementConfig); any of
//! them can be overridden at startup from `assets/escapement.toml`.

// ── Viewport ──────────────────────────────────────────────────────────────────

/// Width of the simulation viewport in pixels.
///
/// The view scale is derived from this: the whole wheel (plus margin) is
/// fitted into this many pixels.
pub const VIEWPORT_WIDTH: f32 = 400.0;

/// Height of the simulation viewport in pixels.
pub const VIEWPORT_HEIGHT: f32 = 600.0;

/// Width of the parameter panel docked to the right of the viewport.
pub const PANEL_WIDTH: f32 = 300.0;

/// Fraction of the viewport height, measured from the top, at which the
/// escape wheel arbor sits.  The fork pivot is placed above it.
pub const WHEEL_CENTER_FRACTION: f32 = 2.0 / 3.0;

// ── View scaling ──────────────────────────────────────────────────────────────

/// Margin applied to the wheel's outer extent when fitting it to the viewport.
///
/// `1.2` leaves 10 % of the width free on each side; `1.5` zooms further out
/// so the fork and banking pins stay visible on large pivot separations.
pub const MARGIN_FACTOR: f32 = 1.2;

/// Divisor applied to each pallet's distance from the fork pivot before the
/// polar-to-cartesian conversion.
///
/// `1.0` treats the entered distance as the pallet radius from the pivot;
/// `2.0` treats it as a diameter-like span.
pub const PALLET_DISTANCE_DIVISOR: f32 = 1.0;

// ── Physics: world ────────────────────────────────────────────────────────────

/// Fixed physics timestep (seconds).  Matches a 240 Hz stepping rate.
pub const PHYSICS_DT: f32 = 1.0 / 240.0;

/// Rapier substeps per fixed step.  Pin joints stay stiff with more substeps.
pub const PHYSICS_SUBSTEPS: usize = 8;

// ── Physics: materials ────────────────────────────────────────────────────────

/// Friction coefficient for every collider in the mechanism.
pub const FRICTION: f32 = 0.1;

/// Restitution coefficient for every collider in the mechanism.
/// 0.0 = perfectly inelastic; 1.0 = perfectly elastic.
pub const RESTITUTION: f32 = 0.1;

/// Linear damping applied to the moving bodies (air drag stand-in).
pub const LINEAR_DAMPING: f32 = 0.01;

/// Angular damping applied to the moving bodies.
pub const ANGULAR_DAMPING: f32 = 0.01;

// ── Physics: drive ────────────────────────────────────────────────────────────

/// Total mass of the escape wheel body.
pub const WHEEL_MASS: f32 = 0.1;

/// Mass of each pallet.  A rigid fork carries both.
pub const PALLET_MASS: f32 = 0.2;

/// Torque applied clockwise to the escape wheel while it turns slower than
/// [`DRIVE_THRESHOLD`].  Stands in for the mainspring.
///
/// World units are pixels, so the wheel's moment of inertia is roughly
/// `0.5 · WHEEL_MASS · r²` with `r` around 150 px: about 1000 at defaults.
pub const DRIVE_TORQUE: f32 = 1000.0;

/// Clockwise angular speed (rad/s) below which the drive torque is applied.
pub const DRIVE_THRESHOLD: f32 = 2.4;

// ── Default escape wheel ──────────────────────────────────────────────────────

pub const TOOTH_COUNT: i32 = 15;
pub const LOCK_FACE_ANGLE_DEG: f32 = -45.0;
pub const IMPULSE_FACE_ANGLE_DEG: f32 = 45.0;
pub const CENTER_DIAMETER_MM: f32 = 43.0;
pub const LOCK_FACE_LENGTH_MM: f32 = 5.0;
pub const IMPULSE_FACE_LENGTH_MM: f32 = 5.0;

// ── Default pallet fork ───────────────────────────────────────────────────────

/// Distance between the escape wheel arbor and the pallet fork pivot.
pub const PIVOT_SEPARATION_MM: f32 = 36.0;

/// Swing allowed either side of each pallet before it meets its banking pin.
pub const BANKING_DEG: f32 = 5.0;

pub const PALLET_ANGLE_DEG: f32 = 45.0;
pub const PALLET_DISTANCE_MM: f32 = 16.0;
pub const PALLET_DIAMETER_MM: f32 = 3.0;

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Font size for parameter panel labels and values.
pub const PANEL_FONT_SIZE: f32 = 13.0;

/// Significant figures shown for parameter values in the panel.
pub const VALUE_SIG_FIGS: usize = 3;

/// Significant figures shown for the scale readout.
pub const SCALE_SIG_FIGS: usize = 4;
