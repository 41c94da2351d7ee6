//! Runtime configuration loaded from `assets/escapement.toml`.
//!
//! [`EscapementConfig`] is a Bevy [`Resource`] that mirrors the constants in
//! [`crate::constants`] plus the initial mechanism parameters.  At startup,
//! [`load_escapement_config`] reads `assets/escapement.toml` and overwrites
//! the defaults with any values present in the file.  Missing keys fall back
//! to the compile-time defaults, so a minimal TOML can override just the
//! values you care about:
//!
//! ```toml
//! margin_factor = 1.5
//! pallet_distance_divisor = 2.0
//!
//! [initial.wheel]
//! tooth_count = 30
//! ```
//!
//! Keep `src/constants.rs` in sync: it remains the **authoritative default**
//! source used by `EscapementConfig::default()`.

use crate::constants::*;
use crate::error::{EscapementError, EscapementResult};
use crate::geometry::LayoutOptions;
use crate::params::MechanismParams;
use bevy::prelude::*;
use serde::Deserialize;

pub const CONFIG_PATH: &str = "assets/escapement.toml";

/// Runtime-tunable geometry, physics and presentation configuration.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EscapementConfig {
    // ── Viewport ─────────────────────────────────────────────────────────────
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub panel_width: f32,
    pub wheel_center_fraction: f32,

    // ── View scaling ─────────────────────────────────────────────────────────
    pub margin_factor: f32,
    pub pallet_distance_divisor: f32,

    // ── Validation ───────────────────────────────────────────────────────────
    /// Reject invalid parameters (keeping the previous assembly) instead of
    /// letting NaN and negative sizes flow into the simulation.
    pub strict_validation: bool,

    // ── Physics: world ───────────────────────────────────────────────────────
    pub physics_dt: f32,
    pub physics_substeps: usize,

    // ── Physics: materials ───────────────────────────────────────────────────
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,

    // ── Physics: drive ───────────────────────────────────────────────────────
    pub wheel_mass: f32,
    pub pallet_mass: f32,
    pub drive_torque: f32,
    pub drive_threshold: f32,

    // ── Rendering ────────────────────────────────────────────────────────────
    pub panel_font_size: f32,
    pub show_outlines: bool,
    pub physics_debug_render: bool,

    // ── Initial mechanism ────────────────────────────────────────────────────
    pub initial: MechanismParams,
}

impl Default for EscapementConfig {
    fn default() -> Self {
        Self {
            // Viewport
            viewport_width: VIEWPORT_WIDTH,
            viewport_height: VIEWPORT_HEIGHT,
            panel_width: PANEL_WIDTH,
            wheel_center_fraction: WHEEL_CENTER_FRACTION,
            // View scaling
            margin_factor: MARGIN_FACTOR,
            pallet_distance_divisor: PALLET_DISTANCE_DIVISOR,
            // Validation
            strict_validation: false,
            // Physics: world
            physics_dt: PHYSICS_DT,
            physics_substeps: PHYSICS_SUBSTEPS,
            // Physics: materials
            friction: FRICTION,
            restitution: RESTITUTION,
            linear_damping: LINEAR_DAMPING,
            angular_damping: ANGULAR_DAMPING,
            // Physics: drive
            wheel_mass: WHEEL_MASS,
            pallet_mass: PALLET_MASS,
            drive_torque: DRIVE_TORQUE,
            drive_threshold: DRIVE_THRESHOLD,
            // Rendering
            panel_font_size: PANEL_FONT_SIZE,
            show_outlines: false,
            physics_debug_render: false,
            // Initial mechanism
            initial: MechanismParams::default(),
        }
    }
}

impl EscapementConfig {
    /// Parse a TOML document, falling back to defaults for missing keys.
    pub fn from_toml_str(contents: &str) -> EscapementResult<Self> {
        toml::from_str(contents).map_err(|e| EscapementError::ConfigParse {
            path: CONFIG_PATH.to_string(),
            message: e.to_string(),
        })
    }

    /// The generator settings carried by this config.
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            margin_factor: self.margin_factor,
            viewport_width_px: self.viewport_width,
            pallet_distance_divisor: self.pallet_distance_divisor,
        }
    }

    /// World-space y of the wheel arbor.
    ///
    /// The camera is centred on the viewport, so a point `fraction` of the way
    /// down from the top edge sits at `height/2 − fraction·height`.
    pub fn wheel_center_y(&self) -> f32 {
        self.viewport_height / 2.0 - self.wheel_center_fraction * self.viewport_height
    }
}

/// Startup system: attempt to load `assets/escapement.toml` and overwrite the
/// `EscapementConfig` resource with any values present in the file.
///
/// Parse errors are logged but do not abort the app.  A missing file is not an
/// error; the compiled defaults are already in place.
pub fn load_escapement_config(mut config: ResMut<EscapementConfig>) {
    match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => match EscapementConfig::from_toml_str(&contents) {
            Ok(loaded) => {
                *config = loaded;
                info!("Loaded escapement config from {CONFIG_PATH}");
            }
            Err(e) => {
                warn!("{e}; using defaults");
            }
        },
        Err(_) => {
            info!("No {CONFIG_PATH} found; using compiled defaults");
        }
    }
}
