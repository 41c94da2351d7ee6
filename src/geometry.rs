//! Escapement geometry generator.
//!
//! Pure functions that turn [`MechanismParams`] into shape descriptions in the
//! **mechanism frame**: +y points from the wheel arbor towards tooth 0 and
//! from the fork pivot towards the wheel.  All output is in pixels, scaled by
//! the `px_per_mm` of one recompute pass.
//!
//! Nothing here touches the ECS or the physics engine; the same input always
//! produces bit-identical output.
//!
//! ## Tooth construction
//!
//! ```text
//!            impulse
//!              /
//!             /   impulse face (impulse_face_angle_deg from radial)
//!           lock
//!            |    lock face (lock_face_angle_deg from radial)
//!          start  = (0, hub radius)
//!            |
//!          arbor
//! ```
//!
//! The canonical tooth is built at the top of the hub and then rotated into
//! slot `i` by `i × 360/N` degrees.

use crate::params::{EscapementParams, ImpulseReference, MechanismParams, PalletParams};
use bevy::prelude::*;

/// Rotate `v` counter-clockwise (in a y-up frame) by `angle_rad`.
pub fn rotate(v: Vec2, angle_rad: f32) -> Vec2 {
    let (s, c) = angle_rad.sin_cos();
    Vec2::new(v.x * c - v.y * s, v.x * s + v.y * c)
}

/// Arithmetic mean of a set of points.
pub fn centroid(points: &[Vec2]) -> Vec2 {
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

// ── View scale ────────────────────────────────────────────────────────────────

/// Conversion between millimetres and pixels for one recompute pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewScale {
    pub mm_per_px: f32,
    pub px_per_mm: f32,
}

/// Fit the full wheel diameter, times `margin_factor`, into the viewport width.
pub fn derive_scale(
    params: &EscapementParams,
    margin_factor: f32,
    viewport_width_px: f32,
) -> ViewScale {
    let width_mm = (params.center_diameter_mm
        + 2.0 * params.lock_face_length_mm
        + 2.0 * params.impulse_face_length_mm)
        * margin_factor;
    let mm_per_px = width_mm / viewport_width_px;
    ViewScale {
        mm_per_px,
        px_per_mm: 1.0 / mm_per_px,
    }
}

// ── Escape wheel ──────────────────────────────────────────────────────────────

/// One triangular tooth in wheel-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToothOutline {
    /// `[start, lock, impulse]`.
    pub vertices: [Vec2; 3],
    /// Placement point of the tooth shape on the wheel body.
    pub centroid: Vec2,
}

impl ToothOutline {
    fn new(vertices: [Vec2; 3]) -> Self {
        Self {
            vertices,
            centroid: centroid(&vertices),
        }
    }

    pub fn start(&self) -> Vec2 {
        self.vertices[0]
    }

    pub fn lock(&self) -> Vec2 {
        self.vertices[1]
    }

    pub fn impulse(&self) -> Vec2 {
        self.vertices[2]
    }

    /// Vertices relative to [`Self::centroid`], as a collider placed at the
    /// centroid expects them.
    pub fn local_vertices(&self) -> [Vec2; 3] {
        self.vertices.map(|v| v - self.centroid)
    }
}

/// Hub circle plus teeth, all sharing the wheel arbor as origin.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelAssembly {
    pub hub_radius: f32,
    pub teeth: Vec<ToothOutline>,
}

impl WheelAssembly {
    /// Hub plus one shape per tooth.
    pub fn shape_count(&self) -> usize {
        1 + self.teeth.len()
    }
}

/// Build the canonical tooth (slot 0) as `[start, lock, impulse]`.
fn canonical_tooth(
    params: &EscapementParams,
    px_per_mm: f32,
    reference: ImpulseReference,
) -> [Vec2; 3] {
    let start = Vec2::new(0.0, px_per_mm * params.center_diameter_mm / 2.0);
    let lock = start
        + rotate(
            Vec2::new(0.0, px_per_mm * params.lock_face_length_mm),
            params.lock_face_angle_deg.to_radians(),
        );

    let impulse_angle = match reference {
        ImpulseReference::Legacy => params.impulse_face_angle_deg.to_radians(),
        ImpulseReference::LockRadial => {
            // Angle that takes +y onto the radial through the lock point.
            let radial = f32::atan2(-lock.x, lock.y);
            params.impulse_face_angle_deg.to_radians() + radial
        }
    };
    let impulse = lock
        + rotate(
            Vec2::new(0.0, px_per_mm * params.impulse_face_length_mm),
            impulse_angle,
        );

    [start, lock, impulse]
}

/// Build the escape wheel: one hub circle and `|tooth_count|` teeth.
///
/// Input is not validated; NaN or negative lengths simply produce degenerate
/// geometry.
pub fn build_wheel(
    params: &EscapementParams,
    px_per_mm: f32,
    reference: ImpulseReference,
) -> WheelAssembly {
    let count = params.tooth_count.unsigned_abs();
    let canonical = canonical_tooth(params, px_per_mm, reference);
    let pitch_deg = 360.0 / count as f32;

    let teeth = (0..count)
        .map(|i| {
            let angle = (i as f32 * pitch_deg).to_radians();
            ToothOutline::new(canonical.map(|v| rotate(v, angle)))
        })
        .collect();

    WheelAssembly {
        hub_radius: px_per_mm * params.center_diameter_mm / 2.0,
        teeth,
    }
}

// ── Pallet fork ───────────────────────────────────────────────────────────────

/// A circular pallet (or banking pin) relative to the fork pivot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalletShape {
    pub center: Vec2,
    pub radius: f32,
}

/// Polar-to-cartesian placement of a pallet about the fork pivot.
///
/// `distance_divisor` is applied to the distance before conversion.
pub fn pallet_center(params: &PalletParams, px_per_mm: f32, distance_divisor: f32) -> Vec2 {
    let distance = params.distance_mm / distance_divisor;
    let angle = params.angle_deg.to_radians();
    Vec2::new(distance * angle.sin(), distance * angle.cos()) * px_per_mm
}

pub fn build_pallet(params: &PalletParams, px_per_mm: f32, distance_divisor: f32) -> PalletShape {
    PalletShape {
        center: pallet_center(params, px_per_mm, distance_divisor),
        radius: px_per_mm * params.diameter_mm / 2.0,
    }
}

/// Both pallets, the optional rigid link, and the two banking pins.
#[derive(Debug, Clone, PartialEq)]
pub struct PalletAssembly {
    pub entry: PalletShape,
    pub exit: PalletShape,
    /// `[pivot, entry centre, exit centre]` when the pallets share one body.
    pub link: Option<[Vec2; 3]>,
    /// Fixed pins limiting the swing: outside the entry and exit pallets.
    pub banking_pins: [PalletShape; 2],
}

pub fn build_pallet_assembly(
    mechanism: &MechanismParams,
    px_per_mm: f32,
    distance_divisor: f32,
) -> PalletAssembly {
    let entry = build_pallet(&mechanism.entry_pallet, px_per_mm, distance_divisor);
    let exit = build_pallet(&mechanism.exit_pallet, px_per_mm, distance_divisor);

    let banking = mechanism.frame.banking_deg;
    let entry_pin = PalletParams {
        angle_deg: mechanism.entry_pallet.angle_deg - banking,
        ..mechanism.entry_pallet
    };
    let exit_pin = PalletParams {
        angle_deg: mechanism.exit_pallet.angle_deg + banking,
        ..mechanism.exit_pallet
    };

    PalletAssembly {
        entry,
        exit,
        link: mechanism
            .rigid_fork
            .then_some([Vec2::ZERO, entry.center, exit.center]),
        banking_pins: [
            build_pallet(&entry_pin, px_per_mm, distance_divisor),
            build_pallet(&exit_pin, px_per_mm, distance_divisor),
        ],
    }
}

// ── Full layout ───────────────────────────────────────────────────────────────

/// Settings of the generator that are not mechanism parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub margin_factor: f32,
    pub viewport_width_px: f32,
    pub pallet_distance_divisor: f32,
}

/// Everything one recompute pass generates.
#[derive(Debug, Clone, PartialEq)]
pub struct MechanismLayout {
    pub scale: ViewScale,
    pub wheel: WheelAssembly,
    pub pallets: PalletAssembly,
    /// Distance from the wheel arbor to the fork pivot.
    pub pivot_separation_px: f32,
}

/// Derive the view scale and build the wheel and fork in one pass.
pub fn build_layout(mechanism: &MechanismParams, options: &LayoutOptions) -> MechanismLayout {
    let scale = derive_scale(
        &mechanism.wheel,
        options.margin_factor,
        options.viewport_width_px,
    );
    MechanismLayout {
        scale,
        wheel: build_wheel(
            &mechanism.wheel,
            scale.px_per_mm,
            mechanism.impulse_reference,
        ),
        pallets: build_pallet_assembly(
            mechanism,
            scale.px_per_mm,
            options.pallet_distance_divisor,
        ),
        pivot_separation_px: mechanism.frame.pivot_separation_mm * scale.px_per_mm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn rotate_quarter_turn() {
        let v = rotate(Vec2::new(0.0, 1.0), 90f32.to_radians());
        assert!(close(v, Vec2::new(-1.0, 0.0)), "got {v:?}");
    }

    #[test]
    fn centroid_of_triangle() {
        let c = centroid(&[Vec2::ZERO, Vec2::new(3.0, 0.0), Vec2::new(0.0, 3.0)]);
        assert!(close(c, Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn radial_lock_face_extends_straight_out() {
        let params = EscapementParams {
            tooth_count: 1,
            lock_face_angle_deg: 0.0,
            impulse_face_angle_deg: 0.0,
            center_diameter_mm: 10.0,
            lock_face_length_mm: 2.0,
            impulse_face_length_mm: 3.0,
        };
        let wheel = build_wheel(&params, 1.0, ImpulseReference::Legacy);
        let tooth = wheel.teeth[0];
        assert!(close(tooth.start(), Vec2::new(0.0, 5.0)));
        assert!(close(tooth.lock(), Vec2::new(0.0, 7.0)));
        assert!(close(tooth.impulse(), Vec2::new(0.0, 10.0)));
    }

    #[test]
    fn local_vertices_are_centred() {
        let wheel = build_wheel(
            &EscapementParams::default(),
            2.0,
            ImpulseReference::Legacy,
        );
        for tooth in &wheel.teeth {
            let c = centroid(&tooth.local_vertices());
            assert!(c.length() < 1e-3, "local centroid {c:?}");
        }
    }

    #[test]
    fn lock_radial_matches_legacy_for_radial_lock_face() {
        let params = EscapementParams {
            lock_face_angle_deg: 0.0,
            ..Default::default()
        };
        let legacy = build_wheel(&params, 3.0, ImpulseReference::Legacy);
        let corrected = build_wheel(&params, 3.0, ImpulseReference::LockRadial);
        assert_eq!(legacy, corrected);
    }

    #[test]
    fn lock_radial_measures_from_lock_point() {
        let params = EscapementParams {
            tooth_count: 1,
            lock_face_angle_deg: -90.0,
            impulse_face_angle_deg: 0.0,
            center_diameter_mm: 2.0,
            lock_face_length_mm: 1.0,
            impulse_face_length_mm: 1.0,
        };
        let tooth = build_wheel(&params, 1.0, ImpulseReference::LockRadial).teeth[0];
        // Lock point at (1, 1): the impulse face must point along its radial.
        let face = (tooth.impulse() - tooth.lock()).normalize();
        let radial = tooth.lock().normalize();
        assert!(close(face, radial), "face {face:?} radial {radial:?}");

        let legacy = build_wheel(&params, 1.0, ImpulseReference::Legacy).teeth[0];
        assert!(close(legacy.impulse() - legacy.lock(), Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn zero_teeth_gives_bare_hub() {
        let params = EscapementParams {
            tooth_count: 0,
            ..Default::default()
        };
        let wheel = build_wheel(&params, 1.0, ImpulseReference::Legacy);
        assert_eq!(wheel.shape_count(), 1);
    }

    #[test]
    fn nan_lengths_pass_through() {
        let params = EscapementParams {
            lock_face_length_mm: f32::NAN,
            ..Default::default()
        };
        let wheel = build_wheel(&params, 1.0, ImpulseReference::Legacy);
        assert_eq!(wheel.teeth.len(), 15);
        assert!(wheel.teeth[0].lock().x.is_nan() || wheel.teeth[0].lock().y.is_nan());
    }

    #[test]
    fn pallet_distance_divisor_halves_radius() {
        let params = PalletParams {
            angle_deg: 30.0,
            distance_mm: 10.0,
            diameter_mm: 2.0,
        };
        let full = pallet_center(&params, 1.0, 1.0);
        let half = pallet_center(&params, 1.0, 2.0);
        assert!(close(full * 0.5, half));
    }

    #[test]
    fn banking_pins_sit_outside_pallets() {
        let mechanism = MechanismParams::default();
        let fork = build_pallet_assembly(&mechanism, 1.0, 1.0);
        assert!(fork.banking_pins[0].center.x < fork.entry.center.x);
        assert!(fork.banking_pins[1].center.x > fork.exit.center.x);
    }

    #[test]
    fn link_only_for_rigid_fork() {
        let mut mechanism = MechanismParams::default();
        mechanism.rigid_fork = true;
        let fork = build_pallet_assembly(&mechanism, 1.0, 1.0);
        let link = fork.link.expect("rigid fork has a link");
        assert_eq!(link[0], Vec2::ZERO);
        assert_eq!(link[1], fork.entry.center);
        assert_eq!(link[2], fork.exit.center);

        mechanism.rigid_fork = false;
        assert!(build_pallet_assembly(&mechanism, 1.0, 1.0).link.is_none());
    }

    #[test]
    fn layout_scales_pivot_separation() {
        let mechanism = MechanismParams::default();
        let options = LayoutOptions {
            margin_factor: 1.5,
            viewport_width_px: 400.0,
            pallet_distance_divisor: 1.0,
        };
        let layout = build_layout(&mechanism, &options);
        let expected = mechanism.frame.pivot_separation_mm * layout.scale.px_per_mm;
        assert!((layout.pivot_separation_px - expected).abs() < 1e-4);
    }
}
