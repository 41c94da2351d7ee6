//! Property tests for the pure geometry generator.
//!
//! No Bevy app is built here; every function under test is a plain function
//! of its inputs.
//!
//! Covered scenarios:
//! 1. Tooth count and angular spacing for several `N`.
//! 2. The 15-tooth reference wheel: 16 shapes, start radius 21.5, 24° pitch.
//! 3. Determinism of repeated builds.
//! 4. Pallet placement at 0°, 90° and −45°.
//! 5. Scale derivation for the default wheel.

use bevy::prelude::*;
use escapement::geometry::{
    build_layout, build_pallet, build_wheel, derive_scale, rotate, LayoutOptions,
};
use escapement::params::{EscapementParams, ImpulseReference, MechanismParams, PalletParams};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn reference_wheel() -> EscapementParams {
    EscapementParams {
        tooth_count: 15,
        lock_face_angle_deg: -45.0,
        impulse_face_angle_deg: 45.0,
        center_diameter_mm: 43.0,
        lock_face_length_mm: 5.0,
        impulse_face_length_mm: 5.0,
    }
}

fn assert_close(a: Vec2, b: Vec2, what: &str) {
    assert!((a - b).length() < 1e-3, "{what}: {a:?} != {b:?}");
}

// ── Wheel ─────────────────────────────────────────────────────────────────────

/// `N` teeth plus one hub; tooth `i` is tooth 0 rotated by `i × 360/N`.
#[test]
fn teeth_are_evenly_spaced_for_any_count() {
    for n in [1, 2, 7, 15, 30] {
        let params = EscapementParams {
            tooth_count: n,
            ..reference_wheel()
        };
        let wheel = build_wheel(&params, 2.0, ImpulseReference::Legacy);
        assert_eq!(wheel.teeth.len(), n as usize);
        assert_eq!(wheel.shape_count(), n as usize + 1);

        let first = wheel.teeth[0];
        let pitch = (360.0 / n as f32).to_radians();
        for (i, tooth) in wheel.teeth.iter().enumerate() {
            for (v, v0) in tooth.vertices.iter().zip(first.vertices) {
                assert_close(*v, rotate(v0, i as f32 * pitch), "tooth vertex");
            }
        }
    }
}

#[test]
fn reference_wheel_matches_worked_example() {
    let wheel = build_wheel(&reference_wheel(), 1.0, ImpulseReference::Legacy);
    assert_eq!(wheel.shape_count(), 16);
    assert!((wheel.hub_radius - 21.5).abs() < 1e-4);

    for (i, tooth) in wheel.teeth.iter().enumerate() {
        assert!(
            (tooth.start().length() - 21.5).abs() < 1e-3,
            "tooth {i} start at {}",
            tooth.start().length()
        );
        let expected = rotate(wheel.teeth[0].start(), (i as f32 * 24.0).to_radians());
        assert_close(tooth.start(), expected, "start point");
    }
}

#[test]
fn wheel_build_is_deterministic() {
    let a = build_wheel(&reference_wheel(), 5.291, ImpulseReference::Legacy);
    let b = build_wheel(&reference_wheel(), 5.291, ImpulseReference::Legacy);
    assert_eq!(a, b);

    let layout_a = build_layout(&MechanismParams::default(), &default_options());
    let layout_b = build_layout(&MechanismParams::default(), &default_options());
    assert_eq!(layout_a, layout_b);
}

#[test]
fn negative_tooth_count_uses_magnitude() {
    let params = EscapementParams {
        tooth_count: -12,
        ..reference_wheel()
    };
    let wheel = build_wheel(&params, 1.0, ImpulseReference::Legacy);
    assert_eq!(wheel.teeth.len(), 12);
}

// ── Pallets ───────────────────────────────────────────────────────────────────

#[test]
fn pallet_straight_ahead_has_zero_x() {
    let pallet = build_pallet(
        &PalletParams {
            angle_deg: 0.0,
            distance_mm: 16.0,
            diameter_mm: 3.0,
        },
        1.0,
        1.0,
    );
    assert!(pallet.center.x.abs() < 1e-5);
    assert!((pallet.center.y - 16.0).abs() < 1e-4);
    assert!((pallet.radius - 1.5).abs() < 1e-6);
}

#[test]
fn pallet_at_right_angle_has_zero_y() {
    let pallet = build_pallet(
        &PalletParams {
            angle_deg: 90.0,
            distance_mm: 16.0,
            diameter_mm: 3.0,
        },
        1.0,
        1.0,
    );
    assert!(pallet.center.y.abs() < 1e-4);
    assert!((pallet.center.x - 16.0).abs() < 1e-4);
}

#[test]
fn entry_pallet_worked_example() {
    let pallet = build_pallet(
        &PalletParams {
            angle_deg: -45.0,
            distance_mm: 16.0,
            diameter_mm: 3.0,
        },
        1.0,
        1.0,
    );
    assert!((pallet.center.x - (-11.3137)).abs() < 1e-3, "{pallet:?}");
    assert!((pallet.center.y - 11.3137).abs() < 1e-3, "{pallet:?}");
}

// ── Scale ─────────────────────────────────────────────────────────────────────

fn default_options() -> LayoutOptions {
    LayoutOptions {
        margin_factor: 1.2,
        viewport_width_px: 400.0,
        pallet_distance_divisor: 1.0,
    }
}

#[test]
fn scale_fits_wheel_into_viewport() {
    let scale = derive_scale(&reference_wheel(), 1.2, 400.0);
    assert!((scale.mm_per_px - 0.189).abs() < 1e-5);
    assert!((scale.px_per_mm - 5.2910).abs() < 1e-3);
}

/// The outermost tooth tip must fit inside the viewport at the derived scale.
#[test]
fn scaled_wheel_fits_viewport_width() {
    let layout = build_layout(&MechanismParams::default(), &default_options());
    let half_width = default_options().viewport_width_px / 2.0;
    for tooth in &layout.wheel.teeth {
        for v in tooth.vertices {
            assert!(v.length() <= half_width, "vertex {v:?} outside viewport");
        }
    }
}
