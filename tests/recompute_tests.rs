//! Headless tests for the recompute pipeline in [`EscapementPlugin`].
//!
//! These tests use [`MinimalPlugins`] (no window, no rendering, no Rapier
//! pipeline), so only the ECS side of the assembly is exercised: which
//! entities exist, which components they carry, and when they are replaced.
//!
//! Covered scenarios:
//! 1. The first frame builds one wheel, one fork and two banking pins.
//! 2. Frames without parameter changes do not respawn anything.
//! 3. A field change replaces every entity of the previous assembly.
//! 4. Toggling the rigid fork off yields two loose pallets.
//! 5. Strict validation rejects NaN and keeps the live assembly.
//! 6. Lenient mode lets NaN through without panicking.
//! 7. A forced request rebuilds identical parameters without drift.
//! 8. A mouse grab is released when its part is rebuilt.
//! 9. The form carries the change logger after startup.

use bevy::prelude::*;
use escapement::assembly::{MechanismPart, PartShape, PartShapes};
use escapement::config::EscapementConfig;
use escapement::drag::{release_stale_drag_system, DragCursor, DragState, Grab};
use escapement::params::{ParamField, ParamToggle, ParameterForm};
use escapement::simulation::{
    recompute_system, CurrentAssembly, EscapementPlugin, RecomputeRequest,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn app_with_config(config: EscapementConfig) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(config);
    app.add_plugins(EscapementPlugin);
    app
}

/// Build the app and run the frame that spawns the initial assembly.
fn started_app() -> App {
    let mut app = app_with_config(EscapementConfig::default());
    app.update();
    app
}

fn count_parts(app: &mut App, part: MechanismPart) -> usize {
    let mut query = app.world_mut().query::<&MechanismPart>();
    query.iter(app.world()).filter(|&&p| p == part).count()
}

fn wheel_shape_count(app: &mut App) -> usize {
    let mut query = app.world_mut().query::<(&MechanismPart, &PartShapes)>();
    query
        .iter(app.world())
        .find(|(part, _)| **part == MechanismPart::EscapeWheel)
        .map(|(_, shapes)| shapes.0.len())
        .unwrap_or(0)
}

/// Shapes and pose of the live escape wheel.
fn wheel_snapshot(app: &mut App) -> (Vec<PartShape>, Transform) {
    let mut query = app
        .world_mut()
        .query::<(&MechanismPart, &PartShapes, &Transform)>();
    query
        .iter(app.world())
        .find(|(part, _, _)| **part == MechanismPart::EscapeWheel)
        .map(|(_, shapes, transform)| (shapes.0.clone(), *transform))
        .expect("wheel spawned")
}

fn wheel_entity(app: &App) -> Entity {
    app.world()
        .resource::<CurrentAssembly>()
        .handle
        .as_ref()
        .and_then(|handle| handle.wheel)
        .expect("wheel spawned")
}

/// Headless app with the drag bookkeeping, but no mouse or physics input.
fn started_app_with_drag() -> App {
    let mut app = app_with_config(EscapementConfig::default());
    app.init_resource::<DragState>();
    app.add_systems(Update, release_stale_drag_system.after(recompute_system));
    app.update();
    app
}

/// Pretend the user grabbed the wheel: a cursor body plus the grab record.
fn grab_wheel(app: &mut App) -> Grab {
    let target = wheel_entity(app);
    let cursor_body = app
        .world_mut()
        .spawn((DragCursor, Transform::default()))
        .id();
    let grab = Grab {
        target,
        cursor_body,
        local_anchor: Vec2::new(0.0, 50.0),
    };
    app.world_mut().resource_mut::<DragState>().grab = Some(grab);
    grab
}

fn live_entities(app: &App) -> Vec<Entity> {
    app.world()
        .resource::<CurrentAssembly>()
        .handle
        .as_ref()
        .expect("assembly spawned")
        .entities
        .clone()
}

fn rebuilds(app: &App) -> u32 {
    app.world().resource::<CurrentAssembly>().rebuilds
}

fn form(app: &mut App) -> Mut<'_, ParameterForm> {
    app.world_mut().resource_mut::<ParameterForm>()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn first_frame_builds_assembly() {
    let mut app = started_app();

    assert_eq!(rebuilds(&app), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::EscapeWheel), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::Fork), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::Pallet), 0);
    assert_eq!(count_parts(&mut app, MechanismPart::BankingPin), 2);
    assert_eq!(count_parts(&mut app, MechanismPart::Anchor), 2);
    // 15 teeth plus the hub.
    assert_eq!(wheel_shape_count(&mut app), 16);
}

#[test]
fn unchanged_parameters_do_not_respawn() {
    let mut app = started_app();
    let before = live_entities(&app);

    for _ in 0..5 {
        app.update();
    }

    assert_eq!(rebuilds(&app), 1);
    assert_eq!(live_entities(&app), before);
}

/// Re-setting a field to its current value is not a change.
#[test]
fn setting_same_value_is_not_a_change() {
    let mut app = started_app();
    let teeth = form(&mut app).field(ParamField::ToothCount);

    let changed = form(&mut app).set_field(ParamField::ToothCount, teeth);
    app.update();

    assert!(!changed);
    assert_eq!(rebuilds(&app), 1);
}

#[test]
fn field_change_replaces_whole_assembly() {
    let mut app = started_app();
    let old = live_entities(&app);

    form(&mut app).set_field(ParamField::ToothCount, 20.0);
    app.update();

    assert_eq!(rebuilds(&app), 2);
    for entity in &old {
        assert!(
            app.world().get_entity(*entity).is_err(),
            "old entity {entity:?} still alive"
        );
    }
    assert_eq!(count_parts(&mut app, MechanismPart::EscapeWheel), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::Fork), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::BankingPin), 2);
    assert_eq!(wheel_shape_count(&mut app), 21);
}

#[test]
fn repeated_changes_never_accumulate_parts() {
    let mut app = started_app();

    for step in 0..6 {
        form(&mut app).step_field(ParamField::Banking, if step % 2 == 0 { 1.0 } else { -1.0 });
        app.update();
    }

    assert_eq!(rebuilds(&app), 7);
    assert_eq!(count_parts(&mut app, MechanismPart::EscapeWheel), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::Fork), 1);
    assert_eq!(count_parts(&mut app, MechanismPart::BankingPin), 2);
    assert_eq!(count_parts(&mut app, MechanismPart::Anchor), 2);
}

#[test]
fn loose_fork_spawns_two_pallets() {
    let mut app = started_app();

    form(&mut app).toggle(ParamToggle::RigidFork);
    app.update();

    assert_eq!(count_parts(&mut app, MechanismPart::Fork), 0);
    assert_eq!(count_parts(&mut app, MechanismPart::Pallet), 2);
    assert_eq!(count_parts(&mut app, MechanismPart::BankingPin), 2);
}

#[test]
fn strict_mode_keeps_previous_assembly_on_nan() {
    let config = EscapementConfig {
        strict_validation: true,
        ..Default::default()
    };
    let mut app = app_with_config(config);
    app.update();
    let before = live_entities(&app);

    form(&mut app).set_field(ParamField::CenterDiameter, f32::NAN);
    app.update();

    let current = app.world().resource::<CurrentAssembly>();
    assert!(current.last_error.is_some(), "NaN must be rejected");
    assert_eq!(current.rebuilds, 1);
    assert_eq!(live_entities(&app), before);
    assert_eq!(count_parts(&mut app, MechanismPart::EscapeWheel), 1);
}

#[test]
fn strict_mode_clears_error_after_valid_change() {
    let config = EscapementConfig {
        strict_validation: true,
        ..Default::default()
    };
    let mut app = app_with_config(config);
    app.update();

    form(&mut app).set_field(ParamField::CenterDiameter, -4.0);
    app.update();
    assert!(app.world().resource::<CurrentAssembly>().last_error.is_some());

    form(&mut app).set_field(ParamField::CenterDiameter, 40.0);
    app.update();
    let current = app.world().resource::<CurrentAssembly>();
    assert!(current.last_error.is_none());
    assert_eq!(current.rebuilds, 2);
}

#[test]
fn lenient_mode_survives_nan() {
    let mut app = started_app();

    form(&mut app).set_field(ParamField::LockFaceLength, f32::NAN);
    app.update();
    app.update();

    // The scale is NaN, so nothing but the anchors can become a body.
    assert!(app.world().resource::<CurrentAssembly>().last_error.is_none());
    assert_eq!(count_parts(&mut app, MechanismPart::EscapeWheel), 0);
    assert_eq!(count_parts(&mut app, MechanismPart::BankingPin), 0);
}

#[test]
fn forced_request_rebuilds_identical_parameters() {
    let mut app = started_app();
    let before = live_entities(&app);
    let (shapes_before, transform_before) = wheel_snapshot(&mut app);

    app.world_mut().write_message(RecomputeRequest { force: true });
    app.update();

    assert_eq!(rebuilds(&app), 2);
    assert_ne!(live_entities(&app), before);
    let (shapes_after, transform_after) = wheel_snapshot(&mut app);
    assert_eq!(shapes_after, shapes_before, "wheel shapes drifted");
    assert_eq!(transform_after, transform_before, "wheel pose drifted");
}

#[test]
fn rebuild_releases_grabbed_part() {
    let mut app = started_app_with_drag();
    let grab = grab_wheel(&mut app);

    form(&mut app).set_field(ParamField::ToothCount, 12.0);
    app.update();
    app.update();

    assert!(app.world().resource::<DragState>().grab.is_none());
    assert!(
        app.world().get_entity(grab.cursor_body).is_err(),
        "cursor body must be despawned with the grab"
    );
    assert!(app.world().get_entity(grab.target).is_err());
}

#[test]
fn grab_survives_frames_without_rebuild() {
    let mut app = started_app_with_drag();
    let grab = grab_wheel(&mut app);

    for _ in 0..3 {
        app.update();
    }

    assert_eq!(app.world().resource::<DragState>().grab, Some(grab));
    assert!(app.world().get_entity(grab.cursor_body).is_ok());
}

#[test]
fn form_logs_changes_after_startup() {
    let app = started_app();
    assert_eq!(app.world().resource::<ParameterForm>().listener_count(), 1);
}

/// A form inserted before startup is used instead of the configured values.
#[test]
fn preinserted_form_is_kept() {
    let mut app = app_with_config(EscapementConfig::default());
    let mut custom = ParameterForm::default();
    custom.set_field(ParamField::ToothCount, 9.0);
    app.insert_resource(custom);
    app.update();

    assert_eq!(wheel_shape_count(&mut app), 10);
}
