//! Mouse dragging of the moving parts.
//!
//! Pressing the left button over the wheel, the fork or a loose pallet pins a
//! kinematic cursor body to the grabbed point with a revolute joint.  The
//! cursor body follows the mouse until the button is released, so the part is
//! pulled around against its own pivot and the banking pins.
//!
//! A grab never outlives the part it holds: a rebuild despawns the part, and
//! [`release_stale_drag_system`] then drops the cursor body.

use crate::assembly::MechanismPart;
use crate::config::EscapementConfig;
use crate::simulation::recompute_system;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_rapier2d::prelude::*;

pub struct DragPlugin;

impl Plugin for DragPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DragState>().add_systems(
            Update,
            (
                begin_drag_system,
                follow_cursor_system,
                end_drag_system,
                release_stale_drag_system,
                drag_gizmo_system,
            )
                .chain()
                .after(recompute_system),
        );
    }
}

/// Kinematic body that follows the mouse while a part is held.
#[derive(Component, Debug)]
pub struct DragCursor;

/// One active grab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grab {
    /// The part being dragged.
    pub target: Entity,
    /// The [`DragCursor`] body jointed to it.
    pub cursor_body: Entity,
    /// Grab point in the target's local frame.
    pub local_anchor: Vec2,
}

#[derive(Resource, Debug, Default)]
pub struct DragState {
    pub grab: Option<Grab>,
}

type CameraQuery<'w, 's> =
    Query<'w, 's, &'static Transform, (With<Camera2d>, Without<DragCursor>)>;

// ── Coordinate helpers ────────────────────────────────────────────────────────

/// Convert a window cursor position (origin top-left, y down) to world space
/// for a 2-D camera centred at `camera`.
pub fn cursor_to_world(cursor: Vec2, window_size: Vec2, camera: Vec2) -> Vec2 {
    let world_x = cursor.x - window_size.x / 2.0;
    let world_y = -(cursor.y - window_size.y / 2.0);
    Vec2::new(world_x, world_y) + camera
}

/// Express a world point in a body's local frame.
pub fn local_point(transform: &Transform, world: Vec2) -> Vec2 {
    let offset = (world - transform.translation.truncate()).extend(0.0);
    (transform.rotation.inverse() * offset).truncate()
}

/// Inverse of [`local_point`].
pub fn world_point(transform: &Transform, local: Vec2) -> Vec2 {
    transform.translation.truncate() + (transform.rotation * local.extend(0.0)).truncate()
}

fn cursor_world(
    windows: &Query<&Window, With<PrimaryWindow>>,
    cameras: &CameraQuery,
) -> Option<(Vec2, Vec2)> {
    let window = windows.single().ok()?;
    let cursor = window.cursor_position()?;
    let camera = cameras
        .iter()
        .next()
        .map(|t| t.translation.truncate())
        .unwrap_or(Vec2::ZERO);
    Some((cursor, cursor_to_world(cursor, window.size(), camera)))
}

fn release(commands: &mut Commands, drag: &mut DragState) {
    if let Some(grab) = drag.grab.take() {
        commands.entity(grab.cursor_body).despawn();
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// On left press inside the viewport, grab the movable part under the cursor.
#[allow(clippy::too_many_arguments)]
pub fn begin_drag_system(
    mut commands: Commands,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: CameraQuery,
    parts: Query<(&MechanismPart, &Transform), Without<DragCursor>>,
    rapier_context: ReadRapierContext,
    config: Res<EscapementConfig>,
    mut drag: ResMut<DragState>,
) {
    if !buttons.just_pressed(MouseButton::Left) || drag.grab.is_some() {
        return;
    }
    let Some((cursor, point)) = cursor_world(&windows, &cameras) else {
        return;
    };
    // Clicks on the parameter panel are not grabs.
    if cursor.x > config.viewport_width {
        return;
    }
    let Ok(rapier) = rapier_context.single() else {
        return;
    };

    let mut hit = None;
    rapier.intersect_point(point, QueryFilter::only_dynamic(), |entity| {
        let movable = parts
            .get(entity)
            .is_ok_and(|(part, _)| part.is_movable());
        if movable {
            hit = Some(entity);
        }
        !movable
    });
    let Some(target) = hit else {
        return;
    };
    let Ok((_, transform)) = parts.get(target) else {
        return;
    };

    let local_anchor = local_point(transform, point);
    let cursor_body = commands
        .spawn((
            DragCursor,
            RigidBody::KinematicPositionBased,
            Transform::from_translation(point.extend(0.0)),
            GlobalTransform::default(),
            ImpulseJoint::new(
                target,
                RevoluteJointBuilder::new().local_anchor1(local_anchor),
            ),
        ))
        .id();
    drag.grab = Some(Grab {
        target,
        cursor_body,
        local_anchor,
    });
    debug!("Grabbed {target:?} at {point:?}");
}

/// Move the cursor body to the mouse while the button is held.
pub fn follow_cursor_system(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: CameraQuery,
    drag: Res<DragState>,
    mut cursors: Query<&mut Transform, With<DragCursor>>,
) {
    let Some(grab) = drag.grab else {
        return;
    };
    if !buttons.pressed(MouseButton::Left) {
        return;
    }
    let Some((_, point)) = cursor_world(&windows, &cameras) else {
        return;
    };
    if let Ok(mut transform) = cursors.get_mut(grab.cursor_body) {
        transform.translation = point.extend(0.0);
    }
}

/// Let go on button release.
pub fn end_drag_system(
    mut commands: Commands,
    buttons: Res<ButtonInput<MouseButton>>,
    mut drag: ResMut<DragState>,
) {
    if buttons.just_released(MouseButton::Left) && drag.grab.is_some() {
        release(&mut commands, &mut drag);
    }
}

/// Drop the grab once its target is gone, e.g. after a rebuild.
pub fn release_stale_drag_system(
    mut commands: Commands,
    mut drag: ResMut<DragState>,
    parts: Query<(), With<MechanismPart>>,
) {
    let Some(grab) = drag.grab else {
        return;
    };
    if parts.contains(grab.target) {
        return;
    }
    debug!("Dragged part {:?} despawned; releasing", grab.target);
    release(&mut commands, &mut drag);
}

/// Draw the drag line from the grab point to the cursor.
pub fn drag_gizmo_system(
    mut gizmos: Gizmos,
    drag: Res<DragState>,
    transforms: Query<&Transform>,
) {
    let Some(grab) = drag.grab else {
        return;
    };
    let (Ok(target), Ok(cursor)) = (
        transforms.get(grab.target),
        transforms.get(grab.cursor_body),
    ) else {
        return;
    };
    let color = Color::srgb(0.35, 0.85, 1.0);
    let anchor = world_point(target, grab.local_anchor);
    gizmos.line_2d(anchor, cursor.translation.truncate(), color);
    gizmos.circle_2d(anchor, 3.0, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_centre_maps_to_camera() {
        let size = Vec2::new(700.0, 600.0);
        let camera = Vec2::new(150.0, 0.0);
        let p = cursor_to_world(Vec2::new(350.0, 300.0), size, camera);
        assert_eq!(p, camera);
    }

    #[test]
    fn viewport_centre_maps_to_world_origin() {
        // 400 px viewport left of a 300 px panel, camera shifted by half the panel.
        let p = cursor_to_world(
            Vec2::new(200.0, 300.0),
            Vec2::new(700.0, 600.0),
            Vec2::new(150.0, 0.0),
        );
        assert!(p.length() < 1e-5, "got {p:?}");
    }

    #[test]
    fn cursor_y_points_down() {
        let p = cursor_to_world(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0), Vec2::ZERO);
        assert_eq!(p, Vec2::new(-50.0, 50.0));
    }

    #[test]
    fn local_anchor_follows_body_rotation() {
        let transform = Transform::from_xyz(10.0, -5.0, 0.0)
            .with_rotation(Quat::from_rotation_z(0.7));
        let world = Vec2::new(14.0, 3.0);
        let local = local_point(&transform, world);
        let back = world_point(&transform, local);
        assert!((back - world).length() < 1e-4, "{back:?} != {world:?}");
    }

    #[test]
    fn only_physics_parts_are_movable() {
        assert!(MechanismPart::EscapeWheel.is_movable());
        assert!(MechanismPart::Fork.is_movable());
        assert!(MechanismPart::Pallet.is_movable());
        assert!(!MechanismPart::BankingPin.is_movable());
        assert!(!MechanismPart::Anchor.is_movable());
    }
}
