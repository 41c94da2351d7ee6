//! Rapier integration: spawning and replacing the live escapement assembly.
//!
//! A [`MechanismLayout`] is pure geometry in the mechanism frame.  This module
//! maps it onto the Bevy world (`world = (x, −y)`, wheel arbor at
//! [`EscapementConfig::wheel_center_y`], fork pivot above it) and builds:
//!
//! | Entity            | Body    | Colliders                      | Joint                  |
//! |-------------------|---------|--------------------------------|------------------------|
//! | wheel arbor       | Fixed   | —                              | —                      |
//! | escape wheel      | Dynamic | compound: hub ball + teeth     | revolute to arbor      |
//! | fork pivot        | Fixed   | —                              | —                      |
//! | fork (rigid)      | Dynamic | compound: both pallet balls    | revolute to pivot      |
//! | pallet ×2 (loose) | Dynamic | one ball each                  | revolute to pivot      |
//! | banking pin ×2    | Fixed   | one ball each                  | —                      |
//!
//! Every entity belongs to exactly one [`AssemblyHandle`].  Joints live on the
//! dynamic bodies, so despawning the handle's entities removes everything.

use crate::config::EscapementConfig;
use crate::error::EscapementError;
use crate::geometry::{MechanismLayout, PalletShape};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

// ── Components ────────────────────────────────────────────────────────────────

/// Which part of the mechanism an entity is.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MechanismPart {
    Anchor,
    EscapeWheel,
    Fork,
    Pallet,
    BankingPin,
}

impl MechanismPart {
    /// Parts that move under physics and can be dragged with the mouse.
    pub fn is_movable(self) -> bool {
        matches!(
            self,
            MechanismPart::EscapeWheel | MechanismPart::Fork | MechanismPart::Pallet
        )
    }
}

/// Marker for the driven escape wheel body.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EscapeWheel;

/// One drawable shape in body-local world orientation.
#[derive(Debug, Clone, PartialEq)]
pub enum PartShape {
    Circle { center: Vec2, radius: f32 },
    Polygon(Vec<Vec2>),
}

/// Shapes of a body, for rendering.  Mirrors the body's colliders.
#[derive(Component, Debug, Clone, Default)]
pub struct PartShapes(pub Vec<PartShape>);

// ── Handle ────────────────────────────────────────────────────────────────────

/// The entities owned by one live assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyHandle {
    /// Every entity spawned for this assembly, anchors included.
    pub entities: Vec<Entity>,
    /// The driven wheel, if it had at least one valid shape.
    pub wheel: Option<Entity>,
}

// ── Frame mapping ─────────────────────────────────────────────────────────────

/// Map a mechanism-frame point (y towards the wheel's first tooth / towards
/// the wheel from the pivot) onto the y-up Bevy world.
pub fn to_world(p: Vec2) -> Vec2 {
    Vec2::new(p.x, -p.y)
}

fn ball(radius: f32) -> Option<Collider> {
    (radius.is_finite() && radius > 0.0).then(|| Collider::ball(radius))
}

fn convex(vertices: &[Vec2]) -> Option<Collider> {
    if vertices.iter().all(|v| v.is_finite()) {
        Collider::convex_hull(vertices)
    } else {
        None
    }
}

fn report_degenerate(what: &'static str) {
    warn!("{}; shape skipped", EscapementError::DegenerateShape { what });
}

fn material(config: &EscapementConfig) -> (Friction, Restitution) {
    (
        Friction::coefficient(config.friction),
        Restitution::coefficient(config.restitution),
    )
}

fn moving_body(config: &EscapementConfig) -> (RigidBody, Damping, Velocity, Sleeping) {
    (
        RigidBody::Dynamic,
        Damping {
            linear_damping: config.linear_damping,
            angular_damping: config.angular_damping,
        },
        Velocity::zero(),
        Sleeping::disabled(),
    )
}

fn spawn_anchor(commands: &mut Commands, at: Vec2) -> Entity {
    commands
        .spawn((
            MechanismPart::Anchor,
            RigidBody::Fixed,
            Transform::from_translation(at.extend(0.0)),
            GlobalTransform::default(),
        ))
        .id()
}

// ── Spawning ──────────────────────────────────────────────────────────────────

fn spawn_wheel(
    commands: &mut Commands,
    layout: &MechanismLayout,
    config: &EscapementConfig,
    arbor: Entity,
    at: Vec2,
) -> Option<Entity> {
    let mut colliders: Vec<(Vect, Rot, Collider)> = Vec::with_capacity(layout.wheel.shape_count());
    let mut shapes = Vec::with_capacity(layout.wheel.shape_count());

    match ball(layout.wheel.hub_radius) {
        Some(hub) => {
            colliders.push((Vec2::ZERO, 0.0, hub));
            shapes.push(PartShape::Circle {
                center: Vec2::ZERO,
                radius: layout.wheel.hub_radius,
            });
        }
        None => report_degenerate("escape wheel hub"),
    }

    for tooth in &layout.wheel.teeth {
        let local = tooth.local_vertices().map(to_world);
        match convex(&local) {
            Some(collider) => {
                colliders.push((to_world(tooth.centroid), 0.0, collider));
                shapes.push(PartShape::Polygon(tooth.vertices.map(to_world).to_vec()));
            }
            None => report_degenerate("escape wheel tooth"),
        }
    }

    if colliders.is_empty() {
        report_degenerate("escape wheel");
        return None;
    }

    let entity = commands
        .spawn((
            (
                MechanismPart::EscapeWheel,
                EscapeWheel,
                PartShapes(shapes),
                Transform::from_translation(at.extend(0.1)),
                GlobalTransform::default(),
                moving_body(config),
                ExternalForce::default(),
            ),
            (
                Collider::compound(colliders),
                ColliderMassProperties::Mass(config.wheel_mass),
                material(config),
                ImpulseJoint::new(arbor, RevoluteJointBuilder::new()),
            ),
        ))
        .id();
    Some(entity)
}

/// Spawn both pallets on one rigid body pinned at the pivot.
fn spawn_rigid_fork(
    commands: &mut Commands,
    entry: &PalletShape,
    exit: &PalletShape,
    config: &EscapementConfig,
    pivot_anchor: Entity,
    pivot: Vec2,
) -> Option<Entity> {
    let mut colliders = Vec::with_capacity(2);
    let mut shapes = Vec::with_capacity(2);
    for pallet in [entry, exit] {
        let center = to_world(pallet.center);
        match ball(pallet.radius) {
            Some(collider) if center.is_finite() => {
                colliders.push((center, 0.0, collider));
                shapes.push(PartShape::Circle {
                    center,
                    radius: pallet.radius,
                });
            }
            _ => report_degenerate("pallet"),
        }
    }
    if colliders.is_empty() {
        return None;
    }

    let mass = config.pallet_mass * colliders.len() as f32;
    let entity = commands
        .spawn((
            (
                MechanismPart::Fork,
                PartShapes(shapes),
                Transform::from_translation(pivot.extend(0.1)),
                GlobalTransform::default(),
                moving_body(config),
            ),
            (
                Collider::compound(colliders),
                ColliderMassProperties::Mass(mass),
                material(config),
                ImpulseJoint::new(pivot_anchor, RevoluteJointBuilder::new()),
            ),
        ))
        .id();
    Some(entity)
}

/// Spawn a free pallet held at its distance from the pivot by a pin joint.
fn spawn_loose_pallet(
    commands: &mut Commands,
    pallet: &PalletShape,
    config: &EscapementConfig,
    pivot_anchor: Entity,
    pivot: Vec2,
) -> Option<Entity> {
    let offset = to_world(pallet.center);
    let Some(collider) = ball(pallet.radius).filter(|_| offset.is_finite()) else {
        report_degenerate("pallet");
        return None;
    };

    let joint = RevoluteJointBuilder::new().local_anchor2(-offset);
    let entity = commands
        .spawn((
            (
                MechanismPart::Pallet,
                PartShapes(vec![PartShape::Circle {
                    center: Vec2::ZERO,
                    radius: pallet.radius,
                }]),
                Transform::from_translation((pivot + offset).extend(0.1)),
                GlobalTransform::default(),
                moving_body(config),
            ),
            (
                collider,
                ColliderMassProperties::Mass(config.pallet_mass),
                material(config),
                ImpulseJoint::new(pivot_anchor, joint),
            ),
        ))
        .id();
    Some(entity)
}

fn spawn_banking_pin(
    commands: &mut Commands,
    pin: &PalletShape,
    config: &EscapementConfig,
    pivot: Vec2,
) -> Option<Entity> {
    let offset = to_world(pin.center);
    let Some(collider) = ball(pin.radius).filter(|_| offset.is_finite()) else {
        report_degenerate("banking pin");
        return None;
    };
    let entity = commands
        .spawn((
            MechanismPart::BankingPin,
            PartShapes(vec![PartShape::Circle {
                center: Vec2::ZERO,
                radius: pin.radius,
            }]),
            Transform::from_translation((pivot + offset).extend(0.05)),
            GlobalTransform::default(),
            RigidBody::Fixed,
            collider,
            material(config),
        ))
        .id();
    Some(entity)
}

/// Instantiate a layout as rigid bodies, colliders and pin joints.
///
/// Shapes that cannot become colliders (non-finite or non-positive sizes,
/// collinear teeth) are skipped with a warning; this never panics.
pub fn spawn_assembly(
    commands: &mut Commands,
    layout: &MechanismLayout,
    config: &EscapementConfig,
) -> AssemblyHandle {
    let wheel_center = Vec2::new(0.0, config.wheel_center_y());
    // The pivot is `pivot_separation` towards −y in the mechanism frame.
    let pivot = wheel_center + to_world(Vec2::new(0.0, -layout.pivot_separation_px));

    let mut entities = Vec::new();

    let arbor = spawn_anchor(commands, wheel_center);
    entities.push(arbor);
    let wheel = spawn_wheel(commands, layout, config, arbor, wheel_center);
    entities.extend(wheel);

    if pivot.is_finite() {
        let pivot_anchor = spawn_anchor(commands, pivot);
        entities.push(pivot_anchor);

        let fork = &layout.pallets;
        if fork.link.is_some() {
            entities.extend(spawn_rigid_fork(
                commands,
                &fork.entry,
                &fork.exit,
                config,
                pivot_anchor,
                pivot,
            ));
        } else {
            for pallet in [&fork.entry, &fork.exit] {
                entities.extend(spawn_loose_pallet(
                    commands,
                    pallet,
                    config,
                    pivot_anchor,
                    pivot,
                ));
            }
        }

        for pin in &fork.banking_pins {
            entities.extend(spawn_banking_pin(commands, pin, config, pivot));
        }
    } else {
        report_degenerate("pallet fork pivot");
    }

    AssemblyHandle { entities, wheel }
}

/// Despawn every entity of an assembly.
pub fn despawn_assembly(commands: &mut Commands, handle: &AssemblyHandle) {
    for &entity in &handle.entities {
        commands.entity(entity).despawn();
    }
}

/// Remove `old` (if any) from the world and spawn `layout` in its place.
///
/// Both halves are queued on the same `Commands`, so they are applied together
/// before the next physics step.
pub fn replace_assembly(
    commands: &mut Commands,
    old: Option<AssemblyHandle>,
    layout: &MechanismLayout,
    config: &EscapementConfig,
) -> AssemblyHandle {
    if let Some(old) = old {
        despawn_assembly(commands, &old);
    }
    spawn_assembly(commands, layout, config)
}

// ── Drive ─────────────────────────────────────────────────────────────────────

/// Keep the escape wheel turning clockwise, like a mainspring would.
///
/// Applies `drive_torque` while the clockwise angular speed is below
/// `drive_threshold` and no torque otherwise.
pub fn wheel_drive_system(
    mut query: Query<(&Velocity, &mut ExternalForce), With<EscapeWheel>>,
    config: Res<EscapementConfig>,
) {
    for (velocity, mut force) in query.iter_mut() {
        // Clockwise is negative in the y-up world.
        force.torque = if -velocity.angvel < config.drive_threshold {
            -config.drive_torque
        } else {
            0.0
        };
    }
}
