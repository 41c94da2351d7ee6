//! Rendering of the live assembly: Mesh2d fills and gizmo overlays.
//!
//! ## Layer Model
//!
//! | Layer            | Technology | Default | Controlled by                  |
//! |------------------|------------|---------|--------------------------------|
//! | Part fills       | `Mesh2d`   | ON      | —                              |
//! | Part outlines    | Gizmos     | OFF     | `RenderSettings::show_outlines`|
//! | Fork arms        | Gizmos     | ON      | —                              |
//! | Rapier debug     | Rapier     | OFF     | `physics_debug_render` config  |
//!
//! Fill meshes are attached once, as children of each body, when its
//! [`PartShapes`] component appears.  They move with the body through Bevy's
//! transform propagation and are despawned with it on every rebuild.

use crate::assembly::{MechanismPart, PartShape, PartShapes};
use crate::config::EscapementConfig;
use bevy::prelude::*;
use bevy_asset::RenderAssetUsages;
use bevy_mesh::{Indices, PrimitiveTopology};

/// Runtime rendering switches.
#[derive(Resource, Clone, Debug, Default)]
pub struct RenderSettings {
    /// Draw white outlines over every shape.
    pub show_outlines: bool,
}

impl RenderSettings {
    pub fn from_config(config: &EscapementConfig) -> Self {
        Self {
            show_outlines: config.show_outlines,
        }
    }
}

/// Startup system: seed [`RenderSettings`] from the loaded config.
pub fn init_render_settings(mut commands: Commands, config: Res<EscapementConfig>) {
    commands.insert_resource(RenderSettings::from_config(&config));
}

// ── Colour helpers ────────────────────────────────────────────────────────────

fn part_color(part: MechanismPart) -> Color {
    match part {
        MechanismPart::EscapeWheel => Color::srgb(0.80, 0.62, 0.25),
        MechanismPart::Fork | MechanismPart::Pallet => Color::srgb(0.55, 0.12, 0.18),
        MechanismPart::BankingPin => Color::srgb(0.45, 0.45, 0.50),
        MechanismPart::Anchor => Color::srgb(0.9, 0.9, 0.9),
    }
}

fn outline_color() -> Color {
    Color::srgba(1.0, 1.0, 1.0, 0.6)
}

fn fork_arm_color() -> Color {
    Color::srgb(0.75, 0.30, 0.35)
}

// ── Spawn-time mesh attachment ────────────────────────────────────────────────

/// Attach a filled `Mesh2d` child for every shape of a newly spawned part.
///
/// Uses [`Added<PartShapes>`] so only bodies spawned since the previous frame
/// are touched.
pub fn attach_part_meshes_system(
    mut commands: Commands,
    query: Query<(Entity, &PartShapes, &MechanismPart), Added<PartShapes>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    for (entity, shapes, &part) in query.iter() {
        let material = materials.add(ColorMaterial::from_color(part_color(part)));
        commands.entity(entity).with_children(|parent| {
            for shape in &shapes.0 {
                let (mesh, offset) = match shape {
                    PartShape::Circle { center, radius } => {
                        (meshes.add(Circle::new(*radius)), *center)
                    }
                    PartShape::Polygon(vertices) if vertices.len() >= 3 => {
                        (meshes.add(filled_polygon_mesh(vertices)), Vec2::ZERO)
                    }
                    PartShape::Polygon(_) => continue,
                };
                parent.spawn((
                    Mesh2d(mesh),
                    MeshMaterial2d(material.clone()),
                    Transform::from_translation(offset.extend(0.0)),
                ));
            }
        });
    }
}

// ── Gizmo overlays ────────────────────────────────────────────────────────────

/// Draw outlines (when enabled) and the arms of a rigid fork.
pub fn gizmo_rendering_system(
    mut gizmos: Gizmos,
    query: Query<(&Transform, &PartShapes, &MechanismPart)>,
    settings: Res<RenderSettings>,
) {
    for (transform, shapes, part) in query.iter() {
        let pos = transform.translation.truncate();
        let rot = transform.rotation;
        let to_world = |v: Vec2| pos + rot.mul_vec3(v.extend(0.0)).truncate();

        if *part == MechanismPart::Fork {
            for shape in &shapes.0 {
                if let PartShape::Circle { center, .. } = shape {
                    gizmos.line_2d(pos, to_world(*center), fork_arm_color());
                }
            }
        }

        if !settings.show_outlines {
            continue;
        }
        for shape in &shapes.0 {
            match shape {
                PartShape::Circle { center, radius } => {
                    gizmos.circle_2d(to_world(*center), *radius, outline_color());
                }
                PartShape::Polygon(vertices) => {
                    let n = vertices.len();
                    for i in 0..n {
                        let p1 = to_world(vertices[i]);
                        let p2 = to_world(vertices[(i + 1) % n]);
                        gizmos.line_2d(p1, p2, outline_color());
                    }
                }
            }
        }
    }
}

// ── Geometry helpers ──────────────────────────────────────────────────────────

/// Fan-triangulate a convex polygon into a renderable [`Mesh`].
///
/// Vertices may arrive in either winding (the mechanism-to-world flip reverses
/// it); they are emitted counter-clockwise.
pub fn filled_polygon_mesh(vertices: &[Vec2]) -> Mesh {
    let n = vertices.len();
    debug_assert!(n >= 3, "polygon must have ≥ 3 vertices");

    let mut ordered = vertices.to_vec();
    if signed_area(&ordered) < 0.0 {
        ordered.reverse();
    }

    let positions: Vec<[f32; 3]> = ordered.iter().map(|v| [v.x, v.y, 0.0]).collect();
    let normals: Vec<[f32; 3]> = vec![[0.0, 0.0, 1.0]; n];
    let uvs: Vec<[f32; 2]> = ordered
        .iter()
        .map(|v| [(v.x / 100.0) + 0.5, (v.y / 100.0) + 0.5])
        .collect();

    let mut indices: Vec<u32> = Vec::with_capacity((n - 2) * 3);
    for i in 1..(n as u32 - 1) {
        indices.extend_from_slice(&[0, i, i + 1]);
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Shoelace signed area; positive for counter-clockwise polygons.
fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].perp_dot(vertices[(i + 1) % n]))
        .sum::<f32>()
        / 2.0
}
