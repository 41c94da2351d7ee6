use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResolution};
use bevy_rapier2d::prelude::*;

use escapement::config::{self, EscapementConfig};
use escapement::constants::{PANEL_WIDTH, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use escapement::{drag, graphics, panel, rendering, simulation};

/// Configure Rapier from the loaded config: no gravity, fixed timestep and
/// the optional collider debug overlay.
fn setup_physics_config(
    mut rapier: Query<&mut RapierConfiguration>,
    mut timestep: ResMut<TimestepMode>,
    mut debug_render: ResMut<DebugRenderContext>,
    config: Res<EscapementConfig>,
) {
    for mut cfg in rapier.iter_mut() {
        cfg.gravity = Vec2::ZERO;
    }
    *timestep = TimestepMode::Fixed {
        dt: config.physics_dt,
        substeps: config.physics_substeps,
    };
    debug_render.enabled = config.physics_debug_render;
}

/// Resize the window if the config overrides the viewport or panel size.
fn fit_window_to_config(
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
    config: Res<EscapementConfig>,
) {
    for mut window in windows.iter_mut() {
        window
            .resolution
            .set(config.viewport_width + config.panel_width, config.viewport_height);
    }
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Escapement".into(),
            resolution: WindowResolution::new(
                (VIEWPORT_WIDTH + PANEL_WIDTH) as u32,
                VIEWPORT_HEIGHT as u32,
            ),
            ..Default::default()
        }),
        ..Default::default()
    }))
    .insert_resource(ClearColor(Color::srgb(0.02, 0.02, 0.04)))
    // Insert EscapementConfig with compiled defaults; load_escapement_config
    // overwrites it from assets/escapement.toml (if present) before Startup.
    .insert_resource(EscapementConfig::default())
    // Geometry is generated in pixels; keep physics units identical.
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::pixels_per_meter(1.0))
    .add_plugins(RapierDebugRenderPlugin::default())
    .add_plugins(simulation::EscapementPlugin)
    .add_plugins(panel::PanelPlugin)
    .add_plugins(drag::DragPlugin)
    .add_systems(PreStartup, config::load_escapement_config)
    .add_systems(
        Startup,
        (
            setup_physics_config,
            fit_window_to_config,
            graphics::setup_camera,
            rendering::init_render_settings,
        ),
    )
    .add_systems(
        Update,
        (
            rendering::attach_part_meshes_system,
            rendering::gizmo_rendering_system,
        ),
    );

    app.run();
}
