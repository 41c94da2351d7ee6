use crate::config::EscapementConfig;
use bevy::prelude::*;

/// Setup camera for 2D rendering.
///
/// The window is the simulation viewport plus the parameter panel on its
/// right, so the camera is shifted right by half the panel width to keep the
/// world origin centred in the viewport.
pub fn setup_camera(mut commands: Commands, config: Res<EscapementConfig>) {
    commands.spawn((
        Camera2d,
        Transform::from_xyz(config.panel_width / 2.0, 0.0, 0.0),
    ));
    info!("[SETUP] Camera spawned");
}
