//! Escapement plugin: recompute-on-change wiring and the wheel drive.
//!
//! ## Pipeline (runs in order every `Update` frame)
//!
//! 1. [`request_recompute_on_change_system`]: emits a [`RecomputeRequest`]
//!    whenever the [`ParameterForm`] resource was mutated.
//! 2. [`recompute_system`]: drains requests, builds a fresh
//!    [`MechanismLayout`] and swaps it in for the live assembly.
//! 3. [`wheel_drive_system`]: keeps the escape wheel torqued.
//!
//! Rapier steps in `PostUpdate`, so the despawn/spawn pair issued by
//! `recompute_system` is always applied between two physics steps.

use crate::assembly::{replace_assembly, wheel_drive_system, AssemblyHandle};
use crate::config::EscapementConfig;
use crate::error::{validate_params, EscapementError};
use crate::geometry::{build_layout, MechanismLayout};
use crate::params::{MechanismParams, ParameterForm, ParameterSource};
use bevy::prelude::*;

pub struct EscapementPlugin;

impl Plugin for EscapementPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CurrentAssembly>()
            .add_message::<RecomputeRequest>()
            .add_systems(Startup, init_parameter_form)
            .add_systems(
                Update,
                (
                    request_recompute_on_change_system,
                    recompute_system,
                    wheel_drive_system,
                )
                    .chain(),
            );
    }
}

/// Ask for the assembly to be rebuilt from the current parameters.
///
/// With `force` unset, a request whose parameters produce the same layout as
/// the live assembly is ignored.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RecomputeRequest {
    pub force: bool,
}

/// The live assembly and the layout it was built from.
#[derive(Resource, Debug, Default)]
pub struct CurrentAssembly {
    pub handle: Option<AssemblyHandle>,
    pub layout: Option<MechanismLayout>,
    /// Why the most recent request was rejected, if it was.
    pub last_error: Option<EscapementError>,
    /// Number of rebuilds performed so far.
    pub rebuilds: u32,
}

/// Startup system: seed the input form from the configured initial values,
/// unless a form was inserted already, and attach the change logger.
pub fn init_parameter_form(
    mut commands: Commands,
    form: Option<ResMut<ParameterForm>>,
    config: Res<EscapementConfig>,
) {
    match form {
        Some(mut form) => form.on_change(Box::new(log_parameter_change)),
        None => {
            let mut form = ParameterForm::new(config.initial);
            form.on_change(Box::new(log_parameter_change));
            commands.insert_resource(form);
        }
    }
}

fn log_parameter_change(params: &MechanismParams) {
    debug!(
        "Parameters changed: {} teeth, centre {} mm, pivot {} mm",
        params.wheel.tooth_count,
        params.wheel.center_diameter_mm,
        params.frame.pivot_separation_mm
    );
}

/// Emit a [`RecomputeRequest`] whenever the form has been mutated.
///
/// Also fires on the first frame after the form is inserted, which builds the
/// initial assembly.
pub fn request_recompute_on_change_system(
    form: Option<Res<ParameterForm>>,
    mut requests: MessageWriter<RecomputeRequest>,
) {
    if form.is_some_and(|form| form.is_changed()) {
        requests.write(RecomputeRequest::default());
    }
}

/// Rebuild the assembly from the current form values.
///
/// - Multiple requests in one frame collapse into a single rebuild.
/// - With `strict_validation`, invalid parameters are logged and the previous
///   assembly stays in place.
/// - An unforced request that yields the live layout is skipped.
pub fn recompute_system(
    mut commands: Commands,
    mut requests: MessageReader<RecomputeRequest>,
    form: Option<Res<ParameterForm>>,
    config: Res<EscapementConfig>,
    mut current: ResMut<CurrentAssembly>,
) {
    let mut requested = false;
    let mut force = false;
    for request in requests.read() {
        requested = true;
        force |= request.force;
    }
    let Some(form) = form else {
        return;
    };
    if !requested {
        return;
    }

    let params = form.current_values();
    if config.strict_validation {
        if let Err(e) = validate_params(&params) {
            warn!("Rejected parameters: {e}; keeping previous assembly");
            current.last_error = Some(e);
            return;
        }
    }
    if current.last_error.is_some() {
        current.last_error = None;
    }

    let layout = build_layout(&params, &config.layout_options());
    if !force && current.handle.is_some() && current.layout.as_ref() == Some(&layout) {
        debug!("Parameters unchanged; keeping live assembly");
        return;
    }

    let old = current.handle.take();
    let handle = replace_assembly(&mut commands, old, &layout, &config);
    info!(
        "Rebuilt escapement: {} teeth, {:.4} px/mm, {} entities",
        layout.wheel.teeth.len(),
        layout.scale.px_per_mm,
        handle.entities.len()
    );
    current.handle = Some(handle);
    current.layout = Some(layout);
    current.rebuilds += 1;
}
