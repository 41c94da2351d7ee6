//! Parameter panel: the input form docked to the right of the viewport.
//!
//! Every numeric field gets a `[-] value [+]` stepper row and every boolean
//! field an `[ON | OFF]` toggle row.  Holding Shift makes a stepper move ten
//! increments.  Clicking a value opens it for typing: Enter commits, Escape
//! cancels, and text that does not parse as a number commits NaN.  Controls
//! only write to the
//! [`ParameterForm`] resource; the recompute pipeline in
//! [`crate::simulation`] picks the change up from there.
//!
//! ## System Responsibilities
//!
//! | System                      | Schedule | Purpose                               |
//! |-----------------------------|----------|---------------------------------------|
//! | `setup_parameter_panel`     | Startup  | Spawn the panel from the form values  |
//! | `step_button_system`        | Update   | Apply `[-]` / `[+]` presses           |
//! | `toggle_button_system`      | Update   | Flip boolean fields                   |
//! | `field_entry_click_system`  | Update   | Open a value for typing               |
//! | `field_entry_keyboard_system` | Update | Edit, commit or cancel typed values   |
//! | `panel_keyboard_system`     | Update   | `R` forced rebuild, `O` outlines      |
//! | `sync_panel_values_system`  | Update   | Refresh value texts and toggle states |
//! | `panel_readout_system`      | Update   | Scale readout and rebuild status      |

use crate::config::EscapementConfig;
use crate::constants::{SCALE_SIG_FIGS, VALUE_SIG_FIGS};
use crate::format::sig_figs;
use crate::params::{ParamField, ParamToggle, ParameterForm};
use crate::rendering::RenderSettings;
use crate::simulation::{init_parameter_form, CurrentAssembly, RecomputeRequest};
use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;

pub struct PanelPlugin;

impl Plugin for PanelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FieldEditor>()
            .add_systems(Startup, setup_parameter_panel.after(init_parameter_form))
            .add_systems(
                Update,
                (
                    (
                        step_button_system,
                        toggle_button_system,
                        field_entry_click_system,
                    ),
                    (field_entry_keyboard_system, panel_keyboard_system).chain(),
                    sync_panel_values_system,
                    panel_readout_system,
                )
                    .chain(),
            );
    }
}

// ── Component markers ─────────────────────────────────────────────────────────

/// Marker for the panel root node.
#[derive(Component)]
pub struct ParameterPanel;

/// A stepper button: moves `field` by `steps` increments when pressed.
#[derive(Component, Clone, Copy, Debug)]
pub struct StepButton {
    pub field: ParamField,
    pub steps: f32,
}

/// Text node showing the current value of a numeric field.
#[derive(Component, Clone, Copy, Debug)]
pub struct FieldValueText(pub ParamField);

/// Multiplier applied to a stepper press while Shift is held.
pub const SHIFT_STEP_MULTIPLIER: f32 = 10.0;

/// The value currently being typed, if any.
#[derive(Resource, Debug, Default)]
pub struct FieldEditor {
    pub field: Option<ParamField>,
    pub buffer: String,
}

impl FieldEditor {
    pub fn begin(&mut self, field: ParamField) {
        self.field = Some(field);
        self.buffer.clear();
    }

    pub fn is_active(&self) -> bool {
        self.field.is_some()
    }

    /// Feed one key press.  Returns the field and parsed value on Enter.
    pub fn apply_key(&mut self, key: &Key) -> Option<(ParamField, f32)> {
        self.field?;
        match key {
            Key::Character(text) => {
                self.buffer.extend(
                    text.chars()
                        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | 'e' | 'E')),
                );
                None
            }
            Key::Backspace => {
                self.buffer.pop();
                None
            }
            Key::Escape => {
                self.field = None;
                self.buffer.clear();
                None
            }
            Key::Enter => {
                let field = self.field.take()?;
                let value = parse_field_entry(&self.buffer);
                self.buffer.clear();
                Some((field, value))
            }
            _ => None,
        }
    }
}

/// Parse typed text; anything that is not a number (including empty text)
/// becomes NaN.
pub fn parse_field_entry(text: &str) -> f32 {
    text.trim().parse::<f32>().unwrap_or(f32::NAN)
}

/// Text nodes at the bottom of the panel.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub enum PanelReadout {
    Scale,
    Status,
}

// ── Colour helpers ────────────────────────────────────────────────────────────

fn on_bg() -> Color {
    Color::srgb(0.08, 0.44, 0.12)
}
fn off_bg() -> Color {
    Color::srgb(0.35, 0.07, 0.07)
}
fn on_text() -> Color {
    Color::srgb(0.75, 1.0, 0.80)
}
fn off_text() -> Color {
    Color::srgb(0.65, 0.65, 0.65)
}
fn step_bg() -> Color {
    Color::srgb(0.12, 0.12, 0.18)
}
fn label_color() -> Color {
    Color::srgb(0.85, 0.85, 0.88)
}
fn title_color() -> Color {
    Color::srgb(0.95, 0.88, 0.45)
}
fn error_color() -> Color {
    Color::srgb(1.0, 0.45, 0.45)
}
fn hint_color() -> Color {
    Color::srgb(0.42, 0.42, 0.52)
}

fn format_value(field: ParamField, value: f32) -> String {
    match field {
        ParamField::ToothCount => format!("{}", value as i32),
        _ => sig_figs(value as f64, VALUE_SIG_FIGS),
    }
}

// ── Startup: panel ────────────────────────────────────────────────────────────

/// Spawn the parameter panel along the right edge of the window.
pub fn setup_parameter_panel(
    mut commands: Commands,
    form: Res<ParameterForm>,
    config: Res<EscapementConfig>,
) {
    let font_size = config.panel_font_size;
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(0.0),
                top: Val::Px(0.0),
                width: Val::Px(config.panel_width),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                padding: UiRect::all(Val::Px(10.0)),
                row_gap: Val::Px(4.0),
                border: UiRect::left(Val::Px(1.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.05, 0.05, 0.08, 0.95)),
            BorderColor::all(Color::srgb(0.32, 0.32, 0.44)),
            ParameterPanel,
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new("Escapement"),
                TextFont {
                    font_size: font_size + 3.0,
                    ..default()
                },
                TextColor(title_color()),
            ));
            separator(panel);

            for field in ParamField::ALL {
                spawn_stepper_row(panel, field, form.field(field), font_size);
            }
            separator(panel);

            for toggle in ParamToggle::ALL {
                spawn_toggle_row(panel, toggle, form.flag(toggle), font_size);
            }
            separator(panel);

            for readout in [PanelReadout::Scale, PanelReadout::Status] {
                panel.spawn((
                    Text::new(""),
                    TextFont {
                        font_size,
                        ..default()
                    },
                    TextColor(label_color()),
                    readout,
                ));
            }

            panel.spawn((
                Text::new("R: rebuild   O: outlines   Shift: x10   click value: type"),
                TextFont {
                    font_size: font_size - 2.0,
                    ..default()
                },
                TextColor(hint_color()),
            ));
        });
}

fn separator(parent: &mut ChildSpawnerCommands<'_>) {
    parent.spawn((
        Text::new("──────────────────────────────"),
        TextFont {
            font_size: 9.0,
            ..default()
        },
        TextColor(Color::srgb(0.28, 0.28, 0.38)),
    ));
}

fn spawn_step_button(
    parent: &mut ChildSpawnerCommands<'_>,
    field: ParamField,
    steps: f32,
    font_size: f32,
) {
    parent
        .spawn((
            Button,
            Node {
                width: Val::Px(22.0),
                height: Val::Px(18.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border: UiRect::all(Val::Px(1.0)),
                ..default()
            },
            BackgroundColor(step_bg()),
            BorderColor::all(Color::srgb(0.30, 0.30, 0.46)),
            StepButton { field, steps },
        ))
        .with_children(|btn| {
            btn.spawn((
                Text::new(if steps < 0.0 { "-" } else { "+" }),
                TextFont {
                    font_size,
                    ..default()
                },
                TextColor(label_color()),
            ));
        });
}

/// Spawn one stepper row: `Label  [-] value [+]`.
fn spawn_stepper_row(
    parent: &mut ChildSpawnerCommands<'_>,
    field: ParamField,
    value: f32,
    font_size: f32,
) {
    parent
        .spawn(Node {
            flex_direction: FlexDirection::Row,
            column_gap: Val::Px(6.0),
            align_items: AlignItems::Center,
            ..default()
        })
        .with_children(|row| {
            row.spawn((
                Node {
                    flex_grow: 1.0,
                    ..default()
                },
                Text::new(field.label()),
                TextFont {
                    font_size,
                    ..default()
                },
                TextColor(label_color()),
            ));

            spawn_step_button(row, field, -1.0, font_size);
            row.spawn((
                Node {
                    width: Val::Px(52.0),
                    justify_content: JustifyContent::Center,
                    ..default()
                },
                Button,
                Text::new(format_value(field, value)),
                TextFont {
                    font_size,
                    ..default()
                },
                TextColor(on_text()),
                FieldValueText(field),
            ));
            spawn_step_button(row, field, 1.0, font_size);
        });
}

/// Spawn one toggle row: `[ON | OFF]  Label text`.
fn spawn_toggle_row(
    parent: &mut ChildSpawnerCommands<'_>,
    toggle: ParamToggle,
    initial: bool,
    font_size: f32,
) {
    parent
        .spawn(Node {
            flex_direction: FlexDirection::Row,
            column_gap: Val::Px(7.0),
            align_items: AlignItems::Center,
            ..default()
        })
        .with_children(|row| {
            row.spawn((
                Button,
                Node {
                    width: Val::Px(40.0),
                    height: Val::Px(19.0),
                    justify_content: JustifyContent::Center,
                    align_items: AlignItems::Center,
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(if initial { on_bg() } else { off_bg() }),
                BorderColor::all(Color::srgb(0.5, 0.5, 0.5)),
                toggle,
            ))
            .with_children(|btn| {
                btn.spawn((
                    Text::new(if initial { "ON" } else { "OFF" }),
                    TextFont {
                        font_size: font_size - 3.0,
                        ..default()
                    },
                    TextColor(if initial { on_text() } else { off_text() }),
                ));
            });

            row.spawn((
                Text::new(toggle.label()),
                TextFont {
                    font_size,
                    ..default()
                },
                TextColor(label_color()),
            ));
        });
}

// ── Update: controls ──────────────────────────────────────────────────────────

/// Apply stepper button presses to the form; Shift multiplies the step.
pub fn step_button_system(
    mut form: ResMut<ParameterForm>,
    keys: Res<ButtonInput<KeyCode>>,
    query: Query<(&Interaction, &StepButton), (Changed<Interaction>, With<Button>)>,
) {
    let multiplier = if keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]) {
        SHIFT_STEP_MULTIPLIER
    } else {
        1.0
    };
    for (interaction, step) in query.iter() {
        if *interaction == Interaction::Pressed {
            form.step_field(step.field, step.steps * multiplier);
        }
    }
}

/// Open a value for typing when it is clicked.
pub fn field_entry_click_system(
    mut editor: ResMut<FieldEditor>,
    query: Query<(&Interaction, &FieldValueText), (Changed<Interaction>, With<Button>)>,
) {
    for (interaction, &FieldValueText(field)) in query.iter() {
        if *interaction == Interaction::Pressed {
            editor.begin(field);
        }
    }
}

/// Route key presses into the open value and commit it on Enter.
pub fn field_entry_keyboard_system(
    mut keys: MessageReader<KeyboardInput>,
    mut editor: ResMut<FieldEditor>,
    mut form: ResMut<ParameterForm>,
) {
    if !editor.is_active() {
        keys.clear();
        return;
    }
    for input in keys.read() {
        if !input.state.is_pressed() {
            continue;
        }
        if let Some((field, value)) = editor.apply_key(&input.logical_key) {
            form.set_field(field, value);
        }
    }
}

/// Flip a boolean field when its toggle button is pressed.
pub fn toggle_button_system(
    mut form: ResMut<ParameterForm>,
    query: Query<(&Interaction, &ParamToggle), (Changed<Interaction>, With<Button>)>,
) {
    for (interaction, &toggle) in query.iter() {
        if *interaction == Interaction::Pressed {
            form.toggle(toggle);
        }
    }
}

/// `R` forces a rebuild (resetting all motion); `O` toggles outlines.
/// Both are ignored while a value is being typed.
pub fn panel_keyboard_system(
    keys: Res<ButtonInput<KeyCode>>,
    editor: Res<FieldEditor>,
    mut requests: MessageWriter<RecomputeRequest>,
    mut settings: ResMut<RenderSettings>,
) {
    if editor.is_active() {
        return;
    }
    if keys.just_pressed(KeyCode::KeyR) {
        requests.write(RecomputeRequest { force: true });
    }
    if keys.just_pressed(KeyCode::KeyO) {
        settings.show_outlines = !settings.show_outlines;
    }
}

// ── Update: display ───────────────────────────────────────────────────────────

/// Refresh value texts and toggle visuals after the form changes.
#[allow(clippy::type_complexity)]
pub fn sync_panel_values_system(
    form: Res<ParameterForm>,
    editor: Res<FieldEditor>,
    mut values: Query<(&FieldValueText, &mut Text)>,
    mut toggles: Query<(&ParamToggle, &Children, &mut BackgroundColor), With<Button>>,
    mut toggle_text: Query<(&mut Text, &mut TextColor), Without<FieldValueText>>,
) {
    if !form.is_changed() && !editor.is_changed() {
        return;
    }
    for (&FieldValueText(field), mut text) in values.iter_mut() {
        *text = if editor.field == Some(field) {
            Text::new(format!("{}_", editor.buffer))
        } else {
            Text::new(format_value(field, form.field(field)))
        };
    }
    for (&toggle, children, mut bg) in toggles.iter_mut() {
        let active = form.flag(toggle);
        *bg = BackgroundColor(if active { on_bg() } else { off_bg() });
        for child in children.iter() {
            if let Ok((mut text, mut color)) = toggle_text.get_mut(child) {
                *text = Text::new(if active { "ON" } else { "OFF" });
                *color = TextColor(if active { on_text() } else { off_text() });
            }
        }
    }
}

/// Show the current view scale and the outcome of the last recompute.
pub fn panel_readout_system(
    current: Res<CurrentAssembly>,
    mut query: Query<(&PanelReadout, &mut Text, &mut TextColor)>,
) {
    if !current.is_changed() {
        return;
    }
    for (readout, mut text, mut color) in query.iter_mut() {
        match readout {
            PanelReadout::Scale => {
                if let Some(layout) = &current.layout {
                    *text = Text::new(format!(
                        "px/mm {}   mm/px {}",
                        sig_figs(layout.scale.px_per_mm as f64, SCALE_SIG_FIGS),
                        sig_figs(layout.scale.mm_per_px as f64, SCALE_SIG_FIGS)
                    ));
                }
            }
            PanelReadout::Status => match &current.last_error {
                Some(err) => {
                    *text = Text::new(err.to_string());
                    *color = TextColor(error_color());
                }
                None => {
                    *text = Text::new(format!("Rebuilds: {}", current.rebuilds));
                    *color = TextColor(hint_color());
                }
            },
        }
    }
}
