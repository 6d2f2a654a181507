//! Immediate-mode UI helpers for the Macroquad rendering backend.
//!
//! This module hosts all uses of `macroquad::ui` so the rest of the adapter can
//! remain agnostic of Macroquad's UI types.

use cpu_defender_rendering::HudLabel;
use macroquad::{
    color::{Color, WHITE},
    math::{RectOffset, Vec2},
    ui::{hash, Ui},
};

/// Outcome of rendering the control panel UI for a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ControlPanelUiResult {
    /// Whether the adaptive mode button was pressed.
    pub toggle_adaptive: bool,
    /// Whether the repair button was pressed.
    pub repair: bool,
    /// Whether the help button was pressed.
    pub help: bool,
}

/// Snapshot of the control panel's layout and data for the current frame.
#[derive(Clone, Debug)]
pub(crate) struct ControlPanelUiContext {
    /// Top-left corner of the panel in screen coordinates.
    pub origin: Vec2,
    /// Panel dimensions in screen space.
    pub size: Vec2,
    /// Background colour applied to the window skin.
    pub background: Color,
    /// Current score, shown above the repair button.
    pub score: u32,
    /// Rounds loaded and the magazine capacity.
    pub ammo: (u32, u32),
    /// Whether adaptive mode is switched on.
    pub adaptive: bool,
    /// Adaptive status line, absent in manual mode.
    pub hud: Option<HudLabel>,
}

/// Renders the CPU Defender control panel and reports which buttons were pressed.
pub(crate) fn draw_control_panel_ui(
    ui: &mut Ui,
    context: ControlPanelUiContext,
) -> ControlPanelUiResult {
    let mut skin = ui.default_skin();
    skin.margin = 0.0;

    let window_style = ui
        .style_builder()
        .color(context.background)
        .color_hovered(context.background)
        .color_clicked(context.background)
        .color_selected(context.background)
        .color_selected_hovered(context.background)
        .color_inactive(context.background)
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .margin(RectOffset::new(16.0, 16.0, 16.0, 16.0))
        .build();
    skin.window_style = window_style;

    let label_style = ui
        .style_builder()
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .margin(RectOffset::new(0.0, 0.0, 4.0, 4.0))
        .build();
    skin.label_style = label_style;

    let button_style = ui
        .style_builder()
        .text_color(WHITE)
        .text_color_hovered(WHITE)
        .text_color_clicked(WHITE)
        .color(Color::from_rgba(0, 85, 85, 255))
        .color_hovered(Color::from_rgba(0, 120, 120, 255))
        .color_clicked(Color::from_rgba(0, 60, 60, 255))
        .color_selected(Color::from_rgba(0, 85, 85, 255))
        .color_selected_hovered(Color::from_rgba(0, 120, 120, 255))
        .color_inactive(Color::from_rgba(40, 40, 40, 200))
        .margin(RectOffset::new(0.0, 0.0, 8.0, 8.0))
        .build();
    skin.button_style = button_style;

    ui.push_skin(&skin);

    let mut result = ControlPanelUiResult::default();
    let _ = ui.window(hash!("control_panel"), context.origin, context.size, |ui| {
        ui.label(None, &format!("Score: {}", context.score));
        ui.label(
            None,
            &format!("Ammo: {} / {}", context.ammo.0, context.ammo.1),
        );
        let status = context.hud.as_ref().map_or("AI: OFF", |hud| hud.text);
        ui.label(None, status);

        let toggle_label = if context.adaptive {
            "AI Mode: ON"
        } else {
            "AI Mode: OFF"
        };
        result.toggle_adaptive = ui.button(None, toggle_label);
        result.repair = ui.button(None, "Repair CPU (500)");
        result.help = ui.button(None, "Help");
        ui.label(None, "Press M, R or H for the same actions.");
    });

    ui.pop_skin();
    result
}
