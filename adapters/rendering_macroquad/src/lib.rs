#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for the CPU Defender cabinet.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! All uses of `macroquad::ui` live inside the local `ui` module so the rest of
//! the renderer only deals with shapes and text.

mod ui;

use self::ui::{draw_control_panel_ui, ControlPanelUiContext, ControlPanelUiResult};
use anyhow::Result;
use cpu_defender_core::EnemyKind;
use cpu_defender_rendering::{
    palette, Arrow, Color, DefenderView, FrameControl, FrameInput, GalleryView, PongView,
    Presentation, RenderingBackend, Scene, Screen, SnakeView, TUTORIAL,
};
use glam::Vec2;
use macroquad::input::{
    is_key_down, is_key_pressed, is_mouse_button_pressed, mouse_position, KeyCode, MouseButton,
};
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Width of the control panel docked to the right of the CPU Defender board.
const PANEL_WIDTH: f32 = 220.0;

/// Tracks UI-sourced interactions so they can be merged with physical input on the next frame.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlPanelInputState {
    toggle_adaptive_latched: bool,
    repair_latched: bool,
    help_latched: bool,
}

impl ControlPanelInputState {
    /// Returns whether the UI toggled adaptive mode and clears the latch.
    pub fn take_toggle_adaptive(&mut self) -> bool {
        std::mem::take(&mut self.toggle_adaptive_latched)
    }

    /// Records that the adaptive mode button was pressed this frame.
    pub fn register_toggle_adaptive(&mut self) {
        self.toggle_adaptive_latched = true;
    }

    /// Returns whether the UI requested a repair and clears the latch.
    pub fn take_repair(&mut self) -> bool {
        std::mem::take(&mut self.repair_latched)
    }

    /// Records that the repair button was pressed this frame.
    pub fn register_repair(&mut self) {
        self.repair_latched = true;
    }

    /// Returns whether the UI opened the help overlay and clears the latch.
    pub fn take_help(&mut self) -> bool {
        std::mem::take(&mut self.help_latched)
    }

    /// Records that the help button was pressed this frame.
    pub fn register_help(&mut self) {
        self.help_latched = true;
    }

    fn take_requests(&mut self) -> PanelRequests {
        PanelRequests {
            toggle_adaptive: self.take_toggle_adaptive(),
            repair: self.take_repair(),
            help: self.take_help(),
        }
    }
}

/// Panel buttons released during the previous frame.
#[derive(Clone, Copy, Debug, Default)]
struct PanelRequests {
    toggle_adaptive: bool,
    repair: bool,
    help: bool,
}

/// Snapshot of edge-triggered keyboard shortcuts observed during a single frame.
#[derive(Clone, Copy, Debug, Default)]
struct KeyboardShortcuts {
    /// `Q` closes the cabinet.
    quit_requested: bool,
    /// `Escape` backs out of overlays and games.
    back: bool,
    /// `Enter` launches the selected card or restarts a finished run.
    confirm: bool,
    /// `H` toggles the tutorial.
    help: bool,
    /// `R` buys a repair.
    repair: bool,
    /// `M` toggles adaptive mode.
    toggle_adaptive: bool,
    /// `Tab` flips the gallery category.
    switch_category: bool,
    arrow: Option<Arrow>,
}

impl KeyboardShortcuts {
    fn poll() -> Self {
        let arrow = [
            (KeyCode::Up, Arrow::Up),
            (KeyCode::Down, Arrow::Down),
            (KeyCode::Left, Arrow::Left),
            (KeyCode::Right, Arrow::Right),
        ]
        .into_iter()
        .find(|(key, _)| is_key_pressed(*key))
        .map(|(_, arrow)| arrow);

        Self {
            quit_requested: is_key_pressed(KeyCode::Q),
            back: is_key_pressed(KeyCode::Escape),
            confirm: is_key_pressed(KeyCode::Enter),
            help: is_key_pressed(KeyCode::H),
            repair: is_key_pressed(KeyCode::R),
            toggle_adaptive: is_key_pressed(KeyCode::M),
            switch_category: is_key_pressed(KeyCode::Tab),
            arrow,
        }
    }
}

fn held_movement() -> Vec2 {
    let axis = |negative: KeyCode, positive: KeyCode| {
        f32::from(u8::from(is_key_down(positive))) - f32::from(u8::from(is_key_down(negative)))
    };
    Vec2::new(axis(KeyCode::A, KeyCode::D), axis(KeyCode::W, KeyCode::S))
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct FrameBreakdown {
    frame: Duration,
    update: Duration,
    render: Duration,
}

/// Tracks the average frames-per-second produced by the render loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    frame_times: VecDeque<Duration>,
    window_duration: Duration,
    update_accum: Duration,
    render_accum: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct FpsMetrics {
    per_second: f32,
    trailing_ten_seconds: f32,
    avg_update: Duration,
    avg_render: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns the per-second and trailing ten-second averages once
    /// one second has elapsed.
    fn record_frame(&mut self, breakdown: FrameBreakdown) -> Option<FpsMetrics> {
        self.elapsed += breakdown.frame;
        self.frames = self.frames.saturating_add(1);
        self.update_accum += breakdown.update;
        self.render_accum += breakdown.render;

        self.frame_times.push_back(breakdown.frame);
        self.window_duration += breakdown.frame;
        let trailing_window = Duration::from_secs(10);
        while self.window_duration > trailing_window {
            let Some(removed) = self.frame_times.pop_front() else {
                break;
            };
            self.window_duration = self.window_duration.saturating_sub(removed);
        }

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let frames = self.frames.max(1);
        let per_second = self.frames as f32 / seconds;
        let window_seconds = self.window_duration.as_secs_f32();
        let trailing_ten_seconds = if window_seconds <= f32::EPSILON {
            per_second
        } else {
            self.frame_times.len() as f32 / window_seconds
        };
        let metrics = FpsMetrics {
            per_second,
            trailing_ten_seconds,
            avg_update: self.update_accum / frames,
            avg_render: self.render_accum / frames,
        };

        self.elapsed = Duration::ZERO;
        self.frames = 0;
        self.update_accum = Duration::ZERO;
        self.render_accum = Duration::ZERO;
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 960,
            window_height: 600,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();
            let mut control_panel_input = ControlPanelInputState::default();

            loop {
                let keyboard = KeyboardShortcuts::poll();
                if keyboard.quit_requested {
                    break;
                }

                let screen_width = macroquad::window::screen_width();
                let screen_height = macroquad::window::screen_height();
                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));

                let metrics_before = SceneMetrics::from_scene(&scene, screen_width, screen_height);
                let (cursor_x, cursor_y) = mouse_position();
                let frame_input = gather_frame_input_from_observations(
                    &metrics_before,
                    Vec2::new(cursor_x, cursor_y),
                    is_mouse_button_pressed(MouseButton::Left),
                    held_movement(),
                    keyboard,
                    control_panel_input.take_requests(),
                );

                let update_start = Instant::now();
                let control = update_scene(frame_dt, frame_input, &mut scene);
                let update_duration = update_start.elapsed();
                if control == FrameControl::Exit {
                    break;
                }

                let render_start = Instant::now();
                macroquad::window::clear_background(background);
                let metrics = SceneMetrics::from_scene(&scene, screen_width, screen_height);
                let time = macroquad::time::get_time() as f32;
                match &scene.screen {
                    Screen::Gallery(view) => draw_gallery(view, &metrics),
                    Screen::Snake(view) => draw_snake(view, &metrics),
                    Screen::Pong(view) => draw_pong(view, &metrics),
                    Screen::Defender(view) => {
                        draw_defender(view, &metrics, time);
                        let context = ControlPanelUiContext {
                            origin: macroquad::math::Vec2::new(screen_width - PANEL_WIDTH, 0.0),
                            size: macroquad::math::Vec2::new(PANEL_WIDTH, screen_height),
                            background: to_macroquad_color(palette::CABINET.lighten(0.05)),
                            score: view.score,
                            ammo: view.ammo,
                            adaptive: view.adaptive,
                            hud: view.hud.clone(),
                        };
                        let mut root_ui = macroquad::ui::root_ui();
                        let ControlPanelUiResult {
                            toggle_adaptive,
                            repair,
                            help,
                        } = draw_control_panel_ui(&mut root_ui, context);
                        if toggle_adaptive {
                            control_panel_input.register_toggle_adaptive();
                        }
                        if repair {
                            control_panel_input.register_repair();
                        }
                        if help {
                            control_panel_input.register_help();
                        }
                    }
                }
                if scene.tutorial_open {
                    draw_tutorial(&metrics);
                }
                let render_duration = render_start.elapsed();

                let metrics = fps_counter.record_frame(FrameBreakdown {
                    frame: frame_dt,
                    update: update_duration,
                    render: render_duration,
                });
                if let (true, Some(metrics)) = (show_fps, metrics) {
                    tracing::info!(
                        fps = format_args!("{:.2}", metrics.per_second),
                        trailing = format_args!("{:.2}", metrics.trailing_ten_seconds),
                        update_ms = metrics.avg_update.as_secs_f64() * 1_000.0,
                        render_ms = metrics.avg_render.as_secs_f64() * 1_000.0,
                        "frame timing"
                    );
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Mapping between playfield units and screen pixels for the active screen.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SceneMetrics {
    scale: f32,
    offset: Vec2,
    extent: Vec2,
}

impl SceneMetrics {
    fn from_scene(scene: &Scene, screen_width: f32, screen_height: f32) -> Self {
        let panel_width = match scene.screen {
            Screen::Defender(_) => PANEL_WIDTH.min(screen_width),
            _ => 0.0,
        };
        let available = Vec2::new((screen_width - panel_width).max(0.0), screen_height);
        let extent = scene.extent();
        let scale = if extent.x <= f32::EPSILON || extent.y <= f32::EPSILON {
            1.0
        } else {
            (available.x / extent.x).min(available.y / extent.y)
        };
        let offset = ((available - extent * scale) * 0.5).max(Vec2::ZERO);

        Self {
            scale,
            offset,
            extent,
        }
    }

    fn to_screen(&self, position: Vec2) -> Vec2 {
        self.offset + position * self.scale
    }

    fn to_playfield(&self, screen: Vec2) -> Option<Vec2> {
        if self.scale <= f32::EPSILON {
            return None;
        }
        let position = (screen - self.offset) / self.scale;
        let inside = position.x >= 0.0
            && position.y >= 0.0
            && position.x < self.extent.x
            && position.y < self.extent.y;
        inside.then_some(position)
    }
}

fn gather_frame_input_from_observations(
    metrics: &SceneMetrics,
    cursor_position: Vec2,
    clicked: bool,
    movement: Vec2,
    keyboard: KeyboardShortcuts,
    panel: PanelRequests,
) -> FrameInput {
    let cursor = metrics.to_playfield(cursor_position);
    FrameInput {
        cursor,
        movement,
        arrow: keyboard.arrow,
        fire: clicked && cursor.is_some(),
        confirm: keyboard.confirm,
        back: keyboard.back,
        help: keyboard.help || panel.help,
        repair: keyboard.repair || panel.repair,
        toggle_adaptive: keyboard.toggle_adaptive || panel.toggle_adaptive,
        switch_category: keyboard.switch_category,
    }
}

fn draw_label(text: &str, position: Vec2, font_size: f32, color: Color) {
    let _ = macroquad::text::draw_text(
        text,
        position.x,
        position.y,
        font_size,
        to_macroquad_color(color),
    );
}

fn draw_label_centered(text: &str, center: Vec2, font_size: f32, color: Color) {
    let dimensions = macroquad::text::measure_text(text, None, font_size as u16, 1.0);
    draw_label(
        text,
        Vec2::new(center.x - dimensions.width * 0.5, center.y),
        font_size,
        color,
    );
}

fn draw_rect(metrics: &SceneMetrics, top_left: Vec2, size: Vec2, color: Color) {
    let origin = metrics.to_screen(top_left);
    let size = size * metrics.scale;
    macroquad::shapes::draw_rectangle(
        origin.x,
        origin.y,
        size.x,
        size.y,
        to_macroquad_color(color),
    );
}

fn draw_rect_outline(metrics: &SceneMetrics, top_left: Vec2, size: Vec2, color: Color) {
    let origin = metrics.to_screen(top_left);
    let size = size * metrics.scale;
    macroquad::shapes::draw_rectangle_lines(
        origin.x,
        origin.y,
        size.x,
        size.y,
        2.0,
        to_macroquad_color(color),
    );
}

fn draw_disc(metrics: &SceneMetrics, center: Vec2, radius: f32, color: Color) {
    let center = metrics.to_screen(center);
    macroquad::shapes::draw_circle(
        center.x,
        center.y,
        radius * metrics.scale,
        to_macroquad_color(color),
    );
}

fn draw_ring(metrics: &SceneMetrics, center: Vec2, radius: f32, color: Color) {
    let center = metrics.to_screen(center);
    macroquad::shapes::draw_circle_lines(
        center.x,
        center.y,
        radius * metrics.scale,
        2.0,
        to_macroquad_color(color),
    );
}

fn draw_gallery(view: &GalleryView, metrics: &SceneMetrics) {
    let width = metrics.extent.x;
    let tab_width = width / view.categories.len().max(1) as f32;
    for (index, (label, active)) in view.categories.iter().enumerate() {
        let left = tab_width * index as f32;
        let color = if *active {
            palette::ACCENT
        } else {
            palette::MUTED
        };
        if *active {
            draw_rect(
                metrics,
                Vec2::new(left + 20.0, 60.0),
                Vec2::new(tab_width - 40.0, 3.0),
                color,
            );
        }
        draw_label_centered(
            label,
            metrics.to_screen(Vec2::new(left + tab_width * 0.5, 45.0)),
            28.0 * metrics.scale,
            color,
        );
    }

    let card_origin = Vec2::new(150.0, 110.0);
    let card_size = Vec2::new(400.0, 260.0);
    let (fill, text) = if view.card.locked {
        (palette::CABINET.lighten(0.08), palette::MUTED)
    } else {
        (palette::CABINET.lighten(0.15), palette::TEXT)
    };
    draw_rect(metrics, card_origin, card_size, fill);
    draw_rect_outline(metrics, card_origin, card_size, text);

    let center_x = card_origin.x + card_size.x * 0.5;
    draw_label_centered(
        &view.card.title,
        metrics.to_screen(Vec2::new(center_x, 220.0)),
        40.0 * metrics.scale,
        text,
    );
    draw_label_centered(
        &view.card.blurb,
        metrics.to_screen(Vec2::new(center_x, 270.0)),
        20.0 * metrics.scale,
        palette::MUTED,
    );
    if view.card.locked {
        draw_label_centered(
            "LOCKED",
            metrics.to_screen(Vec2::new(center_x, 330.0)),
            24.0 * metrics.scale,
            palette::HEALTH_LOST,
        );
    }

    draw_label_centered(
        "<",
        metrics.to_screen(Vec2::new(100.0, 255.0)),
        48.0 * metrics.scale,
        palette::TEXT,
    );
    draw_label_centered(
        ">",
        metrics.to_screen(Vec2::new(600.0, 255.0)),
        48.0 * metrics.scale,
        palette::TEXT,
    );
    draw_label_centered(
        &format!("{} / {}", view.index + 1, view.count),
        metrics.to_screen(Vec2::new(center_x, 410.0)),
        20.0 * metrics.scale,
        palette::MUTED,
    );
    draw_label_centered(
        "ARROWS: browse   TAB: category   ENTER: play   Q: quit",
        metrics.to_screen(Vec2::new(center_x, 470.0)),
        18.0 * metrics.scale,
        palette::MUTED,
    );
    if let Some(message) = &view.message {
        draw_label_centered(
            message,
            metrics.to_screen(Vec2::new(center_x, 440.0)),
            20.0 * metrics.scale,
            palette::HEALTH_LOST,
        );
    }
}

fn draw_snake(view: &SnakeView, metrics: &SceneMetrics) {
    let cell = Vec2::splat(view.cell);
    draw_rect_outline(metrics, Vec2::ZERO, metrics.extent, palette::MUTED);
    if let Some(food) = view.food {
        draw_rect(metrics, food.as_vec2() * view.cell, cell, palette::HIGHLIGHT);
    }
    for segment in &view.segments {
        draw_rect(
            metrics,
            segment.as_vec2() * view.cell + Vec2::splat(1.0),
            cell - Vec2::splat(2.0),
            palette::ACCENT,
        );
    }
    draw_label(
        &format!("SCORE: {}", view.score),
        metrics.to_screen(Vec2::new(10.0, 24.0)),
        24.0 * metrics.scale,
        palette::TEXT,
    );
    if view.crashed {
        draw_game_over(metrics, "GAME OVER", view.score);
    }
}

fn draw_pong(view: &PongView, metrics: &SceneMetrics) {
    let center_x = view.court.x * 0.5;
    let mut y = 0.0;
    while y < view.court.y {
        draw_rect(
            metrics,
            Vec2::new(center_x - 1.0, y),
            Vec2::new(2.0, 12.0),
            palette::MUTED,
        );
        y += 24.0;
    }
    draw_rect(metrics, view.player, view.paddle, palette::ACCENT);
    draw_rect(metrics, view.cpu, view.paddle, palette::ACCENT);
    draw_disc(metrics, view.ball, 8.0, palette::HIGHLIGHT);
    draw_label_centered(
        &format!("{}   {}", view.points.0, view.points.1),
        metrics.to_screen(Vec2::new(center_x, 40.0)),
        36.0 * metrics.scale,
        palette::TEXT,
    );
}

fn enemy_color(kind: EnemyKind) -> Color {
    match kind {
        EnemyKind::Drone => palette::DRONE,
        EnemyKind::Armed => palette::ARMED,
        EnemyKind::Explosive => palette::EXPLOSIVE,
    }
}

fn draw_defender(view: &DefenderView, metrics: &SceneMetrics, time: f32) {
    draw_rect(metrics, Vec2::ZERO, view.arena, palette::BOARD);
    let mut trace = 50.0;
    while trace < view.arena.x.max(view.arena.y) {
        if trace < view.arena.x {
            draw_rect(
                metrics,
                Vec2::new(trace, 0.0),
                Vec2::new(1.0, view.arena.y),
                palette::TRACE,
            );
        }
        if trace < view.arena.y {
            draw_rect(
                metrics,
                Vec2::new(0.0, trace),
                Vec2::new(view.arena.x, 1.0),
                palette::TRACE,
            );
        }
        trace += 50.0;
    }

    for crate_position in &view.crates {
        draw_rect(
            metrics,
            *crate_position - Vec2::splat(8.0),
            Vec2::splat(16.0),
            palette::CRATE,
        );
    }

    let pulse = 14.0 + 3.0 * (time * 6.0).sin();
    for mine in &view.mines {
        draw_disc(metrics, *mine, pulse, palette::MINE);
        draw_disc(metrics, *mine, 8.0, palette::TEXT);
    }

    draw_rect(
        metrics,
        view.base - Vec2::splat(30.0),
        Vec2::splat(60.0),
        palette::CPU_SHELL,
    );
    draw_rect(
        metrics,
        view.base - Vec2::splat(15.0),
        Vec2::splat(30.0),
        palette::CPU_CORE,
    );
    draw_rect_outline(
        metrics,
        view.base - Vec2::splat(30.0),
        Vec2::splat(60.0),
        palette::TEXT,
    );
    let bar_origin = view.base + Vec2::new(-40.0, -50.0);
    draw_rect(metrics, bar_origin, Vec2::new(80.0, 8.0), palette::HEALTH_LOST);
    draw_rect(
        metrics,
        bar_origin,
        Vec2::new(80.0 * view.health_fraction.clamp(0.0, 1.0), 8.0),
        palette::HEALTH,
    );

    for enemy in &view.enemies {
        draw_disc(metrics, enemy.position, enemy.radius, enemy_color(enemy.kind));
        draw_ring(metrics, enemy.position, enemy.radius, palette::TEXT);
    }
    for bullet in &view.bullets {
        draw_disc(metrics, *bullet, 4.0, palette::BULLET);
    }

    let muzzle = view.turret + Vec2::from_angle(view.heading) * 25.0;
    let start = metrics.to_screen(view.turret);
    let end = metrics.to_screen(muzzle);
    macroquad::shapes::draw_line(
        start.x,
        start.y,
        end.x,
        end.y,
        6.0 * metrics.scale,
        to_macroquad_color(palette::BARREL),
    );
    draw_disc(metrics, view.turret, 15.0, palette::TURRET);

    draw_label(
        &format!("SCORE: {}", view.score),
        metrics.to_screen(Vec2::new(10.0, 24.0)),
        24.0 * metrics.scale,
        palette::TEXT,
    );
    draw_label(
        &format!("AMMO: {}/{}", view.ammo.0, view.ammo.1),
        metrics.to_screen(Vec2::new(10.0, 48.0)),
        20.0 * metrics.scale,
        palette::BULLET,
    );
    if let Some(hud) = &view.hud {
        let dimensions = macroquad::text::measure_text(hud.text, None, 20, metrics.scale);
        let anchor = metrics.to_screen(Vec2::new(view.arena.x - 10.0, 24.0));
        draw_label(
            hud.text,
            Vec2::new(anchor.x - dimensions.width, anchor.y),
            20.0 * metrics.scale,
            hud.color,
        );
    }

    if let Some(announcement) = view.announcement {
        let center = view.arena * 0.5;
        draw_label_centered(
            announcement.title,
            metrics.to_screen(center - Vec2::new(0.0, 90.0)),
            48.0 * metrics.scale,
            palette::TEXT,
        );
        draw_label_centered(
            announcement.subtitle,
            metrics.to_screen(center - Vec2::new(0.0, 60.0)),
            26.0 * metrics.scale,
            palette::BULLET,
        );
    }

    if let Some(score) = view.game_over {
        draw_game_over(metrics, "SYSTEM FAILURE", score);
    }
}

fn draw_game_over(metrics: &SceneMetrics, headline: &str, score: u32) {
    draw_rect(
        metrics,
        Vec2::ZERO,
        metrics.extent,
        Color::new(0.0, 0.0, 0.0, 0.7),
    );
    let center = metrics.extent * 0.5;
    draw_label_centered(
        headline,
        metrics.to_screen(center - Vec2::new(0.0, 20.0)),
        48.0 * metrics.scale,
        palette::HEALTH_LOST,
    );
    draw_label_centered(
        &format!("FINAL SCORE: {score}"),
        metrics.to_screen(center + Vec2::new(0.0, 20.0)),
        28.0 * metrics.scale,
        palette::TEXT,
    );
    draw_label_centered(
        "ENTER: restart   ESC: back",
        metrics.to_screen(center + Vec2::new(0.0, 60.0)),
        20.0 * metrics.scale,
        palette::MUTED,
    );
}

fn draw_tutorial(metrics: &SceneMetrics) {
    draw_rect(
        metrics,
        Vec2::ZERO,
        metrics.extent,
        Color::new(0.0, 0.0, 0.0, 0.8),
    );
    let (heading, lines) = TUTORIAL;
    let card_origin = metrics.extent * 0.5 - Vec2::new(220.0, 170.0);
    let card_size = Vec2::new(440.0, 340.0);
    draw_rect(metrics, card_origin, card_size, palette::CABINET);
    draw_rect_outline(metrics, card_origin, card_size, palette::CPU_CORE);
    draw_label(
        "X",
        metrics.to_screen(card_origin + Vec2::new(card_size.x - 28.0, 30.0)),
        26.0 * metrics.scale,
        palette::TEXT,
    );
    draw_label_centered(
        heading,
        metrics.to_screen(card_origin + Vec2::new(card_size.x * 0.5, 50.0)),
        26.0 * metrics.scale,
        palette::CPU_CORE,
    );
    for (row, line) in lines.iter().enumerate() {
        draw_label(
            line,
            metrics.to_screen(card_origin + Vec2::new(30.0, 100.0 + 32.0 * row as f32)),
            20.0 * metrics.scale,
            palette::TEXT,
        );
    }
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
