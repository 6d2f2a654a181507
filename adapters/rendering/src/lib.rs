#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for the CPU Defender cabinet adapters.
//!
//! Simulations never draw. Each host frame the session fills a [`Scene`]
//! describing what is on screen and a backend implementing
//! [`RenderingBackend`] turns it into pixels.

use std::time::Duration;

use anyhow::Result as AnyResult;
use cpu_defender_core::{AdaptiveStatus, Announcement, DifficultyLevel, EnemyKind};
use glam::{IVec2, Vec2};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Cabinet colors.
pub mod palette {
    use super::Color;

    /// Cabinet background.
    pub const CABINET: Color = Color::from_rgb_u8(17, 17, 17);
    /// CPU Defender circuit board.
    pub const BOARD: Color = Color::from_rgb_u8(26, 47, 26);
    /// Circuit traces across the board.
    pub const TRACE: Color = Color::from_rgb_u8(47, 79, 47);
    /// Outer shell of the processor.
    pub const CPU_SHELL: Color = Color::from_rgb_u8(0, 85, 85);
    /// Processor die.
    pub const CPU_CORE: Color = Color::from_rgb_u8(0, 255, 255);
    /// Turret barrel.
    pub const BARREL: Color = Color::from_rgb_u8(204, 163, 0);
    /// Turret body.
    pub const TURRET: Color = Color::from_rgb_u8(136, 136, 136);
    /// Rounds in flight.
    pub const BULLET: Color = Color::from_rgb_u8(255, 255, 0);
    /// Drone hull.
    pub const DRONE: Color = Color::from_rgb_u8(211, 47, 47);
    /// Armed unit hull.
    pub const ARMED: Color = Color::from_rgb_u8(255, 136, 0);
    /// Explosive unit hull.
    pub const EXPLOSIVE: Color = Color::from_rgb_u8(255, 0, 255);
    /// Mine halo.
    pub const MINE: Color = Color::new(1.0, 0.0, 1.0, 0.6);
    /// Ammunition crate.
    pub const CRATE: Color = Color::from_rgb_u8(139, 195, 74);
    /// Health bar fill.
    pub const HEALTH: Color = Color::from_rgb_u8(0, 255, 0);
    /// Health bar background.
    pub const HEALTH_LOST: Color = Color::from_rgb_u8(255, 0, 0);
    /// Minigame sprites.
    pub const ACCENT: Color = Color::from_rgb_u8(255, 165, 0);
    /// Minigame pickups and balls.
    pub const HIGHLIGHT: Color = Color::from_rgb_u8(0, 255, 0);
    /// Plain text.
    pub const TEXT: Color = Color::from_rgb_u8(255, 255, 255);
    /// Secondary text.
    pub const MUTED: Color = Color::from_rgb_u8(170, 170, 170);
}

/// Arrow keys, edge triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arrow {
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FrameInput {
    /// Cursor position in playfield units, when the cursor is over the playfield.
    pub cursor: Option<Vec2>,
    /// Held movement keys as a direction with components in `-1.0..=1.0`.
    pub movement: Vec2,
    /// Arrow pressed on this frame.
    pub arrow: Option<Arrow>,
    /// Primary button pressed on this frame.
    pub fire: bool,
    /// Confirmation key pressed on this frame.
    pub confirm: bool,
    /// Back key pressed on this frame.
    pub back: bool,
    /// Help key pressed on this frame.
    pub help: bool,
    /// Repair key pressed on this frame.
    pub repair: bool,
    /// Adaptive mode toggle pressed on this frame.
    pub toggle_adaptive: bool,
    /// Category switch pressed on this frame.
    pub switch_category: bool,
}

/// Whether the backend should keep running after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Present the scene and continue.
    Continue,
    /// Close the window.
    Exit,
}

/// One gallery card as shown in the carousel.
#[derive(Clone, Debug, PartialEq)]
pub struct CardView {
    /// Title printed on the card.
    pub title: String,
    /// One line description.
    pub blurb: String,
    /// Whether the card is greyed out.
    pub locked: bool,
}

/// Gallery carousel.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryView {
    /// Category tab labels with the active flag.
    pub categories: Vec<(String, bool)>,
    /// Selected card.
    pub card: CardView,
    /// Position of the selected card.
    pub index: usize,
    /// Cards in the active category.
    pub count: usize,
    /// Transient message, such as a refused launch.
    pub message: Option<String>,
}

/// Snake board.
#[derive(Clone, Debug, PartialEq)]
pub struct SnakeView {
    /// Board size in cells.
    pub grid: IVec2,
    /// Side length of one cell in playfield units.
    pub cell: f32,
    /// Segments from head to tail.
    pub segments: Vec<IVec2>,
    /// Food cell.
    pub food: Option<IVec2>,
    /// Current score.
    pub score: u32,
    /// Whether the run is over.
    pub crashed: bool,
}

/// Pong court.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PongView {
    /// Court extent.
    pub court: Vec2,
    /// Ball centre.
    pub ball: Vec2,
    /// Paddle size.
    pub paddle: Vec2,
    /// Top-left corner of the player paddle.
    pub player: Vec2,
    /// Top-left corner of the CPU paddle.
    pub cpu: Vec2,
    /// Points won by the player and the CPU.
    pub points: (u32, u32),
}

/// Hostile unit on the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyView {
    /// Unit centre.
    pub position: Vec2,
    /// Behavioural variant, which selects the hull color.
    pub kind: EnemyKind,
    /// Hull radius.
    pub radius: f32,
}

/// Adaptive mode indicator in the HUD corner.
#[derive(Clone, Debug, PartialEq)]
pub struct HudLabel {
    /// Label text.
    pub text: &'static str,
    /// Label color.
    pub color: Color,
}

impl HudLabel {
    /// Label for an adaptive status; `None` while adaptive mode is off.
    #[must_use]
    pub fn for_status(status: AdaptiveStatus) -> Option<Self> {
        let (text, color) = match status {
            AdaptiveStatus::Manual => return None,
            AdaptiveStatus::Starting => ("AI: STARTING...", Color::from_rgb_u8(255, 255, 0)),
            AdaptiveStatus::Calibrating => ("AI: CALIBRATING...", Color::from_rgb_u8(255, 255, 0)),
            AdaptiveStatus::Active(DifficultyLevel::Normal) => {
                ("AI LEVEL: 1 (NORMAL)", Color::from_rgb_u8(0, 255, 0))
            }
            AdaptiveStatus::Active(DifficultyLevel::Elevated) => {
                ("AI LEVEL: 2 (MINES)", Color::from_rgb_u8(255, 170, 0))
            }
            AdaptiveStatus::Active(DifficultyLevel::Maximum) => {
                ("AI LEVEL: 3 (MAX)", Color::from_rgb_u8(255, 0, 0))
            }
        };
        Some(Self { text, color })
    }
}

/// CPU Defender board.
#[derive(Clone, Debug, PartialEq)]
pub struct DefenderView {
    /// Board extent.
    pub arena: Vec2,
    /// Processor centre.
    pub base: Vec2,
    /// Processor health as a fraction of its maximum.
    pub health_fraction: f32,
    /// Turret centre.
    pub turret: Vec2,
    /// Barrel heading in radians.
    pub heading: f32,
    /// Rounds in flight.
    pub bullets: Vec<Vec2>,
    /// Hostile units.
    pub enemies: Vec<EnemyView>,
    /// Mines.
    pub mines: Vec<Vec2>,
    /// Ammunition crates.
    pub crates: Vec<Vec2>,
    /// Current score.
    pub score: u32,
    /// Rounds held and the current cap.
    pub ammo: (u32, u32),
    /// Whether adaptive mode is switched on.
    pub adaptive: bool,
    /// Adaptive indicator, if adaptive mode is on.
    pub hud: Option<HudLabel>,
    /// Headline currently shown over the board.
    pub announcement: Option<Announcement>,
    /// Final score once the processor is destroyed.
    pub game_over: Option<u32>,
}

/// Everything that can fill the cabinet screen.
#[derive(Clone, Debug, PartialEq)]
pub enum Screen {
    /// Game selection carousel.
    Gallery(GalleryView),
    /// Snake minigame.
    Snake(SnakeView),
    /// Pong minigame.
    Pong(PongView),
    /// CPU Defender.
    Defender(DefenderView),
}

/// Scene description handed to backends each frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Active screen.
    pub screen: Screen,
    /// Whether the tutorial overlay covers the screen.
    pub tutorial_open: bool,
}

impl Scene {
    /// Creates a scene without overlays.
    #[must_use]
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            tutorial_open: false,
        }
    }

    /// Playfield extent of the active screen, in playfield units.
    #[must_use]
    pub fn extent(&self) -> Vec2 {
        match &self.screen {
            Screen::Gallery(_) => Vec2::new(700.0, 500.0),
            Screen::Snake(view) => view.grid.as_vec2() * view.cell,
            Screen::Pong(view) => view.court,
            Screen::Defender(view) => view.arena,
        }
    }
}

/// Heading and lines of the tutorial overlay.
pub const TUTORIAL: (&str, &[&str]) = (
    "HOW TO PLAY CPU DEFENDER",
    &[
        "WASD: move the turret",
        "Mouse: aim, click to fire",
        "Walk over crates to reload",
        "R: repair the CPU (500 points)",
        "M: toggle AI adaptive mode",
        "Mines pulse damage until shot",
        "H: close this help, Esc: back",
    ],
);

/// Transient headline with a display timer in host time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnouncementBoard {
    current: Option<(Announcement, Duration)>,
}

impl AnnouncementBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows an announcement, replacing the one on display.
    pub fn show(&mut self, announcement: Announcement) {
        self.current = Some((announcement, announcement.duration));
    }

    /// Counts down the display timer.
    pub fn advance(&mut self, elapsed: Duration) {
        if let Some((_, remaining)) = self.current.as_mut() {
            *remaining = remaining.saturating_sub(elapsed);
            if remaining.is_zero() {
                self.current = None;
            }
        }
    }

    /// Announcement on display.
    #[must_use]
    pub fn current(&self) -> Option<Announcement> {
        self.current.map(|(announcement, _)| announcement)
    }

    /// Removes the announcement on display.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed first.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting cabinet scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until `update_scene` asks it to exit.
    ///
    /// The closure receives the host frame delta and the input captured for
    /// the frame, and rewrites the scene before it is drawn.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameControl + 'static;
}
