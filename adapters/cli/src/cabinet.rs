//! Arcade cabinet state: the gallery carousel and whichever game is running.

use std::time::Duration;

use cpu_defender_rendering::{
    Arrow, CardView, FrameControl, FrameInput, GalleryView, PongView, Scene, Screen, SnakeView,
};
use cpu_defender_system_adaptive::AdaptiveTuning;
use cpu_defender_system_arcade::{
    Category, Direction, Gallery, GameKind, Pong, PongEvent, Side, Snake, SnakeEvent,
};
use glam::Vec2;

use crate::{
    clock::FrameClock,
    defender::{DefenderSession, PlayerControls},
};

/// Edge length of a snake cell in playfield units.
const SNAKE_CELL: f32 = 20.0;

#[derive(Debug)]
enum Game {
    Gallery,
    Snake(Snake),
    Pong(Pong),
    Defender(Box<DefenderSession>),
}

#[derive(Debug)]
pub(crate) struct Cabinet {
    tuning: AdaptiveTuning,
    seed: u64,
    launches: u64,
    gallery: Gallery,
    message: Option<String>,
    game: Game,
    clock: FrameClock,
    tutorial_open: bool,
}

impl Cabinet {
    pub(crate) fn new(tuning: AdaptiveTuning, seed: u64) -> Self {
        Self {
            tuning,
            seed,
            launches: 0,
            gallery: Gallery::new(),
            message: None,
            game: Game::Gallery,
            clock: FrameClock::default(),
            tutorial_open: false,
        }
    }

    /// Applies one host frame of input and rewrites the scene.
    pub(crate) fn frame(
        &mut self,
        elapsed: Duration,
        input: FrameInput,
        scene: &mut Scene,
    ) -> FrameControl {
        let control = self.update(elapsed, &input);
        *scene = self.scene();
        control
    }

    fn update(&mut self, elapsed: Duration, input: &FrameInput) -> FrameControl {
        if matches!(self.game, Game::Gallery) {
            return self.update_gallery(input);
        }
        match &mut self.game {
            Game::Gallery => {}
            Game::Snake(snake) => {
                if let Some(arrow) = input.arrow {
                    snake.steer(direction(arrow));
                }
                let mut events = Vec::new();
                for _ in 0..self.clock.ticks(elapsed) {
                    snake.tick(&mut events);
                }
                for event in events {
                    if let SnakeEvent::Crashed { score } = event {
                        tracing::info!(score, "snake run over");
                    }
                }
                if input.confirm && !snake.is_alive() {
                    self.start(GameKind::Snake);
                }
            }
            Game::Pong(pong) => {
                if let Some(cursor) = input.cursor {
                    pong.aim_player(cursor.y);
                }
                let mut events = Vec::new();
                for _ in 0..self.clock.ticks(elapsed) {
                    pong.tick(&mut events);
                }
                for event in events {
                    if let PongEvent::Scored { side } = event {
                        tracing::debug!(
                            ?side,
                            player = pong.points(Side::Player),
                            cpu = pong.points(Side::Cpu),
                            "pong point"
                        );
                    }
                }
            }
            Game::Defender(session) => {
                if self.tutorial_open {
                    if input.back || input.help || input.fire {
                        self.tutorial_open = false;
                        session.set_tutorial(false);
                    }
                    session.frame(elapsed, PlayerControls::default());
                    return FrameControl::Continue;
                }
                if input.help {
                    self.tutorial_open = true;
                    session.set_tutorial(true);
                    session.frame(elapsed, PlayerControls::default());
                    return FrameControl::Continue;
                }
                if input.toggle_adaptive {
                    session.toggle_adaptive();
                }
                if input.confirm && session.is_over() {
                    self.start(GameKind::CpuDefender);
                    return FrameControl::Continue;
                }
                session.frame(
                    elapsed,
                    PlayerControls {
                        movement: input.movement,
                        aim: input.cursor,
                        fire: input.fire,
                        repair: input.repair,
                    },
                );
            }
        }

        if input.back {
            self.leave();
        }
        FrameControl::Continue
    }

    fn update_gallery(&mut self, input: &FrameInput) -> FrameControl {
        if input.back {
            return FrameControl::Exit;
        }
        match input.arrow {
            Some(Arrow::Left | Arrow::Up) => {
                self.gallery.previous();
                self.message = None;
            }
            Some(Arrow::Right | Arrow::Down) => {
                self.gallery.next();
                self.message = None;
            }
            None => {}
        }
        if input.switch_category {
            let next = match self.gallery.category() {
                Category::Minigames => Category::Pro,
                Category::Pro => Category::Minigames,
            };
            self.gallery.switch_category(next);
            self.message = None;
        }
        if input.confirm {
            match self.gallery.launch() {
                Ok(kind) => self.start(kind),
                Err(error) => {
                    tracing::info!(%error, "launch refused");
                    self.message = Some(error.to_string());
                }
            }
        }
        FrameControl::Continue
    }

    /// Replaces the running game; the previous session is dropped first.
    fn start(&mut self, kind: GameKind) {
        self.game = Game::Gallery;
        self.clock = FrameClock::default();
        self.tutorial_open = false;
        self.launches += 1;
        let seed = self.seed.wrapping_add(self.launches);
        tracing::info!(?kind, seed, "game launched");
        self.game = match kind {
            GameKind::Snake => Game::Snake(Snake::new(seed)),
            GameKind::Pong => Game::Pong(Pong::new(seed)),
            GameKind::CpuDefender => Game::Defender(Box::new(DefenderSession::new(
                self.tuning.clone(),
                seed,
            ))),
        };
    }

    fn leave(&mut self) {
        self.game = Game::Gallery;
        self.tutorial_open = false;
        self.message = None;
    }

    pub(crate) fn scene(&self) -> Scene {
        let screen = match &self.game {
            Game::Gallery => Screen::Gallery(self.gallery_view()),
            Game::Snake(snake) => Screen::Snake(SnakeView {
                grid: Snake::GRID,
                cell: SNAKE_CELL,
                segments: snake.body().collect(),
                food: snake.food(),
                score: snake.score(),
                crashed: !snake.is_alive(),
            }),
            Game::Pong(pong) => {
                let court = pong.court();
                Screen::Pong(PongView {
                    court: Vec2::new(court.width, court.height),
                    ball: pong.ball(),
                    paddle: Vec2::new(court.paddle_width, court.paddle_height),
                    player: Vec2::new(court.player_x, pong.paddle_top(Side::Player)),
                    cpu: Vec2::new(court.cpu_x, pong.paddle_top(Side::Cpu)),
                    points: (pong.points(Side::Player), pong.points(Side::Cpu)),
                })
            }
            Game::Defender(session) => Screen::Defender(session.view()),
        };
        Scene {
            screen,
            tutorial_open: self.tutorial_open,
        }
    }

    fn gallery_view(&self) -> GalleryView {
        let card = self.gallery.current();
        GalleryView {
            categories: Category::ALL
                .iter()
                .map(|category| {
                    (
                        category.label().to_owned(),
                        *category == self.gallery.category(),
                    )
                })
                .collect(),
            card: CardView {
                title: card.title.to_owned(),
                blurb: card.blurb.to_owned(),
                locked: card.is_locked(),
            },
            index: self.gallery.index(),
            count: self.gallery.category().cards().len(),
            message: self.message.clone(),
        }
    }
}

fn direction(arrow: Arrow) -> Direction {
    match arrow {
        Arrow::Up => Direction::Up,
        Arrow::Down => Direction::Down,
        Arrow::Left => Direction::Left,
        Arrow::Right => Direction::Right,
    }
}
