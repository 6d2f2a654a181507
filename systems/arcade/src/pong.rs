use glam::Vec2;
use rand::Rng;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

const SERVE_SPEED: f32 = 4.0;
const SPEEDUP: f32 = 1.1;
const CPU_GAIN: f32 = 0.1;

/// Court geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Court {
    /// Court width.
    pub width: f32,
    /// Court height.
    pub height: f32,
    /// Paddle height.
    pub paddle_height: f32,
    /// Paddle thickness.
    pub paddle_width: f32,
    /// Left edge of the player paddle.
    pub player_x: f32,
    /// Left edge of the CPU paddle.
    pub cpu_x: f32,
}

impl Court {
    /// Standard 600 x 400 court.
    pub const STANDARD: Self = Self {
        width: 600.0,
        height: 400.0,
        paddle_height: 80.0,
        paddle_width: 10.0,
        player_x: 10.0,
        cpu_x: 580.0,
    };

    /// Centre of the court.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }
}

/// Paddle owners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Left paddle, steered by the player.
    Player,
    /// Right paddle, following the ball.
    Cpu,
}

/// Outcomes of a pong frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PongEvent {
    /// A paddle returned the ball.
    Returned {
        /// Paddle that hit the ball.
        side: Side,
    },
    /// The ball left the court past a paddle.
    Scored {
        /// Side awarded the point.
        side: Side,
    },
}

/// Pong against a proportional CPU paddle.
#[derive(Debug)]
pub struct Pong {
    court: Court,
    ball: Vec2,
    velocity: Vec2,
    player_y: f32,
    cpu_y: f32,
    player_points: u32,
    cpu_points: u32,
    rng: ChaCha8Rng,
}

impl Pong {
    /// Starts a match on the standard court.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let court = Court::STANDARD;
        let paddle_top = (court.height - court.paddle_height) * 0.5;
        Self {
            court,
            ball: court.center(),
            velocity: Vec2::splat(SERVE_SPEED),
            player_y: paddle_top,
            cpu_y: paddle_top,
            player_points: 0,
            cpu_points: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Court geometry.
    #[must_use]
    pub fn court(&self) -> Court {
        self.court
    }

    /// Ball centre.
    #[must_use]
    pub fn ball(&self) -> Vec2 {
        self.ball
    }

    /// Ball velocity per frame.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Top edge of a paddle.
    #[must_use]
    pub fn paddle_top(&self, side: Side) -> f32 {
        match side {
            Side::Player => self.player_y,
            Side::Cpu => self.cpu_y,
        }
    }

    /// Points won by a side.
    #[must_use]
    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player_points,
            Side::Cpu => self.cpu_points,
        }
    }

    /// Centres the player paddle on a cursor height.
    pub fn aim_player(&mut self, cursor_y: f32) {
        if cursor_y.is_finite() {
            self.player_y = cursor_y - self.court.paddle_height * 0.5;
        }
    }

    /// Advances one frame.
    pub fn tick(&mut self, out: &mut Vec<PongEvent>) {
        self.ball += self.velocity;
        if self.ball.y <= 0.0 || self.ball.y >= self.court.height {
            self.velocity.y = -self.velocity.y;
        }

        let player_face = self.court.player_x + self.court.paddle_width;
        if self.velocity.x < 0.0
            && self.ball.x < player_face
            && self.spans(self.player_y, self.ball.y)
        {
            self.velocity.x *= -SPEEDUP;
            out.push(PongEvent::Returned { side: Side::Player });
        } else if self.velocity.x > 0.0
            && self.ball.x > self.court.cpu_x
            && self.spans(self.cpu_y, self.ball.y)
        {
            self.velocity.x *= -SPEEDUP;
            out.push(PongEvent::Returned { side: Side::Cpu });
        }

        if self.ball.x < 0.0 || self.ball.x > self.court.width {
            let side = if self.ball.x < 0.0 {
                self.cpu_points += 1;
                Side::Cpu
            } else {
                self.player_points += 1;
                Side::Player
            };
            out.push(PongEvent::Scored { side });
            self.serve();
        }

        let cpu_center = self.cpu_y + self.court.paddle_height * 0.5;
        self.cpu_y += (self.ball.y - cpu_center) * CPU_GAIN;
    }

    fn spans(&self, paddle_top: f32, y: f32) -> bool {
        y > paddle_top && y < paddle_top + self.court.paddle_height
    }

    fn serve(&mut self) {
        self.ball = self.court.center();
        let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.velocity = Vec2::new(SERVE_SPEED * direction, SERVE_SPEED.copysign(self.velocity.y));
        tracing::debug!(
            player = self.player_points,
            cpu = self.cpu_points,
            "pong serve"
        );
    }
}
