use std::collections::VecDeque;

use glam::IVec2;
use rand::seq::SliceRandom;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

const COLUMNS: i32 = 30;
const ROWS: i32 = 20;
const STEP_FRAMES: u32 = 6;
const FOOD_SCORE: u32 = 10;
const START: IVec2 = IVec2::new(10, 10);
const FIRST_FOOD: IVec2 = IVec2::new(15, 15);

/// Travel direction of the snake's head.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Towards the last row.
    Down,
    /// Towards column 0.
    Left,
    /// Towards the last column.
    Right,
}

impl Direction {
    const fn offset(self) -> IVec2 {
        match self {
            Self::Up => IVec2::new(0, -1),
            Self::Down => IVec2::new(0, 1),
            Self::Left => IVec2::new(-1, 0),
            Self::Right => IVec2::new(1, 0),
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Outcomes of a snake step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnakeEvent {
    /// The head reached the food.
    Ate {
        /// Score after eating.
        score: u32,
    },
    /// The head left the grid or hit the body; the run is over.
    Crashed {
        /// Final score.
        score: u32,
    },
}

/// Grid snake stepping every few frames.
#[derive(Debug)]
pub struct Snake {
    body: VecDeque<IVec2>,
    heading: Direction,
    requested: Direction,
    food: Option<IVec2>,
    score: u32,
    alive: bool,
    frames: u32,
    rng: ChaCha8Rng,
}

impl Snake {
    /// Grid size in cells.
    pub const GRID: IVec2 = IVec2::new(COLUMNS, ROWS);

    /// Starts a run with a single-segment snake heading right.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            body: VecDeque::from([START]),
            heading: Direction::Right,
            requested: Direction::Right,
            food: Some(FIRST_FOOD),
            score: 0,
            alive: true,
            frames: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Segments from head to tail.
    pub fn body(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.body.iter().copied()
    }

    /// Cell holding the food, if any cell is free.
    #[must_use]
    pub fn food(&self) -> Option<IVec2> {
        self.food
    }

    /// Points scored so far.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Reports whether the run is still going.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Current head direction.
    #[must_use]
    pub fn heading(&self) -> Direction {
        self.heading
    }

    /// Requests a turn for the next step. Reversing onto the body is ignored.
    pub fn steer(&mut self, direction: Direction) {
        if direction != self.heading.opposite() {
            self.requested = direction;
        }
    }

    /// Advances one frame, stepping the snake every sixth frame.
    pub fn tick(&mut self, out: &mut Vec<SnakeEvent>) {
        if !self.alive {
            return;
        }
        self.frames += 1;
        if self.frames < STEP_FRAMES {
            return;
        }
        self.frames = 0;
        self.step(out);
    }

    fn step(&mut self, out: &mut Vec<SnakeEvent>) {
        self.heading = self.requested;
        let Some(&head) = self.body.front() else {
            return;
        };
        let next = head + self.heading.offset();

        let outside = next.x < 0 || next.x >= COLUMNS || next.y < 0 || next.y >= ROWS;
        if outside || self.body.contains(&next) {
            self.alive = false;
            tracing::debug!(score = self.score, "snake crashed");
            out.push(SnakeEvent::Crashed { score: self.score });
            return;
        }

        self.body.push_front(next);
        if self.food == Some(next) {
            self.score += FOOD_SCORE;
            self.food = self.place_food();
            out.push(SnakeEvent::Ate { score: self.score });
        } else {
            let _ = self.body.pop_back();
        }
    }

    fn place_food(&mut self) -> Option<IVec2> {
        let free: Vec<IVec2> = (0..ROWS)
            .flat_map(|y| (0..COLUMNS).map(move |x| IVec2::new(x, y)))
            .filter(|cell| !self.body.contains(cell))
            .collect();
        free.choose(&mut self.rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversal_is_ignored() {
        let mut snake = Snake::new(1);
        snake.steer(Direction::Left);
        let mut events = Vec::new();
        for _ in 0..STEP_FRAMES {
            snake.tick(&mut events);
        }
        assert_eq!(snake.heading(), Direction::Right);
        assert_eq!(snake.body().next(), Some(IVec2::new(11, 10)));
    }
}
