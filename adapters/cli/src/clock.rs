use std::time::Duration;

use cpu_defender_core::FRAME_DURATION;

/// Simulation ticks a single host frame may catch up on.
const MAX_TICKS_PER_FRAME: u32 = 4;

/// Converts variable host frame time into fixed 60 fps simulation ticks.
///
/// Time beyond the per-frame catch-up cap is discarded so a stalled window
/// does not fast-forward the game.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FrameClock {
    accumulator: Duration,
}

impl FrameClock {
    pub(crate) fn ticks(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut ticks = 0;
        while self.accumulator >= FRAME_DURATION {
            self.accumulator -= FRAME_DURATION;
            if ticks < MAX_TICKS_PER_FRAME {
                ticks += 1;
            }
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_remainders_between_frames() {
        let mut clock = FrameClock::default();
        let half = FRAME_DURATION / 2;
        assert_eq!(clock.ticks(half), 0);
        assert_eq!(clock.ticks(half), 1);
        assert_eq!(clock.ticks(FRAME_DURATION), 1);
    }

    #[test]
    fn caps_catch_up() {
        let mut clock = FrameClock::default();
        assert_eq!(clock.ticks(FRAME_DURATION * 10), MAX_TICKS_PER_FRAME);
        assert_eq!(clock.ticks(Duration::ZERO), 0);
    }
}
