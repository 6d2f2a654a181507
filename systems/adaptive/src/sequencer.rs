use std::time::Duration;

/// Named phases of the activation choreography.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The classifier is being loaded or trained.
    Loading,
    /// "AI SYSTEM / ONLINE" is on screen.
    Online,
    /// "LEVEL 1 / CALIBRATING..." is on screen.
    Calibrating,
    /// The sequence finished; gameplay resumes under adaptive control.
    Active,
}

/// Runs the activation phases in order, each timed phase for its configured duration.
///
/// The loading phase has no duration; it ends when [`ActivationSequencer::loading_complete`]
/// is called. A paused sequencer ignores elapsed time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivationSequencer {
    phase: Phase,
    remaining: Duration,
    online: Duration,
    calibrating: Duration,
    paused: bool,
}

impl ActivationSequencer {
    /// Creates a sequencer in the loading phase.
    #[must_use]
    pub fn new(online: Duration, calibrating: Duration) -> Self {
        Self {
            phase: Phase::Loading,
            remaining: Duration::ZERO,
            online,
            calibrating,
            paused: false,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time left in the current timed phase.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Reports whether elapsed time is currently ignored.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stops the phase clock.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Restarts the phase clock.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Leaves the loading phase. Returns the phases entered, in order.
    pub fn loading_complete(&mut self) -> Vec<Phase> {
        if self.phase != Phase::Loading {
            return Vec::new();
        }
        self.enter(Phase::Online);
        let mut entered = vec![Phase::Online];
        self.settle(&mut entered);
        entered
    }

    /// Advances the phase clock. Returns the phases entered, in order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Phase> {
        let mut entered = Vec::new();
        if self.paused || matches!(self.phase, Phase::Loading | Phase::Active) {
            return entered;
        }

        self.remaining = self.remaining.saturating_sub(elapsed);
        self.settle(&mut entered);
        entered
    }

    fn settle(&mut self, entered: &mut Vec<Phase>) {
        while self.remaining.is_zero() {
            let next = match self.phase {
                Phase::Online => Phase::Calibrating,
                Phase::Calibrating => Phase::Active,
                Phase::Loading | Phase::Active => return,
            };
            self.enter(next);
            entered.push(next);
        }
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.remaining = match phase {
            Phase::Online => self.online,
            Phase::Calibrating => self.calibrating,
            Phase::Loading | Phase::Active => Duration::ZERO,
        };
        tracing::debug!(?phase, "activation phase entered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(500);

    fn sequencer() -> ActivationSequencer {
        ActivationSequencer::new(Duration::from_millis(1_500), Duration::from_millis(1_500))
    }

    #[test]
    fn phases_run_in_order() {
        let mut sequencer = sequencer();
        assert!(sequencer.advance(Duration::from_secs(10)).is_empty());
        assert_eq!(sequencer.phase(), Phase::Loading);

        assert_eq!(sequencer.loading_complete(), vec![Phase::Online]);
        assert!(sequencer.advance(STEP).is_empty());
        assert!(sequencer.advance(STEP).is_empty());
        assert_eq!(sequencer.advance(STEP), vec![Phase::Calibrating]);
        assert!(sequencer.advance(Duration::from_millis(1_499)).is_empty());
        assert_eq!(sequencer.advance(Duration::from_millis(1)), vec![Phase::Active]);
        assert!(sequencer.advance(STEP).is_empty());
    }

    #[test]
    fn paused_sequencer_holds_its_phase() {
        let mut sequencer = sequencer();
        let _ = sequencer.loading_complete();
        sequencer.pause();
        assert!(sequencer.advance(Duration::from_secs(60)).is_empty());
        assert_eq!(sequencer.phase(), Phase::Online);
        assert_eq!(sequencer.remaining(), Duration::from_millis(1_500));

        sequencer.resume();
        assert_eq!(sequencer.advance(Duration::from_secs(2)), vec![Phase::Calibrating]);
    }

    #[test]
    fn zero_length_phases_are_skipped_in_order() {
        let mut sequencer = ActivationSequencer::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(
            sequencer.loading_complete(),
            vec![Phase::Online, Phase::Calibrating, Phase::Active]
        );
        assert!(sequencer.loading_complete().is_empty());
    }
}
