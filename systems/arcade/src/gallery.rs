use thiserror::Error;

/// Playable titles of the cabinet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameKind {
    /// Grid snake.
    Snake,
    /// Single-player pong against a CPU paddle.
    Pong,
    /// Turret defence with adaptive difficulty.
    CpuDefender,
}

/// Shelves of the gallery carousel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Titles that can be played.
    Minigames,
    /// Announced titles that are still locked.
    Pro,
}

impl Category {
    /// Both categories in display order.
    pub const ALL: [Self; 2] = [Self::Minigames, Self::Pro];

    /// Tab label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Minigames => "MINIGAMES",
            Self::Pro => "PRO",
        }
    }

    /// Cards shown on the shelf.
    #[must_use]
    pub const fn cards(self) -> &'static [Card] {
        match self {
            Self::Minigames => &MINIGAMES,
            Self::Pro => &PRO,
        }
    }
}

/// One entry of the carousel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Card {
    /// Title printed on the card.
    pub title: &'static str,
    /// One line description.
    pub blurb: &'static str,
    /// Game launched by the card; `None` for locked titles.
    pub game: Option<GameKind>,
}

impl Card {
    /// Reports whether the card cannot be launched.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.game.is_none()
    }
}

const MINIGAMES: [Card; 3] = [
    Card {
        title: "SNAKE",
        blurb: "Eat, grow, do not bite yourself.",
        game: Some(GameKind::Snake),
    },
    Card {
        title: "PONG",
        blurb: "Beat the CPU paddle.",
        game: Some(GameKind::Pong),
    },
    Card {
        title: "CPU DEFENDER",
        blurb: "Protect the processor. The AI is watching.",
        game: Some(GameKind::CpuDefender),
    },
];

const PRO: [Card; 2] = [
    Card {
        title: "NEURAL RACER",
        blurb: "Coming soon.",
        game: None,
    },
    Card {
        title: "QUANTUM CHESS",
        blurb: "Coming soon.",
        game: None,
    },
];

/// Reasons the selected card did not start a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// The selected title is not playable yet.
    #[error("`{title}` is locked")]
    Locked {
        /// Title of the locked card.
        title: &'static str,
    },
}

/// Carousel position over the two categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gallery {
    category: Category,
    index: usize,
}

impl Default for Gallery {
    fn default() -> Self {
        Self {
            category: Category::Minigames,
            index: 0,
        }
    }
}

impl Gallery {
    /// Creates a gallery showing the first minigame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active category.
    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    /// Index of the selected card within the active category.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Selected card.
    #[must_use]
    pub fn current(&self) -> &'static Card {
        &self.category.cards()[self.index]
    }

    /// Moves to the next card, wrapping to the first.
    pub fn next(&mut self) {
        let len = self.category.cards().len();
        self.index = if self.index + 1 < len { self.index + 1 } else { 0 };
    }

    /// Moves to the previous card, wrapping to the last.
    pub fn previous(&mut self) {
        let len = self.category.cards().len();
        self.index = if self.index > 0 { self.index - 1 } else { len - 1 };
    }

    /// Shows another category, starting from its first card.
    pub fn switch_category(&mut self, category: Category) {
        self.category = category;
        self.index = 0;
    }

    /// Resolves the selected card into a game.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Locked`] when the selected title is not playable.
    pub fn launch(&self) -> Result<GameKind, LaunchError> {
        let card = self.current();
        card.game.ok_or(LaunchError::Locked { title: card.title })
    }
}
