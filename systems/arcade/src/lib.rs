#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Arcade cabinet: the game gallery and the two self-contained minigames.
//!
//! Snake and Pong are plain frame-stepped simulations with no adaptive
//! behaviour. Both step once per fixed 60 Hz frame and draw their randomness
//! from a seeded ChaCha stream.

mod gallery;
mod pong;
mod snake;

pub use gallery::{Card, Category, Gallery, GameKind, LaunchError};
pub use pong::{Court, Pong, PongEvent, Side};
pub use snake::{Direction, Snake, SnakeEvent};
