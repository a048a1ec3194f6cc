//! Domain entities

mod player_state;

pub use player_state::{PartialState, PlayerState, DEFAULT_ANIMATION, DEFAULT_BALLOON_COLORS};
