//! State transitions applied to player state

mod merge;

pub use merge::merge;
