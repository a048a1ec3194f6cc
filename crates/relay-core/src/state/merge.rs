//! Partial-state merge
//!
//! Produces the new authoritative state of a session from its previous state and
//! a client's partial update.
//!
//! The merge is shallow: a top-level key present in the update replaces the
//! previous value wholesale. Nested objects such as `position` are **not**
//! merged field by field, so an update carrying `{"position": {"x": 1}}` leaves
//! the stored position without `y` and `z`. Clients always send complete nested
//! objects; this is a known limitation of the relay protocol.

use serde_json::Value;

use crate::entities::{PartialState, PlayerState};
use crate::value_objects::SessionId;

/// Apply `partial` on top of `previous` for the session `owner`.
///
/// - keys present in `partial` overwrite `previous`, other keys are kept
/// - `id` is always forced to `owner`, whatever the update says
/// - `balloons` is replaced with an empty sequence when missing or not a sequence
#[must_use]
pub fn merge(previous: &PlayerState, partial: &PartialState, owner: &SessionId) -> PlayerState {
    let mut merged = previous.as_map().clone();

    for (key, value) in partial.iter() {
        merged.insert(key.clone(), value.clone());
    }

    merged.insert(PlayerState::ID.to_string(), Value::from(owner.as_str()));

    if !merged.get(PlayerState::BALLOONS).is_some_and(Value::is_array) {
        merged.insert(PlayerState::BALLOONS.to_string(), Value::Array(Vec::new()));
    }

    PlayerState::from_map(merged)
}
