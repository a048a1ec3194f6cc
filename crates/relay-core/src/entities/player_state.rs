//! Player state entities
//!
//! `PlayerState` is the authoritative, server-held state of one session.
//! `PartialState` is the sparse update a client sends in `player_update`.
//! Both are open JSON objects: clients may carry keys the server does not know
//! about and the relay stores and forwards them untouched.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::DomainError;
use crate::value_objects::SessionId;

/// Animation assigned at registration
pub const DEFAULT_ANIMATION: &str = "idle";

/// Balloon colors assigned at registration (red, blue, green)
pub const DEFAULT_BALLOON_COLORS: [u32; 3] = [0xff_0000, 0x00_00ff, 0x00_ff00];

/// Authoritative state of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerState(Map<String, Value>);

impl PlayerState {
    pub const ID: &'static str = "id";
    pub const POSITION: &'static str = "position";
    pub const ROTATION: &'static str = "rotation";
    pub const VELOCITY: &'static str = "velocity";
    pub const ANIMATION: &'static str = "animation";
    pub const BALLOONS: &'static str = "balloons";

    /// Default state for a freshly registered session, tagged with its id
    #[must_use]
    pub fn initial(id: &SessionId) -> Self {
        let mut map = Map::new();
        map.insert(Self::POSITION.into(), json!({ "x": 0, "y": 0, "z": 0 }));
        map.insert(Self::ROTATION.into(), json!({ "y": 0 }));
        map.insert(Self::VELOCITY.into(), json!({ "x": 0, "y": 0, "z": 0 }));
        map.insert(Self::ANIMATION.into(), Value::from(DEFAULT_ANIMATION));
        map.insert(
            Self::BALLOONS.into(),
            Value::Array(DEFAULT_BALLOON_COLORS.iter().map(|&c| Value::from(c)).collect()),
        );
        map.insert(Self::ID.into(), Value::from(id.as_str()));
        Self(map)
    }

    /// Wrap an existing JSON object
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// The `id` field
    pub fn id(&self) -> Option<&str> {
        self.0.get(Self::ID).and_then(Value::as_str)
    }

    /// The `animation` field
    pub fn animation(&self) -> Option<&str> {
        self.0.get(Self::ANIMATION).and_then(Value::as_str)
    }

    /// The `balloons` field, if it is a sequence
    pub fn balloons(&self) -> Option<&[Value]> {
        self.0.get(Self::BALLOONS).and_then(Value::as_array).map(Vec::as_slice)
    }

    /// Look up any top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Sparse state update sent by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialState(Map<String, Value>);

impl PartialState {
    /// Wrap an existing JSON object
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> serde_json::map::Iter<'_> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for PartialState {
    type Error = DomainError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(DomainError::InvalidState(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
