use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use super::{DEFAULT_PLAYER_NAME, INITIAL_BALANCE, MAX_NAME_LENGTH};

/// Opaque handle identifying one transport connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a fresh, random handle.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build a handle from a fixed value (useful for deterministic tests and tooling).
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Percentages of a balance assigned to the three buckets.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(default = "missing_percent", deserialize_with = "lenient_percent")]
    pub a: f64,
    #[serde(default = "missing_percent", deserialize_with = "lenient_percent")]
    pub b: f64,
    #[serde(default = "missing_percent", deserialize_with = "lenient_percent")]
    pub c: f64,
}

impl Allocation {
    /// Everything held as idle cash.
    pub const IDLE: Self = Self {
        a: 0.0,
        b: 0.0,
        c: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn total(&self) -> f64 {
        self.a + self.b + self.c
    }

    pub fn buckets(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }
}

/// Per-bucket percentage returns applied when a round closes.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Rates {
    #[serde(default = "missing_percent", deserialize_with = "lenient_percent")]
    pub a: f64,
    #[serde(default = "missing_percent", deserialize_with = "lenient_percent")]
    pub b: f64,
    #[serde(default = "missing_percent", deserialize_with = "lenient_percent")]
    pub c: f64,
}

impl Rates {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    pub fn buckets(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }
}

/// Read a percentage. Anything other than a JSON number, including a missing
/// field, becomes NaN so the value is refused by validation instead of the frame
/// being dropped.
fn lenient_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_f64()
        .unwrap_or(f64::NAN))
}

fn missing_percent() -> f64 {
    f64::NAN
}

/// Per-participant record kept by the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLedger {
    pub id: ConnectionId,
    pub name: String,
    pub balance: f64,
    /// Balance after every settled round, starting with the initial balance.
    pub history: Vec<f64>,
    #[serde(rename = "currentAlloc")]
    pub allocation: Allocation,
    pub submitted: bool,
}

impl PlayerLedger {
    pub fn new(id: ConnectionId, name: Option<&str>) -> Self {
        Self {
            id,
            name: display_name(name),
            balance: INITIAL_BALANCE,
            history: vec![INITIAL_BALANCE],
            allocation: Allocation::IDLE,
            submitted: false,
        }
    }

    /// Return to the state of a freshly registered participant (name is kept).
    pub fn reset(&mut self) {
        self.balance = INITIAL_BALANCE;
        self.history = vec![INITIAL_BALANCE];
        self.allocation = Allocation::IDLE;
        self.submitted = false;
    }
}

/// Normalize a requested display name: trimmed, defaulted when blank, capped
/// at [MAX_NAME_LENGTH] characters.
pub fn display_name(name: Option<&str>) -> String {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return DEFAULT_PLAYER_NAME.to_string();
    }
    name.chars().take(MAX_NAME_LENGTH).collect()
}

/// One row of the facilitator's leaderboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: u32,
    pub id: ConnectionId,
    pub name: String,
    pub balance: f64,
}
