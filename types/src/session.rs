use serde::{Deserialize, Serialize};

use super::{DEFAULT_COMPOUNDING_FREQ, DEFAULT_MAX_ROUNDS};

/// Round progression and configuration shared with every client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub round: u32,
    pub max_rounds: u32,
    /// Compounding periods per round; 1 means simple interest.
    pub compounding_freq: u32,
    /// Cleared once the last configured round has been settled.
    #[serde(rename = "isRoundActive")]
    pub round_active: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUNDS, DEFAULT_COMPOUNDING_FREQ)
    }
}

impl GameState {
    pub fn new(max_rounds: u32, compounding_freq: u32) -> Self {
        Self {
            round: 1,
            max_rounds,
            compounding_freq,
            round_active: true,
        }
    }

    /// A game is over once the round counter has moved past the configured rounds.
    pub fn is_terminal(&self) -> bool {
        self.round > self.max_rounds
    }
}
