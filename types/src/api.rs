//! Wire protocol spoken over a WebSocket connection.
//!
//! Every frame is a JSON object of the form `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{
    Allocation, ConnectionId, GameState, PlayerLedger, Rates, Standing, MAX_COMPOUNDING_FREQ,
    MAX_ROUNDS_LIMIT,
};

/// Role requested at login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Gm,
    Player,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Login {
    #[serde(rename = "type")]
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Raw restart settings. Values are loosely typed on the wire and are
/// interpreted like an integer parse: see [parse_count].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartSettings {
    #[serde(default)]
    pub max_rounds: Option<Value>,
    #[serde(default)]
    pub freq: Option<Value>,
}

impl RestartSettings {
    /// Requested number of rounds, if it is a usable positive integer.
    pub fn max_rounds(&self) -> Option<u32> {
        self.max_rounds
            .as_ref()
            .and_then(parse_count)
            .map(|rounds| rounds.min(MAX_ROUNDS_LIMIT))
    }

    /// Requested compounding frequency, if it is a usable positive integer.
    pub fn freq(&self) -> Option<u32> {
        self.freq
            .as_ref()
            .and_then(parse_count)
            .map(|freq| freq.min(MAX_COMPOUNDING_FREQ))
    }
}

/// Interpret a JSON value as a positive count.
///
/// Numbers are truncated toward zero, strings contribute their leading integer
/// (`"12 months"` is 12). Anything that does not yield a value of at least 1
/// (including values past `u32::MAX`) is `None`.
pub fn parse_count(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int
            } else {
                let float = number.as_f64()?;
                if !float.is_finite() || float.abs() > i64::MAX as f64 {
                    return None;
                }
                float.trunc() as i64
            }
        }
        Value::String(text) => leading_integer(text)?,
        _ => return None,
    };
    if parsed < 1 {
        return None;
    }
    u32::try_from(parsed).ok()
}

fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Commands received from a connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Command {
    Login(Login),
    SubmitAllocation(Allocation),
    GmProcessRound(Rates),
    GmRestartGame(RestartSettings),
}

impl Command {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Payload of a successful login, tagged by the role that was granted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LoginSuccess {
    Gm {
        state: GameState,
    },
    Player {
        #[serde(rename = "playerData")]
        player_data: PlayerLedger,
        state: GameState,
    },
}

/// Outcome of one settled round for one participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub round: u32,
    pub gain: f64,
    pub new_balance: f64,
    pub rates: Rates,
    pub freq: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRestarted {
    pub balance: f64,
    pub max_rounds: u32,
    pub compounding_freq: u32,
}

/// Everything the facilitator sees: every ledger with full history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GmUpdate {
    pub players: BTreeMap<ConnectionId, PlayerLedger>,
    pub state: GameState,
    pub leaderboard: Vec<Standing>,
}

/// Messages sent to connections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum Event {
    LoginSuccess(LoginSuccess),
    LoginError(String),
    SubmissionConfirmed,
    Msg(String),
    RoundResult(RoundResult),
    NewRoundStarted(u32),
    GameOver,
    GameRestarted(GameRestarted),
    GmUpdate(GmUpdate),
}

impl Event {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Wire name of the event, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Event::LoginSuccess(_) => "loginSuccess",
            Event::LoginError(_) => "loginError",
            Event::SubmissionConfirmed => "submissionConfirmed",
            Event::Msg(_) => "msg",
            Event::RoundResult(_) => "roundResult",
            Event::NewRoundStarted(_) => "newRoundStarted",
            Event::GameOver => "gameOver",
            Event::GameRestarted(_) => "gameRestarted",
            Event::GmUpdate(_) => "gmUpdate",
        }
    }
}
