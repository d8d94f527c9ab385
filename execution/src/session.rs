use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;
use yieldroom_types::{
    Allocation, ConnectionId, GameState, PlayerLedger, DEFAULT_COMPOUNDING_FREQ,
    DEFAULT_MAX_ROUNDS,
};

use crate::ledger::{validate_allocation, SubmitError};

/// Credential check guarding the facilitator role.
pub trait Credentials: Send + Sync {
    fn verify(&self, supplied: Option<&str>) -> bool;
}

/// A single process-wide secret compared for equality.
#[derive(Clone, Debug)]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

impl Credentials for SharedSecret {
    fn verify(&self, supplied: Option<&str>) -> bool {
        supplied == Some(self.0.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("wrong password")]
    WrongSecret,
    #[error("not the facilitator")]
    NotFacilitator,
}

/// The single authoritative game state.
///
/// Owns every [PlayerLedger] by connection and remembers which connection (if
/// any) holds the facilitator role.
pub struct SessionState {
    pub(crate) game: GameState,
    pub(crate) players: BTreeMap<ConnectionId, PlayerLedger>,
    pub(crate) facilitator: Option<ConnectionId>,
    credentials: Box<dyn Credentials>,
}

impl SessionState {
    pub fn new(credentials: impl Credentials + 'static) -> Self {
        Self {
            game: GameState::default(),
            players: BTreeMap::new(),
            facilitator: None,
            credentials: Box::new(credentials),
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn facilitator(&self) -> Option<ConnectionId> {
        self.facilitator
    }

    pub fn is_facilitator(&self, connection: ConnectionId) -> bool {
        self.facilitator == Some(connection)
    }

    pub fn player(&self, connection: ConnectionId) -> Option<&PlayerLedger> {
        self.players.get(&connection)
    }

    pub fn players(&self) -> &BTreeMap<ConnectionId, PlayerLedger> {
        &self.players
    }

    /// Bind the facilitator role to `connection`.
    ///
    /// The last successful bind wins; a previous facilitator is displaced
    /// silently. A connection holds a single role, so any ledger it owned is
    /// dropped.
    pub fn bind_facilitator(
        &mut self,
        connection: ConnectionId,
        supplied: Option<&str>,
    ) -> Result<(), AuthError> {
        if !self.credentials.verify(supplied) {
            return Err(AuthError::WrongSecret);
        }
        if let Some(previous) = self.facilitator.replace(connection) {
            if previous != connection {
                info!(%previous, %connection, "facilitator displaced");
            }
        }
        self.players.remove(&connection);
        Ok(())
    }

    /// Register (or re-register) a participant on `connection`.
    pub fn register_player(&mut self, connection: ConnectionId, name: Option<&str>) -> &PlayerLedger {
        if self.facilitator == Some(connection) {
            self.facilitator = None;
        }
        let ledger = PlayerLedger::new(connection, name);
        self.players.insert(connection, ledger);
        &self.players[&connection]
    }

    /// Forget everything held by `connection`. Returns whether anything changed.
    pub fn unregister(&mut self, connection: ConnectionId) -> bool {
        let mut changed = self.players.remove(&connection).is_some();
        if self.facilitator == Some(connection) {
            self.facilitator = None;
            changed = true;
        }
        changed
    }

    /// Store a participant's allocation for the pending round.
    pub fn submit_allocation(
        &mut self,
        connection: ConnectionId,
        allocation: Allocation,
    ) -> Result<(), SubmitError> {
        let ledger = self
            .players
            .get_mut(&connection)
            .ok_or(SubmitError::NoSuchParticipant)?;
        validate_allocation(&allocation)?;
        ledger.allocation = allocation;
        ledger.submitted = true;
        Ok(())
    }

    /// Start a new game with the given configuration and reset every ledger.
    ///
    /// Missing or zero values fall back to the defaults.
    pub fn reconfigure(
        &mut self,
        connection: ConnectionId,
        max_rounds: Option<u32>,
        freq: Option<u32>,
    ) -> Result<&GameState, AuthError> {
        if !self.is_facilitator(connection) {
            return Err(AuthError::NotFacilitator);
        }
        let max_rounds = max_rounds.filter(|r| *r > 0).unwrap_or(DEFAULT_MAX_ROUNDS);
        let freq = freq.filter(|f| *f > 0).unwrap_or(DEFAULT_COMPOUNDING_FREQ);
        self.game = GameState::new(max_rounds, freq);
        for ledger in self.players.values_mut() {
            ledger.reset();
        }
        Ok(&self.game)
    }
}
