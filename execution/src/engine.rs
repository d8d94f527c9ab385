//! Role-scoped command handling.
//!
//! Every handler runs to completion and either applies its whole effect or
//! leaves the session untouched. Failures never escape: they become messages to
//! the sender or are dropped.

use tracing::{debug, info};
use yieldroom_types::{
    api::{Command, Event, GameRestarted, Login, LoginSuccess, RestartSettings, Role},
    Allocation, ConnectionId, Rates, INITIAL_BALANCE,
};

use crate::{
    broadcast::{facilitator_snapshot, Envelope},
    session::{AuthError, Credentials, SessionState},
    settlement::{Progression, SettleError},
};

pub struct Engine {
    session: SessionState,
}

impl Engine {
    pub fn new(credentials: impl Credentials + 'static) -> Self {
        Self {
            session: SessionState::new(credentials),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Handle one inbound command from `connection`.
    pub fn handle(&mut self, connection: ConnectionId, command: Command) -> Vec<Envelope> {
        match command {
            Command::Login(login) => self.handle_login(connection, login),
            Command::SubmitAllocation(allocation) => {
                self.handle_submit_allocation(connection, allocation)
            }
            Command::GmProcessRound(rates) => self.handle_process_round(connection, rates),
            Command::GmRestartGame(settings) => self.handle_restart_game(connection, settings),
        }
    }

    /// Handle a closed connection.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Envelope> {
        if !self.session.unregister(connection) {
            return Vec::new();
        }
        info!(%connection, "connection unregistered");
        self.snapshot()
    }

    fn snapshot(&self) -> Vec<Envelope> {
        facilitator_snapshot(&self.session).into_iter().collect()
    }

    fn handle_login(&mut self, connection: ConnectionId, login: Login) -> Vec<Envelope> {
        match login.role {
            Role::Gm => {
                if let Err(err) = self
                    .session
                    .bind_facilitator(connection, login.password.as_deref())
                {
                    info!(%connection, "facilitator login rejected");
                    return vec![Envelope::participant(
                        connection,
                        Event::LoginError(err.to_string()),
                    )];
                }
                info!(%connection, "facilitator bound");
                let mut envelopes = vec![Envelope::participant(
                    connection,
                    Event::LoginSuccess(LoginSuccess::Gm {
                        state: *self.session.game(),
                    }),
                )];
                envelopes.extend(self.snapshot());
                envelopes
            }
            Role::Player => {
                let ledger = self
                    .session
                    .register_player(connection, login.name.as_deref())
                    .clone();
                info!(%connection, name = %ledger.name, "participant registered");
                let mut envelopes = vec![Envelope::participant(
                    connection,
                    Event::LoginSuccess(LoginSuccess::Player {
                        player_data: ledger,
                        state: *self.session.game(),
                    }),
                )];
                envelopes.extend(self.snapshot());
                envelopes
            }
            Role::Unknown => vec![Envelope::participant(
                connection,
                Event::LoginError(AuthError::WrongSecret.to_string()),
            )],
        }
    }

    fn handle_submit_allocation(
        &mut self,
        connection: ConnectionId,
        allocation: Allocation,
    ) -> Vec<Envelope> {
        if self.session.player(connection).is_none() {
            debug!(%connection, "allocation from unknown participant ignored");
            return Vec::new();
        }
        if let Err(err) = self.session.submit_allocation(connection, allocation) {
            debug!(%connection, %err, "allocation rejected");
            return vec![Envelope::participant(
                connection,
                Event::Msg(err.to_string()),
            )];
        }
        let mut envelopes = vec![Envelope::participant(
            connection,
            Event::SubmissionConfirmed,
        )];
        envelopes.extend(self.snapshot());
        envelopes
    }

    fn handle_process_round(&mut self, connection: ConnectionId, rates: Rates) -> Vec<Envelope> {
        let outcome = match self.session.process_round(connection, rates) {
            Ok(outcome) => outcome,
            Err(SettleError::NotFacilitator) => {
                debug!(%connection, "process round from non-facilitator ignored");
                return Vec::new();
            }
            Err(err) => {
                return vec![Envelope::participant(
                    connection,
                    Event::Msg(err.to_string()),
                )];
            }
        };

        let mut envelopes: Vec<_> = outcome
            .results
            .into_iter()
            .map(|(player, result)| Envelope::participant(player, Event::RoundResult(result)))
            .collect();
        envelopes.push(Envelope::everyone(match outcome.progression {
            Progression::NextRound(round) => Event::NewRoundStarted(round),
            Progression::GameOver => Event::GameOver,
        }));
        envelopes.extend(self.snapshot());
        envelopes
    }

    fn handle_restart_game(
        &mut self,
        connection: ConnectionId,
        settings: RestartSettings,
    ) -> Vec<Envelope> {
        let game = match self
            .session
            .reconfigure(connection, settings.max_rounds(), settings.freq())
        {
            Ok(game) => *game,
            Err(_) => {
                debug!(%connection, "restart from non-facilitator ignored");
                return Vec::new();
            }
        };
        info!(
            max_rounds = game.max_rounds,
            compounding_freq = game.compounding_freq,
            "game restarted"
        );

        let mut envelopes: Vec<_> = self
            .session
            .players()
            .keys()
            .map(|player| {
                Envelope::participant(
                    *player,
                    Event::GameRestarted(GameRestarted {
                        balance: INITIAL_BALANCE,
                        max_rounds: game.max_rounds,
                        compounding_freq: game.compounding_freq,
                    }),
                )
            })
            .collect();
        envelopes.push(Envelope::everyone(Event::NewRoundStarted(game.round)));
        envelopes.extend(self.snapshot());
        envelopes
    }
}
