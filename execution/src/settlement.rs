use thiserror::Error;
use tracing::info;
use yieldroom_types::{api::RoundResult, ConnectionId, Rates, MIN_RATE_PERCENT};

use crate::{
    ledger::{commit, quote},
    returns::InterestModel,
    session::SessionState,
};

#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SettleError {
    #[error("not the facilitator")]
    NotFacilitator,
    #[error("rates must be numbers no lower than -100 that keep balances finite")]
    InvalidRate,
    #[error("game over: restart to play again")]
    GameOver,
}

/// What happens after a round is settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progression {
    NextRound(u32),
    GameOver,
}

/// Result of closing one round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundOutcome {
    /// Round that was settled.
    pub round: u32,
    pub results: Vec<(ConnectionId, RoundResult)>,
    pub progression: Progression,
}

impl SessionState {
    /// Close the current round: apply `rates` to every ledger and advance the
    /// round counter.
    ///
    /// Everything that can fail is checked before the first ledger is touched.
    pub fn process_round(
        &mut self,
        connection: ConnectionId,
        rates: Rates,
    ) -> Result<RoundOutcome, SettleError> {
        if !self.is_facilitator(connection) {
            return Err(SettleError::NotFacilitator);
        }
        if rates
            .buckets()
            .iter()
            .any(|rate| !rate.is_finite() || *rate < MIN_RATE_PERCENT)
        {
            return Err(SettleError::InvalidRate);
        }
        if self.game.is_terminal() {
            return Err(SettleError::GameOver);
        }

        let round = self.game.round;
        let freq = self.game.compounding_freq;
        let model = InterestModel::from_freq(freq);
        let settlements = self
            .players
            .values()
            .map(|ledger| quote(ledger, &rates, model))
            .collect::<Vec<_>>();
        if settlements
            .iter()
            .any(|settlement| !settlement.new_balance.is_finite())
        {
            return Err(SettleError::InvalidRate);
        }

        let results = self
            .players
            .values_mut()
            .zip(settlements)
            .map(|(ledger, settlement)| {
                commit(ledger, settlement);
                (
                    ledger.id,
                    RoundResult {
                        round,
                        gain: settlement.gain,
                        new_balance: settlement.new_balance,
                        rates,
                        freq,
                    },
                )
            })
            .collect::<Vec<_>>();

        self.game.round += 1;
        let progression = if self.game.is_terminal() {
            self.game.round_active = false;
            Progression::GameOver
        } else {
            Progression::NextRound(self.game.round)
        };
        info!(
            round,
            participants = results.len(),
            ?progression,
            "round settled"
        );

        Ok(RoundOutcome {
            round,
            results,
            progression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SharedSecret;
    use yieldroom_types::{Allocation, INITIAL_BALANCE};

    const GM: ConnectionId = ConnectionId::from_u128(100);

    fn session() -> SessionState {
        let mut session = SessionState::new(SharedSecret::new("s"));
        session.bind_facilitator(GM, Some("s")).unwrap();
        session
    }

    #[test]
    fn test_only_facilitator_settles() {
        let mut session = session();
        let player = ConnectionId::from_u128(1);
        session.register_player(player, None);
        session
            .submit_allocation(player, Allocation::new(100.0, 0.0, 0.0))
            .unwrap();

        assert_eq!(
            session.process_round(player, Rates::new(10.0, 0.0, 0.0)),
            Err(SettleError::NotFacilitator)
        );
        let ledger = session.player(player).unwrap();
        assert_eq!(ledger.balance, INITIAL_BALANCE);
        assert!(ledger.submitted);
        assert_eq!(session.game().round, 1);
    }

    #[test]
    fn test_invalid_rates_do_not_mutate() {
        let mut session = session();
        let player = ConnectionId::from_u128(1);
        session.register_player(player, None);
        session
            .submit_allocation(player, Allocation::new(50.0, 50.0, 0.0))
            .unwrap();

        for rates in [
            Rates::new(f64::NAN, 0.0, 0.0),
            Rates::new(0.0, f64::INFINITY, 0.0),
            Rates::new(0.0, 0.0, -100.5),
        ] {
            assert_eq!(
                session.process_round(GM, rates),
                Err(SettleError::InvalidRate)
            );
        }
        let ledger = session.player(player).unwrap();
        assert_eq!(ledger.history, vec![INITIAL_BALANCE]);
        assert!(ledger.submitted);
        assert_eq!(session.game().round, 1);
    }

    #[test]
    fn test_round_advances_by_one() {
        let mut session = session();
        for expected in 2..=5 {
            let outcome = session.process_round(GM, Rates::default()).unwrap();
            assert_eq!(outcome.round, expected - 1);
            assert_eq!(outcome.progression, Progression::NextRound(expected));
            assert_eq!(session.game().round, expected);
        }
    }

    #[test]
    fn test_last_round_ends_game() {
        let mut session = session();
        session.game.round = 5;
        let outcome = session.process_round(GM, Rates::default()).unwrap();
        assert_eq!(outcome.round, 5);
        assert_eq!(outcome.progression, Progression::GameOver);
        assert_eq!(session.game().round, 6);
        assert!(!session.game().round_active);

        // Terminal until reconfigured
        assert_eq!(
            session.process_round(GM, Rates::default()),
            Err(SettleError::GameOver)
        );
        assert_eq!(session.game().round, 6);
    }

    #[test]
    fn test_results_carry_rates_and_freq() {
        let mut session = session();
        let player = ConnectionId::from_u128(1);
        session.register_player(player, None);
        let rates = Rates::new(3.0, 4.0, 5.0);
        let outcome = session.process_round(GM, rates).unwrap();
        assert_eq!(outcome.results.len(), 1);
        let (id, result) = &outcome.results[0];
        assert_eq!(*id, player);
        assert_eq!(result.round, 1);
        assert_eq!(result.rates, rates);
        assert_eq!(result.freq, 12);
        assert_eq!(result.gain, 0.0);
    }

    #[test]
    fn test_overflowing_rate_commits_nothing() {
        let mut session = session();
        let investor = ConnectionId::from_u128(1);
        let idle = ConnectionId::from_u128(2);
        session.register_player(investor, Some("Alice"));
        session.register_player(idle, Some("Bob"));
        session
            .submit_allocation(investor, Allocation::new(100.0, 0.0, 0.0))
            .unwrap();

        assert_eq!(
            session.process_round(GM, Rates::new(1e300, 0.0, 0.0)),
            Err(SettleError::InvalidRate)
        );
        assert_eq!(session.game().round, 1);
        for ledger in session.players().values() {
            assert_eq!(ledger.history, vec![INITIAL_BALANCE]);
        }
        assert!(session.player(investor).unwrap().submitted);

        // The next round settles normally and idle cash stays put
        let outcome = session.process_round(GM, Rates::new(0.0, 0.0, 0.0)).unwrap();
        for (_, result) in &outcome.results {
            assert_eq!(result.gain, 0.0);
            assert_eq!(result.new_balance, INITIAL_BALANCE);
        }
        for ledger in session.players().values() {
            assert!(ledger.balance.is_finite() && ledger.balance >= 0.0);
        }
    }
}
