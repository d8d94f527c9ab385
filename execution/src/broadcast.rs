//! Translation of session mutations into outbound messages.
//!
//! Nothing here talks to a transport: every operation yields [Envelope]s that
//! the caller delivers.

use std::cmp::Ordering;
use yieldroom_types::{
    api::{Event, GmUpdate},
    ConnectionId, Standing,
};

use crate::session::SessionState;

/// Who a message is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    /// A single connection.
    Participant(ConnectionId),
    /// Whichever connection holds the facilitator role at delivery time.
    Facilitator,
    /// Every open connection, regardless of role.
    Everyone,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub audience: Audience,
    pub event: Event,
}

impl Envelope {
    pub fn participant(connection: ConnectionId, event: Event) -> Self {
        Self {
            audience: Audience::Participant(connection),
            event,
        }
    }

    pub fn everyone(event: Event) -> Self {
        Self {
            audience: Audience::Everyone,
            event,
        }
    }
}

/// Full view of the session for the facilitator.
pub fn gm_update(session: &SessionState) -> GmUpdate {
    GmUpdate {
        players: session.players().clone(),
        state: *session.game(),
        leaderboard: leaderboard(session),
    }
}

/// Facilitator snapshot envelope, or nothing when no facilitator is bound.
pub fn facilitator_snapshot(session: &SessionState) -> Option<Envelope> {
    session.facilitator()?;
    Some(Envelope {
        audience: Audience::Facilitator,
        event: Event::GmUpdate(gm_update(session)),
    })
}

/// Participants ranked by balance (highest first), ties broken by name then connection.
pub fn leaderboard(session: &SessionState) -> Vec<Standing> {
    let mut ledgers: Vec<_> = session.players().values().collect();
    ledgers.sort_by(|a, b| {
        b.balance
            .partial_cmp(&a.balance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });
    ledgers
        .into_iter()
        .zip(1u32..)
        .map(|(ledger, rank)| Standing {
            rank,
            id: ledger.id,
            name: ledger.name.clone(),
            balance: ledger.balance,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SharedSecret;

    fn conn(id: u128) -> ConnectionId {
        ConnectionId::from_u128(id)
    }

    #[test]
    fn test_no_snapshot_without_facilitator() {
        let mut session = SessionState::new(SharedSecret::new("s"));
        session.register_player(conn(1), Some("Alice"));
        assert!(facilitator_snapshot(&session).is_none());

        session.bind_facilitator(conn(2), Some("s")).unwrap();
        let envelope = facilitator_snapshot(&session).unwrap();
        assert_eq!(envelope.audience, Audience::Facilitator);
        let Event::GmUpdate(update) = envelope.event else {
            panic!("Expected gmUpdate");
        };
        assert_eq!(update.players.len(), 1);
        assert_eq!(update.state, *session.game());
    }

    #[test]
    fn test_leaderboard_order() {
        let mut session = SessionState::new(SharedSecret::new("s"));
        session.register_player(conn(1), Some("Carol"));
        session.register_player(conn(2), Some("Alice"));
        session.register_player(conn(3), Some("Bob"));
        session.players.get_mut(&conn(3)).unwrap().balance = 12_000.0;

        let board = leaderboard(&session);
        let names: Vec<_> = board.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);
        let ranks: Vec<_> = board.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }
}
