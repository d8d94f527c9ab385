use thiserror::Error;
use yieldroom_types::{Allocation, PlayerLedger, Rates, FULL_ALLOCATION};

use crate::returns::InterestModel;

/// Reasons an allocation is refused.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SubmitError {
    #[error("no such participant")]
    NoSuchParticipant,
    #[error("allocation must total 100")]
    BadTotal,
    #[error("allocation percentages must be between 0 and 100")]
    OutOfRange,
}

/// Check an allocation before it is stored.
///
/// The total is compared exactly: percentages are entered as whole numbers.
pub fn validate_allocation(allocation: &Allocation) -> Result<(), SubmitError> {
    if allocation.total() != FULL_ALLOCATION {
        return Err(SubmitError::BadTotal);
    }
    if allocation
        .buckets()
        .iter()
        .any(|pct| !pct.is_finite() || *pct < 0.0 || *pct > FULL_ALLOCATION)
    {
        return Err(SubmitError::OutOfRange);
    }
    Ok(())
}

/// Result of settling one ledger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settlement {
    pub gain: f64,
    pub new_balance: f64,
}

/// Compute how one ledger settles for a closing round, without touching it.
///
/// A ledger without a confirmed allocation settles as idle cash. The share of
/// the balance not assigned to a bucket is carried over unchanged.
pub fn quote(ledger: &PlayerLedger, rates: &Rates, model: InterestModel) -> Settlement {
    let allocation = if ledger.submitted {
        ledger.allocation
    } else {
        Allocation::IDLE
    };

    let balance = ledger.balance;
    let idle = balance * (FULL_ALLOCATION - allocation.total()) / FULL_ALLOCATION;
    let invested: f64 = allocation
        .buckets()
        .iter()
        .zip(rates.buckets())
        .filter(|(pct, _)| **pct != 0.0)
        .map(|(pct, rate)| model.apply(balance * pct / FULL_ALLOCATION, rate))
        .sum();

    let new_balance = idle + invested;
    Settlement {
        gain: new_balance - balance,
        new_balance,
    }
}

/// Apply a settlement produced by [quote] to the same ledger.
pub fn commit(ledger: &mut PlayerLedger, settlement: Settlement) {
    if !ledger.submitted {
        ledger.allocation = Allocation::IDLE;
    }
    ledger.balance = settlement.new_balance;
    ledger.history.push(settlement.new_balance);
    ledger.submitted = false;
}
