//! Run-wide capital invariants.

use floodgate_core::{ConsistencyError, Sats, SimTime};

/// Bounds on the capital a topology may lock at any observation point.
///
/// Locked capital is unsigned, so the lower bound is enforced where balances
/// are debited. This check covers the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapitalBounds {
    ceiling: Sats,
}

impl CapitalBounds {
    /// Creates bounds with the given ceiling.
    pub fn new(ceiling: Sats) -> Self {
        Self { ceiling }
    }

    /// Configured ceiling.
    pub fn ceiling(&self) -> Sats {
        self.ceiling
    }

    /// Checks one snapshot.
    ///
    /// # Errors
    ///
    /// - `ConsistencyError::LockedCapitalExceedsCeiling` - If `locked` is above the ceiling
    pub fn check(&self, time: SimTime, locked: Sats) -> Result<(), ConsistencyError> {
        if locked > self.ceiling {
            return Err(ConsistencyError::LockedCapitalExceedsCeiling {
                time,
                locked,
                ceiling: self.ceiling,
            });
        }
        Ok(())
    }
}

/// Debits `amount` from `balance`, failing instead of wrapping.
///
/// # Errors
///
/// - `ConsistencyError::BalanceUnderflow` - If `balance` is below `amount`
pub(crate) fn debit(
    balance: &mut Sats,
    amount: Sats,
    time: SimTime,
    context: impl FnOnce() -> String,
) -> Result<(), ConsistencyError> {
    let current = *balance;
    let Some(rest) = current.checked_sub(amount) else {
        return Err(ConsistencyError::BalanceUnderflow {
            time,
            context: context(),
            amount,
            balance: current,
        });
    };
    *balance = rest;
    Ok(())
}
