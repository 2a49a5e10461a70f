//! Credit ledger interface
//!
//! Credit and its refresh are owned by account/billing; the engine
//! only reads and decrements. `try_consume` is the atomic path the
//! credit gate uses: the check and the increment happen under one
//! lock, so two concurrent run starts cannot both pass on a single
//! remaining credit.

use priorart_core::{AdmissionError, CreditSnapshot, PersistenceError, UserId};
use std::collections::HashMap;
use std::sync::Mutex;

pub trait CreditLedger: Send + Sync {
    /// Current usage for a user. Unknown users read as zero credit.
    fn get_remaining(&self, user_id: UserId) -> Result<CreditSnapshot, PersistenceError>;

    /// Raise `used` by `amount` without an admission check. Billing
    /// callbacks use this; the engine does not.
    fn increment(&self, user_id: UserId, amount: u32) -> Result<(), PersistenceError>;

    /// Atomically check remaining credit and consume one unit.
    /// Returns the snapshot after the decrement.
    fn try_consume(&self, user_id: UserId) -> Result<CreditSnapshot, AdmissionError>;
}

/// Mutex-guarded in-memory ledger.
#[derive(Default)]
pub struct InMemoryCreditLedger {
    accounts: Mutex<HashMap<UserId, CreditSnapshot>>,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's total credit allowance (used count is preserved).
    pub fn grant(&self, user_id: UserId, total: u32) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let entry = accounts.entry(user_id).or_insert(CreditSnapshot { total: 0, used: 0 });
        entry.total = total;
    }
}

impl CreditLedger for InMemoryCreditLedger {
    fn get_remaining(&self, user_id: UserId) -> Result<CreditSnapshot, PersistenceError> {
        let accounts = self.accounts.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(accounts.get(&user_id).copied().unwrap_or(CreditSnapshot { total: 0, used: 0 }))
    }

    fn increment(&self, user_id: UserId, amount: u32) -> Result<(), PersistenceError> {
        let mut accounts = self.accounts.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        let entry = accounts.entry(user_id).or_insert(CreditSnapshot { total: 0, used: 0 });
        entry.used = entry.used.saturating_add(amount);
        Ok(())
    }

    fn try_consume(&self, user_id: UserId) -> Result<CreditSnapshot, AdmissionError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let entry = accounts.entry(user_id).or_insert(CreditSnapshot { total: 0, used: 0 });

        if entry.used >= entry.total {
            return Err(AdmissionError::InsufficientCredit {
                user_id,
                total: entry.total,
                used: entry.used,
            });
        }

        entry.used += 1;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn consume_decrements_exactly_one() {
        let ledger = InMemoryCreditLedger::new();
        let user = priorart_core::new_entity_id();
        ledger.grant(user, 2);

        let after = ledger.try_consume(user).expect("credit available");
        assert_eq!(after.used, 1);
        assert_eq!(after.remaining(), 1);
    }

    #[test]
    fn exhausted_user_is_refused() {
        let ledger = InMemoryCreditLedger::new();
        let user = priorart_core::new_entity_id();
        ledger.grant(user, 1);

        ledger.try_consume(user).expect("first run");
        assert!(matches!(
            ledger.try_consume(user),
            Err(AdmissionError::InsufficientCredit { used: 1, total: 1, .. })
        ));
    }

    #[test]
    fn unknown_user_has_no_credit() {
        let ledger = InMemoryCreditLedger::new();
        assert!(ledger.try_consume(priorart_core::new_entity_id()).is_err());
    }

    #[test]
    fn concurrent_consumers_never_overdraw() {
        let ledger = Arc::new(InMemoryCreditLedger::new());
        let user = priorart_core::new_entity_id();
        ledger.grant(user, 5);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.try_consume(user).is_ok())
            })
            .collect();

        let successes =
            handles.into_iter().map(|h| h.join().unwrap_or(false)).filter(|&ok| ok).count();
        assert_eq!(successes, 5);

        let snapshot = ledger.get_remaining(user).expect("read");
        assert_eq!(snapshot.used, 5);
        assert!(snapshot.used <= snapshot.total);
    }
}
