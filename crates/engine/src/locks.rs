//! Per-account serialization of ledger writes.
//!
//! Every operation that moves money on an account holds that account's lock
//! for the whole write-set. Operations on disjoint accounts run in parallel.

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{sync::OwnedMutexGuard, time::Instant};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

type Slots = Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>;

#[derive(Debug)]
pub(crate) struct AccountLocks {
    timeout: Duration,
    slots: Slots,
}

/// Held locks. Released on drop, and slots nobody else waits on are
/// removed from the registry.
#[derive(Debug)]
pub(crate) struct AccountGuards {
    registry: Slots,
    accounts: BTreeSet<Uuid>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountGuards {
    /// `true` when every id in `accounts` is held by these guards.
    pub(crate) fn covers<'a, I>(&self, accounts: I) -> bool
    where
        I: IntoIterator<Item = &'a Uuid>,
    {
        accounts.into_iter().all(|id| self.accounts.contains(id))
    }
}

impl Drop for AccountGuards {
    fn drop(&mut self) {
        self.guards.clear();
        let mut slots = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        for account_id in &self.accounts {
            // The map holds the only reference once no guard or waiter does.
            if slots
                .get(account_id)
                .is_some_and(|slot| Arc::strong_count(slot) == 1)
            {
                slots.remove(account_id);
            }
        }
    }
}

impl AccountLocks {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slots: Arc::default(),
        }
    }

    fn slot(&self, account_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(account_id).or_default().clone()
    }

    /// Acquires the locks of every given account.
    ///
    /// Locks are taken in ascending id order so two operations touching the
    /// same pair of accounts cannot deadlock. The timeout covers the whole
    /// acquisition.
    pub(crate) async fn acquire<I>(&self, accounts: I) -> ResultEngine<AccountGuards>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let ordered: Vec<Uuid> = accounts
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let deadline = Instant::now() + self.timeout;
        let mut held = AccountGuards {
            registry: Arc::clone(&self.slots),
            accounts: ordered.iter().copied().collect(),
            guards: Vec::with_capacity(ordered.len()),
        };
        for account_id in ordered {
            let slot = self.slot(account_id);
            match tokio::time::timeout_at(deadline, slot.lock_owned()).await {
                Ok(guard) => held.guards.push(guard),
                Err(_) => {
                    tracing::warn!(%account_id, "account lock timed out");
                    return Err(EngineError::LockTimeout(format!(
                        "account {account_id} is busy"
                    )));
                }
            }
        }
        Ok(held)
    }

    #[cfg(test)]
    fn registered(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = AccountLocks::new(Duration::from_millis(20));
        let account = Uuid::new_v4();

        let held = locks.acquire([account]).await.unwrap();
        let err = locks.acquire([account]).await.unwrap_err();
        assert!(matches!(err, EngineError::LockTimeout(_)));
        assert!(err.is_retryable());

        drop(held);
        assert!(locks.acquire([account]).await.is_ok());
    }

    #[tokio::test]
    async fn disjoint_accounts_do_not_block() {
        let locks = AccountLocks::new(Duration::from_millis(20));
        let _a = locks.acquire([Uuid::new_v4()]).await.unwrap();
        assert!(locks.acquire([Uuid::new_v4()]).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_ids_lock_once() {
        let locks = AccountLocks::new(Duration::from_millis(20));
        let account = Uuid::new_v4();
        let guards = locks.acquire([account, account]).await.unwrap();
        assert!(guards.covers([&account]));
        assert!(!guards.covers([&Uuid::new_v4()]));
    }

    #[tokio::test]
    async fn released_slots_leave_the_registry() {
        let locks = AccountLocks::new(Duration::from_millis(20));
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let held = locks.acquire([a, b]).await.unwrap();
        assert_eq!(locks.registered(), 2);
        assert!(locks.acquire([a]).await.is_err());
        assert_eq!(locks.registered(), 2);

        drop(held);
        assert_eq!(locks.registered(), 0);

        let again = locks.acquire([b]).await.unwrap();
        assert_eq!(locks.registered(), 1);
        drop(again);
        assert_eq!(locks.registered(), 0);
    }
}
