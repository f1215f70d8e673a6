//! Account balances
//!
//! Every account sits behind its own mutex so that mutations of one account
//! are serialized without blocking the rest of the ledger. Operations that
//! touch several accounts go through [`BalanceStore::transact`], which locks
//! them in sorted order and rolls every change back if the closure fails.

use crate::amount::Amount;
use crate::error::{LedgerError, Result};
use crate::token::{Balances, TokenClass};
use dashmap::DashMap;
use log::debug;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balances: Balances,
    /// Allowed to receive Premium rewards
    pub premium_eligible: bool,
}

impl Account {
    fn credit(&mut self, account_id: &str, class: TokenClass, amount: Amount) -> Result<Amount> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "cannot credit zero {} to {}",
                class, account_id
            )));
        }
        let balance = self.balances.get_mut(class);
        *balance = balance.checked_add(amount).ok_or_else(|| {
            LedgerError::Overflow(format!("{} balance of {}", class, account_id))
        })?;
        Ok(*balance)
    }

    fn debit(&mut self, account_id: &str, class: TokenClass, amount: Amount) -> Result<Amount> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount(format!(
                "cannot debit zero {} from {}",
                class, account_id
            )));
        }
        let balance = self.balances.get_mut(class);
        *balance = balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                account: account_id.to_string(),
                class,
                requested: amount,
                available: *balance,
            })?;
        Ok(*balance)
    }
}

#[derive(Debug, Default)]
pub struct BalanceStore {
    accounts: DashMap<String, Arc<Mutex<Account>>>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: impl IntoIterator<Item = (String, Account)>) -> Self {
        let store = Self::new();
        for (id, account) in accounts {
            store.accounts.insert(id, Arc::new(Mutex::new(account)));
        }
        store
    }

    fn handle(&self, account_id: &str) -> Arc<Mutex<Account>> {
        if let Some(handle) = self.accounts.get(account_id) {
            return Arc::clone(handle.value());
        }
        let entry = self
            .accounts
            .entry(account_id.to_string())
            .or_insert_with(|| {
                debug!("Created ledger account {}", account_id);
                Arc::new(Mutex::new(Account::default()))
            });
        Arc::clone(entry.value())
    }

    /// Liquid balance; unknown accounts read as zero and are created
    pub fn get_balance(&self, account_id: &str, class: TokenClass) -> Amount {
        *self.handle(account_id).lock().balances.get(class)
    }

    pub fn balances(&self, account_id: &str) -> Balances {
        self.handle(account_id).lock().balances
    }

    /// Returns the new balance
    pub fn credit(&self, account_id: &str, class: TokenClass, amount: Amount) -> Result<Amount> {
        self.handle(account_id)
            .lock()
            .credit(account_id, class, amount)
    }

    /// Returns the new balance; never goes below zero
    pub fn debit(&self, account_id: &str, class: TokenClass, amount: Amount) -> Result<Amount> {
        self.handle(account_id)
            .lock()
            .debit(account_id, class, amount)
    }

    pub fn set_premium_eligible(&self, account_id: &str, eligible: bool) {
        self.handle(account_id).lock().premium_eligible = eligible;
    }

    pub fn is_premium_eligible(&self, account_id: &str) -> bool {
        self.accounts
            .get(account_id)
            .map(|handle| handle.value().lock().premium_eligible)
            .unwrap_or(false)
    }

    /// Runs `f` with exclusive access to every listed account. Account changes
    /// made through the [`AccountSet`] are undone when `f` returns an error.
    pub fn transact<T, E, F>(&self, account_ids: &[&str], f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut AccountSet<'_>) -> std::result::Result<T, E>,
    {
        let mut ids = account_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let handles: Vec<(&str, Arc<Mutex<Account>>)> =
            ids.into_iter().map(|id| (id, self.handle(id))).collect();
        let entries: Vec<(&str, MutexGuard<'_, Account>)> = handles
            .iter()
            .map(|(id, handle)| (*id, handle.lock()))
            .collect();
        let before: Vec<Account> = entries.iter().map(|(_, guard)| (**guard).clone()).collect();

        let mut set = AccountSet { entries };
        let result = f(&mut set);
        if result.is_err() {
            for ((_, guard), original) in set.entries.iter_mut().zip(before) {
                **guard = original;
            }
        }
        result
    }

    pub fn total_liquid(&self, class: TokenClass) -> Amount {
        self.accounts
            .iter()
            .map(|entry| *entry.value().lock().balances.get(class))
            .fold(Amount::ZERO, Amount::saturating_add)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Copy of every account, sorted by id
    pub fn export(&self) -> Vec<(String, Account)> {
        let mut accounts: Vec<(String, Account)> = self
            .accounts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().lock().clone()))
            .collect();
        accounts.sort_by(|a, b| a.0.cmp(&b.0));
        accounts
    }
}

/// Accounts locked by [`BalanceStore::transact`]
pub struct AccountSet<'a> {
    entries: Vec<(&'a str, MutexGuard<'a, Account>)>,
}

impl AccountSet<'_> {
    fn account(&self, account_id: &str) -> Result<&Account> {
        self.entries
            .iter()
            .find(|(id, _)| *id == account_id)
            .map(|(_, guard)| &**guard)
            .ok_or_else(|| LedgerError::AccountNotLocked(account_id.to_string()))
    }

    fn account_mut(&mut self, account_id: &str) -> Result<&mut Account> {
        self.entries
            .iter_mut()
            .find(|(id, _)| *id == account_id)
            .map(|(_, guard)| &mut **guard)
            .ok_or_else(|| LedgerError::AccountNotLocked(account_id.to_string()))
    }

    pub fn balance(&self, account_id: &str, class: TokenClass) -> Result<Amount> {
        Ok(*self.account(account_id)?.balances.get(class))
    }

    pub fn balances(&self, account_id: &str) -> Result<Balances> {
        Ok(self.account(account_id)?.balances)
    }

    pub fn credit(&mut self, account_id: &str, class: TokenClass, amount: Amount) -> Result<Amount> {
        self.account_mut(account_id)?
            .credit(account_id, class, amount)
    }

    pub fn debit(&mut self, account_id: &str, class: TokenClass, amount: Amount) -> Result<Amount> {
        self.account_mut(account_id)?
            .debit(account_id, class, amount)
    }
}
