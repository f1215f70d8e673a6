//! Supply management and tracking

use ledger_core::{Amount, LedgerError, PerClass, Result, TierTable, TokenClass};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyStats {
    /// Cap of the class; every burn is already subtracted
    pub total_supply: Amount,
    pub circulating_supply: Amount,
    pub total_minted: Amount,
    pub total_burned: Amount,
    /// Promised to open staking positions, not yet minted
    pub reserved: Amount,
}

impl SupplyStats {
    /// What can still be minted or reserved
    pub fn remaining(&self) -> Amount {
        self.total_supply
            .saturating_sub(self.circulating_supply)
            .saturating_sub(self.reserved)
    }

    fn check_room(&self, class: TokenClass, amount: Amount) -> Result<()> {
        if amount > self.remaining() {
            return Err(LedgerError::SupplyExhausted {
                class,
                requested: amount,
                available: self.remaining(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SupplyManager {
    stats: Mutex<PerClass<SupplyStats>>,
}

impl SupplyManager {
    pub fn new(tiers: &TierTable) -> Self {
        let stats = PerClass {
            basic: SupplyStats {
                total_supply: tiers.basic.initial_supply,
                ..SupplyStats::default()
            },
            premium: SupplyStats {
                total_supply: tiers.premium.initial_supply,
                ..SupplyStats::default()
            },
        };
        Self {
            stats: Mutex::new(stats),
        }
    }

    /// Bring new tokens into circulation
    pub fn mint(&self, class: TokenClass, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("cannot mint zero".to_string()));
        }

        let mut all = self.stats.lock();
        let stats = all.get_mut(class);
        stats.check_room(class, amount)?;
        let circulating = stats
            .circulating_supply
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("{} circulating supply", class)))?;
        let minted = stats
            .total_minted
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("{} total minted", class)))?;

        stats.circulating_supply = circulating;
        stats.total_minted = minted;
        debug!("Minted {} {} ({} remaining)", amount, class, stats.remaining());
        Ok(())
    }

    /// Set aside `amount` under the cap without minting it
    pub fn reserve(&self, class: TokenClass, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut all = self.stats.lock();
        let stats = all.get_mut(class);
        stats.check_room(class, amount)?;
        stats.reserved = stats.reserved.saturating_add(amount);
        debug!("Reserved {} {} ({} remaining)", amount, class, stats.remaining());
        Ok(())
    }

    /// Return an unused reservation to the mintable supply
    pub fn release(&self, class: TokenClass, amount: Amount) {
        let mut all = self.stats.lock();
        let stats = all.get_mut(class);
        stats.reserved = stats.reserved.saturating_sub(amount);
    }

    /// Mint tokens set aside by [`SupplyManager::reserve`]. The cap was
    /// checked when the reservation was made, so only overflow can fail.
    pub fn mint_reserved(&self, class: TokenClass, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }

        let mut all = self.stats.lock();
        let stats = all.get_mut(class);
        let circulating = stats
            .circulating_supply
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("{} circulating supply", class)))?;
        let minted = stats
            .total_minted
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("{} total minted", class)))?;

        if amount > stats.reserved {
            warn!(
                "Minting {} {} against a reservation of only {}",
                amount, class, stats.reserved
            );
        }
        stats.reserved = stats.reserved.saturating_sub(amount);
        stats.circulating_supply = circulating;
        stats.total_minted = minted;
        debug!("Minted reserved {} {}", amount, class);
        Ok(())
    }

    /// Destroy tokens; total and circulating supply both shrink exactly once
    pub fn burn(&self, class: TokenClass, amount: Amount) -> Result<()> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount("cannot burn zero".to_string()));
        }

        let mut all = self.stats.lock();
        let stats = all.get_mut(class);
        let exceeds = || LedgerError::BurnExceedsSupply {
            class,
            requested: amount,
            available: stats.circulating_supply.min(stats.total_supply),
        };
        let total = stats.total_supply.checked_sub(amount).ok_or_else(exceeds)?;
        let circulating = stats
            .circulating_supply
            .checked_sub(amount)
            .ok_or_else(exceeds)?;
        let burned = stats
            .total_burned
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(format!("{} total burned", class)))?;

        stats.total_supply = total;
        stats.circulating_supply = circulating;
        stats.total_burned = burned;
        Ok(())
    }

    pub fn stats(&self, class: TokenClass) -> SupplyStats {
        *self.stats.lock().get(class)
    }

    pub fn all_stats(&self) -> PerClass<SupplyStats> {
        *self.stats.lock()
    }

    pub fn restore(&self, stats: PerClass<SupplyStats>) {
        *self.stats.lock() = stats;
    }
}
