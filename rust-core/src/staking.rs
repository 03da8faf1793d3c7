// Staking positions: lock, accrue, release oldest-first.

use crate::config::LedgerParams;
use crate::state::LedgerState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakingPosition {
    pub owner: String,
    pub token_index: usize,
    pub amount: f64,
    pub start: u64,
    pub lock_until: u64,
    pub rewards: f64,
}

impl StakingPosition {
    pub fn is_unlocked(&self, now: u64) -> bool {
        now >= self.lock_until
    }

    /// Simple linear accrual: amount * rate * elapsed / period.
    pub fn accrue(&mut self, elapsed: u64, params: &LedgerParams) {
        if params.reward_period == 0 || elapsed == 0 || self.amount <= 0.0 {
            return;
        }
        self.rewards += self.amount * params.reward_rate * elapsed as f64 / params.reward_period as f64;
    }

    fn is_spent(&self) -> bool {
        self.amount <= 0.0 && self.rewards <= 0.0
    }
}

impl LedgerState {
    pub fn stakes_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a StakingPosition> + 'a {
        self.stakes.iter().filter(move |s| s.owner == owner)
    }

    pub fn unlocked_stake(&self, owner: &str, token_index: usize, now: u64) -> f64 {
        self.stakes_of(owner)
            .filter(|s| s.token_index == token_index && s.is_unlocked(now))
            .map(|s| s.amount)
            .sum()
    }

    pub fn pending_rewards(&self, owner: &str, token_index: usize) -> f64 {
        self.stakes_of(owner)
            .filter(|s| s.token_index == token_index)
            .map(|s| s.rewards)
            .sum()
    }

    pub fn accrue_rewards(&mut self, elapsed: u64, params: &LedgerParams) {
        for stake in &mut self.stakes {
            stake.accrue(elapsed, params);
        }
    }

    pub(crate) fn open_stake(&mut self, owner: &str, token_index: usize, amount: f64, now: u64, lock_period: u64) {
        self.stakes.push(StakingPosition {
            owner: owner.to_string(),
            token_index,
            amount,
            start: now,
            lock_until: now.saturating_add(lock_period),
            rewards: 0.0,
        });
    }

    /// Drain unlocked principal oldest-first; returns the amount released.
    pub(crate) fn release_stake(&mut self, owner: &str, token_index: usize, amount: f64, now: u64) -> f64 {
        let mut remaining = amount;
        for stake in self
            .stakes
            .iter_mut()
            .filter(|s| s.owner == owner && s.token_index == token_index && s.is_unlocked(now))
        {
            if remaining <= 0.0 {
                break;
            }
            let take = remaining.min(stake.amount);
            stake.amount -= take;
            remaining -= take;
        }
        self.stakes.retain(|s| !s.is_spent());
        amount - remaining.max(0.0)
    }

    /// Drain accrued rewards oldest-first; returns the amount taken.
    pub(crate) fn take_rewards(&mut self, owner: &str, token_index: usize, amount: f64) -> f64 {
        let mut remaining = amount;
        for stake in self
            .stakes
            .iter_mut()
            .filter(|s| s.owner == owner && s.token_index == token_index)
        {
            if remaining <= 0.0 {
                break;
            }
            let take = remaining.min(stake.rewards);
            stake.rewards -= take;
            remaining -= take;
        }
        self.stakes.retain(|s| !s.is_spent());
        amount - remaining.max(0.0)
    }
}
