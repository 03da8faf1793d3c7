// Pool operations: structural (tuple-keyed) pools, reserve bookkeeping, read-only quotes.

use crate::error::StructuralError;
use crate::state::LedgerState;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub token_x: usize,
    pub token_y: usize,
    pub lp_token: usize,
    pub reserve_x: f64,
    pub reserve_y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolSide {
    X,
    Y,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwapQuote {
    pub token_in: usize,
    pub token_out: usize,
    pub amount_in: f64,
    pub amount_out: f64,
    pub fee: f64,
}

/// A wallet's claim on one pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LpPosition {
    pub pool_index: usize,
    pub lp_amount: f64,
    pub share_percent: f64,
    pub amount_x: f64,
    pub amount_y: f64,
}

impl LiquidityPool {
    pub fn new(token_x: usize, token_y: usize, lp_token: usize) -> Self {
        LiquidityPool {
            token_x,
            token_y,
            lp_token,
            reserve_x: 0.0,
            reserve_y: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reserve_x <= 0.0 || self.reserve_y <= 0.0
    }

    pub fn side_of(&self, token_index: usize) -> Option<PoolSide> {
        if token_index == self.token_x {
            Some(PoolSide::X)
        } else if token_index == self.token_y {
            Some(PoolSide::Y)
        } else {
            None
        }
    }

    pub fn token_on(&self, side: PoolSide) -> usize {
        match side {
            PoolSide::X => self.token_x,
            PoolSide::Y => self.token_y,
        }
    }

    pub fn reserve(&self, side: PoolSide) -> f64 {
        match side {
            PoolSide::X => self.reserve_x,
            PoolSide::Y => self.reserve_y,
        }
    }

    /// Amount of the opposite token that keeps the reserve ratio; 1:1 into an empty pool.
    pub fn counter_amount(&self, side: PoolSide, amount: f64) -> f64 {
        if self.is_empty() {
            return amount;
        }
        match side {
            PoolSide::X => amount * self.reserve_y / self.reserve_x,
            PoolSide::Y => amount * self.reserve_x / self.reserve_y,
        }
    }

    pub fn add_liquidity(&mut self, amount_x: f64, amount_y: f64) -> Result<(), StructuralError> {
        for amount in [amount_x, amount_y] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(StructuralError::InvalidAmount(amount));
            }
        }
        self.reserve_x += amount_x;
        self.reserve_y += amount_y;
        Ok(())
    }

    /// Subtracts shares and clamps each reserve at zero. Callers that must not
    /// over-withdraw check against the reserves first.
    pub fn remove_liquidity(&mut self, share_x: f64, share_y: f64) {
        self.reserve_x = (self.reserve_x - share_x).max(0.0);
        self.reserve_y = (self.reserve_y - share_y).max(0.0);
    }

    /// Constant-product quote; never mutates reserves.
    pub fn quote_swap(&self, token_in: usize, amount_in: f64, fee_bps: u32) -> Option<SwapQuote> {
        let side = self.side_of(token_in)?;
        if self.is_empty() || !amount_in.is_finite() || amount_in <= 0.0 {
            return None;
        }
        let (reserve_in, reserve_out, token_out) = match side {
            PoolSide::X => (self.reserve_x, self.reserve_y, self.token_y),
            PoolSide::Y => (self.reserve_y, self.reserve_x, self.token_x),
        };
        let fee = amount_in * f64::from(fee_bps) / 10_000.0;
        let net_in = amount_in - fee;
        let amount_out = reserve_out * net_in / (reserve_in + net_in);
        Some(SwapQuote {
            token_in,
            token_out,
            amount_in,
            amount_out,
            fee,
        })
    }
}

impl LedgerState {
    /// Linear scan on the exact (x, y, lp) triple; appended if absent.
    pub fn ensure_pool(
        &mut self,
        token_x: usize,
        token_y: usize,
        lp_token: usize,
    ) -> (&mut LiquidityPool, usize) {
        let index = match self
            .pools
            .iter()
            .position(|p| p.token_x == token_x && p.token_y == token_y && p.lp_token == lp_token)
        {
            Some(index) => index,
            None => {
                self.pools.push(LiquidityPool::new(token_x, token_y, lp_token));
                self.pools.len() - 1
            }
        };
        (&mut self.pools[index], index)
    }

    pub fn get_pool(&self, index: usize) -> Option<&LiquidityPool> {
        self.pools.get(index)
    }

    /// Pool trading the pair in either orientation.
    pub fn pool_for_pair(&self, a: usize, b: usize) -> Option<usize> {
        self.pools.iter().position(|p| {
            (p.token_x == a && p.token_y == b) || (p.token_x == b && p.token_y == a)
        })
    }

    pub fn lp_positions(&self, address: &str) -> Vec<LpPosition> {
        let Some(wallet) = self.get_wallet(address) else {
            return Vec::new();
        };
        self.pools
            .iter()
            .enumerate()
            .filter_map(|(pool_index, pool)| {
                let lp_amount = wallet.balance(pool.lp_token);
                let supply = self.lp_supply(pool.lp_token);
                if lp_amount <= 0.0 || supply <= 0.0 {
                    return None;
                }
                let share = lp_amount / supply;
                Some(LpPosition {
                    pool_index,
                    lp_amount,
                    share_percent: share * 100.0,
                    amount_x: pool.reserve_x * share,
                    amount_y: pool.reserve_y * share,
                })
            })
            .collect()
    }
}
