// Transaction engine: validate (read-only) and apply (mutating), dispatched by kind.
// apply assumes validate succeeded against the same state and context.

use crate::config::LedgerParams;
use crate::error::{LedgerError, StateError, StructuralError};
use crate::pool::{LiquidityPool, PoolSide};
use crate::state::{LedgerState, MAX_NAME_BYTES, TokenKind, TokenType, is_valid_symbol};
use crate::tx::{MAX_MEMO_BYTES, NO_TOKEN, Transaction, TxKind, is_well_formed_address, parse_pool_address};

/// Block-level facts a transaction is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct TxContext<'a> {
    pub timestamp: u64,
    pub params: &'a LedgerParams,
}

/// Context-free checks: memo size, amount sign, token bounds, address shape.
/// Token bounds are checked against `token_count`; structural kinds may carry `NO_TOKEN`.
pub fn check_structure(tx: &Transaction, token_count: usize) -> Result<(), StructuralError> {
    check_memo(&tx.memo)?;
    if !tx.amount.is_finite() || tx.amount < 0.0 {
        return Err(StructuralError::InvalidAmount(tx.amount));
    }
    let in_bounds = tx.token().is_some_and(|t| t < token_count);
    let structural_none = tx.kind.is_structural() && tx.token_index == NO_TOKEN;
    if !in_bounds && !structural_none {
        return Err(StructuralError::TokenIndexOutOfRange {
            index: tx.token_index,
            count: token_count,
        });
    }
    check_address(tx.kind, &tx.from, tx.kind.requires_sender(), "sender")?;
    check_address(tx.kind, &tx.to, tx.kind.requires_recipient(), "recipient")?;
    Ok(())
}

/// Memos are encoded NUL-terminated; one holding a NUL is rejected.
pub fn check_memo(memo: &str) -> Result<(), StructuralError> {
    if memo.len() > MAX_MEMO_BYTES {
        return Err(StructuralError::OversizedMemo(memo.len()));
    }
    if memo.contains('\0') {
        return Err(StructuralError::EmbeddedNul(memo.to_string()));
    }
    Ok(())
}

fn check_address(kind: TxKind, address: &str, required: bool, side: &'static str) -> Result<(), StructuralError> {
    if address.is_empty() {
        if required {
            return Err(StructuralError::MissingAddress { kind, side });
        }
        return Ok(());
    }
    if !is_well_formed_address(address) {
        return Err(StructuralError::MalformedAddress(address.to_string()));
    }
    Ok(())
}

/// `SYMBOL[:Name]`
fn parse_token_memo(memo: &str) -> Result<(&str, &str), StructuralError> {
    let (symbol, name) = memo.split_once(':').unwrap_or((memo, memo));
    if !is_valid_symbol(symbol) {
        return Err(StructuralError::InvalidSymbol(symbol.to_string()));
    }
    if name.len() > MAX_NAME_BYTES || name.chars().any(|c| c.is_control()) {
        return Err(StructuralError::MalformedMemo {
            kind: TxKind::CreateToken,
            memo: memo.to_string(),
        });
    }
    Ok((symbol, if name.is_empty() { symbol } else { name }))
}

fn parse_pool_memo(memo: &str) -> Result<usize, StructuralError> {
    memo.trim().parse().map_err(|_| StructuralError::MalformedMemo {
        kind: TxKind::CreatePool,
        memo: memo.to_string(),
    })
}

impl LedgerState {
    /// Never mutates. Returns the first violated rule.
    pub fn validate_transaction(&self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), LedgerError> {
        check_structure(tx, self.token_count())?;
        if tx.kind.requires_positive_amount() && tx.amount <= 0.0 {
            return Err(StructuralError::NonPositiveAmount(tx.kind).into());
        }
        let token = tx.token().unwrap_or_default();

        match tx.kind {
            TxKind::Transfer | TxKind::Swap | TxKind::Burn | TxKind::Stake => {
                self.require_balance(&tx.from, token, tx.amount)?;
            }
            TxKind::Mint | TxKind::ProfileUpdate | TxKind::GovernanceProposal => {}
            TxKind::CreateToken => {
                let (symbol, _) = parse_token_memo(&tx.memo)?;
                if self.find_symbol(symbol).is_some() {
                    return Err(StructuralError::DuplicateSymbol(symbol.to_string()).into());
                }
                self.check_token_room(ctx)?;
                if tx.amount > 0.0 && tx.to.is_empty() {
                    return Err(StructuralError::MissingAddress {
                        kind: tx.kind,
                        side: "recipient",
                    }
                    .into());
                }
            }
            TxKind::CreatePool => {
                let other = parse_pool_memo(&tx.memo)?;
                if other >= self.token_count() {
                    return Err(StructuralError::TokenIndexOutOfRange {
                        index: other as i32,
                        count: self.token_count(),
                    }
                    .into());
                }
                if other == token {
                    return Err(StateError::IdenticalPoolTokens(token).into());
                }
                if self.pool_for_pair(token, other).is_some() {
                    return Err(StateError::PoolExists {
                        token_x: token,
                        token_y: other,
                    }
                    .into());
                }
                self.check_token_room(ctx)?;
            }
            TxKind::AddLiquidity => {
                let (index, pool) = self.pool_by_address(&tx.to)?;
                let side = pool.side_of(token).ok_or(StateError::PoolTokenMismatch {
                    pool: index,
                    token_index: tx.token_index,
                })?;
                let counter = pool.counter_amount(side, tx.amount);
                let other = pool.token_on(opposite(side));
                self.require_balance(&tx.from, token, tx.amount)?;
                self.require_balance(&tx.from, other, counter)?;
            }
            TxKind::RemoveLiquidity => {
                let (index, pool) = self.pool_by_address(&tx.to)?;
                if token != pool.lp_token {
                    return Err(StateError::PoolTokenMismatch {
                        pool: index,
                        token_index: tx.token_index,
                    }
                    .into());
                }
                if self.lp_supply(pool.lp_token) <= 0.0 {
                    return Err(StateError::EmptyPool(index).into());
                }
                self.require_balance(&tx.from, token, tx.amount)?;
            }
            TxKind::Unstake => {
                let available = self.unlocked_stake(&tx.from, token, ctx.timestamp);
                if available < tx.amount {
                    return Err(StateError::InsufficientUnlockedStake {
                        address: tx.from.clone(),
                        token_index: token,
                        available,
                        required: tx.amount,
                    }
                    .into());
                }
            }
            TxKind::ClaimRewards => {
                let available = self.pending_rewards(&tx.from, token);
                let required = if tx.amount == 0.0 { available } else { tx.amount };
                if available <= 0.0 || available < required {
                    return Err(StateError::InsufficientRewards {
                        address: tx.from.clone(),
                        token_index: token,
                        available,
                        required,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Applies the effects of an already validated transaction. Participants
    /// get wallets lazily; pool addresses never become wallets.
    pub fn apply_transaction(&mut self, tx: &Transaction, ctx: &TxContext<'_>) -> Result<(), LedgerError> {
        if !tx.from.is_empty() {
            self.ensure_wallet(&tx.from)?;
        }
        if !tx.to.is_empty() && !tx.kind.targets_pool() {
            self.ensure_wallet(&tx.to)?;
        }
        let token = tx.token().unwrap_or_default();

        match tx.kind {
            TxKind::Transfer | TxKind::Swap => {
                self.debit(&tx.from, token, tx.amount)?;
                self.credit(&tx.to, token, tx.amount)?;
            }
            TxKind::Mint => self.credit(&tx.to, token, tx.amount)?,
            TxKind::Burn => self.debit(&tx.from, token, tx.amount)?,
            TxKind::CreateToken => {
                let (symbol, name) = parse_token_memo(&tx.memo)?;
                let index = self.register_token(TokenType::new(
                    symbol,
                    name,
                    TokenKind::Generic,
                    ctx.params.energy_binding_factor,
                ));
                if tx.amount > 0.0 {
                    self.credit(&tx.to, index, tx.amount)?;
                }
            }
            TxKind::CreatePool => {
                let other = parse_pool_memo(&tx.memo)?;
                let symbol = format!("LP-{token}-{other}");
                let name = format!(
                    "{}/{} LP",
                    self.token(token).map(|t| t.symbol.as_str()).unwrap_or("?"),
                    self.token(other).map(|t| t.symbol.as_str()).unwrap_or("?"),
                );
                let lp = self.register_token(TokenType::new(
                    &symbol,
                    &name,
                    TokenKind::LiquidityProvider,
                    ctx.params.energy_binding_factor,
                ));
                self.ensure_pool(token, other, lp);
            }
            TxKind::AddLiquidity => {
                let (index, pool) = self.pool_by_address(&tx.to)?;
                let side = pool.side_of(token).ok_or(StateError::PoolTokenMismatch {
                    pool: index,
                    token_index: tx.token_index,
                })?;
                let counter = pool.counter_amount(side, tx.amount);
                let other = pool.token_on(opposite(side));
                let lp_token = pool.lp_token;
                let supply = self.lp_supply(lp_token);
                let reserve = pool.reserve(side);
                let minted = if supply <= 0.0 || reserve <= 0.0 {
                    tx.amount
                } else {
                    tx.amount * supply / reserve
                };
                let (amount_x, amount_y) = match side {
                    PoolSide::X => (tx.amount, counter),
                    PoolSide::Y => (counter, tx.amount),
                };
                self.debit(&tx.from, token, tx.amount)?;
                self.debit(&tx.from, other, counter)?;
                self.pools[index].add_liquidity(amount_x, amount_y)?;
                self.credit(&tx.from, lp_token, minted)?;
            }
            TxKind::RemoveLiquidity => {
                let (index, pool) = self.pool_by_address(&tx.to)?;
                let supply = self.lp_supply(pool.lp_token);
                if supply <= 0.0 {
                    return Err(StateError::EmptyPool(index).into());
                }
                let share = tx.amount / supply;
                let (token_x, token_y) = (pool.token_x, pool.token_y);
                let share_x = pool.reserve_x * share;
                let share_y = pool.reserve_y * share;
                self.debit(&tx.from, token, tx.amount)?;
                self.pools[index].remove_liquidity(share_x, share_y);
                self.credit(&tx.from, token_x, share_x)?;
                self.credit(&tx.from, token_y, share_y)?;
            }
            TxKind::Stake => {
                self.debit(&tx.from, token, tx.amount)?;
                self.open_stake(&tx.from, token, tx.amount, ctx.timestamp, ctx.params.stake_lock_period);
            }
            TxKind::Unstake => {
                let released = self.release_stake(&tx.from, token, tx.amount, ctx.timestamp);
                self.credit(&tx.from, token, released)?;
            }
            TxKind::ClaimRewards => {
                let requested = if tx.amount == 0.0 {
                    self.pending_rewards(&tx.from, token)
                } else {
                    tx.amount
                };
                let taken = self.take_rewards(&tx.from, token, requested);
                self.credit(&tx.from, token, taken)?;
            }
            TxKind::ProfileUpdate | TxKind::GovernanceProposal => {}
        }
        Ok(())
    }

    fn pool_by_address(&self, address: &str) -> Result<(usize, &LiquidityPool), StateError> {
        parse_pool_address(address)
            .and_then(|i| self.get_pool(i).map(|p| (i, p)))
            .ok_or_else(|| StateError::UnknownPool(address.to_string()))
    }

    fn check_token_room(&self, ctx: &TxContext<'_>) -> Result<(), StructuralError> {
        if self.token_count() >= ctx.params.max_token_types {
            return Err(StructuralError::TokenLimitReached(ctx.params.max_token_types));
        }
        Ok(())
    }
}

fn opposite(side: PoolSide) -> PoolSide {
    match side {
        PoolSide::X => PoolSide::Y,
        PoolSide::Y => PoolSide::X,
    }
}
