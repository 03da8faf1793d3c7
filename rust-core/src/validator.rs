// Validator: read-only, fail-fast re-verification of a full ledger snapshot.
// Check order is fixed: tokens, wallets, pools, stakes, chain structure, transactions.

use crate::chain::{Block, find_duplicate, seal_hash};
use crate::digest::ZERO_HASH;
use crate::energy::compute_energy;
use crate::engine::check_structure;
use crate::error::{ChainIntegrityError, LedgerError, ReplayError, StateError, StructuralError};
use crate::state::{Ledger, LedgerState, is_valid_symbol};
use crate::tx::is_well_formed_address;
use std::collections::HashSet;
use tracing::{debug, warn};

pub fn validate_ledger(ledger: &Ledger) -> Result<(), LedgerError> {
    let result = check_ledger(ledger);
    match &result {
        Ok(()) => debug!(blocks = ledger.blocks.len(), "ledger validated"),
        Err(e) => warn!(error = %e, "ledger validation failed"),
    }
    result
}

fn check_ledger(ledger: &Ledger) -> Result<(), LedgerError> {
    check_tokens(&ledger.state)?;
    check_wallets(&ledger.state)?;
    check_pools(&ledger.state)?;
    check_stakes(&ledger.state)?;
    check_chain(ledger)?;
    check_transactions(ledger)?;
    Ok(())
}

fn check_tokens(state: &LedgerState) -> Result<(), StructuralError> {
    let mut seen = HashSet::with_capacity(state.token_types.len());
    for token in &state.token_types {
        if !seen.insert(token.symbol.as_str()) {
            return Err(StructuralError::DuplicateSymbol(token.symbol.clone()));
        }
        if !is_valid_symbol(&token.symbol) {
            return Err(StructuralError::InvalidSymbol(token.symbol.clone()));
        }
        if !(0.0..=1.0).contains(&token.energy_binding_factor) {
            return Err(StructuralError::InvalidBindingFactor {
                symbol: token.symbol.clone(),
                factor: token.energy_binding_factor,
            });
        }
    }
    Ok(())
}

fn check_wallets(state: &LedgerState) -> Result<(), LedgerError> {
    let count = state.token_count();
    let mut seen = HashSet::with_capacity(state.wallets.len());
    for wallet in &state.wallets {
        if !is_well_formed_address(&wallet.address) {
            return Err(StructuralError::MalformedAddress(wallet.address.clone()).into());
        }
        if !seen.insert(wallet.address.as_str()) {
            return Err(StructuralError::DuplicateWallet(wallet.address.clone()).into());
        }
        if wallet.balances.len() != count {
            return Err(StructuralError::BalanceVectorLength {
                address: wallet.address.clone(),
                expected: count,
                actual: wallet.balances.len(),
            }
            .into());
        }
        if let Some((token_index, &balance)) = wallet
            .balances
            .iter()
            .enumerate()
            .find(|(_, b)| !b.is_finite() || **b < 0.0)
        {
            return Err(StateError::NegativeBalance {
                address: wallet.address.clone(),
                token_index,
                balance,
            }
            .into());
        }
    }
    Ok(())
}

fn check_pools(state: &LedgerState) -> Result<(), StateError> {
    let count = state.token_count();
    for (pool_index, pool) in state.pools.iter().enumerate() {
        for token_index in [pool.token_x, pool.token_y, pool.lp_token] {
            if token_index >= count {
                return Err(StateError::PoolIndexInvalid {
                    pool: pool_index,
                    token_index,
                    count,
                });
            }
        }
        for reserve in [pool.reserve_x, pool.reserve_y] {
            if !reserve.is_finite() || reserve < 0.0 {
                return Err(StateError::NegativeReserve {
                    pool: pool_index,
                    reserve,
                });
            }
        }
    }
    Ok(())
}

fn check_stakes(state: &LedgerState) -> Result<(), StateError> {
    let count = state.token_count();
    for (position, stake) in state.stakes.iter().enumerate() {
        if !is_well_formed_address(&stake.owner) {
            return Err(StateError::StakeOwnerInvalid {
                position,
                owner: stake.owner.clone(),
            });
        }
        if stake.token_index >= count {
            return Err(StateError::StakeTokenInvalid {
                position,
                token_index: stake.token_index,
                count,
            });
        }
        let bad = |v: f64| !v.is_finite() || v < 0.0;
        if bad(stake.amount) || bad(stake.rewards) {
            return Err(StateError::NegativeStake {
                position,
                amount: stake.amount,
                rewards: stake.rewards,
            });
        }
        if stake.lock_until < stake.start {
            return Err(StateError::StakeTimeInconsistent {
                position,
                start: stake.start,
                lock_until: stake.lock_until,
            });
        }
    }
    Ok(())
}

fn check_chain(ledger: &Ledger) -> Result<(), ChainIntegrityError> {
    let Some(genesis) = ledger.blocks.first() else {
        return Err(ChainIntegrityError::NoBlocks);
    };
    if genesis.prev_hash != ZERO_HASH {
        return Err(ChainIntegrityError::GenesisPrevHash);
    }
    let mut prev: Option<&Block> = None;
    for (position, block) in ledger.blocks.iter().enumerate() {
        let expected = position as u32;
        if block.index != expected {
            return Err(ChainIntegrityError::IndexSequence {
                expected,
                found: block.index,
            });
        }
        if let Some(prev) = prev {
            if block.prev_hash != prev.hash {
                return Err(ChainIntegrityError::PrevHashMismatch { index: block.index });
            }
            if block.timestamp < prev.timestamp {
                return Err(ChainIntegrityError::NonMonotonicTimestamp {
                    index: block.index,
                    previous: prev.timestamp,
                    found: block.timestamp,
                });
            }
        }
        if seal_hash(block) != block.hash {
            return Err(ChainIntegrityError::HashMismatch { index: block.index });
        }
        prev = Some(block);
    }
    Ok(())
}

fn check_transactions(ledger: &Ledger) -> Result<(), LedgerError> {
    let count = ledger.state.token_count();
    for block in &ledger.blocks {
        for (position, tx) in block.transactions.iter().enumerate() {
            check_structure(tx, count)?;
            if !tx.energy.is_finite() || tx.energy < 0.0 {
                return Err(StructuralError::InvalidEnergy(tx.energy).into());
            }
            let recomputed = compute_energy(tx);
            if tx.energy != recomputed {
                return Err(ChainIntegrityError::EnergyMismatch {
                    index: block.index,
                    position,
                    stored: tx.energy,
                    recomputed,
                }
                .into());
            }
        }
        if let Some((first, second)) = find_duplicate(&block.transactions) {
            return Err(ReplayError::DuplicateFingerprint {
                index: block.index,
                first,
                second,
            }
            .into());
        }
    }
    Ok(())
}

/// Re-derive the whole state by replaying every block on an empty ledger
/// with the same parameters, then compare against what is stored.
pub fn verify_replay(ledger: &Ledger) -> Result<(), LedgerError> {
    validate_ledger(ledger)?;
    let mut params = ledger.params.clone();
    if let Some(genesis) = ledger.blocks.first() {
        params.genesis_timestamp = genesis.timestamp;
    }
    let mut replayed = Ledger::with_params(params);
    replayed.create_genesis()?;
    for block in ledger.blocks.iter().skip(1) {
        replayed.append_block(block.transactions.clone(), block.timestamp)?;
    }

    if replayed.blocks != ledger.blocks {
        return Err(ChainIntegrityError::StateDivergence("blocks").into());
    }
    let (ours, theirs) = (&replayed.state, &ledger.state);
    if ours.token_types != theirs.token_types {
        return Err(ChainIntegrityError::StateDivergence("token types").into());
    }
    if ours.wallets != theirs.wallets {
        return Err(LedgerError::Chain(ChainIntegrityError::StateDivergence("wallets")));
    }
    if ours.pools != theirs.pools {
        return Err(ChainIntegrityError::StateDivergence("pools").into());
    }
    if ours.stakes != theirs.stakes {
        return Err(ChainIntegrityError::StateDivergence("stakes").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{build_mint, build_transfer};

    fn sample() -> Ledger {
        let mut l = Ledger::new();
        l.create_genesis().unwrap();
        l.append_block(vec![build_mint("W1", 100.0, 0, "")], 10).unwrap();
        l.append_block(vec![build_transfer("W1", "W2", 40.0, 0, "")], 20).unwrap();
        l
    }

    #[test]
    fn accepts_built_ledger() {
        let l = sample();
        assert_eq!(validate_ledger(&l), Ok(()));
        assert_eq!(verify_replay(&l), Ok(()));
    }

    #[test]
    fn empty_ledger_has_no_blocks() {
        assert_eq!(
            validate_ledger(&Ledger::new()),
            Err(LedgerError::Chain(ChainIntegrityError::NoBlocks))
        );
    }

    #[test]
    fn duplicate_symbol_checked_first() {
        let mut l = sample();
        l.state.token_types[2].symbol = "TTTC".into();
        l.state.wallets[0].balances[0] = -1.0;
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::Structural(StructuralError::DuplicateSymbol(
                "TTTC".into()
            )))
        );
    }

    #[test]
    fn negative_balance_detected() {
        let mut l = sample();
        l.state.wallets[1].balances[0] = -0.5;
        assert!(matches!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::NegativeBalance { token_index: 0, .. }))
        ));
    }

    #[test]
    fn short_balance_vector_detected() {
        let mut l = sample();
        l.state.wallets[0].balances.pop();
        assert!(matches!(
            validate_ledger(&l),
            Err(LedgerError::Structural(StructuralError::BalanceVectorLength { .. }))
        ));
    }

    #[test]
    fn pool_and_stake_fields_checked() {
        let mut l = sample();
        let (pool, _) = l.state.ensure_pool(0, 1, 9);
        pool.reserve_x = 1.0;
        assert!(matches!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::PoolIndexInvalid { token_index: 9, .. }))
        ));

        let mut l = sample();
        l.state.open_stake("W1", 0, 1.0, 10, 5);
        l.state.stakes[0].lock_until = 9;
        assert!(matches!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::StakeTimeInconsistent { .. }))
        ));
    }

    #[test]
    fn binding_factor_out_of_range() {
        let mut l = sample();
        l.state.token_types[1].energy_binding_factor = 1.5;
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::Structural(StructuralError::InvalidBindingFactor {
                symbol: "ELTT".into(),
                factor: 1.5,
            }))
        );
    }

    #[test]
    fn malformed_wallet_address() {
        let mut l = sample();
        l.state.wallets[1].address = "W\n2".into();
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::Structural(StructuralError::MalformedAddress("W\n2".into())))
        );
    }

    #[test]
    fn duplicate_wallet_address() {
        let mut l = sample();
        l.state.wallets[1].address = "W1".into();
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::Structural(StructuralError::DuplicateWallet("W1".into())))
        );
    }

    #[test]
    fn negative_reserve_reported_before_stakes() {
        let mut l = sample();
        let (pool, _) = l.state.ensure_pool(0, 1, 2);
        pool.reserve_y = -3.0;
        l.state.open_stake("W1", 0, 1.0, 10, 5);
        l.state.stakes[0].owner = String::new();
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::NegativeReserve { pool: 0, reserve: -3.0 }))
        );
    }

    #[test]
    fn stake_owner_must_be_an_address() {
        let mut l = sample();
        l.state.open_stake("W1", 0, 1.0, 10, 5);
        l.state.stakes[0].owner = String::new();
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::StakeOwnerInvalid {
                position: 0,
                owner: String::new(),
            }))
        );
    }

    #[test]
    fn stake_token_in_range() {
        let mut l = sample();
        l.state.open_stake("W1", 0, 1.0, 10, 5);
        l.state.stakes[0].token_index = 7;
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::StakeTokenInvalid {
                position: 0,
                token_index: 7,
                count: 3,
            }))
        );
    }

    #[test]
    fn negative_stake_amount() {
        let mut l = sample();
        l.state.open_stake("W1", 0, 1.0, 10, 5);
        l.state.open_stake("W2", 0, 2.0, 10, 5);
        l.state.stakes[1].amount = -2.0;
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::State(StateError::NegativeStake {
                position: 1,
                amount: -2.0,
                rewards: 0.0,
            }))
        );
    }

    #[test]
    fn negative_stored_energy() {
        let mut l = sample();
        l.blocks[2].transactions[0].energy = -1.0;
        assert_eq!(
            validate_ledger(&l),
            Err(LedgerError::Structural(StructuralError::InvalidEnergy(-1.0)))
        );
    }

    #[test]
    fn forged_balance_passes_field_checks_but_fails_replay() {
        let mut l = sample();
        l.state.wallets[0].balances[0] = 1_000.0;
        assert_eq!(validate_ledger(&l), Ok(()));
        assert_eq!(
            verify_replay(&l),
            Err(LedgerError::Chain(ChainIntegrityError::StateDivergence("wallets")))
        );
    }

    #[test]
    fn altered_energy_detected() {
        let mut l = sample();
        // energy is outside the header hash, so only the recomputation catches it
        l.blocks[1].transactions[0].energy += 1.0;
        assert!(matches!(
            validate_ledger(&l),
            Err(LedgerError::Chain(ChainIntegrityError::EnergyMismatch { index: 1, position: 0, .. }))
        ));
    }
}
