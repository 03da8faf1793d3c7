// Chain engine: genesis, block sealing, append with atomic state transition.
// A block is committed only if every transaction in it validates and applies.

use crate::codec::{header_hash, transaction_fingerprint};
use crate::digest::{Hash, ZERO_HASH, hex_hash, to_hex};
use crate::energy::compute_energy;
use crate::engine::{TxContext, check_memo};
use crate::error::{ChainIntegrityError, LedgerError, ReplayError, StructuralError};
use crate::state::{Ledger, TokenKind, TokenType};
use crate::tx::{Transaction, build_governance_proposal};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const GENESIS_MEMO: &str = "GENESIS";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u32,
    pub timestamp: u64,
    #[serde(with = "hex_hash")]
    pub prev_hash: Hash,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    pub transactions: Vec<Transaction>,
}

/// One row of the chain overview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub index: u32,
    pub timestamp: u64,
    pub hash: String,
    pub prev_hash: String,
    pub tx_count: usize,
}

/// Recompute a block's header hash from its stored fields.
pub fn seal_hash(block: &Block) -> Hash {
    header_hash(block.index, block.timestamp, &block.prev_hash, &block.transactions)
}

/// Score every transaction whose energy is still unset.
pub fn score_transactions(transactions: &mut [Transaction]) {
    for tx in transactions.iter_mut().filter(|tx| !tx.is_scored()) {
        tx.energy = compute_energy(tx);
    }
}

/// First pair of transactions sharing a fingerprint, by position.
pub fn find_duplicate(transactions: &[Transaction]) -> Option<(usize, usize)> {
    let mut seen: HashMap<Hash, usize> = HashMap::with_capacity(transactions.len());
    for (position, tx) in transactions.iter().enumerate() {
        if let Some(first) = seen.insert(transaction_fingerprint(tx), position) {
            return Some((first, position));
        }
    }
    None
}

impl Ledger {
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Idempotent: an existing block 0 is returned untouched.
    pub fn create_genesis(&mut self) -> Result<&Block, LedgerError> {
        if !self.blocks.is_empty() {
            return Ok(&self.blocks[0]);
        }
        for kind in TokenKind::NATIVE {
            let Some(symbol) = kind.native_symbol() else {
                continue;
            };
            if self.state.find_symbol(symbol).is_none() {
                self.state.register_token(TokenType::new(
                    symbol,
                    symbol,
                    kind,
                    self.params.energy_binding_factor,
                ));
            }
        }
        let mut transactions = vec![build_governance_proposal("", GENESIS_MEMO)];
        score_transactions(&mut transactions);

        let timestamp = self.params.genesis_timestamp;
        let tokens = self.state.token_count();
        let block = self.seal(0, timestamp, ZERO_HASH, transactions);
        info!(
            tokens,
            hash = %to_hex(&block.hash),
            "created genesis block"
        );
        Ok(block)
    }

    /// Validates, applies and seals `transactions` as the next block.
    pub fn append_block(&mut self, mut transactions: Vec<Transaction>, timestamp: u64) -> Result<&Block, LedgerError> {
        let (index, prev_hash, prev_timestamp) = match self.blocks.last() {
            Some(tip) => (tip.index + 1, tip.hash, tip.timestamp),
            None => return Err(ChainIntegrityError::MissingGenesis.into()),
        };
        if transactions.len() > self.params.max_tx_per_block {
            return Err(StructuralError::TooManyTransactions {
                count: transactions.len(),
                limit: self.params.max_tx_per_block,
            }
            .into());
        }
        if timestamp < prev_timestamp {
            return Err(ChainIntegrityError::NonMonotonicTimestamp {
                index,
                previous: prev_timestamp,
                found: timestamp,
            }
            .into());
        }
        for (position, tx) in transactions.iter().enumerate() {
            check_memo(&tx.memo)?;
            if tx.is_scored() {
                let recomputed = compute_energy(tx);
                if tx.energy != recomputed {
                    return Err(ChainIntegrityError::EnergyMismatch {
                        index,
                        position,
                        stored: tx.energy,
                        recomputed,
                    }
                    .into());
                }
            }
        }
        score_transactions(&mut transactions);
        if let Some((first, second)) = find_duplicate(&transactions) {
            return Err(ReplayError::DuplicateFingerprint { index, first, second }.into());
        }

        let mut staged = self.state.clone();
        staged.accrue_rewards(timestamp - prev_timestamp, &self.params);
        let ctx = TxContext {
            timestamp,
            params: &self.params,
        };
        for (position, tx) in transactions.iter().enumerate() {
            staged
                .validate_transaction(tx, &ctx)
                .and_then(|()| staged.apply_transaction(tx, &ctx))
                .inspect_err(|e| warn!(index, position, kind = %tx.kind, error = %e, "transaction rejected"))?;
        }
        self.state = staged;

        let block = self.seal(index, timestamp, prev_hash, transactions);
        info!(
            index = block.index,
            tx_count = block.transactions.len(),
            hash = %to_hex(&block.hash),
            "sealed block"
        );
        Ok(block)
    }

    fn seal(&mut self, index: u32, timestamp: u64, prev_hash: Hash, transactions: Vec<Transaction>) -> &Block {
        let mut block = Block {
            index,
            timestamp,
            prev_hash,
            hash: ZERO_HASH,
            transactions,
        };
        block.hash = seal_hash(&block);
        debug!(index, "block hash computed");
        self.blocks.push(block);
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn chain_summary(&self) -> Vec<BlockSummary> {
        self.blocks
            .iter()
            .map(|b| BlockSummary {
                index: b.index,
                timestamp: b.timestamp,
                hash: to_hex(&b.hash),
                prev_hash: to_hex(&b.prev_hash),
                tx_count: b.transactions.len(),
            })
            .collect()
    }
}
