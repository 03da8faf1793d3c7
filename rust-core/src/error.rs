// Error taxonomy: structural, state, chain integrity, replay.
// Every check returns one of these; nothing is coerced or repaired.

use crate::tx::TxKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("malformed address {0:?}")]
    MalformedAddress(String),
    #[error("{kind} requires a {side} address")]
    MissingAddress { kind: TxKind, side: &'static str },
    #[error("token index {index} out of range (token count {count})")]
    TokenIndexOutOfRange { index: i32, count: usize },
    #[error("amount {0} is negative or not finite")]
    InvalidAmount(f64),
    #[error("{0} requires a positive amount")]
    NonPositiveAmount(TxKind),
    #[error("unknown transaction kind code {0}")]
    UnknownKind(i32),
    #[error("memo is {0} bytes, limit is 128")]
    OversizedMemo(usize),
    #[error("memo {0:?} contains a NUL byte")]
    EmbeddedNul(String),
    #[error("malformed {kind} memo {memo:?}")]
    MalformedMemo { kind: TxKind, memo: String },
    #[error("invalid token symbol {0:?}")]
    InvalidSymbol(String),
    #[error("duplicate token symbol {0:?}")]
    DuplicateSymbol(String),
    #[error("token {symbol:?} has binding factor {factor} outside [0, 1]")]
    InvalidBindingFactor { symbol: String, factor: f64 },
    #[error("token type limit {0} reached")]
    TokenLimitReached(usize),
    #[error("block holds {count} transactions, limit is {limit}")]
    TooManyTransactions { count: usize, limit: usize },
    #[error("energy {0} is not a finite non-negative value")]
    InvalidEnergy(f64),
    #[error("duplicate wallet {0:?}")]
    DuplicateWallet(String),
    #[error("wallet {address:?} holds {actual} balances, ledger has {expected} tokens")]
    BalanceVectorLength {
        address: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("unknown wallet {0:?}")]
    UnknownWallet(String),
    #[error("unknown pool {0:?}")]
    UnknownPool(String),
    #[error("{address:?} holds {available} of token {token_index}, needs {required}")]
    InsufficientBalance {
        address: String,
        token_index: usize,
        available: f64,
        required: f64,
    },
    #[error("{address:?} has {available} unlocked stake of token {token_index}, needs {required}")]
    InsufficientUnlockedStake {
        address: String,
        token_index: usize,
        available: f64,
        required: f64,
    },
    #[error("{address:?} has {available} claimable rewards of token {token_index}, needs {required}")]
    InsufficientRewards {
        address: String,
        token_index: usize,
        available: f64,
        required: f64,
    },
    #[error("token {token_index} is not part of pool {pool}")]
    PoolTokenMismatch { pool: usize, token_index: i32 },
    #[error("pool for tokens ({token_x}, {token_y}) already exists")]
    PoolExists { token_x: usize, token_y: usize },
    #[error("pool cannot pair token {0} with itself")]
    IdenticalPoolTokens(usize),
    #[error("pool {0} has no outstanding liquidity")]
    EmptyPool(usize),
    #[error("wallet {address:?} has balance {balance} for token {token_index}")]
    NegativeBalance {
        address: String,
        token_index: usize,
        balance: f64,
    },
    #[error("pool {pool} references token {token_index}, token count {count}")]
    PoolIndexInvalid {
        pool: usize,
        token_index: usize,
        count: usize,
    },
    #[error("pool {pool} has reserve {reserve}")]
    NegativeReserve { pool: usize, reserve: f64 },
    #[error("stake {position} has malformed owner {owner:?}")]
    StakeOwnerInvalid { position: usize, owner: String },
    #[error("stake {position} references token {token_index}, token count {count}")]
    StakeTokenInvalid {
        position: usize,
        token_index: usize,
        count: usize,
    },
    #[error("stake {position} has amount {amount} and rewards {rewards}")]
    NegativeStake {
        position: usize,
        amount: f64,
        rewards: f64,
    },
    #[error("stake {position} locks until {lock_until}, before its start {start}")]
    StakeTimeInconsistent {
        position: usize,
        start: u64,
        lock_until: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainIntegrityError {
    #[error("ledger has no blocks")]
    NoBlocks,
    #[error("genesis block missing; create it before appending")]
    MissingGenesis,
    #[error("genesis block has a non-zero previous hash")]
    GenesisPrevHash,
    #[error("expected block index {expected}, found {found}")]
    IndexSequence { expected: u32, found: u32 },
    #[error("block {index} does not link to the previous block hash")]
    PrevHashMismatch { index: u32 },
    #[error("block {index} stored hash does not match its recomputed hash")]
    HashMismatch { index: u32 },
    #[error("block {index} timestamp {found} precedes previous timestamp {previous}")]
    NonMonotonicTimestamp { index: u32, previous: u64, found: u64 },
    #[error("block {index} transaction {position} energy {stored} differs from recomputed {recomputed}")]
    EnergyMismatch {
        index: u32,
        position: usize,
        stored: f64,
        recomputed: f64,
    },
    #[error("replayed {0} diverge from the stored ledger")]
    StateDivergence(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("block {index} transactions {first} and {second} share a fingerprint")]
    DuplicateFingerprint {
        index: u32,
        first: usize,
        second: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Chain(#[from] ChainIntegrityError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures surfaced by [`crate::handle::LedgerHandle`].
#[derive(Debug, Error)]
pub enum HandleError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("ledger lock poisoned")]
    Poisoned,
}
