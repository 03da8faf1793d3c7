// Single-writer ledger: deterministic, in-memory, audit-first.

pub mod chain;
pub mod codec;
pub mod config;
pub mod digest;
pub mod energy;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod pool;
pub mod staking;
pub mod state;
pub mod storage;
pub mod tx;
pub mod validator;

pub use chain::{Block, seal_hash};
pub use config::{LedgerConfig, LedgerParams};
pub use energy::compute_energy;
pub use error::{ChainIntegrityError, LedgerError, ReplayError, StateError, StructuralError};
pub use handle::LedgerHandle;
pub use state::{Ledger, LedgerState, TokenKind, TokenType, Wallet};
pub use tx::{Transaction, TxKind};
pub use validator::{validate_ledger, verify_replay};

// No randomness or wall clock access; timestamps are injected by the caller.

/*
Intentionally avoids:
- async
- global mutable state
- network IO
*/
