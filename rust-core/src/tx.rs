// Transactions: closed kind taxonomy, pure builders, address and memo shaping.
// Builders never fail; an invalid token index is carried through and rejected by validation.

use crate::error::StructuralError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_MEMO_BYTES: usize = 128;
pub const MAX_ADDRESS_BYTES: usize = 64;

/// Token index carried by transactions that reference no token.
pub const NO_TOKEN: i32 = -1;

const POOL_ADDRESS_PREFIX: &str = "pool:";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    Transfer,
    Mint,
    Burn,
    CreateToken,
    CreatePool,
    AddLiquidity,
    RemoveLiquidity,
    Stake,
    Unstake,
    ClaimRewards,
    Swap,
    ProfileUpdate,
    GovernanceProposal,
}

impl TxKind {
    pub const ALL: [TxKind; 13] = [
        TxKind::Transfer,
        TxKind::Mint,
        TxKind::Burn,
        TxKind::CreateToken,
        TxKind::CreatePool,
        TxKind::AddLiquidity,
        TxKind::RemoveLiquidity,
        TxKind::Stake,
        TxKind::Unstake,
        TxKind::ClaimRewards,
        TxKind::Swap,
        TxKind::ProfileUpdate,
        TxKind::GovernanceProposal,
    ];

    /// Wire code used by the canonical encoding.
    pub fn code(self) -> i32 {
        match self {
            TxKind::Transfer => 0,
            TxKind::Mint => 1,
            TxKind::Burn => 2,
            TxKind::CreateToken => 3,
            TxKind::CreatePool => 4,
            TxKind::AddLiquidity => 5,
            TxKind::RemoveLiquidity => 6,
            TxKind::Stake => 7,
            TxKind::Unstake => 8,
            TxKind::ClaimRewards => 9,
            TxKind::Swap => 10,
            TxKind::ProfileUpdate => 11,
            TxKind::GovernanceProposal => 12,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, StructuralError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.code() == code)
            .ok_or(StructuralError::UnknownKind(code))
    }

    pub fn name(self) -> &'static str {
        match self {
            TxKind::Transfer => "TRANSFER",
            TxKind::Mint => "MINT",
            TxKind::Burn => "BURN",
            TxKind::CreateToken => "CREATE_TOKEN",
            TxKind::CreatePool => "CREATE_POOL",
            TxKind::AddLiquidity => "ADD_LIQUIDITY",
            TxKind::RemoveLiquidity => "REMOVE_LIQUIDITY",
            TxKind::Stake => "STAKE",
            TxKind::Unstake => "UNSTAKE",
            TxKind::ClaimRewards => "CLAIM_REWARDS",
            TxKind::Swap => "SWAP",
            TxKind::ProfileUpdate => "PROFILE_UPDATE",
            TxKind::GovernanceProposal => "GOVERNANCE_PROPOSAL",
        }
    }

    /// Kinds that may carry `NO_TOKEN` instead of a token index.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            TxKind::CreateToken | TxKind::ProfileUpdate | TxKind::GovernanceProposal
        )
    }

    /// Kinds that refuse a zero amount.
    pub fn requires_positive_amount(self) -> bool {
        matches!(
            self,
            TxKind::Transfer
                | TxKind::Swap
                | TxKind::Mint
                | TxKind::Burn
                | TxKind::Stake
                | TxKind::Unstake
                | TxKind::AddLiquidity
                | TxKind::RemoveLiquidity
        )
    }

    pub fn requires_sender(self) -> bool {
        matches!(
            self,
            TxKind::Transfer
                | TxKind::Swap
                | TxKind::Burn
                | TxKind::Stake
                | TxKind::Unstake
                | TxKind::ClaimRewards
                | TxKind::AddLiquidity
                | TxKind::RemoveLiquidity
        )
    }

    pub fn requires_recipient(self) -> bool {
        matches!(
            self,
            TxKind::Transfer
                | TxKind::Swap
                | TxKind::Mint
                | TxKind::AddLiquidity
                | TxKind::RemoveLiquidity
        )
    }

    /// Liquidity kinds address a pool, not a wallet, on the `to` side.
    pub fn targets_pool(self) -> bool {
        matches!(self, TxKind::AddLiquidity | TxKind::RemoveLiquidity)
    }
}

impl TryFrom<i32> for TxKind {
    type Error = StructuralError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub token_index: i32,
    pub kind: TxKind,
    pub memo: String,
    /// Zero until scored; set exactly once by the chain engine.
    #[serde(default)]
    pub energy: f64,
}

impl Transaction {
    pub fn new(kind: TxKind, from: &str, to: &str, amount: f64, token_index: i32, memo: &str) -> Self {
        Transaction {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            token_index,
            kind,
            memo: truncate_memo(memo),
            energy: 0.0,
        }
    }

    pub fn is_scored(&self) -> bool {
        self.energy != 0.0
    }

    /// Token position, or None for `NO_TOKEN` and other negative indices.
    pub fn token(&self) -> Option<usize> {
        usize::try_from(self.token_index).ok()
    }
}

/// Cut at the first NUL, then to at most 128 bytes on a char boundary.
pub fn truncate_memo(memo: &str) -> String {
    let memo = memo.split('\0').next().unwrap_or_default();
    if memo.len() <= MAX_MEMO_BYTES {
        return memo.to_string();
    }
    let mut end = MAX_MEMO_BYTES;
    while !memo.is_char_boundary(end) {
        end -= 1;
    }
    memo[..end].to_string()
}

/// Non-empty, at most 64 bytes, no control characters.
pub fn is_well_formed_address(address: &str) -> bool {
    !address.is_empty()
        && address.len() <= MAX_ADDRESS_BYTES
        && !address.chars().any(|c| c.is_control())
}

pub fn pool_address(index: usize) -> String {
    format!("{POOL_ADDRESS_PREFIX}{index}")
}

pub fn parse_pool_address(address: &str) -> Option<usize> {
    address.strip_prefix(POOL_ADDRESS_PREFIX)?.parse().ok()
}

pub fn build_transfer(from: &str, to: &str, amount: f64, token_index: i32, memo: &str) -> Transaction {
    Transaction::new(TxKind::Transfer, from, to, amount, token_index, memo)
}

pub fn build_swap(from: &str, to: &str, amount_in: f64, token_in_index: i32, memo: &str) -> Transaction {
    Transaction::new(TxKind::Swap, from, to, amount_in, token_in_index, memo)
}

pub fn build_add_liquidity(
    from: &str,
    pool_address: &str,
    amount_x: f64,
    token_x_index: i32,
    memo: &str,
) -> Transaction {
    Transaction::new(TxKind::AddLiquidity, from, pool_address, amount_x, token_x_index, memo)
}

pub fn build_remove_liquidity(
    from: &str,
    pool_address: &str,
    amount_lp: f64,
    lp_token_index: i32,
    memo: &str,
) -> Transaction {
    Transaction::new(TxKind::RemoveLiquidity, from, pool_address, amount_lp, lp_token_index, memo)
}

pub fn build_mint(to: &str, amount: f64, token_index: i32, memo: &str) -> Transaction {
    Transaction::new(TxKind::Mint, "", to, amount, token_index, memo)
}

pub fn build_burn(from: &str, amount: f64, token_index: i32, memo: &str) -> Transaction {
    Transaction::new(TxKind::Burn, from, "", amount, token_index, memo)
}

/// Memo carries `SYMBOL:Name`; a positive supply is credited to `issuer`.
pub fn build_create_token(issuer: &str, symbol: &str, name: &str, initial_supply: f64) -> Transaction {
    let memo = if name.is_empty() {
        symbol.to_string()
    } else {
        format!("{symbol}:{name}")
    };
    Transaction::new(TxKind::CreateToken, "", issuer, initial_supply, NO_TOKEN, &memo)
}

/// Token X rides in `token_index`, token Y in the memo.
pub fn build_create_pool(creator: &str, token_x: i32, token_y: i32) -> Transaction {
    Transaction::new(TxKind::CreatePool, creator, "", 0.0, token_x, &token_y.to_string())
}

pub fn build_stake(owner: &str, amount: f64, token_index: i32, memo: &str) -> Transaction {
    Transaction::new(TxKind::Stake, owner, "", amount, token_index, memo)
}

pub fn build_unstake(owner: &str, amount: f64, token_index: i32, memo: &str) -> Transaction {
    Transaction::new(TxKind::Unstake, owner, "", amount, token_index, memo)
}

/// An amount of zero claims everything accrued on the token.
pub fn build_claim_rewards(owner: &str, amount: f64, token_index: i32) -> Transaction {
    Transaction::new(TxKind::ClaimRewards, owner, "", amount, token_index, "")
}

pub fn build_profile_update(address: &str, memo: &str) -> Transaction {
    Transaction::new(TxKind::ProfileUpdate, address, "", 0.0, NO_TOKEN, memo)
}

pub fn build_governance_proposal(proposer: &str, memo: &str) -> Transaction {
    Transaction::new(TxKind::GovernanceProposal, proposer, "", 0.0, NO_TOKEN, memo)
}
