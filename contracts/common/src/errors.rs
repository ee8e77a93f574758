//! Error Types for the Megavault Protocol
//!
//! Every failure is surfaced as a typed `VaultError`. Each variant carries a
//! stable code for logs and a category matching how callers should react.

use num_bigint::BigInt;
use thiserror::Error;

/// Result type alias for megavault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Broad class of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input, fixable by resubmitting
    Validation,
    /// Input is well formed but current state does not allow the operation
    Precondition,
    /// Caller lacks the required authority
    Authority,
    /// A computed value falls outside its target numeric range
    ArithmeticDomain,
    /// Persisted state is inconsistent
    Invariant,
    /// A collaborating module rejected the request
    Collaborator,
}

/// Main error enum for all megavault errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    // ============ Validation Errors ============
    /// Deposit amount is not positive
    #[error("deposit amount must be positive, got {amount}")]
    InvalidDepositAmount { amount: BigInt },

    /// Quote quantums of a transfer are zero
    #[error("transfer amount must be positive")]
    ZeroTransferAmount,

    /// Quoting parameters violate a bound
    #[error("invalid quoting params: {reason}")]
    InvalidQuotingParams { reason: &'static str },

    /// Vault status is unspecified
    #[error("vault status must be specified")]
    UnspecifiedVaultStatus,

    /// Vault type is unspecified or unknown
    #[error("invalid vault id: {reason}")]
    InvalidVaultId { reason: &'static str },

    /// Rational share amount is malformed
    #[error("invalid share amount: {reason}")]
    InvalidNumShares { reason: &'static str },

    /// Canonical integer bytes are malformed
    #[error("invalid serialized integer: {reason}")]
    InvalidSerializedInt { reason: &'static str },

    /// Address is unusable (e.g., zero address)
    #[error("invalid address: {reason}")]
    InvalidAddress { reason: &'static str },

    /// Genesis state failed validation
    #[error("invalid genesis state: {reason}")]
    InvalidGenesis { reason: String },

    /// Lock would push locked shares above the owner's balance
    #[error("locked shares {locked} would exceed owner shares {owned}")]
    LockedSharesExceedOwnerShares { locked: String, owned: String },

    /// Unlock requested for an owner holding no locks
    #[error("no locked shares for owner")]
    NoLockedShares,

    // ============ Precondition Errors ============
    /// Equity is zero or negative
    #[error("non-positive equity {equity}")]
    NonPositiveEquity { equity: BigInt },

    /// Oracle reports a zero price
    #[error("zero market price for market {market_id}")]
    ZeroMarketPrice { market_id: u32 },

    /// Deposit is too small to mint a whole share
    #[error("deposit mints zero shares")]
    ZeroSharesToMint,

    /// Shares to withdraw are zero or negative
    #[error("shares to withdraw must be positive")]
    NonPositiveShares,

    /// Shares to withdraw exceed the total outstanding
    #[error("shares to withdraw {requested} exceed total shares {total}")]
    InvalidSharesToWithdraw { requested: String, total: String },

    /// Shares to withdraw exceed the owner's unlocked balance
    #[error("shares to withdraw {requested} exceed unlocked shares {unlocked}")]
    LockedSharesExceedsWithdrawable { requested: String, unlocked: String },

    /// Redemption value is below the caller's floor or zero
    #[error("redeemed quote quantums {redeemed} below minimum {minimum}")]
    InsufficientRedeemedQuoteQuantums { redeemed: u64, minimum: u64 },

    /// Owner has no share record
    #[error("owner has no shares")]
    OwnerNotFound,

    /// Vault has not been allocated
    #[error("vault {vault} not found")]
    VaultNotFound { vault: String },

    /// Clob pair is unknown to the order book
    #[error("clob pair {clob_pair_id} not found")]
    ClobPairNotFound { clob_pair_id: u32 },

    /// Vaults only quote perpetual markets
    #[error("clob pair {clob_pair_id} is not a perpetual market")]
    UnsupportedMarket { clob_pair_id: u32 },

    /// Perpetual is unknown to the margin tier service
    #[error("perpetual {perpetual_id} not found")]
    PerpetualNotFound { perpetual_id: u32 },

    /// Market is unknown to the oracle
    #[error("market {market_id} not found")]
    MarketNotFound { market_id: u32 },

    /// Deactivation requested while the vault still holds value
    #[error("cannot deactivate vault with positive equity {equity}")]
    DeactivatePositiveEquityVault { equity: BigInt },

    /// Status change not permitted from the current state
    #[error("invalid vault status transition from {from} to {to}")]
    InvalidStatusTransition { from: &'static str, to: &'static str },

    /// Account cannot cover a transfer
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: BigInt, requested: u64 },

    // ============ Authority Errors ============
    /// Signer is neither governance nor operator
    #[error("signer is not an authority of the vault module")]
    InvalidAuthority,

    /// Signer does not own the subaccount it acts on
    #[error("signer does not own the subaccount")]
    NotSubaccountOwner,

    // ============ Arithmetic Domain Errors ============
    /// Redemption value does not fit in u64
    #[error("redemption value {value} is not a valid u64")]
    InvalidRedemptionValue { value: BigInt },

    /// Order size does not fit in u64
    #[error("order size {size} is not a valid u64")]
    InvalidOrderSize { size: BigInt },

    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,

    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,

    // ============ Invariant Errors ============
    /// Total shares diverged from the sum of owner shares
    #[error("share ledger mismatch: total {total}, sum of owners {owner_sum}")]
    SharesInvariantViolated { total: String, owner_sum: String },

    /// Persisted bytes could not be decoded
    #[error("corrupted state under {key}")]
    StateCorrupted { key: &'static str },

    // ============ Collaborator Errors ============
    /// Order book rejected a placement or cancellation
    #[error("order rejected: {reason}")]
    OrderRejected { reason: String },
}

impl VaultError {
    /// Returns a human-readable error code for logging/debugging
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDepositAmount { .. } => "E001_INVALID_DEPOSIT",
            Self::ZeroTransferAmount => "E002_ZERO_TRANSFER",
            Self::InvalidQuotingParams { .. } => "E003_INVALID_QUOTING_PARAMS",
            Self::UnspecifiedVaultStatus => "E004_UNSPECIFIED_STATUS",
            Self::InvalidVaultId { .. } => "E005_INVALID_VAULT_ID",
            Self::InvalidNumShares { .. } => "E006_INVALID_NUM_SHARES",
            Self::InvalidSerializedInt { .. } => "E007_INVALID_SERIALIZED_INT",
            Self::InvalidAddress { .. } => "E008_INVALID_ADDRESS",
            Self::InvalidGenesis { .. } => "E009_INVALID_GENESIS",
            Self::LockedSharesExceedOwnerShares { .. } => "E010_LOCK_EXCEEDS_OWNED",
            Self::NoLockedShares => "E011_NO_LOCKED_SHARES",
            Self::NonPositiveEquity { .. } => "E020_NON_POSITIVE_EQUITY",
            Self::ZeroMarketPrice { .. } => "E021_ZERO_MARKET_PRICE",
            Self::ZeroSharesToMint => "E022_ZERO_SHARES_TO_MINT",
            Self::NonPositiveShares => "E023_NON_POSITIVE_SHARES",
            Self::InvalidSharesToWithdraw { .. } => "E024_INVALID_SHARES_TO_WITHDRAW",
            Self::LockedSharesExceedsWithdrawable { .. } => "E025_LOCKED_SHARES",
            Self::InsufficientRedeemedQuoteQuantums { .. } => "E026_INSUFFICIENT_REDEEMED",
            Self::OwnerNotFound => "E027_OWNER_NOT_FOUND",
            Self::VaultNotFound { .. } => "E028_VAULT_NOT_FOUND",
            Self::ClobPairNotFound { .. } => "E029_CLOB_PAIR_NOT_FOUND",
            Self::UnsupportedMarket { .. } => "E030_UNSUPPORTED_MARKET",
            Self::PerpetualNotFound { .. } => "E031_PERPETUAL_NOT_FOUND",
            Self::MarketNotFound { .. } => "E032_MARKET_NOT_FOUND",
            Self::DeactivatePositiveEquityVault { .. } => "E033_DEACTIVATE_POSITIVE_EQUITY",
            Self::InvalidStatusTransition { .. } => "E034_INVALID_TRANSITION",
            Self::InsufficientFunds { .. } => "E035_INSUFFICIENT_FUNDS",
            Self::InvalidAuthority => "E040_INVALID_AUTHORITY",
            Self::NotSubaccountOwner => "E041_NOT_SUBACCOUNT_OWNER",
            Self::InvalidRedemptionValue { .. } => "E050_INVALID_REDEMPTION_VALUE",
            Self::InvalidOrderSize { .. } => "E051_INVALID_ORDER_SIZE",
            Self::Overflow => "E052_OVERFLOW",
            Self::DivisionByZero => "E053_DIV_ZERO",
            Self::SharesInvariantViolated { .. } => "E060_SHARES_INVARIANT",
            Self::StateCorrupted { .. } => "E061_STATE_CORRUPTED",
            Self::OrderRejected { .. } => "E070_ORDER_REJECTED",
        }
    }

    /// Returns the taxonomy class of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidDepositAmount { .. }
            | Self::ZeroTransferAmount
            | Self::InvalidQuotingParams { .. }
            | Self::UnspecifiedVaultStatus
            | Self::InvalidVaultId { .. }
            | Self::InvalidNumShares { .. }
            | Self::InvalidSerializedInt { .. }
            | Self::InvalidAddress { .. }
            | Self::InvalidGenesis { .. }
            | Self::LockedSharesExceedOwnerShares { .. }
            | Self::NoLockedShares => ErrorCategory::Validation,

            Self::NonPositiveEquity { .. }
            | Self::ZeroMarketPrice { .. }
            | Self::ZeroSharesToMint
            | Self::NonPositiveShares
            | Self::InvalidSharesToWithdraw { .. }
            | Self::LockedSharesExceedsWithdrawable { .. }
            | Self::InsufficientRedeemedQuoteQuantums { .. }
            | Self::OwnerNotFound
            | Self::VaultNotFound { .. }
            | Self::ClobPairNotFound { .. }
            | Self::UnsupportedMarket { .. }
            | Self::PerpetualNotFound { .. }
            | Self::MarketNotFound { .. }
            | Self::DeactivatePositiveEquityVault { .. }
            | Self::InvalidStatusTransition { .. }
            | Self::InsufficientFunds { .. } => ErrorCategory::Precondition,

            Self::InvalidAuthority | Self::NotSubaccountOwner => ErrorCategory::Authority,

            Self::InvalidRedemptionValue { .. }
            | Self::InvalidOrderSize { .. }
            | Self::Overflow
            | Self::DivisionByZero => ErrorCategory::ArithmeticDomain,

            Self::SharesInvariantViolated { .. } | Self::StateCorrupted { .. } => {
                ErrorCategory::Invariant
            }

            Self::OrderRejected { .. } => ErrorCategory::Collaborator,
        }
    }

    /// Returns true if this error is recoverable (caller can fix it)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InsufficientRedeemedQuoteQuantums { .. } => true, // Lower the floor
            Self::LockedSharesExceedsWithdrawable { .. } => true,   // Wait for unlock
            Self::InsufficientFunds { .. } => true,                 // Top up the account
            Self::ZeroSharesToMint => true,                         // Deposit more
            _ => matches!(self.category(), ErrorCategory::Validation),
        }
    }
}
