//! Validation Helpers for the Megavault Protocol
//!
//! Reusable checks shared by message handlers and the share ledger.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use megavault_common::check;
//!
//! check!(quote_quantums > 0, VaultError::ZeroTransferAmount);
//! require_owner(subaccount.owner, signer)?;
//! ```

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::errors::{VaultError, VaultResult};
use crate::num_shares::NumShares;
use crate::types::Address;

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// # Examples
///
/// ```rust,ignore
/// check!(layers <= 255, VaultError::InvalidQuotingParams { reason: "layers" });
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Common Validation Helpers ============

/// Require a transfer amount to be non-zero.
pub fn require_positive_quantums(quote_quantums: u64) -> VaultResult<()> {
    check!(quote_quantums > 0, VaultError::ZeroTransferAmount);
    Ok(())
}

/// Require the signer to own the account it acts on.
pub fn require_owner(owner: Address, signer: Address) -> VaultResult<()> {
    check!(owner == signer, VaultError::NotSubaccountOwner);
    Ok(())
}

/// Require address to not be zero.
pub fn require_valid_address(address: Address, reason: &'static str) -> VaultResult<()> {
    check!(address != [0u8; 32], VaultError::InvalidAddress { reason });
    Ok(())
}

/// Narrow a redemption value to u64.
pub fn require_redemption_u64(value: &BigInt) -> VaultResult<u64> {
    value
        .to_u64()
        .ok_or_else(|| VaultError::InvalidRedemptionValue { value: value.clone() })
}

/// Require `total` to equal the sum of every owner's shares.
pub fn require_shares_balanced(total: &NumShares, owner_sum: &NumShares) -> VaultResult<()> {
    check!(
        total == owner_sum,
        VaultError::SharesInvariantViolated {
            total: total.to_string(),
            owner_sum: owner_sum.to_string(),
        }
    );
    Ok(())
}
