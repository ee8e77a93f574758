//! Access Control Module
//!
//! Two authorities may operate the vault module: the governance account,
//! which can do anything, and an operator address, which can run vaults but
//! cannot replace itself.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, VaultResult};
use crate::types::Address;

// ============================================================================
// Types
// ============================================================================

/// Module roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Module governance account
    Governance,
    /// Day-to-day vault operator
    Operator,
}

/// Actions that need an authority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Move funds between the main pool and vaults
    MoveFunds,
    /// Change a vault's status or quoting override
    SetVaultParams,
    /// Change the module-wide quoting defaults
    SetDefaultQuotingParams,
    /// Release an owner's locked shares early
    UnlockShares,
    /// Replace the operator
    UpdateOperator,
}

impl Permission {
    /// Roles allowed to exercise this permission
    pub fn allowed(&self, role: Role) -> bool {
        match self {
            Permission::UpdateOperator => role == Role::Governance,
            _ => true,
        }
    }
}

/// Current authority addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Authorities {
    pub governance: Address,
    pub operator: Address,
}

impl Authorities {
    pub fn new(governance: Address, operator: Address) -> Self {
        Self { governance, operator }
    }

    /// Role held by `signer`, governance taking precedence
    pub fn role_of(&self, signer: &Address) -> Option<Role> {
        if signer == &self.governance {
            Some(Role::Governance)
        } else if signer == &self.operator {
            Some(Role::Operator)
        } else {
            None
        }
    }

    pub fn has_permission(&self, signer: &Address, permission: Permission) -> bool {
        self.role_of(signer)
            .map(|role| permission.allowed(role))
            .unwrap_or(false)
    }

    /// Fails with `InvalidAuthority` unless `signer` may exercise `permission`
    pub fn require(&self, signer: &Address, permission: Permission) -> VaultResult<()> {
        if self.has_permission(signer, permission) {
            Ok(())
        } else {
            Err(VaultError::InvalidAuthority)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governance() -> Address {
        [1u8; 32]
    }

    fn operator() -> Address {
        [2u8; 32]
    }

    fn stranger() -> Address {
        [3u8; 32]
    }

    #[test]
    fn test_roles() {
        let auth = Authorities::new(governance(), operator());
        assert_eq!(auth.role_of(&governance()), Some(Role::Governance));
        assert_eq!(auth.role_of(&operator()), Some(Role::Operator));
        assert_eq!(auth.role_of(&stranger()), None);
    }

    #[test]
    fn test_operator_permissions() {
        let auth = Authorities::new(governance(), operator());
        assert!(auth.require(&operator(), Permission::MoveFunds).is_ok());
        assert!(auth.require(&operator(), Permission::SetVaultParams).is_ok());
        assert_eq!(
            auth.require(&operator(), Permission::UpdateOperator),
            Err(VaultError::InvalidAuthority)
        );
        assert!(auth.require(&governance(), Permission::UpdateOperator).is_ok());
    }

    #[test]
    fn test_stranger_rejected() {
        let auth = Authorities::new(governance(), operator());
        assert_eq!(
            auth.require(&stranger(), Permission::UnlockShares),
            Err(VaultError::InvalidAuthority)
        );
    }
}
