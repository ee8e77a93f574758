//! Vault lifecycle
//!
//! ```text
//! STAND_BY -> QUOTING <-> CLOSE_ONLY -> DEACTIVATED
//! ```
//!
//! Allocation creates a vault in STAND_BY. Deactivation needs non-positive
//! equity, and deactivated vaults are erased by the decommission sweep.

use num_traits::Signed;

use megavault_common::{
    validation::{require_positive_quantums, require_shares_balanced},
    Address, NumShares, ShareScope, SubaccountId, VaultError, VaultEvent, VaultId, VaultParams,
    VaultResult, VaultStatus,
};

use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

impl<E: Collaborators> VaultKeeper<E> {
    /// Move `quote_quantums` from the main pool into a vault, creating it if needed
    ///
    /// # Errors
    /// - `ClobPairNotFound` if the vault's market does not exist
    /// - `InsufficientFunds` if the main pool cannot cover the transfer
    pub fn allocate_funds_to_vault(
        &mut self,
        vault_id: &VaultId,
        quote_quantums: u64,
    ) -> VaultResult<()> {
        self.atomically(|k| {
            vault_id.validate()?;
            require_positive_quantums(quote_quantums)?;

            if k.store.vault_params(vault_id)?.is_none() {
                let clob_pair_id = vault_id.clob_pair_id();
                if k.env.clob_pair(clob_pair_id).is_none() {
                    return Err(VaultError::ClobPairNotFound { clob_pair_id });
                }
                k.store.set_vault_params(vault_id, &VaultParams::new(VaultStatus::StandBy))?;
                k.store.register_vault_address(vault_id)?;
                log::info!("created vault {} in stand-by", vault_id);
            }

            k.grow_megavault_stake(vault_id, quote_quantums)?;
            k.env.transfer(
                &SubaccountId::megavault_main(),
                &vault_id.to_subaccount_id(),
                quote_quantums,
            )?;
            k.emit(VaultEvent::FundsAllocated {
                vault_id: *vault_id,
                quote_quantums,
                block_height: k.block.height,
            });
            Ok(())
        })
    }

    /// Move `quote_quantums` from a vault back to the main pool
    ///
    /// Only the megavault's own stake in the vault can be retrieved.
    pub fn retrieve_funds_from_vault(
        &mut self,
        vault_id: &VaultId,
        quote_quantums: u64,
    ) -> VaultResult<()> {
        self.atomically(|k| {
            require_positive_quantums(quote_quantums)?;
            k.vault_params(vault_id)?;

            k.release_megavault_stake(vault_id, quote_quantums)?;
            k.env.transfer(
                &vault_id.to_subaccount_id(),
                &SubaccountId::megavault_main(),
                quote_quantums,
            )?;
            k.emit(VaultEvent::FundsRetrieved {
                vault_id: *vault_id,
                quote_quantums,
                block_height: k.block.height,
            });
            Ok(())
        })
    }

    /// Replace the params of an existing vault
    ///
    /// Leaving a quoting status cancels the vault's resting orders.
    ///
    /// # Errors
    /// - `VaultNotFound` if the vault does not exist
    /// - `InvalidStatusTransition` if the status may not follow the current one
    /// - `DeactivatePositiveEquityVault` when deactivating a vault that still has equity
    pub fn set_vault_params(&mut self, vault_id: &VaultId, params: &VaultParams) -> VaultResult<()> {
        self.atomically(|k| {
            params.validate()?;
            let current = k.vault_params(vault_id)?;
            if !current.status.can_transition_to(params.status) {
                return Err(VaultError::InvalidStatusTransition {
                    from: current.status.as_str(),
                    to: params.status.as_str(),
                });
            }
            if params.status == VaultStatus::Deactivated {
                let equity = k.vault_equity(vault_id);
                if equity.is_positive() {
                    return Err(VaultError::DeactivatePositiveEquityVault { equity });
                }
            }

            k.store.set_vault_params(vault_id, params)?;
            if current.status.places_orders() && !params.status.places_orders() {
                k.cancel_all_vault_orders(vault_id)?;
            }
            k.emit(VaultEvent::VaultParamsUpdated {
                vault_id: *vault_id,
                status: params.status,
                block_height: k.block.height,
            });
            Ok(())
        })
    }

    /// Cancel every recorded order that is still resting
    fn cancel_all_vault_orders(&mut self, vault_id: &VaultId) -> VaultResult<()> {
        let (_, quoting) = self.vault_and_quoting_params(vault_id)?;
        let good_til = self
            .block
            .time
            .checked_add(quoting.order_expiration_seconds)
            .ok_or(VaultError::Overflow)?;
        for client_id in self.store.most_recent_client_ids(vault_id)? {
            let order_id = vault_id.order_id(client_id);
            if self.env.resting_order(&order_id).is_some() {
                self.env.cancel_order(&order_id, good_til)?;
                self.emit(VaultEvent::OrderCancelled {
                    vault_id: *vault_id,
                    client_id,
                    block_height: self.block.height,
                });
            }
        }
        self.store.delete_most_recent_client_ids(vault_id);
        Ok(())
    }

    /// Erase every deactivated vault that has no equity left
    ///
    /// The sweep is all or nothing. Returns the vaults removed.
    pub fn decommission_vaults(&mut self) -> VaultResult<Vec<VaultId>> {
        self.atomically(|k| {
            let mut removed = Vec::new();
            for (vault_id, params) in k.store.all_vault_params()? {
                if params.status != VaultStatus::Deactivated {
                    continue;
                }
                if k.vault_equity(&vault_id).is_positive() {
                    continue;
                }
                k.decommission_vault(&vault_id)?;
                removed.push(vault_id);
            }
            Ok(removed)
        })
    }

    fn decommission_vault(&mut self, vault_id: &VaultId) -> VaultResult<()> {
        let scope = ShareScope::Vault(*vault_id);
        let total = self.store.total_shares(&scope)?;
        let owner_sum = self
            .store
            .all_owner_shares(&scope)?
            .iter()
            .fold(NumShares::zero(), |acc, share| acc.add(&share.shares));
        require_shares_balanced(&total, &owner_sum)?;

        self.store.delete_vault_address(vault_id);
        self.store.delete_vault_params(vault_id);
        self.store.delete_most_recent_client_ids(vault_id);
        self.store.delete_scope(&scope);

        log::info!("decommissioned vault {}", vault_id);
        self.emit(VaultEvent::VaultDecommissioned {
            vault_id: *vault_id,
            block_height: self.block.height,
        });
        Ok(())
    }

    /// Whether `address` is the settlement address of a live vault
    pub fn is_known_vault_address(&self, address: &Address) -> bool {
        self.store.is_vault_address(address)
    }
}
