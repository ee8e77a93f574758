//! Message handling
//!
//! Every message is checked against its signer, then dispatched to the keeper.
//! Fund movements and params changes need governance or the operator;
//! deposits and withdrawals need the owner of the subaccount involved.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use megavault_common::{
    validation::require_owner, Address, NumShares, OperatorParams, Permission, QuotingParams,
    SerializableInt, ShareScope, SubaccountId, VaultEvent, VaultId, VaultParams, VaultResult,
};

use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum VaultMsg {
    AllocateFundsToVault {
        vault_id: VaultId,
        quote_quantums: u64,
    },
    RetrieveFundsFromVault {
        vault_id: VaultId,
        quote_quantums: u64,
    },
    DepositToMegavault {
        subaccount_id: SubaccountId,
        quote_quantums: SerializableInt,
    },
    DepositToVault {
        vault_id: VaultId,
        subaccount_id: SubaccountId,
        quote_quantums: SerializableInt,
    },
    WithdrawFromMegavault {
        subaccount_id: SubaccountId,
        shares: NumShares,
        min_quote_quantums: u64,
    },
    WithdrawFromVault {
        vault_id: VaultId,
        subaccount_id: SubaccountId,
        shares: NumShares,
        min_quote_quantums: u64,
    },
    SetVaultParams {
        vault_id: VaultId,
        vault_params: VaultParams,
    },
    UpdateDefaultQuotingParams {
        default_quoting_params: QuotingParams,
    },
    /// Release every megavault lock of `owner_address` early
    UnlockShares {
        owner_address: Address,
    },
    UpdateOperatorParams {
        params: OperatorParams,
    },
}

impl VaultMsg {
    /// Permission an authority needs, `None` for owner messages
    pub fn required_permission(&self) -> Option<Permission> {
        match self {
            VaultMsg::AllocateFundsToVault { .. } | VaultMsg::RetrieveFundsFromVault { .. } => {
                Some(Permission::MoveFunds)
            }
            VaultMsg::SetVaultParams { .. } => Some(Permission::SetVaultParams),
            VaultMsg::UpdateDefaultQuotingParams { .. } => Some(Permission::SetDefaultQuotingParams),
            VaultMsg::UnlockShares { .. } => Some(Permission::UnlockShares),
            VaultMsg::UpdateOperatorParams { .. } => Some(Permission::UpdateOperator),
            VaultMsg::DepositToMegavault { .. }
            | VaultMsg::DepositToVault { .. }
            | VaultMsg::WithdrawFromMegavault { .. }
            | VaultMsg::WithdrawFromVault { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgResponse {
    Empty,
    MintedShares { shares: NumShares },
    Withdrawn { redeemed_quote_quantums: u64 },
    UnlockedShares { shares: NumShares },
}

impl<E: Collaborators> VaultKeeper<E> {
    /// Authorize and execute one message
    ///
    /// # Errors
    /// - `InvalidAuthority` if an authority message is not signed by governance or the operator
    /// - `NotSubaccountOwner` if an owner message is signed by someone else
    pub fn handle(&mut self, signer: &Address, msg: &VaultMsg) -> VaultResult<MsgResponse> {
        if let Some(permission) = msg.required_permission() {
            self.authorities()?.require(signer, permission)?;
        }

        match msg {
            VaultMsg::AllocateFundsToVault { vault_id, quote_quantums } => {
                self.allocate_funds_to_vault(vault_id, *quote_quantums)?;
                Ok(MsgResponse::Empty)
            }
            VaultMsg::RetrieveFundsFromVault { vault_id, quote_quantums } => {
                self.retrieve_funds_from_vault(vault_id, *quote_quantums)?;
                Ok(MsgResponse::Empty)
            }
            VaultMsg::DepositToMegavault { subaccount_id, quote_quantums } => {
                require_owner(subaccount_id.owner, *signer)?;
                let shares = self.deposit_to_megavault(subaccount_id, quote_quantums.big_int())?;
                Ok(MsgResponse::MintedShares { shares })
            }
            VaultMsg::DepositToVault { vault_id, subaccount_id, quote_quantums } => {
                require_owner(subaccount_id.owner, *signer)?;
                let shares =
                    self.deposit_to_vault(vault_id, subaccount_id, quote_quantums.big_int())?;
                Ok(MsgResponse::MintedShares { shares })
            }
            VaultMsg::WithdrawFromMegavault { subaccount_id, shares, min_quote_quantums } => {
                require_owner(subaccount_id.owner, *signer)?;
                let redeemed =
                    self.withdraw_from_megavault(subaccount_id, shares, *min_quote_quantums)?;
                Ok(MsgResponse::Withdrawn { redeemed_quote_quantums: redeemed })
            }
            VaultMsg::WithdrawFromVault { vault_id, subaccount_id, shares, min_quote_quantums } => {
                require_owner(subaccount_id.owner, *signer)?;
                let redeemed =
                    self.withdraw_from_vault(vault_id, subaccount_id, shares, *min_quote_quantums)?;
                Ok(MsgResponse::Withdrawn { redeemed_quote_quantums: redeemed })
            }
            VaultMsg::SetVaultParams { vault_id, vault_params } => {
                self.set_vault_params(vault_id, vault_params)?;
                Ok(MsgResponse::Empty)
            }
            VaultMsg::UpdateDefaultQuotingParams { default_quoting_params } => {
                self.update_default_quoting_params(default_quoting_params)?;
                Ok(MsgResponse::Empty)
            }
            VaultMsg::UnlockShares { owner_address } => {
                let shares = self
                    .atomically(|k| k.unlock_shares(&ShareScope::Megavault, owner_address))?;
                Ok(MsgResponse::UnlockedShares { shares })
            }
            VaultMsg::UpdateOperatorParams { params } => {
                self.update_operator_params(params)?;
                Ok(MsgResponse::Empty)
            }
        }
    }

    pub fn update_default_quoting_params(&mut self, params: &QuotingParams) -> VaultResult<()> {
        params.validate()?;
        self.store.set_default_quoting_params(params)?;
        self.emit(VaultEvent::DefaultQuotingParamsUpdated {
            params: params.clone(),
            block_height: self.block.height,
        });
        Ok(())
    }

    pub fn update_operator_params(&mut self, params: &OperatorParams) -> VaultResult<()> {
        params.validate()?;
        let mut module_params = self.store.module_params()?;
        module_params.authorities.operator = params.operator;
        self.store.set_module_params(&module_params)?;
        log::info!("operator replaced");
        self.emit(VaultEvent::OperatorParamsUpdated {
            operator: params.operator,
            block_height: self.block.height,
        });
        Ok(())
    }
}
