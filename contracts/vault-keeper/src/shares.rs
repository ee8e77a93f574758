//! Share ledger
//!
//! Deposits mint shares in proportion to the equity they join, withdrawals
//! redeem shares for the same proportion of what the pools hold. Each scope
//! keeps `TotalShares` equal to the sum of its owner balances.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive};

use megavault_common::{
    math, validation::require_redemption_u64, Address, NumShares, OwnerShareUnlocks, ShareScope,
    ShareUnlock, SubaccountId, VaultError, VaultEvent, VaultId, VaultResult,
};

use crate::equity::megavault_stake_owner;
use crate::interfaces::Collaborators;
use crate::keeper::VaultKeeper;

impl<E: Collaborators> VaultKeeper<E> {
    pub fn total_shares(&self, scope: &ShareScope) -> VaultResult<NumShares> {
        self.store.total_shares(scope)
    }

    /// Shares held by `owner`, zero when absent
    pub fn owner_shares(&self, scope: &ShareScope, owner: &Address) -> VaultResult<NumShares> {
        Ok(self.store.owner_shares(scope, owner)?.unwrap_or_default())
    }

    pub fn owner_share_unlocks(
        &self,
        scope: &ShareScope,
        owner: &Address,
    ) -> VaultResult<OwnerShareUnlocks> {
        Ok(self
            .store
            .owner_share_unlocks(scope, owner)?
            .unwrap_or_else(|| OwnerShareUnlocks::new(*owner)))
    }

    /// Owner shares not covered by a tranche that is still locked
    pub fn unlocked_shares(&self, scope: &ShareScope, owner: &Address) -> VaultResult<NumShares> {
        let owned = self.owner_shares(scope, owner)?;
        let locked = self.owner_share_unlocks(scope, owner)?.locked_at(self.block.height);
        Ok(owned.checked_sub(&locked).unwrap_or_default())
    }

    /// Mint shares for a deposit of `deposit_quote_quantums` into `scope`
    ///
    /// The first deposit into an empty scope mints one share per quantum.
    /// Later deposits mint `floor(deposit * total_shares / equity)`, with
    /// equity read before the deposit lands.
    ///
    /// # Errors
    /// - `InvalidDepositAmount` if the deposit is not a positive u64
    /// - `NonPositiveEquity` if shares exist but the pool has no equity
    /// - `ZeroSharesToMint` if the deposit is too small to mint a whole share
    pub fn mint_shares(
        &mut self,
        scope: &ShareScope,
        owner: &Address,
        deposit_quote_quantums: &BigInt,
    ) -> VaultResult<NumShares> {
        let deposit = deposit_quote_quantums
            .to_u64()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| VaultError::InvalidDepositAmount {
                amount: deposit_quote_quantums.clone(),
            })?;

        let total = self.store.total_shares(scope)?;
        let minted = if total.is_zero() {
            NumShares::from_int(deposit)
        } else {
            let equity = self.scope_equity(scope)?;
            if !equity.is_positive() {
                return Err(VaultError::NonPositiveEquity { equity });
            }
            let exact = BigRational::from_integer(deposit_quote_quantums.clone())
                * total.as_rational()
                / BigRational::from_integer(equity);
            NumShares::from_int(math::floor(&exact))
        };
        if minted.is_zero() {
            return Err(VaultError::ZeroSharesToMint);
        }

        let new_total = total.add(&minted);
        let new_owned = self.owner_shares(scope, owner)?.add(&minted);
        self.store.set_total_shares(scope, &new_total)?;
        self.store.set_owner_shares(scope, owner, &new_owned)?;

        log::debug!("minted {} shares in {:?} for deposit of {}", minted, scope, deposit);
        self.emit(VaultEvent::SharesMinted {
            scope: *scope,
            owner: *owner,
            deposit_quote_quantums: deposit,
            minted_shares: minted.clone(),
            total_shares: new_total,
            block_height: self.block.height,
        });
        Ok(minted)
    }

    /// Deposit from `depositor` into the megavault main pool
    ///
    /// Minted shares are locked for the module's share lock period.
    pub fn deposit_to_megavault(
        &mut self,
        depositor: &SubaccountId,
        quote_quantums: &BigInt,
    ) -> VaultResult<NumShares> {
        self.atomically(|k| {
            let scope = ShareScope::Megavault;
            let minted = k.mint_shares(&scope, &depositor.owner, quote_quantums)?;
            // mint_shares already narrowed the amount
            let amount = quote_quantums.to_u64().ok_or(VaultError::Overflow)?;
            k.env.transfer(depositor, &SubaccountId::megavault_main(), amount)?;

            let lock_blocks = k.module_params()?.share_lock_blocks;
            if lock_blocks > 0 {
                let unlock_height = k
                    .block
                    .height
                    .checked_add(lock_blocks)
                    .ok_or(VaultError::Overflow)?;
                k.lock_shares(&scope, &depositor.owner, &minted, unlock_height)?;
            }
            Ok(minted)
        })
    }

    /// Deposit from `depositor` directly into one vault
    ///
    /// The first outside deposit records the megavault's existing stake at one
    /// share per quantum of vault equity, so the megavault keeps what it owned.
    pub fn deposit_to_vault(
        &mut self,
        vault_id: &VaultId,
        depositor: &SubaccountId,
        quote_quantums: &BigInt,
    ) -> VaultResult<NumShares> {
        self.atomically(|k| {
            k.vault_params(vault_id)?;
            k.seed_megavault_stake(vault_id)?;
            let minted =
                k.mint_shares(&ShareScope::Vault(*vault_id), &depositor.owner, quote_quantums)?;
            let amount = quote_quantums.to_u64().ok_or(VaultError::Overflow)?;
            k.env.transfer(depositor, &vault_id.to_subaccount_id(), amount)?;
            Ok(minted)
        })
    }

    fn seed_megavault_stake(&mut self, vault_id: &VaultId) -> VaultResult<()> {
        let scope = ShareScope::Vault(*vault_id);
        if !self.store.total_shares(&scope)?.is_zero() {
            return Ok(());
        }
        let equity = self.vault_equity(vault_id);
        if equity.is_negative() {
            return Err(VaultError::NonPositiveEquity { equity });
        }
        let stake = NumShares::from_int(equity);
        self.store.set_total_shares(&scope, &stake)?;
        self.store.set_owner_shares(&scope, &megavault_stake_owner(), &stake)?;
        Ok(())
    }

    /// Mint the megavault stake for `quote_quantums` the main pool puts into a vault
    ///
    /// No-op while the megavault owns the whole vault.
    pub(crate) fn grow_megavault_stake(
        &mut self,
        vault_id: &VaultId,
        quote_quantums: u64,
    ) -> VaultResult<()> {
        let scope = ShareScope::Vault(*vault_id);
        if self.store.total_shares(&scope)?.is_zero() {
            return Ok(());
        }
        self.mint_shares(&scope, &megavault_stake_owner(), &BigInt::from(quote_quantums))?;
        Ok(())
    }

    /// Burn the megavault stake backing `quote_quantums` about to leave a vault
    ///
    /// Must run before the funds move. Outside holders keep the exact value
    /// of their shares.
    ///
    /// # Errors
    /// `InsufficientFunds` if the megavault's stake is worth less than `quote_quantums`.
    pub(crate) fn release_megavault_stake(
        &mut self,
        vault_id: &VaultId,
        quote_quantums: u64,
    ) -> VaultResult<()> {
        let scope = ShareScope::Vault(*vault_id);
        let total = self.store.total_shares(&scope)?;
        if total.is_zero() {
            return Ok(());
        }
        let available = self.megavault_stake_equity(vault_id)?;
        let requested = BigInt::from(quote_quantums);
        if available < requested {
            return Err(VaultError::InsufficientFunds { available, requested: quote_quantums });
        }

        // available >= requested > 0, so equity is positive
        let equity = BigRational::from_integer(self.vault_equity(vault_id));
        let burned = NumShares::from_rational(
            BigRational::from_integer(requested) * total.as_rational() / equity,
        )?;
        let owner = megavault_stake_owner();
        let stake = self.owner_shares(&scope, &owner)?;
        let new_stake = stake.checked_sub(&burned).ok_or(VaultError::Overflow)?;
        let new_total = total.checked_sub(&burned).ok_or(VaultError::Overflow)?;
        self.store.set_owner_shares(&scope, &owner, &new_stake)?;
        self.store.set_total_shares(&scope, &new_total)?;
        log::debug!("released {} megavault shares of vault {}", burned, vault_id);
        Ok(())
    }

    /// Share checks every redemption runs, returning `(total, owned)`
    fn check_redeemable(
        &self,
        scope: &ShareScope,
        owner: &Address,
        shares: &NumShares,
    ) -> VaultResult<(NumShares, NumShares)> {
        if shares.is_zero() {
            return Err(VaultError::NonPositiveShares);
        }
        let total = self.store.total_shares(scope)?;
        if shares > &total {
            return Err(VaultError::InvalidSharesToWithdraw {
                requested: shares.to_string(),
                total: total.to_string(),
            });
        }
        let owned = self.store.owner_shares(scope, owner)?.ok_or(VaultError::OwnerNotFound)?;
        let unlocked = self.unlocked_shares(scope, owner)?;
        if shares > &unlocked {
            return Err(VaultError::LockedSharesExceedsWithdrawable {
                requested: shares.to_string(),
                unlocked: unlocked.to_string(),
            });
        }
        Ok((total, owned))
    }

    fn burn_redeemed_shares(
        &mut self,
        scope: &ShareScope,
        owner: &Address,
        shares: &NumShares,
        (total, owned): (NumShares, NumShares),
        redeemed: u64,
    ) -> VaultResult<()> {
        let new_total = total.checked_sub(shares).ok_or(VaultError::Overflow)?;
        let new_owned = owned.checked_sub(shares).ok_or(VaultError::Overflow)?;
        self.store.set_total_shares(scope, &new_total)?;
        self.store.set_owner_shares(scope, owner, &new_owned)?;

        log::info!("redeemed {} shares in {:?} for {} quote quantums", shares, scope, redeemed);
        self.emit(VaultEvent::SharesRedeemed {
            scope: *scope,
            owner: *owner,
            redeemed_shares: shares.clone(),
            redeemed_quote_quantums: redeemed,
            total_shares: new_total,
            block_height: self.block.height,
        });
        Ok(())
    }

    /// Redeem megavault shares of `owner` into `recipient`
    ///
    /// Each contributing vault sends its slice to the main pool, which then
    /// pays the owner.
    ///
    /// # Errors
    /// - `NonPositiveShares`, `InvalidSharesToWithdraw` on a bad share amount
    /// - `OwnerNotFound` if the owner holds no shares
    /// - `LockedSharesExceedsWithdrawable` if locked shares would be redeemed
    /// - `InvalidRedemptionValue` if the value does not fit in u64
    /// - `InsufficientRedeemedQuoteQuantums` if the value is zero or below `min_quote_quantums`
    pub fn withdraw_from_megavault(
        &mut self,
        recipient: &SubaccountId,
        shares: &NumShares,
        min_quote_quantums: u64,
    ) -> VaultResult<u64> {
        self.atomically(|k| {
            let scope = ShareScope::Megavault;
            let owner = recipient.owner;
            let balances = k.check_redeemable(&scope, &owner, shares)?;

            let plan = k.plan_megavault_redemption(shares, &balances.0)?;
            let redeemed = require_redemption_u64(&plan.total_quote_quantums)?;
            if redeemed == 0 || redeemed < min_quote_quantums {
                return Err(VaultError::InsufficientRedeemedQuoteQuantums {
                    redeemed,
                    minimum: min_quote_quantums,
                });
            }

            let main = SubaccountId::megavault_main();
            for (vault_id, slice) in &plan.vault_quote_quantums {
                let slice = require_redemption_u64(slice)?;
                k.release_megavault_stake(vault_id, slice)?;
                k.env.transfer(&vault_id.to_subaccount_id(), &main, slice)?;
            }
            k.env.transfer(&main, recipient, redeemed)?;

            k.burn_redeemed_shares(&scope, &owner, shares, balances, redeemed)?;
            Ok(redeemed)
        })
    }

    /// Redeem shares of one vault held directly by `owner` into `recipient`
    ///
    /// Pays `floor(shares / total * equity)` straight from the vault, with no
    /// slippage.
    ///
    /// # Errors
    /// As [`Self::withdraw_from_megavault`], plus `VaultNotFound`.
    pub fn withdraw_from_vault(
        &mut self,
        vault_id: &VaultId,
        recipient: &SubaccountId,
        shares: &NumShares,
        min_quote_quantums: u64,
    ) -> VaultResult<u64> {
        self.atomically(|k| {
            k.vault_params(vault_id)?;
            let scope = ShareScope::Vault(*vault_id);
            let owner = recipient.owner;
            let balances = k.check_redeemable(&scope, &owner, shares)?;

            let equity = k.vault_equity(vault_id);
            let value = if equity.is_positive() {
                let fraction = shares.fraction_of(&balances.0)?;
                math::floor(&(fraction * BigRational::from_integer(equity)))
            } else {
                BigInt::default()
            };
            let redeemed = require_redemption_u64(&value)?;
            if redeemed == 0 || redeemed < min_quote_quantums {
                return Err(VaultError::InsufficientRedeemedQuoteQuantums {
                    redeemed,
                    minimum: min_quote_quantums,
                });
            }

            k.env.transfer(&vault_id.to_subaccount_id(), recipient, redeemed)?;
            k.burn_redeemed_shares(&scope, &owner, shares, balances, redeemed)?;
            Ok(redeemed)
        })
    }

    /// Lock `shares` of `owner` until `unlock_block_height`
    ///
    /// # Errors
    /// `LockedSharesExceedOwnerShares` if the owner's locks would exceed their balance.
    pub fn lock_shares(
        &mut self,
        scope: &ShareScope,
        owner: &Address,
        shares: &NumShares,
        unlock_block_height: u32,
    ) -> VaultResult<()> {
        if shares.is_zero() {
            return Err(VaultError::NonPositiveShares);
        }
        let owned = self.owner_shares(scope, owner)?;
        let mut unlocks = self.owner_share_unlocks(scope, owner)?;
        // Matured tranches no longer hold anything back
        let matured = unlocks.release_matured(self.block.height);
        if !matured.is_zero() {
            self.emit(VaultEvent::SharesUnlocked {
                scope: *scope,
                owner: *owner,
                shares: matured,
                block_height: self.block.height,
            });
        }
        let locked = unlocks.total_locked().add(shares);
        if locked > owned {
            return Err(VaultError::LockedSharesExceedOwnerShares {
                locked: locked.to_string(),
                owned: owned.to_string(),
            });
        }

        unlocks.share_unlocks.push(ShareUnlock { shares: shares.clone(), unlock_block_height });
        self.store.set_owner_share_unlocks(scope, &unlocks)?;
        self.emit(VaultEvent::SharesLocked {
            scope: *scope,
            owner: *owner,
            shares: shares.clone(),
            unlock_block_height,
            block_height: self.block.height,
        });
        Ok(())
    }

    /// Release every lock of `owner` immediately, returning the amount released
    ///
    /// # Errors
    /// `NoLockedShares` if the owner has nothing locked.
    pub fn unlock_shares(&mut self, scope: &ShareScope, owner: &Address) -> VaultResult<NumShares> {
        let unlocks = self
            .store
            .owner_share_unlocks(scope, owner)?
            .ok_or(VaultError::NoLockedShares)?;
        let released = unlocks.total_locked();

        self.store.set_owner_share_unlocks(scope, &OwnerShareUnlocks::new(*owner))?;
        self.emit(VaultEvent::SharesUnlocked {
            scope: *scope,
            owner: *owner,
            shares: released.clone(),
            block_height: self.block.height,
        });
        Ok(released)
    }

    /// Drop every tranche whose unlock height has been reached
    pub fn release_matured_locks(&mut self) -> VaultResult<()> {
        let height = self.block.height;
        for (scope, mut unlocks) in self.store.all_owner_share_unlocks()? {
            let released = unlocks.release_matured(height);
            if released.is_zero() {
                continue;
            }
            self.store.set_owner_share_unlocks(&scope, &unlocks)?;
            self.emit(VaultEvent::SharesUnlocked {
                scope,
                owner: unlocks.owner_address,
                shares: released,
                block_height: height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{alice, bob, keeper_on, MockChain};
    use megavault_common::{EventType, VaultStatus};

    fn seeded_megavault(equity: i64, total: u64, alice_shares: u64) -> VaultKeeper<MockChain> {
        let mut keeper = keeper_on(MockChain::default());
        let scope = ShareScope::Megavault;
        keeper.env_mut().set_quote_balance(&SubaccountId::megavault_main(), equity);
        keeper.store.set_total_shares(&scope, &NumShares::from_int(total)).unwrap();
        keeper
            .store
            .set_owner_shares(&scope, &alice().owner, &NumShares::from_int(alice_shares))
            .unwrap();
        if total > alice_shares {
            keeper
                .store
                .set_owner_shares(&scope, &bob().owner, &NumShares::from_int(total - alice_shares))
                .unwrap();
        }
        keeper
    }

    #[test]
    fn test_bootstrap_mint_is_one_to_one() {
        let mut keeper = keeper_on(MockChain::default());
        let minted = keeper
            .mint_shares(&ShareScope::Megavault, &alice().owner, &BigInt::from(777))
            .unwrap();
        assert_eq!(minted, NumShares::from_int(777u64));
        assert_eq!(keeper.total_shares(&ShareScope::Megavault).unwrap(), minted);
    }

    #[test]
    fn test_mint_does_not_dilute() {
        let mut keeper = seeded_megavault(4_000, 5_000, 2_500);
        let scope = ShareScope::Megavault;
        let minted = keeper.mint_shares(&scope, &alice().owner, &BigInt::from(1_000)).unwrap();

        assert_eq!(minted, NumShares::from_int(1_250u64));
        assert_eq!(keeper.total_shares(&scope).unwrap(), NumShares::from_int(6_250u64));
        assert_eq!(
            keeper.owner_shares(&scope, &alice().owner).unwrap(),
            NumShares::from_int(3_750u64)
        );
    }

    #[test]
    fn test_mint_errors() {
        let mut keeper = seeded_megavault(4_000, 5_000, 2_500);
        let scope = ShareScope::Megavault;
        assert!(matches!(
            keeper.mint_shares(&scope, &alice().owner, &BigInt::from(0)),
            Err(VaultError::InvalidDepositAmount { .. })
        ));
        assert!(matches!(
            keeper.mint_shares(&scope, &alice().owner, &BigInt::from(-5)),
            Err(VaultError::InvalidDepositAmount { .. })
        ));

        // 1 * 5000 / 1_000_000 floors to zero
        keeper
            .env_mut()
            .set_quote_balance(&SubaccountId::megavault_main(), 1_000_000);
        assert_eq!(
            keeper.mint_shares(&scope, &alice().owner, &BigInt::from(1)),
            Err(VaultError::ZeroSharesToMint)
        );

        keeper.env_mut().set_quote_balance(&SubaccountId::megavault_main(), 0);
        assert!(matches!(
            keeper.mint_shares(&scope, &alice().owner, &BigInt::from(100)),
            Err(VaultError::NonPositiveEquity { .. })
        ));
    }

    #[test]
    fn test_deposit_locks_minted_shares() {
        let mut keeper = keeper_on(MockChain::default());
        keeper.env_mut().set_quote_balance(&alice(), 10_000);
        keeper.set_block(crate::keeper::BlockContext::new(100, 0));

        let minted = keeper.deposit_to_megavault(&alice(), &BigInt::from(1_000)).unwrap();
        let unlocks = keeper.owner_share_unlocks(&ShareScope::Megavault, &alice().owner).unwrap();
        assert_eq!(unlocks.total_locked(), minted);
        assert_eq!(
            unlocks.share_unlocks[0].unlock_block_height,
            100 + keeper.module_params().unwrap().share_lock_blocks
        );
        assert_eq!(keeper.env().quote_balance_of(&alice()), 9_000);
        assert_eq!(keeper.env().quote_balance_of(&SubaccountId::megavault_main()), 1_000);
    }

    #[test]
    fn test_failed_deposit_leaves_no_trace() {
        let mut keeper = keeper_on(MockChain::default());
        keeper.env_mut().set_quote_balance(&alice(), 10);

        let result = keeper.deposit_to_megavault(&alice(), &BigInt::from(1_000));
        assert!(matches!(result, Err(VaultError::InsufficientFunds { .. })));
        assert!(keeper.total_shares(&ShareScope::Megavault).unwrap().is_zero());
        // Only the module params remain
        assert_eq!(keeper.store().len(), 1);
        assert!(keeper.events().is_empty());
    }

    #[test]
    fn test_deposit_to_unknown_vault() {
        let mut keeper = keeper_on(MockChain::default());
        keeper.env_mut().set_quote_balance(&alice(), 10_000);
        assert!(matches!(
            keeper.deposit_to_vault(&VaultId::clob(3), &alice(), &BigInt::from(10)),
            Err(VaultError::VaultNotFound { .. })
        ));
    }

    #[test]
    fn test_deposit_to_vault() {
        let mut keeper =
            crate::testutil::keeper_with_vaults(&[(VaultId::clob(0), VaultStatus::StandBy)]);
        keeper.env_mut().set_quote_balance(&alice(), 10_000);
        let minted = keeper.deposit_to_vault(&VaultId::clob(0), &alice(), &BigInt::from(600)).unwrap();
        assert_eq!(minted, NumShares::from_int(600u64));
        assert_eq!(keeper.env().quote_balance_of(&VaultId::clob(0).to_subaccount_id()), 600);
        // Vault deposits are not locked
        assert!(keeper
            .owner_share_unlocks(&ShareScope::Vault(VaultId::clob(0)), &alice().owner)
            .unwrap()
            .share_unlocks
            .is_empty());
    }

    #[test]
    fn test_withdraw_from_vault() {
        let mut keeper =
            crate::testutil::keeper_with_vaults(&[(VaultId::clob(0), VaultStatus::StandBy)]);
        let vault = VaultId::clob(0);
        keeper.env_mut().set_quote_balance(&alice(), 600);
        keeper.deposit_to_vault(&vault, &alice(), &BigInt::from(600)).unwrap();
        // The vault earned a third on top of the deposit
        keeper.env_mut().set_quote_balance(&vault.to_subaccount_id(), 800);

        let scope = ShareScope::Vault(vault);
        assert_eq!(
            keeper.withdraw_from_vault(&vault, &alice(), &NumShares::from_int(300u64), 401),
            Err(VaultError::InsufficientRedeemedQuoteQuantums { redeemed: 400, minimum: 401 })
        );
        assert_eq!(
            keeper.withdraw_from_vault(&vault, &bob(), &NumShares::from_int(1u64), 0),
            Err(VaultError::OwnerNotFound)
        );
        let redeemed = keeper
            .withdraw_from_vault(&vault, &alice(), &NumShares::from_int(300u64), 400)
            .unwrap();
        assert_eq!(redeemed, 400);
        assert_eq!(keeper.env().quote_balance_of(&alice()), 400);
        assert_eq!(keeper.total_shares(&scope).unwrap(), NumShares::from_int(300u64));
        assert_eq!(keeper.events().filter_by_type(EventType::SharesRedeemed).len(), 1);
        assert!(matches!(
            keeper.withdraw_from_vault(&VaultId::clob(4), &alice(), &NumShares::from_int(1u64), 0),
            Err(VaultError::VaultNotFound { .. })
        ));
    }

    #[test]
    fn test_redeposit_in_block_a_lock_matures() {
        let mut keeper = keeper_on(MockChain::default());
        keeper.env_mut().set_quote_balance(&alice(), 10_000);
        keeper.set_block(crate::keeper::BlockContext::new(100, 0));
        keeper.deposit_to_megavault(&alice(), &BigInt::from(1_000)).unwrap();
        let lock_blocks = keeper.module_params().unwrap().share_lock_blocks;

        keeper.set_block(crate::keeper::BlockContext::new(100 + lock_blocks, 0));
        keeper
            .withdraw_from_megavault(&alice(), &NumShares::from_int(1_000u64), 1_000)
            .unwrap();
        let minted = keeper.deposit_to_megavault(&alice(), &BigInt::from(500)).unwrap();

        assert_eq!(minted, NumShares::from_int(500u64));
        let unlocks = keeper.owner_share_unlocks(&ShareScope::Megavault, &alice().owner).unwrap();
        assert_eq!(unlocks.share_unlocks.len(), 1);
        assert_eq!(unlocks.total_locked(), minted);
        assert_eq!(keeper.events().filter_by_type(EventType::SharesUnlocked).len(), 1);
    }

    #[test]
    fn test_withdraw_main_pool_only() {
        let mut keeper = seeded_megavault(1_234, 500, 47);
        let scope = ShareScope::Megavault;
        keeper
            .lock_shares(&scope, &alice().owner, &NumShares::from_int(7u64), 50)
            .unwrap();

        let redeemed = keeper
            .withdraw_from_megavault(&alice(), &NumShares::from_int(40u64), 50)
            .unwrap();
        // 1234 * 40 / 500 = 98.72
        assert_eq!(redeemed, 98);
        assert_eq!(keeper.total_shares(&scope).unwrap(), NumShares::from_int(460u64));
        assert_eq!(keeper.owner_shares(&scope, &alice().owner).unwrap(), NumShares::from_int(7u64));
        assert_eq!(keeper.env().quote_balance_of(&alice()), 98);
    }

    #[test]
    fn test_withdraw_rejects_locked_shares() {
        let mut keeper = seeded_megavault(1_234, 500, 47);
        let scope = ShareScope::Megavault;
        keeper
            .lock_shares(&scope, &alice().owner, &NumShares::from_int(8u64), 50)
            .unwrap();
        assert!(matches!(
            keeper.withdraw_from_megavault(&alice(), &NumShares::from_int(40u64), 0),
            Err(VaultError::LockedSharesExceedsWithdrawable { .. })
        ));

        // Matured tranches no longer count
        keeper.set_block(crate::keeper::BlockContext::new(50, 0));
        assert!(keeper
            .withdraw_from_megavault(&alice(), &NumShares::from_int(40u64), 0)
            .is_ok());
    }

    #[test]
    fn test_withdraw_errors() {
        let mut keeper = seeded_megavault(99, 200, 100);
        assert_eq!(
            keeper.withdraw_from_megavault(&alice(), &NumShares::zero(), 0),
            Err(VaultError::NonPositiveShares)
        );
        assert!(matches!(
            keeper.withdraw_from_megavault(&alice(), &NumShares::from_int(201u64), 0),
            Err(VaultError::InvalidSharesToWithdraw { .. })
        ));
        let stranger = SubaccountId::new([42u8; 32], 0);
        assert_eq!(
            keeper.withdraw_from_megavault(&stranger, &NumShares::from_int(1u64), 0),
            Err(VaultError::OwnerNotFound)
        );
        // 99 * 2 / 200 rounds down to zero
        assert_eq!(
            keeper.withdraw_from_megavault(&alice(), &NumShares::from_int(2u64), 0),
            Err(VaultError::InsufficientRedeemedQuoteQuantums { redeemed: 0, minimum: 0 })
        );
        assert_eq!(
            keeper.withdraw_from_megavault(&alice(), &NumShares::from_int(100u64), 50),
            Err(VaultError::InsufficientRedeemedQuoteQuantums { redeemed: 49, minimum: 50 })
        );
        assert_eq!(keeper.total_shares(&ShareScope::Megavault).unwrap(), NumShares::from_int(200u64));
    }

    #[test]
    fn test_withdraw_over_u64() {
        let mut keeper = keeper_on(MockChain::default());
        let scope = ShareScope::Megavault;
        keeper
            .env_mut()
            .set_quote_balance_big(&SubaccountId::megavault_main(), BigInt::from(u64::MAX) + 1);
        keeper.store.set_total_shares(&scope, &NumShares::from_int(155u64)).unwrap();
        keeper
            .store
            .set_owner_shares(&scope, &alice().owner, &NumShares::from_int(155u64))
            .unwrap();
        assert!(matches!(
            keeper.withdraw_from_megavault(&alice(), &NumShares::from_int(155u64), 0),
            Err(VaultError::InvalidRedemptionValue { .. })
        ));
    }

    #[test]
    fn test_full_withdrawal_deletes_owner() {
        let mut keeper = seeded_megavault(500, 100, 100);
        let redeemed = keeper
            .withdraw_from_megavault(&alice(), &NumShares::from_int(100u64), 500)
            .unwrap();
        assert_eq!(redeemed, 500);
        assert!(keeper
            .store
            .owner_shares(&ShareScope::Megavault, &alice().owner)
            .unwrap()
            .is_none());
        assert!(keeper.total_shares(&ShareScope::Megavault).unwrap().is_zero());
    }

    #[test]
    fn test_lock_and_unlock() {
        let mut keeper = seeded_megavault(1_000, 100, 60);
        let scope = ShareScope::Megavault;
        keeper.lock_shares(&scope, &alice().owner, &NumShares::from_int(40u64), 10).unwrap();
        keeper.lock_shares(&scope, &alice().owner, &NumShares::from_int(20u64), 20).unwrap();
        assert!(matches!(
            keeper.lock_shares(&scope, &alice().owner, &NumShares::from_int(1u64), 30),
            Err(VaultError::LockedSharesExceedOwnerShares { .. })
        ));

        assert_eq!(
            keeper.unlock_shares(&scope, &alice().owner).unwrap(),
            NumShares::from_int(60u64)
        );
        assert_eq!(keeper.unlock_shares(&scope, &alice().owner), Err(VaultError::NoLockedShares));
        assert_eq!(keeper.events().filter_by_type(EventType::SharesUnlocked).len(), 1);
    }

    #[test]
    fn test_release_matured_locks() {
        let mut keeper = seeded_megavault(1_000, 100, 60);
        let scope = ShareScope::Megavault;
        keeper.lock_shares(&scope, &alice().owner, &NumShares::from_int(40u64), 10).unwrap();
        keeper.lock_shares(&scope, &alice().owner, &NumShares::from_int(20u64), 20).unwrap();

        keeper.set_block(crate::keeper::BlockContext::new(10, 0));
        keeper.release_matured_locks().unwrap();
        let unlocks = keeper.owner_share_unlocks(&scope, &alice().owner).unwrap();
        assert_eq!(unlocks.total_locked(), NumShares::from_int(20u64));

        keeper.set_block(crate::keeper::BlockContext::new(25, 0));
        keeper.release_matured_locks().unwrap();
        assert!(keeper.store.owner_share_unlocks(&scope, &alice().owner).unwrap().is_none());
    }
}
